use serde::Serialize;

/// What a fetch produced: page text, or the reason there is none
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeBody {
    Text(String),
    Failure(String),
}

/// One record per fetched URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    /// Root URL of the crawl session
    pub root_url: String,

    /// The fetched URL
    pub url: String,

    /// HTTP status code of the response
    pub status_code: Option<u16>,

    pub body: OutcomeBody,
}

impl FetchOutcome {
    /// Outcome for a parsed page
    pub fn with_text(
        root_url: impl Into<String>,
        url: impl Into<String>,
        status_code: Option<u16>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            root_url: root_url.into(),
            url: url.into(),
            status_code,
            body: OutcomeBody::Text(text.into()),
        }
    }

    /// Outcome for a response that was fetched but not usable
    pub fn failed(
        root_url: impl Into<String>,
        url: impl Into<String>,
        status_code: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            root_url: root_url.into(),
            url: url.into(),
            status_code,
            body: OutcomeBody::Failure(reason.into()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Text(text) => Some(text),
            OutcomeBody::Failure(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.body {
            OutcomeBody::Text(_) => None,
            OutcomeBody::Failure(reason) => Some(reason),
        }
    }

    /// True for a 200 response that produced text
    pub fn is_indexable(&self) -> bool {
        self.status_code == Some(200) && self.text().is_some_and(|t| !t.is_empty())
    }
}
