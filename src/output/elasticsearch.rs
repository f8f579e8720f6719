//! Elasticsearch result sink
//!
//! Indexes the text of successful pages so a crawled site becomes searchable.
//! Failed outcomes are not indexed.

use crate::config::ElasticsearchConfig;
use crate::output::{FetchOutcome, ResultSink, SinkError, SinkResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct IndexDocument<'a> {
    root_url: &'a str,
    url: &'a str,
    text: &'a str,
}

/// Posts one document per successful page to an Elasticsearch index
pub struct ElasticsearchSink {
    client: Client,
    endpoint: String,
}

impl ElasticsearchSink {
    pub fn new(config: &ElasticsearchConfig) -> SinkResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: Self::endpoint_for(config),
        })
    }

    fn endpoint_for(config: &ElasticsearchConfig) -> String {
        format!(
            "http://{}:{}/{}/{}",
            config.host, config.port, config.index, config.doc_type
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ResultSink for ElasticsearchSink {
    async fn init(&self) -> SinkResult<()> {
        tracing::info!("Indexing pages into {}", self.endpoint);
        Ok(())
    }

    async fn report(&self, outcome: &FetchOutcome) -> SinkResult<()> {
        if !outcome.is_indexable() {
            return Ok(());
        }
        let Some(text) = outcome.text() else {
            return Ok(());
        };

        let document = IndexDocument {
            root_url: &outcome.root_url,
            url: &outcome.url,
            text,
        };
        let response = self.client.post(&self.endpoint).json(&document).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
