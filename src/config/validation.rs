use crate::config::types::{Config, CrawlerConfig, OutputConfig, SessionConfig, SinkKind};
use crate::url::{domain_of, is_url_valid};
use crate::{ConfigError, ConfigResult};
use regex::Regex;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl-wide configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_workers < 1 || config.max_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 256, got {}",
            config.max_workers
        )));
    }

    if config.max_rps < 1 {
        return Err(ConfigError::Validation(format!(
            "max_rps must be >= 1, got {}",
            config.max_rps
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.max_parsing_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "max_parsing_workers must be >= 1, got {}",
            config.max_parsing_workers
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be at least 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a crawl session and returns the domain derived from its root URL
pub fn validate_session_config(session: &SessionConfig) -> ConfigResult<String> {
    let domain = domain_of(&session.root_url).unwrap_or_default();
    if domain.is_empty() {
        return Err(ConfigError::EmptyDomain(session.root_url.clone()));
    }

    if !is_url_valid(&session.root_url) {
        return Err(ConfigError::InvalidUrl(format!(
            "Bad url for crawling '{}'",
            session.root_url
        )));
    }

    compile_exclude_pattern(session.exclude_pattern.as_deref())?;

    Ok(domain)
}

/// Compiles the optional link exclusion pattern
pub fn compile_exclude_pattern(pattern: Option<&str>) -> ConfigResult<Option<Regex>> {
    match pattern {
        None => Ok(None),
        Some(p) if p.is_empty() => Ok(None),
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e))),
    }
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    match config.sink {
        SinkKind::Sqlite => {
            if config.database_path.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "database_path is required for the sqlite sink".to_string(),
                ));
            }
        }
        SinkKind::Elasticsearch => {
            let es = &config.elasticsearch;
            if es.host.is_empty() || es.index.is_empty() || es.doc_type.is_empty() {
                return Err(ConfigError::Validation(
                    "elasticsearch host, index and doc_type cannot be empty".to_string(),
                ));
            }
        }
        SinkKind::Stdout => {}
    }

    Ok(())
}
