use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored alongside SQLite crawl sessions so runs made with
/// different settings can be told apart.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use crate::config::SinkKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-workers = 5
max-rps = 10
max-retries = 2
max-parsing-workers = 2
request-timeout = 15
user-agent = "TestCrawler/1.0"

[session]
root-url = "https://docs.python.org/"
max-depth = 3
exclude-pattern = "\\.pdf$"

[output]
sink = "sqlite"
database-path = "./crawl.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_workers, 5);
        assert_eq!(config.crawler.max_rps, 10);
        assert_eq!(config.crawler.max_retries, 2);
        assert_eq!(config.crawler.timeout().as_secs(), 15);
        assert_eq!(config.session.max_depth, 3);
        assert_eq!(config.session.exclude_pattern.as_deref(), Some("\\.pdf$"));
        assert_eq!(config.output.sink, SinkKind::Sqlite);
        assert_eq!(config.output.database_path.as_deref(), Some("./crawl.db"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(
            r#"
[session]
root-url = "https://example.com/"
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.max_workers, 3);
        assert_eq!(config.crawler.max_rps, 3);
        assert_eq!(config.crawler.max_retries, 3);
        assert!(config.crawler.max_parsing_workers >= 1);
        assert_eq!(config.session.max_depth, 0);
        assert_eq!(config.output.sink, SinkKind::Stdout);
        assert_eq!(config.output.elasticsearch.port, 9200);
        assert_eq!(config.output.elasticsearch.index, "crawler_index_v1");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/tidewalk.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
max-workers = 0

[session]
root-url = "https://example.com/"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse_config(include_str!("../../tidewalk.example.toml")).unwrap();
        assert_eq!(config.output.sink, SinkKind::Sqlite);
        assert_eq!(config.session.max_depth, 3);
        assert!(config.session.exclude_pattern.is_some());
    }
}
