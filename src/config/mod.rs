//! Configuration module for Tidewalk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Configuration is always passed explicitly to the crawler; nothing here reads
//! process-wide state.
//!
//! # Example
//!
//! ```no_run
//! use tidewalk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidewalk.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.session.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ElasticsearchConfig, OutputConfig, SessionConfig, SinkKind,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

// Re-export validation entry points used by the crawler itself
pub use validation::{
    compile_exclude_pattern, validate, validate_crawler_config, validate_session_config,
};
