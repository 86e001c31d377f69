//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `auth.secret`.
pub const SECRET_ENV: &str = "PROXY_SHARED_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let secret = std::env::var(SECRET_ENV).ok();
    parse_config(&content, secret)
}

/// Parse and validate configuration text, applying an out-of-band secret.
pub fn parse_config(content: &str, secret_override: Option<String>) -> Result<ProxyConfig, ConfigError> {
    let mut config: ProxyConfig = toml::from_str(content)?;

    if let Some(secret) = secret_override.filter(|s| !s.is_empty()) {
        config.auth.secret = Some(secret);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = parse_config("[upstream]\norigin = \"http://127.0.0.1:3000\"\n", None).unwrap();
        assert_eq!(config.queue.max_concurrency, 2);
        assert_eq!(config.queue.max_queue_size, 50);
        assert_eq!(config.auth.header_name, "x-proxy-secret");
        assert_eq!(config.upstream.request_timeout_secs, 30);
        assert!(config.auth.secret.is_none());
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            origin = "https://api.example.com"
            request_timeout_secs = 10

            [queue]
            max_concurrency = 4
            max_queue_size = 8

            [auth]
            header_name = "x-api-secret"
            secret = "from-file"

            [observability]
            log_format = "json"
        "#;
        let config = parse_config(text, None).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.queue.max_concurrency, 4);
        assert_eq!(config.queue.max_queue_size, 8);
        assert_eq!(config.auth.secret.as_deref(), Some("from-file"));
        assert_eq!(config.observability.log_format, crate::config::LogFormat::Json);
    }

    #[test]
    fn test_secret_override() {
        let text = "[upstream]\norigin = \"http://127.0.0.1:3000\"\n[auth]\nsecret = \"from-file\"\n";
        let config = parse_config(text, Some("from-env".into())).unwrap();
        assert_eq!(config.auth.secret.as_deref(), Some("from-env"));

        let config = parse_config(text, Some(String::new())).unwrap();
        assert_eq!(config.auth.secret.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(parse_config("[queue\n", None), Err(ConfigError::Parse(_))));
        assert!(matches!(parse_config("", None), Err(ConfigError::Validation(_))));
        assert!(matches!(
            load_config(Path::new("/nonexistent/admission-proxy.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
