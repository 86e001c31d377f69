//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, concurrency > 0, addresses parse)
//! - Validate the upstream origin and credential header name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.origin is required")]
    MissingOrigin,

    #[error("upstream.origin: {0}")]
    InvalidOrigin(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("auth.header_name: invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if let Err(e) = validate_origin(&config.upstream.origin) {
        errors.push(e);
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.request_timeout_secs"));
    }

    if config.queue.max_concurrency == 0 {
        errors.push(ValidationError::Zero("queue.max_concurrency"));
    }
    // Admission checks the pending length before dispatch, so a zero-sized
    // queue would reject every request.
    if config.queue.max_queue_size == 0 {
        errors.push(ValidationError::Zero("queue.max_queue_size"));
    }

    if HeaderName::from_bytes(config.auth.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(config.auth.header_name.clone()));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse the upstream origin. Paths are allowed as a prefix; queries and
/// fragments are not, since the caller's own query is appended.
pub fn validate_origin(origin: &str) -> Result<Url, ValidationError> {
    if origin.trim().is_empty() {
        return Err(ValidationError::MissingOrigin);
    }
    let url = Url::parse(origin).map_err(|e| ValidationError::InvalidOrigin(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidOrigin(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidOrigin("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ValidationError::InvalidOrigin("query and fragment are not allowed".to_string()));
    }
    Ok(url)
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.upstream.origin = "https://api.example.com".to_string();
        config
    }

    #[test]
    fn test_defaults_with_origin_are_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_origin_rejected() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingOrigin]);
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = valid();
        config.listener.bind_address = "not-an-addr".to_string();
        config.queue.max_concurrency = 0;
        config.auth.header_name = "bad header".to_string();
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "got {:?}", errors);
        assert!(errors.contains(&ValidationError::Zero("queue.max_concurrency")));
        assert!(errors.contains(&ValidationError::MissingAdminKey));
    }

    #[test]
    fn test_origin_rules() {
        assert!(validate_origin("http://127.0.0.1:3000").is_ok());
        assert!(validate_origin("https://api.example.com/base").is_ok());
        assert!(validate_origin("ftp://example.com").is_err());
        assert!(validate_origin("https://example.com/?a=1").is_err());
        assert!(validate_origin("not a url").is_err());
    }

    #[test]
    fn test_zero_queue_size_rejected() {
        let mut config = valid();
        config.queue.max_queue_size = 0;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::Zero("queue.max_queue_size")])
        );
    }
}
