//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

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
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, RouteKindConfig};

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:8888"

        [observability]
        log_format = "json"

        [[namespaces]]
        name = "testns1"
        mounts = ["testns1.com", "/testns1"]
        backend = "http://httpbun-local"
        transport = { response_timeout_ms = 2000 }

          [[namespaces.routes]]
          pattern = "/terminated/hi/{$}"
          rewrite = "/any"

          [[namespaces.routes]]
          pattern = "/only-get"
          methods = ["GET"]

          [[namespaces.routes]]
          pattern = "/files"
          kind = "wildcard"

        [[namespaces]]
        name = "root"
        backend = "http://httpbun-local"

          [[namespaces.routes]]
          pattern = "/"
    "#;

    #[test]
    fn parses_full_document() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8888");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.namespaces.len(), 2);

        let ns = &config.namespaces[0];
        assert_eq!(ns.mounts, vec!["testns1.com", "/testns1"]);
        assert_eq!(ns.routes.len(), 3);
        assert_eq!(ns.routes[1].methods, vec!["GET"]);
        assert_eq!(ns.routes[2].kind, Some(RouteKindConfig::Wildcard));
        assert_eq!(
            ns.transport.as_ref().and_then(|t| t.response_timeout_ms),
            Some(2000)
        );

        assert!(config.namespaces[1].mounts.is_empty());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_config("[[namespaces]\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn surfaces_validation_errors() {
        let err = parse_config(
            r#"
            [[namespaces]]
            name = "broken"
            mounts = ["/x"]
            backend = "not a url"
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
