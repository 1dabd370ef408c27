//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, ServerConfig, SessionConfig, WsEventConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WsEventConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_session_config(&config.session)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }
    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }
    validate_path(&server.path)
}

fn validate_session_config(session: &SessionConfig) -> ConfigResult<()> {
    if session.max_message_size == 0 {
        return Err(ConfigError::validation(
            "session.max_message_size must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Route paths are absolute.
fn validate_path(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation(format!(
            "server.path must start with '/': {path}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&WsEventConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = WsEventConfig::default();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_validate_relative_path() {
        let mut config = WsEventConfig::default();
        config.server.path = "ws".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = WsEventConfig::default();
        config.logging.output = LogOutput::File;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "logging.file_path"));

        config.logging.file_path = Some("wsevent.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_message_size() {
        let mut config = WsEventConfig::default();
        config.session.max_message_size = 0;
        assert!(validate_config(&config).is_err());
    }
}
