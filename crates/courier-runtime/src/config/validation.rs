//! Configuration validation utilities.

use courier_core::BrokerConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_broker_config(&config.broker)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_broker_config(broker: &BrokerConfig) -> ConfigResult<()> {
    if broker.namespace.trim().is_empty() {
        return Err(ConfigError::missing_field("broker.namespace"));
    }

    if broker.namespace.contains(':') {
        return Err(ConfigError::validation(format!(
            "Namespace must not contain ':': {}",
            broker.namespace
        )));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output != LogOutput::File {
        return Ok(());
    }

    let Some(path) = &logging.file_path else {
        return Err(ConfigError::missing_field("logging.file_path"));
    };

    if path.file_name().is_none() {
        return Err(ConfigError::validation(format!(
            "Log file path has no file name: {}",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn test_namespace_rules() {
        let mut config = CourierConfig::default();
        config.broker.namespace = "  ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.broker.namespace = "commerce:".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = CourierConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { ref field }) if field == "logging.file_path"
        ));

        config.logging.file_path = Some("logs/courier.log".into());
        assert!(validate_config(&config).is_ok());

        config.logging.file_path = Some("..".into());
        assert!(validate_config(&config).is_err());
    }
}
