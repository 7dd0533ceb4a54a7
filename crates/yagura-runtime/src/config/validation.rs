//! Configuration validation.

use std::collections::HashMap;

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, YaguraConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &YaguraConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_sections("layers", &config.layers)?;
    validate_sections("services", &config.services)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => {
                return Err(ConfigError::validation(
                    "logging.file_path is required when logging.output is 'file'",
                ));
            }
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "logging.file_path must name a file: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: '{target}'"
            )));
        }
    }

    Ok(())
}

/// Every component section must be a table (or null, meaning "use defaults").
fn validate_sections(kind: &'static str, sections: &HashMap<String, Value>) -> ConfigResult<()> {
    for (name, value) in sections {
        if !matches!(value, Value::Object(_) | Value::Null) {
            return Err(ConfigError::InvalidSection {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_empty_config() {
        assert!(validate_config(&YaguraConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = YaguraConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.logging.file_path = Some("logs/yagura.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_scalar_section_rejected() {
        let mut config = YaguraConfig::default();
        config.layers.insert("Echo".into(), json!({ "prefix": ">" }));
        config.services.insert("Greeter".into(), json!("hello"));

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSection { kind: "services", ref name }) if name == "Greeter"
        ));
    }
}
