use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::schema_model::InterfaceConflictPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Translator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Whether `@authorization` rules are woven into emitted statements
    pub authorization_enabled: bool,

    /// Whether multi-row creates may use the single-statement UNWIND path
    pub unwind_create_enabled: bool,

    /// Which sibling interface wins when two declare the same relationship
    pub interface_conflict_policy: InterfaceConflictPolicy,

    /// Deepest selection nesting a request may use (1-64)
    #[validate(range(
        min = 1,
        max = 64,
        message = "Max selection depth must be between 1 and 64"
    ))]
    pub max_selection_depth: usize,

    /// Parameter carrying the JWT claims
    #[validate(length(min = 1, message = "JWT parameter name cannot be empty"))]
    pub jwt_param_name: String,

    /// Parameter carrying the authenticated flag
    #[validate(length(min = 1, message = "Authenticated parameter name cannot be empty"))]
    pub authenticated_param_name: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            authorization_enabled: true,
            unwind_create_enabled: true,
            interface_conflict_policy: InterfaceConflictPolicy::LastDeclared,
            max_selection_depth: 32,
            jwt_param_name: "jwt".to_string(),
            authenticated_param_name: "isAuthenticated".to_string(),
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            authorization_enabled: parse_env_var("NEOGRAPHQL_AUTHORIZATION_ENABLED", "true")?,
            unwind_create_enabled: parse_env_var("NEOGRAPHQL_UNWIND_CREATE_ENABLED", "true")?,
            interface_conflict_policy: parse_env_var(
                "NEOGRAPHQL_INTERFACE_CONFLICT_POLICY",
                "last_declared",
            )?,
            max_selection_depth: parse_env_var("NEOGRAPHQL_MAX_SELECTION_DEPTH", "32")?,
            jwt_param_name: env_var_or("NEOGRAPHQL_JWT_PARAM", "jwt")?,
            authenticated_param_name: env_var_or("NEOGRAPHQL_AUTHENTICATED_PARAM", "isAuthenticated")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Read an environment variable, falling back to `default` when unset.
/// A value that is not valid Unicode is an error.
fn env_var_or(key: &str, default: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Err(env::VarError::NotPresent) => Ok(default.to_string()),
        other => Ok(other?),
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env_var_or(key, default)?;
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.authorization_enabled);
        assert!(config.unwind_create_enabled);
        assert_eq!(config.max_selection_depth, 32);
        assert_eq!(config.jwt_param_name, "jwt");
    }

    #[test]
    fn test_invalid_selection_depth() {
        let config = TranslatorConfig {
            max_selection_depth: 65, // Invalid (> 64)
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_param_name() {
        let config = TranslatorConfig {
            jwt_param_name: "".to_string(), // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("NEOGRAPHQL_UNWIND_CREATE_ENABLED", "false");
        env::set_var("NEOGRAPHQL_INTERFACE_CONFLICT_POLICY", "reject");
        let config = TranslatorConfig::from_env();
        env::remove_var("NEOGRAPHQL_UNWIND_CREATE_ENABLED");
        env::remove_var("NEOGRAPHQL_INTERFACE_CONFLICT_POLICY");

        let config = config.unwrap();
        assert!(!config.unwind_create_enabled);
        assert_eq!(config.interface_conflict_policy, InterfaceConflictPolicy::Reject);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        env::set_var("NEOGRAPHQL_MAX_SELECTION_DEPTH", "deep");
        let result = TranslatorConfig::from_env();
        env::remove_var("NEOGRAPHQL_MAX_SELECTION_DEPTH");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        env::set_var("NEOGRAPHQL_MAX_SELECTION_DEPTH", "0");
        let result = TranslatorConfig::from_env();
        env::remove_var("NEOGRAPHQL_MAX_SELECTION_DEPTH");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_from_env_rejects_non_unicode_values() {
        use std::os::unix::ffi::OsStringExt;

        env::set_var("NEOGRAPHQL_JWT_PARAM", std::ffi::OsString::from_vec(vec![0x6a, 0xff]));
        let result = TranslatorConfig::from_env();
        env::remove_var("NEOGRAPHQL_JWT_PARAM");
        assert!(matches!(result, Err(ConfigError::EnvVar(env::VarError::NotUnicode(_)))));
    }

    #[test]
    fn test_from_yaml_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "authorization_enabled: false\ninterface_conflict_policy: first_declared").unwrap();

        let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
        assert!(!config.authorization_enabled);
        assert_eq!(
            config.interface_conflict_policy,
            InterfaceConflictPolicy::FirstDeclared
        );
        assert_eq!(config.authenticated_param_name, "isAuthenticated");
    }
}
