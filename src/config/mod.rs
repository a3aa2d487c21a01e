//! Codec configuration
//!
//! A small JSON file read once at startup:
//!
//! ```json
//! {"validate": true, "pretty": false, "indent": 4, "max_depth": 64,
//!  "strict_flags": false, "log_level": "INFO"}
//! ```
//!
//! Every field is optional. Unknown fields are rejected so that a typo
//! never silently falls back to a default.

mod errors;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blob::log_validation_error;
use crate::codec::{DecodeOptions, DEFAULT_MAX_DEPTH};
use crate::json::JsonConfig;
use crate::observability::{Event, Logger, Severity};
use crate::tree::FlagStrictness;

pub use errors::{ConfigError, ConfigResult};

const MAX_INDENT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Decode through validated readers and serializers.
    pub validate: bool,

    pub pretty: bool,

    /// Spaces per level when `pretty` is set.
    pub indent: usize,

    /// Object nesting ceiling for decoding.
    pub max_depth: usize,

    /// Refuse suspicious flag combinations instead of adjusting them.
    pub strict_flags: bool,

    pub log_level: Severity,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            validate: true,
            pretty: false,
            indent: 4,
            max_depth: DEFAULT_MAX_DEPTH,
            strict_flags: false,
            log_level: Severity::Info,
        }
    }
}

impl CodecConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;

        Logger::info(
            Event::ConfigLoaded.as_str(),
            &[
                ("path", &path.display().to_string()),
                ("validate", &config.validate.to_string()),
            ],
        );
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: CodecConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_depth",
                reason: "must be > 0".to_string(),
            });
        }
        if self.indent > MAX_INDENT {
            return Err(ConfigError::Invalid {
                field: "indent",
                reason: format!("must be at most {}", MAX_INDENT),
            });
        }
        Ok(())
    }

    pub fn json_config(&self) -> JsonConfig {
        JsonConfig {
            pretty: self.pretty,
            indent: self.indent,
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            json: self.json_config(),
            on_error: log_validation_error,
        }
    }

    pub fn flag_strictness(&self) -> FlagStrictness {
        if self.strict_flags {
            FlagStrictness::Strict
        } else {
            FlagStrictness::Lenient
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert!(config.validate);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.flag_strictness(), FlagStrictness::Lenient);
        assert_eq!(config.json_config(), JsonConfig::default());
    }

    #[test]
    fn test_fields_parse() {
        let config = CodecConfig::from_json_str(
            r#"{"pretty": true, "indent": 2, "strict_flags": true, "log_level": "WARN"}"#,
        )
        .unwrap();
        assert_eq!(config.json_config(), JsonConfig { pretty: true, indent: 2 });
        assert_eq!(config.flag_strictness(), FlagStrictness::Strict);
        assert_eq!(config.log_level, Severity::Warn);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = CodecConfig::from_json_str(r#"{"validtae": false}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let result = CodecConfig::from_json_str(r#"{"max_depth": 0}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "max_depth", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codec.json");
        fs::write(&path, r#"{"validate": false, "max_depth": 8}"#).unwrap();

        let config = CodecConfig::load(&path).unwrap();
        assert!(!config.validate);
        assert_eq!(config.decode_options().max_depth, 8);

        let missing = CodecConfig::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
