use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LockboxError, LockboxResult};

/// Top-level configuration (loaded from lockbox.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockboxConfig {
    pub naming: NamingConfig,
    pub crypto: CryptoConfig,
    pub log: LogConfig,
}

/// Output filename rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Suffix appended to encrypted files, without the dot (default: enc)
    pub suffix: String,
    /// Filename used when stripping the suffix leaves nothing (default: decrypted)
    pub decrypted_fallback: String,
}

/// Container options applied at encryption time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Extra authenticated (not encrypted) data bound into every container
    pub associated_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            suffix: "enc".into(),
            decrypted_fallback: "decrypted".into(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl LockboxConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> LockboxResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| LockboxError::io(path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| LockboxError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LockboxResult<()> {
        let suffix = &self.naming.suffix;
        if suffix.is_empty() {
            return Err(LockboxError::Config("naming.suffix must not be empty".into()));
        }
        if suffix.contains('/') || suffix.contains('\\') {
            return Err(LockboxError::Config(format!(
                "naming.suffix must not contain a path separator: {suffix:?}"
            )));
        }
        if self.naming.decrypted_fallback.is_empty() {
            return Err(LockboxError::Config(
                "naming.decrypted_fallback must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[naming]
suffix = "locked"
decrypted_fallback = "restored"

[crypto]
associated_data = "backup-2026"

[log]
level = "debug"
format = "json"
"#;
        let config: LockboxConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.naming.suffix, "locked");
        assert_eq!(config.naming.decrypted_fallback, "restored");
        assert_eq!(config.crypto.associated_data, "backup-2026");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_defaults() {
        let config: LockboxConfig = toml::from_str("").unwrap();

        assert_eq!(config.naming.suffix, "enc");
        assert_eq!(config.naming.decrypted_fallback, "decrypted");
        assert!(config.crypto.associated_data.is_empty());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[log]
level = "warn"
"#;
        let config: LockboxConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.log.level, "warn");
        // Defaults
        assert_eq!(config.log.format, "text");
        assert_eq!(config.naming.suffix, "enc");
    }

    #[test]
    fn test_validate_rejects_bad_suffix() {
        let mut config = LockboxConfig::default();
        config.naming.suffix = String::new();
        assert!(config.validate().is_err());

        config.naming.suffix = "a/b".into();
        assert!(config.validate().is_err());

        config.naming.suffix = "enc".into();
        config.naming.decrypted_fallback = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = LockboxConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.naming.suffix, "enc");
    }

    #[test]
    fn test_load_invalid_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lockbox.toml");
        std::fs::write(&path, "[naming]\nsuffix = \"\"\n").unwrap();
        assert!(matches!(
            LockboxConfig::load(&path),
            Err(LockboxError::Config(_))
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = LockboxConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LockboxConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.naming.suffix, parsed.naming.suffix);
        assert_eq!(config.log.format, parsed.log.format);
    }
}
