//! Secret loading for the seeded admin credential.
//!
//! Supports file-based secrets (Kubernetes/Docker secret mounts, e.g.
//! `/run/secrets/admin_password`) with an environment-variable fallback.
//! Secret values are never logged; only names, sources, and lengths are.

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Source for loading a secret
#[derive(Debug, Clone)]
pub enum SecretSource {
    /// Load secret from a file path
    File(String),
    /// Load secret from an environment variable
    Env(String),
}

/// Load a secret from a specified source.
///
/// Fails fast if the source is missing or holds an empty value.
pub fn load_secret(name: &str, source: &SecretSource) -> Result<String> {
    match source {
        SecretSource::File(path) => {
            debug!(secret_name = name, source = "file", path = %path, "Loading secret");
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read secret '{name}' from file '{path}'"))?;

            let trimmed = content.trim().to_string();
            if trimmed.is_empty() {
                anyhow::bail!("Secret '{name}' from file '{path}' is empty");
            }

            debug!(secret_name = name, secret_len = trimmed.len(), "Secret loaded from file");
            Ok(trimmed)
        }
        SecretSource::Env(var) => {
            warn!(
                secret_name = name,
                env_var = %var,
                "Loading secret from environment variable (less secure than file-based secrets)"
            );

            let value = std::env::var(var).with_context(|| {
                format!("Failed to read secret '{name}' from environment variable '{var}'")
            })?;
            if value.is_empty() {
                anyhow::bail!("Secret '{name}' from environment variable '{var}' is empty");
            }

            debug!(secret_name = name, secret_len = value.len(), "Secret loaded from environment");
            Ok(value)
        }
    }
}

/// Try the primary source, falling back to the secondary on failure.
pub fn load_secret_with_fallback(
    name: &str,
    primary: &SecretSource,
    fallback: &SecretSource,
) -> Result<String> {
    match load_secret(name, primary) {
        Ok(value) => Ok(value),
        Err(primary_err) => {
            debug!(
                secret_name = name,
                error = %primary_err,
                "Primary secret source failed, trying fallback"
            );
            load_secret(name, fallback)
                .with_context(|| format!("Both sources failed for secret '{name}'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_secret_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "s3cret-value  ").unwrap();

        let source = SecretSource::File(file.path().to_string_lossy().into_owned());
        let value = load_secret("test_secret", &source).unwrap();
        assert_eq!(value, "s3cret-value");
    }

    #[test]
    fn test_load_secret_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = SecretSource::File(file.path().to_string_lossy().into_owned());
        assert!(load_secret("test_secret", &source).is_err());
    }

    #[test]
    fn test_load_secret_missing_file() {
        let source = SecretSource::File("/nonexistent/secret".to_string());
        assert!(load_secret("test_secret", &source).is_err());
    }

    #[test]
    fn test_fallback_used_when_primary_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-fallback").unwrap();

        let primary = SecretSource::File("/nonexistent/secret".to_string());
        let fallback = SecretSource::File(file.path().to_string_lossy().into_owned());
        let value = load_secret_with_fallback("test_secret", &primary, &fallback).unwrap();
        assert_eq!(value, "from-fallback");
    }
}
