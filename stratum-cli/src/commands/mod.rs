//! Command handlers -- one module per subcommand

pub mod config;
pub mod index;

use std::path::Path;

use tracing::debug;

use stratum_core::config::StratumConfig;
use stratum_core::error::{ConfigError, StratumError};

use crate::cli::DEFAULT_CONFIG_PATH;
use crate::error::CliError;

/// Load the effective configuration (file + env overrides + defaults).
///
/// A missing file is only tolerated at the default location, where built-in
/// defaults plus env overrides are used instead. An explicitly given path
/// must exist.
pub async fn load_config(path: &Path) -> Result<StratumConfig, CliError> {
    match StratumConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(StratumError::Config(ConfigError::FileNotFound { .. }))
            if path == Path::new(DEFAULT_CONFIG_PATH) =>
        {
            debug!(path = %path.display(), "config file not found, using defaults");
            let mut config = StratumConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_config_explicit_missing_path_fails() {
        let result = load_config(Path::new("/nonexistent/stratum/stratum.toml")).await;
        let err = result.expect_err("explicit missing path should fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stratum.toml");
        std::fs::write(&path, "[index]\ncache_file_name = \"index.json\"\n").expect("write");

        let config = load_config(&path).await.expect("config should load");
        assert_eq!(config.index.cache_file_name, "index.json");
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stratum.toml");
        std::fs::write(&path, "[general]\nlog_level = \"loud\"\n").expect("write");

        let err = load_config(&path).await.expect_err("invalid log level");
        assert!(err.to_string().contains("general.log_level"));
    }
}
