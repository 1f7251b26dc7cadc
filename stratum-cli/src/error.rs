//! Errors surfaced by `stratum` and their exit codes

use stratum_core::error::StratumError;
use stratum_sbom_indexer::SbomIndexerError;

/// Top-level error of a `stratum` invocation.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// One or more images could not be indexed.
    #[error("index error: {0}")]
    Index(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from stratum-core.
    #[error("{0}")]
    Core(#[from] StratumError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                     |
    /// |------|-----------------------------|
    /// | 0    | Success                     |
    /// | 1    | Command error / image failed |
    /// | 2    | Configuration error         |
    /// | 10   | IO error                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(StratumError::Config(_)) => 2,
            Self::Io(_) | Self::Core(StratumError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Index(_) | Self::Core(_) => 1,
        }
    }
}

impl From<SbomIndexerError> for CliError {
    fn from(e: SbomIndexerError) -> Self {
        match e {
            SbomIndexerError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Index(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("configuration is invalid".to_owned());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = StratumError::Config(ConfigError::FileNotFound {
            path: "stratum.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2, "core config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_index_error() {
        let err = CliError::Index("1 of 3 images failed".to_owned());
        assert_eq!(err.exit_code(), 1, "index error should return exit code 1");
    }

    #[test]
    fn test_exit_code_io_error() {
        let err = CliError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("unknown section: ebpf".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_indexer_config_error() {
        let err: CliError = SbomIndexerError::Config {
            field: "preferred_engine".to_owned(),
            reason: "'grype' is neither 'syft' nor 'trivy'".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("preferred_engine"));
    }

    #[test]
    fn test_from_indexer_pipeline_error() {
        let err: CliError = SbomIndexerError::Acquisition {
            image: "/images/alpine".to_owned(),
            reason: "not a directory".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Index(_)));
        assert!(err.to_string().contains("/images/alpine"));
    }

    #[test]
    fn test_config_error_is_prefixed() {
        let err = CliError::Config("configuration is invalid".to_owned());
        assert_eq!(err.to_string(), "configuration error: configuration is invalid");
    }

    #[test]
    fn test_command_error_is_verbatim() {
        let err = CliError::Command("--name can only be used with a single directory".to_owned());
        assert_eq!(
            err.to_string(),
            "--name can only be used with a single directory"
        );
    }
}
