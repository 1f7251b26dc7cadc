//! Command-line surface of `stratum` (clap derive, no I/O)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "stratum.toml";

/// Stratum -- container image SBOM indexer.
///
/// Use `stratum <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "stratum", version, about, long_about = None)]
pub struct Cli {
    /// Path to the stratum.toml configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Colored tables for terminals.
    Text,
    /// Pretty-printed JSON on stdout.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index extracted container images and write their SBOMs.
    Index(IndexArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- index ----

/// Index one or more extracted image directories.
///
/// Each directory must contain `manifest.json` and `config.json`. The SBOM is
/// written next to them (`sbom.json` by default).
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Extracted image directories.
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    /// Image reference recorded in the SBOM (single directory only).
    #[arg(long)]
    pub name: Option<String>,

    /// Ignore and overwrite cached SBOMs.
    #[arg(long)]
    pub no_cache: bool,
}

// ---- config ----

/// Manage stratum configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, index).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_index_single_dir() {
        let cli = Cli::try_parse_from(["stratum", "index", "/images/alpine"])
            .expect("should parse 'index' subcommand");
        match cli.command {
            Commands::Index(args) => {
                assert_eq!(args.dirs, vec![PathBuf::from("/images/alpine")]);
                assert!(args.name.is_none(), "name should default to None");
                assert!(!args.no_cache, "no_cache should default to false");
            }
            _ => panic!("expected Index command"),
        }
    }

    #[test]
    fn test_cli_parse_index_multiple_dirs() {
        let cli = Cli::try_parse_from(["stratum", "index", "a", "b", "c"])
            .expect("should parse multiple dirs");
        match cli.command {
            Commands::Index(args) => assert_eq!(args.dirs.len(), 3),
            _ => panic!("expected Index command"),
        }
    }

    #[test]
    fn test_cli_parse_index_name_and_no_cache() {
        let cli = Cli::try_parse_from([
            "stratum",
            "index",
            "/images/debian",
            "--name",
            "docker.io/library/debian:12",
            "--no-cache",
        ])
        .expect("should parse index flags");
        match cli.command {
            Commands::Index(args) => {
                assert_eq!(args.name.as_deref(), Some("docker.io/library/debian:12"));
                assert!(args.no_cache);
            }
            _ => panic!("expected Index command"),
        }
    }

    #[test]
    fn test_cli_parse_index_requires_dir() {
        let args = Cli::try_parse_from(["stratum", "index"]);
        assert!(args.is_err(), "index without directories should fail");
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli = Cli::try_parse_from(["stratum", "config", "validate"])
            .expect("should parse 'config validate'");
        match cli.command {
            Commands::Config(config_args) => {
                assert!(matches!(config_args.action, ConfigAction::Validate));
            }
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["stratum", "config", "show", "--section", "index"])
            .expect("should parse config show with section");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("index".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_default_config_path() {
        let cli = Cli::try_parse_from(["stratum", "config", "validate"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_cli_parse_custom_config_path() {
        let cli = Cli::try_parse_from(["stratum", "-c", "/etc/stratum/stratum.toml", "index", "x"])
            .expect("should parse with custom config path");
        assert_eq!(cli.config, PathBuf::from("/etc/stratum/stratum.toml"));
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stratum",
            "index",
            "x",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.log_level, Some("debug".to_owned()));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_invalid_output_format_fails() {
        let args = Cli::try_parse_from(["stratum", "--output", "yaml", "config", "show"]);
        assert!(args.is_err(), "unknown output format should fail");
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["stratum"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "stratum");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"index"), "should have 'index' subcommand");
        assert!(subcommands.contains(&"config"), "should have 'config' subcommand");
    }
}
