//! `stratum config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use stratum_core::config::StratumConfig;
use stratum_sbom_indexer::SbomIndexerConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
///
/// `loaded` is the result of loading `config_path` at startup.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    loaded: Result<StratumConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, loaded, writer),
        ConfigAction::Show { section } => execute_show(config_path, loaded?, section, writer),
    }
}

/// Report whether the configuration loads and passes validation.
///
/// Besides the core checks, the index section is checked the way the
/// indexer checks it (plain cache file name, distinct engine names, known
/// preferred engine).
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
fn execute_validate(
    config_path: &Path,
    loaded: Result<StratumConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match loaded {
        Ok(config) => match SbomIndexerConfig::from_core(&config.index).validate() {
            Ok(()) => Vec::new(),
            Err(e) => vec![e.to_string()],
        },
        Err(e) => vec![e.to_string()],
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration, optionally a single section.
///
/// # Errors
///
/// Returns `CliError::Command` if the section name is unknown.
fn execute_show(
    config_path: &Path,
    config: StratumConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_config_report(config_path, &config, section)?;
    writer.render(&report)?;
    Ok(())
}

fn build_config_report(
    config_path: &Path,
    config: &StratumConfig,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let source = config_path.display().to_string();

    let Some(section_name) = section else {
        return Ok(ConfigReport {
            source,
            section: None,
            config_toml: to_toml(config),
        });
    };

    let config_toml = match section_name.as_str() {
        "general" => to_toml(&config.general),
        "index" => to_toml(&config.index),
        _ => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: general, index)",
                section_name
            )));
        }
    };

    Ok(ConfigReport {
        source,
        section: Some(section_name),
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
