//! `stratum index` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use stratum_core::config::StratumConfig;
use stratum_sbom_indexer::{
    ImageIndexOutcome, Sbom, SbomIndexer, SbomIndexerBuilder, SbomIndexerConfig, SbomIndexerError,
};

use crate::cli::IndexArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `index` command.
///
/// # Errors
///
/// - `CliError::Command` if `--name` is combined with several directories
/// - `CliError::Config` if the index configuration is rejected
/// - `CliError::Index` if at least one image failed (after the report is printed)
pub async fn execute(
    args: IndexArgs,
    config: StratumConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if args.name.is_some() && args.dirs.len() != 1 {
        return Err(CliError::Command(
            "--name can only be used with a single directory".to_owned(),
        ));
    }

    let mut index_config = config.index;
    if args.no_cache {
        index_config.use_cache = false;
    }
    let indexer_config = SbomIndexerConfig::from_core(&index_config);
    let cache_file_name = indexer_config.cache_file_name.clone();

    let indexer = SbomIndexerBuilder::new().config(indexer_config).build()?;

    info!(
        images = args.dirs.len(),
        use_cache = !args.no_cache,
        "starting index"
    );

    let entries = match (args.name.as_deref(), args.dirs.as_slice()) {
        (Some(name), [dir]) => vec![index_named(&indexer, dir, name, &cache_file_name).await],
        _ => index_dirs(&indexer, &args.dirs, &cache_file_name).await,
    };

    let report = IndexReport::new(entries);
    writer.render(&report)?;

    if report.failed > 0 {
        return Err(CliError::Index(format!(
            "{} of {} images failed",
            report.failed,
            report.images.len()
        )));
    }

    Ok(())
}

/// Index a single directory under an explicit image reference.
async fn index_named(
    indexer: &SbomIndexer,
    dir: &Path,
    name: &str,
    cache_file_name: &str,
) -> ImageEntry {
    let input = dir.display().to_string();
    match indexer.index_path(dir, Some(name)).await {
        Ok(mut indexed) => {
            indexer.enrich(&mut indexed.sbom).await;
            ImageEntry::success(
                input,
                &indexed.sbom,
                indexed.cache.is_hit(),
                indexed.path.join(cache_file_name),
            )
        }
        Err(e) => ImageEntry::failure(input, &e),
    }
}

/// Index every directory concurrently. Entries follow the argument order.
async fn index_dirs(
    indexer: &SbomIndexer,
    dirs: &[PathBuf],
    cache_file_name: &str,
) -> Vec<ImageEntry> {
    let inputs: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    let mut outcomes = indexer.index_all(inputs.clone()).await;
    outcomes.sort_by_key(|o| {
        inputs
            .iter()
            .position(|i| *i == o.input)
            .unwrap_or(usize::MAX)
    });

    outcomes
        .into_iter()
        .map(|outcome| ImageEntry::from_outcome(outcome, cache_file_name))
        .collect()
}

/// Per-image line of the index report.
#[derive(Debug, Serialize)]
pub struct ImageEntry {
    /// Directory as given on the command line
    pub input: String,
    /// Image reference recorded in the SBOM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Manifest digest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// `os/architecture[/variant]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Detected distribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
    /// Number of merged packages
    pub packages: usize,
    /// Number of vulnerabilities (None when lookup failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<usize>,
    /// Served from the persisted SBOM
    pub cached: bool,
    /// Where the SBOM document lives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbom_path: Option<String>,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageEntry {
    fn success(input: String, sbom: &Sbom, cached: bool, sbom_path: PathBuf) -> Self {
        let image = &sbom.source.image;
        Self {
            input,
            name: Some(image.name.clone()).filter(|n| !n.is_empty()),
            digest: Some(image.digest.clone()),
            platform: Some(image.platform.to_string()),
            distro: image.distro.as_ref().map(ToString::to_string),
            packages: sbom.package_count(),
            vulnerabilities: sbom.vulnerabilities.as_ref().map(Vec::len),
            cached,
            sbom_path: Some(sbom_path.display().to_string()),
            error: None,
        }
    }

    fn failure(input: String, error: &SbomIndexerError) -> Self {
        Self {
            input,
            name: None,
            digest: None,
            platform: None,
            distro: None,
            packages: 0,
            vulnerabilities: None,
            cached: false,
            sbom_path: None,
            error: Some(error.root().to_string()),
        }
    }

    fn from_outcome(outcome: ImageIndexOutcome, cache_file_name: &str) -> Self {
        let sbom_path = Path::new(&outcome.input).join(cache_file_name);
        match (&outcome.sbom, &outcome.error) {
            (Some(sbom), None) => Self::success(outcome.input, sbom, outcome.cached, sbom_path),
            (_, Some(error)) => Self::failure(outcome.input, error),
            (None, None) => Self::failure(
                outcome.input,
                &SbomIndexerError::Channel("no sbom produced".to_owned()),
            ),
        }
    }

    fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Index command report.
#[derive(Debug, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub failed: usize,
    pub cached: usize,
    pub images: Vec<ImageEntry>,
}

impl IndexReport {
    fn new(images: Vec<ImageEntry>) -> Self {
        let indexed = images.iter().filter(|e| e.is_success()).count();
        let cached = images.iter().filter(|e| e.cached).count();
        Self {
            failed: images.len() - indexed,
            indexed,
            cached,
            images,
        }
    }
}

impl Render for IndexReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let summary = format!(
            "{} indexed, {} failed ({} from cache)",
            self.indexed, self.failed, self.cached
        );
        if self.failed > 0 {
            writeln!(w, "Images: {}", summary.red().bold())?;
        } else {
            writeln!(w, "Images: {}", summary.green().bold())?;
        }
        writeln!(w)?;

        writeln!(
            w,
            "{:<36} {:<32} {:>8} {:>6} {:<16} Status",
            "Input", "Name", "Packages", "Vulns", "Distro"
        )?;
        writeln!(w, "{}", "-".repeat(110))?;

        for entry in &self.images {
            let status = match (&entry.error, entry.cached) {
                (Some(_), _) => "FAILED".red().bold(),
                (None, true) => "cached".dimmed(),
                (None, false) => "indexed".green(),
            };
            writeln!(
                w,
                "{:<36} {:<32} {:>8} {:>6} {:<16} {}",
                entry.input,
                entry.name.as_deref().unwrap_or("-"),
                entry.packages,
                entry
                    .vulnerabilities
                    .map_or_else(|| "-".to_owned(), |n| n.to_string()),
                entry.distro.as_deref().unwrap_or("-"),
                status
            )?;
        }

        let failures: Vec<_> = self.images.iter().filter(|e| !e.is_success()).collect();
        if !failures.is_empty() {
            writeln!(w)?;
            for entry in failures {
                writeln!(
                    w,
                    "{}: {}",
                    entry.input.bold(),
                    entry.error.as_deref().unwrap_or_default().red()
                )?;
            }
        }

        Ok(())
    }
}
