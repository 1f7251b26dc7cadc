//! Integration tests for the `stratum index` flow.
//!
//! Builds the indexer the way the command does (StratumConfig -> IndexConfig ->
//! SbomIndexerConfig) and runs real engine processes through `sh`.

#![cfg(unix)]

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use stratum_core::config::{EngineCommandConfig, StratumConfig};
use stratum_sbom_indexer::{SbomIndexer, SbomIndexerBuilder, SbomIndexerConfig};

/// Engine process: discards the layer mapping on stdin and prints `output`.
///
/// `sh -c <script> <output> <image dir>` puts the result JSON in `$0`.
fn script_engine(name: &str, packages: &str) -> EngineCommandConfig {
    EngineCommandConfig {
        name: name.to_owned(),
        program: "sh".to_owned(),
        args: vec![
            "-c".to_owned(),
            r#"cat > /dev/null; printf '%s' "$0""#.to_owned(),
            format!(r#"{{"engine":"{name}","packages":[{packages}]}}"#),
        ],
    }
}

fn write_image(dir: &Path) {
    let manifest = json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": format!("sha256:{:064x}", 1),
            "size": 1024
        },
        "layers": [{
            "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
            "digest": format!("sha256:{:064x}", 2),
            "size": 4096
        }],
        "annotations": { "io.containerd.image.name": "docker.io/library/debian:12" }
    });
    let config = json!({
        "architecture": "amd64",
        "os": "linux",
        "rootfs": { "type": "layers", "diff_ids": [format!("sha256:{:064x}", 3)] }
    });
    fs::write(dir.join("manifest.json"), manifest.to_string()).expect("write manifest");
    fs::write(dir.join("config.json"), config.to_string()).expect("write config");
}

fn config_with(primary: EngineCommandConfig, secondary: EngineCommandConfig) -> StratumConfig {
    let mut config = StratumConfig::default();
    config.index.primary_engine = primary;
    config.index.secondary_engine = secondary;
    config.validate().expect("config should be valid");
    config
}

fn indexer_from(config: &StratumConfig) -> SbomIndexer {
    SbomIndexerBuilder::new()
        .config(SbomIndexerConfig::from_core(&config.index))
        .build()
        .expect("indexer should build")
}

#[tokio::test]
async fn test_index_with_command_engines() {
    // Given: two engines that both report curl, one also reports zlib
    let config = config_with(
        script_engine("syft", r#"{"name":"curl","version":"7.88.1","type":"deb"}"#),
        script_engine(
            "trivy",
            r#"{"name":"curl","version":"7.88.1","type":"debian"},{"name":"zlib1g","version":"1.2.13","type":"deb"}"#,
        ),
    );
    let indexer = indexer_from(&config);

    let temp_dir = TempDir::new().expect("should create temp dir");
    write_image(temp_dir.path());

    // When: indexing the directory
    let outcomes = indexer
        .index_all(vec![temp_dir.path().display().to_string()])
        .await;

    // Then: packages are merged and the SBOM is persisted
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert!(outcome.is_success(), "{:?}", outcome.error);
    let sbom = outcome.sbom.as_ref().expect("sbom");
    assert_eq!(sbom.package_count(), 2);
    assert_eq!(sbom.artifacts[0].name, "curl");
    assert_eq!(sbom.artifacts[0].found_by, vec!["syft", "trivy"]);
    assert_eq!(sbom.source.image.name, "docker.io/library/debian");
    assert!(temp_dir.path().join("sbom.json").exists());
}

#[tokio::test]
async fn test_index_with_missing_engine_program() {
    // Given: the primary engine binary does not exist
    let config = config_with(
        EngineCommandConfig {
            name: "syft".to_owned(),
            program: "/nonexistent/stratum/syft-index".to_owned(),
            args: Vec::new(),
        },
        script_engine("trivy", r#"{"name":"bash","version":"5.2.15","type":"deb"}"#),
    );
    let indexer = indexer_from(&config);

    let temp_dir = TempDir::new().expect("should create temp dir");
    write_image(temp_dir.path());

    // When: indexing
    let outcomes = indexer
        .index_all(vec![temp_dir.path().display().to_string()])
        .await;

    // Then: the surviving engine's packages are used
    let sbom = outcomes[0].sbom.as_ref().expect("sbom from surviving engine");
    assert_eq!(sbom.package_count(), 1);
    assert_eq!(sbom.artifacts[0].found_by, vec!["trivy"]);
}

#[tokio::test]
async fn test_no_cache_recomputes_existing_sbom() {
    let mut config = config_with(
        script_engine("syft", r#"{"name":"musl","version":"1.2.4","type":"apk"}"#),
        script_engine("trivy", ""),
    );
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_image(temp_dir.path());
    let input = vec![temp_dir.path().display().to_string()];

    // Given: a first run that persisted the SBOM
    indexer_from(&config).index_all(input.clone()).await;
    assert!(temp_dir.path().join("sbom.json").exists());

    // When: running again with the cache switched off (what --no-cache does)
    config.index.use_cache = false;
    let uncached = indexer_from(&config);
    let outcomes = uncached.index_all(input).await;

    // Then: nothing is served from the cache
    assert!(outcomes[0].is_success());
    assert!(!outcomes[0].cached);
    assert_eq!(uncached.cache_hits(), 0);
}
