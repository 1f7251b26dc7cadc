//! stratum.toml 통합 설정 테스트
//!
//! - stratum.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use serial_test::serial;
use stratum_core::config::StratumConfig;
use stratum_core::error::{ConfigError, StratumError};

// =============================================================================
// stratum.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../stratum.toml.example");
    let config = StratumConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert!(config.index.use_cache);
    assert_eq!(config.index.cache_file_name, "sbom.json");
    assert_eq!(config.index.descriptor_name, "stratum index");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../stratum.toml.example");
    let config = StratumConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_defaults() {
    let content = include_str!("../../../stratum.toml.example");
    let config = StratumConfig::parse(content).expect("should parse");
    let defaults = StratumConfig::default();

    assert_eq!(config.index.primary_engine.name, defaults.index.primary_engine.name);
    assert_eq!(
        config.index.secondary_engine.program,
        defaults.index.secondary_engine.program
    );
    assert_eq!(config.index.preferred_engine, defaults.index.preferred_engine);
}

// =============================================================================
// 파일 로딩
// =============================================================================

#[tokio::test]
#[serial]
async fn load_applies_env_overrides_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stratum.toml");
    std::fs::write(
        &path,
        r#"
[index]
use_cache = true
cache_file_name = "index.json"
"#,
    )
    .unwrap();

    // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
    unsafe { std::env::set_var("STRATUM_INDEX_USE_CACHE", "false") };
    let result = StratumConfig::load(&path).await;
    unsafe { std::env::remove_var("STRATUM_INDEX_USE_CACHE") };

    let config = result.expect("config should load");
    assert!(!config.index.use_cache, "env var must win over file");
    assert_eq!(config.index.cache_file_name, "index.json");
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stratum.toml");
    std::fs::write(&path, "").unwrap();

    // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
    unsafe { std::env::set_var("STRATUM_GENERAL_LOG_FORMAT", "xml") };
    let result = StratumConfig::load(&path).await;
    unsafe { std::env::remove_var("STRATUM_GENERAL_LOG_FORMAT") };

    let err = result.expect_err("invalid log format must be rejected");
    assert!(matches!(
        err,
        StratumError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_malformed_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[index\nuse_cache = true\n").unwrap();

    let err = StratumConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        StratumError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_same_engine_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stratum.toml");
    std::fs::write(
        &path,
        r#"
[index.primary_engine]
name = "trivy"
program = "trivy-index"
"#,
    )
    .unwrap();

    let err = StratumConfig::from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("distinct"));
}
