//! 설정 관리 -- stratum.toml 파싱 및 런타임 설정
//!
//! [`StratumConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STRATUM_INDEX_USE_CACHE=false` 형식)
//! 3. 설정 파일 (`stratum.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), stratum_core::error::StratumError> {
//! use stratum_core::config::StratumConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = StratumConfig::load("stratum.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StratumConfig::parse("[index]\nuse_cache = false")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StratumError};

/// Stratum 통합 설정
///
/// `stratum.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratumConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 이미지 인덱싱 설정
    #[serde(default)]
    pub index: IndexConfig,
}

impl StratumConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StratumError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StratumError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StratumError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StratumError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StratumError> {
        toml::from_str(toml_str).map_err(|e| {
            StratumError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STRATUM_{SECTION}_{FIELD}`
    /// 예: `STRATUM_INDEX_USE_CACHE=false`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STRATUM_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STRATUM_GENERAL_LOG_FORMAT");

        // Index
        override_bool(&mut self.index.use_cache, "STRATUM_INDEX_USE_CACHE");
        override_string(
            &mut self.index.cache_file_name,
            "STRATUM_INDEX_CACHE_FILE_NAME",
        );
        override_string(
            &mut self.index.descriptor_name,
            "STRATUM_INDEX_DESCRIPTOR_NAME",
        );
        override_string(
            &mut self.index.preferred_engine,
            "STRATUM_INDEX_PREFERRED_ENGINE",
        );

        // Engines
        override_string(
            &mut self.index.primary_engine.program,
            "STRATUM_INDEX_PRIMARY_ENGINE_PROGRAM",
        );
        override_csv(
            &mut self.index.primary_engine.args,
            "STRATUM_INDEX_PRIMARY_ENGINE_ARGS",
        );
        override_string(
            &mut self.index.secondary_engine.program,
            "STRATUM_INDEX_SECONDARY_ENGINE_PROGRAM",
        );
        override_csv(
            &mut self.index.secondary_engine.args,
            "STRATUM_INDEX_SECONDARY_ENGINE_ARGS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StratumError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 캐시 파일명은 추출 경로 바로 아래의 단일 파일이어야 함
        let cache_file = self.index.cache_file_name.as_str();
        if cache_file.is_empty()
            || cache_file == "."
            || cache_file == ".."
            || cache_file.contains('/')
            || cache_file.contains('\\')
        {
            return Err(ConfigError::InvalidValue {
                field: "index.cache_file_name".to_owned(),
                reason: "must be a plain file name".to_owned(),
            }
            .into());
        }

        if self.index.descriptor_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "index.descriptor_name".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        for (field, engine) in [
            ("index.primary_engine", &self.index.primary_engine),
            ("index.secondary_engine", &self.index.secondary_engine),
        ] {
            if engine.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{field}.name"),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
            if engine.program.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{field}.program"),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
        }

        if self.index.primary_engine.name == self.index.secondary_engine.name {
            return Err(ConfigError::InvalidValue {
                field: "index.secondary_engine.name".to_owned(),
                reason: format!(
                    "engine names must be distinct (both are '{}')",
                    self.index.primary_engine.name
                ),
            }
            .into());
        }

        // preferred_engine 검증 (빈 값이면 primary 엔진 우선)
        let preferred = self.index.preferred_engine.as_str();
        if !preferred.is_empty()
            && preferred != self.index.primary_engine.name
            && preferred != self.index.secondary_engine.name
        {
            return Err(ConfigError::InvalidValue {
                field: "index.preferred_engine".to_owned(),
                reason: format!(
                    "must be empty or one of: {}, {}",
                    self.index.primary_engine.name, self.index.secondary_engine.name
                ),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 이미지 인덱싱 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// 저장된 SBOM 재사용 여부
    pub use_cache: bool,
    /// 추출 경로 아래 캐시 파일명
    pub cache_file_name: String,
    /// SBOM 디스크립터에 기록되는 도구 이름
    pub descriptor_name: String,
    /// 병합 충돌 시 우선하는 엔진 이름 (빈 값이면 primary)
    pub preferred_engine: String,
    /// 먼저 수신하는 탐지 엔진
    pub primary_engine: EngineCommandConfig,
    /// 두 번째로 수신하는 탐지 엔진
    pub secondary_engine: EngineCommandConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_file_name: "sbom.json".to_owned(),
            descriptor_name: "stratum index".to_owned(),
            preferred_engine: String::new(),
            primary_engine: EngineCommandConfig {
                name: "syft".to_owned(),
                program: "syft-index".to_owned(),
                args: Vec::new(),
            },
            secondary_engine: EngineCommandConfig {
                name: "trivy".to_owned(),
                program: "trivy-index".to_owned(),
                args: Vec::new(),
            },
        }
    }
}

/// 외부 탐지 엔진 실행 설정
///
/// 엔진은 `<program> <args...> <추출 경로>` 형태로 실행됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCommandConfig {
    /// 엔진 이름 (병합 우선순위와 `found_by`에 사용)
    pub name: String,
    /// 실행 파일 경로
    pub program: String,
    /// 추가 인자
    pub args: Vec<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = StratumConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(config.index.use_cache);
        assert_eq!(config.index.cache_file_name, "sbom.json");
        assert_eq!(config.index.primary_engine.name, "syft");
        assert_eq!(config.index.secondary_engine.name, "trivy");
        assert!(config.index.preferred_engine.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        StratumConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = StratumConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.index.cache_file_name, "sbom.json");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[index]
use_cache = false

[index.secondary_engine]
name = "grype"
program = "/opt/grype-index"
args = ["--quiet"]
"#;
        let config = StratumConfig::parse(toml).unwrap();
        assert!(!config.index.use_cache);
        // primary는 기본값 유지
        assert_eq!(config.index.primary_engine.name, "syft");
        assert_eq!(config.index.secondary_engine.name, "grype");
        assert_eq!(config.index.secondary_engine.args, vec!["--quiet"]);
        config.validate().unwrap();
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = StratumConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            StratumError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = StratumConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_cache_file_with_separator() {
        let mut config = StratumConfig::default();
        config.index.cache_file_name = "../sbom.json".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_file_name"));
    }

    #[test]
    fn validate_rejects_duplicate_engine_names() {
        let mut config = StratumConfig::default();
        config.index.secondary_engine.name = "syft".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn validate_rejects_empty_engine_program() {
        let mut config = StratumConfig::default();
        config.index.primary_engine.program = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("index.primary_engine.program"));
    }

    #[test]
    fn validate_rejects_unknown_preferred_engine() {
        let mut config = StratumConfig::default();
        config.index.preferred_engine = "grype".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("preferred_engine"));

        config.index.preferred_engine = "trivy".to_owned();
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn env_override_bool_valid() {
        let mut config = StratumConfig::default();
        // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
        unsafe { std::env::set_var("STRATUM_INDEX_USE_CACHE", "false") };
        config.apply_env_overrides();
        unsafe { std::env::remove_var("STRATUM_INDEX_USE_CACHE") };
        assert!(!config.index.use_cache);
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = true;
        // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
        unsafe { std::env::set_var("TEST_STRATUM_BOOL_BAD", "nope") };
        override_bool(&mut val, "TEST_STRATUM_BOOL_BAD");
        unsafe { std::env::remove_var("TEST_STRATUM_BOOL_BAD") };
        assert!(val);
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_empty_items() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serial 테스트로 환경변수 동시 접근을 막습니다.
        unsafe { std::env::set_var("TEST_STRATUM_CSV", "--scope, all-layers,,") };
        override_csv(&mut val, "TEST_STRATUM_CSV");
        unsafe { std::env::remove_var("TEST_STRATUM_CSV") };
        assert_eq!(val, vec!["--scope", "all-layers"]);
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_STRATUM_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = StratumConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = StratumConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.index.primary_engine.program, parsed.index.primary_engine.program);
        assert_eq!(config.index.use_cache, parsed.index.use_cache);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = StratumConfig::from_file("/nonexistent/path/stratum.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StratumError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
