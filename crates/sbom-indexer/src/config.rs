//! SBOM 인덱서 설정
//!
//! [`SbomIndexerConfig`]는 core의 [`IndexConfig`](stratum_core::config::IndexConfig)에서
//! 파생되며 인덱서가 실제로 사용하는 값만 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use stratum_sbom_indexer::SbomIndexerConfig;
//!
//! // 기본값으로 생성
//! let config = SbomIndexerConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use stratum_sbom_indexer::SbomIndexerConfigBuilder;
//!
//! let config = SbomIndexerConfigBuilder::new()
//!     .use_cache(false)
//!     .preferred_engine("trivy")
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};

use stratum_core::config::{EngineCommandConfig, IndexConfig};

use crate::error::SbomIndexerError;

/// SBOM 인덱서 설정
///
/// # 필드
///
/// - **use_cache**: 저장된 문서 재사용 여부
/// - **cache_file_name**: 추출 경로 아래 캐시 파일명
/// - **descriptor_name**: 문서 디스크립터의 도구 이름
/// - **preferred_engine**: 병합 충돌 시 우선 엔진 (빈 값이면 primary)
/// - **primary_engine** / **secondary_engine**: 탐지 엔진 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomIndexerConfig {
    /// 저장된 문서 재사용 여부
    pub use_cache: bool,
    /// 캐시 파일명
    pub cache_file_name: String,
    /// 디스크립터 도구 이름
    pub descriptor_name: String,
    /// 병합 우선 엔진 이름
    pub preferred_engine: String,
    /// primary 탐지 엔진
    pub primary_engine: EngineCommandConfig,
    /// secondary 탐지 엔진
    pub secondary_engine: EngineCommandConfig,
}

impl Default for SbomIndexerConfig {
    fn default() -> Self {
        Self::from_core(&IndexConfig::default())
    }
}

/// 캐시 파일명 최대 길이
const MAX_FILE_NAME_LEN: usize = 255;

impl SbomIndexerConfig {
    /// core의 `IndexConfig`에서 인덱서 설정을 생성합니다.
    pub fn from_core(core: &IndexConfig) -> Self {
        Self {
            use_cache: core.use_cache,
            cache_file_name: core.cache_file_name.clone(),
            descriptor_name: core.descriptor_name.clone(),
            preferred_engine: core.preferred_engine.clone(),
            primary_engine: core.primary_engine.clone(),
            secondary_engine: core.secondary_engine.clone(),
        }
    }

    /// 실제로 적용되는 우선 엔진 이름을 반환합니다.
    ///
    /// 설정이 비어 있으면 primary 엔진 이름입니다.
    pub fn effective_preferred_engine(&self) -> &str {
        if self.preferred_engine.is_empty() {
            &self.primary_engine.name
        } else {
            &self.preferred_engine
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `cache_file_name`: 비어 있지 않은 단일 파일명 (경로 구분자, `..` 불가)
    /// - `descriptor_name`: 비어 있으면 안 됨
    /// - 엔진 `name`/`program`: 비어 있으면 안 됨, 두 엔진 이름은 서로 달라야 함
    /// - `preferred_engine`: 비어 있거나 두 엔진 중 하나의 이름
    pub fn validate(&self) -> Result<(), SbomIndexerError> {
        let name = &self.cache_file_name;
        if name.is_empty()
            || name.len() > MAX_FILE_NAME_LEN
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
        {
            return Err(SbomIndexerError::Config {
                field: "cache_file_name".to_owned(),
                reason: format!("'{name}' must be a plain file name"),
            });
        }

        if self.descriptor_name.trim().is_empty() {
            return Err(SbomIndexerError::Config {
                field: "descriptor_name".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        for (field, engine) in [
            ("primary_engine", &self.primary_engine),
            ("secondary_engine", &self.secondary_engine),
        ] {
            if engine.name.trim().is_empty() {
                return Err(SbomIndexerError::Config {
                    field: format!("{field}.name"),
                    reason: "must not be empty".to_owned(),
                });
            }
            if engine.program.trim().is_empty() {
                return Err(SbomIndexerError::Config {
                    field: format!("{field}.program"),
                    reason: "must not be empty".to_owned(),
                });
            }
        }

        if self.primary_engine.name == self.secondary_engine.name {
            return Err(SbomIndexerError::Config {
                field: "secondary_engine.name".to_owned(),
                reason: format!(
                    "'{}' is already used by primary_engine",
                    self.secondary_engine.name
                ),
            });
        }

        if !self.preferred_engine.is_empty()
            && self.preferred_engine != self.primary_engine.name
            && self.preferred_engine != self.secondary_engine.name
        {
            return Err(SbomIndexerError::Config {
                field: "preferred_engine".to_owned(),
                reason: format!(
                    "'{}' is neither '{}' nor '{}'",
                    self.preferred_engine, self.primary_engine.name, self.secondary_engine.name
                ),
            });
        }

        Ok(())
    }
}

/// [`SbomIndexerConfig`] 빌더
///
/// 유연한 설정 구성 및 빌드 시 유효성 검증을 제공합니다.
#[derive(Default)]
pub struct SbomIndexerConfigBuilder {
    config: SbomIndexerConfig,
}

impl SbomIndexerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 캐시 사용 여부를 설정합니다.
    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.config.use_cache = enabled;
        self
    }

    /// 캐시 파일명을 설정합니다.
    pub fn cache_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_file_name = name.into();
        self
    }

    /// 디스크립터 도구 이름을 설정합니다.
    pub fn descriptor_name(mut self, name: impl Into<String>) -> Self {
        self.config.descriptor_name = name.into();
        self
    }

    /// 병합 우선 엔진을 설정합니다.
    pub fn preferred_engine(mut self, name: impl Into<String>) -> Self {
        self.config.preferred_engine = name.into();
        self
    }

    /// primary 엔진을 설정합니다.
    pub fn primary_engine(mut self, engine: EngineCommandConfig) -> Self {
        self.config.primary_engine = engine;
        self
    }

    /// secondary 엔진을 설정합니다.
    pub fn secondary_engine(mut self, engine: EngineCommandConfig) -> Self {
        self.config.secondary_engine = engine;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `SbomIndexerError::Config` 반환
    pub fn build(self) -> Result<SbomIndexerConfig, SbomIndexerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
