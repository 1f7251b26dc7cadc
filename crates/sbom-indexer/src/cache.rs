//! SBOM 캐시 -- 추출 경로 아래 저장된 문서의 재사용 여부 판단 및 저장
//!
//! 캐시 파일은 `<추출 경로>/<cache_file_name>`(기본 `sbom.json`)입니다.
//! 다음을 모두 만족할 때만 적중입니다.
//!
//! 1. 설정에서 캐시 사용이 켜져 있음
//! 2. 파일이 존재하고 읽을 수 있음
//! 3. [`Sbom`]으로 파싱됨
//! 4. 디스크립터의 도구 버전과 스키마 버전이 현재 빌드와 같음
//!
//! 미스 사유는 [`CacheMiss`]로 구분되며, 어떤 미스든 재계산으로 이어집니다.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SbomIndexerError;
use crate::types::{Descriptor, Sbom};

/// 캐시 미스 사유
#[derive(Debug)]
pub enum CacheMiss {
    /// 설정에서 캐시가 꺼져 있음
    Disabled,
    /// 캐시 파일이 없음
    Absent,
    /// 파일을 읽을 수 없음
    Unreadable(SbomIndexerError),
    /// 파일이 문서 형식이 아님
    Unparsable(SbomIndexerError),
    /// 다른 버전의 도구가 만든 문서
    Stale {
        /// 저장된 문서의 디스크립터
        cached: Descriptor,
    },
}

impl CacheMiss {
    /// 메트릭 레이블용 짧은 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Absent => "absent",
            Self::Unreadable(_) => "unreadable",
            Self::Unparsable(_) => "unparsable",
            Self::Stale { .. } => "stale",
        }
    }
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "cache disabled"),
            Self::Absent => write!(f, "no cached sbom"),
            Self::Unreadable(e) | Self::Unparsable(e) => write!(f, "{e}"),
            Self::Stale { cached } => write!(f, "cached sbom written by {cached}"),
        }
    }
}

/// 캐시 조회 결과
#[derive(Debug)]
pub enum CacheLookup {
    /// 저장된 문서를 그대로 재사용
    Hit(Box<Sbom>),
    /// 재계산 필요
    Miss(CacheMiss),
}

/// 이미지 하나의 캐시 파일
#[derive(Debug, Clone)]
pub struct SbomCache {
    path: PathBuf,
    enabled: bool,
}

impl SbomCache {
    /// 추출 경로와 파일명으로 캐시를 생성합니다.
    pub fn new(extracted: &Path, file_name: &str, enabled: bool) -> Self {
        Self {
            path: extracted.join(file_name),
            enabled,
        }
    }

    /// 캐시 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 저장된 문서를 조회합니다.
    pub async fn lookup(&self, current: &Descriptor) -> CacheLookup {
        if !self.enabled {
            return CacheLookup::Miss(CacheMiss::Disabled);
        }

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CacheLookup::Miss(CacheMiss::Absent);
            }
            Err(e) => {
                return CacheLookup::Miss(CacheMiss::Unreadable(SbomIndexerError::CacheRead {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        let sbom: Sbom = match serde_json::from_slice(&bytes) {
            Ok(sbom) => sbom,
            Err(e) => {
                return CacheLookup::Miss(CacheMiss::Unparsable(SbomIndexerError::CacheRead {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        if !sbom.descriptor.is_compatible_with(current) {
            return CacheLookup::Miss(CacheMiss::Stale {
                cached: sbom.descriptor,
            });
        }

        debug!(path = %self.path.display(), packages = sbom.package_count(), "cache hit");
        CacheLookup::Hit(Box::new(sbom))
    }

    /// 문서를 들여쓰기된 JSON으로 저장합니다. 기존 파일은 덮어씁니다.
    ///
    /// # Errors
    ///
    /// 직렬화 또는 쓰기 실패 시 `CacheWrite`
    pub async fn store(&self, sbom: &Sbom) -> Result<(), SbomIndexerError> {
        let write_error = |reason: String| SbomIndexerError::CacheWrite {
            path: self.path.display().to_string(),
            reason,
        };

        let json = serde_json::to_vec_pretty(sbom).map_err(|e| write_error(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| write_error(e.to_string()))?;

        debug!(path = %self.path.display(), "cached sbom written");
        Ok(())
    }
}
