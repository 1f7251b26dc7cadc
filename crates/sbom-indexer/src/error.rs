//! SBOM 인덱서 에러 타입
//!
//! [`SbomIndexerError`]는 인덱싱 파이프라인 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<SbomIndexerError> for StratumError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **이미지 단위 치명적 에러**: `Acquisition`, `Normalization`, `ReferenceParse`
//! - **비치명적 에러**: `CacheRead` (재계산), `CacheWrite` (결과와 함께 반환),
//!   `Enrichment` (취약점 생략)
//! - **탐지 엔진**: `Engine` (`IndexResult::error`로 운반됨)
//! - **설정**: `Config`
//! - **태스크 통신**: `Channel`
//! - **파일 I/O**: `Io`
//! - **이미지 식별 래퍼**: `Image`

use stratum_core::error::{IndexError, StratumError};

/// SBOM 인덱서 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SbomIndexerError {
    /// 이미지를 가져오거나 읽을 수 없음
    #[error("image acquisition error: {image}: {reason}")]
    Acquisition {
        /// 이미지 식별자 (입력 문자열 또는 경로)
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// 패키지의 레이어 참조를 해석할 수 없음
    #[error("normalization error: {package}: {reason}")]
    Normalization {
        /// 패키지 식별자 (`name@version`)
        package: String,
        /// 실패 사유
        reason: String,
    },

    /// 이미지 참조 문자열 파싱 실패
    #[error("invalid image reference '{reference}': {reason}")]
    ReferenceParse {
        /// 입력된 참조 문자열
        reference: String,
        /// 실패 사유
        reason: String,
    },

    /// 캐시 파일 읽기 또는 파싱 실패
    #[error("cache read error: {path}: {reason}")]
    CacheRead {
        /// 캐시 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 캐시 파일 쓰기 실패
    #[error("cache write error: {path}: {reason}")]
    CacheWrite {
        /// 캐시 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 취약점 조회 실패
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// 탐지 엔진 실행 실패
    #[error("engine error: {engine}: {reason}")]
    Engine {
        /// 엔진 이름
        engine: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 태스크/채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 특정 이미지에 대한 파이프라인 에러
    #[error("{image}: {source}")]
    Image {
        /// 실패한 이미지의 입력 식별자
        image: String,
        /// 원인 에러
        source: Box<SbomIndexerError>,
    },
}

impl SbomIndexerError {
    /// 에러에 이미지 식별자를 붙입니다.
    ///
    /// 이미 `Image`로 감싸진 에러는 다시 감싸지 않습니다.
    pub fn for_image(self, image: impl Into<String>) -> Self {
        match self {
            wrapped @ Self::Image { .. } => wrapped,
            other => Self::Image {
                image: image.into(),
                source: Box::new(other),
            },
        }
    }

    /// `Image` 래퍼를 벗긴 원인 에러를 반환합니다.
    pub fn root(&self) -> &SbomIndexerError {
        match self {
            Self::Image { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<SbomIndexerError> for StratumError {
    fn from(err: SbomIndexerError) -> Self {
        let index_error = match err.root() {
            SbomIndexerError::Acquisition { .. } | SbomIndexerError::Io { .. } => {
                IndexError::Acquisition(err.to_string())
            }
            SbomIndexerError::Normalization { .. } => IndexError::Normalization(err.to_string()),
            SbomIndexerError::ReferenceParse { .. } => IndexError::Reference(err.to_string()),
            _ => IndexError::Failed(err.to_string()),
        };
        StratumError::Index(index_error)
    }
}
