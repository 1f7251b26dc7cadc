//! 에러 타입 -- 도메인별 에러 정의

/// Stratum 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StratumError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 이미지 인덱싱 에러
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 이미지 인덱싱 에러
///
/// 인덱서 크레이트의 상세 에러를 이미지 단위 실패 분류로 축약한 형태입니다.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// 이미지를 가져오거나 읽을 수 없음
    #[error("image acquisition failed: {0}")]
    Acquisition(String),

    /// 패키지 정규화 실패 (레이어 참조 해석 불가)
    #[error("package normalization failed: {0}")]
    Normalization(String),

    /// 이미지 참조 파싱 실패
    #[error("invalid image reference: {0}")]
    Reference(String),

    /// 그 밖의 인덱싱 실패
    #[error("indexing failed: {0}")]
    Failed(String),
}
