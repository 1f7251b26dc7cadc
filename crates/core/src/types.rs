//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 인덱서와 CLI가 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 권고 심각도
///
/// 취약점 데이터베이스마다 표기가 달라 [`FromStr`] 구현은 흔한 별칭을 함께 받습니다.
/// 알 수 없는 값은 에러 대신 [`Severity::Unknown`]으로 읽힙니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 권고에 심각도가 없거나 해석할 수 없음
    #[default]
    Unknown,
    Negligible,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// 소문자 표기
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Negligible => "negligible",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "negligible" | "info" | "informational" | "none" => Self::Negligible,
            "low" => Self::Low,
            "medium" | "moderate" => Self::Medium,
            "high" | "important" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 취약점 정보
///
/// 외부 취약점 조회 결과로 SBOM 문서에 덧붙는 레코드입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 취약점 ID (예: CVE-2024-1234, GHSA-xxxx)
    pub id: String,
    /// 권고 출처 (예: nvd, debian, github)
    pub source: String,
    /// 영향받는 패키지의 Package URL
    pub purl: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 영향받는 버전
    pub affected_version: String,
    /// 수정된 버전 (있을 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 취약점 설명
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {} (fixed: {})",
            self.id,
            self.severity,
            self.package,
            self.affected_version,
            self.fixed_version.as_deref().unwrap_or("N/A"),
        )
    }
}
