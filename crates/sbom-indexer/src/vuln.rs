//! 취약점 보강 -- 외부 취약점 조회 인터페이스
//!
//! 매칭 알고리즘은 이 크레이트의 범위가 아닙니다. 인덱서는 조립된 문서의
//! 패키지 목록을 [`VulnerabilityLookup`]에 넘기고, 성공하면 결과를
//! `Sbom::vulnerabilities`에 기록합니다. 실패는 로그만 남기고 필드를 비워 둡니다.

use stratum_core::types::Vulnerability;

use crate::error::SbomIndexerError;
use crate::types::Package;

/// 취약점 조회 trait
///
/// 블로킹 I/O를 수행할 수 있으므로 `spawn_blocking` 내에서 호출됩니다.
pub trait VulnerabilityLookup: Send + Sync {
    /// 패키지 목록에 해당하는 취약점을 조회합니다.
    ///
    /// # Errors
    ///
    /// 조회 실패 시 `Enrichment`
    fn lookup(&self, packages: &[Package]) -> Result<Vec<Vulnerability>, SbomIndexerError>;
}

/// 항상 빈 결과를 반환하는 조회기
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookup;

impl VulnerabilityLookup for NoopLookup {
    fn lookup(&self, _packages: &[Package]) -> Result<Vec<Vulnerability>, SbomIndexerError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_lookup_returns_empty() {
        let packages = vec![Package::new("curl", "7.88.1", "deb")];
        assert!(NoopLookup.lookup(&packages).unwrap().is_empty());
    }
}
