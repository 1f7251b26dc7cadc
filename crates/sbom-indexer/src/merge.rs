//! 패키지 병합 -- 두 엔진의 정규화된 결과를 하나의 목록으로 합침
//!
//! # 규칙
//!
//! - `(name, version, type)`이 같으면 같은 패키지입니다.
//! - 채워진 구조 항목(의존성, 레이어, 라이선스, 위치) 집합이 다른 쪽을
//!   진부분집합으로 포함하는 레코드가 이깁니다.
//! - 그 외에는 우선 엔진의 레코드가 이기고, 둘 다 우선 엔진이 아니면
//!   이름이 사전순으로 앞서는 엔진이 이깁니다.
//! - 살아남은 레코드의 `found_by`는 양쪽 엔진의 합집합입니다.
//! - 출력은 `(name, version, type)` 순으로 정렬됩니다.
//!
//! 처리 순서를 엔진 순위로 고정하므로 결과는 인자 순서와 무관합니다.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{Distro, IndexResult, Package};

/// 병합 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    preferred_engine: String,
}

impl MergePolicy {
    /// 충돌 시 우선할 엔진 이름으로 정책을 생성합니다.
    pub fn new(preferred_engine: impl Into<String>) -> Self {
        Self {
            preferred_engine: preferred_engine.into(),
        }
    }

    /// 우선 엔진 이름
    pub fn preferred_engine(&self) -> &str {
        &self.preferred_engine
    }

    /// 엔진 순위 (작을수록 우선)
    fn rank<'a>(&self, engine: &'a str) -> (u8, &'a str) {
        if engine == self.preferred_engine {
            (0, engine)
        } else {
            (1, engine)
        }
    }
}

/// 구조 항목 비트
const FACET_DEPENDENCIES: u8 = 1 << 0;
const FACET_LAYER: u8 = 1 << 1;
const FACET_LICENSES: u8 = 1 << 2;
const FACET_LOCATIONS: u8 = 1 << 3;

fn facets(package: &Package) -> u8 {
    let mut mask = 0;
    if !package.dependencies.is_empty() {
        mask |= FACET_DEPENDENCIES;
    }
    if package.layer.is_some() {
        mask |= FACET_LAYER;
    }
    if !package.licenses.is_empty() {
        mask |= FACET_LICENSES;
    }
    if !package.locations.is_empty() {
        mask |= FACET_LOCATIONS;
    }
    mask
}

/// `a`의 항목 집합이 `b`의 항목 집합을 진부분집합으로 포함하는지 확인합니다.
fn is_strict_superset(a: u8, b: u8) -> bool {
    a != b && a & b == b
}

struct Candidate<'a> {
    package: Package,
    engine: &'a str,
}

/// 두 엔진 결과를 병합합니다.
pub struct PackageMerger {
    policy: MergePolicy,
}

impl PackageMerger {
    /// 정책으로 병합기를 생성합니다.
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    /// 병합 정책
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// 두 결과의 패키지를 병합합니다.
    ///
    /// 실패한 결과는 빈 목록으로 취급합니다.
    pub fn merge(&self, first: &IndexResult, second: &IndexResult) -> Vec<Package> {
        let ordered = self.by_rank(first, second);
        let mut merged: BTreeMap<(String, String, String), Candidate<'_>> = BTreeMap::new();
        let mut duplicates = 0usize;

        for result in ordered {
            for package in &result.packages {
                let mut package = package.clone();
                add_engine(&mut package.found_by, &result.engine);
                let key = (
                    package.name.clone(),
                    package.version.clone(),
                    package.package_type.clone(),
                );
                let incoming = Candidate {
                    package,
                    engine: &result.engine,
                };

                match merged.remove(&key) {
                    None => {
                        merged.insert(key, incoming);
                    }
                    Some(existing) => {
                        duplicates += 1;
                        merged.insert(key, self.reconcile(existing, incoming));
                    }
                }
            }
        }

        debug!(
            first = %first.engine,
            second = %second.engine,
            merged = merged.len(),
            duplicates,
            "merged packages"
        );

        merged.into_values().map(|c| c.package).collect()
    }

    /// 배포판 정보를 고릅니다. 우선 엔진의 값이 있으면 그것을 사용합니다.
    pub fn merge_distro(&self, first: &IndexResult, second: &IndexResult) -> Option<Distro> {
        let [better, worse] = self.by_rank(first, second);
        better.distro.clone().or_else(|| worse.distro.clone())
    }

    fn by_rank<'r>(&self, first: &'r IndexResult, second: &'r IndexResult) -> [&'r IndexResult; 2] {
        if self.policy.rank(&second.engine) < self.policy.rank(&first.engine) {
            [second, first]
        } else {
            [first, second]
        }
    }

    fn reconcile<'a>(&self, existing: Candidate<'a>, incoming: Candidate<'a>) -> Candidate<'a> {
        let existing_facets = facets(&existing.package);
        let incoming_facets = facets(&incoming.package);

        let incoming_wins = if is_strict_superset(incoming_facets, existing_facets) {
            true
        } else if is_strict_superset(existing_facets, incoming_facets) {
            false
        } else {
            self.policy.rank(incoming.engine) < self.policy.rank(existing.engine)
        };

        let (mut winner, loser) = if incoming_wins {
            (incoming, existing)
        } else {
            (existing, incoming)
        };

        for engine in loser.package.found_by {
            add_engine(&mut winner.package.found_by, &engine);
        }
        winner
    }
}

fn add_engine(found_by: &mut Vec<String>, engine: &str) {
    if engine.is_empty() {
        return;
    }
    if let Err(pos) = found_by.binary_search_by(|e| e.as_str().cmp(engine)) {
        found_by.insert(pos, engine.to_owned());
    }
}
