//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `stratum_`
//! - 모듈명: `sbom_indexer_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(stratum_core::metrics::SBOM_INDEXER_CACHE_HITS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 탐지 엔진 레이블 키
pub const LABEL_ENGINE: &str = "engine";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 캐시 미스 사유 레이블 키
pub const LABEL_REASON: &str = "reason";

// ─── SBOM Indexer 메트릭 ───────────────────────────────────────────

/// SBOM Indexer: 인덱싱을 마친 이미지 수 (counter, label: result)
pub const SBOM_INDEXER_IMAGES_INDEXED_TOTAL: &str = "stratum_sbom_indexer_images_indexed_total";

/// SBOM Indexer: 캐시 적중 수 (counter)
pub const SBOM_INDEXER_CACHE_HITS_TOTAL: &str = "stratum_sbom_indexer_cache_hits_total";

/// SBOM Indexer: 캐시 미스 수 (counter, label: reason)
pub const SBOM_INDEXER_CACHE_MISSES_TOTAL: &str = "stratum_sbom_indexer_cache_misses_total";

/// SBOM Indexer: 탐지 엔진 실패 수 (counter, label: engine)
pub const SBOM_INDEXER_ENGINE_FAILURES_TOTAL: &str = "stratum_sbom_indexer_engine_failures_total";

/// SBOM Indexer: 병합 후 기록된 패키지 수 (counter)
pub const SBOM_INDEXER_PACKAGES_INDEXED_TOTAL: &str =
    "stratum_sbom_indexer_packages_indexed_total";

/// SBOM Indexer: 이미지 하나의 인덱싱 소요 시간 (histogram, 초)
pub const SBOM_INDEXER_INDEX_DURATION_SECONDS: &str =
    "stratum_sbom_indexer_index_duration_seconds";

/// 인덱싱 소요 시간 히스토그램 버킷
///
/// 100ms ~ 600s 범위 (탐지 엔진은 이미지 전체 파일시스템을 읽음)
pub const INDEX_DURATION_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 프로세스 시작 시 한 번 호출합니다. 전역 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SBOM_INDEXER_IMAGES_INDEXED_TOTAL,
        "Total number of images processed by the SBOM indexer"
    );
    describe_counter!(
        SBOM_INDEXER_CACHE_HITS_TOTAL,
        "Total number of images served from a persisted SBOM"
    );
    describe_counter!(
        SBOM_INDEXER_CACHE_MISSES_TOTAL,
        "Total number of cache misses, by reason"
    );
    describe_counter!(
        SBOM_INDEXER_ENGINE_FAILURES_TOTAL,
        "Total number of failed discovery engine invocations"
    );
    describe_counter!(
        SBOM_INDEXER_PACKAGES_INDEXED_TOTAL,
        "Total number of merged packages written to SBOM documents"
    );
    describe_histogram!(
        SBOM_INDEXER_INDEX_DURATION_SECONDS,
        "Time to index a single image in seconds"
    );
}
