//! SBOM 인덱서 오케스트레이터 -- 이미지 단위 파이프라인과 다중 이미지 팬아웃
//!
//! # 내부 아키텍처
//!
//! ```text
//! input --> ImageSource --> Image + path
//!                              |
//!                         SbomCache::lookup --(hit)--------------------------+
//!                              | (miss)                                      |
//!                         LayerMapping                                       |
//!                              |                                             |
//!                  ScanOrchestrator (primary, secondary)                     |
//!                              |                                             |
//!                  PackageNormalizer x2 --> PackageMerger                    |
//!                              |                                             |
//!                         SbomAssembler --> SbomCache::store                 |
//!                              |                                             |
//!                              +----------------> IndexedImage <-------------+
//!                                                      |
//!                                    (index_all) VulnerabilityLookup
//!                                                      |
//!                                            mpsc --> ImageIndexOutcome
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use stratum_core::metrics as m;

use crate::assemble::SbomAssembler;
use crate::cache::{CacheLookup, CacheMiss, SbomCache};
use crate::config::SbomIndexerConfig;
use crate::engine::{CommandEngine, DiscoveryEngine};
use crate::error::SbomIndexerError;
use crate::image::Image;
use crate::layer::LayerMapping;
use crate::merge::{MergePolicy, PackageMerger};
use crate::normalize::PackageNormalizer;
use crate::scan::ScanOrchestrator;
use crate::source::{AcquiredImage, DirectoryImageSource, ImageSource, read_image_dir};
use crate::types::{Descriptor, Sbom};
use crate::vuln::{NoopLookup, VulnerabilityLookup};

/// 문서의 출처
#[derive(Debug)]
pub enum CacheStatus {
    /// 저장된 문서를 재사용함
    Hit,
    /// 새로 계산함
    Miss(CacheMiss),
}

impl CacheStatus {
    /// 캐시 적중 여부
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// 인덱싱된 이미지 한 개
#[derive(Debug)]
pub struct IndexedImage {
    /// 이미지 핸들
    pub image: Image,
    /// 추출 경로
    pub path: PathBuf,
    /// 문서
    pub sbom: Sbom,
    /// 캐시 적중 여부와 미스 사유
    pub cache: CacheStatus,
    /// 캐시 저장 결과 (적중 시 `Ok(())`). 실패해도 `sbom`은 유효합니다.
    pub cache_write: Result<(), SbomIndexerError>,
}

/// 다중 이미지 인덱싱에서 입력 하나의 결과
#[derive(Debug)]
pub struct ImageIndexOutcome {
    /// 입력 문자열
    pub input: String,
    /// 이미지 핸들 (실패 시 `None`)
    pub image: Option<Image>,
    /// 문서 (실패 시 `None`)
    pub sbom: Option<Sbom>,
    /// 캐시 적중 여부
    pub cached: bool,
    /// 실패 사유
    pub error: Option<SbomIndexerError>,
}

impl ImageIndexOutcome {
    fn success(input: String, indexed: IndexedImage) -> Self {
        Self {
            input,
            cached: indexed.cache.is_hit(),
            image: Some(indexed.image),
            sbom: Some(indexed.sbom),
            error: None,
        }
    }

    fn failure(input: String, error: SbomIndexerError) -> Self {
        Self {
            input,
            image: None,
            sbom: None,
            cached: false,
            error: Some(error),
        }
    }

    /// 성공 여부
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// SBOM 인덱서
///
/// 복제 비용이 낮으며, 복제본은 엔진/소스/카운터를 공유합니다.
#[derive(Clone)]
pub struct SbomIndexer {
    config: Arc<SbomIndexerConfig>,
    scan: ScanOrchestrator,
    merger: Arc<PackageMerger>,
    assembler: Arc<SbomAssembler>,
    source: Arc<dyn ImageSource>,
    lookup: Arc<dyn VulnerabilityLookup>,
    /// 성공적으로 인덱싱된 이미지 수
    images_indexed: Arc<AtomicU64>,
    /// 캐시 적중 수
    cache_hits: Arc<AtomicU64>,
    /// 실패한 이미지 수
    images_failed: Arc<AtomicU64>,
}

impl SbomIndexer {
    /// 인덱서 설정
    pub fn config(&self) -> &SbomIndexerConfig {
        &self.config
    }

    /// 문서에 기록되는 디스크립터
    pub fn descriptor(&self) -> &Descriptor {
        self.assembler.descriptor()
    }

    /// 병합 우선 엔진 이름
    pub fn preferred_engine(&self) -> &str {
        self.merger.policy().preferred_engine()
    }

    /// 성공적으로 인덱싱된 이미지 수를 반환합니다.
    pub fn images_indexed(&self) -> u64 {
        self.images_indexed.load(Ordering::Relaxed)
    }

    /// 캐시 적중 수를 반환합니다.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// 실패한 이미지 수를 반환합니다.
    pub fn images_failed(&self) -> u64 {
        self.images_failed.load(Ordering::Relaxed)
    }

    /// 이미지 소스로 이미지를 획득한 뒤 인덱싱합니다.
    ///
    /// # Errors
    ///
    /// 획득, 정규화, 참조 파싱 실패 시 입력 식별자가 붙은 `Image` 에러
    pub async fn index_image(&self, input: &str) -> Result<IndexedImage, SbomIndexerError> {
        let started = Instant::now();
        let result = self.acquire_and_index(input).await;
        self.record(input, &result, started);
        result.map_err(|e| e.for_image(input))
    }

    /// 로컬 추출 디렉토리에서 이미지를 읽어 인덱싱합니다.
    ///
    /// `name`은 문서의 `Source.Image.Name`/`Tags`에 기록할 이미지 참조입니다.
    ///
    /// # Errors
    ///
    /// 획득, 정규화, 참조 파싱 실패 시 경로가 붙은 `Image` 에러
    pub async fn index_path(
        &self,
        path: &Path,
        name: Option<&str>,
    ) -> Result<IndexedImage, SbomIndexerError> {
        let started = Instant::now();
        let input = path.display().to_string();

        let result = self.read_and_index(path, name).await;

        self.record(&input, &result, started);
        result.map_err(|e| e.for_image(input))
    }

    /// 여러 이미지를 동시에 인덱싱하고 취약점 정보를 보강합니다.
    ///
    /// 입력마다 `tokio::spawn` 태스크 하나가 정확히 하나의 결과를 보냅니다.
    /// 모든 태스크 핸들을 기다린 뒤 채널을 비우므로 결과는 입력 수와 같고,
    /// 순서는 완료 순서입니다. 패닉한 태스크는 `Channel` 에러 결과가 됩니다.
    pub async fn index_all(&self, inputs: Vec<String>) -> Vec<ImageIndexOutcome> {
        info!(images = inputs.len(), "indexing images");

        // 모든 송신이 대기 없이 끝나도록 입력 수만큼 용량을 잡는다
        let (tx, mut rx) = mpsc::channel(inputs.len().max(1));
        let mut handles = Vec::with_capacity(inputs.len());

        for input in inputs {
            let indexer = self.clone();
            let tx = tx.clone();
            let task_input = input.clone();
            let handle = tokio::spawn(async move {
                let outcome = indexer.index_and_enrich(task_input).await;
                if tx.send(outcome).await.is_err() {
                    warn!("outcome receiver dropped");
                }
            });
            handles.push((input, handle));
        }
        drop(tx);

        let mut lost = Vec::new();
        for (input, handle) in handles {
            if let Err(e) = handle.await {
                warn!(input = %input, error = %e, "index task failed");
                self.images_failed.fetch_add(1, Ordering::Relaxed);
                let error = SbomIndexerError::Channel(format!("index task failed: {e}"))
                    .for_image(input.as_str());
                lost.push(ImageIndexOutcome::failure(input, error));
            }
        }

        let mut outcomes = Vec::with_capacity(lost.len());
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.extend(lost);

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            images = outcomes.len(),
            failed, "finished indexing images"
        );
        outcomes
    }

    /// 문서에 취약점 정보를 덧붙입니다.
    ///
    /// 조회 실패는 경고만 남기고 `vulnerabilities`를 비워 둡니다.
    pub async fn enrich(&self, sbom: &mut Sbom) {
        let lookup = Arc::clone(&self.lookup);
        let packages = sbom.artifacts.clone();
        let result = tokio::task::spawn_blocking(move || lookup.lookup(&packages))
            .await
            .map_err(|e| SbomIndexerError::Enrichment(format!("lookup task failed: {e}")))
            .and_then(|r| r);

        match result {
            Ok(vulnerabilities) => {
                debug!(
                    vulnerabilities = vulnerabilities.len(),
                    "enriched sbom with vulnerabilities"
                );
                sbom.vulnerabilities = Some(vulnerabilities);
            }
            Err(e) => {
                warn!(image = %sbom.source.image.digest, error = %e, "vulnerability lookup failed");
                sbom.vulnerabilities = None;
            }
        }
    }

    async fn index_and_enrich(&self, input: String) -> ImageIndexOutcome {
        match self.index_image(&input).await {
            Ok(mut indexed) => {
                self.enrich(&mut indexed.sbom).await;
                ImageIndexOutcome::success(input, indexed)
            }
            Err(e) => ImageIndexOutcome::failure(input, e),
        }
    }

    async fn acquire_and_index(&self, input: &str) -> Result<IndexedImage, SbomIndexerError> {
        let source = Arc::clone(&self.source);
        let owned = input.to_owned();
        let AcquiredImage {
            image,
            path,
            reference,
        } = tokio::task::spawn_blocking(move || source.acquire(&owned))
            .await
            .map_err(|e| SbomIndexerError::Channel(format!("spawn_blocking failed: {e}")))??;

        self.index_extracted(image, &path, reference.as_deref()).await
    }

    async fn read_and_index(
        &self,
        path: &Path,
        name: Option<&str>,
    ) -> Result<IndexedImage, SbomIndexerError> {
        let dir = path.to_path_buf();
        let image = tokio::task::spawn_blocking(move || read_image_dir(&dir))
            .await
            .map_err(|e| SbomIndexerError::Channel(format!("spawn_blocking failed: {e}")))??;
        self.index_extracted(image, path, name).await
    }

    /// 획득된 이미지 한 개에 대해 캐시 확인부터 문서 저장까지 수행합니다.
    async fn index_extracted(
        &self,
        image: Image,
        path: &Path,
        name: Option<&str>,
    ) -> Result<IndexedImage, SbomIndexerError> {
        let cache = SbomCache::new(path, &self.config.cache_file_name, self.config.use_cache);

        let miss = match cache.lookup(self.assembler.descriptor()).await {
            CacheLookup::Hit(sbom) => {
                info!(
                    image = image.digest(),
                    path = %path.display(),
                    packages = sbom.package_count(),
                    "reusing cached sbom"
                );
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                counter!(m::SBOM_INDEXER_CACHE_HITS_TOTAL).increment(1);
                return Ok(IndexedImage {
                    image,
                    path: path.to_path_buf(),
                    sbom: *sbom,
                    cache: CacheStatus::Hit,
                    cache_write: Ok(()),
                });
            }
            CacheLookup::Miss(miss) => miss,
        };
        match &miss {
            CacheMiss::Disabled | CacheMiss::Absent => {
                debug!(path = %cache.path().display(), reason = %miss, "cache miss")
            }
            _ => warn!(path = %cache.path().display(), reason = %miss, "ignoring cached sbom"),
        }
        counter!(m::SBOM_INDEXER_CACHE_MISSES_TOTAL, m::LABEL_REASON => miss.label()).increment(1);

        let layers = Arc::new(LayerMapping::from_image(&image));
        debug!(image = image.digest(), layers = layers.len(), "created layer mapping");

        info!(image = image.digest(), path = %path.display(), "indexing image");
        let outcome = self.scan.scan(path, Arc::clone(&layers)).await;
        if outcome.all_failed() {
            return Err(SbomIndexerError::Engine {
                engine: format!(
                    "{}, {}",
                    self.scan.primary_name(),
                    self.scan.secondary_name()
                ),
                reason: "every discovery engine failed".to_owned(),
            });
        }

        let normalizer = PackageNormalizer::new(&layers);
        let primary = normalizer.normalize_result(outcome.primary)?;
        let secondary = normalizer.normalize_result(outcome.secondary)?;

        let artifacts = self.merger.merge(&primary, &secondary);
        let distro = self.merger.merge_distro(&primary, &secondary);
        info!(
            image = image.digest(),
            packages = artifacts.len(),
            distro = distro.as_ref().map(ToString::to_string).unwrap_or_default(),
            "indexed packages"
        );

        let sbom = self.assembler.assemble(artifacts, &image, name, distro)?;
        counter!(m::SBOM_INDEXER_PACKAGES_INDEXED_TOTAL).increment(sbom.package_count() as u64);

        let cache_write = cache.store(&sbom).await;
        if let Err(e) = &cache_write {
            warn!(error = %e, "failed to persist sbom");
        }

        Ok(IndexedImage {
            image,
            path: path.to_path_buf(),
            sbom,
            cache: CacheStatus::Miss(miss),
            cache_write,
        })
    }

    fn record(
        &self,
        input: &str,
        result: &Result<IndexedImage, SbomIndexerError>,
        started: Instant,
    ) {
        let label = match result {
            Ok(_) => {
                self.images_indexed.fetch_add(1, Ordering::Relaxed);
                "success"
            }
            Err(e) => {
                warn!(input, error = %e, "failed to index image");
                self.images_failed.fetch_add(1, Ordering::Relaxed);
                "failure"
            }
        };
        counter!(m::SBOM_INDEXER_IMAGES_INDEXED_TOTAL, m::LABEL_RESULT => label).increment(1);
        histogram!(m::SBOM_INDEXER_INDEX_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }
}

/// SBOM 인덱서 빌더
///
/// 엔진, 이미지 소스, 취약점 조회기를 지정하지 않으면 설정의 엔진 명령,
/// [`DirectoryImageSource`], [`NoopLookup`]을 사용합니다.
pub struct SbomIndexerBuilder {
    config: SbomIndexerConfig,
    engines: Option<(Arc<dyn DiscoveryEngine>, Arc<dyn DiscoveryEngine>)>,
    source: Option<Arc<dyn ImageSource>>,
    lookup: Option<Arc<dyn VulnerabilityLookup>>,
    descriptor: Option<Descriptor>,
}

impl SbomIndexerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: SbomIndexerConfig::default(),
            engines: None,
            source: None,
            lookup: None,
            descriptor: None,
        }
    }

    /// 인덱서 설정을 지정합니다.
    pub fn config(mut self, config: SbomIndexerConfig) -> Self {
        self.config = config;
        self
    }

    /// 탐지 엔진 쌍을 지정합니다 (수신 순서: primary, secondary).
    pub fn engines(
        mut self,
        primary: Arc<dyn DiscoveryEngine>,
        secondary: Arc<dyn DiscoveryEngine>,
    ) -> Self {
        self.engines = Some((primary, secondary));
        self
    }

    /// 이미지 소스를 지정합니다.
    pub fn image_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// 취약점 조회기를 지정합니다.
    pub fn vulnerability_lookup(mut self, lookup: Arc<dyn VulnerabilityLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// 문서 디스크립터를 지정합니다. 기본값은 현재 빌드 정보입니다.
    pub fn descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// 인덱서를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패, 엔진 이름 중복, 우선 엔진이 두 엔진 중 어느 것도 아닐 때 `Config`
    pub fn build(self) -> Result<SbomIndexer, SbomIndexerError> {
        self.config.validate()?;

        let (primary, secondary) = match self.engines {
            Some(engines) => engines,
            None => (
                Arc::new(CommandEngine::from_config(&self.config.primary_engine))
                    as Arc<dyn DiscoveryEngine>,
                Arc::new(CommandEngine::from_config(&self.config.secondary_engine))
                    as Arc<dyn DiscoveryEngine>,
            ),
        };

        if primary.name() == secondary.name() {
            return Err(SbomIndexerError::Config {
                field: "engines".to_owned(),
                reason: format!("both engines are named '{}'", primary.name()),
            });
        }

        let preferred = if self.config.preferred_engine.is_empty() {
            primary.name().to_owned()
        } else {
            self.config.preferred_engine.clone()
        };
        if preferred != primary.name() && preferred != secondary.name() {
            return Err(SbomIndexerError::Config {
                field: "preferred_engine".to_owned(),
                reason: format!(
                    "'{preferred}' is neither '{}' nor '{}'",
                    primary.name(),
                    secondary.name()
                ),
            });
        }

        let descriptor = self
            .descriptor
            .unwrap_or_else(|| Descriptor::current().with_name(&self.config.descriptor_name));

        info!(
            primary = primary.name(),
            secondary = secondary.name(),
            preferred = %preferred,
            use_cache = self.config.use_cache,
            descriptor = %descriptor,
            "sbom indexer configured"
        );

        Ok(SbomIndexer {
            scan: ScanOrchestrator::new(primary, secondary),
            merger: Arc::new(PackageMerger::new(MergePolicy::new(preferred))),
            assembler: Arc::new(SbomAssembler::new(descriptor)),
            source: self
                .source
                .unwrap_or_else(|| Arc::new(DirectoryImageSource::new())),
            lookup: self.lookup.unwrap_or_else(|| Arc::new(NoopLookup)),
            config: Arc::new(self.config),
            images_indexed: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            images_failed: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl Default for SbomIndexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
