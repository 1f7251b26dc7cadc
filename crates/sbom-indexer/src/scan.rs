//! 스캔 오케스트레이터 -- 두 탐지 엔진의 동시 실행
//!
//! 각 엔진은 `spawn_blocking` 워커에서 실행되고 결과를 자신의 oneshot 채널로
//! 보냅니다. 수신 순서는 항상 primary, secondary입니다.
//!
//! 엔진이 에러를 반환하거나, 패닉하거나, 결과 없이 채널을 닫으면
//! 해당 엔진 몫은 `error`가 설정된 빈 [`IndexResult`]가 되고
//! 다른 엔진의 결과는 그대로 진행됩니다.
//! 패닉 복구는 `panic = "unwind"`(기본값) 빌드에서만 동작합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use stratum_core::metrics as m;

use crate::engine::DiscoveryEngine;
use crate::layer::LayerMapping;
use crate::types::IndexResult;

/// 두 엔진의 실행 결과 (수신 순서대로)
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// primary 엔진 결과
    pub primary: IndexResult,
    /// secondary 엔진 결과
    pub secondary: IndexResult,
}

impl ScanOutcome {
    /// 두 엔진 모두 실패했는지 확인합니다.
    pub fn all_failed(&self) -> bool {
        self.primary.is_failed() && self.secondary.is_failed()
    }
}

/// 두 탐지 엔진을 동시에 실행합니다.
#[derive(Clone)]
pub struct ScanOrchestrator {
    primary: Arc<dyn DiscoveryEngine>,
    secondary: Arc<dyn DiscoveryEngine>,
}

impl ScanOrchestrator {
    /// 엔진 쌍으로 오케스트레이터를 생성합니다.
    pub fn new(primary: Arc<dyn DiscoveryEngine>, secondary: Arc<dyn DiscoveryEngine>) -> Self {
        Self { primary, secondary }
    }

    /// primary 엔진 이름
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    /// secondary 엔진 이름
    pub fn secondary_name(&self) -> &str {
        self.secondary.name()
    }

    /// 두 엔진을 실행하고 둘 다 끝날 때까지 기다립니다.
    pub async fn scan(&self, path: &Path, layers: Arc<LayerMapping>) -> ScanOutcome {
        let primary_rx = spawn_engine(
            Arc::clone(&self.primary),
            path.to_path_buf(),
            Arc::clone(&layers),
        );
        let secondary_rx = spawn_engine(Arc::clone(&self.secondary), path.to_path_buf(), layers);

        let primary = receive(self.primary.name(), primary_rx).await;
        let secondary = receive(self.secondary.name(), secondary_rx).await;

        ScanOutcome { primary, secondary }
    }
}

fn spawn_engine(
    engine: Arc<dyn DiscoveryEngine>,
    path: PathBuf,
    layers: Arc<LayerMapping>,
) -> oneshot::Receiver<IndexResult> {
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        debug!(engine = engine.name(), path = %path.display(), "engine started");
        let mut result = engine.index(&path, &layers);
        result.engine = engine.name().to_owned();
        // 수신 측이 사라졌으면 결과를 버린다
        let _ = tx.send(result);
    });
    rx
}

async fn receive(engine: &str, rx: oneshot::Receiver<IndexResult>) -> IndexResult {
    let result = match rx.await {
        Ok(result) => result,
        Err(_) => IndexResult::failed(engine, "engine task ended without a result"),
    };

    match &result.error {
        Some(error) => {
            warn!(engine, error = %error, "engine failed");
            counter!(m::SBOM_INDEXER_ENGINE_FAILURES_TOTAL, m::LABEL_ENGINE => engine.to_owned())
                .increment(1);
        }
        None => debug!(engine, packages = result.packages.len(), "engine finished"),
    }
    result
}
