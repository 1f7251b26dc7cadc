//! 탐지 엔진 -- 추출된 이미지 파일시스템에서 패키지를 찾는 외부 도구
//!
//! [`DiscoveryEngine`] trait은 엔진이 구현해야 하는 인터페이스입니다.
//! 엔진은 블로킹 작업으로 취급되어 `spawn_blocking` 워커에서 실행됩니다.
//!
//! [`CommandEngine`]은 외부 프로그램을 서브프로세스로 실행하는 어댑터입니다.
//!
//! ```text
//! <program> <args...> <추출 경로>
//!   stdin  <- LayerMapping JSON
//!   stdout -> IndexResult JSON
//! ```

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use stratum_core::config::EngineCommandConfig;

use crate::error::SbomIndexerError;
use crate::layer::LayerMapping;
use crate::types::IndexResult;

/// 엔진 stderr를 에러 메시지에 포함할 때의 최대 길이
const MAX_STDERR_IN_ERROR: usize = 512;

/// 패키지 탐지 엔진 trait
///
/// 실패는 `IndexResult::error`로 보고하며 패닉하지 않아야 합니다.
pub trait DiscoveryEngine: Send + Sync {
    /// 엔진 이름 (병합 우선순위와 `found_by`에 사용)
    fn name(&self) -> &str;

    /// 추출된 이미지를 스캔합니다.
    ///
    /// # Arguments
    ///
    /// - `path`: 이미지가 추출된 디렉토리
    /// - `layers`: 이미지의 레이어 매핑 (패키지 레이어 참조 해석용)
    fn index(&self, path: &Path, layers: &LayerMapping) -> IndexResult;
}

/// 외부 프로그램 실행 엔진
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    /// 이름과 실행 파일로 엔진을 생성합니다.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// 추출 경로 앞에 붙일 인자를 설정합니다.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// 설정에서 엔진을 생성합니다.
    pub fn from_config(config: &EngineCommandConfig) -> Self {
        Self::new(&config.name, &config.program).with_args(config.args.clone())
    }

    /// 실행 파일
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, path: &Path, layers: &LayerMapping) -> Result<IndexResult, SbomIndexerError> {
        let engine_error = |reason: String| SbomIndexerError::Engine {
            engine: self.name.clone(),
            reason,
        };

        let input = serde_json::to_vec(layers)
            .map_err(|e| engine_error(format!("failed to encode layer mapping: {e}")))?;

        debug!(engine = %self.name, program = %self.program, path = %path.display(), "spawning engine");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| engine_error(format!("failed to spawn '{}': {e}", self.program)))?;

        // 파이프 버퍼가 차서 서로 기다리지 않도록 stdin은 별도 스레드에서 쓴다
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || match stdin.write_all(&input) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| engine_error(format!("failed to wait for engine: {e}")))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(engine = %self.name, error = %e, "failed to write layer mapping to engine")
                }
                Err(_) => warn!(engine = %self.name, "stdin writer thread panicked"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = truncate(stderr.trim(), MAX_STDERR_IN_ERROR);
            return Err(engine_error(format!("exited with {}: {stderr}", output.status)));
        }

        let mut result: IndexResult = serde_json::from_slice(&output.stdout)
            .map_err(|e| engine_error(format!("invalid output: {e}")))?;
        result.engine = self.name.clone();
        Ok(result)
    }
}

impl DiscoveryEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self, path: &Path, layers: &LayerMapping) -> IndexResult {
        match self.run(path, layers) {
            Ok(result) => result,
            Err(e) => IndexResult::failed(&self.name, e.to_string()),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
