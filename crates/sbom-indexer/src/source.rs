//! 이미지 소스 -- 입력 문자열을 이미지 핸들과 추출 경로로 변환
//!
//! [`ImageSource`] trait은 이미지 획득 방식(레지스트리 pull, 데몬 export 등)을
//! 추상화합니다. 이 크레이트는 이미 디스크에 풀린 이미지 디렉토리를 읽는
//! [`DirectoryImageSource`]만 제공합니다.
//!
//! # 디렉토리 구성
//!
//! ```text
//! <dir>/manifest.json   원본 manifest 바이트
//! <dir>/config.json     원본 image config 바이트
//! <dir>/...             추출된 파일시스템 (탐지 엔진이 읽음)
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SbomIndexerError;
use crate::image::Image;

/// manifest 파일명
pub const MANIFEST_FILE: &str = "manifest.json";

/// config 파일명
pub const CONFIG_FILE: &str = "config.json";

/// 이미지 이름을 담는 manifest 어노테이션 (containerd 규약)
pub const IMAGE_NAME_ANNOTATION: &str = "io.containerd.image.name";

/// 획득된 이미지
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    /// 이미지 핸들
    pub image: Image,
    /// 추출된 파일시스템 경로 (캐시 파일도 여기에 저장됨)
    pub path: PathBuf,
    /// 문서에 기록할 이미지 참조 (알 수 없으면 `None`)
    pub reference: Option<String>,
}

/// 이미지 획득 trait
///
/// 블로킹 I/O를 수행할 수 있으므로 `spawn_blocking` 내에서 호출됩니다.
pub trait ImageSource: Send + Sync {
    /// 입력 문자열에 해당하는 이미지를 획득합니다.
    ///
    /// # Errors
    ///
    /// 이미지를 찾거나 읽을 수 없으면 `Acquisition`
    fn acquire(&self, input: &str) -> Result<AcquiredImage, SbomIndexerError>;
}

/// 추출된 이미지 디렉토리 소스
///
/// 입력 문자열을 디렉토리 경로로 해석합니다. 이미지 참조는 manifest의
/// `io.containerd.image.name` 어노테이션에서 가져옵니다.
#[derive(Debug, Clone, Default)]
pub struct DirectoryImageSource {
    root: Option<PathBuf>,
}

impl DirectoryImageSource {
    /// 입력을 그대로 경로로 사용하는 소스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 상대 입력을 `root` 아래에서 찾는 소스를 생성합니다.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, input: &str) -> PathBuf {
        let path = Path::new(input);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSource for DirectoryImageSource {
    fn acquire(&self, input: &str) -> Result<AcquiredImage, SbomIndexerError> {
        let path = self.resolve(input);
        let image = read_image_dir(&path)?;
        let reference = image
            .annotation(IMAGE_NAME_ANNOTATION)
            .map(str::to_owned)
            .filter(|name| !name.trim().is_empty());
        Ok(AcquiredImage {
            image,
            path,
            reference,
        })
    }
}

/// 추출된 이미지 디렉토리에서 manifest/config를 읽어 핸들을 만듭니다.
///
/// # Errors
///
/// 디렉토리나 파일이 없거나 형식이 잘못되면 `Acquisition`
pub fn read_image_dir(dir: &Path) -> Result<Image, SbomIndexerError> {
    let image_id = dir.display().to_string();

    if !dir.is_dir() {
        return Err(SbomIndexerError::Acquisition {
            image: image_id,
            reason: "not a directory".to_owned(),
        });
    }

    let read = |name: &str| {
        let file = dir.join(name);
        std::fs::read(&file).map_err(|e| SbomIndexerError::Acquisition {
            image: image_id.clone(),
            reason: format!("failed to read {name}: {e}"),
        })
    };

    let raw_manifest = read(MANIFEST_FILE)?;
    let raw_config = read(CONFIG_FILE)?;

    let image = Image::from_raw(raw_manifest, raw_config).map_err(|e| match e {
        SbomIndexerError::Acquisition { reason, .. } => SbomIndexerError::Acquisition {
            image: image_id.clone(),
            reason,
        },
        other => other,
    })?;

    debug!(dir = %image_id, digest = image.digest(), layers = image.layer_count(), "read image directory");
    Ok(image)
}
