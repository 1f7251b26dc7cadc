//! 이미지 핸들 -- 원본 manifest/config 바이트와 파싱 결과
//!
//! [`Image`]는 획득된 이미지 한 개를 나타내는 불변 핸들입니다.
//! 생성 시점에 manifest의 레이어 수와 config의 `rootfs.diff_ids` 수가
//! 같은지 한 번 검증하므로, 이후 단계(레이어 매핑 등)는 실패하지 않습니다.
//!
//! 이미지 다이제스트는 원본 manifest 바이트의 SHA-256입니다.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::SbomIndexerError;
use crate::types::Platform;

/// OCI/Docker 콘텐츠 디스크립터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    /// 미디어 타입
    #[serde(default)]
    pub media_type: String,
    /// blob 다이제스트 (`sha256:<hex>`)
    pub digest: String,
    /// blob 크기 (바이트)
    #[serde(default)]
    pub size: u64,
    /// 대체 다운로드 URL
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// 어노테이션
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// 이미지 manifest (OCI image manifest / Docker v2 schema 2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// 스키마 버전 (항상 2)
    pub schema_version: u32,
    /// 미디어 타입
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// config blob 디스크립터
    pub config: ContentDescriptor,
    /// 레이어 디스크립터 (하위 레이어부터)
    #[serde(default)]
    pub layers: Vec<ContentDescriptor>,
    /// 어노테이션
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// 그 밖의 필드 (보존용)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 이미지 config의 루트 파일시스템 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    /// 항상 `layers`
    #[serde(rename = "type")]
    pub fs_type: String,
    /// 비압축 레이어 해시 (manifest `layers`와 같은 순서)
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// 이미지 config
///
/// 인덱싱에 필요한 필드만 타입으로 꺼내고 나머지는 `extra`에 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// CPU 아키텍처
    #[serde(default)]
    pub architecture: String,
    /// 운영체제
    #[serde(default)]
    pub os: String,
    /// 아키텍처 변형
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// 루트 파일시스템
    pub rootfs: RootFs,
    /// 그 밖의 필드 (보존용)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ImageConfig {
    /// config에서 플랫폼 정보를 추출합니다.
    pub fn platform(&self) -> Platform {
        Platform {
            os: self.os.clone(),
            architecture: self.architecture.clone(),
            variant: self.variant.clone().filter(|v| !v.is_empty()),
        }
    }
}

/// 획득된 이미지 핸들
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    digest: String,
    raw_manifest: Vec<u8>,
    raw_config: Vec<u8>,
    manifest: ImageManifest,
    config: ImageConfig,
}

impl Image {
    /// 원본 manifest/config 바이트로 핸들을 생성합니다.
    ///
    /// # Errors
    ///
    /// - manifest 또는 config가 JSON으로 파싱되지 않으면 `Acquisition`
    /// - manifest 레이어 수와 `rootfs.diff_ids` 수가 다르면 `Acquisition`
    pub fn from_raw(raw_manifest: Vec<u8>, raw_config: Vec<u8>) -> Result<Self, SbomIndexerError> {
        let digest = sha256_digest(&raw_manifest);
        let acquisition = |reason: String| SbomIndexerError::Acquisition {
            image: digest.clone(),
            reason,
        };

        let manifest: ImageManifest = serde_json::from_slice(&raw_manifest)
            .map_err(|e| acquisition(format!("invalid manifest: {e}")))?;
        let config: ImageConfig = serde_json::from_slice(&raw_config)
            .map_err(|e| acquisition(format!("invalid config: {e}")))?;

        let layers = manifest.layers.len();
        let diff_ids = config.rootfs.diff_ids.len();
        if layers != diff_ids {
            return Err(acquisition(format!(
                "manifest lists {layers} layers but config lists {diff_ids} diff ids"
            )));
        }

        Ok(Self {
            digest,
            raw_manifest,
            raw_config,
            manifest,
            config,
        })
    }

    /// manifest 다이제스트 (`sha256:<hex>`)
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// 원본 manifest 바이트
    pub fn raw_manifest(&self) -> &[u8] {
        &self.raw_manifest
    }

    /// 원본 config 바이트
    pub fn raw_config(&self) -> &[u8] {
        &self.raw_config
    }

    /// 파싱된 manifest
    pub fn manifest(&self) -> &ImageManifest {
        &self.manifest
    }

    /// 파싱된 config
    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// 레이어 수
    pub fn layer_count(&self) -> usize {
        self.manifest.layers.len()
    }

    /// `(digest, diff_id)` 쌍을 레이어 순서대로 반환합니다.
    pub fn layers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.manifest
            .layers
            .iter()
            .zip(&self.config.rootfs.diff_ids)
            .map(|(layer, diff_id)| (layer.digest.as_str(), diff_id.as_str()))
    }

    /// manifest 어노테이션 값을 조회합니다.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.manifest.annotations.get(key).map(String::as_str)
    }
}

/// 바이트열의 `sha256:<hex>` 다이제스트를 계산합니다.
pub fn sha256_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    let mut digest = String::with_capacity(7 + hash.len() * 2);
    digest.push_str("sha256:");
    for byte in hash.iter() {
        let _ = write!(digest, "{byte:02x}");
    }
    digest
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_parses_manifest_and_config() {
        let image = fixtures::image(3);
        assert_eq!(image.layer_count(), 3);
        assert_eq!(image.manifest().schema_version, 2);
        assert_eq!(image.manifest().config.size, 1469);
        assert_eq!(image.config().rootfs.diff_ids.len(), 3);
        assert!(image.config().extra.contains_key("config"));
    }

    #[test]
    fn digest_is_sha256_of_raw_manifest() {
        let (manifest, config) = fixtures::raw_image(1);
        let expected = sha256_digest(&manifest);
        let image = Image::from_raw(manifest, config).unwrap();
        assert_eq!(image.digest(), expected);
        assert!(image.digest().starts_with("sha256:"));
        assert_eq!(image.digest().len(), 7 + 64);
    }

    #[test]
    fn sha256_digest_known_value() {
        assert_eq!(
            sha256_digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn layer_count_mismatch_is_acquisition_error() {
        let (manifest, _) = fixtures::raw_image(2);
        let (_, config) = fixtures::raw_image(3);
        let err = Image::from_raw(manifest, config).unwrap_err();
        assert!(matches!(err, SbomIndexerError::Acquisition { .. }));
        assert!(err.to_string().contains("2 layers"));
    }

    #[test]
    fn invalid_manifest_is_acquisition_error() {
        let (_, config) = fixtures::raw_image(1);
        let err = Image::from_raw(b"not json".to_vec(), config).unwrap_err();
        assert!(err.to_string().contains("invalid manifest"));
    }

    #[test]
    fn layers_are_zipped_in_order() {
        let image = fixtures::image(2);
        let layers: Vec<_> = image.layers().collect();
        let (digest0, diff0) = fixtures::layer_pair(0);
        assert_eq!(layers[0], (digest0.as_str(), diff0.as_str()));
        assert_eq!(layers.len(), 2);
    }

    #[test]
    fn platform_from_config() {
        let platform = fixtures::image(1).config().platform();
        assert_eq!(platform.to_string(), "linux/arm64/v8");
    }

    #[test]
    fn manifest_preserves_unknown_fields() {
        let raw = br#"{
            "schemaVersion": 2,
            "config": {"mediaType": "x", "digest": "sha256:00", "size": 1},
            "layers": [],
            "subject": {"digest": "sha256:11"}
        }"#;
        let manifest: ImageManifest = serde_json::from_slice(raw).unwrap();
        assert!(manifest.extra.contains_key("subject"));
        let round = serde_json::to_value(&manifest).unwrap();
        assert_eq!(round["subject"]["digest"], "sha256:11");
    }
}
