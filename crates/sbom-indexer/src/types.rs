//! 도메인 타입 -- SBOM 인덱서 전용 데이터 구조
//!
//! 탐지 엔진 결과([`IndexResult`]), 패키지([`Package`]), 최종 문서([`Sbom`]) 등
//! 파이프라인 전체가 주고받는 타입을 정의합니다.
//!
//! 문서 최상위 필드(`Artifacts`, `Source`, `Descriptor`)는 PascalCase로,
//! 패키지 레코드는 camelCase로 직렬화됩니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use stratum_core::types::Vulnerability;

use crate::image::{ImageConfig, ImageManifest};

/// 문서 스키마 버전
///
/// 직렬화 형식이 바뀌면 올립니다. 값이 다른 캐시 문서는 재사용되지 않습니다.
pub const SBOM_SCHEMA_VERSION: &str = "1";

/// 기본 디스크립터 이름
pub const DEFAULT_DESCRIPTOR_NAME: &str = "stratum index";

/// `Source.Type`에 기록되는 값
pub const SOURCE_TYPE_IMAGE: &str = "image";

/// 패키지가 처음 나타난 이미지 레이어 참조
///
/// 탐지 엔진은 세 필드 중 일부만 채울 수 있습니다.
/// 정규화 이후에는 세 필드가 모두 채워지고 서로 일치합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRef {
    /// 레이어 순번 (0부터)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
    /// 비압축 레이어 해시 (`rootfs.diff_ids`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_id: Option<String>,
    /// 레이어 blob 다이제스트 (manifest `layers[].digest`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl LayerRef {
    /// 모든 필드가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.ordinal.is_none() && self.diff_id.is_none() && self.digest.is_none()
    }
}

/// 소프트웨어 패키지 레코드
///
/// 탐지 엔진이 보고한 원본 레코드와 정규화/병합된 레코드 모두 이 타입을 사용합니다.
/// 병합 식별자는 정규화 후의 `(name, version, type)`입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Package URL (예: `pkg:deb/curl@7.88.1`)
    #[serde(default)]
    pub purl: String,
    /// 패키지 이름
    pub name: String,
    /// 패키지 버전
    #[serde(default)]
    pub version: String,
    /// 패키지 생태계 (정규화 후 `deb`, `apk`, `npm` 등)
    #[serde(rename = "type", default)]
    pub package_type: String,
    /// 패키지를 설치한 레이어
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerRef>,
    /// 라이선스 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
    /// 이미지 내 파일 위치
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    /// 직접 의존하는 패키지 이름
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// 이 패키지를 보고한 엔진 이름
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub found_by: Vec<String>,
    /// 엔진 고유 메타데이터 (추적용으로 보존)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Package {
    /// 이름, 버전, 생태계로 패키지를 생성합니다.
    ///
    /// PURL은 정규화 단계에서 채워집니다.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        package_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            package_type: package_type.into(),
            ..Self::default()
        }
    }

    /// 레이어 참조를 설정합니다.
    pub fn with_layer(mut self, layer: LayerRef) -> Self {
        self.layer = Some(layer);
        self
    }

    /// 병합 식별자 `(name, version, type)`를 반환합니다.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.name, &self.version, &self.package_type)
    }

    /// 로그/에러 메시지용 `name@version` 표기
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.package_type)
    }
}

/// 운영체제 배포판 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Distro {
    /// 배포판 이름 (예: debian, alpine)
    pub os_name: String,
    /// 배포판 버전 (예: 12, 3.19)
    #[serde(default)]
    pub os_version: String,
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.os_version.is_empty() {
            write!(f, "{}", self.os_name)
        } else {
            write!(f, "{} {}", self.os_name, self.os_version)
        }
    }
}

/// 탐지 엔진 한 번의 실행 결과
///
/// 엔진 실패는 `error` 필드로 운반되며 패닉이나 `Err`로 전파되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    /// 엔진 이름
    #[serde(default)]
    pub engine: String,
    /// 발견한 패키지 (엔진이 보고한 순서)
    #[serde(default)]
    pub packages: Vec<Package>,
    /// 배포판 정보
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro: Option<Distro>,
    /// 실패 사유
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexResult {
    /// 실패한 실행 결과를 생성합니다. 패키지는 비어 있습니다.
    pub fn failed(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            packages: Vec::new(),
            distro: None,
            error: Some(reason.into()),
        }
    }

    /// 실행이 실패했는지 확인합니다.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// 문서를 생성한 도구 정보
///
/// 캐시 유효성 판단에 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Descriptor {
    /// 도구 이름
    pub name: String,
    /// 도구 버전
    pub version: String,
    /// 문서 스키마 버전
    pub sbom_version: String,
}

impl Descriptor {
    /// 현재 빌드의 디스크립터를 반환합니다.
    pub fn current() -> Self {
        Self {
            name: DEFAULT_DESCRIPTOR_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            sbom_version: SBOM_SCHEMA_VERSION.to_owned(),
        }
    }

    /// 도구 이름을 바꿉니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 두 디스크립터가 같은 도구 버전과 스키마 버전인지 확인합니다.
    ///
    /// 이름은 비교하지 않습니다.
    pub fn is_compatible_with(&self, other: &Descriptor) -> bool {
        self.version == other.version && self.sbom_version == other.sbom_version
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (sbom {})",
            self.name, self.version, self.sbom_version
        )
    }
}

/// 이미지 플랫폼
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Platform {
    /// 운영체제 (예: linux)
    pub os: String,
    /// CPU 아키텍처 (예: amd64)
    pub architecture: String,
    /// 아키텍처 변형 (예: v8)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

/// 문서에 기록되는 이미지 식별 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceImage {
    /// 저장소 이름 (레지스트리 포함 가능, 태그/다이제스트 제외)
    #[serde(default)]
    pub name: String,
    /// manifest 다이제스트
    pub digest: String,
    /// 태그 목록 (다이제스트 참조이거나 이름이 없으면 생략)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// 파싱된 manifest
    pub manifest: ImageManifest,
    /// 파싱된 config
    pub config: ImageConfig,
    /// 원본 manifest 바이트 (표준 base64)
    pub raw_manifest: String,
    /// 원본 config 바이트 (표준 base64)
    pub raw_config: String,
    /// 배포판 정보
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro: Option<Distro>,
    /// 플랫폼
    pub platform: Platform,
    /// config blob 크기 (바이트)
    pub size: u64,
}

/// 문서의 출처 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    /// 출처 유형 (항상 `image`)
    #[serde(rename = "Type")]
    pub source_type: String,
    /// 이미지 정보
    pub image: SourceImage,
}

/// 이미지 한 개의 SBOM 문서
///
/// 조립 이후에는 취약점 보강(`vulnerabilities`)을 제외하고 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sbom {
    /// 병합된 패키지 목록 (`(name, version, type)` 순 정렬)
    pub artifacts: Vec<Package>,
    /// 출처 정보
    pub source: Source,
    /// 생성 도구 정보
    pub descriptor: Descriptor,
    /// 취약점 조회 결과 (조회하지 않았거나 실패하면 생략)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<Vulnerability>>,
}

impl Sbom {
    /// 패키지 수를 반환합니다.
    pub fn package_count(&self) -> usize {
        self.artifacts.len()
    }
}
