//! SBOM 문서 조립
//!
//! 병합된 패키지, 이미지 핸들, 이미지 이름, 배포판 정보를 하나의 [`Sbom`]으로
//! 묶습니다. 원본 manifest/config 바이트는 표준 base64로 임베딩되고,
//! 플랫폼은 config에서, 크기는 manifest의 config 디스크립터에서 가져옵니다.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::SbomIndexerError;
use crate::image::Image;
use crate::reference::ImageReference;
use crate::types::{Descriptor, Distro, Package, SOURCE_TYPE_IMAGE, Sbom, Source, SourceImage};

/// 문서 조립기
#[derive(Debug, Clone)]
pub struct SbomAssembler {
    descriptor: Descriptor,
}

impl SbomAssembler {
    /// 문서에 기록할 디스크립터로 조립기를 생성합니다.
    pub fn new(descriptor: Descriptor) -> Self {
        Self { descriptor }
    }

    /// 현재 빌드 디스크립터
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// 문서를 조립합니다.
    ///
    /// `name`이 없거나 비어 있으면 `Source.Image.Name`은 빈 값이고 태그는 생략됩니다.
    ///
    /// # Errors
    ///
    /// 비어 있지 않은 `name`이 잘못된 참조 형식이면 `ReferenceParse`
    pub fn assemble(
        &self,
        artifacts: Vec<Package>,
        image: &Image,
        name: Option<&str>,
        distro: Option<Distro>,
    ) -> Result<Sbom, SbomIndexerError> {
        let (image_name, tags) = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let reference = ImageReference::parse(name)?;
                let tags = reference.tag().map(|tag| vec![tag.to_owned()]);
                (reference.name(), tags)
            }
            None => (String::new(), None),
        };

        let manifest = image.manifest().clone();
        let config = image.config().clone();
        let platform = config.platform();
        let size = manifest.config.size;

        Ok(Sbom {
            artifacts,
            source: Source {
                source_type: SOURCE_TYPE_IMAGE.to_owned(),
                image: SourceImage {
                    name: image_name,
                    digest: image.digest().to_owned(),
                    tags,
                    manifest,
                    config,
                    raw_manifest: STANDARD.encode(image.raw_manifest()),
                    raw_config: STANDARD.encode(image.raw_config()),
                    distro,
                    platform,
                    size,
                },
            },
            descriptor: self.descriptor.clone(),
            vulnerabilities: None,
        })
    }
}
