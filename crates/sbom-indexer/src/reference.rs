//! 이미지 참조 파싱 -- `[registry/]repository[:tag][@digest]`
//!
//! 문서의 `Source.Image.Name`/`Tags`를 채우기 위해 사용자 또는 이미지 소스가
//! 제공한 이름을 해석합니다. 명시된 레지스트리는 유지하며 기본 레지스트리를
//! 끼워 넣지 않습니다. 태그와 다이제스트가 모두 없으면 암묵적 `latest` 태그입니다.
//! 태그와 다이제스트가 함께 있으면 다이제스트가 식별자가 됩니다.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SbomIndexerError;

/// 태그/다이제스트가 없을 때의 기본 태그
pub const DEFAULT_TAG: &str = "latest";

const MAX_REPOSITORY_LEN: usize = 255;

/// 참조 문법 정규식 모음
struct Grammar {
    path_component: Regex,
    registry: Regex,
    tag: Regex,
    digest: Regex,
}

impl Grammar {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            path_component: Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$")?,
            registry: Regex::new(
                r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*(?::[0-9]+)?$",
            )?,
            tag: Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$")?,
            digest: Regex::new(r"^sha256:[0-9a-f]{64}$")?,
        })
    }
}

static GRAMMAR: LazyLock<Result<Grammar, regex::Error>> = LazyLock::new(Grammar::compile);

/// 참조의 버전 식별자
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// 태그 (명시되지 않았으면 `latest`)
    Tag(String),
    /// 콘텐츠 다이제스트
    Digest(String),
}

/// 파싱된 이미지 참조
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    identifier: Identifier,
}

impl ImageReference {
    /// 참조 문자열을 파싱합니다.
    ///
    /// # Errors
    ///
    /// 형식이 잘못되면 `ReferenceParse`
    pub fn parse(input: &str) -> Result<Self, SbomIndexerError> {
        let fail = |reason: &str| SbomIndexerError::ReferenceParse {
            reference: input.to_owned(),
            reason: reason.to_owned(),
        };

        let grammar = GRAMMAR
            .as_ref()
            .map_err(|e| fail(&format!("reference grammar unavailable: {e}")))?;

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(fail("reference is empty"));
        }

        let (name, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                if !grammar.digest.is_match(digest) {
                    return Err(fail("digest must be sha256 followed by 64 lowercase hex digits"));
                }
                (name, Some(digest))
            }
            None => (trimmed, None),
        };

        // 태그 구분자는 마지막 '/' 뒤의 ':' (레지스트리 포트와 구분)
        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &name[split + 1..];
                if !grammar.tag.is_match(tag) {
                    return Err(fail("invalid tag"));
                }
                (&name[..split], Some(tag))
            }
            None => (name, None),
        };

        let (registry, repository) = split_registry(name);
        if let Some(registry) = registry {
            if !grammar.registry.is_match(registry) {
                return Err(fail("invalid registry"));
            }
        }
        if repository.is_empty() {
            return Err(fail("repository is empty"));
        }
        if repository.len() > MAX_REPOSITORY_LEN {
            return Err(fail("repository name is too long"));
        }
        for component in repository.split('/') {
            if component.is_empty() {
                return Err(fail("repository has an empty path component"));
            }
            if !grammar.path_component.is_match(component) {
                return Err(fail(
                    "repository must be lowercase alphanumerics separated by '.', '_', '__' or '-'",
                ));
            }
        }

        let identifier = match (digest, tag) {
            (Some(digest), _) => Identifier::Digest(digest.to_owned()),
            (None, Some(tag)) => Identifier::Tag(tag.to_owned()),
            (None, None) => Identifier::Tag(DEFAULT_TAG.to_owned()),
        };

        Ok(Self {
            registry: registry.map(str::to_owned),
            repository: repository.to_owned(),
            identifier,
        })
    }

    /// 명시된 레지스트리
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// 레지스트리를 제외한 저장소 경로
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// 식별자
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// 문서에 기록되는 이름 (`registry/repository` 또는 `repository`)
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{registry}/{}", self.repository),
            None => self.repository.clone(),
        }
    }

    /// 태그 식별자이면 태그를 반환합니다.
    pub fn tag(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Tag(tag) => Some(tag),
            Identifier::Digest(_) => None,
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Tag(tag) => write!(f, "{}:{tag}", self.name()),
            Identifier::Digest(digest) => write!(f, "{}@{digest}", self.name()),
        }
    }
}

/// 첫 경로 구성요소가 호스트처럼 보이면 레지스트리로 분리합니다.
fn split_registry(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (Some(first), rest)
        }
        _ => (None, name),
    }
}
