//! 패키지 정규화 -- 엔진별 원본 레코드를 공통 스키마로 변환
//!
//! 두 탐지 엔진은 생태계 이름, PURL 유무, 레이어 참조 방식이 서로 다릅니다.
//! [`PackageNormalizer`]는 병합 전에 다음을 맞춥니다.
//!
//! - 이름/버전 앞뒤 공백 제거
//! - 생태계 이름 소문자화 및 별칭 통일 (`debian` -> `deb`, `go-module` -> `golang` 등)
//! - PURL이 없으면 `pkg:{type}/{name}@{version}` 생성
//! - 레이어 참조를 [`LayerMapping`]으로 해석하여 순번/diff id/digest 모두 채움
//! - 라이선스, 위치, 의존성, `found_by` 중복 제거 및 정렬
//!
//! 정규화는 멱등입니다. 해석할 수 없거나 서로 모순되는 레이어 참조는
//! `Normalization` 에러로 이미지 전체를 실패시킵니다.

use tracing::{debug, warn};

use crate::error::SbomIndexerError;
use crate::layer::LayerMapping;
use crate::types::{IndexResult, LayerRef, Package};

/// 생태계 이름을 표준 PURL 타입으로 변환합니다.
///
/// 알 수 없는 이름은 소문자화만 합니다.
pub fn normalize_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let canonical = match lowered.as_str() {
        "deb" | "debian" | "dpkg" => "deb",
        "apk" | "alpine" => "apk",
        "pypi" | "python" | "python-pkg" => "pypi",
        "npm" | "node" | "node-pkg" | "javascript" => "npm",
        "golang" | "go" | "go-module" | "gobinary" => "golang",
        "maven" | "java" | "java-archive" | "jar" => "maven",
        "cargo" | "rust" | "rust-crate" | "crate" => "cargo",
        "gem" => "gem",
        "rpm" => "rpm",
        _ => return lowered,
    };
    canonical.to_owned()
}

/// 패키지 정보로 PURL을 생성합니다.
///
/// 예: `make_purl("deb", "curl", "7.88.1")` -> `pkg:deb/curl@7.88.1`
pub fn make_purl(package_type: &str, name: &str, version: &str) -> String {
    if version.is_empty() {
        format!("pkg:{package_type}/{name}")
    } else {
        format!("pkg:{package_type}/{name}@{version}")
    }
}

/// 레이어 매핑을 기준으로 패키지를 정규화합니다.
pub struct PackageNormalizer<'a> {
    layers: &'a LayerMapping,
}

impl<'a> PackageNormalizer<'a> {
    /// 이미지의 레이어 매핑으로 정규화기를 생성합니다.
    pub fn new(layers: &'a LayerMapping) -> Self {
        Self { layers }
    }

    /// 패키지 하나를 정규화합니다.
    ///
    /// # Errors
    ///
    /// 레이어 참조를 해석할 수 없거나 필드끼리 모순되면 `Normalization`
    pub fn normalize(&self, mut package: Package) -> Result<Package, SbomIndexerError> {
        package.name = package.name.trim().to_owned();
        package.version = package.version.trim().to_owned();
        package.package_type = normalize_type(&package.package_type);

        package.purl = package.purl.trim().to_owned();
        if package.purl.is_empty() {
            package.purl = make_purl(&package.package_type, &package.name, &package.version);
        }

        package.layer = match package.layer.take() {
            Some(layer) if !layer.is_empty() => self.resolve_layer(&package, layer)?,
            _ => None,
        };

        sort_dedup(&mut package.licenses);
        sort_dedup(&mut package.locations);
        sort_dedup(&mut package.dependencies);
        sort_dedup(&mut package.found_by);

        Ok(package)
    }

    /// 엔진 결과 전체를 정규화합니다.
    ///
    /// 이름이 비어 있는 레코드는 경고 후 제외합니다. 패키지 순서는 유지됩니다.
    pub fn normalize_result(&self, result: IndexResult) -> Result<IndexResult, SbomIndexerError> {
        let IndexResult {
            engine,
            packages,
            distro,
            error,
        } = result;

        let total = packages.len();
        let mut normalized = Vec::with_capacity(total);
        for package in packages {
            if package.name.trim().is_empty() {
                warn!(engine = %engine, purl = %package.purl, "dropping package without a name");
                continue;
            }
            normalized.push(self.normalize(package)?);
        }
        debug!(engine = %engine, total, kept = normalized.len(), "normalized packages");

        Ok(IndexResult {
            engine,
            packages: normalized,
            distro,
            error,
        })
    }

    /// 설정된 필드 중 하나로 레이어를 찾고 나머지 필드를 채웁니다.
    fn resolve_layer(
        &self,
        package: &Package,
        layer: LayerRef,
    ) -> Result<Option<LayerRef>, SbomIndexerError> {
        let ordinal = layer.ordinal;
        let diff_id = layer.diff_id.filter(|s| !s.trim().is_empty());
        let digest = layer.digest.filter(|s| !s.trim().is_empty());

        let fail = |reason: String| SbomIndexerError::Normalization {
            package: package.label(),
            reason,
        };

        // diff id를 기준 식별자로 삼는다
        let resolved_diff_id = match (&diff_id, &digest, ordinal) {
            (Some(diff_id), _, _) => {
                if self.layers.ordinal_of_diff_id(diff_id).is_none() {
                    return Err(fail(format!("unknown layer diff id {diff_id}")));
                }
                diff_id.clone()
            }
            (None, Some(digest), _) => self
                .layers
                .diff_id_for_digest(digest)
                .map(str::to_owned)
                .ok_or_else(|| fail(format!("unknown layer digest {digest}")))?,
            (None, None, Some(ordinal)) => self
                .layers
                .diff_id_at(ordinal)
                .map(str::to_owned)
                .ok_or_else(|| fail(format!("layer ordinal {ordinal} out of range")))?,
            (None, None, None) => return Ok(None),
        };

        if let Some(digest) = &digest {
            if self.layers.diff_id_for_digest(digest) != Some(resolved_diff_id.as_str()) {
                return Err(fail(format!(
                    "layer digest {digest} does not match diff id {resolved_diff_id}"
                )));
            }
        }

        let resolved_ordinal = match ordinal {
            Some(ordinal) => {
                if self.layers.diff_id_at(ordinal) != Some(resolved_diff_id.as_str()) {
                    return Err(fail(format!(
                        "layer ordinal {ordinal} does not match diff id {resolved_diff_id}"
                    )));
                }
                ordinal
            }
            None => self
                .layers
                .ordinal_of_diff_id(&resolved_diff_id)
                .ok_or_else(|| fail(format!("unknown layer diff id {resolved_diff_id}")))?,
        };

        let resolved_digest = match digest {
            Some(digest) => digest,
            None => self
                .layers
                .digest_at(resolved_ordinal)
                .map(str::to_owned)
                .ok_or_else(|| fail(format!("layer ordinal {resolved_ordinal} has no digest")))?,
        };

        Ok(Some(LayerRef {
            ordinal: Some(resolved_ordinal),
            diff_id: Some(resolved_diff_id),
            digest: Some(resolved_digest),
        }))
    }
}

fn sort_dedup(values: &mut Vec<String>) {
    values.retain(|v| !v.trim().is_empty());
    values.sort();
    values.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> LayerMapping {
        LayerMapping::from_layers([
            ("sha256:d0", "sha256:a0"),
            ("sha256:d1", "sha256:a1"),
            ("sha256:d2", "sha256:a2"),
        ])
    }

    fn full_layer(i: usize) -> LayerRef {
        LayerRef {
            ordinal: Some(i),
            diff_id: Some(format!("sha256:a{i}")),
            digest: Some(format!("sha256:d{i}")),
        }
    }

    #[test]
    fn normalize_type_aliases() {
        assert_eq!(normalize_type("debian"), "deb");
        assert_eq!(normalize_type("DPKG"), "deb");
        assert_eq!(normalize_type("alpine"), "apk");
        assert_eq!(normalize_type("python"), "pypi");
        assert_eq!(normalize_type("node-pkg"), "npm");
        assert_eq!(normalize_type("go-module"), "golang");
        assert_eq!(normalize_type("gobinary"), "golang");
        assert_eq!(normalize_type("java-archive"), "maven");
        assert_eq!(normalize_type("rust-crate"), "cargo");
        assert_eq!(normalize_type(" RPM "), "rpm");
        assert_eq!(normalize_type("Conda"), "conda");
    }

    #[test]
    fn make_purl_with_and_without_version() {
        assert_eq!(make_purl("deb", "curl", "7.88.1"), "pkg:deb/curl@7.88.1");
        assert_eq!(make_purl("npm", "left-pad", ""), "pkg:npm/left-pad");
    }

    #[test]
    fn derives_purl_and_trims_fields() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let pkg = normalizer
            .normalize(Package::new(" curl ", "7.88.1 ", "debian"))
            .unwrap();
        assert_eq!(pkg.name, "curl");
        assert_eq!(pkg.version, "7.88.1");
        assert_eq!(pkg.package_type, "deb");
        assert_eq!(pkg.purl, "pkg:deb/curl@7.88.1");
    }

    #[test]
    fn keeps_existing_purl() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let mut raw = Package::new("curl", "7.88.1", "deb");
        raw.purl = "pkg:deb/debian/curl@7.88.1?arch=amd64".to_owned();
        let pkg = normalizer.normalize(raw).unwrap();
        assert_eq!(pkg.purl, "pkg:deb/debian/curl@7.88.1?arch=amd64");
    }

    #[test]
    fn resolves_layer_from_each_single_field() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);

        let from_ordinal = LayerRef {
            ordinal: Some(1),
            ..LayerRef::default()
        };
        let from_diff_id = LayerRef {
            diff_id: Some("sha256:a1".to_owned()),
            ..LayerRef::default()
        };
        let from_digest = LayerRef {
            digest: Some("sha256:d1".to_owned()),
            ..LayerRef::default()
        };

        for layer in [from_ordinal, from_diff_id, from_digest] {
            let pkg = normalizer
                .normalize(Package::new("musl", "1.2.4", "apk").with_layer(layer))
                .unwrap();
            assert_eq!(pkg.layer, Some(full_layer(1)));
        }
    }

    #[test]
    fn unknown_diff_id_is_error() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let layer = LayerRef {
            diff_id: Some("sha256:ff".to_owned()),
            ..LayerRef::default()
        };
        let err = normalizer
            .normalize(Package::new("musl", "1.2.4", "apk").with_layer(layer))
            .unwrap_err();
        assert!(matches!(err, SbomIndexerError::Normalization { .. }));
        assert!(err.to_string().contains("musl@1.2.4"));
    }

    #[test]
    fn out_of_range_ordinal_is_error() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let layer = LayerRef {
            ordinal: Some(9),
            ..LayerRef::default()
        };
        assert!(
            normalizer
                .normalize(Package::new("musl", "1.2.4", "apk").with_layer(layer))
                .is_err()
        );
    }

    #[test]
    fn inconsistent_fields_are_error() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let layer = LayerRef {
            ordinal: Some(0),
            diff_id: Some("sha256:a2".to_owned()),
            digest: None,
        };
        let err = normalizer
            .normalize(Package::new("bash", "5.2", "deb").with_layer(layer))
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let layer = LayerRef {
            ordinal: None,
            diff_id: Some("sha256:a2".to_owned()),
            digest: Some("sha256:d0".to_owned()),
        };
        assert!(
            normalizer
                .normalize(Package::new("bash", "5.2", "deb").with_layer(layer))
                .is_err()
        );
    }

    #[test]
    fn blank_layer_reference_is_dropped() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let layer = LayerRef {
            ordinal: None,
            diff_id: Some(String::new()),
            digest: Some("  ".to_owned()),
        };
        let pkg = normalizer
            .normalize(Package::new("bash", "5.2", "deb").with_layer(layer))
            .unwrap();
        assert_eq!(pkg.layer, None);
    }

    #[test]
    fn empty_layer_reference_is_dropped() {
        let layers = LayerMapping::default();
        let normalizer = PackageNormalizer::new(&layers);
        let pkg = normalizer
            .normalize(Package::new("bash", "5.2", "deb").with_layer(LayerRef::default()))
            .unwrap();
        assert_eq!(pkg.layer, None);
    }

    #[test]
    fn list_fields_are_sorted_and_deduped() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let mut raw = Package::new("openssl", "3.0.11", "deb");
        raw.licenses = vec!["OpenSSL".into(), "Apache-2.0".into(), "OpenSSL".into()];
        raw.locations = vec!["/var/lib/dpkg/status".into(), "".into()];
        raw.found_by = vec!["trivy".into(), "syft".into(), "trivy".into()];
        let pkg = normalizer.normalize(raw).unwrap();
        assert_eq!(pkg.licenses, vec!["Apache-2.0", "OpenSSL"]);
        assert_eq!(pkg.locations, vec!["/var/lib/dpkg/status"]);
        assert_eq!(pkg.found_by, vec!["syft", "trivy"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let mut raw = Package::new(" Flask ", "2.3.3", "python").with_layer(LayerRef {
            digest: Some("sha256:d2".to_owned()),
            ..LayerRef::default()
        });
        raw.dependencies = vec!["werkzeug".into(), "jinja2".into()];
        let once = normalizer.normalize(raw).unwrap();
        let twice = normalizer.normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_result_drops_nameless_and_keeps_order() {
        let layers = mapping();
        let normalizer = PackageNormalizer::new(&layers);
        let result = IndexResult {
            engine: "syft".to_owned(),
            packages: vec![
                Package::new("zlib", "1.3", "apk"),
                Package::new(" ", "0", "apk"),
                Package::new("busybox", "1.36.1", "apk"),
            ],
            distro: None,
            error: None,
        };
        let normalized = normalizer.normalize_result(result).unwrap();
        let names: Vec<_> = normalized.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zlib", "busybox"]);
    }
}
