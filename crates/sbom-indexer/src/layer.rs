//! 레이어 매핑 -- digest / diff id / 순번 사이의 양방향 대응
//!
//! [`LayerMapping`]은 이미지의 `(ordinal, diff_id, digest)` 삼중쌍 목록에서
//! 다섯 가지 조회 맵을 한 번에 만듭니다. 이미지당 한 번 생성되고 이후에는
//! 읽기 전용으로 두 탐지 엔진과 정규화 단계가 `Arc`로 공유합니다.
//!
//! 같은 레이어가 이미지에 여러 번 나타나면 digest/diff id 기준 조회는
//! 마지막 순번을 가리킵니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::image::Image;

/// 레이어 식별자 사이의 조회 테이블
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMapping {
    by_digest: BTreeMap<String, String>,
    by_diff_id: BTreeMap<String, String>,
    diff_id_by_ordinal: BTreeMap<usize, String>,
    digest_by_ordinal: BTreeMap<usize, String>,
    ordinal_by_diff_id: BTreeMap<String, usize>,
}

impl LayerMapping {
    /// 이미지 핸들에서 매핑을 생성합니다.
    ///
    /// 레이어 수 검증은 [`Image::from_raw`]에서 이미 끝났으므로 실패하지 않습니다.
    pub fn from_image(image: &Image) -> Self {
        Self::from_layers(image.layers())
    }

    /// `(digest, diff_id)` 쌍 목록에서 매핑을 생성합니다. 순번은 목록 순서입니다.
    pub fn from_layers<I, D, F>(layers: I) -> Self
    where
        I: IntoIterator<Item = (D, F)>,
        D: Into<String>,
        F: Into<String>,
    {
        let mut mapping = Self::default();
        for (ordinal, (digest, diff_id)) in layers.into_iter().enumerate() {
            let digest = digest.into();
            let diff_id = diff_id.into();
            mapping.by_digest.insert(digest.clone(), diff_id.clone());
            mapping.by_diff_id.insert(diff_id.clone(), digest.clone());
            mapping.diff_id_by_ordinal.insert(ordinal, diff_id.clone());
            mapping.digest_by_ordinal.insert(ordinal, digest);
            mapping.ordinal_by_diff_id.insert(diff_id, ordinal);
        }
        mapping
    }

    /// 레이어 수
    pub fn len(&self) -> usize {
        self.diff_id_by_ordinal.len()
    }

    /// 레이어가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.diff_id_by_ordinal.is_empty()
    }

    /// digest -> diff id
    pub fn diff_id_for_digest(&self, digest: &str) -> Option<&str> {
        self.by_digest.get(digest).map(String::as_str)
    }

    /// diff id -> digest
    pub fn digest_for_diff_id(&self, diff_id: &str) -> Option<&str> {
        self.by_diff_id.get(diff_id).map(String::as_str)
    }

    /// 순번 -> diff id
    pub fn diff_id_at(&self, ordinal: usize) -> Option<&str> {
        self.diff_id_by_ordinal.get(&ordinal).map(String::as_str)
    }

    /// 순번 -> digest
    pub fn digest_at(&self, ordinal: usize) -> Option<&str> {
        self.digest_by_ordinal.get(&ordinal).map(String::as_str)
    }

    /// diff id -> 순번
    pub fn ordinal_of_diff_id(&self, diff_id: &str) -> Option<usize> {
        self.ordinal_by_diff_id.get(diff_id).copied()
    }

    /// `(ordinal, diff_id, digest)`를 순번 순서로 반환합니다.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.diff_id_by_ordinal
            .iter()
            .zip(self.digest_by_ordinal.values())
            .map(|((ordinal, diff_id), digest)| (*ordinal, diff_id.as_str(), digest.as_str()))
    }
}
