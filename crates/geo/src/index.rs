//! 주소 블록 인덱스 — CIDR 토큰 문자열의 정확 일치 조회
//!
//! 포함 관계(containment) 매칭이 아닙니다. 수집된 페이로드가 전달하는
//! 토큰이 블록 테이블의 토큰과 글자 그대로 같은 블록을 가리킬 때만
//! 일치합니다. `"1.2.3.0/24"`와 `"1.2.3.4/32"`는 서로 다른 키입니다.

use std::collections::HashMap;

use packetmap_core::types::{BlockKey, CountryId, NetworkBlock};

/// 블록 키 → 국가 식별자 조회 테이블
///
/// 로드 후 읽기 전용이므로 잠금 없이 여러 스레드에서 공유할 수 있습니다.
#[derive(Debug, Default)]
pub struct AddressBlockIndex {
    entries: HashMap<BlockKey, CountryId>,
}

impl AddressBlockIndex {
    /// 블록 테이블에서 인덱스를 구성합니다.
    ///
    /// 같은 키가 여러 번 나타나면 마지막 행이 이깁니다.
    pub fn from_blocks(blocks: &[NetworkBlock]) -> Self {
        let mut entries = HashMap::with_capacity(blocks.len());
        for block in blocks {
            entries.insert(block.key, block.country);
        }
        Self { entries }
    }

    /// CIDR 토큰을 파싱하여 정확히 일치하는 블록의 국가를 찾습니다.
    ///
    /// 파싱 불가능한 토큰과 미등록 블록은 모두 `None`입니다.
    pub fn resolve(&self, token: &str) -> Option<CountryId> {
        let key: BlockKey = token.parse().ok()?;
        self.entries.get(&key).copied()
    }

    /// 파싱된 키로 직접 조회합니다.
    pub fn resolve_key(&self, key: &BlockKey) -> Option<CountryId> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
