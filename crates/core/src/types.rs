//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 참조 데이터셋의 행(국가, 네트워크 블록)과 관측 스냅샷 형식을 정의합니다.
//! 로드 이후 [`Country`]와 [`NetworkBlock`]은 불변입니다.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 국가 식별자 — 참조 데이터셋의 기본 키
///
/// 원본 데이터셋의 geoname id를 감싸는 newtype입니다.
/// 시스템 내부에서는 불투명 키로만 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryId(pub u32);

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 네트워크 블록 키 — `"a.b.c.d/prefix"` 토큰의 정규화 형식
///
/// 블록 인덱스 조회는 이 키의 **완전 일치**로만 수행됩니다.
/// prefix 포함 관계(longest-prefix) 매칭은 의도적으로 구현하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    /// 블록 기준 주소
    pub base: Ipv4Addr,
    /// prefix 길이 (0..=32)
    pub prefix: u8,
}

impl BlockKey {
    /// 기준 주소와 prefix 길이로 키를 생성합니다.
    ///
    /// prefix가 32를 넘으면 `None`을 반환합니다.
    pub fn new(base: Ipv4Addr, prefix: u8) -> Option<Self> {
        if prefix > 32 {
            return None;
        }
        Some(Self { base, prefix })
    }
}

impl FromStr for BlockKey {
    type Err = BlockKeyParseError;

    /// `"93.184.216.0/24"` 형식의 토큰을 파싱합니다.
    ///
    /// 공백이나 추가 세그먼트가 있으면 실패합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s.split_once('/').ok_or(BlockKeyParseError)?;
        let base: Ipv4Addr = addr.parse().map_err(|_| BlockKeyParseError)?;
        let prefix: u8 = prefix.parse().map_err(|_| BlockKeyParseError)?;
        BlockKey::new(base, prefix).ok_or(BlockKeyParseError)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// [`BlockKey`] 파싱 실패
///
/// 토큰 불일치는 정상적인 흐름이므로 상세 사유를 담지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockKeyParseError;

impl fmt::Display for BlockKeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid network block token")
    }
}

impl std::error::Error for BlockKeyParseError {}

/// 네트워크 블록 — 주소 범위 하나를 국가 하나에 매핑
///
/// 참조 데이터셋에서 로드되며 이후 읽기 전용입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkBlock {
    /// 블록 키 (기준 주소 + prefix)
    pub key: BlockKey,
    /// 이 블록이 속한 국가
    pub country: CountryId,
}

/// 국가 — 식별자와 표시 이름
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// 국가 식별자 (기본 키)
    pub id: CountryId,
    /// 표시 이름
    pub name: String,
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// 빈도 스냅샷 항목 — 관측자에게 노출되는 읽기 전용 형식
///
/// 원장의 내부 레코드에서 타임스탬프를 제외한 직렬화 가능한 뷰입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    /// 국가 식별자
    pub country: CountryId,
    /// 현재 활동 카운트
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_key_parses_valid_token() {
        let key: BlockKey = "93.184.216.0/24".parse().unwrap();
        assert_eq!(key.base, Ipv4Addr::new(93, 184, 216, 0));
        assert_eq!(key.prefix, 24);
    }

    #[test]
    fn block_key_parses_edge_prefixes() {
        assert!("0.0.0.0/0".parse::<BlockKey>().is_ok());
        assert!("255.255.255.255/32".parse::<BlockKey>().is_ok());
    }

    #[test]
    fn block_key_rejects_bad_tokens() {
        assert!("93.184.216.0".parse::<BlockKey>().is_err()); // prefix 없음
        assert!("93.184.216.0/33".parse::<BlockKey>().is_err()); // prefix 범위 초과
        assert!("93.184.216/24".parse::<BlockKey>().is_err()); // 옥텟 부족
        assert!("not-an-ip/24".parse::<BlockKey>().is_err());
        assert!("93.184.216.0/abc".parse::<BlockKey>().is_err());
        assert!("".parse::<BlockKey>().is_err());
        assert!("2001:db8::/32".parse::<BlockKey>().is_err()); // IPv6 미지원
    }

    #[test]
    fn block_key_display_roundtrip() {
        let key: BlockKey = "10.0.0.0/8".parse().unwrap();
        assert_eq!(key.to_string(), "10.0.0.0/8");
        let reparsed: BlockKey = key.to_string().parse().unwrap();
        assert_eq!(key, reparsed);
    }

    #[test]
    fn block_key_new_rejects_prefix_over_32() {
        assert!(BlockKey::new(Ipv4Addr::LOCALHOST, 33).is_none());
        assert!(BlockKey::new(Ipv4Addr::LOCALHOST, 32).is_some());
    }

    #[test]
    fn country_id_display() {
        assert_eq!(CountryId(6252001).to_string(), "6252001");
    }

    #[test]
    fn country_display() {
        let country = Country {
            id: CountryId(6252001),
            name: "United States".to_owned(),
        };
        let display = country.to_string();
        assert!(display.contains("United States"));
        assert!(display.contains("6252001"));
    }

    #[test]
    fn country_id_serde_is_transparent() {
        let json = serde_json::to_string(&CountryId(42)).unwrap();
        assert_eq!(json, "42");
        let id: CountryId = serde_json::from_str("42").unwrap();
        assert_eq!(id, CountryId(42));
    }

    #[test]
    fn frequency_entry_serializes() {
        let entry = FrequencyEntry {
            country: CountryId(7),
            count: 3,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"country\":7"));
        assert!(json.contains("\"count\":3"));
    }
}
