//! 국가 디렉터리 — 국가 식별자에서 표시용 이름으로의 매핑

use std::collections::HashMap;

use packetmap_core::types::{Country, CountryId};

/// 국가 식별자 → 국가 이름 조회 테이블
///
/// [`AddressBlockIndex`](crate::AddressBlockIndex)와 마찬가지로 로드 후
/// 읽기 전용입니다.
#[derive(Debug, Default)]
pub struct CountryDirectory {
    names: HashMap<CountryId, String>,
}

impl CountryDirectory {
    /// 국가 테이블에서 디렉터리를 구성합니다.
    pub fn from_countries(countries: &[Country]) -> Self {
        let mut names = HashMap::with_capacity(countries.len());
        for country in countries {
            names.insert(country.id, country.name.clone());
        }
        Self { names }
    }

    /// 식별자에 대응하는 국가 이름을 찾습니다.
    ///
    /// 블록 테이블에는 있지만 국가 테이블에 없는 식별자는 `None`입니다.
    pub fn resolve_name(&self, id: CountryId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_id() {
        let directory = CountryDirectory::from_countries(&[
            Country {
                id: CountryId(6252001),
                name: "United States".to_owned(),
            },
            Country {
                id: CountryId(2635167),
                name: "United Kingdom".to_owned(),
            },
        ]);
        assert_eq!(
            directory.resolve_name(CountryId(6252001)),
            Some("United States")
        );
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn unknown_id_is_none() {
        let directory = CountryDirectory::default();
        assert_eq!(directory.resolve_name(CountryId(1)), None);
        assert!(directory.is_empty());
    }
}
