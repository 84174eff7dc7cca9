//! 참조 데이터셋 로딩 — 국가/블록 CSV를 한 번 읽어 메모리 테이블로 변환
//!
//! 파일 자체를 읽지 못하면 치명적 에러로 전파되어 프로세스가 수집 루프에
//! 진입하기 전에 종료됩니다. 개별 행 단위의 문제(깨진 토큰, 빈 geoname_id)는
//! 원본 데이터셋에 실제로 존재하므로 경고 로그와 함께 스킵합니다.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use packetmap_core::config::GeoConfig;
use packetmap_core::error::DatasetError;
use packetmap_core::types::{BlockKey, Country, CountryId, NetworkBlock};

/// 국가 CSV의 행 형식
///
/// 사용하지 않는 열(locale_code, continent_name 등)은 무시됩니다.
#[derive(Debug, Deserialize)]
struct CountryRow {
    geoname_id: Option<u32>,
    country_name: Option<String>,
}

/// 블록 CSV의 행 형식
///
/// `geoname_id`는 원본 데이터셋에서 비어 있을 수 있습니다 (미배정 블록).
#[derive(Debug, Deserialize)]
struct BlockRow {
    network: String,
    geoname_id: Option<u32>,
}

/// 로드된 참조 데이터 — 조회 구조를 만들기 위한 중간 형식
#[derive(Debug, Clone)]
pub struct ReferenceData {
    /// 국가 테이블
    pub countries: Vec<Country>,
    /// 네트워크 블록 테이블
    pub blocks: Vec<NetworkBlock>,
}

impl ReferenceData {
    /// 설정된 경로에서 두 데이터셋을 로드합니다.
    ///
    /// # 에러
    /// - `DatasetError::FileNotFound`: 파일이 없음
    /// - `DatasetError::ReadFailed`: CSV를 열거나 읽지 못함
    /// - `DatasetError::Empty`: 사용 가능한 행이 하나도 없음
    pub fn load(config: &GeoConfig) -> Result<Self, DatasetError> {
        let countries = load_countries(&config.countries_csv)?;
        let blocks = load_blocks(&config.blocks_csv)?;
        info!(
            countries = countries.len(),
            blocks = blocks.len(),
            "reference datasets loaded"
        );
        Ok(Self { countries, blocks })
    }
}

fn open_reader(path: &str) -> Result<csv::Reader<std::fs::File>, DatasetError> {
    if !Path::new(path).exists() {
        return Err(DatasetError::FileNotFound {
            path: path.to_owned(),
        });
    }
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DatasetError::ReadFailed {
            path: path.to_owned(),
            reason: e.to_string(),
        })
}

fn load_countries(path: &str) -> Result<Vec<Country>, DatasetError> {
    let mut reader = open_reader(path)?;
    let mut countries = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.deserialize::<CountryRow>().enumerate() {
        match row {
            Ok(CountryRow {
                geoname_id: Some(id),
                country_name: Some(name),
            }) if !name.is_empty() => {
                countries.push(Country {
                    id: CountryId(id),
                    name,
                });
            }
            Ok(_) => {
                // geoname_id나 이름이 비어 있는 행 — 대륙 전용 항목 등
                skipped += 1;
            }
            Err(e) => {
                warn!(path, line, error = %e, "skipping malformed country row");
                skipped += 1;
            }
        }
    }

    if countries.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_owned(),
        });
    }
    if skipped > 0 {
        warn!(path, skipped, "country rows skipped during load");
    }
    Ok(countries)
}

fn load_blocks(path: &str) -> Result<Vec<NetworkBlock>, DatasetError> {
    let mut reader = open_reader(path)?;
    let mut blocks = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.deserialize::<BlockRow>().enumerate() {
        match row {
            Ok(BlockRow {
                network,
                geoname_id: Some(id),
            }) => match network.parse::<BlockKey>() {
                Ok(key) => blocks.push(NetworkBlock {
                    key,
                    country: CountryId(id),
                }),
                Err(_) => {
                    // IPv6 블록 등 지원하지 않는 토큰
                    skipped += 1;
                }
            },
            Ok(_) => {
                // geoname_id 미배정 블록
                skipped += 1;
            }
            Err(e) => {
                warn!(path, line, error = %e, "skipping malformed block row");
                skipped += 1;
            }
        }
    }

    if blocks.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_owned(),
        });
    }
    if skipped > 0 {
        warn!(path, skipped, "block rows skipped during load");
    }
    Ok(blocks)
}
