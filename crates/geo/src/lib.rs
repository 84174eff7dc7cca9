//! Packetmap 지리 참조 데이터 — 데이터셋 로딩과 조회 인덱스
//!
//! 시작 시 두 CSV(국가, 네트워크 블록)를 [`ReferenceData`]로 로드하고,
//! 이를 읽기 전용 조회 구조인 [`AddressBlockIndex`]와 [`CountryDirectory`]로
//! 변환합니다. 로드 이후 이 크레이트의 모든 구조는 불변입니다.
//!
//! # 데이터 흐름
//! ```text
//! countries.csv ──load──▶ ReferenceData ──build──▶ CountryDirectory
//! blocks.csv    ──load──▶               ──build──▶ AddressBlockIndex
//! ```

pub mod dataset;
pub mod directory;
pub mod index;

pub use dataset::ReferenceData;
pub use directory::CountryDirectory;
pub use index::AddressBlockIndex;
