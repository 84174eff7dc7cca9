//! Packetmap 공통 크레이트 — 타입, 에러, 설정, 생명주기 trait
//!
//! 모든 packetmap 모듈이 공유하는 기반을 정의합니다.
//! 지리 참조 데이터 타입([`types`]), 도메인별 에러([`error`]),
//! `packetmap.toml` 설정([`config`]), 모듈 생명주기 trait([`pipeline`]),
//! 메트릭 이름 상수([`metrics`])를 포함합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{CaptureError, ConfigError, DatasetError, PacketmapError, PipelineError};

// 설정
pub use config::PacketmapConfig;

// 생명주기 trait
pub use pipeline::{HealthStatus, Pipeline};

// 도메인 타입
pub use types::{BlockKey, Country, CountryId, FrequencyEntry, NetworkBlock};
