//! packetmap-ingest — 패킷 수집 및 빈도 집계
//!
//! 캡처 소스에서 원시 이더넷 프레임을 읽어 TCP 페이로드의 네트워크 블록
//! 토큰을 분류하고, 국가별 활동 빈도를 공유 원장에 누적합니다.
//! 감쇠 스케줄러는 주기적으로 모든 카운트를 하한까지 깎아
//! 스냅샷이 최근 활동을 반영하도록 유지합니다.
//!
//! # 데이터 흐름
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ PacketSource │───▶│ PacketClassifier │───▶│ FrequencyLedger │
//! │ (캡처 스레드) │    │ (프레임 → 국가)   │    │ (Mutex<HashMap>)│
//! └──────────────┘    └──────────────────┘    └────────┬────────┘
//!        ▲                                             │
//!        │ start/stop                       decay_all  │  snapshot
//! ┌──────┴──────────────┐    ┌────────────────┐        │
//! │ IngestionController │    │ DecayScheduler │────────┘
//! │ (Pipeline)          │    │ (Pipeline)     │
//! └─────────────────────┘    └────────────────┘
//! ```

pub mod capture;
pub mod classifier;
pub mod controller;
pub mod decay;
pub mod ledger;

pub use capture::{PacketSource, PnetOpener, SourceOpener};
pub use classifier::{Classification, IgnoreReason, PacketClassifier};
pub use controller::IngestionController;
pub use decay::{DecayScheduler, DecaySettings};
pub use ledger::FrequencyLedger;
