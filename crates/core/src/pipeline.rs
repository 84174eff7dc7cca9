//! 모듈 생명주기 trait — 데몬이 모든 모듈을 동일하게 관리하기 위한 계약
//!
//! 수집 컨트롤러와 감쇠 스케줄러는 모두 [`Pipeline`]을 구현하여
//! `packetmap-daemon`에서 같은 시작/정지/헬스체크 흐름으로 다뤄집니다.
//!
//! # 생명주기
//! ```text
//! Stopped → start() → Running → stop() → Stopped
//! ```
//! `start()`는 이미 Running이면 안전한 no-op이어야 하고 (중복 루프 금지),
//! `stop()`은 협조적 취소를 신호한 뒤 유한 시간 안에 반환해야 합니다.

use serde::Serialize;

use crate::error::PacketmapError;

/// 모듈 생명주기 trait
///
/// 구현체는 내부 백그라운드 태스크/스레드의 소유자이며,
/// `stop()` 이후 잔여 작업이 관측 가능한 부작용을 남기지 않도록 합니다.
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 이미 실행 중이면 no-op입니다.
    fn start(&mut self) -> impl Future<Output = Result<(), PacketmapError>> + Send;

    /// 모듈에 정지를 신호하고 유한 시간 내에 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), PacketmapError>> + Send;

    /// 모듈의 현재 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 모듈 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작하지만 주의 필요
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}
