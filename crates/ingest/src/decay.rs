//! 감쇠 스케줄러 — 원장의 모든 카운트를 주기적으로 하한까지 깎는 태스크
//!
//! 설정([`DecaySettings`])은 공유 원자값이므로 태스크를 재시작하지 않고
//! 실행 중에 주기·하한·활성화를 바꿀 수 있습니다. 태스크는 100ms
//! 분해능으로 폴링하므로 변경은 한 폴링 주기 안에 반영됩니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use packetmap_core::error::{PacketmapError, PipelineError};
use packetmap_core::pipeline::{HealthStatus, Pipeline};

use crate::ledger::FrequencyLedger;

/// 폴링 분해능 — 설정 변경과 취소가 관측되는 최대 지연
const POLL_QUANTUM: Duration = Duration::from_millis(100);

/// 감쇠 스케줄러의 실행 중 제어 표면
///
/// 모든 필드가 원자값이므로 어느 스레드에서든 잠금 없이 읽고 바꿀 수
/// 있습니다.
#[derive(Debug)]
pub struct DecaySettings {
    enabled: AtomicBool,
    interval_secs: AtomicU64,
    floor: AtomicU64,
}

impl DecaySettings {
    pub fn new(enabled: bool, interval_secs: u64, floor: u64) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            interval_secs: AtomicU64::new(interval_secs),
            floor: AtomicU64::new(floor),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// 감쇠를 켜거나 끕니다. 꺼진 동안 태스크는 대기만 합니다.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.load(Ordering::Acquire).max(1))
    }

    /// 감쇠 주기를 바꿉니다. 0은 1초로 클램프됩니다.
    pub fn set_interval_secs(&self, secs: u64) {
        self.interval_secs.store(secs, Ordering::Release);
    }

    pub fn floor(&self) -> u64 {
        self.floor.load(Ordering::Acquire)
    }

    pub fn set_floor(&self, floor: u64) {
        self.floor.store(floor, Ordering::Release);
    }
}

/// 감쇠 스케줄러
///
/// tokio 태스크 하나를 소유하며 [`Pipeline`] 생명주기를 따릅니다.
pub struct DecayScheduler {
    ledger: Arc<FrequencyLedger>,
    settings: Arc<DecaySettings>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DecayScheduler {
    pub fn new(ledger: Arc<FrequencyLedger>, settings: Arc<DecaySettings>) -> Self {
        Self {
            ledger,
            settings,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// 제어 표면 핸들을 반환합니다.
    pub fn settings(&self) -> Arc<DecaySettings> {
        Arc::clone(&self.settings)
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn run(
        ledger: Arc<FrequencyLedger>,
        settings: Arc<DecaySettings>,
        cancel: CancellationToken,
    ) {
        debug!("decay task started");
        let mut last_tick = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(POLL_QUANTUM) => {}
            }

            // 비활성 중에는 기준 시각을 따라가며 대기만 함 — 재활성화
            // 직후 밀린 감쇠가 몰아서 적용되는 것을 막음
            if !settings.is_enabled() {
                last_tick = Instant::now();
                continue;
            }

            if last_tick.elapsed() >= settings.interval() {
                let floor = settings.floor();
                ledger.decay_all(floor);
                debug!(floor, "decay pass applied");
                last_tick = Instant::now();
            }
        }
        debug!("decay task exited");
    }
}

impl Pipeline for DecayScheduler {
    /// 감쇠 태스크를 스폰합니다. 이미 실행 중이면 no-op입니다.
    async fn start(&mut self) -> Result<(), PacketmapError> {
        if self.is_running() {
            debug!("decay scheduler already running, start is a no-op");
            return Ok(());
        }

        info!(
            interval_secs = self.settings.interval().as_secs(),
            floor = self.settings.floor(),
            enabled = self.settings.is_enabled(),
            "starting decay scheduler"
        );

        self.cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::run(
            Arc::clone(&self.ledger),
            Arc::clone(&self.settings),
            self.cancel.clone(),
        ));
        self.handle = Some(handle);
        Ok(())
    }

    /// 태스크를 취소하고 종료를 기다립니다.
    async fn stop(&mut self) -> Result<(), PacketmapError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        info!("stopping decay scheduler");
        self.cancel.cancel();

        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                Err(PipelineError::TaskFailed(format!("decay task panicked: {e}")).into())
            }
            Err(_) => {
                warn!("decay task did not stop in time, abandoning");
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> HealthStatus {
        match &self.handle {
            Some(handle) if !handle.is_finished() => {
                if self.settings.is_enabled() {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded("decay disabled".to_owned())
                }
            }
            Some(_) => HealthStatus::Unhealthy("decay task exited unexpectedly".to_owned()),
            None => HealthStatus::Unhealthy("not running".to_owned()),
        }
    }
}
