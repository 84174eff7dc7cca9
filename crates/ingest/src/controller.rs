//! 수집 컨트롤러 — 캡처 스레드의 생명주기 관리
//!
//! 캡처 read는 블로킹이므로 async 태스크가 아닌 전용 OS 스레드에서
//! 돌립니다. 정지는 원자 플래그로 신호하고, 스레드는 read 타임아웃
//! 주기마다 플래그를 확인하므로 stop()은 최대 한 타임아웃 안에
//! 관측됩니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use packetmap_core::error::{PacketmapError, PipelineError};
use packetmap_core::metrics::{CAPTURE_FRAMES_TOTAL, CAPTURE_READ_ERRORS_TOTAL};
use packetmap_core::pipeline::{HealthStatus, Pipeline};

use crate::capture::SourceOpener;
use crate::classifier::PacketClassifier;

/// 수집 컨트롤러
///
/// start()마다 [`SourceOpener`]로 새 소스를 열고 캡처 스레드를 하나
/// 스폰합니다. 이미 실행 중인 상태에서의 start()는 no-op이므로 캡처
/// 스레드는 어느 시점에도 최대 하나입니다.
pub struct IngestionController {
    opener: Arc<dyn SourceOpener>,
    classifier: Arc<PacketClassifier>,
    stop_flag: Arc<AtomicBool>,
    source_failed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl IngestionController {
    pub fn new(
        opener: Arc<dyn SourceOpener>,
        classifier: Arc<PacketClassifier>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            opener,
            classifier,
            stop_flag: Arc::new(AtomicBool::new(false)),
            source_failed: Arc::new(AtomicBool::new(false)),
            handle: None,
            stop_timeout,
        }
    }

    /// 캡처 스레드가 살아 있는지 여부
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn spawn_capture_thread(&mut self) -> Result<(), PacketmapError> {
        // 오픈 실패는 스레드를 스폰하기 전에 호출자에게 전파
        let mut source = self.opener.open()?;

        // 타임아웃으로 버려진 이전 스레드는 자기 플래그를 계속 보고 있으므로
        // 공유 플래그를 되돌리지 않고 스폰마다 새 플래그를 할당
        self.stop_flag = Arc::new(AtomicBool::new(false));
        self.source_failed = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&self.stop_flag);
        let source_failed = Arc::clone(&self.source_failed);
        let classifier = Arc::clone(&self.classifier);

        let handle = std::thread::Builder::new()
            .name("packetmap-capture".to_owned())
            .spawn(move || {
                debug!("capture thread started");
                loop {
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            metrics::counter!(CAPTURE_FRAMES_TOTAL).increment(1);
                            classifier.observe(&frame);
                        }
                        // 타임아웃 — 정지 플래그 확인 후 계속
                        Ok(None) => {}
                        Err(e) => {
                            metrics::counter!(CAPTURE_READ_ERRORS_TOTAL).increment(1);
                            error!(error = %e, "capture source failed, stopping capture thread");
                            source_failed.store(true, Ordering::Release);
                            break;
                        }
                    }
                }
                debug!("capture thread exited");
            })
            .map_err(|e| PipelineError::InitFailed(format!("capture thread spawn: {e}")))?;

        self.handle = Some(handle);
        Ok(())
    }
}

impl Pipeline for IngestionController {
    /// 캡처 소스를 열고 수집 스레드를 시작합니다.
    ///
    /// 이미 실행 중이면 아무것도 하지 않습니다.
    async fn start(&mut self) -> Result<(), PacketmapError> {
        if self.is_running() {
            debug!("ingestion already running, start is a no-op");
            return Ok(());
        }

        info!("starting ingestion");
        self.spawn_capture_thread()?;
        Ok(())
    }

    /// 정지를 신호하고 캡처 스레드 종료를 기다립니다.
    ///
    /// 스레드가 `stop_timeout` 내에 종료하지 않으면 경고를 남기고
    /// 스레드를 버립니다. 버려진 스레드는 플래그가 이미 설정되어
    /// 있으므로 다음 read 타임아웃에 스스로 종료합니다.
    async fn stop(&mut self) -> Result<(), PacketmapError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        info!("stopping ingestion");
        self.stop_flag.store(true, Ordering::Release);

        let deadline = Instant::now() + self.stop_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "capture thread did not stop in time, abandoning"
                );
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if handle.join().is_err() {
            return Err(PipelineError::TaskFailed("capture thread panicked".to_owned()).into());
        }
        info!("ingestion stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        if self.source_failed.load(Ordering::Acquire) {
            return HealthStatus::Unhealthy("capture source disconnected".to_owned());
        }
        match &self.handle {
            Some(handle) if !handle.is_finished() => HealthStatus::Healthy,
            Some(_) => HealthStatus::Unhealthy("capture thread exited unexpectedly".to_owned()),
            None => HealthStatus::Unhealthy("not running".to_owned()),
        }
    }
}

impl Drop for IngestionController {
    fn drop(&mut self) {
        // stop() 없이 드롭되어도 스레드가 무한히 돌지 않도록 신호만 남김
        self.stop_flag.store(true, Ordering::Release);
    }
}
