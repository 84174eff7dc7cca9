//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `packetmap_`
//! - 모듈명: `classifier_`, `ledger_`, `capture_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 무시 사유 레이블 키 (not_ipv4, no_payload, unknown_block, ...)
pub const LABEL_REASON: &str = "reason";

// ─── Classifier 메트릭 ────────────────────────────────────────────

/// Classifier: 국가로 분류된 프레임 수 (counter)
pub const CLASSIFIER_OBSERVED_TOTAL: &str = "packetmap_classifier_observed_total";

/// Classifier: 무시된 프레임 수 (counter, label: reason)
pub const CLASSIFIER_IGNORED_TOTAL: &str = "packetmap_classifier_ignored_total";

// ─── Ledger 메트릭 ────────────────────────────────────────────────

/// Ledger: 누적 increment 횟수 (counter)
pub const LEDGER_INCREMENTS_TOTAL: &str = "packetmap_ledger_increments_total";

/// Ledger: 감쇠 패스 횟수 (counter)
pub const LEDGER_DECAY_TICKS_TOTAL: &str = "packetmap_ledger_decay_ticks_total";

/// Ledger: 현재 추적 중인 국가 수 (gauge)
pub const LEDGER_TRACKED_COUNTRIES: &str = "packetmap_ledger_tracked_countries";

// ─── Capture 메트릭 ───────────────────────────────────────────────

/// Capture: 소스에서 읽은 프레임 수 (counter)
pub const CAPTURE_FRAMES_TOTAL: &str = "packetmap_capture_frames_total";

/// Capture: 소스 read 에러 수 (counter)
pub const CAPTURE_READ_ERRORS_TOTAL: &str = "packetmap_capture_read_errors_total";

// ─── Daemon 메트릭 ────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "packetmap_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "packetmap_daemon_build_info";

/// 모든 메트릭의 설명을 recorder에 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        CLASSIFIER_OBSERVED_TOTAL,
        "Frames successfully classified to a country"
    );
    describe_counter!(
        CLASSIFIER_IGNORED_TOTAL,
        "Frames ignored by the classifier, by reason"
    );
    describe_counter!(LEDGER_INCREMENTS_TOTAL, "Ledger increment operations");
    describe_counter!(LEDGER_DECAY_TICKS_TOTAL, "Ledger decay passes applied");
    describe_gauge!(LEDGER_TRACKED_COUNTRIES, "Countries with a ledger record");
    describe_counter!(CAPTURE_FRAMES_TOTAL, "Raw frames read from the capture source");
    describe_counter!(CAPTURE_READ_ERRORS_TOTAL, "Capture source read errors");
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
}
