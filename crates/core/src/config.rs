//! 설정 관리 — packetmap.toml 파싱 및 런타임 설정
//!
//! [`PacketmapConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`PACKETMAP_CAPTURE_INTERFACE=eth0` 형식)
//! 3. 설정 파일 (`packetmap.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), packetmap_core::error::PacketmapError> {
//! use packetmap_core::config::PacketmapConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PacketmapConfig::load("packetmap.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PacketmapConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PacketmapError};

/// Packetmap 통합 설정
///
/// `packetmap.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacketmapConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 참조 데이터 설정
    #[serde(default)]
    pub geo: GeoConfig,
    /// 캡처/수집 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 감쇠 스케줄러 설정
    #[serde(default)]
    pub decay: DecayConfig,
    /// 관측 리포터 설정
    #[serde(default)]
    pub reporter: ReporterConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PacketmapConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PacketmapError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PacketmapError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PacketmapError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PacketmapError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PacketmapError> {
        toml::from_str(toml_str).map_err(|e| {
            PacketmapError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PACKETMAP_{SECTION}_{FIELD}`
    /// 예: `PACKETMAP_CAPTURE_INTERFACE=eth0`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PACKETMAP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PACKETMAP_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "PACKETMAP_GENERAL_PID_FILE");

        // Geo
        override_string(&mut self.geo.countries_csv, "PACKETMAP_GEO_COUNTRIES_CSV");
        override_string(&mut self.geo.blocks_csv, "PACKETMAP_GEO_BLOCKS_CSV");

        // Capture
        override_bool(&mut self.capture.enabled, "PACKETMAP_CAPTURE_ENABLED");
        override_string(&mut self.capture.interface, "PACKETMAP_CAPTURE_INTERFACE");
        override_bool(
            &mut self.capture.promiscuous,
            "PACKETMAP_CAPTURE_PROMISCUOUS",
        );
        override_u64(
            &mut self.capture.read_timeout_ms,
            "PACKETMAP_CAPTURE_READ_TIMEOUT_MS",
        );
        override_u64(
            &mut self.capture.stop_timeout_ms,
            "PACKETMAP_CAPTURE_STOP_TIMEOUT_MS",
        );

        // Decay
        override_bool(&mut self.decay.enabled, "PACKETMAP_DECAY_ENABLED");
        override_u64(&mut self.decay.interval_secs, "PACKETMAP_DECAY_INTERVAL_SECS");
        override_u64(&mut self.decay.floor, "PACKETMAP_DECAY_FLOOR");

        // Reporter
        override_bool(&mut self.reporter.enabled, "PACKETMAP_REPORTER_ENABLED");
        override_u64(
            &mut self.reporter.interval_secs,
            "PACKETMAP_REPORTER_INTERVAL_SECS",
        );
        override_usize(&mut self.reporter.top, "PACKETMAP_REPORTER_TOP");

        // Metrics
        override_bool(&mut self.metrics.enabled, "PACKETMAP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "PACKETMAP_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "PACKETMAP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PacketmapError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 참조 데이터 경로 검증
        if self.geo.countries_csv.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "geo.countries_csv".to_owned(),
                reason: "countries dataset path must not be empty".to_owned(),
            }
            .into());
        }
        if self.geo.blocks_csv.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "geo.blocks_csv".to_owned(),
                reason: "blocks dataset path must not be empty".to_owned(),
            }
            .into());
        }

        // 캡처 타임아웃 검증 — read_timeout은 정지 신호 관측 주기이므로 0 금지
        if self.capture.enabled {
            if self.capture.read_timeout_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "capture.read_timeout_ms".to_owned(),
                    reason: "read timeout must be positive for cooperative stop".to_owned(),
                }
                .into());
            }
            if self.capture.stop_timeout_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "capture.stop_timeout_ms".to_owned(),
                    reason: "stop timeout must be positive".to_owned(),
                }
                .into());
            }
        }

        // 감쇠 주기 검증
        if self.decay.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "decay.interval_secs".to_owned(),
                reason: "decay interval must be positive".to_owned(),
            }
            .into());
        }

        // 리포터 주기 검증
        if self.reporter.enabled {
            if self.reporter.interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "reporter.interval_secs".to_owned(),
                    reason: "reporter interval must be positive".to_owned(),
                }
                .into());
            }
            if self.reporter.top == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "reporter.top".to_owned(),
                    reason: "reporter top must be positive".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (비우면 미사용)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 참조 데이터 설정
///
/// 두 CSV는 시작 시 한 번 로드되고 이후 읽기 전용입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// 국가 테이블 CSV 경로 (geoname_id, country_name, ...)
    pub countries_csv: String,
    /// 네트워크 블록 CSV 경로 (network, geoname_id, ...)
    pub blocks_csv: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            countries_csv: "/var/lib/packetmap/countries.csv".to_owned(),
            blocks_csv: "/var/lib/packetmap/blocks.csv".to_owned(),
        }
    }
}

/// 캡처/수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 감시할 네트워크 인터페이스 (비우면 자동 선택)
    pub interface: String,
    /// promiscuous 모드 여부
    pub promiscuous: bool,
    /// 블로킹 read의 타임아웃 (ms) — 정지 신호 관측 주기
    pub read_timeout_ms: u64,
    /// stop() 시 캡처 스레드 종료 대기 한도 (ms)
    pub stop_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: String::new(),
            promiscuous: false,
            read_timeout_ms: 100,
            stop_timeout_ms: 2000,
        }
    }
}

/// 감쇠 스케줄러 설정
///
/// `enabled`와 `interval_secs`는 실행 중에도 제어 표면을 통해
/// 변경될 수 있으며, 한 폴링 주기 안에 반영됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 감쇠 주기 (초)
    pub interval_secs: u64,
    /// 감쇠 하한 — 카운트가 이 값 아래로 내려가지 않음
    pub floor: u64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            floor: 0,
        }
    }
}

/// 관측 리포터 설정
///
/// 원장 스냅샷을 주기적으로 로그에 노출하는 데몬 태스크입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 폴링 주기 (초)
    pub interval_secs: u64,
    /// 로그에 노출할 상위 국가 수
    pub top: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 1,
            top: 10,
        }
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 리슨 포트
    pub port: u16,
    /// 스크레이프 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9469,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// ─── 환경변수 오버라이드 헬퍼 ────────────────────────────────────────

fn override_string(field: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *field = value;
    }
}

fn override_bool(field: &mut bool, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<bool>() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(var, value, "ignoring non-boolean environment override"),
        }
    }
}

fn override_u64(field: &mut u64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<u64>() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(var, value, "ignoring non-numeric environment override"),
        }
    }
}

fn override_u16(field: &mut u16, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<u16>() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(var, value, "ignoring non-numeric environment override"),
        }
    }
}

fn override_usize(field: &mut usize, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse::<usize>() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(var, value, "ignoring non-numeric environment override"),
        }
    }
}
