//! 에러 타입 — 도메인별 에러 정의

/// Packetmap 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PacketmapError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 참조 데이터 로딩 에러
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// 캡처 소스 에러
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// 모듈 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 참조 데이터(국가/블록 CSV) 로딩 에러
///
/// 시작 시 참조 데이터를 읽지 못하면 프로세스는 수집 루프에 진입하기 전에
/// 종료해야 합니다 (치명적 에러). 개별 행 단위의 문제는 에러가 아니라
/// 로그와 스킵으로 처리됩니다.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// 데이터 파일을 찾을 수 없음
    #[error("dataset file not found: {path}")]
    FileNotFound { path: String },

    /// CSV 읽기 실패
    #[error("failed to read dataset {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// 로드 결과가 비어 있음 (테이블 전체가 무효)
    #[error("dataset {path} contained no usable rows")]
    Empty { path: String },
}

/// 캡처 소스 에러
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// 네트워크 인터페이스를 찾을 수 없음
    #[error("capture interface not found: {name}")]
    InterfaceNotFound { name: String },

    /// 캡처 소스 오픈 실패 (권한 거부 등)
    #[error("failed to open capture source on {interface}: {reason}")]
    OpenFailed { interface: String, reason: String },

    /// 캡처 소스가 복구 불가능하게 끊어짐
    #[error("capture source disconnected: {0}")]
    Disconnected(String),
}

/// 모듈 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 모듈 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 백그라운드 태스크 실패
    #[error("background task failed: {0}")]
    TaskFailed(String),
}
