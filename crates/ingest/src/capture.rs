//! 캡처 소스 — 원시 이더넷 프레임을 읽는 블로킹 인터페이스
//!
//! 실제 수집은 datalink 채널을 쓰지만, 컨트롤러와 테스트는
//! [`PacketSource`]/[`SourceOpener`] trait만 봅니다. 소스는 블로킹
//! read에 유한한 타임아웃을 가져야 합니다. 타임아웃이 없으면 정지
//! 신호를 관측할 수 없습니다.

use std::time::Duration;

use pnet::datalink::{self, Channel, DataLinkReceiver, NetworkInterface};
use tracing::{debug, info};

use packetmap_core::error::CaptureError;

/// 원시 프레임 소스
///
/// `next_frame()`은 타임아웃까지 블로킹한 뒤 프레임 하나 또는
/// `Ok(None)`(타임아웃, 프레임 없음)을 반환합니다. 에러는 소스가
/// 복구 불가능하게 끊어진 경우에만 반환합니다.
pub trait PacketSource: Send {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;
}

/// 캡처 소스 팩토리
///
/// 컨트롤러는 start()마다 새 소스를 엽니다. 오픈 실패(권한 부족,
/// 인터페이스 없음)는 start()의 에러로 그대로 전파됩니다.
pub trait SourceOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn PacketSource>, CaptureError>;
}

/// datalink 채널 기반 캡처 소스 팩토리
///
/// 인터페이스 이름이 비어 있으면 루프백이 아닌 가동 중 인터페이스를
/// 자동 선택합니다.
pub struct PnetOpener {
    interface: String,
    promiscuous: bool,
    read_timeout: Duration,
}

impl PnetOpener {
    pub fn new(interface: impl Into<String>, promiscuous: bool, read_timeout: Duration) -> Self {
        Self {
            interface: interface.into(),
            promiscuous,
            read_timeout,
        }
    }

    fn select_interface(&self) -> Result<NetworkInterface, CaptureError> {
        let interfaces = datalink::interfaces();
        if self.interface.is_empty() {
            interfaces
                .into_iter()
                .find(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
                .ok_or_else(|| CaptureError::InterfaceNotFound {
                    name: "<auto>".to_owned(),
                })
        } else {
            interfaces
                .into_iter()
                .find(|iface| iface.name == self.interface)
                .ok_or_else(|| CaptureError::InterfaceNotFound {
                    name: self.interface.clone(),
                })
        }
    }
}

impl SourceOpener for PnetOpener {
    fn open(&self) -> Result<Box<dyn PacketSource>, CaptureError> {
        let interface = self.select_interface()?;
        debug!(interface = interface.name.as_str(), "capture interface selected");

        let config = datalink::Config {
            read_timeout: Some(self.read_timeout),
            promiscuous: self.promiscuous,
            ..datalink::Config::default()
        };

        let receiver = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(CaptureError::OpenFailed {
                    interface: interface.name.clone(),
                    reason: "unsupported channel type".to_owned(),
                });
            }
            Err(e) => {
                return Err(CaptureError::OpenFailed {
                    interface: interface.name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        info!(
            interface = interface.name.as_str(),
            promiscuous = self.promiscuous,
            "capture source opened"
        );
        Ok(Box::new(PnetSource { receiver }))
    }
}

/// datalink 채널 기반 캡처 소스
struct PnetSource {
    receiver: Box<dyn DataLinkReceiver>,
}

impl PacketSource for PnetSource {
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        match self.receiver.next() {
            Ok(frame) => Ok(Some(frame.to_vec())),
            Err(e) => match e.kind() {
                // 타임아웃 계열은 프레임 없음 — 호출자가 정지 신호를 확인
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::WouldBlock
                | std::io::ErrorKind::Interrupted => Ok(None),
                _ => Err(CaptureError::Disconnected(e.to_string())),
            },
        }
    }
}
