//! 패킷 분류기 — 원시 이더넷 프레임에서 국가 관측까지
//!
//! 프레임을 IPv4/TCP로 슬라이스하고, TCP 페이로드를 네트워크 블록 토큰
//! 문자열로 해석한 뒤 블록 인덱스와 국가 디렉터리를 거쳐 빈도 원장에
//! 관측을 기록합니다. 어느 단계에서든 조건을 만족하지 못한 프레임은
//! 사유와 함께 조용히 무시됩니다. 무시는 에러가 아닙니다.

use std::sync::Arc;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use tracing::{debug, warn};

use packetmap_core::metrics::{CLASSIFIER_IGNORED_TOTAL, CLASSIFIER_OBSERVED_TOTAL, LABEL_REASON};
use packetmap_core::types::CountryId;
use packetmap_geo::{AddressBlockIndex, CountryDirectory};

use crate::ledger::FrequencyLedger;

/// 프레임 하나의 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 국가로 분류되어 원장에 기록됨
    Observed(CountryId),
    /// 조건 불충족으로 무시됨
    Ignored(IgnoreReason),
}

/// 프레임이 무시된 사유
///
/// 분류 파이프라인의 단계 순서대로 정의됩니다. 프레임은 처음 실패한
/// 단계의 사유 하나만 가집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// 이더넷 프레임 슬라이스 실패
    MalformedFrame,
    /// IPv4가 아닌 네트워크 계층
    NotIpv4,
    /// TCP가 아닌 전송 계층
    NotTcp,
    /// TCP 페이로드 없음
    EmptyPayload,
    /// 페이로드가 UTF-8 텍스트가 아님
    UndecodablePayload,
    /// 블록 인덱스에 없는 토큰
    UnknownBlock,
    /// 블록은 찾았지만 국가 테이블에 이름이 없음
    UnknownCountry,
}

impl IgnoreReason {
    /// 메트릭 레이블 값으로 쓰이는 고정 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedFrame => "malformed_frame",
            Self::NotIpv4 => "not_ipv4",
            Self::NotTcp => "not_tcp",
            Self::EmptyPayload => "empty_payload",
            Self::UndecodablePayload => "undecodable_payload",
            Self::UnknownBlock => "unknown_block",
            Self::UnknownCountry => "unknown_country",
        }
    }
}

/// 패킷 분류기
///
/// 블록 인덱스와 국가 디렉터리는 읽기 전용이므로 잠금 없이 공유하고,
/// 관측은 공유 원장에 기록합니다. 분류기 자체는 상태가 없어 캡처
/// 스레드에서 프레임마다 호출해도 안전합니다.
pub struct PacketClassifier {
    index: Arc<AddressBlockIndex>,
    directory: Arc<CountryDirectory>,
    ledger: Arc<FrequencyLedger>,
}

impl PacketClassifier {
    pub fn new(
        index: Arc<AddressBlockIndex>,
        directory: Arc<CountryDirectory>,
        ledger: Arc<FrequencyLedger>,
    ) -> Self {
        Self {
            index,
            directory,
            ledger,
        }
    }

    /// 프레임을 분류하고, 성공 시 원장에 정확히 한 번 기록합니다.
    pub fn observe(&self, frame: &[u8]) -> Classification {
        let result = self.classify(frame);
        match result {
            Classification::Observed(country) => {
                let count = self.ledger.increment(country);
                let name = self.directory.resolve_name(country).unwrap_or("?");
                debug!(%country, name, count, "observation recorded");
                metrics::counter!(CLASSIFIER_OBSERVED_TOTAL).increment(1);
            }
            Classification::Ignored(reason) => {
                // 두 테이블 간 참조 불일치만 경고 대상, 나머지는 정상 잡음
                if reason == IgnoreReason::UnknownCountry {
                    warn!("block resolved to a country missing from the directory");
                } else {
                    debug!(reason = reason.as_str(), "frame ignored");
                }
                metrics::counter!(CLASSIFIER_IGNORED_TOTAL, LABEL_REASON => reason.as_str())
                    .increment(1);
            }
        }
        result
    }

    /// 프레임을 분류합니다. 원장에는 기록하지 않습니다.
    pub fn classify(&self, frame: &[u8]) -> Classification {
        let Ok(sliced) = SlicedPacket::from_ethernet(frame) else {
            return Classification::Ignored(IgnoreReason::MalformedFrame);
        };

        if !matches!(sliced.net, Some(NetSlice::Ipv4(_))) {
            return Classification::Ignored(IgnoreReason::NotIpv4);
        }

        let Some(TransportSlice::Tcp(tcp)) = sliced.transport else {
            return Classification::Ignored(IgnoreReason::NotTcp);
        };

        let payload = tcp.payload();
        if payload.is_empty() {
            return Classification::Ignored(IgnoreReason::EmptyPayload);
        }

        let Ok(text) = std::str::from_utf8(payload) else {
            return Classification::Ignored(IgnoreReason::UndecodablePayload);
        };

        let Some(country) = self.index.resolve(text.trim()) else {
            return Classification::Ignored(IgnoreReason::UnknownBlock);
        };

        if self.directory.resolve_name(country).is_none() {
            return Classification::Ignored(IgnoreReason::UnknownCountry);
        }

        Classification::Observed(country)
    }
}
