//! 빈도 원장 — 국가별 활동 카운트의 공유 가변 테이블
//!
//! 캡처 스레드(increment), 감쇠 스케줄러(decay_all), 관측자(snapshot),
//! 제어 표면(reset_all)이 동시에 접근합니다. 모든 연산은 하나의 뮤텍스
//! 아래에서 원자적으로 수행되므로 스냅샷이 연산 중간 상태를 관측하는
//! 일은 없습니다. 연산 사이의 순서는 보장하지 않습니다.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use packetmap_core::metrics::{
    LEDGER_DECAY_TICKS_TOTAL, LEDGER_INCREMENTS_TOTAL, LEDGER_TRACKED_COUNTRIES,
};
use packetmap_core::types::{CountryId, FrequencyEntry};

/// 국가 하나의 내부 레코드
#[derive(Debug, Clone, Copy)]
struct FrequencyRecord {
    count: u64,
    last_seen: Instant,
}

/// 국가별 활동 빈도 원장
///
/// 내부적으로 `Mutex<HashMap>`을 사용합니다. 임계 구역은 모두 짧은
/// 메모리 연산이므로 비동기 락 대신 `std::sync::Mutex`를 씁니다.
/// 잠금이 poison되어도 카운트 테이블은 모든 중간 상태가 유효하므로
/// 내부 값을 복구하여 계속 사용합니다.
#[derive(Debug, Default)]
pub struct FrequencyLedger {
    records: Mutex<HashMap<CountryId, FrequencyRecord>>,
}

impl FrequencyLedger {
    /// 빈 원장을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CountryId, FrequencyRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 국가의 카운트를 1 올리고 새 값을 반환합니다.
    ///
    /// 미등록 국가는 카운트 1로 등록됩니다.
    pub fn increment(&self, country: CountryId) -> u64 {
        let now = Instant::now();
        let mut records = self.lock();
        let record = records.entry(country).or_insert(FrequencyRecord {
            count: 0,
            last_seen: now,
        });
        record.count = record.count.saturating_add(1);
        record.last_seen = now;
        let count = record.count;
        let tracked = records.len();
        drop(records);

        metrics::counter!(LEDGER_INCREMENTS_TOTAL).increment(1);
        metrics::gauge!(LEDGER_TRACKED_COUNTRIES).set(tracked as f64);
        count
    }

    /// 모든 국가의 카운트를 `max(count - 1, floor)`로 갱신합니다.
    ///
    /// 하한보다 낮은 카운트는 하한까지 끌어올려집니다. 한 번의 잠금
    /// 아래에서 전체 패스가 수행됩니다.
    pub fn decay_all(&self, floor: u64) {
        let mut records = self.lock();
        for record in records.values_mut() {
            record.count = record.count.saturating_sub(1).max(floor);
        }
        drop(records);

        metrics::counter!(LEDGER_DECAY_TICKS_TOTAL).increment(1);
    }

    /// 국가의 현재 카운트를 반환합니다. 미등록 국가는 0입니다.
    pub fn read(&self, country: CountryId) -> u64 {
        self.lock().get(&country).map_or(0, |r| r.count)
    }

    /// 전체 테이블의 일관된 시점 스냅샷을 반환합니다.
    ///
    /// 카운트 내림차순으로 정렬되며, 동률은 국가 식별자 순입니다.
    pub fn snapshot(&self) -> Vec<FrequencyEntry> {
        let records = self.lock();
        let mut entries: Vec<FrequencyEntry> = records
            .iter()
            .map(|(&country, record)| FrequencyEntry {
                country,
                count: record.count,
            })
            .collect();
        drop(records);

        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.country.cmp(&b.country)));
        entries
    }

    /// 모든 레코드를 제거합니다.
    ///
    /// 다음 increment부터 테이블이 새로 채워집니다.
    pub fn reset_all(&self) {
        self.lock().clear();
        metrics::gauge!(LEDGER_TRACKED_COUNTRIES).set(0.0);
    }

    /// 현재 추적 중인 국가 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
