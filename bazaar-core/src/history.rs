//! Per-commodity rolling time-stamped series with windowed statistics.
//!
//! A `HistoryLog` is itself a map from commodity to a bounded FIFO of
//! `PricePoint`s plus a most-recent slot; `History` bundles the six series
//! the auction house maintains. Mutated by the clearing loop, read by every
//! agent's pricing step, so the map is behind a `parking_lot::Mutex` rather
//! than requiring callers to synchronize externally.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub value: f64,
    pub timestamp_ms: i64,
}

struct Series {
    points: VecDeque<PricePoint>,
    most_recent: f64,
}

pub struct HistoryLog {
    capacity: usize,
    series: Mutex<HashMap<String, Series>>,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: a commodity already known keeps its existing series.
    pub fn register(&self, commodity: &str, seed: f64, now_ms: i64) {
        let mut map = self.series.lock();
        map.entry(commodity.to_string()).or_insert_with(|| Series {
            points: VecDeque::from([PricePoint {
                value: seed,
                timestamp_ms: now_ms,
            }]),
            most_recent: seed,
        });
    }

    pub fn add(&self, commodity: &str, value: f64, now_ms: i64) {
        let mut map = self.series.lock();
        let series = map
            .entry(commodity.to_string())
            .or_insert_with(|| Series {
                points: VecDeque::new(),
                most_recent: value,
            });
        series.points.push_back(PricePoint {
            value,
            timestamp_ms: now_ms,
        });
        while series.points.len() > self.capacity {
            series.points.pop_front();
        }
        series.most_recent = value;
    }

    pub fn most_recent(&self, commodity: &str) -> f64 {
        self.series
            .lock()
            .get(commodity)
            .map(|s| s.most_recent)
            .unwrap_or(0.0)
    }

    /// Arithmetic mean of the last `min(n, len)` samples. `n == 1` returns
    /// the most-recent slot directly (equivalent, but avoids a lock-scan for
    /// the hot single-point case).
    pub fn average(&self, commodity: &str, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        if n == 1 {
            return self.most_recent(commodity);
        }
        let map = self.series.lock();
        let Some(series) = map.get(commodity) else {
            return 0.0;
        };
        let len = series.points.len();
        if len == 0 {
            return 0.0;
        }
        let take = n.min(len);
        let sum: f64 = series.points.iter().rev().take(take).map(|p| p.value).sum();
        sum / take as f64
    }

    /// Arithmetic mean of samples with `timestamp_ms >= last_ts - delta_ms`.
    pub fn t_average(&self, commodity: &str, delta_ms: i64) -> f64 {
        let map = self.series.lock();
        let Some(series) = map.get(commodity) else {
            return 0.0;
        };
        let Some(last) = series.points.back() else {
            return 0.0;
        };
        let cutoff = last.timestamp_ms - delta_ms;
        let mut sum = 0.0;
        let mut count = 0usize;
        for p in series.points.iter().rev() {
            if p.timestamp_ms < cutoff {
                break;
            }
            sum += p.value;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// `100*(current - past) / past`, `past` being the sample `n` positions
    /// behind the latest one (clamped to the earliest sample if `n` exceeds
    /// history length).
    pub fn percentage_change(&self, commodity: &str, n: usize) -> f64 {
        let map = self.series.lock();
        let Some(series) = map.get(commodity) else {
            return 0.0;
        };
        let len = series.points.len();
        if len == 0 {
            return 0.0;
        }
        let current = series.points.back().unwrap().value;
        let back_index = n.min(len - 1);
        let past = series.points[len - 1 - back_index].value;
        if past == 0.0 {
            0.0
        } else {
            100.0 * (current - past) / past
        }
    }

    /// Same as `percentage_change`, but `past` is the earliest sample inside
    /// the `delta_ms` window (or the earliest sample overall if the window
    /// reaches further back than history extends).
    pub fn t_percentage_change(&self, commodity: &str, delta_ms: i64) -> f64 {
        let map = self.series.lock();
        let Some(series) = map.get(commodity) else {
            return 0.0;
        };
        let Some(last) = series.points.back() else {
            return 0.0;
        };
        let current = last.value;
        let cutoff = last.timestamp_ms - delta_ms;
        let mut past = current;
        for p in series.points.iter().rev() {
            if p.timestamp_ms < cutoff {
                break;
            }
            past = p.value;
        }
        if past == 0.0 {
            0.0
        } else {
            100.0 * (current - past) / past
        }
    }

    pub fn len(&self, commodity: &str) -> usize {
        self.series.lock().get(commodity).map(|s| s.points.len()).unwrap_or(0)
    }
}

/// The six rolling series the auction house maintains per commodity.
pub struct History {
    pub mid_price: HistoryLog,
    pub buy_price: HistoryLog,
    pub asks: HistoryLog,
    pub bids: HistoryLog,
    pub net_supply: HistoryLog,
    pub trade_count: HistoryLog,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            mid_price: HistoryLog::new(capacity),
            buy_price: HistoryLog::new(capacity),
            asks: HistoryLog::new(capacity),
            bids: HistoryLog::new(capacity),
            net_supply: HistoryLog::new(capacity),
            trade_count: HistoryLog::new(capacity),
        }
    }

    /// Seeds all six logs for a commodity: price-denominated logs seed at
    /// 10, volume logs seed at 0. Idempotent.
    pub fn register(&self, commodity: &str, now_ms: i64) {
        self.mid_price.register(commodity, 10.0, now_ms);
        self.buy_price.register(commodity, 10.0, now_ms);
        self.asks.register(commodity, 0.0, now_ms);
        self.bids.register(commodity, 0.0, now_ms);
        self.net_supply.register(commodity, 0.0, now_ms);
        self.trade_count.register(commodity, 0.0, now_ms);
    }
}
