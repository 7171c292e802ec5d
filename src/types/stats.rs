use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub decoded: u64,
    pub empty: u64,
    pub malformed: u64,
}

impl IngestStats {
    pub fn total(&self) -> u64 {
        self.decoded + self.empty + self.malformed
    }

    /// Share of non-empty lines that were rejected, 0.0 when nothing arrived yet
    pub fn drop_ratio(&self) -> f64 {
        let lines = self.decoded + self.malformed;
        if lines == 0 {
            0.0
        } else {
            self.malformed as f64 / lines as f64
        }
    }
}

/// 实时计数器，采集线程写入，界面线程读取
#[derive(Debug, Default)]
pub struct SharedStats {
    decoded: AtomicU64,
    empty: AtomicU64,
    malformed: AtomicU64,
}

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self) {
        self.empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            decoded: self.decoded.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.decoded.store(0, Ordering::Relaxed);
        self.empty.store(0, Ordering::Relaxed);
        self.malformed.store(0, Ordering::Relaxed);
    }
}
