//! Rolling-window packet metrics (§3, §4.9).
//!
//! Grounded in `original_source/Matlab/shared/metrics.py`'s
//! `MetricsCollector`/`PacketMetrics`: a bounded deque of per-packet
//! records plus lifetime totals, with CSV/JSON export. Aggregates are
//! recomputed directly over the (small, bounded) window on each summary
//! rather than tracked incrementally, matching the Python original's
//! `statistics.mean`/`median` calls over the whole window each time.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Default rolling-window size, §4.9.
pub const DEFAULT_WINDOW: usize = 100;

/// Per-packet metrics record.
#[derive(Debug, Clone, Serialize)]
pub struct PacketRecord {
    pub seq: u32,
    pub timestamp_ns: u64,
    pub size_bytes: usize,
    pub snr_db: Option<f64>,
    pub ber: Option<f64>,
    pub bit_errors: Option<u32>,
    pub latency_ms: Option<f64>,
    pub fec_corrections: Option<usize>,
    pub crc_error: bool,
    pub decode_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Stat {
    mean: f64,
    min: f64,
    max: f64,
}

fn stat(values: &[f64]) -> Option<Stat> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(Stat { mean, min, max })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_packets: u64,
    pub window_packets: usize,
    pub error_rate: f64,
    pub crc_errors: u64,
    pub decode_errors: u64,
    pub runtime_s: f64,
    pub throughput_pps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ber: Option<Stat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snr_db: Option<Stat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<Stat>,
}

/// Rolling metrics window, owned by the pipeline driver (§5: "metrics state
/// is owned by the driver").
pub struct RollingMetrics {
    window: usize,
    records: VecDeque<PacketRecord>,
    total_packets: u64,
    crc_errors: u64,
    decode_errors: u64,
    started_at: Instant,
}

impl RollingMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            records: VecDeque::with_capacity(window),
            total_packets: 0,
            crc_errors: 0,
            decode_errors: 0,
            started_at: Instant::now(),
        }
    }

    pub fn add(&mut self, record: PacketRecord) {
        if record.crc_error {
            self.crc_errors += 1;
        }
        if record.decode_error {
            self.decode_errors += 1;
        }
        self.total_packets += 1;

        if self.records.len() == self.window {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn throughput(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_packets as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> Summary {
        let runtime_s = self.started_at.elapsed().as_secs_f64();
        let error_rate = if self.total_packets > 0 {
            (self.crc_errors + self.decode_errors) as f64 / self.total_packets as f64
        } else {
            0.0
        };

        let bers: Vec<f64> = self.records.iter().filter_map(|r| r.ber).collect();
        let snrs: Vec<f64> = self.records.iter().filter_map(|r| r.snr_db).collect();
        let latencies: Vec<f64> = self.records.iter().filter_map(|r| r.latency_ms).collect();

        Summary {
            total_packets: self.total_packets,
            window_packets: self.records.len(),
            error_rate,
            crc_errors: self.crc_errors,
            decode_errors: self.decode_errors,
            runtime_s,
            throughput_pps: self.throughput(),
            ber: stat(&bers),
            snr_db: stat(&snrs),
            latency_ms: stat(&latencies),
        }
    }

    /// Serialize the summary block to a JSON string, mirroring
    /// `MetricsCollector.export_json`.
    pub fn summary_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }

    /// Render the current window as CSV, one row per record, mirroring
    /// `MetricsCollector.export_csv`.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "seq,timestamp_ns,size_bytes,snr_db,ber,bit_errors,latency_ms,fec_corrections,crc_error,decode_error\n",
        );
        for r in &self.records {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                r.seq,
                r.timestamp_ns,
                r.size_bytes,
                opt(r.snr_db),
                opt(r.ber),
                opt(r.bit_errors),
                opt(r.latency_ms),
                opt(r.fec_corrections),
                r.crc_error,
                r.decode_error,
            ));
        }
        out
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
