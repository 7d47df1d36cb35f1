//! Structured logging for per-packet and summary events (§4.10, §7).

use crate::config::LogFormat;
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// One receive-side packet outcome.
    Packet(PacketEvent),

    /// Periodic rolling-metrics summary.
    Statistics(StatisticsEvent),

    Info { message: String },
    Warn { message: String },
    Error { message: String, details: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketEvent {
    pub timestamp: DateTime<Utc>,
    pub seq: u32,
    pub size_bytes: usize,
    pub crc_error: bool,
    pub decode_error: bool,
    pub fec_corrections: Option<usize>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub timestamp: DateTime<Utc>,
    pub summary: link_core::metrics::Summary,
}

/// Logger that writes one line per event in the configured format, matching
/// the teacher's `StructuredLogger` (JSON / logfmt / pretty selectable).
pub struct StructuredLogger {
    format: LogFormat,
    writer: Box<dyn Write + Send>,
}

impl StructuredLogger {
    pub fn new(format: LogFormat) -> Self {
        Self { format, writer: Box::new(io::stdout()) }
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let line = match self.format {
            LogFormat::Json => serde_json::to_string(&event)?,
            LogFormat::Logfmt => format_logfmt(&event),
            LogFormat::Pretty => format_pretty(&event),
        };
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn format_logfmt(event: &LogEvent) -> String {
    let ts = Utc::now().to_rfc3339();
    match event {
        LogEvent::Packet(p) => format!(
            "ts=\"{}\" type=packet seq={} size={} crc_error={} decode_error={} fec_corrections={} latency_ms={:.3}",
            ts,
            p.seq,
            p.size_bytes,
            p.crc_error,
            p.decode_error,
            p.fec_corrections.unwrap_or(0),
            p.latency_ms
        ),
        LogEvent::Statistics(s) => format!(
            "ts=\"{}\" type=statistics total_packets={} error_rate={:.4} throughput_pps={:.2}",
            ts, s.summary.total_packets, s.summary.error_rate, s.summary.throughput_pps
        ),
        LogEvent::Info { message } => format!("ts=\"{ts}\" level=info msg=\"{message}\""),
        LogEvent::Warn { message } => format!("ts=\"{ts}\" level=warn msg=\"{message}\""),
        LogEvent::Error { message, details } => match details {
            Some(d) => format!("ts=\"{ts}\" level=error msg=\"{message}\" details=\"{d}\""),
            None => format!("ts=\"{ts}\" level=error msg=\"{message}\""),
        },
    }
}

fn format_pretty(event: &LogEvent) -> String {
    let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    match event {
        LogEvent::Packet(p) => format!(
            "[{}] PACKET seq={} size={}B crc_error={} decode_error={} fec_corrections={} latency={:.3}ms",
            ts,
            p.seq,
            p.size_bytes,
            p.crc_error,
            p.decode_error,
            p.fec_corrections.unwrap_or(0),
            p.latency_ms
        ),
        LogEvent::Statistics(s) => format!(
            "[{}] STATS packets={} error_rate={:.4} throughput={:.2}pps",
            ts, s.summary.total_packets, s.summary.error_rate, s.summary.throughput_pps
        ),
        LogEvent::Info { message } => format!("[{ts}] INFO: {message}"),
        LogEvent::Warn { message } => format!("[{ts}] WARN: {message}"),
        LogEvent::Error { message, details } => match details {
            Some(d) => format!("[{ts}] ERROR: {message} | {d}"),
            None => format!("[{ts}] ERROR: {message}"),
        },
    }
}
