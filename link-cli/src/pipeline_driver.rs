//! Socket-owning packet orchestration (§4.8, §5).
//!
//! One packet is carried to completion before the next `recv_from` — no
//! internal concurrency in the hot path, matching §5's "single-threaded
//! cooperative" scheduling model. The only blocking points are the ingress
//! and egress sockets; a 100 ms read timeout lets the shutdown flag be
//! checked between datagrams.

use crate::frame_decoder::{describe_header, payload_hex};
use crate::logging::{LogEvent, PacketEvent, StatisticsEvent, StructuredLogger};
use chrono::Utc;
use color_eyre::eyre::{Context, Result};
use link_core::channel::{self, Channel};
use link_core::cipher::Cipher;
use link_core::config::{FecSpec, LinkConfig, Mode};
use link_core::metrics::{PacketRecord, RollingMetrics};
use link_core::packet;
use link_core::pipeline;
use link_core::signal_processing::{rrc_taps, Scheme};
use rand_chacha::ChaCha8Rng;
use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Number of leading payload bytes shown in the per-packet hex preview.
const PAYLOAD_HEX_PREVIEW_BYTES: usize = 16;

/// Sample-mode DSP parameters, resolved once at startup from [`LinkConfig`].
struct SampleModeParams {
    scheme: Scheme,
    rrc_taps: Vec<f64>,
    samples_per_symbol: usize,
    sync_threshold: f32,
}

/// Owns the ingress/egress/metrics sockets and sequences packets through the
/// cipher/FEC/channel chain described in §4.8.
pub struct PipelineDriver {
    ingress: UdpSocket,
    egress: UdpSocket,
    metrics_socket: Option<UdpSocket>,
    cipher: Cipher,
    fec: FecSpec,
    mode: Mode,
    channel: Channel,
    sample_params: Option<SampleModeParams>,
    sample_rate_hz: f64,
    metrics: RollingMetrics,
    rng: ChaCha8Rng,
    shutdown: Arc<AtomicBool>,
    logger: StructuredLogger,
    metrics_file: Option<String>,
}

impl PipelineDriver {
    /// Bind sockets and assemble the driver. Bind failures are plain I/O
    /// errors — callers map them to exit code 1 (§6).
    pub fn new(
        config: &LinkConfig,
        cipher: Cipher,
        channel: Channel,
        rng: ChaCha8Rng,
        shutdown: Arc<AtomicBool>,
        logger: StructuredLogger,
    ) -> io::Result<Self> {
        let ingress = UdpSocket::bind((config.listen_ip, config.listen_port))?;
        ingress.set_read_timeout(Some(Duration::from_millis(100)))?;

        let egress = UdpSocket::bind((config.listen_ip, 0))?;
        egress.connect((config.dest_ip, config.dest_port))?;

        let metrics_socket = match (config.metrics_ip, config.metrics_port) {
            (Some(ip), Some(port)) => {
                let sock = UdpSocket::bind((config.listen_ip, 0))?;
                sock.connect((ip, port))?;
                Some(sock)
            }
            _ => None,
        };

        let sample_params = match config.mode {
            Mode::Byte => None,
            Mode::Sample => {
                let sps = config
                    .samples_per_symbol()
                    .expect("sample rate ratio already validated at config resolution");
                let scheme = config
                    .modulation_scheme()
                    .expect("modulation scheme already validated at config resolution");
                let taps = rrc_taps(
                    link_core::signal_processing::DEFAULT_BETA,
                    link_core::signal_processing::DEFAULT_SPAN_SYMBOLS,
                    sps,
                )
                .expect("default RRC parameters are always valid");
                Some(SampleModeParams { scheme, rrc_taps: taps, samples_per_symbol: sps, sync_threshold: 0.7 })
            }
        };

        Ok(Self {
            ingress,
            egress,
            metrics_socket,
            cipher,
            fec: config.fec,
            mode: config.mode,
            channel,
            sample_params,
            sample_rate_hz: config.channel.sample_rate_hz as f64,
            metrics: RollingMetrics::new(link_core::metrics::DEFAULT_WINDOW),
            rng,
            shutdown,
            logger,
            metrics_file: config.metrics_file.clone(),
        })
    }

    /// Run the receive/process/send loop until the shutdown flag is set,
    /// then flush metrics and return (§4.8, §5).
    pub fn run(&mut self) -> Result<()> {
        let mut buf = vec![0u8; packet::HEADER_SIZE + packet::MAX_PAYLOAD];

        while !self.shutdown.load(Ordering::SeqCst) {
            let n = match self.ingress.recv_from(&mut buf) {
                Ok((n, _src)) => n,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => continue,
                Err(e) => {
                    self.logger.log(LogEvent::Warn { message: format!("ingress socket error: {e}") })?;
                    continue;
                }
            };
            self.handle_datagram(&buf[..n])?;
        }

        self.flush_metrics()
    }

    fn handle_datagram(&mut self, data: &[u8]) -> Result<()> {
        let recv_ns = now_ns();
        let recv_instant = Instant::now();

        let frame = match packet::unpack(data) {
            Ok(frame) => frame,
            Err(e) => {
                self.record_error(None, true, false, None, recv_instant.elapsed())?;
                self.logger.log(LogEvent::Warn { message: format!("dropped packet: {e}") })?;
                return Ok(());
            }
        };

        let latency_ms = recv_ns.saturating_sub(frame.timestamp_ns) as f64 / 1_000_000.0;
        let message = format!("{} payload={}", describe_header(&frame), payload_hex(&frame, PAYLOAD_HEX_PREVIEW_BYTES));
        self.logger.log(LogEvent::Info { message })?;

        let outcome = match self.mode {
            Mode::Byte => self.process_byte_mode(&frame.payload),
            Mode::Sample => self.process_sample_mode(&frame.payload),
        };

        match outcome {
            Ok((plaintext, corrections)) => {
                let packed = packet::pack(frame.seq, frame.src_ip, frame.dst_ip, frame.timestamp_ns, &plaintext)
                    .wrap_err("re-pack recovered payload")?;
                self.egress.send(&packed).wrap_err("send to egress")?;
                self.record_success(frame.seq, plaintext.len(), corrections, latency_ms)?;
            }
            Err(e) => {
                self.record_error(Some(frame.seq), false, true, Some(latency_ms), recv_instant.elapsed())?;
                self.logger.log(LogEvent::Warn { message: format!("seq={} decode error: {e}", frame.seq) })?;
            }
        }

        self.publish_metrics()
    }

    fn process_byte_mode(&mut self, payload: &[u8]) -> link_core::Result<(Vec<u8>, usize)> {
        let r = fec_repeat_factor(self.fec);
        let mut encoded = pipeline::byte_mode_transmit(payload, &self.cipher, r, &mut self.rng)?;
        let ber = channel::equivalent_ber(self.channel.snr_db);
        Channel::apply_bitflip(&mut encoded, ber, &mut self.rng);
        pipeline::byte_mode_receive(&encoded, &self.cipher, r)
    }

    fn process_sample_mode(&mut self, payload: &[u8]) -> link_core::Result<(Vec<u8>, usize)> {
        let r = fec_repeat_factor(self.fec);
        let params = self.sample_params.as_ref().expect("sample mode requires resolved DSP parameters");
        let scheme = params.scheme;
        let sps = params.samples_per_symbol;
        let sync_threshold = params.sync_threshold;
        let taps = params.rrc_taps.clone();

        let tx = pipeline::sample_mode_transmit(payload, &self.cipher, r, scheme, &taps, sps, &mut self.rng)?;
        let rx = self.channel.apply(&tx, self.sample_rate_hz);
        pipeline::sample_mode_receive(&rx, &self.cipher, r, scheme, &taps, sps, sync_threshold)
    }

    fn record_success(&mut self, seq: u32, size_bytes: usize, corrections: usize, latency_ms: f64) -> Result<()> {
        self.metrics.add(PacketRecord {
            seq,
            timestamp_ns: now_ns(),
            size_bytes,
            snr_db: Some(self.channel.snr_db),
            ber: Some(channel::equivalent_ber(self.channel.snr_db)),
            bit_errors: None,
            latency_ms: Some(latency_ms),
            fec_corrections: Some(corrections),
            crc_error: false,
            decode_error: false,
        });
        self.logger.log(LogEvent::Packet(PacketEvent {
            timestamp: Utc::now(),
            seq,
            size_bytes,
            crc_error: false,
            decode_error: false,
            fec_corrections: Some(corrections),
            latency_ms,
        }))
    }

    fn record_error(
        &mut self,
        seq: Option<u32>,
        crc_error: bool,
        decode_error: bool,
        latency_ms: Option<f64>,
        elapsed: Duration,
    ) -> Result<()> {
        self.metrics.add(PacketRecord {
            seq: seq.unwrap_or(0),
            timestamp_ns: now_ns(),
            size_bytes: 0,
            snr_db: Some(self.channel.snr_db),
            ber: None,
            bit_errors: None,
            latency_ms,
            fec_corrections: None,
            crc_error,
            decode_error,
        });
        self.logger.log(LogEvent::Packet(PacketEvent {
            timestamp: Utc::now(),
            seq: seq.unwrap_or(0),
            size_bytes: 0,
            crc_error,
            decode_error,
            fec_corrections: None,
            latency_ms: latency_ms.unwrap_or_else(|| elapsed.as_secs_f64() * 1000.0),
        }))
    }

    /// Forward a JSON metrics summary to the optional metrics endpoint
    /// (§6: "optional metrics egress ... carrying JSON summaries").
    fn publish_metrics(&mut self) -> Result<()> {
        let Some(sock) = &self.metrics_socket else { return Ok(()) };
        let summary = self.metrics.summary();
        let json = serde_json::to_vec(&summary).wrap_err("serialize metrics summary")?;
        sock.send(&json).wrap_err("send metrics datagram")?;
        self.logger.log(LogEvent::Statistics(StatisticsEvent { timestamp: Utc::now(), summary }))
    }

    fn flush_metrics(&self) -> Result<()> {
        if let Some(path) = &self.metrics_file {
            std::fs::write(path, self.metrics.to_csv()).wrap_err_with(|| format!("write metrics file {path}"))?;
        }
        Ok(())
    }

    /// The address the ingress socket is actually bound to, useful for
    /// startup logging when `--listen-port 0` asks the OS for one.
    pub fn ingress_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.ingress.local_addr()
    }

    pub fn log_startup(&mut self, addr: std::net::SocketAddr) -> Result<()> {
        self.logger.log(LogEvent::Info { message: format!("listening on {addr}") })
    }
}

fn fec_repeat_factor(fec: FecSpec) -> u8 {
    match fec {
        FecSpec::Off => 1,
        FecSpec::Repetition { r } => r,
    }
}

fn now_ns() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_nanos() as u64
}
