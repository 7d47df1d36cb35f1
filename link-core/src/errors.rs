//! Link-emulator error types with granular categories

use thiserror::Error;

/// Top-level error type for all link-core operations
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("packet codec error: {0}")]
    Packet(#[from] PacketError),

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("FEC error: {0}")]
    Fec(#[from] FecError),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("frame sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Packet-codec errors, pack/unpack (§4.1)
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PacketError {
    #[error("payload length {len} exceeds maximum {max}")]
    PayloadTooLong { len: usize, max: usize },

    #[error("buffer too short: need at least {required} bytes, have {actual}")]
    TooShort { required: usize, actual: usize },

    #[error("declared payload length {declared} exceeds remaining buffer {available}")]
    BadLength { declared: usize, available: usize },

    #[error("CRC mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch { expected: u32, computed: u32 },
}

/// Cipher errors (§4.2)
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CipherError {
    #[error("ciphertext too short: need at least 5 bytes (4-byte nonce + data), have {actual}")]
    TooShort { actual: usize },

    #[error("key must be at least 8 bytes, got {actual}")]
    KeyTooShort { actual: usize },
}

/// FEC codec errors (§4.3)
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FecError {
    #[error("data length {len} is not a multiple of repeat factor {r}")]
    BadLength { len: usize, r: u8 },

    #[error("repeat factor {r} out of range [1,15]")]
    InvalidRepeatFactor { r: u8 },
}

/// DSP processing errors (modulation, pulse shaping)
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DspError {
    #[error("invalid roll-off factor {beta}: must be in (0,1)")]
    InvalidRolloff { beta: String },

    #[error("symbol rate {symbol_rate} exceeds sample rate {sample_rate}")]
    InvalidRateRatio { sample_rate: usize, symbol_rate: usize },

    #[error("empty signal supplied to {stage}")]
    EmptySignal { stage: &'static str },
}

/// Frame-synchronizer errors (§4.7)
#[derive(Debug, Error, PartialEq, Clone)]
pub enum SyncError {
    #[error("sync pattern not found above correlation threshold {threshold}")]
    SyncLost { threshold: f32 },

    #[error("stop pattern mismatch: expected {expected:#04x}, got {actual:#04x}")]
    StopMismatch { expected: u8, actual: u8 },

    #[error("insufficient bits after sync: need {required}, have {available}")]
    InsufficientBits { required: usize, available: usize },
}

/// Configuration / CLI errors (§6, §7)
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("invalid SNR {snr_db} dB: must be finite and within [-20,60]")]
    InvalidSnr { snr_db: String },

    #[error("invalid sample rate {rate} Hz: must be > 0")]
    InvalidSampleRate { rate: String },

    #[error("invalid symbol rate {rate} Hz: must be > 0 and <= sample rate")]
    InvalidSymbolRate { rate: String },

    #[error("invalid FEC spec: {reason}")]
    InvalidFec { reason: String },

    #[error("invalid address literal: {value}")]
    InvalidAddress { value: String },

    #[error("invalid mode: {value} (expected \"sample\" or \"byte\")")]
    InvalidMode { value: String },

    #[error("invalid modulation scheme: {value}")]
    InvalidModulation { value: String },

    #[error("invalid channel model: {value}")]
    InvalidChannelModel { value: String },

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Result type alias for link-core operations
pub type Result<T> = std::result::Result<T, LinkError>;
