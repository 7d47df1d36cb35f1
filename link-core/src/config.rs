//! Shared configuration data model (§3 "Channel parameters", §6 CLI surface).
//!
//! `link-cli` owns CLI parsing and TOML/JSON file merging (teacher's
//! `CliConfig`/`merge_json_values` pattern); these types are the validated
//! domain values that both the driver and the pipeline stages consume,
//! mirroring how the teacher's `SimulationConfig` sat in `chimera-core` while
//! `chimera-cli` handled sourcing it from flags/files.

use crate::errors::{ConfigError, DspError};
use crate::signal_processing::filters::samples_per_symbol_from_rates;
use crate::signal_processing::modulation::Scheme;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Receive-path selector, §4.7/§6 `--mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sample,
    Byte,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sample" => Ok(Mode::Sample),
            "byte" => Ok(Mode::Byte),
            other => Err(ConfigError::InvalidMode { value: other.to_string() }),
        }
    }
}

/// Channel model selector with its parameters folded in (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelModelKind {
    Awgn,
    Rayleigh,
    Rician,
}

impl FromStr for ChannelModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awgn" => Ok(ChannelModelKind::Awgn),
            "rayleigh" => Ok(ChannelModelKind::Rayleigh),
            "rician" => Ok(ChannelModelKind::Rician),
            other => Err(ConfigError::InvalidChannelModel { value: other.to_string() }),
        }
    }
}

/// FEC configuration, §6 `--fec {off|rep:<r>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FecSpec {
    Off,
    Repetition { r: u8 },
}

impl FromStr for FecSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "off" {
            return Ok(FecSpec::Off);
        }
        let r = s
            .strip_prefix("rep:")
            .ok_or_else(|| ConfigError::InvalidFec { reason: format!("expected \"off\" or \"rep:<r>\", got {s:?}") })?
            .parse::<u8>()
            .map_err(|e| ConfigError::InvalidFec { reason: e.to_string() })?;
        if r == 0 || r > 15 {
            return Err(ConfigError::InvalidFec { reason: format!("r={r} out of range [1,15]") });
        }
        Ok(FecSpec::Repetition { r })
    }
}

fn parse_modulation(s: &str) -> Result<Scheme, ConfigError> {
    match s {
        "bpsk" => Ok(Scheme::Bpsk),
        "qpsk" => Ok(Scheme::Qpsk),
        "16qam" => Ok(Scheme::Qam16),
        other => Err(ConfigError::InvalidModulation { value: other.to_string() }),
    }
}

/// Channel impairment parameters, §3 "Channel parameters".
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelParams {
    pub snr_db: f32,
    pub model: ChannelModelKind,
    pub rician_k: f32,
    pub doppler_hz: f32,
    pub delay_spread_s: f32,
    pub sample_rate_hz: f32,
}

impl ChannelParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-20.0..=60.0).contains(&self.snr_db) || !self.snr_db.is_finite() {
            return Err(ConfigError::InvalidSnr { snr_db: self.snr_db.to_string() });
        }
        if !(self.sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate { rate: self.sample_rate_hz.to_string() });
        }
        Ok(())
    }
}

/// Full pipeline configuration, the validated union of §6's CLI surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub listen_ip: IpAddr,
    pub listen_port: u16,
    pub dest_ip: IpAddr,
    pub dest_port: u16,
    pub metrics_ip: Option<IpAddr>,
    pub metrics_port: Option<u16>,
    pub mode: Mode,
    pub modulation: String,
    pub channel: ChannelParams,
    pub symbol_rate_hz: f32,
    pub fec: FecSpec,
    pub key_file: Option<String>,
    pub seed: Option<u64>,
    pub metrics_file: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: 5000,
            dest_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dest_port: 0,
            metrics_ip: None,
            metrics_port: None,
            mode: Mode::Byte,
            modulation: "qpsk".to_string(),
            channel: ChannelParams {
                snr_db: 20.0,
                model: ChannelModelKind::Awgn,
                rician_k: 10.0,
                doppler_hz: 0.0,
                delay_spread_s: 0.0,
                sample_rate_hz: 1e6,
            },
            symbol_rate_hz: 1e5,
            fec: FecSpec::Repetition { r: 3 },
            key_file: None,
            seed: None,
            metrics_file: None,
        }
    }
}

impl LinkConfig {
    /// Parse the modulation scheme string into the typed enum.
    pub fn modulation_scheme(&self) -> Result<Scheme, ConfigError> {
        parse_modulation(&self.modulation)
    }

    /// Validate cross-field and range constraints beyond what `serde`/`clap`
    /// enforce on individual fields (§6/§7 "`ConfigInvalid` — fatal at startup").
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.channel.validate()?;
        self.modulation_scheme()?;
        if self.dest_port == 0 {
            return Err(ConfigError::MissingField { field: "dest_port" });
        }
        if self.symbol_rate_hz <= 0.0 || self.symbol_rate_hz > self.channel.sample_rate_hz {
            return Err(ConfigError::InvalidSymbolRate { rate: self.symbol_rate_hz.to_string() });
        }
        if self.dest_ip.is_unspecified() {
            return Err(ConfigError::InvalidAddress { value: self.dest_ip.to_string() });
        }
        Ok(())
    }

    /// Resolve the integer samples-per-symbol ratio, re-deriving the same
    /// check `validate` already performs on the raw rates.
    pub fn samples_per_symbol(&self) -> Result<usize, DspError> {
        samples_per_symbol_from_rates(self.channel.sample_rate_hz as f64, self.symbol_rate_hz as f64)
    }
}
