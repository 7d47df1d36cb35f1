//! CLI argument surface (§6) plus TOML/JSON config-file loading. CLI flags
//! win over file values, which win over [`LinkConfig::default`] — the same
//! deep-merge-over-defaults shape as the teacher's `CliConfig::from_file`.

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use link_core::config::LinkConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Wireless-link emulator driver", long_about = None)]
pub struct Cli {
    /// Path to a JSON or TOML configuration file, merged under CLI flags.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub listen_ip: Option<IpAddr>,
    #[arg(long)]
    pub listen_port: Option<u16>,
    #[arg(long)]
    pub dest_ip: Option<IpAddr>,
    #[arg(long)]
    pub dest_port: Option<u16>,
    #[arg(long)]
    pub metrics_ip: Option<IpAddr>,
    #[arg(long)]
    pub metrics_port: Option<u16>,
    #[arg(long)]
    pub mode: Option<String>,
    #[arg(long)]
    pub modulation: Option<String>,
    #[arg(long)]
    pub snr_db: Option<f32>,
    #[arg(long)]
    pub channel: Option<String>,
    #[arg(long)]
    pub rician_k: Option<f32>,
    #[arg(long)]
    pub doppler_hz: Option<f32>,
    #[arg(long)]
    pub delay_spread_s: Option<f32>,
    #[arg(long)]
    pub sample_rate: Option<f32>,
    #[arg(long)]
    pub symbol_rate: Option<f32>,
    #[arg(long)]
    pub fec: Option<String>,
    #[arg(long)]
    pub key_file: Option<String>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub metrics_file: Option<String>,

    /// Logging output target/format overrides.
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Build a validated [`LinkConfig`], merging defaults, an optional config
    /// file, then CLI overrides, in that priority order (§6).
    pub fn resolve(&self) -> Result<LinkConfig> {
        let mut merged = serde_json::to_value(LinkConfig::default()).wrap_err("serialize default config")?;

        if let Some(path) = &self.config {
            let file_json = load_config_file(path)?;
            merge_json_values(&mut merged, file_json);
        }

        merge_json_values(&mut merged, self.overrides_json()?);

        let config: LinkConfig = serde_json::from_value(merged).wrap_err("parse merged configuration")?;
        config.validate().wrap_err("configuration failed validation")?;
        Ok(config)
    }

    fn overrides_json(&self) -> Result<JsonValue> {
        let mut map = serde_json::Map::new();
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    map.insert(stringify!($field).to_string(), serde_json::to_value(v)?);
                }
            };
        }
        set!(listen_ip);
        set!(listen_port);
        set!(dest_ip);
        set!(dest_port);
        set!(metrics_ip);
        set!(metrics_port);
        set!(mode);
        set!(modulation);
        set!(fec);
        set!(key_file);
        set!(seed);
        set!(metrics_file);

        if let Some(v) = self.symbol_rate {
            map.insert("symbol_rate_hz".to_string(), serde_json::to_value(v)?);
        }

        let mut channel = serde_json::Map::new();
        if let Some(v) = self.snr_db {
            channel.insert("snr_db".to_string(), serde_json::to_value(v)?);
        }
        if let Some(v) = &self.channel {
            channel.insert("model".to_string(), serde_json::to_value(v)?);
        }
        if let Some(v) = self.rician_k {
            channel.insert("rician_k".to_string(), serde_json::to_value(v)?);
        }
        if let Some(v) = self.doppler_hz {
            channel.insert("doppler_hz".to_string(), serde_json::to_value(v)?);
        }
        if let Some(v) = self.delay_spread_s {
            channel.insert("delay_spread_s".to_string(), serde_json::to_value(v)?);
        }
        if let Some(v) = self.sample_rate {
            channel.insert("sample_rate_hz".to_string(), serde_json::to_value(v)?);
        }
        if !channel.is_empty() {
            map.insert("channel".to_string(), JsonValue::Object(channel));
        }

        Ok(JsonValue::Object(map))
    }

    pub fn logging_overrides(&self) -> Option<LogFormat> {
        self.log_format
    }
}

fn load_config_file(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            let value: toml::Value = toml::from_str(&content).wrap_err("failed to parse TOML configuration")?;
            serde_json::to_value(value).wrap_err("failed to convert TOML to JSON")
        }
        _ => serde_json::from_str(&content).wrap_err("failed to parse JSON configuration"),
    }
}

/// Deep merge JSON values; override takes precedence over base. Objects
/// merge recursively, everything else is replaced outright.
fn merge_json_values(base: &mut JsonValue, override_val: JsonValue) {
    match (base, override_val) {
        (JsonValue::Object(base_map), JsonValue::Object(override_map)) => {
            for (key, value) in override_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    merge_json_values(base_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_val, override_val) => {
            *base_val = override_val;
        }
    }
}

/// Structured-logging output format (§7 "user-visible behavior").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merge_prefers_override_over_base() {
        let mut base = serde_json::json!({"a": 1, "nested": {"x": 1, "y": 2}});
        let over = serde_json::json!({"a": 2, "nested": {"x": 9}});
        merge_json_values(&mut base, over);
        assert_eq!(base["a"], 2);
        assert_eq!(base["nested"]["x"], 9);
        assert_eq!(base["nested"]["y"], 2);
    }

    #[test]
    fn resolve_applies_cli_overrides_on_top_of_defaults() {
        let cli = Cli::parse_from(["link-cli", "--dest-ip", "10.0.0.9", "--dest-port", "6000", "--snr-db", "5"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.dest_ip.to_string(), "10.0.0.9");
        assert_eq!(config.dest_port, 6000);
        assert_eq!(config.channel.snr_db, 5.0);
    }

    #[test]
    fn resolve_rejects_invalid_merged_config() {
        let cli = Cli::parse_from(["link-cli", "--dest-ip", "10.0.0.9", "--dest-port", "6000", "--snr-db", "1000"]);
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn resolve_merges_toml_file_under_cli_flags() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "dest_port = 7000\n[channel]\nsnr_db = 15.0").unwrap();
        let cli = Cli::parse_from([
            "link-cli",
            "--config",
            file.path().to_str().unwrap(),
            "--dest-ip",
            "10.0.0.9",
            "--dest-port",
            "8000",
        ]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.dest_port, 8000); // CLI wins over file
        assert_eq!(config.channel.snr_db, 15.0); // file wins over default
    }
}
