mod config;
mod frame_decoder;
mod logging;
mod pipeline_driver;

use clap::Parser;
use config::{Cli, LogFormat};
use link_core::channel::{Channel, Model};
use link_core::cipher::Cipher;
use link_core::config::{ChannelModelKind, LinkConfig};
use logging::{LogEvent, StructuredLogger};
use pipeline_driver::PipelineDriver;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> ExitCode {
    color_eyre::install().ok();
    let cli = Cli::parse();
    let log_format = cli.logging_overrides().unwrap_or(LogFormat::Pretty);
    let mut logger = StructuredLogger::new(log_format);

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            let _ = logger.log(LogEvent::Error { message: "configuration error".into(), details: Some(format!("{e:#}")) });
            return ExitCode::from(2);
        }
    };

    let cipher = match load_cipher(&config) {
        Ok(cipher) => cipher,
        Err(e) => {
            let _ = logger.log(LogEvent::Error { message: "cipher setup failed".into(), details: Some(e.to_string()) });
            return ExitCode::from(2);
        }
    };

    let seed = config.seed.unwrap_or_else(rand::random);
    let channel_rng = ChaCha8Rng::seed_from_u64(seed);
    let driver_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let channel = Channel::new(
        channel_model(&config),
        config.channel.snr_db as f64,
        config.channel.doppler_hz as f64,
        config.channel.delay_spread_s as f64,
        channel_rng,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || shutdown_handler.store(true, Ordering::SeqCst)) {
        let _ = logger.log(LogEvent::Warn { message: format!("failed to install signal handler: {e}") });
    }

    let mut driver = match PipelineDriver::new(&config, cipher, channel, driver_rng, Arc::clone(&shutdown), logger) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("bind failure: {e}");
            return ExitCode::from(1);
        }
    };

    if let Ok(addr) = driver.ingress_addr() {
        let _ = driver.log_startup(addr);
    }

    match driver.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("driver error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_cipher(config: &LinkConfig) -> color_eyre::eyre::Result<Cipher> {
    match &config.key_file {
        Some(path) => {
            let key = std::fs::read(path)?;
            Ok(Cipher::new(key)?)
        }
        None => Ok(Cipher::with_default_key()),
    }
}

fn channel_model(config: &LinkConfig) -> Model {
    match config.channel.model {
        ChannelModelKind::Awgn => Model::Awgn,
        ChannelModelKind::Rayleigh => Model::Rayleigh,
        ChannelModelKind::Rician => Model::Rician { k_factor: config.channel.rician_k as f64 },
    }
}
