//! End-to-end scenario tests with literal inputs (§8).

use link_core::channel::{self, Channel, Model};
use link_core::cipher::Cipher;
use link_core::fec;
use link_core::framesync;
use link_core::packet;
use link_core::pipeline;
use link_core::signal_processing::{modulate, rrc_taps, Scheme};
use num_complex::Complex32;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::net::Ipv4Addr;

/// Scenario 1: clean byte-mode loopback at SNR=60 dB, FEC r=3.
#[test]
fn scenario_1_clean_loopback() {
    let cipher = Cipher::with_default_key();
    let mut tx_rng = ChaCha8Rng::seed_from_u64(1);

    let packed = packet::pack(1, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 0, b"Hello").unwrap();
    let frame = packet::unpack(&packed).unwrap();

    let mut encoded = pipeline::byte_mode_transmit(&frame.payload, &cipher, 3, &mut tx_rng).unwrap();
    let ber = channel::equivalent_ber(60.0);
    Channel::apply_bitflip(&mut encoded, ber, &mut tx_rng);
    let (plaintext, corrections) = pipeline::byte_mode_receive(&encoded, &cipher, 3).unwrap();

    let repacked = packet::pack(frame.seq, frame.src_ip, frame.dst_ip, frame.timestamp_ns, &plaintext).unwrap();
    let egress = packet::unpack(&repacked).unwrap();

    assert_eq!(egress.seq, 1);
    assert_eq!(egress.payload, b"Hello");
    assert_eq!(corrections, 0);
}

/// Scenario 2: FEC corrects one flipped bit in each of the first three
/// r=3 groups of "ABCDEFGH".
#[test]
fn scenario_2_fec_correction() {
    let encoded = fec::encode(b"ABCDEFGH", 3).unwrap();
    let mut corrupted = encoded.clone();
    corrupted[0] ^= 0x01;
    corrupted[4] ^= 0x01;
    corrupted[8] ^= 0x01;

    let (decoded, corrections) = fec::decode(&corrupted, 3).unwrap();
    assert_eq!(decoded, b"ABCDEFGH");
    assert_eq!(corrections, 3);
}

/// Scenario 3: flipping the first payload byte trips the CRC.
#[test]
fn scenario_3_crc_detection() {
    let mut packed = packet::pack(7, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, 0, b"Test").unwrap();
    packed[packet::HEADER_SIZE] ^= 0x01;
    let err = packet::unpack(&packed).unwrap_err();
    assert!(matches!(err, link_core::errors::PacketError::CrcMismatch { .. }));
}

/// Scenario 4: QPSK at SNR=3 dB over a 1024-bit random block lands inside
/// the loose empirical BER bound.
#[test]
fn scenario_4_qpsk_low_snr_ber_bound() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let bits: Vec<u8> = (0..1024).map(|_| (rng.next_u32() & 1) as u8).collect();

    let symbols = modulate(&bits, Scheme::Qpsk);
    let samples: Vec<Complex32> = symbols.iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect();

    let mut ch = Channel::new(Model::Awgn, 3.0, 0.0, 0.0, ChaCha8Rng::seed_from_u64(7));
    let noisy = ch.apply(&samples, 1.0);
    let noisy64: Vec<num_complex::Complex64> = noisy.iter().map(|c| num_complex::Complex64::new(c.re as f64, c.im as f64)).collect();
    let recovered = link_core::signal_processing::demodulate_hard(&noisy64, Scheme::Qpsk);

    let bit_errors = bits.iter().zip(&recovered).filter(|(a, b)| a != b).count();
    let ber = bit_errors as f64 / bits.len() as f64;
    assert!((0.02..=0.12).contains(&ber), "ber = {ber}");
}

/// Scenario 5: a hand-built bit stream with an embedded START/length/
/// payload/STOP frame is recovered with L=1, payload byte 0x00.
#[test]
fn scenario_5_sync_pattern_found() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let preamble: Vec<u8> = (0..32).map(|_| (rng.next_u32() & 1) as u8).collect();

    let mut bits = preamble;
    bits.extend(byte_to_bits(framesync::START_PATTERN));
    bits.extend(u16_bits(1));
    bits.extend(byte_to_bits(0x00));
    bits.extend(byte_to_bits(framesync::STOP_PATTERN));

    let sps = 4;
    let taps = rrc_taps(0.35, 6, sps).unwrap();
    let symbols: Vec<num_complex::Complex64> =
        bits.iter().map(|&b| num_complex::Complex64::new(if b == 0 { 1.0 } else { -1.0 }, 0.0)).collect();
    let shaped = link_core::signal_processing::pulse_shape(&symbols, &taps, sps);
    let signal: Vec<Complex32> = shaped.into_iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect();

    let payload = framesync::receive(&signal, &taps, Scheme::Bpsk, sps, framesync::DEFAULT_SYNC_THRESHOLD).unwrap();
    assert_eq!(payload, vec![0x00]);
}

/// Scenario 6: 512 random bits with no embedded START pattern fail sync.
#[test]
fn scenario_6_sync_missing() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let bits: Vec<u8> = (0..512).map(|_| (rng.next_u32() & 1) as u8).collect();

    let sps = 4;
    let taps = rrc_taps(0.35, 6, sps).unwrap();
    let symbols: Vec<num_complex::Complex64> =
        bits.iter().map(|&b| num_complex::Complex64::new(if b == 0 { 1.0 } else { -1.0 }, 0.0)).collect();
    let shaped = link_core::signal_processing::pulse_shape(&symbols, &taps, sps);
    let signal: Vec<Complex32> = shaped.into_iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect();

    let err = framesync::receive(&signal, &taps, Scheme::Bpsk, sps, framesync::DEFAULT_SYNC_THRESHOLD).unwrap_err();
    assert!(matches!(err, link_core::errors::SyncError::SyncLost { .. }));
}

/// P8: at SNR >= 25 dB, AWGN-only QPSK with RRC beta=0.35, sps=10, FEC r=3,
/// packet error rate stays at or below 1% over 1000 random 256-byte payloads.
#[test]
fn p8_end_to_end_high_snr_packet_error_rate() {
    let cipher = Cipher::with_default_key();
    let sps = 10;
    let taps = rrc_taps(0.35, 6, sps).unwrap();
    let mut failures = 0usize;

    for i in 0..1000u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(1000 + i);
        let payload: Vec<u8> = (0..256).map(|_| (rng.next_u32() & 0xFF) as u8).collect();

        let tx = pipeline::sample_mode_transmit(&payload, &cipher, 3, Scheme::Qpsk, &taps, sps, &mut rng).unwrap();
        let mut ch = Channel::new(Model::Awgn, 25.0, 0.0, 0.0, ChaCha8Rng::seed_from_u64(2000 + i));
        let noisy = ch.apply(&tx, sps as f64 * 1e5);

        match pipeline::sample_mode_receive(&noisy, &cipher, 3, Scheme::Qpsk, &taps, sps, 0.7) {
            Ok((rx, _)) if rx == payload => {}
            _ => failures += 1,
        }
    }

    let per = failures as f64 / 1000.0;
    assert!(per <= 0.01, "packet error rate = {per}");
}

fn byte_to_bits(byte: u8) -> Vec<u8> {
    (0..8).map(|i| (byte >> (7 - i)) & 1).collect()
}

fn u16_bits(value: u16) -> Vec<u8> {
    (0..16).map(|i| ((value >> (15 - i)) & 1) as u8).collect()
}
