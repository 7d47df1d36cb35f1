//! Framed-packet codec: fixed 26-byte header + payload (§3, §4.1).
//!
//! Layout (network byte order), grounded in
//! `original_source/Matlab/shared/packet_format.py`'s `struct.pack("!I4s4sQHI", ...)`:
//!
//! ```text
//! seq            u32
//! src_ip         4 octets
//! dst_ip         4 octets
//! timestamp_ns   u64
//! length         u16   (payload length, <= MAX_PAYLOAD)
//! crc32          u32   (IEEE CRC32 of payload only)
//! payload        `length` bytes
//! ```

use crate::errors::PacketError;
use std::net::Ipv4Addr;

/// Header size in bytes: 4 + 4 + 4 + 8 + 2 + 4.
pub const HEADER_SIZE: usize = 26;

/// Maximum payload size, §3 ("Byte buffer").
pub const MAX_PAYLOAD: usize = 65_507;

/// A decoded frame: header fields plus validated payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u32,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub timestamp_ns: u64,
    pub payload: Vec<u8>,
}

/// Serialize a frame. Fails if the payload exceeds [`MAX_PAYLOAD`].
///
/// The CRC covers the payload only — header fields are protected by
/// length-checking and rejection on any downstream parse error, not by CRC.
pub fn pack(
    seq: u32,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    timestamp_ns: u64,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(PacketError::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let crc = crate::crc::crc32(payload);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&seq.to_be_bytes());
    out.extend_from_slice(&src_ip.octets());
    out.extend_from_slice(&dst_ip.octets());
    out.extend_from_slice(&timestamp_ns.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(&crc.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Parse and validate a packed frame.
pub fn unpack(data: &[u8]) -> Result<Frame, PacketError> {
    if data.len() < HEADER_SIZE {
        return Err(PacketError::TooShort {
            required: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let seq = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let src_ip = Ipv4Addr::new(data[4], data[5], data[6], data[7]);
    let dst_ip = Ipv4Addr::new(data[8], data[9], data[10], data[11]);
    let timestamp_ns = u64::from_be_bytes(data[12..20].try_into().unwrap());
    let length = u16::from_be_bytes(data[20..22].try_into().unwrap()) as usize;
    let crc_field = u32::from_be_bytes(data[22..26].try_into().unwrap());

    let available = data.len() - HEADER_SIZE;
    if length > available {
        return Err(PacketError::BadLength {
            declared: length,
            available,
        });
    }

    let payload = &data[HEADER_SIZE..HEADER_SIZE + length];
    let computed = crate::crc::crc32(payload);
    if computed != crc_field {
        return Err(PacketError::CrcMismatch {
            expected: crc_field,
            computed,
        });
    }

    Ok(Frame {
        seq,
        src_ip,
        dst_ip,
        timestamp_ns,
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trip_hello() {
        let packed = pack(1, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 0, b"Hello").unwrap();
        let frame = unpack(&packed).unwrap();
        assert_eq!(frame.seq, 1);
        assert_eq!(frame.src_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(frame.dst_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(frame.timestamp_ns, 0);
        assert_eq!(frame.payload, b"Hello");
    }

    #[test]
    fn too_short_buffer_is_rejected() {
        let err = unpack(&[0u8; HEADER_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            PacketError::TooShort {
                required: HEADER_SIZE,
                actual: HEADER_SIZE - 1
            }
        );
    }

    #[test]
    fn declared_length_beyond_buffer_is_rejected() {
        let mut packed = pack(7, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, 0, b"abc").unwrap();
        packed[20..22].copy_from_slice(&100u16.to_be_bytes());
        let err = unpack(&packed).unwrap_err();
        assert!(matches!(err, PacketError::BadLength { .. }));
    }

    #[test]
    fn payload_too_long_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let err = pack(0, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, 0, &payload).unwrap_err();
        assert!(matches!(err, PacketError::PayloadTooLong { .. }));
    }

    #[test]
    fn flipping_first_payload_byte_trips_crc() {
        let mut packed = pack(7, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), 42, b"Test").unwrap();
        packed[HEADER_SIZE] ^= 0x01; // scenario 3, §8: flip byte 26 (first payload byte)
        let err = unpack(&packed).unwrap_err();
        assert!(matches!(err, PacketError::CrcMismatch { .. }));
    }

    proptest! {
        #[test]
        fn p1_round_trip_no_impairment(
            seq in any::<u32>(),
            src in any::<u32>(),
            dst in any::<u32>(),
            ts in any::<u64>(),
            payload in proptest::collection::vec(any::<u8>(), 0..2000),
        ) {
            let src_ip = Ipv4Addr::from(src);
            let dst_ip = Ipv4Addr::from(dst);
            let packed = pack(seq, src_ip, dst_ip, ts, &payload).unwrap();
            let frame = unpack(&packed).unwrap();
            prop_assert_eq!(frame.seq, seq);
            prop_assert_eq!(frame.src_ip, src_ip);
            prop_assert_eq!(frame.dst_ip, dst_ip);
            prop_assert_eq!(frame.timestamp_ns, ts);
            prop_assert_eq!(frame.payload, payload);
        }

        #[test]
        fn p4_crc_sensitivity(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            flip_idx in any::<usize>(),
        ) {
            let packed = pack(1, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, 0, &payload).unwrap();
            let mut mutated = packed.clone();
            let byte_idx = HEADER_SIZE + (flip_idx / 8) % payload.len();
            let bit_idx = flip_idx % 8;
            mutated[byte_idx] ^= 1 << bit_idx;
            let is_crc_mismatch = matches!(unpack(&mutated), Err(PacketError::CrcMismatch { .. }));
            prop_assert!(is_crc_mismatch);
        }
    }
}
