//! Bit/byte conversion helpers shared across the packet, FEC, and modulation
//! stages.

/// MSB-first bit expansion of a byte buffer (§3 "bit sequence").
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    data.iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1))
        .collect()
}

/// Pack a bit sequence (length a multiple of 8, MSB-first) back into bytes.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}
