//! Byte-level n-repetition FEC with majority-vote decoding (§3, §4.3).
//!
//! Grounded in `original_source/Matlab/shared/fec_utils.py`: each input byte
//! is repeated `repeat` times on encode; decode takes the modal byte of each
//! group, breaking ties by first occurrence (Python's `max(set(chunk),
//! key=chunk.count)` walks `set(chunk)` in insertion order for small byte
//! sets, which this mirrors explicitly rather than relying on hash order).

use crate::errors::FecError;

/// Encode `data`, repeating each byte `r` consecutive times. `r` in [1,15].
pub fn encode(data: &[u8], r: u8) -> Result<Vec<u8>, FecError> {
    validate_r(r)?;
    let r = r as usize;
    let mut out = Vec::with_capacity(data.len() * r);
    for &byte in data {
        out.extend(std::iter::repeat(byte).take(r));
    }
    Ok(out)
}

/// Decode an FEC-encoded buffer, returning the recovered bytes and the total
/// number of per-group corrections made (§4.3: `r - max_count` per group).
pub fn decode(data: &[u8], r: u8) -> Result<(Vec<u8>, usize), FecError> {
    validate_r(r)?;
    let r = r as usize;
    if data.len() % r != 0 {
        return Err(FecError::BadLength { len: data.len(), r: r as u8 });
    }

    let mut decoded = Vec::with_capacity(data.len() / r);
    let mut corrections = 0usize;

    for group in data.chunks(r) {
        let (majority, count) = majority_vote(group);
        decoded.push(majority);
        corrections += r - count;
    }

    Ok((decoded, corrections))
}

fn validate_r(r: u8) -> Result<(), FecError> {
    if r == 0 || r > 15 {
        return Err(FecError::InvalidRepeatFactor { r });
    }
    Ok(())
}

/// Returns the modal byte and its count, first-occurrence tie-break.
fn majority_vote(group: &[u8]) -> (u8, usize) {
    let mut seen: Vec<(u8, usize)> = Vec::new();
    for &byte in group {
        if let Some(entry) = seen.iter_mut().find(|(b, _)| *b == byte) {
            entry.1 += 1;
        } else {
            seen.push((byte, 1));
        }
    }
    // `max_by_key` returns the *last* max on ties, which would pick the last
    // distinct byte in the group instead of the first; walk manually and
    // keep strictly-greater counts only.
    let mut best = seen[0];
    for &entry in &seen[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best
}
