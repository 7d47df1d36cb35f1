//! Packet header hex dump for log events, the same "decode + structured log
//! event" shape as the teacher's `FrameDecoder`, rebuilt around the 26-byte
//! header (§3) instead of Raman-Whisper's symbol-field layout.

use link_core::packet::Frame;

/// Render a decoded frame's header fields as a compact hex/field summary
/// for inclusion in packet log lines.
pub fn describe_header(frame: &Frame) -> String {
    format!(
        "seq={} src={} dst={} ts={} len={}",
        frame.seq,
        frame.src_ip,
        frame.dst_ip,
        frame.timestamp_ns,
        frame.payload.len()
    )
}

/// Hex-dump the payload, truncated for readability.
pub fn payload_hex(frame: &Frame, max_bytes: usize) -> String {
    frame
        .payload
        .iter()
        .take(max_bytes)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
