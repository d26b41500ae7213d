//! Conversion of WAV sample encodings to canonical 8/16-bit PCM.

use crate::error::{Result, RigSoundError};

/// `wFormatTag` for integer PCM
pub(crate) const WAVE_FORMAT_PCM: u16 = 1;
/// `wFormatTag` for IEEE float
pub(crate) const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Converts a raw `data` payload to 8-bit or 16-bit PCM.
///
/// Returns the converted bytes and the resulting bit depth. 8 and 16-bit integer PCM are
/// passed through untouched; float32, int24 and int32 are narrowed to signed 16-bit.
pub(crate) fn normalize(format_tag: u16, bits_per_sample: u16, raw: Vec<u8>) -> Result<(Vec<u8>, u16)> {
    match (format_tag, bits_per_sample) {
        (WAVE_FORMAT_PCM, 8) | (WAVE_FORMAT_PCM, 16) => Ok((raw, bits_per_sample)),
        (WAVE_FORMAT_IEEE_FLOAT, 32) => Ok((float32_to_i16(&raw), 16)),
        (WAVE_FORMAT_PCM, 24) => Ok((int24_to_i16(&raw), 16)),
        (WAVE_FORMAT_PCM, 32) => Ok((int32_to_i16(&raw), 16)),
        (tag, bits) => Err(RigSoundError::UnsupportedFormat(format!(
            "no conversion for format tag {} at {} bits",
            tag, bits
        ))),
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn push_i16(out: &mut Vec<u8>, s: i16) {
    out.extend_from_slice(&s.to_le_bytes());
}

fn float32_to_i16(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() / 2);
    for b in raw.chunks_exact(4) {
        let f = f32::from_le_bytes([b[0], b[1], b[2], b[3]]).clamp(-1.0, 1.0);
        // NaN survives the clamp and saturates to 0 in the cast
        let v = (f * 32767.0).round() as i32;
        push_i16(&mut out, clamp_i16(v));
    }
    out
}

fn int24_to_i16(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() / 3 * 2);
    for b in raw.chunks_exact(3) {
        // Placing the 3 bytes in the top of an i32 and shifting back sign-extends
        let v = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
        push_i16(&mut out, clamp_i16(v >> 8));
    }
    out
}

fn int32_to_i16(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() / 2);
    for b in raw.chunks_exact(4) {
        let v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        push_i16(&mut out, clamp_i16(v >> 16));
    }
    out
}
