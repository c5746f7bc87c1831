//! Float to 16-bit PCM conversion.
//!
//! Synthesized audio arrives as `f32` amplitudes nominally in `[-1.0, 1.0]`.
//! Hosts that play waveform resources expect signed 16-bit little-endian
//! samples, so every sample is clamped, scaled by [`PCM16_SCALE`] and
//! truncated toward zero.

/// Scale applied to a clamped amplitude before truncation.
pub const PCM16_SCALE: f32 = 32767.0;

/// Bytes per encoded sample.
pub const PCM16_BYTES_PER_SAMPLE: usize = 2;

/// Quantize one amplitude to a signed 16-bit sample.
///
/// Values outside `[-1.0, 1.0]` saturate instead of wrapping. NaN maps to 0.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * PCM16_SCALE) as i16
}

/// Encode a float buffer as little-endian PCM16 bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * PCM16_BYTES_PER_SAMPLE);
    for &sample in samples {
        data.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    data
}

/// Decode little-endian PCM16 bytes back to float amplitudes.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(PCM16_BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect()
}
