//! WAV header synthesis for headerless PCM speech

use crate::error::WavError;

const HEADER_LEN: usize = 44;

/// Layout of raw 16-bit little-endian PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Samples per second
    pub sample_rate: u32,
    /// Interleaved channels
    pub channels: u16,
}

impl PcmFormat {
    /// Bits per sample; the speech service only emits 16-bit audio
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Create a format
    #[inline]
    #[must_use]
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Bytes per sample frame
    #[inline]
    #[must_use]
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(Self::BITS_PER_SAMPLE / 8)
    }

    /// Bytes per second
    #[inline]
    #[must_use]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::new(24_000, 1)
    }
}

/// True if `bytes` already start with a RIFF/WAVE header
#[must_use]
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Wrap raw PCM in a canonical 44-byte WAV header.
///
/// A trailing partial frame is dropped.
///
/// # Errors
/// - `WavError::InvalidFormat` for zero channels or sample rate
/// - `WavError::Empty` if no complete frame remains
/// - `WavError::TooLarge` if the data exceeds a RIFF chunk
pub fn pcm_to_wav(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, WavError> {
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(WavError::InvalidFormat {
            channels: format.channels,
            sample_rate: format.sample_rate,
        });
    }
    let align = usize::from(format.block_align());
    let data_len = pcm.len() - pcm.len() % align;
    if data_len == 0 {
        return Err(WavError::Empty);
    }
    if data_len != pcm.len() {
        tracing::warn!(
            "Dropping {} trailing pcm bytes that do not form a full frame",
            pcm.len() - data_len
        );
    }
    let data_len_u32 = u32::try_from(data_len)
        .ok()
        .filter(|len| len.checked_add((HEADER_LEN - 8) as u32).is_some())
        .ok_or(WavError::TooLarge(data_len))?;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_len);
    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(data_len_u32 + (HEADER_LEN - 8) as u32).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    // fmt subchunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&format.channels.to_le_bytes());
    buf.extend_from_slice(&format.sample_rate.to_le_bytes());
    buf.extend_from_slice(&format.byte_rate().to_le_bytes());
    buf.extend_from_slice(&format.block_align().to_le_bytes());
    buf.extend_from_slice(&PcmFormat::BITS_PER_SAMPLE.to_le_bytes());
    // data subchunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len_u32.to_le_bytes());
    buf.extend_from_slice(&pcm[..data_len]);
    Ok(buf)
}
