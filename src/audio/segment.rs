//! # Audio Segments
//!
//! Decodes a downloaded WAV file into an [`AudioSegment`]: the format header plus the raw
//! integer samples, widened to `i32` so every supported bit depth shares one representation.
//!
//! ## Sample Representation:
//! - **8-bit**: stored as the unsigned value from the file (0..=255, silence is 128)
//! - **16-bit**: signed, -32768..=32767
//! - **24-bit**: signed, -8388608..=8388607
//!
//! Samples of multi-channel files stay interleaved exactly as they appear in the file.

use std::fmt;
use std::io::Cursor;

use thiserror::Error;

/// The three properties that must agree between segments before they can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PcmFormat {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
}

impl PcmFormat {
    pub fn new(channel_count: u16, sample_rate: u32, bit_depth: u16) -> Self {
        Self {
            channel_count,
            sample_rate,
            bit_depth,
        }
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch/{}Hz/{}bit",
            self.channel_count, self.sample_rate, self.bit_depth
        )
    }
}

/// One decoded recording segment, tied to the URL it was downloaded from.
///
/// ## Ownership:
/// A segment is produced by exactly one fetch task and moved to the merger once all
/// downloads have finished. Nothing mutates it after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub source_url: String,
    pub format: PcmFormat,
    pub samples: Vec<i32>,
}

/// Reasons a downloaded body could not be turned into an [`AudioSegment`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a readable WAV file: {0}")]
    Malformed(#[from] std::io::Error),

    #[error("unsupported WAV encoding (format tag {0}), only integer PCM is accepted")]
    UnsupportedEncoding(u16),

    #[error("WAV file declares zero channels")]
    NoChannels,

    #[error("WAV file contains no audio data")]
    Empty,
}

/// Decode a complete WAV file held in memory.
///
/// ## Validation:
/// 1. The container must parse (RIFF/WAVE with `fmt ` and `data` chunks)
/// 2. The format tag must be integer PCM
/// 3. The channel count must be non-zero
/// 4. The sample data must be 8, 16 or 24-bit integers
///
/// 32-bit integer PCM and extensible headers are not readable by `wav` 1.0 and are
/// rejected with an error.
pub fn decode_segment(source_url: &str, bytes: &[u8]) -> Result<AudioSegment, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let (header, data) = wav::read(&mut cursor)?;

    if header.audio_format != wav::WAV_FORMAT_PCM {
        return Err(DecodeError::UnsupportedEncoding(header.audio_format));
    }
    if header.channel_count == 0 {
        return Err(DecodeError::NoChannels);
    }

    let samples: Vec<i32> = match data {
        wav::BitDepth::Eight(samples) => samples.into_iter().map(i32::from).collect(),
        wav::BitDepth::Sixteen(samples) => samples.into_iter().map(i32::from).collect(),
        // The reader places the three sample bytes in the top of the i32
        wav::BitDepth::TwentyFour(samples) => samples.into_iter().map(|s| s >> 8).collect(),
        wav::BitDepth::ThirtyTwoFloat(_) => {
            return Err(DecodeError::UnsupportedEncoding(wav::WAV_FORMAT_IEEE_FLOAT))
        }
        wav::BitDepth::Empty => return Err(DecodeError::Empty),
    };

    Ok(AudioSegment {
        source_url: source_url.to_string(),
        format: PcmFormat::new(header.channel_count, header.sampling_rate, header.bits_per_sample),
        samples,
    })
}
