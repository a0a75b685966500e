//! # Segment Merging
//!
//! Joins the decoded segments of one call into a single recording. The telephony provider
//! records each answer separately, so a call arrives as several WAV files that must share
//! the same format to be stitched together without resampling.

use thiserror::Error;

use super::segment::{AudioSegment, PcmFormat};

/// The concatenation of every segment of a request, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecording {
    pub format: PcmFormat,
    pub samples: Vec<i32>,
}

impl MergedRecording {
    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        match self.format.channel_count {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no segments to merge")]
    NoSegments,

    #[error("segment {index} has {found} channels, segment 0 has {expected}")]
    ChannelCount { index: usize, expected: u16, found: u16 },

    #[error("segment {index} has sample rate {found} Hz, segment 0 has {expected} Hz")]
    SampleRate { index: usize, expected: u32, found: u32 },

    #[error("segment {index} has bit depth {found}, segment 0 has {expected}")]
    BitDepth { index: usize, expected: u16, found: u16 },
}

/// Validate that every segment matches segment 0, then concatenate their samples.
///
/// ## Compatibility Check:
/// Each later segment is compared against segment 0 only: channel count first, then sample
/// rate, then bit depth. The first disagreement aborts the merge and names the property and
/// the offending segment index.
///
/// ## Concatenation:
/// Samples are appended in slice order. No resampling, remixing or silence trimming happens,
/// and the merged recording inherits segment 0's format unchanged.
pub fn merge_segments(segments: Vec<AudioSegment>) -> Result<MergedRecording, MergeError> {
    let first = segments.first().ok_or(MergeError::NoSegments)?;
    let expected = first.format;

    for (index, segment) in segments.iter().enumerate().skip(1) {
        check_compatible(index, expected, segment.format)?;
    }

    let total: usize = segments.iter().map(|s| s.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for segment in segments {
        samples.extend(segment.samples);
    }

    Ok(MergedRecording {
        format: expected,
        samples,
    })
}

fn check_compatible(index: usize, expected: PcmFormat, found: PcmFormat) -> Result<(), MergeError> {
    if found.channel_count != expected.channel_count {
        return Err(MergeError::ChannelCount {
            index,
            expected: expected.channel_count,
            found: found.channel_count,
        });
    }
    if found.sample_rate != expected.sample_rate {
        return Err(MergeError::SampleRate {
            index,
            expected: expected.sample_rate,
            found: found.sample_rate,
        });
    }
    if found.bit_depth != expected.bit_depth {
        return Err(MergeError::BitDepth {
            index,
            expected: expected.bit_depth,
            found: found.bit_depth,
        });
    }
    Ok(())
}
