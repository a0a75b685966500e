//! # Audio Processing Module
//!
//! Everything that touches PCM data on its way from the telephony provider to storage.
//!
//! ## Key Components:
//! - **Segment**: Decodes one downloaded WAV file into an [`AudioSegment`]
//! - **Merge**: Checks that all segments agree on format and concatenates them in order
//! - **Encode**: Serializes the merged recording back into a single WAV byte stream
//!
//! ## Audio Format Requirements:
//! - **Encoding**: Linear integer PCM (WAV format tag 1)
//! - **Bit Depth**: 8, 16 or 24 bits
//! - **Channels / Sample Rate**: anything, as long as every segment of a recording agrees
//!
//! ## Limitations:
//! The `wav` 1.0 reader cannot parse 32-bit integer PCM or `WAVE_FORMAT_EXTENSIBLE`
//! headers. Such files fail to decode and the request is answered with a server error.

pub mod encode;   // MergedRecording -> WAV bytes
pub mod merge;    // Format validation and ordered concatenation
pub mod segment;  // WAV bytes -> AudioSegment

pub use encode::{encode_wav, EncodeError};
pub use merge::{merge_segments, MergeError, MergedRecording};
pub use segment::{decode_segment, AudioSegment, DecodeError, PcmFormat};
