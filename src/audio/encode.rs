//! # WAV Encoding
//!
//! Serializes a [`MergedRecording`] into a canonical RIFF/WAVE file in memory. The whole file
//! is built before anything reaches storage, so a failure here never leaves a partial object.

use std::io::Cursor;

use bytes::Bytes;
use thiserror::Error;

use super::merge::MergedRecording;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode {0}-bit PCM")]
    UnsupportedBitDepth(u16),

    #[error("sample {index} ({value}) does not fit in {bit_depth} bits")]
    SampleOutOfRange { index: usize, value: i32, bit_depth: u16 },

    #[error("WAV writer failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Encode the recording as a linear PCM WAV file.
///
/// ## Steps:
/// 1. Narrow the `i32` samples back to the declared bit depth
/// 2. Build the `fmt ` header from the recording's format
/// 3. Write header and data chunk into an in-memory buffer
pub fn encode_wav(recording: &MergedRecording) -> Result<Bytes, EncodeError> {
    let format = recording.format;
    let track = narrow_samples(&recording.samples, format.bit_depth)?;

    let header = wav::Header::new(
        wav::WAV_FORMAT_PCM,
        format.channel_count,
        format.sample_rate,
        format.bit_depth,
    );

    let mut out = Cursor::new(Vec::with_capacity(44 + recording.samples.len() * 3));
    wav::write(header, &track, &mut out)?;
    Ok(Bytes::from(out.into_inner()))
}

fn narrow_samples(samples: &[i32], bit_depth: u16) -> Result<wav::BitDepth, EncodeError> {
    let out_of_range = |index: usize, value: i32| EncodeError::SampleOutOfRange {
        index,
        value,
        bit_depth,
    };

    match bit_depth {
        8 => samples
            .iter()
            .enumerate()
            .map(|(i, &v)| u8::try_from(v).map_err(|_| out_of_range(i, v)))
            .collect::<Result<Vec<_>, _>>()
            .map(wav::BitDepth::Eight),
        16 => samples
            .iter()
            .enumerate()
            .map(|(i, &v)| i16::try_from(v).map_err(|_| out_of_range(i, v)))
            .collect::<Result<Vec<_>, _>>()
            .map(wav::BitDepth::Sixteen),
        24 => {
            const MIN: i32 = -(1 << 23);
            const MAX: i32 = (1 << 23) - 1;
            if let Some((i, &v)) = samples
                .iter()
                .enumerate()
                .find(|(_, v)| !(MIN..=MAX).contains(*v))
            {
                return Err(out_of_range(i, v));
            }
            // The writer emits the top three bytes of each i32
            Ok(wav::BitDepth::TwentyFour(samples.iter().map(|&v| v << 8).collect()))
        }
        other => Err(EncodeError::UnsupportedBitDepth(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{decode_segment, PcmFormat};
    use crate::testing::riff_pcm;

    #[test]
    fn test_canonical_header() {
        let recording = MergedRecording {
            format: PcmFormat::new(1, 8000, 16),
            samples: vec![0; 10],
        };
        let bytes = encode_wav(&recording).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte canonical header followed by 10 two-byte samples
        assert_eq!(bytes.len(), 44 + 20);
        let riff_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(riff_size as usize, bytes.len() - 8);
    }

    #[test]
    fn test_twenty_four_bit_survives_decoding() {
        let format = PcmFormat::new(2, 48000, 24);
        let samples = vec![8_388_607, -8_388_608, 0, 42];
        let bytes = encode_wav(&MergedRecording {
            format,
            samples: samples.clone(),
        })
        .unwrap();

        let decoded = decode_segment("u", &bytes).unwrap();
        assert_eq!(decoded.format, format);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn test_data_chunk_bytes_are_exact() {
        let sixteen = encode_wav(&MergedRecording {
            format: PcmFormat::new(1, 8000, 16),
            samples: vec![1, -2, 32767, -32768],
        })
        .unwrap();
        assert_eq!(&sixteen[36..40], b"data");
        assert_eq!(&sixteen[44..], &[0x01, 0x00, 0xFE, 0xFF, 0xFF, 0x7F, 0x00, 0x80]);

        let twenty_four = encode_wav(&MergedRecording {
            format: PcmFormat::new(2, 48000, 24),
            samples: vec![42, -1, 8_388_607, -8_388_608],
        })
        .unwrap();
        assert_eq!(&twenty_four[36..40], b"data");
        assert_eq!(
            &twenty_four[44..],
            &[42, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x00, 0x00, 0x80]
        );
    }

    #[test]
    fn test_matches_hand_built_file() {
        let data = [0x10, 0x00, 0xF0, 0xFF];
        let encoded = encode_wav(&MergedRecording {
            format: PcmFormat::new(1, 8000, 16),
            samples: vec![16, -16],
        })
        .unwrap();
        assert_eq!(encoded.to_vec(), riff_pcm(1, 8000, 16, &data));
    }

    #[test]
    fn test_rejects_sample_wider_than_bit_depth() {
        let recording = MergedRecording {
            format: PcmFormat::new(1, 8000, 16),
            samples: vec![0, 40_000],
        };
        assert!(matches!(
            encode_wav(&recording),
            Err(EncodeError::SampleOutOfRange { index: 1, value: 40_000, bit_depth: 16 })
        ));
    }

    #[test]
    fn test_rejects_unsupported_bit_depth() {
        let recording = MergedRecording {
            format: PcmFormat::new(1, 8000, 12),
            samples: vec![0],
        };
        assert!(matches!(encode_wav(&recording), Err(EncodeError::UnsupportedBitDepth(12))));
    }
}
