//! Audio decoder using symphonia
//!
//! Turns raw file bytes (MP3, WAV, FLAC, OGG) into interleaved f32 PCM that a deck can load.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{MixerError, Result};

/// Decoded PCM, interleaved, immutable once produced
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Number of sample frames
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// De-interleave one channel
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let index = index.min(self.channels - 1);
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }
}

/// Decoder collaborator: raw bytes in, PCM out
pub trait Decoder: Send {
    fn decode(&self, raw: &[u8]) -> Result<DecodedAudio>;
}

/// Symphonia-backed decoder, format picked by probing
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// File extension hint for the prober ("mp3", "wav", ...)
    pub extension: Option<String>,
}

impl SymphoniaDecoder {
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, raw: &[u8]) -> Result<DecodedAudio> {
        let cursor = Cursor::new(raw.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(ref ext) = self.extension {
            hint.with_extension(ext);
        }

        // Probe the byte stream
        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| MixerError::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        // Find the audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MixerError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder_opts = DecoderOptions::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|e| MixerError::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut all_samples: Vec<f32> = Vec::new();

        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }

                    match decoder.decode(&packet) {
                        Ok(audio_buf) => {
                            let spec = *audio_buf.spec();
                            sample_rate = spec.rate;
                            channels = spec.channels.count();
                            let duration = audio_buf.capacity() as u64;
                            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
                            sample_buf.copy_interleaved_ref(audio_buf);
                            all_samples.extend_from_slice(sample_buf.samples());
                        }
                        Err(symphonia::core::errors::Error::DecodeError(e)) => {
                            log::debug!("decode: skipping corrupt packet: {}", e);
                            continue;
                        }
                        Err(e) => return Err(MixerError::Decode(format!("Decode error: {}", e))),
                    }
                }
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => return Err(MixerError::Decode(format!("Format error: {}", e))),
            }
        }

        if all_samples.is_empty() {
            return Err(MixerError::Decode("No samples decoded".to_string()));
        }

        let audio = DecodedAudio::new(all_samples, channels, sample_rate);
        log::info!(
            "decode: {} frames, {} ch @ {} Hz ({:.2}s)",
            audio.frames(),
            audio.channels,
            audio.sample_rate,
            audio.duration()
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (sample_rate as f32 * seconds) as usize;
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
                let value = (sample * i16::MAX as f32) as i16;
                writer.write_sample(value).unwrap();
                writer.write_sample(value).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav() {
        let bytes = wav_bytes(22050, 0.5);
        let audio = SymphoniaDecoder::with_extension("wav").decode(&bytes).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 22050);
        assert!((audio.duration() - 0.5).abs() < 0.01, "duration {}", audio.duration());
    }

    #[test]
    fn test_decode_without_hint() {
        let bytes = wav_bytes(44100, 0.25);
        let audio = SymphoniaDecoder::default().decode(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 44100);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = SymphoniaDecoder::default()
            .decode(b"definitely not audio")
            .unwrap_err();
        assert!(matches!(err, MixerError::Decode(_)));
    }

    #[test]
    fn test_channel_deinterleave() {
        let audio = DecodedAudio::new(vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2, 3);
        assert_eq!(audio.frames(), 3);
        assert_eq!(audio.channel(0), vec![0.1, 0.2, 0.3]);
        assert_eq!(audio.channel(1), vec![-0.1, -0.2, -0.3]);
        assert!((audio.duration() - 1.0).abs() < 1e-9);
    }
}
