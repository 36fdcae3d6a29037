//! Audio codec boundary.
//!
//! The leveling logic only needs four operations from a codec: decode a file,
//! encode a buffer, resample, and downmix. [`AudioCodec`] names that seam so the
//! batch runner can be driven by [`SymphoniaCodec`] in production and by a
//! recording stub in tests.

use crate::OutputFormat;
use crate::dsp;
use crate::error::{DecodeError, ResampleError, WritingError};
use crate::save::{encode_mp3, encode_ogg, encode_wav};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded clip, samples interleaved and normalized to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Peak level in dBFS, negative infinity when silent.
    pub fn peak_dbfs(&self) -> f64 {
        dsp::peak_dbfs(&self.samples)
    }
}

pub trait AudioCodec: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedClip, DecodeError>;

    fn encode(&self, clip: &DecodedClip, format: OutputFormat) -> Result<Vec<u8>, WritingError>;

    fn resample(&self, clip: DecodedClip, target_rate: u32) -> Result<DecodedClip, ResampleError> {
        if clip.sample_rate == target_rate {
            return Ok(clip);
        }
        let samples = dsp::resample(&clip.samples, clip.channels, clip.sample_rate, target_rate)?;
        Ok(DecodedClip::new(samples, target_rate, clip.channels))
    }

    fn downmix_to_mono(&self, clip: DecodedClip) -> DecodedClip {
        if clip.channels <= 1 {
            return clip;
        }
        let samples = dsp::downmix_to_mono(&clip.samples, clip.channels);
        DecodedClip::new(samples, clip.sample_rate, 1)
    }
}

/// Symphonia for decoding; hound, vorbis_rs and LAME for encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaCodec;

impl AudioCodec for SymphoniaCodec {
    fn decode(&self, path: &Path) -> Result<DecodedClip, DecodeError> {
        let file = fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(DecodeError::MissingSampleRate)?;
        let channels = track
            .codec_params
            .channels
            .ok_or(DecodeError::MissingChannelSpec)?
            .count();

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(DecodeError::Symphonia(e)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let needed = decoded.capacity() * spec.channels.count();
                    if sample_buf.as_ref().is_none_or(|b| b.capacity() < needed) {
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => warn!(
                    "Decode error in {:?}: {}. Skipping packet.",
                    path.file_name().unwrap_or_default(),
                    e
                ),
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(DecodeError::Symphonia(e)),
            }
        }

        debug!(
            "Decoded {:?}: {} Hz, {} channel(s), {} samples",
            path.file_name().unwrap_or_default(),
            sample_rate,
            channels,
            samples.len()
        );
        Ok(DecodedClip::new(samples, sample_rate, channels))
    }

    fn encode(&self, clip: &DecodedClip, format: OutputFormat) -> Result<Vec<u8>, WritingError> {
        match format {
            OutputFormat::Wav => encode_wav(clip.channels, clip.sample_rate, &clip.samples),
            OutputFormat::Ogg => encode_ogg(clip.channels, clip.sample_rate, &clip.samples),
            OutputFormat::Mp3 => encode_mp3(clip.channels, clip.sample_rate, &clip.samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_pcm_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice001.wav");
        let samples: Vec<i16> = (0..2000).map(|i| if i % 2 == 0 { 16384 } else { -8192 }).collect();
        write_test_wav(&path, 2, 22050, &samples);

        let clip = SymphoniaCodec.decode(&path).unwrap();
        assert_eq!(clip.sample_rate, 22050);
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.frames(), 1000);
        assert!((clip.peak_dbfs() - dsp::linear_to_db(0.5)).abs() < 1e-3);
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        fs::write(&path, b"definitely not a riff header").unwrap();
        assert!(SymphoniaCodec.decode(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SymphoniaCodec.decode(&dir.path().join("nope.wav")),
            Err(DecodeError::Io(_))
        ));
    }

    #[test]
    fn default_downmix_and_resample() {
        let clip = DecodedClip::new(vec![0.5, 0.1, 0.5, 0.1], 44100, 2);
        let mono = SymphoniaCodec.downmix_to_mono(clip);
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.3).abs() < 1e-6);

        let same = SymphoniaCodec.resample(mono.clone(), 44100).unwrap();
        assert_eq!(same, mono);
    }

    #[test]
    fn mp3_output_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mouse07.mp3");
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / 44100.0).sin() * 0.3)
            .collect();
        let clip = DecodedClip::new(samples, 44100, 1);

        let bytes = SymphoniaCodec.encode(&clip, OutputFormat::Mp3).unwrap();
        fs::write(&path, bytes).unwrap();
        let decoded = SymphoniaCodec.decode(&path).unwrap();

        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.sample_rate, 44100);
        assert!(decoded.frames().abs_diff(44100) < 4 * 1152, "{} frames", decoded.frames());
        let peak = decoded.peak_dbfs();
        assert!((-13.0..-8.0).contains(&peak), "peak was {peak}");
    }
}
