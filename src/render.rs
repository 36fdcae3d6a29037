use crate::OutputFormat;
use crate::codec::AudioCodec;
use crate::dsp::apply_gain_db;
use crate::error::Error;
use log::debug;
use std::fs;
use std::path::Path;

/// Everything needed to produce one output clip. Built fresh for every file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSpec {
    /// Additive gain in dB, relative to the decoded signal
    pub gain_db: f64,
    pub sample_rate: u32,
    pub mono: bool,
    pub format: OutputFormat,
}

/// Decodes `source`, applies the gain, converts rate and layout, encodes and
/// writes the result to `destination`.
///
/// The stages always run in this order: gain is defined against the decoded
/// signal's peak, before any resampling.
pub fn render<C: AudioCodec + ?Sized>(
    codec: &C,
    source: &Path,
    destination: &Path,
    spec: &RenderSpec,
) -> Result<(), Error> {
    let mut clip = codec.decode(source).map_err(|e| Error::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;

    if spec.gain_db != 0.0 {
        apply_gain_db(&mut clip.samples, spec.gain_db);
    }

    let mut clip = codec
        .resample(clip, spec.sample_rate)
        .map_err(|e| Error::Resample {
            path: source.to_path_buf(),
            source: e,
        })?;
    if spec.mono {
        clip = codec.downmix_to_mono(clip);
    }

    let bytes = codec
        .encode(&clip, spec.format)
        .map_err(|e| Error::Write {
            path: destination.to_path_buf(),
            source: e,
        })?;
    fs::write(destination, bytes).map_err(|e| Error::Write {
        path: destination.to_path_buf(),
        source: e.into(),
    })?;

    debug!(
        "Rendered {:?} -> {:?} ({:+.2} dB, {} Hz, {} channel(s), {})",
        source.file_name().unwrap_or_default(),
        destination,
        spec.gain_db,
        clip.sample_rate,
        clip.channels,
        spec.format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecodedClip, SymphoniaCodec};
    use crate::error::DecodeError;
    use std::io::Cursor;

    fn write_test_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let s = ((i as f32 * 0.05).sin() * 8192.0) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn renders_with_gain_rate_and_downmix() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("alice001.wav");
        let destination = dir.path().join("out.wav");
        write_test_wav(&source, 2, 44100, 44100);

        let spec = RenderSpec {
            gain_db: 6.0,
            sample_rate: 22050,
            mono: true,
            format: OutputFormat::Wav,
        };
        render(&SymphoniaCodec, &source, &destination, &spec).unwrap();

        let bytes = fs::read(&destination).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.duration(), 22050);

        let before = SymphoniaCodec.decode(&source).unwrap().peak_dbfs();
        let after = SymphoniaCodec.decode(&destination).unwrap().peak_dbfs();
        assert!((after - before - 6.0).abs() < 0.5, "{before} -> {after}");
    }

    #[test]
    fn missing_source_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = RenderSpec {
            gain_db: 0.0,
            sample_rate: 44100,
            mono: false,
            format: OutputFormat::Wav,
        };
        let result = render(
            &SymphoniaCodec,
            &dir.path().join("absent.wav"),
            &dir.path().join("out.wav"),
            &spec,
        );
        assert!(matches!(
            result,
            Err(Error::Decode {
                source: DecodeError::Io(_),
                ..
            })
        ));
    }

    #[test]
    fn unwritable_destination_is_a_write_error() {
        struct Silence;
        impl AudioCodec for Silence {
            fn decode(&self, _: &Path) -> Result<DecodedClip, DecodeError> {
                Ok(DecodedClip::new(vec![0.0; 64], 44100, 1))
            }
            fn encode(
                &self,
                _: &DecodedClip,
                _: OutputFormat,
            ) -> Result<Vec<u8>, crate::error::WritingError> {
                Ok(vec![0; 4])
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing-dir").join("out.wav");
        let spec = RenderSpec {
            gain_db: 0.0,
            sample_rate: 44100,
            mono: true,
            format: OutputFormat::Wav,
        };
        let result = render(&Silence, Path::new("in.wav"), &destination, &spec);
        assert!(matches!(result, Err(Error::Write { .. })));
    }
}
