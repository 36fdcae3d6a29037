//! Sample-level operations on interleaved f32 buffers.

use crate::error::ResampleError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const RESAMPLE_CHUNK_FRAMES: usize = 1024;

#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.log10()
}

/// Peak level in dBFS, or negative infinity for silence.
pub fn peak_dbfs(samples: &[f32]) -> f64 {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        linear_to_db(peak as f64)
    } else {
        f64::NEG_INFINITY
    }
}

/// Scales every sample by `gain_db`. No clamping happens here; the encoder
/// limits to full scale.
pub fn apply_gain_db(samples: &mut [f32], gain_db: f64) {
    let gain = db_to_linear(gain_db) as f32;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Averages all channels of each frame into one.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels.max(1);
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planar.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planar
}

pub fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let Some(frames) = planar.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    let mut interleaved = Vec::with_capacity(frames * planar.len());
    for frame_idx in 0..frames {
        for plane in planar {
            interleaved.push(plane[frame_idx]);
        }
    }
    interleaved
}

/// Converts a whole interleaved buffer from `from_rate` to `to_rate` with a
/// sinc resampler. The output is trimmed of the filter delay so it lines up
/// with the input and has `round(frames * ratio)` frames.
pub fn resample(
    samples: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if to_rate == 0 || from_rate == 0 {
        return Err(ResampleError::ZeroRate);
    }
    if from_rate == to_rate || samples.is_empty() || channels == 0 {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK_FRAMES, channels)?;

    let planar = deinterleave(samples, channels);
    let frames = planar[0].len();
    let expected_frames = (frames as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_frames + delay); channels];

    let mut offset = 0;
    while frames - offset >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar
            .iter()
            .map(|p| &p[offset..offset + needed])
            .collect();
        append_planar(&mut output, resampler.process(chunk.as_slice(), None)?);
        offset += needed;
    }
    if offset < frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|p| &p[offset..]).collect();
        append_planar(
            &mut output,
            resampler.process_partial(Some(chunk.as_slice()), None)?,
        );
    }
    // Flush the filter tail until the delayed signal is complete
    while output[0].len() < expected_frames + delay {
        let tail = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if tail.first().is_none_or(Vec::is_empty) {
            break;
        }
        append_planar(&mut output, tail);
    }

    for plane in output.iter_mut() {
        plane.drain(..delay.min(plane.len()));
        plane.truncate(expected_frames);
    }
    Ok(interleave(&output))
}

fn append_planar(output: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (plane, new) in output.iter_mut().zip(chunk) {
        plane.extend(new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_round_trip() {
        for db in [-60.0, -6.0, 0.0, 3.5, 20.0] {
            assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-9);
        }
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn peak_of_silence_is_negative_infinity() {
        assert_eq!(peak_dbfs(&[0.0; 16]), f64::NEG_INFINITY);
        assert_eq!(peak_dbfs(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn peak_uses_absolute_value() {
        let peak = peak_dbfs(&[0.1, -0.5, 0.25]);
        assert!((peak - linear_to_db(0.5)).abs() < 1e-6);
    }

    #[test]
    fn gain_scales_samples() {
        let mut samples = vec![0.25_f32, -0.25];
        apply_gain_db(&mut samples, linear_to_db(2.0));
        assert!((samples[0] - 0.5).abs() < 1e-6);
        assert!((samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_averages_frames() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn interleave_inverts_deinterleave() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = deinterleave(&samples, 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(interleave(&planar), samples);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![0.5_f32; 480];
        assert_eq!(resample(&samples, 1, 48000, 48000).unwrap(), samples);
    }

    #[test]
    fn resample_preserves_duration() {
        let frames = 48000;
        let samples: Vec<f32> = (0..frames * 2)
            .map(|i| ((i / 2) as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin() * 0.5)
            .collect();
        let out = resample(&samples, 2, 48000, 22050).unwrap();
        assert_eq!(out.len(), 22050 * 2);

        let out = resample(&samples[..2000], 2, 48000, 44100).unwrap();
        assert_eq!(out.len(), 919 * 2);
    }

    #[test]
    fn resample_rejects_zero_rate() {
        assert!(matches!(
            resample(&[0.0; 4], 1, 44100, 0),
            Err(ResampleError::ZeroRate)
        ));
    }
}
