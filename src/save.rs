use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};
use vorbis_rs::VorbisEncoderBuilder;

use crate::error::WritingError;
use std::{io::Cursor, num::NonZero};

/// Encodes audio data as a 32-bit float WAV file in memory
///
/// # Arguments
/// * `channels` - Number of audio channels
/// * `sample_rate` - Sample rate in Hz
/// * `samples` - Interleaved audio samples in 32-bit float format
pub fn encode_wav(
    channels: usize,
    sample_rate: u32,
    samples: &[f32],
) -> Result<Vec<u8>, WritingError> {
    let channel_count = u16::try_from(channels)
        .ok()
        .filter(|&c| c > 0)
        .ok_or(WritingError::InvalidSpec {
            channels,
            sample_rate,
        })?;
    let spec = hound::WavSpec {
        channels: channel_count,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
    for &sample in samples {
        writer.write_sample(sample.clamp(-1.0, 1.0))?;
    }
    writer.finalize()?;
    Ok(bytes)
}

/// Encodes audio data as an Ogg Vorbis stream in memory
///
/// # Arguments
/// * `channels` - Number of audio channels
/// * `sample_rate` - Sample rate in Hz
/// * `samples` - Interleaved audio samples in 32-bit float format
pub fn encode_ogg(
    channels: usize,
    sample_rate: u32,
    samples: &[f32],
) -> Result<Vec<u8>, WritingError> {
    let invalid = || WritingError::InvalidSpec {
        channels,
        sample_rate,
    };
    let rate = NonZero::new(sample_rate).ok_or_else(invalid)?;
    let channel_count = u8::try_from(channels)
        .ok()
        .and_then(NonZero::new)
        .ok_or_else(invalid)?;

    let mut bytes = Vec::new();
    let mut encoder = VorbisEncoderBuilder::new(rate, channel_count, &mut bytes)?.build()?;

    // One second of audio per block
    let block_samples = sample_rate as usize * channels;
    for block in samples.chunks(block_samples) {
        let mut planar_samples: Vec<Vec<f32>> =
            vec![Vec::with_capacity(block.len() / channels); channels];
        for frame in block.chunks_exact(channels) {
            for (plane, &sample) in planar_samples.iter_mut().zip(frame) {
                plane.push(sample.clamp(-1.0, 1.0));
            }
        }
        encoder.encode_audio_block(&planar_samples)?;
    }
    encoder.finish()?;
    Ok(bytes)
}

/// Bytes LAME may emit on flush
const MP3_FLUSH_BYTES: usize = 7200;

/// Encodes audio data as a 192 kbps MP3 stream in memory. Only mono and
/// stereo input is supported.
pub fn encode_mp3(
    channels: usize,
    sample_rate: u32,
    samples: &[f32],
) -> Result<Vec<u8>, WritingError> {
    if !(1..=2).contains(&channels) || sample_rate == 0 {
        return Err(WritingError::InvalidSpec {
            channels,
            sample_rate,
        });
    }
    let mut builder = Builder::new()
        .ok_or_else(|| WritingError::Mp3("failed to allocate LAME encoder".to_string()))?;
    builder.set_num_channels(channels as u8).map_err(lame_error)?;
    builder.set_sample_rate(sample_rate).map_err(lame_error)?;
    builder.set_brate(Bitrate::Kbps192).map_err(lame_error)?;
    builder.set_quality(Quality::Best).map_err(lame_error)?;
    let mut encoder = builder.build().map_err(lame_error)?;

    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect();
    let frames = pcm.len() / channels;

    let mut bytes = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(frames));
    let encoded = match channels {
        1 => encoder.encode_to_vec(MonoPcm(&pcm[..]), &mut bytes),
        _ => encoder.encode_to_vec(InterleavedPcm(&pcm[..frames * 2]), &mut bytes),
    };
    encoded.map_err(lame_error)?;
    bytes.reserve(MP3_FLUSH_BYTES);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut bytes)
        .map_err(lame_error)?;
    Ok(bytes)
}

fn lame_error(e: impl std::fmt::Debug) -> WritingError {
    WritingError::Mp3(format!("{e:?}"))
}
