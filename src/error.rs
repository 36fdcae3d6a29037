use std::path::PathBuf;

use symphonia::core::errors::Error as SymphoniaError;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Symphonia error: {0}")]
    Symphonia(#[from] SymphoniaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No compatible audio track found")]
    NoTrack,
    #[error("Track does not declare a sample rate")]
    MissingSampleRate,
    #[error("Track does not declare a channel layout")]
    MissingChannelSpec,
}

#[derive(thiserror::Error, Debug)]
pub enum WritingError {
    #[error("Writing wav Error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Writing ogg Error: {0}")]
    Ogg(#[from] vorbis_rs::VorbisError),
    #[error("Writing mp3 Error: {0}")]
    Mp3(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot encode {channels} channel(s) at {sample_rate} Hz")]
    InvalidSpec { channels: usize, sample_rate: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum ResampleError {
    #[error("Failed to construct resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),
    #[error("Resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
    #[error("Target sample rate must be non-zero")]
    ZeroRate,
}

/// Problems that invalidate a whole run. Raised before any file is touched.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("No clips found for reference character '{0}'")]
    ReferenceNotFound(String),
    #[error("Reference character '{0}' has a zero safe-gain ceiling")]
    ZeroReferenceCeiling(String),
    #[error("Malformed clip range '{0}', expected '<start>-<end>'")]
    MalformedRange(String),
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Decoding failed for {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("Resampling failed for {path}: {source}")]
    Resample {
        path: PathBuf,
        #[source]
        source: ResampleError,
    },
    #[error("Audio writing failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: WritingError,
    },
    #[error("I/O error during processing of {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} file(s) failed to process")]
    FilesFailed(usize),
}
