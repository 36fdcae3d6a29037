/// Peak headroom analysis and per-character aggregation
pub mod analysis;
/// Batch deployment of a clip library
pub mod batch;
/// Codec boundary and the symphonia-backed implementation
pub mod codec;
/// TOML project configuration
pub mod config;
/// Sample-level DSP helpers
pub mod dsp;
/// Module for error handling
pub mod error;
/// Character keys derived from filenames
pub mod identity;
/// Per-character gain table
pub mod policy;
/// Clip index ranges
pub mod range;
/// Single clip rendering
pub mod render;
/// Module for encoding audio files
pub mod save;

pub use analysis::{AnalysisOptions, AnalysisReport, CharacterLoudnessProfile, SafeGain, aggregate, analyze_folder};
pub use batch::{BatchReport, DeployOptions, Deployer, FileOutcome, FileStatus};
pub use codec::{AudioCodec, DecodedClip, SymphoniaCodec};
pub use config::ProjectConfig;
pub use error::Error;
pub use identity::{CharacterKey, resolve_character_key};
pub use policy::{GainPolicyEntry, GainPolicyTable, RangeOverride};
pub use range::ClipRange;
pub use render::{RenderSpec, render};

use error::ConfigError;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum_macros::Display;
use walkdir::WalkDir;

/// Source extensions picked up when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Container written for every deployed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Ogg,
    Mp3,
}

impl OutputFormat {
    /// File extension of the encoded output
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "ogg" | "vorbis" => Ok(Self::Ogg),
            "mp3" => Ok(Self::Mp3),
            other => Err(ConfigError::InvalidOptions(format!(
                "Unsupported output format: {other}"
            ))),
        }
    }
}

/// Configures the global rayon pool. Only the first call has an effect.
pub fn configure_thread_pool(num_threads: Option<usize>) {
    match num_threads {
        Some(num_threads) if num_threads > 0 => {
            let rayon_init_result = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global();
            if let Err(e) = rayon_init_result {
                warn!(
                    "Failed to configure Rayon thread pool: {}. Using default number of threads.",
                    e
                );
            } else {
                info!("Using {} threads for processing.", num_threads);
            }
        }
        _ => info!("Using default number of threads."),
    }
}

pub(crate) fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message);
    pb
}

/// Lists the supported audio files directly inside `input_dir`, sorted by
/// name. Subdirectories are not descended into.
pub fn find_audio_files(
    input_dir: impl AsRef<Path>,
    extensions: &[String],
) -> Result<Vec<PathBuf>, Error> {
    let input_dir = input_dir.as_ref();
    let mut audio_files = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Io {
            path: input_dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(ext) = path
            .extension()
            .and_then(|os| os.to_str())
            .map(|s| s.to_lowercase())
        {
            if extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                audio_files.push(path.to_path_buf());
            }
        }
    }
    Ok(audio_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn output_format_parses_and_displays() {
        assert_eq!("WAV".parse::<OutputFormat>().unwrap(), OutputFormat::Wav);
        assert_eq!("ogg".parse::<OutputFormat>().unwrap(), OutputFormat::Ogg);
        assert_eq!("MP3".parse::<OutputFormat>().unwrap(), OutputFormat::Mp3);
        assert!("mp4".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Ogg.to_string(), "ogg");
        assert_eq!(OutputFormat::Wav.extension(), "wav");
        assert_eq!(OutputFormat::Mp3.extension(), "mp3");
        assert_eq!(OutputFormat::Mp3.to_string(), "mp3");
    }

    #[test]
    fn finds_only_supported_top_level_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b02.wav", "a01.MP3", "notes.txt", "c.flac"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d01.wav"), b"").unwrap();

        let extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        let files = find_audio_files(dir.path(), &extensions).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a01.MP3", "b02.wav"]);
    }
}
