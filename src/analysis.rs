//! Peak headroom analysis.
//!
//! Every clip's safe gain is the amplification that would bring its peak to
//! exactly 0 dBFS. A character's ceiling is the smallest safe gain among its
//! clips, since one shared gain must not clip any of them. Optionally each
//! ceiling is expressed relative to a reference character's.
//!
//! The result is advisory. It helps an operator pick the base gains of the
//! [`GainPolicyTable`](crate::policy::GainPolicyTable); nothing here touches
//! audio on disk.

use crate::codec::{AudioCodec, DecodedClip};
use crate::dsp::{db_to_linear, linear_to_db};
use crate::error::{ConfigError, Error};
use crate::identity::{AmbiguousIdentity, CharacterKey, find_ambiguous_keys, resolve_character_key};
use crate::{DEFAULT_EXTENSIONS, find_audio_files, progress_bar};
use indicatif::ParallelProgressIterator;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Safe gain assigned to silent clips, which have no peak to protect.
pub const DEFAULT_MAX_GAIN_DB: f64 = 96.0;

/// Headroom to clipping, kept in both scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeGain {
    pub linear: f64,
    pub db: f64,
}

impl SafeGain {
    pub fn from_db(db: f64) -> Self {
        Self {
            linear: db_to_linear(db),
            db,
        }
    }

    pub fn from_linear(linear: f64) -> Self {
        Self {
            linear,
            db: linear_to_db(linear),
        }
    }

    /// Headroom of a clip peaking at `peak_dbfs`. A silent clip (negative
    /// infinity) is capped at `max_gain_db`.
    pub fn from_peak_dbfs(peak_dbfs: f64, max_gain_db: f64) -> Self {
        if peak_dbfs == f64::NEG_INFINITY {
            return Self::from_db(max_gain_db);
        }
        Self::from_db(-peak_dbfs)
    }
}

/// Safe gain of a decoded clip.
pub fn safe_gain(clip: &DecodedClip, max_gain_db: f64) -> SafeGain {
    SafeGain::from_peak_dbfs(clip.peak_dbfs(), max_gain_db)
}

/// One analysed clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipMeasurement {
    pub file_name: String,
    pub peak_dbfs: f64,
    pub safe_gain: SafeGain,
}

impl ClipMeasurement {
    pub fn new(file_name: impl Into<String>, peak_dbfs: f64, max_gain_db: f64) -> Self {
        Self {
            file_name: file_name.into(),
            peak_dbfs,
            safe_gain: SafeGain::from_peak_dbfs(peak_dbfs, max_gain_db),
        }
    }

    pub fn character_key(&self) -> CharacterKey {
        resolve_character_key(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterLoudnessProfile {
    pub clip_count: usize,
    /// Minimum safe gain over all the character's clips.
    pub max_safe_gain: SafeGain,
    /// `max_safe_gain` divided by the reference character's, when a reference
    /// was configured.
    pub normalization: Option<SafeGain>,
}

/// Groups measurements by character and reduces each group to its binding
/// ceiling. With a `reference` key every profile also gets its ceiling
/// relative to the reference's.
pub fn aggregate(
    measurements: &[ClipMeasurement],
    reference: Option<&str>,
) -> Result<BTreeMap<CharacterKey, CharacterLoudnessProfile>, ConfigError> {
    let mut ceilings: BTreeMap<CharacterKey, (usize, f64)> = BTreeMap::new();
    for measurement in measurements {
        let (count, min_linear) = ceilings
            .entry(measurement.character_key())
            .or_insert((0, f64::INFINITY));
        *count += 1;
        *min_linear = min_linear.min(measurement.safe_gain.linear);
    }

    let reference_linear = match reference {
        Some(key) => {
            let (_, linear) = ceilings
                .get(key)
                .ok_or_else(|| ConfigError::ReferenceNotFound(key.to_string()))?;
            if *linear == 0.0 || !linear.is_finite() {
                return Err(ConfigError::ZeroReferenceCeiling(key.to_string()));
            }
            Some((key, *linear))
        }
        None => None,
    };

    Ok(ceilings
        .into_iter()
        .map(|(key, (clip_count, min_linear))| {
            let normalization = reference_linear.map(|(reference_key, reference_linear)| {
                if key.as_str() == reference_key {
                    SafeGain::from_linear(1.0)
                } else {
                    SafeGain::from_linear(min_linear / reference_linear)
                }
            });
            let profile = CharacterLoudnessProfile {
                clip_count,
                max_safe_gain: SafeGain::from_linear(min_linear),
                normalization,
            };
            (key, profile)
        })
        .collect())
}

/// Configuration for an analysis pass over a directory.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub input_dir: PathBuf,
    /// Character whose ceiling the others are normalized against.
    pub reference: Option<String>,
    /// Safe gain in dB assigned to silent clips.
    pub max_gain_db: f64,
    /// Source file extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            input_dir: PathBuf::from("."),
            reference: None,
            max_gain_db: DEFAULT_MAX_GAIN_DB,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub profiles: BTreeMap<CharacterKey, CharacterLoudnessProfile>,
    pub measurements: Vec<ClipMeasurement>,
    /// Files that could not be decoded, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    pub ambiguities: Vec<AmbiguousIdentity>,
}

impl AnalysisReport {
    pub fn log_summary(&self) {
        for (key, profile) in &self.profiles {
            info!("Character: {} ({} clips)", key, profile.clip_count);
            info!(
                "  Max Safe Gain: {:.3}x ({:.2} dB)",
                profile.max_safe_gain.linear, profile.max_safe_gain.db
            );
            if let Some(n) = profile.normalization {
                info!(
                    "  Relative to reference: {:.3}x ({:.2} dB)",
                    n.linear, n.db
                );
            }
        }
    }
}

/// Decodes every clip under `options.input_dir` and aggregates per-character
/// ceilings. Undecodable files are reported, not fatal. A missing or silent
/// reference is.
pub fn analyze_folder<C: AudioCodec>(
    options: &AnalysisOptions,
    codec: &C,
) -> Result<AnalysisReport, Error> {
    if !options.input_dir.is_dir() {
        return Err(ConfigError::InvalidOptions(format!(
            "Input path is not a valid directory: {:?}",
            options.input_dir
        ))
        .into());
    }

    info!("Discovering audio files in {:?}...", options.input_dir);
    let files = find_audio_files(&options.input_dir, &options.extensions)?;
    info!("Found {} audio files.", files.len());

    let pb = progress_bar(files.len(), "Measuring peaks");
    let results: Vec<Result<ClipMeasurement, (PathBuf, String)>> = files
        .par_iter()
        .progress_with(pb.clone())
        .map(|path| {
            let file_name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();
            match codec.decode(path) {
                Ok(clip) => {
                    let measurement =
                        ClipMeasurement::new(file_name, clip.peak_dbfs(), options.max_gain_db);
                    debug!(
                        "{}: peak {:.2} dBFS, safe gain {:.2} dB",
                        measurement.file_name, measurement.peak_dbfs, measurement.safe_gain.db
                    );
                    Ok(measurement)
                }
                Err(e) => {
                    warn!("Failed to measure {}: {}", file_name, e);
                    Err((path.clone(), e.to_string()))
                }
            }
        })
        .collect();
    pb.finish_with_message("Measurement done");

    let (measurements, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let measurements: Vec<ClipMeasurement> = measurements.into_iter().flatten().collect();
    let failures: Vec<(PathBuf, String)> = failures.into_iter().filter_map(Result::err).collect();

    let profiles = aggregate(&measurements, options.reference.as_deref())?;
    let ambiguities = find_ambiguous_keys(profiles.keys());
    for warning in &ambiguities {
        warn!("Ambiguous identity: {}", warning);
    }

    Ok(AnalysisReport {
        profiles,
        measurements,
        failures,
        ambiguities,
    })
}
