use std::fs;
use std::path::Path;

use voice_clip_leveler::error::{ConfigError, DecodeError, WritingError};
use voice_clip_leveler::identity::AmbiguousIdentity;
use voice_clip_leveler::{
    AnalysisOptions, AudioCodec, DecodedClip, Error, OutputFormat, analyze_folder,
};

/// Decodes every file to a clip whose peak is encoded in the file contents.
struct PeakFromContents;

impl AudioCodec for PeakFromContents {
    fn decode(&self, path: &Path) -> Result<DecodedClip, DecodeError> {
        let text = fs::read_to_string(path)?;
        let peak: f32 = text.trim().parse().map_err(|_| DecodeError::NoTrack)?;
        Ok(DecodedClip::new(vec![0.0, peak, -peak / 2.0], 44100, 1))
    }

    fn encode(&self, _: &DecodedClip, _: OutputFormat) -> Result<Vec<u8>, WritingError> {
        unreachable!("analysis never encodes")
    }
}

fn library(clips: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in clips {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

#[test]
fn profiles_use_the_loudest_clip_of_each_character() {
    let dir = library(&[
        ("mouse1.wav", "0.5"),
        ("mouse2.wav", "0.25"),
        ("lory_1.mp3", "1.0"),
        ("lory_2.mp3", "0.8"),
    ]);
    let options = AnalysisOptions {
        input_dir: dir.path().to_path_buf(),
        reference: Some("mouse".to_string()),
        ..Default::default()
    };
    let report = analyze_folder(&options, &PeakFromContents).unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.measurements.len(), 4);

    let mouse = &report.profiles["mouse"];
    assert_eq!(mouse.clip_count, 2);
    assert!((mouse.max_safe_gain.linear - 2.0).abs() < 1e-6);
    assert_eq!(mouse.normalization.unwrap().linear, 1.0);

    let lory = &report.profiles["lory"];
    assert!((lory.max_safe_gain.linear - 1.0).abs() < 1e-6);
    assert!(lory.max_safe_gain.db.abs() < 1e-6);
    let normalization = lory.normalization.unwrap();
    assert!((normalization.linear - 0.5).abs() < 1e-6);
    assert!((normalization.db + 6.0206).abs() < 1e-3);
}

#[test]
fn undecodable_files_are_reported_not_fatal() {
    let dir = library(&[("alice1.wav", "0.5"), ("alice2.wav", "not audio")]);
    let options = AnalysisOptions {
        input_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = analyze_folder(&options, &PeakFromContents).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("alice2.wav"));
    assert_eq!(report.profiles["alice"].clip_count, 1);
}

#[test]
fn silent_clips_are_capped() {
    let dir = library(&[("n1.wav", "0.0")]);
    let options = AnalysisOptions {
        input_dir: dir.path().to_path_buf(),
        max_gain_db: 30.0,
        ..Default::default()
    };
    let report = analyze_folder(&options, &PeakFromContents).unwrap();
    assert_eq!(report.profiles["n"].max_safe_gain.db, 30.0);
}

#[test]
fn missing_reference_halts_analysis() {
    let dir = library(&[("alice1.wav", "0.5")]);
    let options = AnalysisOptions {
        input_dir: dir.path().to_path_buf(),
        reference: Some("mouse".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        analyze_folder(&options, &PeakFromContents),
        Err(Error::Config(ConfigError::ReferenceNotFound(_)))
    ));
}

#[test]
fn prefix_keys_are_flagged() {
    let dir = library(&[("n1.wav", "0.5"), ("na1.wav", "0.5"), ("001.wav", "0.5")]);
    let options = AnalysisOptions {
        input_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = analyze_folder(&options, &PeakFromContents).unwrap();
    assert_eq!(report.profiles.len(), 3);
    assert!(report.ambiguities.contains(&AmbiguousIdentity::EmptyKey));
    assert!(report.ambiguities.iter().any(|a| matches!(
        a,
        AmbiguousIdentity::PrefixOf { key, other } if key.as_str() == "n" && other.as_str() == "na"
    )));
}
