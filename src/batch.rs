//! Deploying a clip library.
//!
//! Each source file moves through `Pending -> Skipped | Rendered | Failed`.
//! A failing file never stops the batch; re-running with overwrite enabled is
//! the retry mechanism.

use crate::codec::AudioCodec;
use crate::error::{ConfigError, Error};
use crate::identity::{find_ambiguous_keys, resolve_character_key};
use crate::policy::GainPolicyTable;
use crate::render::{RenderSpec, render};
use crate::{DEFAULT_EXTENSIONS, OutputFormat, find_audio_files, progress_bar};
use indicatif::ParallelProgressIterator;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration options for a deployment run
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Flat directory holding the source clips
    pub input_dir: PathBuf,
    /// Destination directory, created if absent
    pub output_dir: PathBuf,
    /// Re-render clips whose output already exists
    pub overwrite: bool,
    /// Sample rate of every output clip in Hz
    pub sample_rate: u32,
    /// Downmix every output clip to one channel
    pub mono: bool,
    pub format: OutputFormat,
    /// Source file extensions, lowercase, without the dot
    pub extensions: Vec<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        DeployOptions {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("deploy"),
            overwrite: false,
            sample_rate: 44100,
            mono: true,
            format: OutputFormat::Wav,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl DeployOptions {
    /// Output path for a source clip: same stem, format extension.
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        let mut file_name = source.file_stem().unwrap_or_default().to_os_string();
        file_name.push(".");
        file_name.push(self.format.extension());
        self.output_dir.join(file_name)
    }

    pub fn render_spec(&self, gain_db: f64) -> RenderSpec {
        RenderSpec {
            gain_db,
            sample_rate: self.sample_rate,
            mono: self.mono,
            format: self.format,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Output already existed and overwrite is off
    Skipped,
    Rendered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: FileStatus,
}

/// Outcomes in enumeration order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn statuses(&self) -> Vec<&FileStatus> {
        self.outcomes.iter().map(|o| &o.status).collect()
    }

    pub fn rendered(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Rendered))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn failures(&self) -> Vec<(&Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                FileStatus::Failed(reason) => Some((o.source.as_path(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    /// `Err(Error::FilesFailed)` when any file failed.
    pub fn ensure_success(&self) -> Result<(), Error> {
        match self.failures().len() {
            0 => Ok(()),
            n => Err(Error::FilesFailed(n)),
        }
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Drives every source clip through gain resolution and rendering.
pub struct Deployer<C> {
    options: DeployOptions,
    policy: GainPolicyTable,
    codec: C,
}

impl<C: AudioCodec> Deployer<C> {
    pub fn new(options: DeployOptions, policy: GainPolicyTable, codec: C) -> Self {
        Self {
            options,
            policy,
            codec,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Runs the whole batch. Only configuration problems are returned as
    /// errors; per-file failures end up in the report.
    pub fn run(&self) -> Result<BatchReport, Error> {
        self.validate_options()?;

        info!("Discovering audio files in {:?}...", self.options.input_dir);
        let sources = find_audio_files(&self.options.input_dir, &self.options.extensions)?;
        if sources.is_empty() {
            info!("No audio files found.");
            return Ok(BatchReport::default());
        }
        info!("Found {} audio files.", sources.len());

        let keys: Vec<_> = sources
            .iter()
            .map(|p| resolve_character_key(p.file_name().unwrap_or_default()))
            .collect();
        for warning in find_ambiguous_keys(&keys) {
            warn!("Ambiguous identity: {}", warning);
        }
        for key in self.policy.keys() {
            if !keys.contains(key) {
                debug!("Gain policy entry '{}' matches no source clip", key);
            }
        }

        let jobs = self.plan(&sources);
        let pb = progress_bar(jobs.len(), "Deploying clips");
        let outcomes: Vec<FileOutcome> = jobs
            .into_par_iter()
            .progress_with(pb.clone())
            .map(|job| self.process(job))
            .collect();
        pb.finish_with_message("Deployment done");

        let report = BatchReport { outcomes };
        for (path, reason) in report.failures() {
            error!("Failed: {:?}: {}", path.file_name().unwrap_or_default(), reason);
        }
        info!(
            "Deployment complete. {} rendered, {} skipped, {} failed.",
            report.rendered(),
            report.skipped(),
            report.failures().len()
        );
        Ok(report)
    }

    fn validate_options(&self) -> Result<(), Error> {
        let options = &self.options;
        if !options.input_dir.is_dir() {
            return Err(ConfigError::InvalidOptions(format!(
                "Input path is not a valid directory: {:?}",
                options.input_dir
            ))
            .into());
        }
        if options.sample_rate == 0 {
            return Err(
                ConfigError::InvalidOptions("Sample rate must be non-zero".to_string()).into(),
            );
        }
        if !options.output_dir.exists() {
            fs::create_dir_all(&options.output_dir).map_err(|e| Error::Io {
                path: options.output_dir.clone(),
                source: e,
            })?;
            info!("Created output directory: {:?}", options.output_dir);
        } else if !options.output_dir.is_dir() {
            return Err(ConfigError::InvalidOptions(format!(
                "Output path exists but is not a directory: {:?}",
                options.output_dir
            ))
            .into());
        }
        Ok(())
    }

    /// Pairs every source with its destination. A source whose destination
    /// was already claimed by an earlier one is marked as a collision.
    /// Destinations are checked for existence here, before anything renders.
    fn plan(&self, sources: &[PathBuf]) -> Vec<Job> {
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        sources
            .iter()
            .map(|source| {
                let destination = self.options.destination_for(source);
                let collides_with = claimed
                    .get(&destination)
                    .map(|earlier| earlier.to_path_buf());
                claimed.entry(destination.clone()).or_insert(source.as_path());
                Job {
                    source: source.clone(),
                    destination_exists: destination.exists(),
                    destination,
                    collides_with,
                }
            })
            .collect()
    }

    fn process(&self, job: Job) -> FileOutcome {
        let status = self.process_status(&job);
        FileOutcome {
            source: job.source,
            destination: job.destination,
            status,
        }
    }

    fn process_status(&self, job: &Job) -> FileStatus {
        let file_name = job
            .source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy();

        if !self.options.overwrite && job.destination_exists {
            info!("Skipping existing file: {:?}", job.destination);
            return FileStatus::Skipped;
        }
        if let Some(earlier) = &job.collides_with {
            return FileStatus::Failed(format!(
                "destination {:?} is also produced by {:?}",
                job.destination, earlier
            ));
        }

        let gain_db = self.policy.resolve_for_file(&file_name);
        let spec = self.options.render_spec(gain_db);
        match render(&self.codec, &job.source, &job.destination, &spec) {
            Ok(()) => {
                info!(
                    "Converted and saved: {:?} ({:+.1} dB)",
                    job.destination, gain_db
                );
                FileStatus::Rendered
            }
            Err(e) => {
                warn!("Error processing {}: {}", file_name, e);
                FileStatus::Failed(e.to_string())
            }
        }
    }
}

struct Job {
    source: PathBuf,
    destination: PathBuf,
    destination_exists: bool,
    collides_with: Option<PathBuf>,
}
