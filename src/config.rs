//! Project configuration file.
//!
//! Everything here is optional; command-line flags override file values and
//! the merged settings are handed to the library as explicit
//! [`DeployOptions`]/[`AnalysisOptions`] values.
//!
//! ```toml
//! [analysis]
//! reference = "mouse"
//!
//! [deploy]
//! sample_rate = 44100
//! mono = true
//! format = "wav"
//!
//! [characters.alice]
//! gain = 5
//! ```

use crate::analysis::{AnalysisOptions, DEFAULT_MAX_GAIN_DB};
use crate::batch::DeployOptions;
use crate::error::ConfigError;
use crate::policy::GainPolicyTable;
use crate::{DEFAULT_EXTENSIONS, OutputFormat};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub reference: Option<String>,
    pub max_gain_db: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            reference: None,
            max_gain_db: DEFAULT_MAX_GAIN_DB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploySettings {
    pub overwrite: bool,
    pub sample_rate: u32,
    pub mono: bool,
    pub format: OutputFormat,
    pub extensions: Vec<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        let defaults = DeployOptions::default();
        Self {
            overwrite: defaults.overwrite,
            sample_rate: defaults.sample_rate,
            mono: defaults.mono,
            format: defaults.format,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub analysis: AnalysisSettings,
    pub deploy: DeploySettings,
    pub characters: GainPolicyTable,
}

impl ProjectConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn analysis_options(&self, input_dir: PathBuf) -> AnalysisOptions {
        AnalysisOptions {
            input_dir,
            reference: self.analysis.reference.clone(),
            max_gain_db: self.analysis.max_gain_db,
            extensions: normalize_extensions(&self.deploy.extensions),
        }
    }

    pub fn deploy_options(&self, input_dir: PathBuf, output_dir: PathBuf) -> DeployOptions {
        DeployOptions {
            input_dir,
            output_dir,
            overwrite: self.deploy.overwrite,
            sample_rate: self.deploy.sample_rate,
            mono: self.deploy.mono,
            format: self.deploy.format,
            extensions: normalize_extensions(&self.deploy.extensions),
        }
    }
}

/// Lowercases and drops leading dots, so `".WAV"` and `"wav"` agree.
fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
