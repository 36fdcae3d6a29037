//! Hand-tuned gain table, keyed by character.
//!
//! The table is static configuration. It is not derived from the analysis
//! pass, so operators can tune values freely. In TOML:
//!
//! ```toml
//! [characters.duchess]
//! gain = 3
//! overrides = [
//!     { range = "1-1", gain = 2 },
//!     { range = "10-20" },
//! ]
//! ```

use crate::identity::{CharacterKey, resolve_character_key};
use crate::range::ClipRange;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Gain for a span of clip indices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeOverride {
    pub range: ClipRange,
    /// Gain in dB. A matching override without one falls back to the base gain.
    #[serde(default, alias = "gain")]
    pub gain_db: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GainPolicyEntry {
    /// Additive gain in dB, may be negative.
    #[serde(default, alias = "gain")]
    pub base_gain_db: f64,
    /// Evaluated in declaration order; the first match wins.
    #[serde(default)]
    pub overrides: Vec<RangeOverride>,
}

impl GainPolicyEntry {
    pub fn new(base_gain_db: f64) -> Self {
        Self {
            base_gain_db,
            overrides: Vec::new(),
        }
    }

    pub fn with_override(mut self, range: ClipRange, gain_db: Option<f64>) -> Self {
        self.overrides.push(RangeOverride { range, gain_db });
        self
    }

    /// Effective gain for one clip of this character.
    pub fn resolve(&self, file_name: &str) -> f64 {
        self.overrides
            .iter()
            .find(|o| o.range.matches(file_name))
            .and_then(|o| o.gain_db)
            .unwrap_or(self.base_gain_db)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct GainPolicyTable {
    entries: BTreeMap<CharacterKey, GainPolicyEntry>,
}

impl GainPolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<CharacterKey>, entry: GainPolicyEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&GainPolicyEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CharacterKey> {
        self.entries.keys()
    }

    /// Gain in dB for `file_name`, a clip of `character_key`. Characters
    /// without an entry get 0 dB.
    pub fn resolve_gain(&self, character_key: &str, file_name: &str) -> f64 {
        self.get(character_key)
            .map_or(0.0, |entry| entry.resolve(file_name))
    }

    /// Same as [`resolve_gain`](Self::resolve_gain), with the key derived from
    /// the filename.
    pub fn resolve_for_file(&self, file_name: &str) -> f64 {
        self.resolve_gain(resolve_character_key(file_name).as_str(), file_name)
    }
}

impl FromIterator<(CharacterKey, GainPolicyEntry)> for GainPolicyTable {
    fn from_iter<T: IntoIterator<Item = (CharacterKey, GainPolicyEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
