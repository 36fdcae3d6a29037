//! Clip index ranges.
//!
//! The clip index is the first run of ASCII digits in a filename's stem
//! (`duchess015_b2.wav` has index 15, `alice.mp3` has none). Ranges are
//! written `"<start>-<end>"`, inclusive on both ends, and may carry leading
//! zeros (`"001-010"`).

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Extracts the first contiguous run of digits in the stem of `file_name` as
/// an index. The extension is ignored.
pub fn first_index(file_name: &str) -> Option<u64> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let start = stem.find(|c: char| c.is_ascii_digit())?;
    let digits = &stem[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    // Runs too long for u64 have no meaningful index
    digits[..end].parse().ok()
}

/// Inclusive range of clip indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ClipRange {
    pub start: u64,
    pub end: u64,
}

impl ClipRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, index: u64) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// True when the filename's clip index lies in this range. Filenames
    /// without digits never match.
    pub fn matches(&self, file_name: &str) -> bool {
        first_index(file_name).is_some_and(|index| self.contains(index))
    }
}

impl FromStr for ClipRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let bound = |part: &str| -> Result<u64, ConfigError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };
        let (start, end) = (bound(start)?, bound(end)?);
        if start > end {
            return Err(malformed());
        }
        Ok(Self { start, end })
    }
}

impl TryFrom<String> for ClipRange {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ClipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Tests a raw range spec against a filename. A malformed spec or a filename
/// without digits is simply a non-match.
pub fn matches(range_spec: &str, file_name: &str) -> bool {
    range_spec
        .parse::<ClipRange>()
        .is_ok_and(|range| range.matches(file_name))
}
