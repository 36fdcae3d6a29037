//! Character identity derived from clip filenames.
//!
//! Clips are named `<character><digits><optional _>.<ext>`, e.g. `alice015.wav`
//! or `mouse_3.mp3`. The character key is the stem with every ASCII digit
//! removed and a single trailing underscore stripped.

use serde::Deserialize;
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

const SEPARATOR: char = '_';

/// Identity shared by every clip of one speaking character. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct CharacterKey(String);

impl CharacterKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CharacterKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CharacterKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Derives the character key of a clip. Never fails; a filename made only of
/// digits yields an empty key.
pub fn resolve_character_key(file_name: impl AsRef<Path>) -> CharacterKey {
    let stem = file_name
        .as_ref()
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    let mut key: String = stem.chars().filter(|c| !c.is_ascii_digit()).collect();
    if key.ends_with(SEPARATOR) {
        key.pop();
    }
    CharacterKey(key)
}

/// Why two character keys may refer to the same (or no) character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbiguousIdentity {
    /// A filename reduced to nothing, usually a numeric-only name.
    EmptyKey,
    /// `key` is a strict prefix of `other`, as with `n` and `na`.
    PrefixOf { key: CharacterKey, other: CharacterKey },
}

impl fmt::Display for AmbiguousIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "a clip name reduces to an empty character key"),
            Self::PrefixOf { key, other } => write!(
                f,
                "character key '{}' is a prefix of '{}'; check they are distinct characters",
                key, other
            ),
        }
    }
}

/// Reports keys that look like naming collisions. Advisory: callers log these
/// and carry on, grouping stays exact-match.
pub fn find_ambiguous_keys<'a>(
    keys: impl IntoIterator<Item = &'a CharacterKey>,
) -> Vec<AmbiguousIdentity> {
    let mut keys: Vec<&CharacterKey> = keys.into_iter().collect();
    keys.sort();
    keys.dedup();

    let mut warnings = Vec::new();
    if keys.iter().any(|k| k.is_empty()) {
        warnings.push(AmbiguousIdentity::EmptyKey);
    }
    for key in keys.iter().filter(|k| !k.is_empty()) {
        for other in keys.iter() {
            if other.as_str() != key.as_str() && other.as_str().starts_with(key.as_str()) {
                warnings.push(AmbiguousIdentity::PrefixOf {
                    key: (*key).clone(),
                    other: (*other).clone(),
                });
            }
        }
    }
    warnings
}
