//! Spoofing profiles: the ordered table of (timezone, language tags) pairs
//! applied one per collection iteration.
//!
//! # Example
//!
//! ```rust
//! use fp_sampler::profiles::{Profile, ProfileTable};
//!
//! let table = ProfileTable::new(vec![
//!     Profile::new("01_Irish", "Europe/Dublin", ["en-IE", "en"]),
//!     Profile::new("02_Berlin", "Europe/Berlin", ["de-DE"]),
//! ])
//! .expect("should accept profiles");
//! assert_eq!(table.len(), 2);
//! ```

use crate::error::{Result, SamplerError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One locale/timezone identity applied before a single sample is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Unique label, reported as `label_type` on the sample
    pub label: String,
    /// IANA zone id, e.g. `Europe/Dublin`
    pub timezone: String,
    /// Locale tags, primary first
    pub languages: Vec<String>,
}

impl Profile {
    pub fn new<I, S>(label: impl Into<String>, timezone: impl Into<String>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            timezone: timezone.into(),
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    /// The tag reported as `navigator.language`.
    pub fn primary_language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.label,
            self.timezone,
            self.languages.join(",")
        )
    }
}

/// Validated, ordered profile table. Defines the iteration count and order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Profile>", into = "Vec<Profile>")]
pub struct ProfileTable {
    profiles: Vec<Profile>,
}

impl ProfileTable {
    /// Build a table, rejecting empty tables, duplicate labels and profiles
    /// with a blank timezone or no language tags.
    pub fn new(profiles: Vec<Profile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(SamplerError::InvalidProfiles(
                "at least one profile is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.label.as_str()) {
                return Err(SamplerError::InvalidProfiles(format!(
                    "duplicate label '{}'",
                    profile.label
                )));
            }
            if profile.timezone.trim().is_empty() {
                return Err(SamplerError::InvalidProfiles(format!(
                    "profile '{}' has no timezone",
                    profile.label
                )));
            }
            if profile.languages.is_empty() {
                return Err(SamplerError::InvalidProfiles(format!(
                    "profile '{}' has no language tags",
                    profile.label
                )));
            }
            if let Some(pos) = profile.languages.iter().position(|tag| tag.trim().is_empty()) {
                return Err(SamplerError::InvalidProfiles(format!(
                    "profile '{}' has a blank language tag at position {}",
                    profile.label, pos
                )));
            }
        }

        Ok(Self { profiles })
    }

    /// The regional launcher table: one profile per target market.
    pub fn geo() -> Self {
        Self {
            profiles: vec![
                Profile::new("01_Irish_Base", "Europe/Dublin", ["en-IE"]),
                Profile::new("02_US_Mismatch", "America/New_York", ["en-US"]),
                Profile::new("03_UK_Overlap", "Europe/London", ["en-GB"]),
                Profile::new("04_German_EU", "Europe/Berlin", ["de-DE"]),
                Profile::new("05_French_EU", "Europe/Paris", ["fr-FR"]),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn as_slice(&self) -> &[Profile] {
        &self.profiles
    }
}

/// The anchor table: a Dublin baseline followed by single-surface mismatches.
impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            profiles: vec![
                Profile::new("01_Default_Base_Anchor", "Europe/Dublin", ["en-GB"]),
                Profile::new("02_Spoof_US_TZ_Mismatch", "America/New_York", ["en-IE"]),
                Profile::new("03_Spoof_Culture_ES", "Europe/Dublin", ["es-ES"]),
                Profile::new("04_Spoof_Generic_UTC", "UTC", ["en"]),
                Profile::new("05_Spoof_Zoom_Proxy", "Europe/Dublin", ["en-US"]),
            ],
        }
    }
}

impl TryFrom<Vec<Profile>> for ProfileTable {
    type Error = SamplerError;

    fn try_from(profiles: Vec<Profile>) -> Result<Self> {
        Self::new(profiles)
    }
}

impl From<ProfileTable> for Vec<Profile> {
    fn from(table: ProfileTable) -> Self {
        table.profiles
    }
}

impl<'a> IntoIterator for &'a ProfileTable {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}
