// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{collections::HashSet, fmt, slice};

use serde::Deserialize;

pub mod catalog;

pub use catalog::Model;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StemError {
    #[error("stem name must not be empty")]
    EmptyName,
    #[error("duplicate stem name '{0}'")]
    Duplicate(String),
    #[error("unknown separation model '{0}'")]
    UnknownModel(String),
}

/// One isolated track cut from the original recording.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stem {
    /// The name of the stem, unique within its set.
    name: String,
    /// Where the audio for the stem can be streamed from.
    url: String,
}

impl Stem {
    /// Creates a new stem.
    pub fn new(name: &str, url: &str) -> Stem {
        Stem {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    /// Gets the name of the stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the URL of the stem.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// An ordered set of stems from one separation result. The first stem is the master that every
/// other stem is synchronized against. Stem sets are immutable; a new result replaces the set as
/// a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StemSet {
    stems: Vec<Stem>,
}

impl StemSet {
    /// Creates a new stem set, rejecting empty or duplicate names.
    pub fn new(stems: Vec<Stem>) -> Result<StemSet, StemError> {
        let mut seen = HashSet::new();
        for stem in stems.iter() {
            if stem.name.is_empty() {
                return Err(StemError::EmptyName);
            }
            if !seen.insert(stem.name.as_str()) {
                return Err(StemError::Duplicate(stem.name.clone()));
            }
        }

        Ok(StemSet { stems })
    }

    /// Builds the stem set a separation model produces for the given session. Stems are
    /// downloadable from `{base_url}/download/{session_id}/{stem}`.
    pub fn from_model(model: Model, base_url: &str, session_id: &str) -> StemSet {
        let base_url = base_url.trim_end_matches('/');
        StemSet {
            stems: model
                .stems()
                .iter()
                .map(|name| {
                    Stem::new(
                        name,
                        &format!("{}/download/{}/{}", base_url, session_id, name),
                    )
                })
                .collect(),
        }
    }

    /// The master stem, if the set isn't empty.
    pub fn master(&self) -> Option<&Stem> {
        self.stems.first()
    }

    /// Returns true if the named stem is the master.
    pub fn is_master(&self, name: &str) -> bool {
        self.master().is_some_and(|master| master.name == name)
    }

    /// Returns true if the set contains the named stem.
    pub fn contains(&self, name: &str) -> bool {
        self.stems.iter().any(|stem| stem.name == name)
    }

    /// Iterates over the stems in order.
    pub fn iter(&self) -> slice::Iter<'_, Stem> {
        self.stems.iter()
    }

    /// The number of stems in the set.
    pub fn len(&self) -> usize {
        self.stems.len()
    }

    /// Returns true if there are no stems.
    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

impl<'a> IntoIterator for &'a StemSet {
    type Item = &'a Stem;
    type IntoIter = slice::Iter<'a, Stem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for StemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stems (count: {}):", self.stems.len())?;
        for (i, stem) in self.stems.iter().enumerate() {
            if i == 0 {
                writeln!(f, "- {} [master]", stem)?;
            } else {
                writeln!(f, "- {}", stem)?;
            }
        }
        Ok(())
    }
}
