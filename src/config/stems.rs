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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use crate::stems::{Stem, StemSet};

/// The configuration for a separation result: an ordered list of stems, master first.
#[derive(Deserialize)]
pub struct StemList {
    /// The stems that belong to this result.
    stems: Vec<Stem>,
}

impl StemList {
    /// Parse a stem list from a YAML file.
    pub fn deserialize(path: &Path) -> Result<StemList, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<StemList>()?)
    }

    /// Converts the list into a validated stem set.
    pub fn to_stem_set(&self) -> Result<StemSet, ConfigError> {
        Ok(StemSet::new(self.stems.clone())?)
    }
}
