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
use std::{fmt, str::FromStr};

use super::StemError;

const SIX_STEMS: &[&str] = &["drums", "bass", "other", "vocals", "guitar", "piano"];
const FOUR_STEMS: &[&str] = &["drums", "bass", "other", "vocals"];

/// The separation models offered by the stem provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Htdemucs6s,
    HtdemucsFt,
    MvsepFull,
}

impl Model {
    /// All known models.
    pub fn all() -> &'static [Model] {
        &[Model::Htdemucs6s, Model::HtdemucsFt, Model::MvsepFull]
    }

    /// The identifier the stem provider uses for the model.
    pub fn id(&self) -> &'static str {
        match self {
            Model::Htdemucs6s => "htdemucs_6s",
            Model::HtdemucsFt => "htdemucs_ft",
            Model::MvsepFull => "mvsep_full",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Htdemucs6s => "6-Stem Separation (HD)",
            Model::HtdemucsFt => "4-Stem Separation (Fast)",
            Model::MvsepFull => "MVSEP Full",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Model::Htdemucs6s => "Vocals, Drums, Bass, Other, Guitar, Piano",
            Model::HtdemucsFt | Model::MvsepFull => "Vocals, Drums, Bass, Other",
        }
    }

    /// The stems the model produces, in the order they're delivered.
    pub fn stems(&self) -> &'static [&'static str] {
        match self {
            Model::Htdemucs6s => SIX_STEMS,
            Model::HtdemucsFt | Model::MvsepFull => FOUR_STEMS,
        }
    }

    /// The largest stem count across all models.
    pub fn max_stems() -> usize {
        Model::all()
            .iter()
            .map(|model| model.stems().len())
            .max()
            .unwrap_or(0)
    }
}

impl FromStr for Model {
    type Err = StemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::all()
            .iter()
            .find(|model| model.id() == s)
            .copied()
            .ok_or_else(|| StemError::UnknownModel(s.to_string()))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}, {} stems)",
            self.id(),
            self.display_name(),
            self.description(),
            self.stems().len()
        )
    }
}
