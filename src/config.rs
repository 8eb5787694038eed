// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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

use tracing::info;

use crate::engine::Settings;
use crate::stems::{Model, StemSet};

mod engine;
pub mod error;
mod stems;

pub use self::engine::Engine;
pub use self::error::ConfigError;
pub use self::stems::StemList;

/// Loads engine settings from the given file, or the defaults when there is none.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => {
            let settings = Engine::deserialize(path)?.to_settings()?;
            info!(path = path.display().to_string(), "Loaded engine config.");
            Ok(settings)
        }
        None => Engine::default().to_settings(),
    }
}

/// Loads a stem set from a stem list file.
pub fn load_stems(path: &Path) -> Result<StemSet, ConfigError> {
    StemList::deserialize(path)?.to_stem_set()
}

/// Builds the stem set a model produces for a session.
pub fn stems_for_model(
    model: &str,
    base_url: &str,
    session_id: &str,
) -> Result<StemSet, ConfigError> {
    let model: Model = model.parse()?;
    Ok(StemSet::from_model(model, base_url, session_id))
}
