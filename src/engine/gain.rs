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
use std::collections::HashMap;

use crate::stems::StemSet;

const DEFAULT_VOLUME: f64 = 1.0;

/// Per-stem volume and mute. Every stem in the active set has an entry in both maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GainControl {
    volumes: HashMap<String, f64>,
    muted: HashMap<String, bool>,
}

impl GainControl {
    /// Full volume and unmuted for every stem in the set.
    pub fn for_stems(stems: &StemSet) -> GainControl {
        GainControl {
            volumes: stems
                .iter()
                .map(|stem| (stem.name().to_string(), DEFAULT_VOLUME))
                .collect(),
            muted: stems
                .iter()
                .map(|stem| (stem.name().to_string(), false))
                .collect(),
        }
    }

    /// The gain that should reach the handle: zero when muted, the volume otherwise. Names
    /// outside the set play at full volume.
    pub fn effective(&self, name: &str) -> f64 {
        if self.is_muted(name) {
            0.0
        } else {
            self.volume(name)
        }
    }

    pub fn volume(&self, name: &str) -> f64 {
        self.volumes.get(name).copied().unwrap_or(DEFAULT_VOLUME)
    }

    pub fn is_muted(&self, name: &str) -> bool {
        self.muted.get(name).copied().unwrap_or(false)
    }

    /// Records a new volume, clamped into [0, 1]. Returns the gain to write to the handle right
    /// away, or `None` if the stem is unknown or muted.
    pub fn set_volume(&mut self, name: &str, value: f64) -> Option<f64> {
        let volume = self.volumes.get_mut(name)?;
        *volume = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let volume = *volume;

        if self.is_muted(name) {
            None
        } else {
            Some(volume)
        }
    }

    /// Flips the mute state. Returns the gain to write to the handle right away, or `None` if the
    /// stem is unknown.
    pub fn toggle_mute(&mut self, name: &str) -> Option<f64> {
        let muted = self.muted.get_mut(name)?;
        *muted = !*muted;
        Some(self.effective(name))
    }

    pub fn volumes(&self) -> &HashMap<String, f64> {
        &self.volumes
    }

    pub fn muted(&self) -> &HashMap<String, bool> {
        &self.muted
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stems::Stem;

    fn stems() -> StemSet {
        StemSet::new(vec![
            Stem::new("vocals", "vocals.wav"),
            Stem::new("drums", "drums.wav"),
        ])
        .expect("valid stems")
    }

    #[test]
    fn test_defaults_cover_every_stem() {
        let gain = GainControl::for_stems(&stems());
        for stem in stems().iter() {
            assert_eq!(Some(&1.0), gain.volumes().get(stem.name()));
            assert_eq!(Some(&false), gain.muted().get(stem.name()));
        }
    }

    #[test]
    fn test_volume_and_mute() {
        let mut gain = GainControl::for_stems(&stems());

        assert_eq!(Some(0.4), gain.set_volume("drums", 0.4));
        assert_eq!(Some(0.0), gain.toggle_mute("drums"));

        // Muted: the volume is remembered but not written.
        assert_eq!(None, gain.set_volume("drums", 0.6));
        assert_eq!(0.0, gain.effective("drums"));

        assert_eq!(Some(0.6), gain.toggle_mute("drums"));
        assert_eq!(0.6, gain.effective("drums"));
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut gain = GainControl::for_stems(&stems());
        assert_eq!(Some(1.0), gain.set_volume("vocals", 1.7));
        assert_eq!(Some(0.0), gain.set_volume("vocals", -0.2));
    }

    #[test]
    fn test_unknown_stems_are_ignored() {
        let mut gain = GainControl::for_stems(&stems());
        assert_eq!(None, gain.set_volume("guitar", 0.2));
        assert_eq!(None, gain.toggle_mute("guitar"));
        assert!(!gain.volumes().contains_key("guitar"));
        assert_eq!(1.0, gain.effective("guitar"));
    }
}
