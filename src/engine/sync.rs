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

//! Drift correction between the master and its followers.
//!
//! Drift is `follower - master`. Small drift is left alone, moderate drift is worked off by
//! running the follower slightly slower or faster, and large drift is fixed by moving the
//! follower straight to the master's position. The master itself is never touched.

use std::sync::Arc;

use tracing::{debug, trace};

use super::settings::Settings;
use crate::handle::PlaybackHandle;

/// What to do with a follower for a given drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Within the soft threshold, play at normal speed.
    InSync,
    /// Between the thresholds, play at the given rate until the drift is worked off.
    Nudge(f64),
    /// At or past the hard threshold, jump to the master's position.
    Snap,
}

impl Correction {
    /// Picks the correction for a follower that's `drift` seconds ahead of the master (negative
    /// when behind).
    pub fn for_drift(drift: f64, settings: &Settings) -> Correction {
        let magnitude = drift.abs();
        if magnitude <= settings.soft_threshold {
            Correction::InSync
        } else if magnitude < settings.hard_threshold {
            if drift > 0.0 {
                Correction::Nudge(settings.slow_rate)
            } else {
                Correction::Nudge(settings.fast_rate)
            }
        } else {
            Correction::Snap
        }
    }

    /// Applies the correction to a follower.
    pub fn apply(self, follower: &dyn PlaybackHandle, master_position: f64) {
        match self {
            Correction::InSync => {
                if follower.playback_rate() != 1.0 {
                    follower.set_playback_rate(1.0);
                }
            }
            Correction::Nudge(rate) => {
                if follower.playback_rate() != rate {
                    follower.set_playback_rate(rate);
                }
            }
            Correction::Snap => {
                follower.set_position(master_position);
                follower.set_playback_rate(1.0);
            }
        }
    }
}

/// Brings every follower in line with one reading of the master's position.
pub(crate) fn correct_followers<'a, I>(master_position: f64, followers: I, settings: &Settings)
where
    I: IntoIterator<Item = (&'a str, Arc<dyn PlaybackHandle>)>,
{
    for (name, follower) in followers {
        let drift = follower.position() - master_position;
        let correction = Correction::for_drift(drift, settings);
        match correction {
            Correction::Snap => debug!(stem = name, drift, "Hard resync."),
            Correction::Nudge(rate) => trace!(stem = name, drift, rate, "Soft sync."),
            Correction::InSync => {}
        }
        correction.apply(&*follower, master_position);
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::handle::SimulatedHandle;

    #[test]
    fn test_for_drift_zones() {
        let settings = Settings::default();
        assert_eq!(Correction::InSync, Correction::for_drift(0.0, &settings));
        assert_eq!(Correction::InSync, Correction::for_drift(0.05, &settings));
        assert_eq!(Correction::InSync, Correction::for_drift(-0.05, &settings));
        assert_eq!(Correction::Nudge(0.95), Correction::for_drift(0.3, &settings));
        assert_eq!(Correction::Nudge(1.05), Correction::for_drift(-0.3, &settings));
        assert_eq!(Correction::Nudge(1.05), Correction::for_drift(-0.49, &settings));
        assert_eq!(Correction::Snap, Correction::for_drift(0.5, &settings));
        assert_eq!(Correction::Snap, Correction::for_drift(-0.6, &settings));
    }

    #[test]
    fn test_apply() {
        let follower = SimulatedHandle::with_duration("drums", 120.0);
        follower.set_position(5.3);

        Correction::Nudge(0.95).apply(&*follower, 5.0);
        assert_eq!(0.95, follower.playback_rate());
        assert_eq!(5.3, follower.position());

        Correction::InSync.apply(&*follower, 5.0);
        assert_eq!(1.0, follower.playback_rate());

        follower.set_playback_rate(1.05);
        Correction::Snap.apply(&*follower, 5.0);
        assert_eq!(5.0, follower.position());
        assert_eq!(1.0, follower.playback_rate());
    }

    #[test]
    fn test_soft_sync_converges() {
        let settings = Settings::default();
        let master = SimulatedHandle::with_duration("vocals", 120.0);
        let follower = SimulatedHandle::with_duration("drums", 120.0);
        master.set_position(5.0);
        follower.set_position(5.3);
        master.play().expect("play");
        follower.play().expect("play");

        let step = Duration::from_millis(16);
        let mut last_drift = follower.position() - master.position();
        for _ in 0..1000 {
            correct_followers(
                master.position(),
                [("drums", follower.clone() as Arc<dyn PlaybackHandle>)],
                &settings,
            );
            master.advance(step);
            follower.advance(step);

            let drift = follower.position() - master.position();
            if drift.abs() <= settings.soft_threshold {
                return;
            }
            assert!(drift.abs() < last_drift.abs(), "drift must shrink");
            last_drift = drift;
        }
        panic!("drift never converged, last drift {}", last_drift);
    }
}
