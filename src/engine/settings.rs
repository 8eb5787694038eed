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
use std::{fmt, time::Duration};

pub const DEFAULT_SOFT_THRESHOLD: f64 = 0.05;
pub const DEFAULT_HARD_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SLOW_RATE: f64 = 0.95;
pub const DEFAULT_FAST_RATE: f64 = 1.05;
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_STATE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_REPLAY_MARGIN: f64 = 0.5;

/// Numeric tuning for the engine. Thresholds and margins are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Drift at or below this is considered in sync.
    pub soft_threshold: f64,
    /// Drift at or above this is corrected by snapping the follower's position.
    pub hard_threshold: f64,
    /// Rate applied to a follower that's ahead of the master.
    pub slow_rate: f64,
    /// Rate applied to a follower that's behind the master.
    pub fast_rate: f64,
    /// Period of the sync loop.
    pub sync_interval: Duration,
    /// Period of the state loop.
    pub state_interval: Duration,
    /// Playing from within this distance of the end restarts from the beginning.
    pub replay_margin: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            soft_threshold: DEFAULT_SOFT_THRESHOLD,
            hard_threshold: DEFAULT_HARD_THRESHOLD,
            slow_rate: DEFAULT_SLOW_RATE,
            fast_rate: DEFAULT_FAST_RATE,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            state_interval: DEFAULT_STATE_INTERVAL,
            replay_margin: DEFAULT_REPLAY_MARGIN,
        }
    }
}

impl Settings {
    /// Checks that the settings describe a usable correction scheme. Returns a description of the
    /// first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.soft_threshold > 0.0) {
            return Err(format!(
                "soft threshold must be positive, got {}",
                self.soft_threshold
            ));
        }
        if !(self.hard_threshold > self.soft_threshold) {
            return Err(format!(
                "hard threshold ({}) must be greater than soft threshold ({})",
                self.hard_threshold, self.soft_threshold
            ));
        }
        if !(self.slow_rate > 0.0 && self.slow_rate < 1.0) {
            return Err(format!(
                "slow rate must be between 0 and 1, got {}",
                self.slow_rate
            ));
        }
        if !(self.fast_rate > 1.0 && self.fast_rate.is_finite()) {
            return Err(format!(
                "fast rate must be greater than 1, got {}",
                self.fast_rate
            ));
        }
        if self.sync_interval.is_zero() || self.state_interval.is_zero() {
            return Err("sync and state intervals must be non-zero".to_string());
        }
        if !(self.replay_margin >= 0.0) {
            return Err(format!(
                "replay margin must not be negative, got {}",
                self.replay_margin
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Engine settings:")?;
        writeln!(f, "- soft threshold: {:?}", Duration::from_secs_f64(self.soft_threshold))?;
        writeln!(f, "- hard threshold: {:?}", Duration::from_secs_f64(self.hard_threshold))?;
        writeln!(f, "- slow rate: {}", self.slow_rate)?;
        writeln!(f, "- fast rate: {}", self.fast_rate)?;
        writeln!(f, "- sync interval: {:?}", self.sync_interval)?;
        writeln!(f, "- state interval: {:?}", self.state_interval)?;
        write!(f, "- replay margin: {:?}", Duration::from_secs_f64(self.replay_margin))
    }
}
