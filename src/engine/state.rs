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
use std::{collections::HashMap, fmt};

use crate::util::duration_minutes_seconds;

/// Where the transport is in its play cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Stopped at the beginning.
    Idle,
    Playing,
    /// Stopped somewhere past the beginning.
    Paused,
    /// The master reached the end. The next play starts over.
    Ended,
}

/// The state published to the control surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Position of the master in seconds.
    pub current_time: f64,
    /// Duration of the master in seconds, 0 until its metadata is known.
    pub duration: f64,
    /// Set when the master signalled the end, cleared by the next play or seek.
    pub ended: bool,
    pub volumes: HashMap<String, f64>,
    pub muted: HashMap<String, bool>,
}

impl PlaybackState {
    pub fn transport(&self) -> Transport {
        if self.is_playing {
            Transport::Playing
        } else if self.ended {
            Transport::Ended
        } else if self.current_time > 0.0 {
            Transport::Paused
        } else {
            Transport::Idle
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {}/{}",
            self.transport(),
            duration_minutes_seconds(self.current_time),
            duration_minutes_seconds(self.duration),
        )
    }
}
