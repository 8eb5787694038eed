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
use std::{fmt, mem, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::debug;

use super::{MetadataObserver, PlaybackError};

/// A simulated handle. Doesn't actually play anything, but keeps its own clock that only moves
/// when [`SimulatedHandle::advance`] is called. Each handle can run slightly fast or slow to
/// mimic independently clocked decode pipelines.
pub struct SimulatedHandle {
    name: String,
    state: Mutex<State>,
}

struct State {
    position: f64,
    rate: f64,
    volume: f64,
    playing: bool,
    ended: bool,
    duration: Option<f64>,
    clock_skew: f64,
    reject_play: Option<String>,
    observers: Vec<MetadataObserver>,
}

impl SimulatedHandle {
    /// Creates a new simulated handle with no metadata.
    pub fn new(name: &str) -> Arc<SimulatedHandle> {
        Self::build(name, None, 1.0)
    }

    /// Creates a new simulated handle whose metadata is already loaded.
    pub fn with_duration(name: &str, duration: f64) -> Arc<SimulatedHandle> {
        Self::build(name, Some(duration), 1.0)
    }

    /// Creates a new simulated handle with loaded metadata and a clock that runs `clock_skew`
    /// times as fast as real time.
    pub fn with_clock_skew(name: &str, duration: f64, clock_skew: f64) -> Arc<SimulatedHandle> {
        Self::build(name, Some(duration), clock_skew)
    }

    fn build(name: &str, duration: Option<f64>, clock_skew: f64) -> Arc<SimulatedHandle> {
        Arc::new(SimulatedHandle {
            name: name.to_string(),
            state: Mutex::new(State {
                position: 0.0,
                rate: 1.0,
                volume: 1.0,
                playing: false,
                ended: false,
                duration,
                clock_skew,
                reject_play: None,
                observers: Vec::new(),
            }),
        })
    }

    /// The name of the handle.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes subsequent calls to play fail with the given reason, or succeed again with `None`.
    pub fn reject_play(&self, reason: Option<&str>) {
        self.state.lock().reject_play = reason.map(str::to_string);
    }

    /// Returns true if the handle is currently playing.
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// The clock skew of this handle.
    pub fn clock_skew(&self) -> f64 {
        self.state.lock().clock_skew
    }

    /// Loads the metadata, notifying any observers.
    pub fn load_metadata(&self, duration: f64) {
        let observers = {
            let mut state = self.state.lock();
            state.duration = Some(duration);
            mem::take(&mut state.observers)
        };
        for observer in observers {
            observer(duration);
        }
    }

    /// Moves the clock forward by `elapsed` of wall time. A playing handle moves by
    /// `elapsed * rate * clock_skew` and stops at the end of the media.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        if !state.playing {
            return;
        }

        state.position += elapsed.as_secs_f64() * state.rate * state.clock_skew;
        if let Some(duration) = state.duration {
            if state.position >= duration {
                state.position = duration;
                state.playing = false;
                state.ended = true;
                debug!(handle = self.name, "Simulated handle reached the end.");
            }
        }
    }

    /// Jumps the position without resetting anything else, like a decoder hiccup would.
    pub fn jump(&self, offset: f64) {
        let mut state = self.state.lock();
        state.position = (state.position + offset).max(0.0);
    }
}

impl super::PlaybackHandle for SimulatedHandle {
    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn set_position(&self, position: f64) {
        let mut state = self.state.lock();
        state.position = match state.duration {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        };
        state.ended = false;
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().rate = rate;
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn play(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.reject_play {
            return Err(PlaybackError::Rejected(reason.clone()));
        }
        state.playing = true;
        state.ended = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().playing = false;
    }

    fn has_ended(&self) -> bool {
        self.state.lock().ended
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn on_metadata(&self, observer: MetadataObserver) {
        let duration = {
            let mut state = self.state.lock();
            match state.duration {
                Some(duration) => duration,
                None => {
                    state.observers.push(observer);
                    return;
                }
            }
        };
        observer(duration);
    }
}

impl fmt::Display for SimulatedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Simulated)", self.name)
    }
}
