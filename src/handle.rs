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
use std::fmt;

pub mod simulated;

pub use simulated::SimulatedHandle;

/// Called once with the media duration in seconds when the handle's metadata is known.
pub type MetadataObserver = Box<dyn FnOnce(f64) + Send>;

/// Errors a host can report when asked to start playback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// The host refused to start playback (e.g. an autoplay policy).
    #[error("playback rejected by host: {0}")]
    Rejected(String),
}

/// A playable, seekable audio resource owned by the host. The engine only ever holds a weak
/// reference to one of these, so the host decides when it is created and destroyed.
///
/// All positions and durations are in seconds. Implementations use interior mutability since the
/// engine drives them through shared references.
pub trait PlaybackHandle: fmt::Display + Send + Sync {
    /// The current playback position.
    fn position(&self) -> f64;

    /// Moves the playback position.
    fn set_position(&self, position: f64);

    /// The current playback rate, where 1.0 is normal speed.
    fn playback_rate(&self) -> f64;

    /// Changes the playback rate.
    fn set_playback_rate(&self, rate: f64);

    /// The current output volume in [0, 1].
    fn volume(&self) -> f64;

    /// Changes the output volume.
    fn set_volume(&self, volume: f64);

    /// Starts playback. The host may refuse.
    fn play(&self) -> Result<(), PlaybackError>;

    /// Stops playback, keeping the current position.
    fn pause(&self);

    /// True once playback reached the end of the media.
    fn has_ended(&self) -> bool;

    /// The media duration, if the metadata has been loaded.
    fn duration(&self) -> Option<f64>;

    /// Registers a one-time observer for when the metadata becomes available. If the metadata is
    /// already known the observer may be invoked immediately. Observers must not be invoked from
    /// inside another call on the same handle.
    fn on_metadata(&self, observer: MetadataObserver);
}
