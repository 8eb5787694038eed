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

//! Runs the engine against simulated handles whose clocks run at slightly different speeds and
//! reports how far apart they drifted.

use std::{sync::Arc, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::{
    engine::{Engine, EngineError, Settings},
    handle::{PlaybackHandle, SimulatedHandle},
    stems::StemSet,
};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("there must be at least one stem to simulate")]
    NoStems,
    #[error("invalid simulation options: {0}")]
    InvalidOptions(String),
}

/// How to run a simulation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Length of every stem.
    pub length: Duration,
    /// How long to play for. Playback stops early if the track ends.
    pub run_for: Duration,
    /// How often the simulated clocks move.
    pub step: Duration,
    /// Followers run at a speed drawn from `1 ± max_skew`.
    pub max_skew: f64,
    /// Chance per step that a follower jumps, like a decoder stall would cause.
    pub hiccup_chance: f64,
    pub seed: u64,
    /// Stems to mute before playing.
    pub mute: Vec<String>,
    /// Volumes to set before playing.
    pub volumes: Vec<(String, f64)>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            length: Duration::from_secs(30),
            run_for: Duration::from_secs(10),
            step: Duration::from_millis(5),
            max_skew: 0.01,
            hiccup_chance: 0.0,
            seed: 0,
            mute: Vec::new(),
            volumes: Vec::new(),
        }
    }
}

impl Options {
    fn validate(&self) -> Result<(), SimulationError> {
        if self.step.is_zero() || self.length.is_zero() {
            return Err(SimulationError::InvalidOptions(
                "step and length must be non-zero".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.max_skew) {
            return Err(SimulationError::InvalidOptions(format!(
                "max skew must be in [0, 0.5), got {}",
                self.max_skew
            )));
        }
        if !(0.0..=1.0).contains(&self.hiccup_chance) {
            return Err(SimulationError::InvalidOptions(format!(
                "hiccup chance must be in [0, 1], got {}",
                self.hiccup_chance
            )));
        }
        Ok(())
    }
}

/// The outcome of a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    /// Simulated seconds played.
    pub played_for: f64,
    /// The engine's current time when playback stopped.
    pub final_time: f64,
    pub duration: f64,
    /// True if the track played to the end.
    pub ended: bool,
    pub hiccups: usize,
    pub stems: Vec<StemReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StemReport {
    pub name: String,
    pub master: bool,
    pub clock_skew: f64,
    /// Largest drift from the master seen at any step, in seconds.
    pub max_drift: f64,
    /// Drift from the master when playback stopped, in seconds.
    pub final_drift: f64,
    pub final_rate: f64,
    pub volume: f64,
}

/// Plays the stems through a fresh engine and reports the drift.
///
/// Must be called from within a Tokio runtime.
pub async fn run(
    stems: StemSet,
    settings: Settings,
    options: &Options,
) -> Result<DriftReport, SimulationError> {
    options.validate()?;
    if stems.is_empty() {
        return Err(SimulationError::NoStems);
    }

    let hiccup_size = settings.hard_threshold * 1.2;
    let engine = Engine::new(settings)?;
    engine.load_stems(stems.clone());

    let mut rng = StdRng::seed_from_u64(options.seed);
    let length = options.length.as_secs_f64();
    let handles: Vec<Arc<SimulatedHandle>> = stems
        .iter()
        .enumerate()
        .map(|(i, stem)| {
            let skew = if i == 0 {
                1.0
            } else {
                1.0 + rng.gen_range(-options.max_skew..=options.max_skew)
            };
            SimulatedHandle::with_clock_skew(stem.name(), length, skew)
        })
        .collect();

    for handle in handles.iter() {
        engine.register_audio(handle.name(), Some(handle.clone()));
    }
    for (name, volume) in options.volumes.iter() {
        engine.set_volume(name, *volume);
    }
    for name in options.mute.iter() {
        engine.toggle_mute(name);
    }

    info!(
        stems = handles.len(),
        run_for = format!("{:?}", options.run_for),
        "Starting simulation."
    );

    let mut max_drift = vec![0.0f64; handles.len()];
    let mut hiccups = 0;
    let mut played = Duration::ZERO;
    let mut interval = time::interval(options.step);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick is immediate.
    interval.tick().await;

    engine.toggle_play();
    while played < options.run_for && engine.is_playing() {
        interval.tick().await;
        played += options.step;

        for handle in handles.iter() {
            handle.advance(options.step);
        }

        if handles.len() > 1 && rng.gen_bool(options.hiccup_chance) {
            let follower = &handles[rng.gen_range(1..handles.len())];
            let offset = if rng.gen_bool(0.5) {
                hiccup_size
            } else {
                -hiccup_size
            };
            follower.jump(offset);
            hiccups += 1;
        }

        let master_position = handles[0].position();
        for (i, handle) in handles.iter().enumerate().skip(1) {
            let drift = (handle.position() - master_position).abs();
            max_drift[i] = max_drift[i].max(drift);
        }
    }

    let ended = !engine.is_playing();
    if !ended {
        engine.toggle_play();
    }

    let state = engine.state();
    let master_position = handles[0].position();
    let report = DriftReport {
        played_for: played.as_secs_f64(),
        final_time: state.current_time,
        duration: state.duration,
        ended,
        hiccups,
        stems: handles
            .iter()
            .enumerate()
            .map(|(i, handle)| StemReport {
                name: handle.name().to_string(),
                master: i == 0,
                clock_skew: handle.clock_skew(),
                max_drift: max_drift[i],
                final_drift: handle.position() - master_position,
                final_rate: handle.playback_rate(),
                volume: handle.volume(),
            })
            .collect(),
    };
    engine.shutdown();

    info!(
        played_for = report.played_for,
        hiccups = report.hiccups,
        "Simulation finished."
    );
    Ok(report)
}
