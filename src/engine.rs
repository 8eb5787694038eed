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
use std::{
    collections::HashMap,
    ops::ControlFlow,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    handle::PlaybackHandle,
    playsync::{CancelHandle, ScheduledTask},
    stems::StemSet,
};

use self::{gain::GainControl, registry::Registry};

mod gain;
mod registry;
pub mod settings;
pub mod state;
pub mod sync;

pub use settings::Settings;
pub use state::{PlaybackState, Transport};
pub use sync::Correction;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),
}

/// Plays a set of stems as if they were one track. The first stem is the master; every other
/// registered handle follows it.
///
/// While playing, two loops run on the Tokio runtime: a fast sync loop that corrects follower
/// drift, and a slower state loop that publishes the current time and notices the end of the
/// track. Volume and mute changes are written straight to the handles, and a reconciler re-applies
/// them whenever they change in case a handle was registered in between.
pub struct Engine {
    inner: Arc<Mutex<Inner>>,
    state: watch::Receiver<PlaybackState>,
    span: Span,
}

struct Inner {
    this: Weak<Mutex<Inner>>,
    settings: Settings,
    stems: StemSet,
    /// Bumped whenever the stem set is replaced, so stale metadata observers can be ignored.
    generation: u64,
    registry: Registry,
    gain: GainControl,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    ended: bool,
    /// The sync and state loops. Empty unless playing.
    loops: Vec<ScheduledTask>,
    reconciler: Option<ScheduledTask>,
    shut_down: bool,
    state_tx: watch::Sender<PlaybackState>,
    gain_revision: watch::Sender<u64>,
}

impl Engine {
    /// Creates a new engine with no stems.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(settings: Settings) -> Result<Engine, EngineError> {
        settings.validate().map_err(EngineError::InvalidSettings)?;

        let (state_tx, state) = watch::channel(PlaybackState::default());
        let (gain_revision, revisions) = watch::channel(0u64);
        let inner = Arc::new_cyclic(|this| {
            Mutex::new(Inner {
                this: this.clone(),
                settings,
                stems: StemSet::default(),
                generation: 0,
                registry: Registry::default(),
                gain: GainControl::default(),
                is_playing: false,
                current_time: 0.0,
                duration: 0.0,
                ended: false,
                loops: Vec::new(),
                reconciler: None,
                shut_down: false,
                state_tx,
                gain_revision,
            })
        });

        let reconciler = {
            let this = Arc::downgrade(&inner);
            ScheduledTask::on_change("gain", revisions, move |cancel| {
                Inner::with_live(&this, cancel, |inner| {
                    inner.reconcile_gains();
                    ControlFlow::Continue(())
                })
            })
        };
        inner.lock().reconciler = Some(reconciler);

        Ok(Engine {
            inner,
            state,
            span: span!(Level::INFO, "engine"),
        })
    }

    /// Replaces the stem set. Playback stops and the transport, volumes and mutes are reset.
    /// Existing registrations are kept; the host is expected to re-register handles for the new
    /// set.
    pub fn load_stems(&self, stems: StemSet) {
        let _enter = self.span.enter();

        let master = {
            let mut inner = self.inner.lock();
            inner.replace_stems(stems);
            inner
                .stems
                .master()
                .map(|master| master.name().to_string())
                .and_then(|name| inner.registry.get(&name).map(|handle| (name, handle)))
        };

        // A master that survived the swap still has to report the duration for the new set.
        if let Some((name, handle)) = master {
            self.watch_duration(&name, handle);
        }
    }

    /// Binds a handle to a stem, or removes the binding when `handle` is `None`. The handle's
    /// volume is set right away. For the master, the duration is taken from its metadata once it
    /// is known.
    pub fn register_audio(&self, name: &str, handle: Option<Arc<dyn PlaybackHandle>>) {
        let _enter = self.span.enter();

        let Some(handle) = handle else {
            if self.inner.lock().registry.unregister(name) {
                debug!(stem = name, "Unregistered handle.");
            }
            return;
        };

        let is_master = {
            let mut inner = self.inner.lock();
            let replaced = inner.registry.register(name, &handle);
            handle.set_volume(inner.gain.effective(name));
            debug!(
                stem = name,
                handle = handle.to_string(),
                replaced,
                registered = inner.registry.len(),
                "Registered handle."
            );
            inner.stems.is_master(name)
        };

        if is_master {
            self.watch_duration(name, handle);
        }
    }

    /// Starts playback if stopped, stops it if playing.
    pub fn toggle_play(&self) {
        let _enter = self.span.enter();

        let mut inner = self.inner.lock();
        if inner.shut_down {
            warn!("Engine has been shut down, ignoring play toggle.");
            return;
        }

        if inner.is_playing {
            inner.pause();
        } else {
            inner.play();
        }
    }

    /// Moves every handle to `time` seconds and drops any drift correction in progress. Clamping
    /// to the track is up to the caller.
    pub fn seek(&self, time: f64) {
        let _enter = self.span.enter();
        self.inner.lock().seek(time);
    }

    /// Sets the volume of a stem, clamped to [0, 1]. A muted stem stays silent until unmuted.
    pub fn set_volume(&self, name: &str, value: f64) {
        let _enter = self.span.enter();

        let mut inner = self.inner.lock();
        if !inner.stems.contains(name) {
            debug!(stem = name, "Ignoring volume change for unknown stem.");
            return;
        }

        if let Some(gain) = inner.gain.set_volume(name, value) {
            if let Some(handle) = inner.registry.get(name) {
                handle.set_volume(gain);
            }
        }
        inner.gains_changed();
    }

    /// Mutes or unmutes a stem.
    pub fn toggle_mute(&self, name: &str) {
        let _enter = self.span.enter();

        let mut inner = self.inner.lock();
        if !inner.stems.contains(name) {
            debug!(stem = name, "Ignoring mute toggle for unknown stem.");
            return;
        }

        if let Some(gain) = inner.gain.toggle_mute(name) {
            if let Some(handle) = inner.registry.get(name) {
                handle.set_volume(gain);
            }
            debug!(stem = name, muted = inner.gain.is_muted(name), "Toggled mute.");
        }
        inner.gains_changed();
    }

    /// Stops playback and cancels every scheduled task. The engine ignores play requests
    /// afterwards. Also run on drop.
    pub fn shutdown(&self) {
        let _enter = self.span.enter();

        let mut inner = self.inner.lock();
        if inner.shut_down {
            return;
        }
        if inner.is_playing {
            inner.pause();
        }
        inner.stop_loops();
        if let Some(reconciler) = inner.reconciler.take() {
            reconciler.cancel();
        }
        inner.shut_down = true;
        info!("Engine shut down.");
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> PlaybackState {
        self.inner.lock().snapshot()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().is_playing
    }

    /// The last published master position in seconds.
    pub fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }

    /// The master duration in seconds, 0 until known.
    pub fn duration(&self) -> f64 {
        self.inner.lock().duration
    }

    pub fn status(&self) -> Transport {
        self.state().transport()
    }

    /// The volume of a stem in the active set.
    pub fn volume(&self, name: &str) -> Option<f64> {
        self.inner.lock().gain.volumes().get(name).copied()
    }

    /// The mute state of a stem in the active set.
    pub fn is_muted(&self, name: &str) -> Option<bool> {
        self.inner.lock().gain.muted().get(name).copied()
    }

    pub fn volumes(&self) -> HashMap<String, f64> {
        self.inner.lock().gain.volumes().clone()
    }

    pub fn muted(&self) -> HashMap<String, bool> {
        self.inner.lock().gain.muted().clone()
    }

    pub fn stems(&self) -> StemSet {
        self.inner.lock().stems.clone()
    }

    pub fn settings(&self) -> Settings {
        self.inner.lock().settings.clone()
    }

    /// Sets the duration from the handle's metadata once it's available.
    fn watch_duration(&self, name: &str, handle: Arc<dyn PlaybackHandle>) {
        let generation = self.inner.lock().generation;
        let reporter = Arc::downgrade(&handle);

        if let Some(duration) = handle.duration() {
            self.inner
                .lock()
                .set_duration(generation, name, &reporter, duration);
            return;
        }

        let this = Arc::downgrade(&self.inner);
        let observed_name = name.to_string();
        let observed_reporter = reporter.clone();
        handle.on_metadata(Box::new(move |duration| {
            if let Some(inner) = this.upgrade() {
                inner
                    .lock()
                    .set_duration(generation, &observed_name, &observed_reporter, duration);
            }
        }));

        // Hosts don't have to notify observers attached after the metadata loaded.
        if let Some(duration) = handle.duration() {
            self.inner
                .lock()
                .set_duration(generation, name, &reporter, duration);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    /// Runs `f` against the engine unless it's gone, shut down, or the task was cancelled.
    fn with_live<F>(this: &Weak<Mutex<Inner>>, cancel: &CancelHandle, f: F) -> ControlFlow<()>
    where
        F: FnOnce(&mut Inner) -> ControlFlow<()>,
    {
        let Some(strong) = this.upgrade() else {
            return ControlFlow::Break(());
        };
        let mut inner = strong.lock();
        if cancel.is_cancelled() || inner.shut_down {
            return ControlFlow::Break(());
        }
        f(&mut inner)
    }

    fn replace_stems(&mut self, stems: StemSet) {
        self.halt_handles();
        self.stop_loops();
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.ended = false;
        self.generation += 1;
        self.gain = GainControl::for_stems(&stems);
        self.stems = stems;

        info!(
            stems = self.stems.len(),
            master = self.stems.master().map(|stem| stem.name()),
            "Loaded stem set."
        );
        self.gains_changed();
    }

    fn play(&mut self) {
        let start_from = self.start_position();

        let mut started = 0;
        let mut rejected = 0;
        for (name, handle) in self.registry.iter() {
            handle.set_position(start_from);
            handle.set_playback_rate(1.0);
            match handle.play() {
                Ok(()) => started += 1,
                Err(e) => {
                    warn!(stem = name, err = e.to_string(), "Handle refused to play, skipping it.");
                    rejected += 1;
                }
            }
        }

        self.is_playing = true;
        self.ended = false;
        self.current_time = start_from;
        self.start_loops();

        info!(start_from, started, rejected, "Playback started.");
        self.publish();
    }

    /// Where playback resumes. Resuming at or near the end starts over instead.
    fn start_position(&self) -> f64 {
        let resume = self.current_time;
        let near_end =
            self.duration > 0.0 && resume >= self.duration - self.settings.replay_margin;
        if self.ended || near_end {
            0.0
        } else {
            resume
        }
    }

    fn pause(&mut self) {
        self.halt_handles();
        self.stop_loops();
        self.is_playing = false;
        if let Some(master) = self.master_handle() {
            self.current_time = master.position();
        }

        info!(position = self.current_time, "Playback paused.");
        self.publish();
    }

    fn seek(&mut self, time: f64) {
        for (_, handle) in self.registry.iter() {
            handle.set_position(time);
            handle.set_playback_rate(1.0);
        }
        self.current_time = time;
        self.ended = false;

        debug!(time, playing = self.is_playing, "Seeked.");
        self.publish();
    }

    /// Pauses every handle and puts it back to normal speed.
    fn halt_handles(&self) {
        for (_, handle) in self.registry.iter() {
            handle.pause();
            handle.set_playback_rate(1.0);
        }
    }

    fn start_loops(&mut self) {
        self.stop_loops();

        let sync = {
            let this = self.this.clone();
            ScheduledTask::every("sync", self.settings.sync_interval, move |cancel| {
                Inner::with_live(&this, cancel, |inner| {
                    if !inner.is_playing {
                        return ControlFlow::Break(());
                    }
                    inner.sync_tick();
                    ControlFlow::Continue(())
                })
            })
        };
        let state = {
            let this = self.this.clone();
            ScheduledTask::every("state", self.settings.state_interval, move |cancel| {
                Inner::with_live(&this, cancel, |inner| {
                    if !inner.is_playing {
                        return ControlFlow::Break(());
                    }
                    inner.state_tick();
                    ControlFlow::Continue(())
                })
            })
        };

        self.loops = vec![sync, state];
    }

    fn stop_loops(&mut self) {
        for task in self.loops.drain(..) {
            task.cancel();
        }
    }

    /// Corrects every follower against a single reading of the master's position.
    fn sync_tick(&mut self) {
        let Some(master) = self.stems.master() else {
            return;
        };
        let Some(master_handle) = self.registry.get(master.name()) else {
            return;
        };

        let master_position = master_handle.position();
        sync::correct_followers(
            master_position,
            self.registry.followers(master.name()),
            &self.settings,
        );
    }

    /// Publishes the master position and handles the end of the track.
    fn state_tick(&mut self) {
        self.registry.prune();

        let Some(master) = self.master_handle() else {
            return;
        };
        self.current_time = master.position();

        if master.has_ended() {
            self.halt_handles();
            self.stop_loops();
            self.is_playing = false;
            self.ended = true;
            info!(position = self.current_time, "Reached the end of the track.");
        }

        self.publish();
    }

    fn master_handle(&self) -> Option<Arc<dyn PlaybackHandle>> {
        self.stems
            .master()
            .and_then(|master| self.registry.get(master.name()))
    }

    fn set_duration(
        &mut self,
        generation: u64,
        name: &str,
        reporter: &Weak<dyn PlaybackHandle>,
        duration: f64,
    ) {
        if generation != self.generation
            || !self.stems.is_master(name)
            || !self.registry.is_bound(name, reporter)
        {
            debug!(stem = name, "Ignoring metadata from a stale handle.");
            return;
        }
        if self.duration > 0.0 || !(duration.is_finite() && duration > 0.0) {
            return;
        }

        self.duration = duration;
        info!(stem = name, duration, "Track duration known.");
        self.publish();
    }

    /// Re-applies the effective gain of every registered handle.
    fn reconcile_gains(&self) {
        for (name, handle) in self.registry.iter() {
            let gain = self.gain.effective(name);
            if handle.volume() != gain {
                debug!(stem = name, gain, "Reconciling handle volume.");
                handle.set_volume(gain);
            }
        }
    }

    /// Wakes the reconciler and publishes the new maps.
    fn gains_changed(&self) {
        self.gain_revision
            .send_modify(|revision| *revision = revision.wrapping_add(1));
        self.publish();
    }

    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            ended: self.ended,
            volumes: self.gain.volumes().clone(),
            muted: self.gain.muted().clone(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
