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
use std::{ops::ControlFlow, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::debug;

/// Represents the current cancel state.
#[derive(Clone, Copy, PartialEq, Debug)]
enum CancelState {
    Untouched,
    Cancelled,
}

/// A cancel handle is shared between a scheduled task and whoever owns it. Once cancelled, it
/// stays cancelled.
#[derive(Clone)]
pub struct CancelHandle {
    /// Broadcasts the cancel state to anyone waiting on it.
    state: Arc<watch::Sender<CancelState>>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        let (state, _) = watch::channel(CancelState::Untouched);
        CancelHandle {
            state: Arc::new(state),
        }
    }

    /// Returns true if the handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow() == CancelState::Cancelled
    }

    /// Waits until the handle is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as self, so this can't fail.
        let _ = receiver
            .wait_for(|state| *state == CancelState::Cancelled)
            .await;
    }

    /// Cancels the handle. Returns true if this call performed the cancellation.
    pub fn cancel(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == CancelState::Untouched {
                *state = CancelState::Cancelled;
                true
            } else {
                false
            }
        })
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A task running on the Tokio runtime that repeatedly invokes a callback until it is cancelled
/// or the callback breaks. Dropping the task cancels it.
pub struct ScheduledTask {
    name: &'static str,
    join: JoinHandle<()>,
    cancel: CancelHandle,
}

impl ScheduledTask {
    /// Spawns a task that calls `tick` once per `period`. Late ticks are skipped rather than
    /// bunched up. The first tick fires immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn every<F>(name: &'static str, period: Duration, mut tick: F) -> ScheduledTask
    where
        F: FnMut(&CancelHandle) -> ControlFlow<()> + Send + 'static,
    {
        let cancel = CancelHandle::new();
        let join = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = interval.tick() => {
                            if tick(&cancel).is_break() {
                                break;
                            }
                        }
                    }
                }
                debug!(task = name, "Scheduled task stopped.");
            })
        };

        ScheduledTask { name, join, cancel }
    }

    /// Spawns a task that calls `tick` every time the watched value changes. The task ends when
    /// the sender goes away.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_change<T, F>(
        name: &'static str,
        mut receiver: watch::Receiver<T>,
        mut tick: F,
    ) -> ScheduledTask
    where
        T: Send + Sync + 'static,
        F: FnMut(&CancelHandle) -> ControlFlow<()> + Send + 'static,
    {
        let cancel = CancelHandle::new();
        let join = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        changed = receiver.changed() => {
                            if changed.is_err() || tick(&cancel).is_break() {
                                break;
                            }
                        }
                    }
                }
                debug!(task = name, "Scheduled task stopped.");
            })
        };

        ScheduledTask { name, join, cancel }
    }

    /// Returns true once the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the task and aborts it at its next suspension point.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            debug!(task = self.name, "Cancelling scheduled task.");
        }
        self.join.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            tokio::spawn(async move { cancel_handle.cancelled().await })
        };

        assert!(cancel_handle.cancel());
        assert!(join.await.is_ok());
        assert!(cancel_handle.is_cancelled());

        // A second cancel is a no-op.
        assert!(!cancel_handle.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let task = {
            let ticks = ticks.clone();
            ScheduledTask::every("test", Duration::from_millis(100), move |_| {
                ticks.fetch_add(1, Ordering::Relaxed);
                ControlFlow::Continue(())
            })
        };

        time::sleep(Duration::from_millis(450)).await;
        // Ticks at 0, 100, 200, 300 and 400ms.
        assert_eq!(5, ticks.load(Ordering::Relaxed));

        task.cancel();
        assert!(task.is_cancelled());
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(5, ticks.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_stops_on_break() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let _task = {
            let ticks = ticks.clone();
            ScheduledTask::every("test", Duration::from_millis(10), move |_| {
                if ticks.fetch_add(1, Ordering::Relaxed) == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        };

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(3, ticks.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let task = {
            let ticks = ticks.clone();
            ScheduledTask::every("test", Duration::from_millis(10), move |_| {
                ticks.fetch_add(1, Ordering::Relaxed);
                ControlFlow::Continue(())
            })
        };
        time::sleep(Duration::from_millis(5)).await;
        drop(task);

        let seen = ticks.load(Ordering::Relaxed);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen, ticks.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_change() {
        let (sender, receiver) = watch::channel(0u64);
        let ticks = Arc::new(AtomicUsize::new(0));
        let _task = {
            let ticks = ticks.clone();
            ScheduledTask::on_change("test", receiver, move |_| {
                ticks.fetch_add(1, Ordering::Relaxed);
                ControlFlow::Continue(())
            })
        };

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(0, ticks.load(Ordering::Relaxed));

        sender.send_modify(|revision| *revision += 1);
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(1, ticks.load(Ordering::Relaxed));
    }
}
