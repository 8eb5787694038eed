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
    sync::{Arc, Weak},
};

use tracing::debug;

use crate::handle::PlaybackHandle;

/// Maps stem names to the host's playback handles. Only weak references are kept: a handle the
/// host has dropped is treated as unregistered.
#[derive(Default)]
pub(crate) struct Registry {
    handles: HashMap<String, Weak<dyn PlaybackHandle>>,
}

impl Registry {
    /// Binds a handle to a name, replacing any previous binding. Returns true if a previous
    /// binding was replaced.
    pub fn register(&mut self, name: &str, handle: &Arc<dyn PlaybackHandle>) -> bool {
        self.handles
            .insert(name.to_string(), Arc::downgrade(handle))
            .is_some()
    }

    /// Removes the binding for a name. Returns true if there was one.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.handles.remove(name).is_some()
    }

    /// Gets the live handle bound to a name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PlaybackHandle>> {
        self.handles.get(name).and_then(Weak::upgrade)
    }

    /// Returns true if `handle` is the one currently bound to the name.
    pub fn is_bound(&self, name: &str, handle: &Weak<dyn PlaybackHandle>) -> bool {
        self.handles
            .get(name)
            .is_some_and(|bound| Weak::ptr_eq(bound, handle))
    }

    /// Iterates over all live handles.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Arc<dyn PlaybackHandle>)> {
        self.handles
            .iter()
            .filter_map(|(name, handle)| handle.upgrade().map(|handle| (name.as_str(), handle)))
    }

    /// Iterates over all live handles except the named master.
    pub fn followers<'a>(
        &'a self,
        master: &'a str,
    ) -> impl Iterator<Item = (&'a str, Arc<dyn PlaybackHandle>)> + 'a {
        self.iter().filter(move |(name, _)| *name != master)
    }

    /// Drops bindings whose handles the host has already released.
    pub fn prune(&mut self) {
        self.handles.retain(|name, handle| {
            let alive = handle.strong_count() > 0;
            if !alive {
                debug!(stem = name, "Dropping binding for released handle.");
            }
            alive
        });
    }

    /// The number of bindings, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.handles.len()
    }
}
