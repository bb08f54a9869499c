// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Catalog Vault.
//
// Catalog Vault is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Catalog Vault is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Catalog Vault. If not, see <https://www.gnu.org/licenses/>.

//! Per-project save debouncing.
//!
//! A second `save_project` for a project whose save is still running in this
//! process is rejected instead of queued. The guard is local to one
//! [`crate::ProjectStore`]; it does not coordinate across processes.
//!
//! Slots exist only while a save holds them or a caller is racing for them;
//! the last ticket out removes its project's slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Slots = HashMap<String, Arc<Mutex<()>>>;

/// Non-blocking per-project mutex.
#[derive(Debug, Default)]
pub struct SaveGuard {
    // Never held across an await; `SaveTicket::drop` needs it synchronously.
    slots: Arc<StdMutex<Slots>>,
}

/// Held for the duration of one save; dropping it releases the project.
#[derive(Debug)]
pub struct SaveTicket {
    project_id: String,
    slots: Arc<StdMutex<Slots>>,
    slot: Arc<Mutex<()>>,
    permit: Option<OwnedMutexGuard<()>>,
}

fn lock(slots: &StdMutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for SaveTicket {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        self.permit.take();
        // The map and this ticket hold the only references: nobody is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.project_id);
        }
        debug!(project_id = %self.project_id, "Save guard released");
    }
}

impl SaveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `project_id`, or `None` if a save for it is in flight.
    pub fn try_acquire(&self, project_id: &str) -> Option<SaveTicket> {
        let slot = Arc::clone(lock(&self.slots).entry(project_id.to_string()).or_default());
        let permit = Arc::clone(&slot).try_lock_owned().ok()?;
        debug!(project_id = %project_id, "Save guard acquired");
        Some(SaveTicket {
            project_id: project_id.to_string(),
            slots: Arc::clone(&self.slots),
            slot,
            permit: Some(permit),
        })
    }

    /// True while a save for `project_id` holds the guard.
    pub fn is_busy(&self, project_id: &str) -> bool {
        lock(&self.slots)
            .get(project_id)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        lock(&self.slots).len()
    }
}
