// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Registry of live catalog states.
//!
//! The registry holds weak references only: registering a state never keeps
//! it alive, and entries whose state is gone are swept on the next traversal.
//! It is created once by the owner of the attachments (see
//! [`crate::Connector`]) and handed to whoever needs it.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use orabridge_core::Driver;

use crate::{catalog::CatalogState, pool::ConnectionPool};

struct Registration<D: Driver> {
    alias: Option<String>,
    state: Weak<CatalogState<D>>,
}

/// Weakly referenced catalog states, optionally named.
pub struct CatalogRegistry<D: Driver> {
    entries: Mutex<Vec<Registration<D>>>,
}

impl<D: Driver> Default for CatalogRegistry<D> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<D: Driver> CatalogRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `state`, optionally under `alias`. A later registration under
    /// the same alias shadows earlier ones.
    pub fn register(&self, state: &Arc<CatalogState<D>>, alias: Option<&str>) {
        let mut entries = self.entries.lock();
        entries.retain(|entry| entry.state.strong_count() > 0);
        entries.push(Registration {
            alias: alias.map(str::to_owned),
            state: Arc::downgrade(state),
        });
    }

    /// The live state registered under `alias`.
    pub fn lookup(&self, alias: &str) -> Option<Arc<CatalogState<D>>> {
        let mut entries = self.entries.lock();
        entries.retain(|entry| entry.state.strong_count() > 0);
        entries
            .iter()
            .rev()
            .filter(|entry| entry.alias.as_deref() == Some(alias))
            .find_map(|entry| entry.state.upgrade())
    }

    /// Every live state.
    pub fn states(&self) -> Vec<Arc<CatalogState<D>>> {
        let mut entries = self.entries.lock();
        entries.retain(|entry| entry.state.strong_count() > 0);
        entries
            .iter()
            .filter_map(|entry| entry.state.upgrade())
            .collect()
    }

    /// Clear the caches of every live state.
    pub fn clear_all_caches(&self) {
        // Clear outside the registry lock; each state takes its own.
        let states = self.states();
        tracing::debug!(states = states.len(), "clearing all catalog caches");
        for state in states {
            state.clear_caches();
        }
    }

    /// Number of registrations, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Driver> fmt::Debug for CatalogRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_list()
            .entries(entries.iter().map(|entry| &entry.alias))
            .finish()
    }
}

/// Drop every catalog cache and close every pooled session.
///
/// Sessions checked out at the time stay usable and are closed when released.
pub fn clear_all<D: Driver>(registry: &CatalogRegistry<D>, pool: &ConnectionPool<D>) {
    registry.clear_all_caches();
    pool.clear();
}
