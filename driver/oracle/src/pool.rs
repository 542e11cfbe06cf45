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

//! Bounded, thread-safe pools of native sessions.
//!
//! Sessions are pooled per endpoint key. Each pool tracks its idle sessions,
//! the number of sessions in existence and a capacity that only ever grows to
//! the largest `connection_limit` requested for that key. Outside the brief
//! window in which an acquirer has reserved a slot but not yet dialed,
//! `idle <= total <= limit` holds and every session counted in `total` is
//! either idle or checked out.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use orabridge_core::{
    error::{Error, Result, Status},
    Driver, Endpoint, Session,
};

use crate::{
    session::{SessionContext, SessionHandle},
    settings::Settings,
};

/// Snapshot of one endpoint's pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Sessions waiting to be reused.
    pub idle: usize,
    /// Sessions in existence, idle or checked out.
    pub total: usize,
    /// Capacity.
    pub limit: usize,
}

struct EntryState<S: Session> {
    idle: Vec<SessionContext<S>>,
    total: usize,
    limit: usize,
    cleared: bool,
}

/// Bookkeeping for one endpoint key.
pub struct PoolEntry<S: Session> {
    state: Mutex<EntryState<S>>,
    available: Condvar,
}

impl<S: Session> PoolEntry<S> {
    fn new(limit: usize) -> Self {
        Self {
            state: Mutex::new(EntryState {
                idle: Vec::new(),
                total: 0,
                limit,
                cleared: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Return a checked-out session to the idle list.
    pub(crate) fn release(&self, context: SessionContext<S>) {
        let mut state = self.state.lock();
        if state.cleared {
            drop(state);
            drop(context);
            return;
        }
        state.idle.push(context);
        drop(state);
        self.available.notify_one();
    }

    /// A checked-out session was destroyed instead of returned.
    pub(crate) fn forget(&self) {
        let mut state = self.state.lock();
        if !state.cleared {
            state.total = state.total.saturating_sub(1);
        }
        drop(state);
        self.available.notify_one();
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            total: state.total,
            limit: state.limit,
        }
    }
}

/// Pools of sessions keyed by endpoint.
pub struct ConnectionPool<D: Driver> {
    driver: D,
    entries: Mutex<HashMap<String, Arc<PoolEntry<D::SessionType>>>>,
}

impl<D: Driver> ConnectionPool<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Acquire a session for `endpoint`, waiting up to the configured acquire
    /// timeout for one to become available.
    pub fn acquire(
        &self,
        endpoint: &Endpoint,
        settings: &Settings,
    ) -> Result<SessionHandle<D::SessionType>> {
        self.acquire_with_timeout(endpoint, settings, settings.acquire_timeout)
    }

    /// Acquire a session for `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`Status::ResourceExhausted`] when no session became available within
    ///   `timeout`.
    /// - [`Status::Connection`] when a new session could not be created.
    pub fn acquire_with_timeout(
        &self,
        endpoint: &Endpoint,
        settings: &Settings,
        timeout: Duration,
    ) -> Result<SessionHandle<D::SessionType>> {
        if !settings.connection_cache {
            return self.open_standalone(endpoint);
        }

        let key = endpoint.key();
        let deadline = Instant::now() + timeout;
        loop {
            let entry = self.entry(&key, settings.connection_limit);
            let mut state = entry.state.lock();
            while !state.cleared {
                if let Some(context) = state.idle.pop() {
                    tracing::debug!(%endpoint, "reusing pooled session");
                    return Ok(SessionHandle::pooled(context, Arc::downgrade(&entry)));
                }

                if state.total < state.limit {
                    // Reserve the slot and dial without holding the lock.
                    state.total += 1;
                    drop(state);
                    return match SessionContext::open(&self.driver, endpoint) {
                        Ok(context) => Ok(SessionHandle::pooled(context, Arc::downgrade(&entry))),
                        Err(error) => {
                            entry.forget();
                            Err(error)
                        }
                    };
                }

                let timed_out = entry
                    .available
                    .wait_until(&mut state, deadline)
                    .timed_out();
                if timed_out
                    && !state.cleared
                    && state.idle.is_empty()
                    && state.total >= state.limit
                {
                    tracing::debug!(%endpoint, ?timeout, "timed out waiting for a pooled session");
                    return Err(Error::with_message_and_status(
                        "connection pool timeout waiting for available session",
                        Status::ResourceExhausted,
                    ));
                }
            }
            // The pool was cleared while we waited; start over on a fresh one.
        }
    }

    /// Open a session outside every pool. It is torn down when its handle is
    /// dropped and never counts against a pool's capacity.
    pub fn open_standalone(&self, endpoint: &Endpoint) -> Result<SessionHandle<D::SessionType>> {
        let context = SessionContext::open(&self.driver, endpoint)?;
        Ok(SessionHandle::standalone(context))
    }

    /// The pool for `key`, created on first use, with its capacity raised to
    /// at least `limit`.
    fn entry(&self, key: &str, limit: usize) -> Arc<PoolEntry<D::SessionType>> {
        let entry = self
            .entries
            .lock()
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(PoolEntry::new(limit)))
            .clone();
        let raised = {
            let mut state = entry.state.lock();
            let raised = limit > state.limit;
            state.limit = state.limit.max(limit);
            raised
        };
        if raised {
            entry.available.notify_all();
        }
        entry
    }

    /// Drop every pool and close their idle sessions.
    ///
    /// Checked-out sessions stay usable; they are closed when their handles
    /// are dropped.
    pub fn clear(&self) {
        let entries: Vec<_> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        for entry in entries {
            let idle = {
                let mut state = entry.state.lock();
                state.cleared = true;
                state.total = 0;
                std::mem::take(&mut state.idle)
            };
            entry.available.notify_all();
            tracing::debug!(closed = idle.len(), "cleared session pool");
            drop(idle);
        }
    }

    /// Statistics of the pool for `endpoint`, if one exists.
    pub fn stats(&self, endpoint: &Endpoint) -> Option<PoolStats> {
        let entry = self.entries.lock().get(&endpoint.key()).cloned();
        entry.map(|entry| entry.stats())
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for ConnectionPool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("driver", &self.driver)
            .field("pools", &self.entries.lock().len())
            .finish()
    }
}
