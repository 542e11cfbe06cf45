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

//! Native session ownership.
//!
//! A [`SessionContext`] exclusively owns one native session and releases its
//! sub-handles in [`HandleKind::TEARDOWN_ORDER`] when dropped. A
//! [`SessionHandle`] borrows a context out of a pool and puts it back when it
//! goes out of scope.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Weak,
    time::{Duration, Instant},
};

use orabridge_core::{
    error::{Result, Status},
    Driver, Endpoint, HandleKind, Session,
};

use crate::pool::PoolEntry;

/// Bound on every network round-trip of a new session.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// One live native session and its sub-handles.
pub struct SessionContext<S: Session> {
    session: S,
    endpoint: String,
    created: Instant,
}

impl<S: Session> SessionContext<S> {
    /// Dial and authenticate a new session.
    pub(crate) fn open<D>(driver: &D, endpoint: &Endpoint) -> Result<Self>
    where
        D: Driver<SessionType = S>,
    {
        let mut session = driver.connect(endpoint).map_err(|error| {
            error
                .with_status(Status::Connection)
                .context(format!("connect to {endpoint}"))
        })?;
        // Older servers reject call timeouts.
        if let Err(error) = session.set_call_timeout(CALL_TIMEOUT) {
            tracing::debug!(%endpoint, %error, "call timeout not supported");
        }
        tracing::debug!(%endpoint, "opened session");
        Ok(Self {
            session,
            endpoint: endpoint.to_string(),
            created: Instant::now(),
        })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// How long ago the session was opened.
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

impl<S: Session> fmt::Debug for SessionContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("endpoint", &self.endpoint)
            .field("age", &self.age())
            .finish()
    }
}

impl<S: Session> Drop for SessionContext<S> {
    fn drop(&mut self) {
        for handle in HandleKind::TEARDOWN_ORDER {
            if let Err(error) = self.session.release(handle) {
                tracing::warn!(endpoint = %self.endpoint, ?handle, %error, "failed to release session handle");
            }
        }
        tracing::debug!(endpoint = %self.endpoint, "closed session");
    }
}

/// A checked-out session.
///
/// Dropping the handle returns the session to the pool it came from, or tears
/// it down when it is standalone or its pool has been cleared since.
pub struct SessionHandle<S: Session> {
    context: Option<SessionContext<S>>,
    pool: Option<Weak<PoolEntry<S>>>,
}

impl<S: Session> SessionHandle<S> {
    pub(crate) fn pooled(context: SessionContext<S>, pool: Weak<PoolEntry<S>>) -> Self {
        Self {
            context: Some(context),
            pool: Some(pool),
        }
    }

    pub(crate) fn standalone(context: SessionContext<S>) -> Self {
        Self {
            context: Some(context),
            pool: None,
        }
    }

    /// Whether dropping this handle returns the session to a pool.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    pub fn context(&self) -> &SessionContext<S> {
        self.context.as_ref().expect("context is present until drop")
    }

    /// Tear the session down instead of returning it, freeing its pool slot.
    pub fn discard(mut self) {
        if let Some(context) = self.context.take() {
            drop(context);
            if let Some(entry) = self.pool.take().and_then(|pool| pool.upgrade()) {
                entry.forget();
            }
        }
    }
}

impl<S: Session> Deref for SessionHandle<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        self.context().session()
    }
}

impl<S: Session> DerefMut for SessionHandle<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
            .as_mut()
            .expect("context is present until drop")
            .session_mut()
    }
}

impl<S: Session> fmt::Debug for SessionHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("context", &self.context)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

impl<S: Session> Drop for SessionHandle<S> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            match self.pool.take().and_then(|pool| pool.upgrade()) {
                Some(entry) => entry.release(context),
                None => drop(context),
            }
        }
    }
}
