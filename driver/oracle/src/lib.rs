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

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

use std::sync::Arc;

use orabridge_core::{
    error::{Error, Result, Status},
    Driver, Endpoint,
};

pub mod catalog;
pub use catalog::{CatalogState, TableEntry};

pub mod classify;
pub mod decode;

pub mod execute;
pub use execute::ExecuteSummary;

pub mod pool;
pub use pool::{ConnectionPool, PoolStats};

pub mod registry;
pub use registry::{clear_all, CatalogRegistry};

pub mod rewrite;

pub mod scan;
pub use scan::{BindData, ScanReader};

pub mod session;
pub use session::SessionHandle;

pub mod settings;
pub use settings::{Builder, Settings};

pub mod version;
use version::Capabilities;

pub(crate) mod duration;

/// Entry point owning the session pool and the catalog registry shared by
/// every attachment and ad-hoc query made through it.
pub struct Connector<D: Driver> {
    pool: Arc<ConnectionPool<D>>,
    registry: CatalogRegistry<D>,
}

impl<D: Driver> Connector<D> {
    pub fn new(driver: D) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new(driver)),
            registry: CatalogRegistry::new(),
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<D>> {
        &self.pool
    }

    pub fn registry(&self) -> &CatalogRegistry<D> {
        &self.registry
    }

    /// Attach an endpoint, registering its catalog state under `alias`.
    ///
    /// The metadata session is opened right away so that unreachable
    /// endpoints fail here, and the current schema is detected on it.
    pub fn attach(
        &self,
        endpoint: Endpoint,
        settings: Settings,
        alias: Option<&str>,
    ) -> Result<Arc<CatalogState<D>>> {
        let state = Arc::new(CatalogState::new(
            Arc::clone(&self.pool),
            endpoint,
            settings,
        ));
        state.connect()?;
        if let Err(error) = state.detect_current_schema() {
            tracing::warn!(endpoint = %state.endpoint(), %error, "current schema detection failed");
        }
        self.registry.register(&state, alias);
        tracing::debug!(endpoint = %state.endpoint(), alias, "attached");
        Ok(state)
    }

    /// Bind an ad-hoc query.
    ///
    /// `connection` is either an endpoint address or, when it contains no
    /// `@`, the alias of an attached endpoint whose settings and detected
    /// capabilities are reused. Otherwise `settings` apply, defaulting to
    /// [`Settings::default`], and no version specific conversion is used.
    pub fn bind_query(
        &self,
        connection: &str,
        sql: &str,
        settings: Option<Settings>,
    ) -> Result<BindData<D>> {
        let (endpoint, settings, capabilities) = self.resolve(connection, settings)?;
        BindData::bind(Arc::clone(&self.pool), endpoint, settings, capabilities, sql)
    }

    /// Run a statement that returns no rows, committing on success.
    ///
    /// `connection` is resolved as in [`Connector::bind_query`]; explicit
    /// endpoints use [`Settings::default`].
    pub fn execute(&self, connection: &str, sql: &str) -> Result<ExecuteSummary> {
        let (endpoint, settings, _) = self.resolve(connection, None)?;
        execute::execute(&self.pool, &endpoint, &settings, sql)
    }

    fn resolve(
        &self,
        connection: &str,
        settings: Option<Settings>,
    ) -> Result<(Endpoint, Settings, Capabilities)> {
        if !connection.contains('@') {
            let state = self.registry.lookup(connection).ok_or_else(|| {
                Error::with_message_and_status(
                    format!("no attached database named {connection}"),
                    Status::NotFound,
                )
            })?;
            return Ok((
                state.endpoint().clone(),
                state.settings(),
                state.capabilities(),
            ));
        }
        let endpoint = Endpoint::parse(connection)?;
        Ok((endpoint, settings.unwrap_or_default(), Capabilities::default()))
    }

    /// Drop every catalog cache and close every pooled session.
    pub fn clear_cache(&self) {
        clear_all(&self.registry, &self.pool);
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for Connector<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("pool", &self.pool)
            .field("registry", &self.registry)
            .finish()
    }
}
