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

//! Bind and scan of remote queries.
//!
//! [`BindData`] is the result of binding a query: it prepares and describes
//! the query once, plans every column and accepts predicate and projection
//! pushdown. [`BindData::scan`] then runs the (possibly rewritten) query and
//! yields Arrow record batches through a [`ScanReader`].

use std::{fmt, sync::Arc};

use arrow_array::{RecordBatch, RecordBatchOptions, RecordBatchReader};
use arrow_schema::{ArrowError, Schema, SchemaRef};
use parking_lot::Mutex;

use orabridge_core::{
    error::{Error, Result, Status},
    sync::{DefineBuffer, DefineKind},
    Driver, Endpoint, Session, Statement,
};

use crate::{
    classify::ColumnPlan,
    decode::decode_column,
    pool::ConnectionPool,
    rewrite::{build_query, partition_predicates, Expr},
    session::SessionHandle,
    settings::Settings,
    version::Capabilities,
};

/// Upper bound on the fetch buffers of one scan.
pub const FETCH_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Per-row bookkeeping next to the value: indicator and returned length.
const ROW_OVERHEAD: usize = std::mem::size_of::<i16>() + std::mem::size_of::<u32>();

/// Log remote SQL, loudly when asked to.
pub(crate) fn log_query(settings: &Settings, phase: &str, sql: &str) {
    if settings.debug_show_queries {
        tracing::info!(phase, sql, "remote query");
    } else {
        tracing::trace!(phase, sql, "remote query");
    }
}

/// A prepared statement and the session it belongs to.
///
/// The statement is declared first so that it is dropped before its session.
struct Prepared<S: Session> {
    statement: S::StatementType,
    session: SessionHandle<S>,
    query: String,
}

impl<S: Session> Prepared<S> {
    fn new(mut session: SessionHandle<S>, settings: &Settings, query: &str) -> Result<Self> {
        let mut statement = session
            .new_statement()
            .map_err(|error| error.with_status(Status::Prepare))?;
        statement
            .set_prefetch(settings.prefetch_rows, settings.prefetch_memory)
            .map_err(|error| error.with_status(Status::Prepare))?;
        log_query(settings, "prepare", query);
        statement
            .prepare(query)
            .map_err(|error| error.with_status(Status::Prepare))?;
        Ok(Self {
            statement,
            session,
            query: query.to_owned(),
        })
    }
}

/// The bound form of one remote query.
pub struct BindData<D: Driver> {
    pool: Arc<ConnectionPool<D>>,
    endpoint: Endpoint,
    settings: Settings,
    base_query: String,
    query: String,
    /// Every column of the base query, in remote order.
    columns: Vec<ColumnPlan>,
    /// Indices into `columns` the scan returns; all of them when unset.
    projection: Option<Vec<usize>>,
    /// Remote `WHERE` clauses, ANDed.
    clauses: Vec<String>,
    prepared: Arc<Mutex<Option<Prepared<D::SessionType>>>>,
}

impl<D: Driver> BindData<D> {
    /// Prepare and describe `query`, planning every result column.
    ///
    /// # Errors
    ///
    /// - [`Status::ResourceExhausted`] or [`Status::Connection`] when no
    ///   session could be acquired.
    /// - [`Status::Prepare`] or [`Status::Describe`] when the remote side
    ///   rejects the query.
    pub fn bind(
        pool: Arc<ConnectionPool<D>>,
        endpoint: Endpoint,
        settings: Settings,
        capabilities: Capabilities,
        query: impl Into<String>,
    ) -> Result<Self> {
        let base_query = query.into();
        let session = pool.acquire(&endpoint, &settings)?;
        let mut prepared = Prepared::new(session, &settings, &base_query)?;
        let described = prepared
            .statement
            .describe()
            .map_err(|error| error.with_status(Status::Describe))?;
        if described.is_empty() {
            return Err(Error::with_message_and_status(
                format!("describe: query returns no columns: {base_query}"),
                Status::Describe,
            ));
        }
        let columns: Vec<_> = described
            .iter()
            .map(|column| ColumnPlan::new(column, &capabilities, &settings))
            .collect();
        tracing::debug!(
            %endpoint,
            columns = columns.len(),
            converted = columns.iter().filter(|column| column.conversion.is_some()).count(),
            "bound query"
        );

        let mut bind = Self {
            pool,
            endpoint,
            settings,
            query: base_query.clone(),
            base_query,
            columns,
            projection: None,
            clauses: Vec::new(),
            prepared: Arc::new(Mutex::new(Some(prepared))),
        };
        bind.update_query();
        Ok(bind)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn base_query(&self) -> &str {
        &self.base_query
    }

    /// The query text the next scan runs.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Every column of the base query.
    pub fn all_columns(&self) -> &[ColumnPlan] {
        &self.columns
    }

    /// The columns a scan returns, in order.
    pub fn columns(&self) -> Vec<&ColumnPlan> {
        match &self.projection {
            Some(indices) => indices.iter().map(|&index| &self.columns[index]).collect(),
            None => self.columns.iter().collect(),
        }
    }

    /// Remote clauses pushed so far.
    pub fn pushed_filters(&self) -> &[String] {
        &self.clauses
    }

    pub fn schema(&self) -> SchemaRef {
        let fields: Vec<_> = self.columns().into_iter().map(ColumnPlan::field).collect();
        Arc::new(Schema::new(fields))
    }

    /// Ship what can be shipped of `predicates` to the remote side.
    ///
    /// Column indices refer to [`Self::all_columns`]. Returns the predicates
    /// the caller must still evaluate locally; with pushdown disabled that is
    /// all of them.
    pub fn push_filters(&mut self, predicates: Vec<Expr>) -> Vec<Expr> {
        if !self.settings.enable_pushdown {
            return predicates;
        }
        let (pushed, remaining) = partition_predicates(predicates, &self.columns);
        for clause in pushed {
            if !self.clauses.contains(&clause) {
                self.clauses.push(clause);
            }
        }
        self.update_query();
        tracing::debug!(
            pushed = self.clauses.len(),
            remaining = remaining.len(),
            "pushed filters"
        );
        remaining
    }

    /// Restrict the scan to the columns at `indices` of [`Self::all_columns`].
    ///
    /// Ignored when pushdown is disabled.
    pub fn push_projection(&mut self, indices: &[usize]) -> Result<()> {
        if !self.settings.enable_pushdown {
            return Ok(());
        }
        if let Some(&index) = indices.iter().find(|&&index| index >= self.columns.len()) {
            return Err(Error::with_message_and_status(
                format!(
                    "projection index {index} out of range for {} columns",
                    self.columns.len()
                ),
                Status::InvalidArguments,
            ));
        }
        self.projection = Some(indices.to_vec());
        self.update_query();
        Ok(())
    }

    fn update_query(&mut self) {
        let converted = self.columns.iter().any(|column| column.conversion.is_some());
        let select = match (&self.projection, converted) {
            (Some(indices), _) => Some(indices.iter().map(|&index| self.columns[index].clone()).collect()),
            (None, true) => Some(self.columns.clone()),
            (None, false) => None,
        };
        self.query = build_query(&self.base_query, select.as_deref(), &self.clauses);
    }

    /// Start a scan.
    ///
    /// The statement prepared at bind time is reused when the query text is
    /// unchanged; otherwise it is discarded and the current text is prepared
    /// on a freshly acquired session.
    pub fn scan(&self) -> Result<ScanReader<D::SessionType>> {
        let cached = self.prepared.lock().take();
        let prepared = match cached {
            Some(prepared) if prepared.query == self.query => prepared,
            stale => {
                drop(stale);
                let session = self.pool.acquire(&self.endpoint, &self.settings)?;
                Prepared::new(session, &self.settings, &self.query)?
            }
        };

        let columns: Vec<ColumnPlan> = self.columns().into_iter().cloned().collect();
        let rows;
        let buffers = if columns.is_empty() {
            // Only the constant selected in place of the columns is fetched.
            rows = rows_per_fetch(self.settings.array_size, &[8]);
            vec![DefineBuffer::new(DefineKind::Int64, 8, rows)]
        } else {
            let widths: Vec<usize> = columns.iter().map(|column| column.width).collect();
            rows = rows_per_fetch(self.settings.array_size, &widths);
            columns
                .iter()
                .map(|column| DefineBuffer::new(column.fetch.define_kind(), column.width, rows))
                .collect()
        };
        tracing::debug!(endpoint = %self.endpoint, rows_per_fetch = rows, "starting scan");

        Ok(ScanReader {
            schema: self.schema(),
            warned: vec![false; columns.len()],
            columns,
            buffers,
            rows_per_fetch: rows,
            phase: ScanPhase::Prepared,
            prepared: Some(prepared),
            settings: self.settings.clone(),
        })
    }
}

impl<D: Driver> Clone for BindData<D> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            endpoint: self.endpoint.clone(),
            settings: self.settings.clone(),
            base_query: self.base_query.clone(),
            query: self.query.clone(),
            columns: self.columns.clone(),
            projection: self.projection.clone(),
            clauses: self.clauses.clone(),
            prepared: Arc::clone(&self.prepared),
        }
    }
}

impl<D: Driver> fmt::Debug for BindData<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindData")
            .field("endpoint", &self.endpoint)
            .field("query", &self.query)
            .field("columns", &self.columns)
            .field("projection", &self.projection)
            .finish()
    }
}

/// Rows fetched per round-trip: `array_size`, lowered until the buffers of
/// one fetch fit [`FETCH_MEMORY_BUDGET`].
pub fn rows_per_fetch(array_size: usize, widths: &[usize]) -> usize {
    let row_bytes: usize = widths.iter().map(|width| width + ROW_OVERHEAD).sum();
    let budget_rows = FETCH_MEMORY_BUDGET / row_bytes.max(1);
    array_size.min(budget_rows).max(1)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScanPhase {
    Prepared,
    Executing,
    Exhausted,
    Failed,
}

/// Streams the batches of one scan.
///
/// The session goes back to its pool as soon as the scan is exhausted or
/// fails, or when the reader is dropped.
pub struct ScanReader<S: Session> {
    schema: SchemaRef,
    columns: Vec<ColumnPlan>,
    buffers: Vec<DefineBuffer>,
    rows_per_fetch: usize,
    phase: ScanPhase,
    /// Truncation already reported, per column.
    warned: Vec<bool>,
    prepared: Option<Prepared<S>>,
    settings: Settings,
}

impl<S: Session> ScanReader<S> {
    /// Rows requested per fetch.
    pub fn rows_per_fetch(&self) -> usize {
        self.rows_per_fetch
    }

    /// Fetch and decode the next batch, or `None` once the cursor is drained.
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        match self.step() {
            Ok(batch) => Ok(batch),
            Err(error) => {
                self.phase = ScanPhase::Failed;
                self.prepared = None;
                Err(error)
            }
        }
    }

    fn step(&mut self) -> Result<Option<RecordBatch>> {
        let Some(prepared) = self.prepared.as_mut() else {
            return Ok(None);
        };
        match self.phase {
            ScanPhase::Exhausted | ScanPhase::Failed => return Ok(None),
            ScanPhase::Prepared => {
                log_query(&self.settings, "execute", &prepared.query);
                prepared
                    .statement
                    .execute()
                    .map_err(|error| error.with_status(Status::Fetch))?;
                self.phase = ScanPhase::Executing;
            }
            ScanPhase::Executing => {}
        }

        let status = prepared
            .statement
            .fetch(&mut self.buffers, self.rows_per_fetch)
            .map_err(|error| error.with_status(Status::Fetch))?;
        if status.rows > self.rows_per_fetch {
            return Err(Error::with_message_and_status(
                format!(
                    "fetch reported {} rows but the buffers hold {}",
                    status.rows, self.rows_per_fetch
                ),
                Status::Fetch,
            ));
        }
        // A fetch that returns nothing also ends the cursor.
        if status.exhausted || status.rows == 0 {
            self.phase = ScanPhase::Exhausted;
        }
        let batch = match status.rows {
            0 => None,
            rows => Some(self.decode(rows)?),
        };
        if self.phase == ScanPhase::Exhausted {
            self.prepared = None;
        }
        Ok(batch)
    }

    fn decode(&mut self, rows: usize) -> Result<RecordBatch> {
        let mut arrays = Vec::with_capacity(self.columns.len());
        for (index, (column, buffer)) in self.columns.iter().zip(&self.buffers).enumerate() {
            let decoded = decode_column(column, buffer, rows)?;
            if decoded.truncated && !self.warned[index] {
                self.warned[index] = true;
                tracing::warn!(
                    column = %column.name,
                    width = buffer.width,
                    "values truncated to the fetch buffer width"
                );
            }
            arrays.push(decoded.array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(rows));
        Ok(RecordBatch::try_new_with_options(
            Arc::clone(&self.schema),
            arrays,
            &options,
        )?)
    }
}

impl<S: Session> fmt::Debug for ScanReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanReader")
            .field("schema", &self.schema)
            .field("rows_per_fetch", &self.rows_per_fetch)
            .field("phase", &self.phase)
            .finish()
    }
}

impl<S: Session> Iterator for ScanReader<S> {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().map_err(ArrowError::from).transpose()
    }
}

impl<S: Session> RecordBatchReader for ScanReader<S> {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }
}
