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

//! Blocking interface to a native database client.
//!
//! A [Driver] dials [Session]s; a session hands out [Statement]s that prepare,
//! describe, execute and fetch into caller-owned [DefineBuffer]s. Everything
//! above this layer (pooling, caching, rewriting, decoding) is written against
//! these traits only.

use std::time::Duration;

use crate::constants::{TypeCode, DEFAULT_CHAR_SIZE};
use crate::endpoint::Endpoint;
use crate::error::Result;

/// Native sub-handles of a session, in the order they are released.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// End the authenticated user session.
    SessionEnd,
    /// Free the session handle.
    Session,
    /// Free the service context.
    ServiceContext,
    /// Detach from the server.
    ServerDetach,
    /// Free the server handle.
    Server,
    /// Free the error handle.
    Error,
    /// Free the environment, when the session owns it.
    Environment,
}

impl HandleKind {
    /// Release order of a session's sub-handles, dependants first.
    pub const TEARDOWN_ORDER: [HandleKind; 7] = [
        HandleKind::SessionEnd,
        HandleKind::Session,
        HandleKind::ServiceContext,
        HandleKind::ServerDetach,
        HandleKind::Server,
        HandleKind::Error,
        HandleKind::Environment,
    ];
}

/// A handle to a native client library.
pub trait Driver: Send + Sync {
    type SessionType: Session;

    /// Dial and authenticate a new session.
    fn connect(&self, endpoint: &Endpoint) -> Result<Self::SessionType>;
}

/// One live connection to the remote database.
///
/// Sessions are never shared between threads while in use; they only move
/// between owners.
pub trait Session: Send {
    type StatementType: Statement;

    /// Allocate a new statement bound to this session.
    fn new_statement(&mut self) -> Result<Self::StatementType>;

    /// Bound every network round-trip made by this session.
    fn set_call_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Commit the session's open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Release one native sub-handle. Called once per [HandleKind] in
    /// [HandleKind::TEARDOWN_ORDER] when the session is destroyed.
    fn release(&mut self, handle: HandleKind) -> Result<()>;
}

/// A prepared query and its open cursor.
pub trait Statement: Send {
    /// Prefetch hints applied to subsequent executions.
    fn set_prefetch(&mut self, rows: u32, memory: u32) -> Result<()>;

    /// Prepare the query text. Replaces any previously prepared text.
    fn prepare(&mut self, sql: &str) -> Result<()>;

    /// Metadata-only execution of the prepared text.
    fn describe(&mut self) -> Result<Vec<ColumnDescription>>;

    /// Execute the prepared text and open a cursor.
    fn execute(&mut self) -> Result<()>;

    /// Fetch up to `max_rows` rows of the open cursor, one buffer per column.
    fn fetch(&mut self, buffers: &mut [DefineBuffer], max_rows: usize) -> Result<FetchStatus>;

    /// Rows processed by the last execution.
    fn row_count(&self) -> Result<u64>;

    /// The prepared text modifies rows (`INSERT`, `UPDATE`, `DELETE` or
    /// `MERGE`) instead of querying them.
    fn is_dml(&self) -> Result<bool>;
}

/// A result column as reported by [Statement::describe].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: TypeCode,
    /// Declared type name, reported for named types (spatial, XML, ...).
    pub type_name: Option<String>,
    pub precision: i16,
    pub scale: i8,
    /// Maximum width in characters; 0 when unknown.
    pub char_size: u32,
    pub nullable: bool,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
            type_name: None,
            precision: 0,
            scale: 0,
            char_size: 0,
            nullable: true,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_precision(mut self, precision: i16, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_char_size(mut self, char_size: u32) -> Self {
        self.char_size = char_size;
        self
    }

    /// Character width, falling back to [DEFAULT_CHAR_SIZE].
    pub fn effective_char_size(&self) -> u32 {
        match self.char_size {
            0 => DEFAULT_CHAR_SIZE,
            size => size,
        }
    }
}

/// How the native layer writes values into a [DefineBuffer].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DefineKind {
    /// Native-endian `i64`, 8 bytes per row.
    Int64,
    /// Native-endian `f64`, 8 bytes per row.
    Float64,
    /// Character data, `lengths[row]` bytes per row.
    Text,
    /// Raw bytes, `lengths[row]` bytes per row.
    Bytes,
}

/// Indicator value of a null row.
pub const NULL_INDICATOR: i16 = -1;

/// Indicator value of a truncated row whose full length does not fit an `i16`.
pub const TRUNCATED_OVERFLOW_INDICATOR: i16 = -2;

/// Pre-sized storage for one column of one fetch batch.
///
/// Row `i` occupies `data[i * width..(i + 1) * width]`. Indicators follow the
/// native convention: [NULL_INDICATOR] marks a null row, zero a value that
/// fit, a positive value the untruncated length of a value that was cut
/// short, and [TRUNCATED_OVERFLOW_INDICATOR] a truncated value too long to
/// report. `lengths[i]` always carries the full length of a non-null value.
#[derive(Debug, Clone)]
pub struct DefineBuffer {
    pub kind: DefineKind,
    pub width: usize,
    pub data: Vec<u8>,
    pub indicators: Vec<i16>,
    pub lengths: Vec<u32>,
}

impl DefineBuffer {
    pub fn new(kind: DefineKind, width: usize, rows: usize) -> Self {
        let width = match kind {
            DefineKind::Int64 | DefineKind::Float64 => 8,
            DefineKind::Text | DefineKind::Bytes => width.max(1),
        };
        Self {
            kind,
            width,
            data: vec![0; width * rows],
            indicators: vec![0; rows],
            lengths: vec![0; rows],
        }
    }

    /// Number of rows this buffer holds.
    pub fn capacity(&self) -> usize {
        self.indicators.len()
    }

    /// The slot of `row`.
    pub fn slot(&self, row: usize) -> &[u8] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// The mutable slot of `row`.
    pub fn slot_mut(&mut self, row: usize) -> &mut [u8] {
        let width = self.width;
        &mut self.data[row * width..(row + 1) * width]
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.indicators[row] == NULL_INDICATOR
    }
}

/// Outcome of one [Statement::fetch] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FetchStatus {
    /// Rows written into the buffers.
    pub rows: usize,
    /// The cursor has no more rows. May accompany a non-zero `rows`.
    pub exhausted: bool,
}
