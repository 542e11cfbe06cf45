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

//! An in-memory native backend.
//!
//! [DummyDriver] answers queries from canned results registered by SQL text
//! (exact match first, then the longest registered prefix) and records every
//! connect, prepare, execute, commit and handle release so tests can observe what the
//! connector did. Clones share state.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use orabridge_core::{
    error::{Error, Result, Status},
    ColumnDescription, DefineBuffer, DefineKind, Endpoint, FetchStatus, HandleKind,
    NULL_INDICATOR, TRUNCATED_OVERFLOW_INDICATOR,
};

/// A cell of a canned result.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<i64> for DummyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for DummyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DummyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<Vec<u8>> for DummyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T: Into<DummyValue>> From<Option<T>> for DummyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Columns and rows returned for a query.
#[derive(Debug, Clone, Default)]
pub struct DummyResult {
    pub columns: Vec<ColumnDescription>,
    pub rows: Vec<Vec<DummyValue>>,
    /// Rows modified by a DML statement; `None` for queries.
    pub affected_rows: Option<u64>,
}

impl DummyResult {
    pub fn new(columns: Vec<ColumnDescription>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            affected_rows: None,
        }
    }

    /// A DML statement modifying `rows` rows.
    pub fn modifying(rows: u64) -> Self {
        Self {
            affected_rows: Some(rows),
            ..Self::default()
        }
    }

    pub fn with_row(mut self, row: Vec<DummyValue>) -> Self {
        self.rows.push(row);
        self
    }

    /// A single text column, one row per value.
    pub fn strings(name: &str, values: &[&str]) -> Self {
        values.iter().fold(
            Self::new(vec![ColumnDescription::new(
                name,
                orabridge_core::constants::SQLT_CHR,
            )]),
            |result, value| result.with_row(vec![DummyValue::from(*value)]),
        )
    }
}

/// Call at which a registered error is raised.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Describe,
    Execute,
    Fetch,
}

#[derive(Debug, Clone, Default)]
struct Response {
    result: DummyResult,
    failure: Option<(Phase, Error)>,
}

impl Response {
    fn result(result: DummyResult) -> Self {
        Self {
            result,
            failure: None,
        }
    }
}

#[derive(Debug, Default)]
struct DummyState {
    exact: HashMap<String, Response>,
    prefixes: Vec<(String, Response)>,
    connect_error: Option<Error>,
    connect_delay: Duration,
    release_error: Option<HandleKind>,
    connects: usize,
    live_sessions: usize,
    next_session: usize,
    prepared: Vec<String>,
    executed: Vec<String>,
    released: Vec<(usize, HandleKind)>,
    prefetch: Option<(u32, u32)>,
    call_timeout: Option<Duration>,
    commits: usize,
    surplus_rows: usize,
}

impl DummyState {
    fn lookup(&self, sql: &str) -> Option<Response> {
        if let Some(response) = self.exact.get(sql) {
            return Some(response.clone());
        }
        self.prefixes
            .iter()
            .filter(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, response)| response.clone())
    }
}

/// The dummy native driver.
#[derive(Debug, Clone, Default)]
pub struct DummyDriver {
    state: Arc<Mutex<DummyState>>,
}

impl DummyDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` exactly with `result`.
    pub fn with_result(self, sql: impl Into<String>, result: DummyResult) -> Self {
        self.state
            .lock()
            .exact
            .insert(sql.into(), Response::result(result));
        self
    }

    /// Answer every query starting with `prefix` with `result`.
    pub fn with_prefix_result(self, prefix: impl Into<String>, result: DummyResult) -> Self {
        self.state
            .lock()
            .prefixes
            .push((prefix.into(), Response::result(result)));
        self
    }

    /// Fail `sql` at `phase`.
    pub fn with_error(self, sql: impl Into<String>, phase: Phase, error: Error) -> Self {
        self.with_failing_result(sql, DummyResult::default(), phase, error)
    }

    /// Describe `sql` as `result` but fail at `phase`.
    pub fn with_failing_result(
        self,
        sql: impl Into<String>,
        result: DummyResult,
        phase: Phase,
        error: Error,
    ) -> Self {
        self.state.lock().exact.insert(
            sql.into(),
            Response {
                result,
                failure: Some((phase, error)),
            },
        );
        self
    }

    /// Fail every query starting with `prefix` at `phase`.
    pub fn with_prefix_error(self, prefix: impl Into<String>, phase: Phase, error: Error) -> Self {
        self.state.lock().prefixes.push((
            prefix.into(),
            Response {
                result: DummyResult::default(),
                failure: Some((phase, error)),
            },
        ));
        self
    }

    /// Make subsequent connects fail (or succeed again with `None`).
    pub fn set_connect_error(&self, error: Option<Error>) {
        self.state.lock().connect_error = error;
    }

    /// Sleep this long inside every connect.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.state.lock().connect_delay = delay;
    }

    /// Make releasing `handle` fail on every session.
    pub fn set_release_error(&self, handle: Option<HandleKind>) {
        self.state.lock().release_error = handle;
    }

    /// Report `rows` more rows per fetch than were written.
    pub fn set_surplus_rows(&self, rows: usize) {
        self.state.lock().surplus_rows = rows;
    }

    /// Successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Sessions connected and not yet torn down.
    pub fn live_sessions(&self) -> usize {
        self.state.lock().live_sessions
    }

    /// Every prepared query text, in order.
    pub fn prepared(&self) -> Vec<String> {
        self.state.lock().prepared.clone()
    }

    /// Every executed query text, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    /// Number of executions of queries starting with `prefix`.
    pub fn executed_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .count()
    }

    /// Handles released so far as `(session id, handle)` pairs.
    pub fn released(&self) -> Vec<(usize, HandleKind)> {
        self.state.lock().released.clone()
    }

    /// Commits so far, across sessions.
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// The most recent prefetch hint.
    pub fn last_prefetch(&self) -> Option<(u32, u32)> {
        self.state.lock().prefetch
    }

    /// The most recent call timeout.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.state.lock().call_timeout
    }
}

impl orabridge_core::Driver for DummyDriver {
    type SessionType = DummySession;

    fn connect(&self, _endpoint: &Endpoint) -> Result<Self::SessionType> {
        let (delay, error) = {
            let state = self.state.lock();
            (state.connect_delay, state.connect_error.clone())
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if let Some(error) = error {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.connects += 1;
        state.live_sessions += 1;
        state.next_session += 1;
        Ok(DummySession {
            id: state.next_session,
            state: self.state.clone(),
            released: Vec::new(),
        })
    }
}

/// A dummy session.
#[derive(Debug)]
pub struct DummySession {
    id: usize,
    state: Arc<Mutex<DummyState>>,
    released: Vec<HandleKind>,
}

impl DummySession {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl orabridge_core::Session for DummySession {
    type StatementType = DummyStatement;

    fn new_statement(&mut self) -> Result<Self::StatementType> {
        Ok(DummyStatement {
            state: self.state.clone(),
            sql: None,
            response: None,
            cursor: None,
        })
    }

    fn set_call_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.state.lock().call_timeout = Some(timeout);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.state.lock().commits += 1;
        Ok(())
    }

    fn release(&mut self, handle: HandleKind) -> Result<()> {
        let mut state = self.state.lock();
        state.released.push((self.id, handle));
        self.released.push(handle);
        if handle == HandleKind::Environment {
            state.live_sessions -= 1;
        }
        if state.release_error == Some(handle) {
            return Err(Error::native(
                Status::IO,
                format!("release {handle:?}"),
                "ORA-03113: end-of-file on communication channel",
                3113,
            ));
        }
        Ok(())
    }
}

/// A dummy statement.
#[derive(Debug)]
pub struct DummyStatement {
    state: Arc<Mutex<DummyState>>,
    sql: Option<String>,
    response: Option<Response>,
    cursor: Option<usize>,
}

impl DummyStatement {
    fn not_prepared() -> Error {
        Error::with_message_and_status("statement is not prepared", Status::InvalidState)
    }

    fn not_executed() -> Error {
        Error::with_message_and_status("statement is not executed", Status::InvalidState)
    }

    fn fail_at(&self, phase: Phase) -> Result<()> {
        match self.response.as_ref().and_then(|response| response.failure.as_ref()) {
            Some((at, error)) if *at == phase => Err(error.clone()),
            _ => Ok(()),
        }
    }

    fn result(&self) -> Result<&DummyResult> {
        self.response
            .as_ref()
            .map(|response| &response.result)
            .ok_or_else(Self::not_prepared)
    }
}

impl orabridge_core::Statement for DummyStatement {
    fn set_prefetch(&mut self, rows: u32, memory: u32) -> Result<()> {
        self.state.lock().prefetch = Some((rows, memory));
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> Result<()> {
        let response = {
            let mut state = self.state.lock();
            state.prepared.push(sql.to_owned());
            state.lookup(sql)
        };
        self.cursor = None;
        self.sql = Some(sql.to_owned());
        self.response = Some(response.ok_or_else(|| {
            Error::native(
                Status::Prepare,
                "prepare",
                "ORA-00942: table or view does not exist",
                942,
            )
        })?);
        self.fail_at(Phase::Prepare)
    }

    fn describe(&mut self) -> Result<Vec<ColumnDescription>> {
        self.fail_at(Phase::Describe)?;
        Ok(self.result()?.columns.clone())
    }

    fn execute(&mut self) -> Result<()> {
        let sql = self.sql.clone().ok_or_else(Self::not_prepared)?;
        self.state.lock().executed.push(sql);
        self.fail_at(Phase::Execute)?;
        self.result()?;
        self.cursor = Some(0);
        Ok(())
    }

    fn fetch(&mut self, buffers: &mut [DefineBuffer], max_rows: usize) -> Result<FetchStatus> {
        self.fail_at(Phase::Fetch)?;
        let start = self.cursor.ok_or_else(Self::not_executed)?;
        let result = self.result()?;
        let total = result.rows.len();
        if buffers.len() != result.columns.len() {
            return Err(Error::with_message_and_status(
                format!(
                    "expected {} define buffers, got {}",
                    result.columns.len(),
                    buffers.len()
                ),
                Status::InvalidArguments,
            ));
        }
        let max_rows = buffers
            .iter()
            .map(DefineBuffer::capacity)
            .fold(max_rows, usize::min);
        let end = total.min(start + max_rows);
        for (offset, row) in result.rows[start..end].iter().enumerate() {
            for (buffer, value) in buffers.iter_mut().zip(row) {
                write_value(buffer, offset, value)?;
            }
        }
        self.cursor = Some(end);
        Ok(FetchStatus {
            rows: end - start + self.state.lock().surplus_rows,
            exhausted: end == total,
        })
    }

    fn row_count(&self) -> Result<u64> {
        let fetched = self.cursor.ok_or_else(Self::not_executed)?;
        Ok(self.result()?.affected_rows.unwrap_or(fetched as u64))
    }

    fn is_dml(&self) -> Result<bool> {
        Ok(self.result()?.affected_rows.is_some())
    }
}

fn conversion_error(value: &DummyValue, kind: DefineKind) -> Error {
    Error::native(
        Status::Fetch,
        "fetch",
        format!("ORA-01722: invalid number ({value:?} as {kind:?})"),
        1722,
    )
}

fn write_value(buffer: &mut DefineBuffer, row: usize, value: &DummyValue) -> Result<()> {
    let kind = buffer.kind;
    let bytes = match (kind, value) {
        (_, DummyValue::Null) => {
            buffer.indicators[row] = NULL_INDICATOR;
            buffer.lengths[row] = 0;
            return Ok(());
        }
        (DefineKind::Int64, DummyValue::Int(value)) => value.to_ne_bytes().to_vec(),
        (DefineKind::Int64, DummyValue::Text(value)) => value
            .trim()
            .parse::<i64>()
            .map_err(|_| conversion_error(&DummyValue::Text(value.clone()), kind))?
            .to_ne_bytes()
            .to_vec(),
        (DefineKind::Float64, DummyValue::Float(value)) => value.to_ne_bytes().to_vec(),
        (DefineKind::Float64, DummyValue::Int(value)) => (*value as f64).to_ne_bytes().to_vec(),
        (DefineKind::Float64, DummyValue::Text(value)) => value
            .trim()
            .parse::<f64>()
            .map_err(|_| conversion_error(&DummyValue::Text(value.clone()), kind))?
            .to_ne_bytes()
            .to_vec(),
        (DefineKind::Text, DummyValue::Int(value)) => value.to_string().into_bytes(),
        (DefineKind::Text, DummyValue::Float(value)) => value.to_string().into_bytes(),
        (DefineKind::Text, DummyValue::Bytes(value)) => hex::encode_upper(value).into_bytes(),
        (DefineKind::Text | DefineKind::Bytes, DummyValue::Text(value)) => {
            value.clone().into_bytes()
        }
        (DefineKind::Bytes, DummyValue::Bytes(value)) => value.clone(),
        (_, value) => return Err(conversion_error(value, kind)),
    };
    let copied = bytes.len().min(buffer.width);
    buffer.slot_mut(row)[..copied].copy_from_slice(&bytes[..copied]);
    let indicator = match bytes.len() {
        len if len <= buffer.width => 0,
        len => i16::try_from(len).unwrap_or(TRUNCATED_OVERFLOW_INDICATOR),
    };
    buffer.indicators[row] = indicator;
    buffer.lengths[row] = bytes.len() as u32;
    Ok(())
}
