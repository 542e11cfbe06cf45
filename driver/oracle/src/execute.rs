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

//! Statements run for their effect rather than their rows.

use std::fmt;

use orabridge_core::{
    error::{Result, Status},
    Driver, Endpoint, Session, Statement,
};

use crate::{pool::ConnectionPool, scan::log_query, settings::Settings};

/// Outcome of [execute].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub rows_affected: u64,
    /// The statement was an `INSERT`, `UPDATE`, `DELETE` or `MERGE`.
    pub dml: bool,
}

impl fmt::Display for ExecuteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows_affected > 0 || self.dml {
            write!(
                f,
                "Statement executed successfully ({} rows affected)",
                self.rows_affected
            )
        } else {
            f.write_str("Statement executed successfully")
        }
    }
}

/// Run `sql` once on a pooled session and commit on success.
///
/// # Errors
///
/// - [`Status::ResourceExhausted`] or [`Status::Connection`] when no session
///   could be acquired.
/// - [`Status::Prepare`] when the remote side rejects the text.
/// - [`Status::Fetch`] when execution or the commit fails.
pub fn execute<D: Driver>(
    pool: &ConnectionPool<D>,
    endpoint: &Endpoint,
    settings: &Settings,
    sql: &str,
) -> Result<ExecuteSummary> {
    let mut session = pool.acquire(endpoint, settings)?;
    let mut statement = session
        .new_statement()
        .map_err(|error| error.with_status(Status::Prepare))?;
    log_query(settings, "prepare", sql);
    statement
        .prepare(sql)
        .map_err(|error| error.with_status(Status::Prepare))?;
    log_query(settings, "execute", sql);
    statement
        .execute()
        .map_err(|error| error.with_status(Status::Fetch))?;
    let summary = ExecuteSummary {
        rows_affected: statement
            .row_count()
            .map_err(|error| error.with_status(Status::Fetch))?,
        dml: statement
            .is_dml()
            .map_err(|error| error.with_status(Status::Fetch))?,
    };
    drop(statement);
    session
        .commit()
        .map_err(|error| error.with_status(Status::Fetch))?;
    tracing::debug!(%endpoint, rows_affected = summary.rows_affected, "executed statement");
    Ok(summary)
}
