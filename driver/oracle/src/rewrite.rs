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

//! Predicate and projection pushdown.
//!
//! Host predicates arrive as [`Expr`] trees over the bound column list. Those
//! of the shape `column <op> constant` or `column IS NULL` are rendered into
//! remote SQL; everything else is handed back for local evaluation.

use chrono::{DateTime, NaiveDate};

use crate::classify::{quote_identifier, ColumnPlan, TypeCategory};

/// A comparison operator that can be shipped to the remote side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    /// The operator with its operands swapped: `c < a` is `a > c`.
    pub fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// A constant in a host predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
    /// Microseconds since the Unix epoch.
    TimestampMicros(i64),
}

impl Literal {
    /// Remote SQL for this constant, if it has a faithful one.
    pub fn to_sql(&self) -> Option<String> {
        match self {
            // Comparisons with NULL are never true, and the remote side has no
            // boolean column type to compare against.
            Self::Null | Self::Boolean(_) => None,
            Self::Int64(value) => Some(value.to_string()),
            Self::Float64(value) if value.is_finite() => Some(format!("{value:?}")),
            Self::Float64(_) => None,
            Self::Utf8(value) => Some(quote_literal(value)),
            Self::Date32(days) => {
                let date = NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS)?)?;
                Some(format!("DATE '{}'", date.format("%Y-%m-%d")))
            }
            Self::TimestampMicros(micros) => {
                let timestamp = DateTime::from_timestamp_micros(*micros)?.naive_utc();
                Some(format!(
                    "TIMESTAMP '{}'",
                    timestamp.format("%Y-%m-%d %H:%M:%S%.6f")
                ))
            }
        }
    }
}

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS: i32 = 719_163;

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A host predicate over the bound columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Index into the bound column list.
    Column(usize),
    Literal(Literal),
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// Any other scalar function call.
    Function { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn column(index: usize) -> Self {
        Self::Column(index)
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::Literal(value.into())
    }

    pub fn compare(op: ComparisonOp, left: Expr, right: Expr) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_null(expr: Expr) -> Self {
        Self::IsNull(Box::new(expr))
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            name: name.into(),
            args,
        }
    }

    /// Remote SQL for this predicate against `columns`, or `None` when it
    /// cannot be shipped and has to be evaluated locally.
    pub fn to_remote_sql(&self, columns: &[ColumnPlan]) -> Option<String> {
        match self {
            Self::Comparison { op, left, right } => {
                let (index, op, literal) = match (left.as_ref(), right.as_ref()) {
                    (Self::Column(index), Self::Literal(literal)) => (*index, *op, literal),
                    (Self::Literal(literal), Self::Column(index)) => (*index, op.flip(), literal),
                    _ => return None,
                };
                let column = columns.get(index)?;
                if !comparable(column) {
                    return None;
                }
                Some(format!(
                    "{} {} {}",
                    quote_identifier(&column.name),
                    op.as_sql(),
                    literal.to_sql()?
                ))
            }
            Self::IsNull(inner) => match inner.as_ref() {
                Self::Column(index) => {
                    let column = columns.get(*index)?;
                    Some(format!("{} IS NULL", quote_identifier(&column.name)))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Only columns fetched as-is and compared by value on the remote side can
/// carry a shipped comparison.
fn comparable(column: &ColumnPlan) -> bool {
    column.conversion.is_none()
        && matches!(
            column.category,
            TypeCategory::PlainText | TypeCategory::Numeric | TypeCategory::Temporal
        )
}

/// Quote a string constant, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Split `predicates` into rendered remote clauses and the predicates that
/// must still be evaluated locally, preserving order within each.
pub fn partition_predicates(
    predicates: Vec<Expr>,
    columns: &[ColumnPlan],
) -> (Vec<String>, Vec<Expr>) {
    let mut pushed = Vec::new();
    let mut remaining = Vec::new();
    for predicate in predicates {
        match predicate.to_remote_sql(columns) {
            Some(clause) => pushed.push(clause),
            None => remaining.push(predicate),
        }
    }
    (pushed, remaining)
}

/// Wrap `base` so that it returns `columns` filtered by `clauses`.
///
/// With `columns` unset every base column is returned as is.
pub fn build_query(base: &str, columns: Option<&[ColumnPlan]>, clauses: &[String]) -> String {
    if columns.is_none() && clauses.is_empty() {
        return base.to_owned();
    }
    let select = match columns {
        Some(columns) if !columns.is_empty() => columns
            .iter()
            .map(ColumnPlan::select_item)
            .collect::<Vec<_>>()
            .join(", "),
        // A scan needing no column still has to count rows.
        Some(_) => "1".to_owned(),
        None => "*".to_owned(),
    };
    let mut query = format!("SELECT {select} FROM ({base})");
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    query
}
