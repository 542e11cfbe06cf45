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

//! Error, status and result types.

use std::fmt::Display;

use arrow_schema::ArrowError;

/// Status of an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    /// An unknown error occurred.
    Unknown,
    /// The operation is not implemented or supported.
    NotImplemented,
    /// A requested resource was not found.
    NotFound,
    /// The arguments are invalid, likely a programming error.
    /// For instance, they may be of the wrong format, or out of range.
    InvalidArguments,
    /// The preconditions for the operation are not met, likely a programming error.
    InvalidState,
    /// Invalid data was processed (not a programming error).
    InvalidData,
    /// An error internal to the connector occurred.
    Internal,
    /// An I/O error occurred.
    IO,
    /// Dialing or authenticating a remote session failed.
    ///
    /// Fatal to the acquire call, not to the pool.
    Connection,
    /// No pooled session became available before the deadline.
    ///
    /// Retryable by the caller.
    ResourceExhausted,
    /// The remote side rejected the query text.
    Prepare,
    /// The metadata-only execution of a query failed.
    Describe,
    /// A native failure while executing or fetching. Fatal to the scan.
    Fetch,
    /// A fetched value was outside its expected representation. Fatal to the scan.
    Decode,
}

/// A connector error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Error {
    /// The error message.
    pub message: String,
    /// The status of the operation.
    pub status: Status,
    /// A vendor-specific error code, if applicable (the `ORA-nnnnn` number).
    pub vendor_code: i32,
    /// Additional metadata.
    pub details: Option<Vec<(String, Vec<u8>)>>,
}

/// Result type wrapping [Error].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn with_message_and_status(message: impl Into<String>, status: Status) -> Self {
        Self {
            message: message.into(),
            status,
            vendor_code: 0,
            details: None,
        }
    }

    /// An error raised by the native layer while performing `operation`.
    ///
    /// The message keeps the remote system's own text after the operation name.
    pub fn native(
        status: Status,
        operation: impl Display,
        native_message: impl Display,
        vendor_code: i32,
    ) -> Self {
        Self {
            message: format!("{operation}: {native_message}"),
            status,
            vendor_code,
            details: None,
        }
    }

    /// Re-tag an error with a different status, keeping everything else.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Prefix the message with the operation that was attempted.
    pub fn context(mut self, operation: impl Display) -> Self {
        self.message = format!("{operation}: {}", self.message);
        self
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: {} (vendor_code: {})",
            self.status, self.message, self.vendor_code
        )
    }
}

impl std::error::Error for Error {}

impl From<ArrowError> for Error {
    fn from(value: ArrowError) -> Self {
        Self {
            message: value.to_string(),
            status: Status::Internal,
            vendor_code: 0,
            details: None,
        }
    }
}

impl From<Error> for ArrowError {
    fn from(value: Error) -> Self {
        ArrowError::ExternalError(Box::new(value))
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(value: std::str::Utf8Error) -> Self {
        Self {
            message: format!("Error while decoding UTF-8: {value}"),
            status: Status::Decode,
            vendor_code: 0,
            details: None,
        }
    }
}
