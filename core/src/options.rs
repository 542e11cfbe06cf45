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

//! Various option and configuration types.

use crate::{
    constants,
    error::{Error, Result, Status},
};

/// Option value.
///
/// Can be created with various implementations of [From].
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Bytes(Vec<u8>),
    Int(i64),
    Double(f64),
}

impl OptionValue {
    /// Gets the data type of the option's value.
    pub fn get_type(&self) -> &str {
        match self {
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Int(_) => "Int",
            Self::Double(_) => "Double",
        }
    }

    fn invalid(&self, key: &impl AsRef<str>, expected: &str) -> Error {
        Error::with_message_and_status(
            format!(
                "Incorrect value for option {}: expected {expected}, got {self:?}",
                key.as_ref()
            ),
            Status::InvalidArguments,
        )
    }

    /// Interpret the value as a boolean.
    ///
    /// Strings accept `true/false`, `1/0`, `yes/no` and `on/off`, ignoring case.
    pub fn as_bool(&self, key: &impl AsRef<str>) -> Result<bool> {
        match self {
            Self::Int(value) => Ok(*value != 0),
            Self::String(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(self.invalid(key, "a boolean")),
            },
            _ => Err(self.invalid(key, "a boolean")),
        }
    }

    /// Interpret the value as an integer. Strings are parsed.
    pub fn as_int(&self, key: &impl AsRef<str>) -> Result<i64> {
        match self {
            Self::Int(value) => Ok(*value),
            Self::Double(value) if value.fract() == 0.0 => Ok(*value as i64),
            Self::String(value) => value
                .trim()
                .parse()
                .map_err(|_| self.invalid(key, "an integer")),
            _ => Err(self.invalid(key, "an integer")),
        }
    }

    /// Interpret the value as a string. Numbers are rendered.
    pub fn as_string(&self, key: &impl AsRef<str>) -> Result<String> {
        match self {
            Self::String(value) => Ok(value.clone()),
            Self::Int(value) => Ok(value.to_string()),
            Self::Double(value) => Ok(value.to_string()),
            Self::Bytes(_) => Err(self.invalid(key, "a string")),
        }
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for OptionValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.into())
    }
}

/// Connector setting key.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub enum OptionSetting {
    /// Push filters and projections into the remote query.
    EnablePushdown,
    /// Rows prefetched by the native layer per round-trip.
    PrefetchRows,
    /// Memory prefetched by the native layer per round-trip, 0 for no limit.
    PrefetchMemory,
    /// Rows requested per fetch call.
    ArraySize,
    /// Pool sessions instead of opening a standalone session per use.
    ConnectionCache,
    /// Pool capacity per endpoint.
    ConnectionLimit,
    /// How long an acquire waits for a pooled session.
    AcquireTimeout,
    /// Log every remote SQL text at info level.
    DebugShowQueries,
    /// Only list the current schema by default.
    LazySchemaLoading,
    /// Detect and use the session's current schema.
    UseCurrentSchema,
    /// Comma separated object types listed per schema.
    MetadataObjectTypes,
    /// Cap on the number of objects listed per schema, 0 for no cap.
    MetadataResultLimit,
    /// Fetch large objects natively instead of converting them remotely.
    TryNativeLobs,
    /// Largest large-object value fetched, in bytes.
    LobMaxSize,
    /// Decode vectors into lists of floats.
    VectorToList,
    /// Convert spatial, vector, JSON and XML columns on the remote side.
    EnableTypeConversion,
    /// Unrecognized key.
    Other(String),
}

impl AsRef<str> for OptionSetting {
    fn as_ref(&self) -> &str {
        match self {
            Self::EnablePushdown => constants::OPTION_ENABLE_PUSHDOWN,
            Self::PrefetchRows => constants::OPTION_PREFETCH_ROWS,
            Self::PrefetchMemory => constants::OPTION_PREFETCH_MEMORY,
            Self::ArraySize => constants::OPTION_ARRAY_SIZE,
            Self::ConnectionCache => constants::OPTION_CONNECTION_CACHE,
            Self::ConnectionLimit => constants::OPTION_CONNECTION_LIMIT,
            Self::AcquireTimeout => constants::OPTION_ACQUIRE_TIMEOUT,
            Self::DebugShowQueries => constants::OPTION_DEBUG_SHOW_QUERIES,
            Self::LazySchemaLoading => constants::OPTION_LAZY_SCHEMA_LOADING,
            Self::UseCurrentSchema => constants::OPTION_USE_CURRENT_SCHEMA,
            Self::MetadataObjectTypes => constants::OPTION_METADATA_OBJECT_TYPES,
            Self::MetadataResultLimit => constants::OPTION_METADATA_RESULT_LIMIT,
            Self::TryNativeLobs => constants::OPTION_TRY_NATIVE_LOBS,
            Self::LobMaxSize => constants::OPTION_LOB_MAX_SIZE,
            Self::VectorToList => constants::OPTION_VECTOR_TO_LIST,
            Self::EnableTypeConversion => constants::OPTION_ENABLE_TYPE_CONVERSION,
            Self::Other(key) => key,
        }
    }
}

impl From<&str> for OptionSetting {
    fn from(value: &str) -> Self {
        match value {
            constants::OPTION_ENABLE_PUSHDOWN => Self::EnablePushdown,
            constants::OPTION_PREFETCH_ROWS => Self::PrefetchRows,
            constants::OPTION_PREFETCH_MEMORY => Self::PrefetchMemory,
            constants::OPTION_ARRAY_SIZE => Self::ArraySize,
            constants::OPTION_CONNECTION_CACHE => Self::ConnectionCache,
            constants::OPTION_CONNECTION_LIMIT => Self::ConnectionLimit,
            constants::OPTION_ACQUIRE_TIMEOUT => Self::AcquireTimeout,
            constants::OPTION_DEBUG_SHOW_QUERIES => Self::DebugShowQueries,
            constants::OPTION_LAZY_SCHEMA_LOADING => Self::LazySchemaLoading,
            constants::OPTION_USE_CURRENT_SCHEMA => Self::UseCurrentSchema,
            constants::OPTION_METADATA_OBJECT_TYPES => Self::MetadataObjectTypes,
            constants::OPTION_METADATA_RESULT_LIMIT => Self::MetadataResultLimit,
            constants::OPTION_TRY_NATIVE_LOBS => Self::TryNativeLobs,
            constants::OPTION_LOB_MAX_SIZE => Self::LobMaxSize,
            constants::OPTION_VECTOR_TO_LIST => Self::VectorToList,
            constants::OPTION_ENABLE_TYPE_CONVERSION => Self::EnableTypeConversion,
            key => Self::Other(key.into()),
        }
    }
}
