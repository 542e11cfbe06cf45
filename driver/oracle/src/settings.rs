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

//! Connector settings and their builder.

#[cfg(feature = "env")]
use std::{env, error::Error as StdError};
use std::{
    fmt,
    iter::{Chain, Flatten},
    time::Duration,
};

use orabridge_core::{
    error::{Error, Result, Status},
    options::{OptionSetting, OptionValue},
    Endpoint, Optionable,
};

use crate::duration::parse_duration;

/// Effective settings of an attachment or an ad-hoc query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub enable_pushdown: bool,
    pub prefetch_rows: u32,
    pub prefetch_memory: u32,
    pub array_size: usize,
    pub connection_cache: bool,
    pub connection_limit: usize,
    pub acquire_timeout: Duration,
    pub debug_show_queries: bool,
    pub lazy_schema_loading: bool,
    pub use_current_schema: bool,
    pub metadata_object_types: String,
    pub metadata_result_limit: usize,
    pub try_native_lobs: bool,
    pub lob_max_size: usize,
    pub vector_to_list: bool,
    pub enable_type_conversion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_pushdown: true,
            prefetch_rows: 200,
            prefetch_memory: 0,
            array_size: 256,
            connection_cache: true,
            connection_limit: 8,
            acquire_timeout: Duration::from_secs(10),
            debug_show_queries: false,
            lazy_schema_loading: true,
            use_current_schema: true,
            metadata_object_types: "TABLE,VIEW,SYNONYM,MATERIALIZED VIEW".into(),
            metadata_result_limit: 10_000,
            try_native_lobs: true,
            lob_max_size: 32 * 1024 * 1024,
            vector_to_list: true,
            enable_type_conversion: true,
        }
    }
}

// Values below one are raised to one.
fn at_least_one(value: i64) -> i64 {
    value.max(1)
}

// Non-positive values mean "no limit".
fn zero_if_negative(value: i64) -> i64 {
    value.max(0)
}

impl Settings {
    /// The configured object types, trimmed and upper-cased.
    pub fn object_types(&self) -> Vec<String> {
        self.metadata_object_types
            .split(',')
            .map(|kind| kind.trim().to_ascii_uppercase())
            .filter(|kind| !kind.is_empty())
            .collect()
    }

    /// Apply string-keyed options, ignoring keys that are not settings.
    ///
    /// Values of recognized keys that fail to parse are still errors.
    pub fn apply_options<K: AsRef<str>>(
        &mut self,
        options: impl IntoIterator<Item = (K, OptionValue)>,
    ) -> Result<()> {
        for (key, value) in options {
            match OptionSetting::from(key.as_ref()) {
                OptionSetting::Other(key) => {
                    tracing::debug!(%key, "ignoring unrecognized option");
                }
                key => self.set_option(key, value)?,
            }
        }
        Ok(())
    }
}

impl Optionable for Settings {
    type Option = OptionSetting;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        let clamp = |value: i64| u32::try_from(value).unwrap_or(u32::MAX);
        match key {
            OptionSetting::EnablePushdown => self.enable_pushdown = value.as_bool(&key)?,
            OptionSetting::PrefetchRows => {
                self.prefetch_rows = clamp(at_least_one(value.as_int(&key)?))
            }
            OptionSetting::PrefetchMemory => {
                self.prefetch_memory = clamp(zero_if_negative(value.as_int(&key)?))
            }
            OptionSetting::ArraySize => {
                self.array_size = at_least_one(value.as_int(&key)?) as usize
            }
            OptionSetting::ConnectionCache => self.connection_cache = value.as_bool(&key)?,
            OptionSetting::ConnectionLimit => {
                self.connection_limit = at_least_one(value.as_int(&key)?) as usize
            }
            OptionSetting::AcquireTimeout => {
                self.acquire_timeout = match value {
                    OptionValue::Int(millis) => Duration::from_millis(zero_if_negative(millis) as u64),
                    other => parse_duration(&other.as_string(&key)?)?,
                }
            }
            OptionSetting::DebugShowQueries => self.debug_show_queries = value.as_bool(&key)?,
            OptionSetting::LazySchemaLoading => self.lazy_schema_loading = value.as_bool(&key)?,
            OptionSetting::UseCurrentSchema => self.use_current_schema = value.as_bool(&key)?,
            OptionSetting::MetadataObjectTypes => {
                self.metadata_object_types = value.as_string(&key)?
            }
            OptionSetting::MetadataResultLimit => {
                self.metadata_result_limit = zero_if_negative(value.as_int(&key)?) as usize
            }
            OptionSetting::TryNativeLobs => self.try_native_lobs = value.as_bool(&key)?,
            OptionSetting::LobMaxSize => {
                self.lob_max_size = at_least_one(value.as_int(&key)?) as usize
            }
            OptionSetting::VectorToList => self.vector_to_list = value.as_bool(&key)?,
            OptionSetting::EnableTypeConversion => {
                self.enable_type_conversion = value.as_bool(&key)?
            }
            OptionSetting::Other(key) => {
                return Err(Error::with_message_and_status(
                    format!("Unrecognized option: {key}"),
                    Status::NotFound,
                ))
            }
        }
        Ok(())
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        let value = match key {
            OptionSetting::EnablePushdown => self.enable_pushdown.to_string(),
            OptionSetting::ConnectionCache => self.connection_cache.to_string(),
            OptionSetting::DebugShowQueries => self.debug_show_queries.to_string(),
            OptionSetting::LazySchemaLoading => self.lazy_schema_loading.to_string(),
            OptionSetting::UseCurrentSchema => self.use_current_schema.to_string(),
            OptionSetting::MetadataObjectTypes => self.metadata_object_types.clone(),
            OptionSetting::TryNativeLobs => self.try_native_lobs.to_string(),
            OptionSetting::VectorToList => self.vector_to_list.to_string(),
            OptionSetting::EnableTypeConversion => self.enable_type_conversion.to_string(),
            OptionSetting::AcquireTimeout => format!("{}ms", self.acquire_timeout.as_millis()),
            OptionSetting::Other(key) => {
                return Err(Error::with_message_and_status(
                    format!("Unrecognized option: {key}"),
                    Status::NotFound,
                ))
            }
            key => self.get_option_int(key)?.to_string(),
        };
        Ok(value)
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        let value = match key {
            OptionSetting::PrefetchRows => self.prefetch_rows as usize,
            OptionSetting::PrefetchMemory => self.prefetch_memory as usize,
            OptionSetting::ArraySize => self.array_size,
            OptionSetting::ConnectionLimit => self.connection_limit,
            OptionSetting::MetadataResultLimit => self.metadata_result_limit,
            OptionSetting::LobMaxSize => self.lob_max_size,
            OptionSetting::AcquireTimeout => self.acquire_timeout.as_millis() as usize,
            key => {
                return Err(Error::with_message_and_status(
                    format!("Incorrect value for option {}: not an integer", key.as_ref()),
                    Status::InvalidData,
                ))
            }
        };
        Ok(value as i64)
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        self.get_option_int(key).map(|value| value as f64)
    }
}

/// An iterator over the builder options.
pub struct BuilderIter<const COUNT: usize>(
    #[allow(clippy::type_complexity)]
    Chain<
        Flatten<<[Option<(OptionSetting, OptionValue)>; COUNT] as IntoIterator>::IntoIter>,
        <Vec<(OptionSetting, OptionValue)> as IntoIterator>::IntoIter,
    >,
);

impl<const COUNT: usize> Iterator for BuilderIter<COUNT> {
    type Item = (OptionSetting, OptionValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// A builder for [`Settings`].
///
/// Unset fields keep their defaults when the builder is turned into
/// [`Settings`] with [`Builder::build`].
#[derive(Clone, Default)]
#[non_exhaustive]
pub struct Builder {
    /// The remote endpoint ([`Self::CONNECTION_ENV`]).
    pub endpoint: Option<Endpoint>,

    /// See [`OptionSetting::EnablePushdown`].
    pub enable_pushdown: Option<bool>,

    /// See [`OptionSetting::PrefetchRows`].
    pub prefetch_rows: Option<i64>,

    /// See [`OptionSetting::PrefetchMemory`].
    pub prefetch_memory: Option<i64>,

    /// See [`OptionSetting::ArraySize`].
    pub array_size: Option<i64>,

    /// See [`OptionSetting::ConnectionCache`].
    pub connection_cache: Option<bool>,

    /// See [`OptionSetting::ConnectionLimit`].
    pub connection_limit: Option<i64>,

    /// See [`OptionSetting::AcquireTimeout`].
    pub acquire_timeout: Option<Duration>,

    /// See [`OptionSetting::DebugShowQueries`].
    pub debug_show_queries: Option<bool>,

    /// See [`OptionSetting::LazySchemaLoading`].
    pub lazy_schema_loading: Option<bool>,

    /// See [`OptionSetting::UseCurrentSchema`].
    pub use_current_schema: Option<bool>,

    /// See [`OptionSetting::MetadataObjectTypes`].
    pub metadata_object_types: Option<String>,

    /// See [`OptionSetting::MetadataResultLimit`].
    pub metadata_result_limit: Option<i64>,

    /// See [`OptionSetting::TryNativeLobs`].
    pub try_native_lobs: Option<bool>,

    /// See [`OptionSetting::LobMaxSize`].
    pub lob_max_size: Option<i64>,

    /// See [`OptionSetting::VectorToList`].
    pub vector_to_list: Option<bool>,

    /// See [`OptionSetting::EnableTypeConversion`].
    pub enable_type_conversion: Option<bool>,

    /// Other options.
    pub other: Vec<(OptionSetting, OptionValue)>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("endpoint", &self.endpoint)
            .field("enable_pushdown", &self.enable_pushdown)
            .field("prefetch_rows", &self.prefetch_rows)
            .field("prefetch_memory", &self.prefetch_memory)
            .field("array_size", &self.array_size)
            .field("connection_cache", &self.connection_cache)
            .field("connection_limit", &self.connection_limit)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("debug_show_queries", &self.debug_show_queries)
            .field("lazy_schema_loading", &self.lazy_schema_loading)
            .field("use_current_schema", &self.use_current_schema)
            .field("metadata_object_types", &self.metadata_object_types)
            .field("metadata_result_limit", &self.metadata_result_limit)
            .field("try_native_lobs", &self.try_native_lobs)
            .field("lob_max_size", &self.lob_max_size)
            .field("vector_to_list", &self.vector_to_list)
            .field("enable_type_conversion", &self.enable_type_conversion)
            .field("...", &self.other)
            .finish()
    }
}

#[cfg(feature = "env")]
fn env_parse<T>(key: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
    env::var(key).ok().as_deref().map(parse).transpose()
}

#[cfg(feature = "env")]
fn env_parse_map_err<T, E: StdError>(
    key: &str,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> Result<Option<T>> {
    env::var(key)
        .ok()
        .as_deref()
        .map(parse)
        .transpose()
        .map_err(|err| {
            Error::with_message_and_status(format!("{key}: {err}"), Status::InvalidArguments)
        })
}

#[cfg(feature = "env")]
fn parse_bool(value: &str) -> Result<bool> {
    OptionValue::from(value).as_bool(&"boolean")
}

#[cfg(feature = "env")]
impl Builder {
    /// See [`Self::endpoint`].
    pub const CONNECTION_ENV: &str = "ORABRIDGE_CONNECTION";

    /// See [`Self::enable_pushdown`].
    pub const ENABLE_PUSHDOWN_ENV: &str = "ORABRIDGE_ENABLE_PUSHDOWN";

    /// See [`Self::prefetch_rows`].
    pub const PREFETCH_ROWS_ENV: &str = "ORABRIDGE_PREFETCH_ROWS";

    /// See [`Self::prefetch_memory`].
    pub const PREFETCH_MEMORY_ENV: &str = "ORABRIDGE_PREFETCH_MEMORY";

    /// See [`Self::array_size`].
    pub const ARRAY_SIZE_ENV: &str = "ORABRIDGE_ARRAY_SIZE";

    /// See [`Self::connection_cache`].
    pub const CONNECTION_CACHE_ENV: &str = "ORABRIDGE_CONNECTION_CACHE";

    /// See [`Self::connection_limit`].
    pub const CONNECTION_LIMIT_ENV: &str = "ORABRIDGE_CONNECTION_LIMIT";

    /// See [`Self::acquire_timeout`].
    pub const ACQUIRE_TIMEOUT_ENV: &str = "ORABRIDGE_ACQUIRE_TIMEOUT";

    /// See [`Self::debug_show_queries`].
    pub const DEBUG_SHOW_QUERIES_ENV: &str = "ORABRIDGE_DEBUG_SHOW_QUERIES";

    /// See [`Self::lazy_schema_loading`].
    pub const LAZY_SCHEMA_LOADING_ENV: &str = "ORABRIDGE_LAZY_SCHEMA_LOADING";

    /// See [`Self::use_current_schema`].
    pub const USE_CURRENT_SCHEMA_ENV: &str = "ORABRIDGE_USE_CURRENT_SCHEMA";

    /// See [`Self::metadata_object_types`].
    pub const METADATA_OBJECT_TYPES_ENV: &str = "ORABRIDGE_METADATA_OBJECT_TYPES";

    /// See [`Self::metadata_result_limit`].
    pub const METADATA_RESULT_LIMIT_ENV: &str = "ORABRIDGE_METADATA_RESULT_LIMIT";

    /// See [`Self::try_native_lobs`].
    pub const TRY_NATIVE_LOBS_ENV: &str = "ORABRIDGE_TRY_NATIVE_LOBS";

    /// See [`Self::lob_max_size`].
    pub const LOB_MAX_SIZE_ENV: &str = "ORABRIDGE_LOB_MAX_SIZE";

    /// See [`Self::vector_to_list`].
    pub const VECTOR_TO_LIST_ENV: &str = "ORABRIDGE_VECTOR_TO_LIST";

    /// See [`Self::enable_type_conversion`].
    pub const ENABLE_TYPE_CONVERSION_ENV: &str = "ORABRIDGE_ENABLE_TYPE_CONVERSION";

    /// Construct a builder, setting values based on values of the
    /// configuration environment variables.
    ///
    /// # Error
    ///
    /// Returns an error when environment variables are set but their values
    /// fail to parse.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: env_parse(Self::CONNECTION_ENV, Endpoint::parse)?,
            enable_pushdown: env_parse(Self::ENABLE_PUSHDOWN_ENV, parse_bool)?,
            prefetch_rows: env_parse_map_err(Self::PREFETCH_ROWS_ENV, str::parse)?,
            prefetch_memory: env_parse_map_err(Self::PREFETCH_MEMORY_ENV, str::parse)?,
            array_size: env_parse_map_err(Self::ARRAY_SIZE_ENV, str::parse)?,
            connection_cache: env_parse(Self::CONNECTION_CACHE_ENV, parse_bool)?,
            connection_limit: env_parse_map_err(Self::CONNECTION_LIMIT_ENV, str::parse)?,
            acquire_timeout: env_parse(Self::ACQUIRE_TIMEOUT_ENV, parse_duration)?,
            debug_show_queries: env_parse(Self::DEBUG_SHOW_QUERIES_ENV, parse_bool)?,
            lazy_schema_loading: env_parse(Self::LAZY_SCHEMA_LOADING_ENV, parse_bool)?,
            use_current_schema: env_parse(Self::USE_CURRENT_SCHEMA_ENV, parse_bool)?,
            metadata_object_types: env::var(Self::METADATA_OBJECT_TYPES_ENV).ok(),
            metadata_result_limit: env_parse_map_err(
                Self::METADATA_RESULT_LIMIT_ENV,
                str::parse,
            )?,
            try_native_lobs: env_parse(Self::TRY_NATIVE_LOBS_ENV, parse_bool)?,
            lob_max_size: env_parse_map_err(Self::LOB_MAX_SIZE_ENV, str::parse)?,
            vector_to_list: env_parse(Self::VECTOR_TO_LIST_ENV, parse_bool)?,
            enable_type_conversion: env_parse(Self::ENABLE_TYPE_CONVERSION_ENV, parse_bool)?,
            ..Default::default()
        })
    }
}

impl Builder {
    const COUNT: usize = 16;

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_parse_endpoint(self, endpoint: impl AsRef<str>) -> Result<Self> {
        Endpoint::parse(endpoint.as_ref()).map(|endpoint| self.with_endpoint(endpoint))
    }

    pub fn with_enable_pushdown(mut self, enable_pushdown: bool) -> Self {
        self.enable_pushdown = Some(enable_pushdown);
        self
    }

    pub fn with_prefetch_rows(mut self, prefetch_rows: i64) -> Self {
        self.prefetch_rows = Some(prefetch_rows);
        self
    }

    pub fn with_prefetch_memory(mut self, prefetch_memory: i64) -> Self {
        self.prefetch_memory = Some(prefetch_memory);
        self
    }

    pub fn with_array_size(mut self, array_size: i64) -> Self {
        self.array_size = Some(array_size);
        self
    }

    pub fn with_connection_cache(mut self, connection_cache: bool) -> Self {
        self.connection_cache = Some(connection_cache);
        self
    }

    pub fn with_connection_limit(mut self, connection_limit: i64) -> Self {
        self.connection_limit = Some(connection_limit);
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = Some(acquire_timeout);
        self
    }

    pub fn with_parse_acquire_timeout(self, acquire_timeout: impl AsRef<str>) -> Result<Self> {
        parse_duration(acquire_timeout.as_ref())
            .map(|acquire_timeout| self.with_acquire_timeout(acquire_timeout))
    }

    pub fn with_debug_show_queries(mut self, debug_show_queries: bool) -> Self {
        self.debug_show_queries = Some(debug_show_queries);
        self
    }

    pub fn with_lazy_schema_loading(mut self, lazy_schema_loading: bool) -> Self {
        self.lazy_schema_loading = Some(lazy_schema_loading);
        self
    }

    pub fn with_use_current_schema(mut self, use_current_schema: bool) -> Self {
        self.use_current_schema = Some(use_current_schema);
        self
    }

    pub fn with_metadata_object_types(mut self, metadata_object_types: impl Into<String>) -> Self {
        self.metadata_object_types = Some(metadata_object_types.into());
        self
    }

    pub fn with_metadata_result_limit(mut self, metadata_result_limit: i64) -> Self {
        self.metadata_result_limit = Some(metadata_result_limit);
        self
    }

    pub fn with_try_native_lobs(mut self, try_native_lobs: bool) -> Self {
        self.try_native_lobs = Some(try_native_lobs);
        self
    }

    pub fn with_lob_max_size(mut self, lob_max_size: i64) -> Self {
        self.lob_max_size = Some(lob_max_size);
        self
    }

    pub fn with_vector_to_list(mut self, vector_to_list: bool) -> Self {
        self.vector_to_list = Some(vector_to_list);
        self
    }

    pub fn with_enable_type_conversion(mut self, enable_type_conversion: bool) -> Self {
        self.enable_type_conversion = Some(enable_type_conversion);
        self
    }

    /// Settings with every configured option applied over the defaults.
    pub fn build(self) -> Result<Settings> {
        let mut settings = Settings::default();
        for (key, value) in self {
            settings.set_option(key, value)?;
        }
        Ok(settings)
    }
}

impl IntoIterator for Builder {
    type Item = (OptionSetting, OptionValue);
    type IntoIter = BuilderIter<{ Self::COUNT }>;

    fn into_iter(self) -> Self::IntoIter {
        let fixed = [
            self.enable_pushdown
                .map(|value| (OptionSetting::EnablePushdown, value.into())),
            self.prefetch_rows
                .map(|value| (OptionSetting::PrefetchRows, value.into())),
            self.prefetch_memory
                .map(|value| (OptionSetting::PrefetchMemory, value.into())),
            self.array_size
                .map(|value| (OptionSetting::ArraySize, value.into())),
            self.connection_cache
                .map(|value| (OptionSetting::ConnectionCache, value.into())),
            self.connection_limit
                .map(|value| (OptionSetting::ConnectionLimit, value.into())),
            self.acquire_timeout.map(|value| {
                (
                    OptionSetting::AcquireTimeout,
                    OptionValue::Int(i64::try_from(value.as_millis()).unwrap_or(i64::MAX)),
                )
            }),
            self.debug_show_queries
                .map(|value| (OptionSetting::DebugShowQueries, value.into())),
            self.lazy_schema_loading
                .map(|value| (OptionSetting::LazySchemaLoading, value.into())),
            self.use_current_schema
                .map(|value| (OptionSetting::UseCurrentSchema, value.into())),
            self.metadata_object_types
                .map(|value| (OptionSetting::MetadataObjectTypes, value.into())),
            self.metadata_result_limit
                .map(|value| (OptionSetting::MetadataResultLimit, value.into())),
            self.try_native_lobs
                .map(|value| (OptionSetting::TryNativeLobs, value.into())),
            self.lob_max_size
                .map(|value| (OptionSetting::LobMaxSize, value.into())),
            self.vector_to_list
                .map(|value| (OptionSetting::VectorToList, value.into())),
            self.enable_type_conversion
                .map(|value| (OptionSetting::EnableTypeConversion, value.into())),
        ];
        BuilderIter(fixed.into_iter().flatten().chain(self.other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.enable_pushdown);
        assert_eq!(settings.prefetch_rows, 200);
        assert_eq!(settings.array_size, 256);
        assert_eq!(settings.connection_limit, 8);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(10));
        assert_eq!(settings.metadata_result_limit, 10_000);
        assert_eq!(settings.lob_max_size, 33_554_432);
        assert_eq!(
            settings.object_types(),
            vec!["TABLE", "VIEW", "SYNONYM", "MATERIALIZED VIEW"]
        );
    }

    #[test]
    fn clamping() {
        let mut settings = Settings::default();
        settings
            .set_option(OptionSetting::PrefetchRows, 0i64.into())
            .unwrap();
        settings
            .set_option(OptionSetting::ArraySize, (-3i64).into())
            .unwrap();
        settings
            .set_option(OptionSetting::ConnectionLimit, 0i64.into())
            .unwrap();
        settings
            .set_option(OptionSetting::PrefetchMemory, (-1i64).into())
            .unwrap();
        settings
            .set_option(OptionSetting::MetadataResultLimit, (-10i64).into())
            .unwrap();
        assert_eq!(settings.prefetch_rows, 1);
        assert_eq!(settings.array_size, 1);
        assert_eq!(settings.connection_limit, 1);
        assert_eq!(settings.prefetch_memory, 0);
        assert_eq!(settings.metadata_result_limit, 0);
    }

    #[test]
    fn options() {
        let mut settings = Settings::default();
        settings
            .set_option(OptionSetting::AcquireTimeout, "1m".into())
            .unwrap();
        assert_eq!(settings.acquire_timeout, Duration::from_secs(60));
        assert_eq!(
            settings.get_option_string(OptionSetting::AcquireTimeout),
            Ok("60000ms".to_owned())
        );
        assert_eq!(
            settings.get_option_int(OptionSetting::ArraySize),
            Ok(256)
        );
        assert!(settings
            .get_option_int(OptionSetting::EnablePushdown)
            .is_err());

        let error = settings
            .set_option(OptionSetting::Other("bogus".into()), "1".into())
            .unwrap_err();
        assert_eq!(error.status, Status::NotFound);
    }

    #[test]
    fn apply_options_ignores_unknown_keys() {
        let mut settings = Settings::default();
        settings
            .apply_options([
                ("enable_pushdown", OptionValue::from("false")),
                ("secret", OptionValue::from("my_secret")),
                ("array_size", OptionValue::from(1024i64)),
            ])
            .unwrap();
        assert!(!settings.enable_pushdown);
        assert_eq!(settings.array_size, 1024);

        assert!(settings
            .apply_options([("array_size", OptionValue::from("lots"))])
            .is_err());
    }

    #[test]
    fn builder() {
        let builder = Builder::default()
            .with_enable_pushdown(false)
            .with_connection_limit(2)
            .with_parse_acquire_timeout("250ms")
            .unwrap()
            .with_metadata_object_types("table");
        assert_eq!(builder.clone().into_iter().count(), 4);
        let settings = builder.build().unwrap();
        assert!(!settings.enable_pushdown);
        assert_eq!(settings.connection_limit, 2);
        assert_eq!(settings.acquire_timeout, Duration::from_millis(250));
        assert_eq!(settings.object_types(), vec!["TABLE"]);
    }

    #[test]
    #[cfg(feature = "env")]
    fn from_env() {
        temp_env::with_vars(
            [
                (Builder::CONNECTION_ENV, Some("scott/tiger@db")),
                (Builder::ARRAY_SIZE_ENV, Some("64")),
                (Builder::TRY_NATIVE_LOBS_ENV, Some("off")),
            ],
            || {
                let builder = Builder::from_env().unwrap();
                assert_eq!(
                    builder.endpoint,
                    Some(Endpoint::new("scott", "tiger", "db"))
                );
                let settings = builder.build().unwrap();
                assert_eq!(settings.array_size, 64);
                assert!(!settings.try_native_lobs);
            },
        );
    }

    #[test]
    #[cfg(feature = "env")]
    fn from_env_parse_error() {
        temp_env::with_var(Builder::CONNECTION_LIMIT_ENV, Some("many"), || {
            let error = Builder::from_env().unwrap_err();
            assert_eq!(error.status, Status::InvalidArguments);
            assert!(error.message.starts_with(Builder::CONNECTION_LIMIT_ENV));
        });
        temp_env::with_var(Builder::ACQUIRE_TIMEOUT_ENV, Some("forever"), || {
            assert!(Builder::from_env().is_err());
        });
        temp_env::with_var(Builder::CONNECTION_ENV, Some("scott@db"), || {
            assert!(Builder::from_env().is_err());
        });
    }
}
