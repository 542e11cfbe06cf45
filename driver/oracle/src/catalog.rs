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

//! Per-attachment metadata caches.
//!
//! A [`CatalogState`] answers schema, table and object discovery for one
//! attached endpoint. Every answer is cached; a miss issues one metadata query
//! over the state's own session. All caches and the session sit behind a
//! single lock, so metadata calls on one attachment are serialized.

use std::{collections::HashMap, fmt, sync::Arc};

use arrow_schema::{Schema, SchemaRef};
use parking_lot::Mutex;

use orabridge_core::{
    error::{Error, Result, Status},
    options::OptionValue,
    sync::{ColumnDescription, DefineBuffer, DefineKind},
    Driver, Endpoint, Session, Statement,
};

use crate::{
    classify::{quote_identifier, ColumnPlan, MAX_UTF8_BYTES},
    pool::ConnectionPool,
    rewrite::quote_literal,
    scan::{log_query, BindData},
    session::SessionHandle,
    settings::Settings,
    version::{Capabilities, ServerVersion},
};

/// Object types a table lookup may resolve to.
const TABLE_OBJECT_TYPES: [&str; 3] = ["TABLE", "VIEW", "MATERIALIZED VIEW"];

/// Rows fetched per round-trip by metadata queries.
const METADATA_FETCH_ROWS: usize = 256;

/// Scale reported for a `NUMBER` declared without precision.
const FLOATING_SCALE: i8 = -127;

type Row = Vec<Option<String>>;

/// A remote table or view resolved through the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    /// Owner of the object that is actually scanned.
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnPlan>,
}

impl TableEntry {
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.columns.iter().map(ColumnPlan::field).collect::<Vec<_>>(),
        ))
    }

    /// The query scanning the whole object.
    pub fn base_query(&self) -> String {
        format!(
            "SELECT * FROM {}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }
}

#[derive(Default)]
struct Caches {
    current_schema: Option<Option<String>>,
    version: Option<Option<ServerVersion>>,
    schemas: Option<Vec<String>>,
    real_schema_names: HashMap<String, String>,
    tables: HashMap<String, Vec<String>>,
    objects: HashMap<(String, String), Vec<String>>,
    object_names: HashMap<(String, String, String), Option<String>>,
    synonyms: HashMap<(String, String), Option<(String, String)>>,
    entries: HashMap<(String, String), Arc<TableEntry>>,
}

struct Inner<S: Session> {
    settings: Settings,
    session: Option<SessionHandle<S>>,
    caches: Caches,
}

/// Cached metadata of one attached endpoint.
pub struct CatalogState<D: Driver> {
    endpoint: Endpoint,
    pool: Arc<ConnectionPool<D>>,
    inner: Mutex<Inner<D::SessionType>>,
}

impl<D: Driver> CatalogState<D> {
    pub fn new(pool: Arc<ConnectionPool<D>>, endpoint: Endpoint, settings: Settings) -> Self {
        Self {
            endpoint,
            pool,
            inner: Mutex::new(Inner {
                settings,
                session: None,
                caches: Caches::default(),
            }),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<D>> {
        &self.pool
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.inner.lock().settings.clone()
    }

    /// Apply string-keyed options. Unknown keys are ignored.
    ///
    /// Disabling `connection_cache` drops every cache.
    pub fn apply_options<K: AsRef<str>>(
        &self,
        options: impl IntoIterator<Item = (K, OptionValue)>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.settings.apply_options(options)?;
        if !inner.settings.connection_cache {
            inner.clear();
        }
        Ok(())
    }

    /// Open the metadata session if it is not open yet.
    pub fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.session(&mut inner).map(|_| ())
    }

    /// Drop every cache and the metadata session. The next call reconnects.
    pub fn clear_caches(&self) {
        self.inner.lock().clear();
        tracing::debug!(endpoint = %self.endpoint, "cleared catalog caches");
    }

    /// The schema unqualified names resolve against, if it could be read.
    pub fn detect_current_schema(&self) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        self.current_schema(&mut inner)
    }

    /// The server version, or `None` when it could not be determined.
    ///
    /// Detection runs at most once per cache generation and never fails.
    pub fn detect_version(&self) -> Option<ServerVersion> {
        let mut inner = self.inner.lock();
        self.version(&mut inner)
    }

    /// Features of the server, all unsupported when the version is unknown.
    pub fn capabilities(&self) -> Capabilities {
        self.detect_version()
            .map(|version| Capabilities::from_version(&version))
            .unwrap_or_default()
    }

    /// Schemas to expose.
    ///
    /// With `lazy_schema_loading` and `use_current_schema` both enabled and a
    /// detectable current schema, that schema alone; every principal
    /// otherwise.
    pub fn list_schemas(&self) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        self.schemas(&mut inner)
    }

    /// Tables owned by `schema`.
    pub fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        if let Some(tables) = inner.caches.tables.get(schema) {
            return Ok(tables.clone());
        }
        let sql = format!(
            "SELECT table_name FROM all_tables WHERE owner = {} ORDER BY table_name",
            quote_literal(schema)
        );
        let tables = first_column(self.query(&mut inner, &sql)?);
        inner.caches.tables.insert(schema.to_owned(), tables.clone());
        Ok(tables)
    }

    /// Objects of the given types owned by `schema`, capped at
    /// `metadata_result_limit`.
    pub fn list_objects(&self, schema: &str, object_types: &[String]) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        self.objects(&mut inner, schema, object_types)
    }

    /// The objects the configured `metadata_object_types` select in `schema`.
    pub fn list_default_objects(&self, schema: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        let object_types = inner.settings.object_types();
        self.objects(&mut inner, schema, &object_types)
    }

    /// The `(owner, name)` a synonym in `schema` points to. Private synonyms
    /// take precedence over public ones.
    pub fn resolve_synonym(&self, schema: &str, name: &str) -> Result<Option<(String, String)>> {
        let mut inner = self.inner.lock();
        self.synonym(&mut inner, schema, name)
    }

    /// The remote spelling of `name` among the objects of the given types in
    /// `schema`. An exact match wins over an upper-case one.
    pub fn get_object_name(
        &self,
        schema: &str,
        name: &str,
        object_types: &[String],
    ) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        self.object_name(&mut inner, schema, name, object_types)
    }

    pub fn object_exists(&self, schema: &str, name: &str, object_types: &[String]) -> Result<bool> {
        self.get_object_name(schema, name, object_types)
            .map(|name| name.is_some())
    }

    /// The remote spelling of a schema name given in any case.
    pub fn get_real_schema_name(&self, name: &str) -> Result<String> {
        let mut inner = self.inner.lock();
        self.real_schema_name(&mut inner, name)
    }

    /// Resolve a table, view or synonym, loading its columns on first use.
    ///
    /// Looks in the enumerated object list first, then asks the server for
    /// tables and views that did not make the list, then follows synonyms.
    pub fn lookup_table(&self, schema: &str, name: &str) -> Result<Option<Arc<TableEntry>>> {
        let mut inner = self.inner.lock();
        let schema = self.real_schema_name(&mut inner, schema)?;
        let key = (schema.clone(), name.to_owned());
        if let Some(entry) = inner.caches.entries.get(&key) {
            return Ok(Some(Arc::clone(entry)));
        }

        let object_types = inner.settings.object_types();
        let listed = self.objects(&mut inner, &schema, &object_types)?;
        let direct = if listed.iter().any(|object| object == name) {
            Some(name.to_owned())
        } else {
            let table_types = TABLE_OBJECT_TYPES.map(str::to_owned);
            self.object_name(&mut inner, &schema, name, &table_types)?
        };
        let mut entry = match direct {
            Some(object) => self.load_table(&mut inner, &schema, &object)?,
            None => None,
        };
        // Listed synonyms have no columns of their own.
        if entry.is_none() {
            if let Some((owner, object)) = self.synonym(&mut inner, &schema, name)? {
                entry = self.load_table(&mut inner, &owner, &object)?;
            }
        }
        let Some(entry) = entry else {
            tracing::debug!(%schema, name, "table not found");
            return Ok(None);
        };
        let entry = Arc::new(entry);
        inner.caches.entries.insert(key, Arc::clone(&entry));
        Ok(Some(entry))
    }

    /// Bind a scan of a whole table.
    pub fn bind_table(&self, schema: &str, name: &str) -> Result<BindData<D>> {
        let entry = self.lookup_table(schema, name)?.ok_or_else(|| {
            Error::with_message_and_status(
                format!("table not found: {schema}.{name}"),
                Status::NotFound,
            )
        })?;
        BindData::bind(
            Arc::clone(&self.pool),
            self.endpoint.clone(),
            self.settings(),
            self.capabilities(),
            entry.base_query(),
        )
    }

    fn session<'a>(
        &self,
        inner: &'a mut Inner<D::SessionType>,
    ) -> Result<&'a mut SessionHandle<D::SessionType>> {
        if inner.session.is_none() {
            inner.session = Some(self.pool.open_standalone(&self.endpoint)?);
        }
        inner.session.as_mut().ok_or_else(|| {
            Error::with_message_and_status("metadata session unavailable", Status::Internal)
        })
    }

    /// Run a metadata query and collect every row as text.
    fn query(&self, inner: &mut Inner<D::SessionType>, sql: &str) -> Result<Vec<Row>> {
        log_query(&inner.settings, "metadata", sql);
        let session = self.session(inner)?;
        let mut statement = session
            .new_statement()
            .map_err(|error| error.with_status(Status::Prepare))?;
        statement
            .prepare(sql)
            .map_err(|error| error.with_status(Status::Prepare))?;
        let columns = statement
            .describe()
            .map_err(|error| error.with_status(Status::Describe))?;
        let mut buffers: Vec<_> = columns
            .iter()
            .map(|column: &ColumnDescription| {
                DefineBuffer::new(
                    DefineKind::Text,
                    column.effective_char_size() as usize * MAX_UTF8_BYTES,
                    METADATA_FETCH_ROWS,
                )
            })
            .collect();
        statement
            .execute()
            .map_err(|error| error.with_status(Status::Fetch))?;

        let mut rows = Vec::new();
        loop {
            let status = statement
                .fetch(&mut buffers, METADATA_FETCH_ROWS)
                .map_err(|error| error.with_status(Status::Fetch))?;
            if status.rows > METADATA_FETCH_ROWS {
                return Err(Error::with_message_and_status(
                    format!("metadata fetch reported {} rows", status.rows),
                    Status::Fetch,
                ));
            }
            for row in 0..status.rows {
                rows.push(buffers.iter().map(|buffer| text(buffer, row)).collect());
            }
            if status.exhausted || status.rows == 0 {
                break;
            }
        }
        Ok(rows)
    }

    fn current_schema(&self, inner: &mut Inner<D::SessionType>) -> Result<Option<String>> {
        if let Some(schema) = &inner.caches.current_schema {
            return Ok(schema.clone());
        }
        let rows = self.query(
            inner,
            "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA') FROM dual",
        )?;
        let schema = first_column(rows).into_iter().next();
        tracing::debug!(endpoint = %self.endpoint, ?schema, "detected current schema");
        inner.caches.current_schema = Some(schema.clone());
        Ok(schema)
    }

    fn version(&self, inner: &mut Inner<D::SessionType>) -> Option<ServerVersion> {
        if let Some(version) = inner.caches.version {
            return version;
        }
        const PROBES: [&str; 2] = [
            "SELECT version_full FROM product_component_version WHERE product LIKE 'Oracle%'",
            "SELECT version FROM v$instance",
        ];
        let mut version = None;
        for probe in PROBES {
            match self.query(inner, probe) {
                Ok(rows) => {
                    version = first_column(rows)
                        .iter()
                        .find_map(|text| ServerVersion::parse(text).ok());
                    if version.is_some() {
                        break;
                    }
                }
                Err(error) => tracing::debug!(%error, probe, "version probe failed"),
            }
        }
        match version {
            Some(version) => {
                tracing::debug!(endpoint = %self.endpoint, %version, "detected server version")
            }
            None => tracing::warn!(
                endpoint = %self.endpoint,
                "could not detect server version; version specific features are disabled"
            ),
        }
        inner.caches.version = Some(version);
        version
    }

    fn schemas(&self, inner: &mut Inner<D::SessionType>) -> Result<Vec<String>> {
        if let Some(schemas) = &inner.caches.schemas {
            return Ok(schemas.clone());
        }
        let lazy = inner.settings.lazy_schema_loading && inner.settings.use_current_schema;
        let current = if lazy {
            self.current_schema(inner)?
        } else {
            None
        };
        let schemas = match current {
            Some(current) => vec![current],
            None => first_column(
                self.query(inner, "SELECT username FROM all_users ORDER BY username")?,
            ),
        };
        inner.caches.schemas = Some(schemas.clone());
        Ok(schemas)
    }

    fn real_schema_name(&self, inner: &mut Inner<D::SessionType>, name: &str) -> Result<String> {
        if let Some(real) = inner.caches.real_schema_names.get(name) {
            return Ok(real.clone());
        }
        let schemas = self.schemas(inner)?;
        let known = schemas
            .iter()
            .find(|schema| schema.as_str() == name)
            .or_else(|| schemas.iter().find(|schema| schema.eq_ignore_ascii_case(name)))
            .cloned();
        let real = match known {
            Some(real) => real,
            None => {
                let sql = format!(
                    "SELECT username FROM all_users WHERE UPPER(username) = UPPER({})",
                    quote_literal(name)
                );
                first_column(self.query(inner, &sql)?)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| name.to_owned())
            }
        };
        inner
            .caches
            .real_schema_names
            .insert(name.to_owned(), real.clone());
        Ok(real)
    }

    fn objects(
        &self,
        inner: &mut Inner<D::SessionType>,
        schema: &str,
        object_types: &[String],
    ) -> Result<Vec<String>> {
        let key = (schema.to_owned(), object_types.join(","));
        if let Some(objects) = inner.caches.objects.get(&key) {
            return Ok(objects.clone());
        }
        let limit = inner.settings.metadata_result_limit;
        let mut sql = format!(
            "SELECT DISTINCT object_name FROM all_objects WHERE owner = {}{} ORDER BY object_name",
            quote_literal(schema),
            type_filter(object_types)
        );
        if limit > 0 {
            // One extra row tells whether the cap was hit.
            sql = format!("SELECT object_name FROM ({sql}) WHERE ROWNUM <= {}", limit + 1);
        }
        let mut objects = first_column(self.query(inner, &sql)?);
        if limit > 0 && objects.len() > limit {
            objects.truncate(limit);
            tracing::warn!(
                %schema,
                limit,
                "object enumeration hit metadata_result_limit; remaining objects are still reachable by name"
            );
        }
        inner.caches.objects.insert(key, objects.clone());
        Ok(objects)
    }

    fn object_name(
        &self,
        inner: &mut Inner<D::SessionType>,
        schema: &str,
        name: &str,
        object_types: &[String],
    ) -> Result<Option<String>> {
        let key = (schema.to_owned(), name.to_owned(), object_types.join(","));
        if let Some(found) = inner.caches.object_names.get(&key) {
            return Ok(found.clone());
        }
        let sql = format!(
            "SELECT object_name FROM all_objects WHERE owner = {} AND object_name IN ({}, UPPER({})){}",
            quote_literal(schema),
            quote_literal(name),
            quote_literal(name),
            type_filter(object_types)
        );
        let names = first_column(self.query(inner, &sql)?);
        let found = names
            .iter()
            .find(|object| object.as_str() == name)
            .or_else(|| names.first())
            .cloned();
        inner.caches.object_names.insert(key, found.clone());
        Ok(found)
    }

    fn synonym(
        &self,
        inner: &mut Inner<D::SessionType>,
        schema: &str,
        name: &str,
    ) -> Result<Option<(String, String)>> {
        let key = (schema.to_owned(), name.to_owned());
        if let Some(target) = inner.caches.synonyms.get(&key) {
            return Ok(target.clone());
        }
        let sql = format!(
            "SELECT table_owner, table_name FROM all_synonyms \
             WHERE owner IN ({}, 'PUBLIC') AND synonym_name IN ({}, UPPER({})) \
             ORDER BY CASE WHEN owner = 'PUBLIC' THEN 1 ELSE 0 END",
            quote_literal(schema),
            quote_literal(name),
            quote_literal(name)
        );
        let target = self.query(inner, &sql)?.into_iter().find_map(|row| {
            let mut row = row.into_iter();
            Some((row.next()??, row.next()??))
        });
        tracing::debug!(%schema, name, ?target, "resolved synonym");
        inner.caches.synonyms.insert(key, target.clone());
        Ok(target)
    }

    fn load_table(
        &self,
        inner: &mut Inner<D::SessionType>,
        schema: &str,
        name: &str,
    ) -> Result<Option<TableEntry>> {
        let sql = format!(
            "SELECT column_name, data_type, data_length, data_precision, data_scale, nullable \
             FROM all_tab_columns WHERE owner = {} AND table_name = {} ORDER BY column_id",
            quote_literal(schema),
            quote_literal(name)
        );
        let rows = self.query(inner, &sql)?;
        if rows.is_empty() {
            return Ok(None);
        }
        let capabilities = self
            .version(inner)
            .map(|version| Capabilities::from_version(&version))
            .unwrap_or_default();
        let columns = rows
            .into_iter()
            .filter_map(column_description)
            .map(|column| ColumnPlan::new(&column, &capabilities, &inner.settings))
            .collect();
        tracing::debug!(%schema, name, "loaded table");
        Ok(Some(TableEntry {
            schema: schema.to_owned(),
            name: name.to_owned(),
            columns,
        }))
    }
}

impl<S: Session> Inner<S> {
    fn clear(&mut self) {
        self.caches = Caches::default();
        if let Some(session) = self.session.take() {
            session.discard();
        }
    }
}

impl<D: Driver> fmt::Debug for CatalogState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogState")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// A row of `all_tab_columns` as a described column.
fn column_description(row: Row) -> Option<ColumnDescription> {
    let mut row = row.into_iter();
    let name = row.next()??;
    let data_type = row.next()??;
    let number = |value: Option<Option<String>>| -> Option<i64> { value?.as_deref()?.trim().parse().ok() };
    let length = number(row.next());
    let precision = number(row.next());
    let scale = number(row.next());
    let nullable = row.next().flatten().map_or(true, |flag| flag == "Y");

    let scale = match (precision, scale) {
        (None, None) => FLOATING_SCALE,
        (_, scale) => scale.unwrap_or_default().clamp(i8::MIN.into(), i8::MAX.into()) as i8,
    };
    let mut column = ColumnDescription::new(name, 0)
        .with_type_name(data_type)
        .with_precision(
            precision.unwrap_or_default().clamp(0, i16::MAX.into()) as i16,
            scale,
        )
        .with_char_size(length.unwrap_or_default().clamp(0, u32::MAX.into()) as u32);
    column.nullable = nullable;
    Some(column)
}

fn type_filter(object_types: &[String]) -> String {
    if object_types.is_empty() {
        return String::new();
    }
    let types: Vec<_> = object_types.iter().map(|kind| quote_literal(kind)).collect();
    format!(" AND object_type IN ({})", types.join(", "))
}

fn first_column(rows: Vec<Row>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect()
}

fn text(buffer: &DefineBuffer, row: usize) -> Option<String> {
    if buffer.is_null(row) {
        return None;
    }
    let length = (buffer.lengths[row] as usize).min(buffer.width);
    Some(String::from_utf8_lossy(&buffer.slot(row)[..length]).into_owned())
}
