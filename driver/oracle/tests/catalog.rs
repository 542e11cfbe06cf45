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

use std::sync::Arc;

use arrow_schema::DataType;
use orabridge_core::{
    error::{Error, Status},
    options::OptionValue,
};
use orabridge_dummy::{DummyDriver, Phase};
use orabridge_oracle::{
    classify::TypeCategory,
    version::{Capabilities, ServerVersion},
    CatalogRegistry, CatalogState, ConnectionPool, Connector, Settings,
};

mod common;

use common::{
    CURRENT_SCHEMA_SQL, INSTANCE_SQL, OBJECTS_SQL, OBJECT_NAME_SQL, SYNONYMS_SQL, USERS_SQL,
    VERSION_SQL,
};

fn state_with(driver: &DummyDriver, settings: Settings) -> CatalogState<DummyDriver> {
    CatalogState::new(
        Arc::new(ConnectionPool::new(driver.clone())),
        common::endpoint(),
        settings,
    )
}

fn state(driver: &DummyDriver) -> CatalogState<DummyDriver> {
    state_with(driver, common::settings())
}

#[test]
fn schemas_are_cached_per_generation() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    assert_eq!(state.list_schemas().unwrap(), vec!["HR".to_owned()]);
    assert_eq!(state.list_schemas().unwrap(), vec!["HR".to_owned()]);
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 1);
    assert_eq!(driver.connect_count(), 1);

    state.clear_caches();
    assert_eq!(driver.live_sessions(), 0);
    assert_eq!(state.list_schemas().unwrap(), vec!["HR".to_owned()]);
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 2);
    assert_eq!(driver.connect_count(), 2);
}

#[test]
fn eager_schema_loading_lists_every_user() {
    let driver = common::metadata_driver();
    let everyone = vec!["HR".to_owned(), "SCOTT".to_owned(), "SYS".to_owned()];

    let eager = state_with(
        &driver,
        Settings {
            lazy_schema_loading: false,
            ..common::settings()
        },
    );
    assert_eq!(eager.list_schemas().unwrap(), everyone);

    let other_schemas = state_with(
        &driver,
        Settings {
            use_current_schema: false,
            ..common::settings()
        },
    );
    assert_eq!(other_schemas.list_schemas().unwrap(), everyone);
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 0);
    assert_eq!(driver.executed_count(USERS_SQL), 2);
}

#[test]
fn lazy_loading_falls_back_without_a_current_schema() {
    let driver = common::metadata_driver().with_result(
        CURRENT_SCHEMA_SQL,
        common::table(&["SCHEMA"], &[&[None]]),
    );
    let state = state(&driver);
    assert_eq!(state.detect_current_schema().unwrap(), None);
    assert_eq!(state.list_schemas().unwrap().len(), 3);
}

#[test]
fn object_enumeration_is_capped() {
    let driver = common::metadata_driver().with_prefix_result(
        format!("{OBJECT_NAME_SQL} WHERE owner = 'HR' AND object_name IN ('EMPLOYEES'"),
        common::strings("OBJECT_NAME", &["EMPLOYEES"]),
    );
    let state = state_with(
        &driver,
        Settings {
            metadata_result_limit: 1,
            ..common::settings()
        },
    );

    let objects = state.list_default_objects("HR").unwrap();
    assert_eq!(objects, vec!["COUNTRIES".to_owned()]);
    let executed = driver.executed();
    let sql = executed
        .iter()
        .find(|sql| sql.starts_with(OBJECTS_SQL))
        .unwrap();
    assert!(sql.contains(
        "AND object_type IN ('TABLE', 'VIEW', 'SYNONYM', 'MATERIALIZED VIEW')"
    ));
    assert!(sql.ends_with("WHERE ROWNUM <= 2"));

    // Objects beyond the cap are still found by name.
    let entry = state.lookup_table("HR", "EMPLOYEES").unwrap().unwrap();
    assert_eq!(entry.name, "EMPLOYEES");
}

#[test]
fn unlimited_enumeration_skips_the_row_cap() {
    let driver = common::metadata_driver().with_prefix_result(
        "SELECT DISTINCT object_name FROM all_objects WHERE owner = 'HR'",
        common::strings("OBJECT_NAME", &["A", "B", "C"]),
    );
    let state = state_with(
        &driver,
        Settings {
            metadata_result_limit: 0,
            ..common::settings()
        },
    );
    let objects = state
        .list_objects("HR", &["TABLE".to_owned()])
        .unwrap();
    assert_eq!(objects.len(), 3);
    assert!(driver
        .executed()
        .iter()
        .all(|sql| !sql.contains("ROWNUM")));
}

#[test]
fn tables_resolve_from_the_object_list() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    let entry = state.lookup_table("hr", "EMPLOYEES").unwrap().unwrap();
    assert_eq!(entry.schema, "HR");
    assert_eq!(entry.base_query(), "SELECT * FROM \"HR\".\"EMPLOYEES\"");
    let names: Vec<_> = entry.columns.iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, ["ID", "NAME", "SALARY", "HIRED"]);

    let schema = entry.arrow_schema();
    assert_eq!(schema.field(0).data_type(), &DataType::Int64);
    assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
    assert_eq!(schema.field(2).data_type(), &DataType::Float64);
    assert!(matches!(schema.field(3).data_type(), DataType::Timestamp(_, None)));

    // Cached: same entry, no further metadata traffic.
    let executed = driver.executed().len();
    let again = state.lookup_table("hr", "EMPLOYEES").unwrap().unwrap();
    assert!(Arc::ptr_eq(&entry, &again));
    assert_eq!(driver.executed().len(), executed);
}

#[test]
fn unlisted_objects_are_found_by_name() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    let entry = state.lookup_table("HR", "Jobs_Archive").unwrap().unwrap();
    assert_eq!(entry.name, "Jobs_Archive");
    assert_eq!(entry.columns[0].name, "JOB_ID");
    assert!(state
        .object_exists("HR", "Jobs_Archive", &["TABLE".to_owned()])
        .unwrap());
    assert!(!state
        .object_exists("HR", "NOTHING", &["TABLE".to_owned()])
        .unwrap());
}

#[test]
fn synonyms_resolve_to_their_target() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    assert_eq!(
        state.resolve_synonym("HR", "EMP").unwrap(),
        Some(("SCOTT".to_owned(), "EMP".to_owned()))
    );
    let synonym_sql = driver
        .executed()
        .into_iter()
        .find(|sql| sql.starts_with(SYNONYMS_SQL))
        .unwrap();
    assert!(synonym_sql.contains("ORDER BY CASE WHEN owner = 'PUBLIC' THEN 1 ELSE 0 END"));

    let entry = state.lookup_table("HR", "EMP").unwrap().unwrap();
    assert_eq!(entry.schema, "SCOTT");
    assert_eq!(entry.name, "EMP");
    assert_eq!(entry.columns[1].category, TypeCategory::LargeBinary);
    assert_eq!(entry.arrow_schema().field(1).data_type(), &DataType::Binary);
}

#[test]
fn listed_synonyms_resolve_to_their_target() {
    // EMP is a synonym that the object listing reports alongside the tables.
    let driver = common::metadata_driver().with_prefix_result(
        format!("{OBJECTS_SQL} WHERE owner = 'HR'"),
        common::strings("OBJECT_NAME", &["COUNTRIES", "EMP", "EMPLOYEES"]),
    );
    let state = state(&driver);
    assert!(state.list_default_objects("HR").unwrap().contains(&"EMP".to_owned()));

    let entry = state.lookup_table("HR", "EMP").unwrap().unwrap();
    assert_eq!(entry.schema, "SCOTT");
    assert_eq!(entry.name, "EMP");
    assert_eq!(entry.columns[0].name, "EMPNO");
    assert_eq!(driver.executed_count(SYNONYMS_SQL), 1);
}

#[test]
fn missing_tables() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    assert!(state.lookup_table("HR", "MISSING").unwrap().is_none());
    let error = state.bind_table("HR", "MISSING").unwrap_err();
    assert_eq!(error.status, Status::NotFound);
    assert_eq!(error.message, "table not found: HR.MISSING");
}

#[test]
fn bind_table_scans_the_resolved_object() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    let bound = state.bind_table("HR", "EMPLOYEES").unwrap();
    assert_eq!(bound.base_query(), "SELECT * FROM \"HR\".\"EMPLOYEES\"");
    assert_eq!(bound.schema().fields().len(), 5);
    let batches: Vec<_> = bound.scan().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.iter().map(|batch| batch.num_rows()).sum::<usize>(), 5);
}

#[test]
fn real_schema_names() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    assert_eq!(state.get_real_schema_name("hr").unwrap(), "HR");
    assert_eq!(state.get_real_schema_name("scott").unwrap(), "SCOTT");
    assert_eq!(state.get_real_schema_name("nobody").unwrap(), "nobody");
    let lookups = driver.executed_count("SELECT username FROM all_users WHERE");
    assert_eq!(state.get_real_schema_name("scott").unwrap(), "SCOTT");
    assert_eq!(
        driver.executed_count("SELECT username FROM all_users WHERE"),
        lookups
    );
}

#[test]
fn version_detection() {
    let driver = common::metadata_driver();
    let state = state(&driver);

    assert_eq!(state.detect_version(), Some(ServerVersion::new(23, 4, 0)));
    let capabilities = state.capabilities();
    assert!(capabilities.json_type && capabilities.vector && capabilities.vector_serialize);
    assert_eq!(driver.executed_count(VERSION_SQL), 1);
}

#[test]
fn version_detection_falls_back_to_the_instance_view() {
    let driver = common::metadata_driver()
        .with_prefix_error(
            VERSION_SQL,
            Phase::Prepare,
            Error::native(Status::Prepare, "prepare", "ORA-00942: table or view does not exist", 942),
        )
        .with_result(INSTANCE_SQL, common::strings("VERSION", &["19.0.0.0.0"]));
    let state = state(&driver);
    assert_eq!(state.detect_version(), Some(ServerVersion::new(19, 0, 0)));
    assert_eq!(state.capabilities(), Capabilities::default());
}

#[test]
fn version_detection_is_best_effort() {
    let driver = common::metadata_driver().with_prefix_error(
        VERSION_SQL,
        Phase::Execute,
        Error::native(Status::Fetch, "execute", "ORA-01031: insufficient privileges", 1031),
    );
    let state = state(&driver);

    assert_eq!(state.detect_version(), None);
    assert_eq!(state.capabilities(), Capabilities::default());
    // Probed once per generation, even when it fails.
    let probes = |driver: &DummyDriver| {
        driver
            .prepared()
            .iter()
            .filter(|sql| sql.starts_with(VERSION_SQL) || sql.starts_with(INSTANCE_SQL))
            .count()
    };
    assert_eq!(probes(&driver), 2);
    assert_eq!(state.detect_version(), None);
    assert_eq!(probes(&driver), 2);

    // The metadata session survives the failed probes.
    assert_eq!(state.list_schemas().unwrap(), vec!["HR".to_owned()]);
    assert_eq!(driver.connect_count(), 1);
}

#[test]
fn unreachable_endpoints_fail_to_connect() {
    let driver = common::metadata_driver();
    driver.set_connect_error(Some(Error::with_message_and_status(
        "ORA-12541: TNS:no listener",
        Status::Connection,
    )));
    let state = state(&driver);
    let error = state.list_schemas().unwrap_err();
    assert_eq!(error.status, Status::Connection);
    assert!(error.message.contains("ORA-12541"));

    driver.set_connect_error(None);
    assert!(state.list_schemas().is_ok());
}

#[test]
fn options_update_settings() {
    let driver = common::metadata_driver();
    let state = state(&driver);
    state.list_schemas().unwrap();

    state
        .apply_options([
            ("array_size", OptionValue::from(16i64)),
            ("debug_show_queries", OptionValue::from("yes")),
            ("not_a_setting", OptionValue::from("ignored")),
        ])
        .unwrap();
    let settings = state.settings();
    assert_eq!(settings.array_size, 16);
    assert!(settings.debug_show_queries);

    let error = state
        .apply_options([("connection_limit", OptionValue::from("many"))])
        .unwrap_err();
    assert_eq!(error.status, Status::InvalidArguments);

    // Still cached.
    state.list_schemas().unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 1);

    state
        .apply_options([("connection_cache", OptionValue::from(false))])
        .unwrap();
    assert_eq!(driver.live_sessions(), 0);
    state.list_schemas().unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 2);
}

#[test]
fn registry_holds_weak_references() {
    let driver = common::metadata_driver();
    let pool = Arc::new(ConnectionPool::new(driver.clone()));
    let registry = CatalogRegistry::new();

    let first = Arc::new(CatalogState::new(
        Arc::clone(&pool),
        common::endpoint(),
        common::settings(),
    ));
    let second = Arc::new(CatalogState::new(
        Arc::clone(&pool),
        common::endpoint(),
        common::settings(),
    ));
    registry.register(&first, Some("hr"));
    registry.register(&second, Some("hr"));
    assert_eq!(registry.len(), 2);
    assert!(Arc::ptr_eq(&registry.lookup("hr").unwrap(), &second));

    drop(second);
    assert!(Arc::ptr_eq(&registry.lookup("hr").unwrap(), &first));
    assert_eq!(registry.len(), 1);
    assert!(registry.lookup("other").is_none());

    first.list_schemas().unwrap();
    registry.clear_all_caches();
    first.list_schemas().unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 2);

    drop(first);
    assert!(registry.states().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn connector_binds_through_aliases() {
    let driver = common::metadata_driver();
    let connector = Connector::new(driver.clone());
    let state = connector
        .attach(common::endpoint(), common::settings(), Some("hr"))
        .unwrap();
    assert_eq!(driver.live_sessions(), 1);

    let bound = connector
        .bind_query("hr", "SELECT * FROM \"HR\".\"EMPLOYEES\"", None)
        .unwrap();
    assert_eq!(bound.endpoint(), state.endpoint());
    assert_eq!(bound.settings(), &state.settings());

    let error = connector
        .bind_query("sales", "SELECT 1 FROM dual", None)
        .unwrap_err();
    assert_eq!(error.status, Status::NotFound);
    assert_eq!(error.message, "no attached database named sales");

    let direct = connector
        .bind_query(
            "scott/tiger@//db.example.com:1521/ORCL",
            "SELECT * FROM \"HR\".\"EMPLOYEES\"",
            Some(Settings {
                array_size: 2,
                ..Default::default()
            }),
        )
        .unwrap();
    assert_eq!(direct.settings().array_size, 2);

    let error = connector
        .bind_query("@", "SELECT 1 FROM dual", None)
        .unwrap_err();
    assert_eq!(error.status, Status::InvalidArguments);
}

#[test]
fn attach_detects_the_current_schema() {
    let driver = common::metadata_driver();
    let connector = Connector::new(driver.clone());
    let state = connector
        .attach(common::endpoint(), common::settings(), Some("hr"))
        .unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 1);
    assert_eq!(state.detect_current_schema().unwrap().as_deref(), Some("HR"));
    state.list_schemas().unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 1);

    // Detection is best effort.
    let driver = DummyDriver::new().with_error(
        CURRENT_SCHEMA_SQL,
        Phase::Execute,
        Error::native(Status::IO, "execute", "ORA-00904: invalid identifier", 904),
    );
    let connector = Connector::new(driver.clone());
    let state = connector
        .attach(common::endpoint(), common::settings(), Some("hr"))
        .unwrap();
    assert!(connector.registry().lookup("hr").is_some());
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 1);
    drop(state);
}

#[test]
fn connector_clear_cache_resets_everything() {
    let driver = common::metadata_driver();
    let connector = Connector::new(driver.clone());
    let state = connector
        .attach(common::endpoint(), common::settings(), None)
        .unwrap();
    let bound = connector
        .bind_query(
            "scott/tiger@//db.example.com:1521/ORCL",
            "SELECT * FROM \"HR\".\"EMPLOYEES\"",
            None,
        )
        .unwrap();
    drop(bound.scan().unwrap());
    assert!(connector.pool().stats(&common::endpoint()).is_some());

    state.list_schemas().unwrap();
    connector.clear_cache();
    assert_eq!(connector.pool().stats(&common::endpoint()), None);
    assert_eq!(driver.live_sessions(), 0);

    state.list_schemas().unwrap();
    assert_eq!(driver.executed_count(CURRENT_SCHEMA_SQL), 2);
}

#[test]
fn failed_attach_is_not_registered() {
    let driver = DummyDriver::new();
    driver.set_connect_error(Some(Error::with_message_and_status(
        "ORA-01017: invalid username/password; logon denied",
        Status::Connection,
    )));
    let connector = Connector::new(driver);
    assert!(connector
        .attach(common::endpoint(), Settings::default(), Some("hr"))
        .is_err());
    assert!(connector.registry().is_empty());
}
