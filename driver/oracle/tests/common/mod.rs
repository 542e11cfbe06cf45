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

#![allow(dead_code)]

use orabridge_core::{constants, ColumnDescription, Endpoint};
use orabridge_dummy::{DummyDriver, DummyResult, DummyValue};
use orabridge_oracle::Settings;

pub const CURRENT_SCHEMA_SQL: &str = "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA') FROM dual";
pub const USERS_SQL: &str = "SELECT username FROM all_users ORDER BY username";
pub const VERSION_SQL: &str = "SELECT version_full FROM product_component_version";
pub const INSTANCE_SQL: &str = "SELECT version FROM v$instance";
pub const OBJECTS_SQL: &str = "SELECT object_name FROM (SELECT DISTINCT object_name FROM all_objects";
pub const OBJECT_NAME_SQL: &str = "SELECT object_name FROM all_objects";
pub const SYNONYMS_SQL: &str = "SELECT table_owner, table_name FROM all_synonyms";
pub const COLUMNS_SQL: &str =
    "SELECT column_name, data_type, data_length, data_precision, data_scale, nullable FROM all_tab_columns";

pub fn endpoint() -> Endpoint {
    Endpoint::parse("scott/tiger@//db.example.com:1521/ORCL").unwrap()
}

/// Settings with small large-object buffers.
pub fn settings() -> Settings {
    Settings {
        lob_max_size: 1024,
        ..Default::default()
    }
}

/// `ID NUMBER(6)`, `NAME VARCHAR2(32)`, `AGE NUMBER(3)`, `SALARY NUMBER(8,2)`,
/// `HIRED DATE`.
pub fn employee_columns() -> Vec<ColumnDescription> {
    vec![
        ColumnDescription::new("ID", constants::SQLT_NUM).with_precision(6, 0),
        ColumnDescription::new("NAME", constants::SQLT_CHR).with_char_size(32),
        ColumnDescription::new("AGE", constants::SQLT_NUM).with_precision(3, 0),
        ColumnDescription::new("SALARY", constants::SQLT_NUM).with_precision(8, 2),
        ColumnDescription::new("HIRED", constants::SQLT_DAT),
    ]
}

/// Five employees; some names, ages and hire dates are null.
pub fn employees() -> DummyResult {
    let rows: [(i64, Option<&str>, Option<i64>, f64, Option<&str>); 5] = [
        (1, Some("Ada"), Some(36), 5200.5, Some("2019-03-01 09:00:00")),
        (2, None, Some(41), 4100.0, None),
        (3, Some("Grace"), None, 6100.25, Some("2020-11-15 17:45:30.125")),
        (4, Some("Linus"), Some(29), 3900.0, Some("2021-01-04 08:30:00")),
        (5, Some("Edsger"), Some(52), 7000.0, None),
    ];
    rows.into_iter().fold(
        DummyResult::new(employee_columns()),
        |result, (id, name, age, salary, hired)| {
            result.with_row(vec![
                id.into(),
                name.into(),
                age.into(),
                salary.into(),
                hired.into(),
            ])
        },
    )
}

/// A result with one text column and one row per value.
pub fn strings(name: &str, values: &[&str]) -> DummyResult {
    DummyResult::strings(name, values)
}

/// A result with one text column per name and the given rows.
pub fn table(names: &[&str], rows: &[&[Option<&str>]]) -> DummyResult {
    let columns = names
        .iter()
        .map(|name| ColumnDescription::new(*name, constants::SQLT_CHR))
        .collect();
    rows.iter().fold(DummyResult::new(columns), |result, row| {
        result.with_row(row.iter().map(|value| DummyValue::from(*value)).collect())
    })
}

/// A backend answering the metadata queries of an `HR` schema.
///
/// `HR` lists `COUNTRIES` and `EMPLOYEES`; `Jobs_Archive` is only found by
/// name and `EMP` is a synonym of `SCOTT.EMP`.
pub fn metadata_driver() -> DummyDriver {
    let column_row = |name, data_type, length, precision: Option<&'static str>, scale: Option<&'static str>| {
        [Some(name), Some(data_type), Some(length), precision, scale, Some("Y")]
    };
    let column_names = [
        "COLUMN_NAME",
        "DATA_TYPE",
        "DATA_LENGTH",
        "DATA_PRECISION",
        "DATA_SCALE",
        "NULLABLE",
    ];
    DummyDriver::new()
        .with_result(CURRENT_SCHEMA_SQL, strings("SCHEMA", &["HR"]))
        .with_result(USERS_SQL, strings("USERNAME", &["HR", "SCOTT", "SYS"]))
        .with_prefix_result(
            "SELECT username FROM all_users WHERE UPPER(username) = UPPER('scott')",
            strings("USERNAME", &["SCOTT"]),
        )
        .with_prefix_result(
            "SELECT username FROM all_users WHERE",
            strings("USERNAME", &[]),
        )
        .with_prefix_result(VERSION_SQL, strings("VERSION_FULL", &["23.4.0.24.05"]))
        .with_prefix_result(
            format!("{OBJECTS_SQL} WHERE owner = 'HR'"),
            strings("OBJECT_NAME", &["COUNTRIES", "EMPLOYEES"]),
        )
        .with_prefix_result(OBJECTS_SQL, strings("OBJECT_NAME", &[]))
        .with_prefix_result(
            format!("{OBJECT_NAME_SQL} WHERE owner = 'HR' AND object_name IN ('Jobs_Archive'"),
            strings("OBJECT_NAME", &["Jobs_Archive"]),
        )
        .with_prefix_result(OBJECT_NAME_SQL, strings("OBJECT_NAME", &[]))
        .with_prefix_result(
            format!("{SYNONYMS_SQL} WHERE owner IN ('HR', 'PUBLIC') AND synonym_name IN ('EMP'"),
            table(
                &["TABLE_OWNER", "TABLE_NAME"],
                &[&[Some("SCOTT"), Some("EMP")], &[Some("PUBLIC_OWNER"), Some("EMP")]],
            ),
        )
        .with_prefix_result(SYNONYMS_SQL, table(&["TABLE_OWNER", "TABLE_NAME"], &[]))
        .with_prefix_result(
            format!("{COLUMNS_SQL} WHERE owner = 'HR' AND table_name = 'EMPLOYEES'"),
            table(
                &column_names,
                &[
                    &column_row("ID", "NUMBER", "22", Some("6"), Some("0")),
                    &column_row("NAME", "VARCHAR2", "32", None, None),
                    &column_row("SALARY", "NUMBER", "22", Some("8"), Some("2")),
                    &column_row("HIRED", "DATE", "7", None, None),
                ],
            ),
        )
        .with_prefix_result(
            format!("{COLUMNS_SQL} WHERE owner = 'HR' AND table_name = 'Jobs_Archive'"),
            table(
                &column_names,
                &[&column_row("JOB_ID", "VARCHAR2", "10", None, None)],
            ),
        )
        .with_prefix_result(
            format!("{COLUMNS_SQL} WHERE owner = 'SCOTT' AND table_name = 'EMP'"),
            table(
                &column_names,
                &[
                    &column_row("EMPNO", "NUMBER", "22", Some("4"), Some("0")),
                    &column_row("PHOTO", "BLOB", "4000", None, None),
                ],
            ),
        )
        .with_prefix_result(COLUMNS_SQL, table(&column_names, &[]))
        .with_result("SELECT * FROM \"HR\".\"EMPLOYEES\"", employees())
}
