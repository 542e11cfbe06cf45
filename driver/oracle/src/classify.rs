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

//! Classification of remote column types.
//!
//! Every result column is classified into a [`TypeCategory`]; the category,
//! the server [`Capabilities`] and the [`Settings`] then decide how the column
//! is fetched, what Arrow type it decodes to and whether the remote query has
//! to convert it first. See [`ColumnPlan`].

use std::sync::Arc;

use arrow_schema::{DataType, Field, TimeUnit};

use orabridge_core::{
    constants::{self, TypeCode},
    sync::{ColumnDescription, DefineKind},
};

use crate::{settings::Settings, version::Capabilities};

/// Width of the text form of a date or timestamp, time zone included.
const TEMPORAL_WIDTH: usize = 64;

/// Largest value a VARCHAR2 expression can return.
const MAX_VARCHAR_SIZE: usize = 4000;

/// Longest UTF-8 encoding of one character.
pub const MAX_UTF8_BYTES: usize = 4;

/// How a remote type has to be fetched and decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// `CHAR`, `VARCHAR2`, `NCHAR`, `NVARCHAR2`, `ROWID`.
    PlainText,
    /// `NUMBER`, `FLOAT`, `BINARY_FLOAT`, `BINARY_DOUBLE`.
    Numeric,
    /// `DATE` and the `TIMESTAMP` family.
    Temporal,
    /// `BLOB`, `BFILE`, `LONG RAW`.
    LargeBinary,
    /// `CLOB`, `NCLOB`, `LONG`.
    LargeText,
    /// `RAW`.
    RawBinary,
    /// `SDO_GEOMETRY`.
    Spatial,
    /// `VECTOR`.
    Vector,
    /// Native `JSON`.
    Json,
    /// `XMLTYPE`.
    Xml,
    Unknown,
}

impl TypeCategory {
    /// Classify a declared type name such as `VARCHAR2`, `NUMBER(10,2)` or
    /// `MDSYS.SDO_GEOMETRY`.
    pub fn from_type_name(type_name: &str) -> Self {
        let upper = type_name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "SDO_GEOMETRY" | "MDSYS.SDO_GEOMETRY" => Self::Spatial,
            "VECTOR" => Self::Vector,
            "JSON" => Self::Json,
            "XMLTYPE" | "SYS.XMLTYPE" => Self::Xml,
            "BLOB" | "BFILE" | "LONG RAW" => Self::LargeBinary,
            "CLOB" | "NCLOB" | "LONG" => Self::LargeText,
            "RAW" => Self::RawBinary,
            "NUMBER" | "FLOAT" | "BINARY_FLOAT" | "BINARY_DOUBLE" | "INTEGER" => Self::Numeric,
            "DATE" => Self::Temporal,
            _ if base.starts_with("TIMESTAMP") => Self::Temporal,
            "ROWID" | "UROWID" => Self::PlainText,
            _ if base.contains("CHAR") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Classify a native type code. Named types (code [`constants::SQLT_NTY`])
    /// need their type name.
    pub fn from_type_code(type_code: TypeCode, type_name: Option<&str>) -> Self {
        match type_code {
            constants::SQLT_CHR
            | constants::SQLT_STR
            | constants::SQLT_VCS
            | constants::SQLT_AFC
            | constants::SQLT_AVC
            | constants::SQLT_RDD => Self::PlainText,
            constants::SQLT_NUM
            | constants::SQLT_VNU
            | constants::SQLT_INT
            | constants::SQLT_UIN
            | constants::SQLT_FLT
            | constants::SQLT_BFLOAT
            | constants::SQLT_BDOUBLE
            | constants::SQLT_IBFLOAT
            | constants::SQLT_IBDOUBLE => Self::Numeric,
            constants::SQLT_DAT
            | constants::SQLT_DATE
            | constants::SQLT_TIMESTAMP
            | constants::SQLT_TIMESTAMP_TZ
            | constants::SQLT_TIMESTAMP_LTZ => Self::Temporal,
            constants::SQLT_BLOB
            | constants::SQLT_BFILE
            | constants::SQLT_LBI
            | constants::SQLT_LVB => Self::LargeBinary,
            constants::SQLT_CLOB | constants::SQLT_LNG | constants::SQLT_LVC => Self::LargeText,
            constants::SQLT_BIN => Self::RawBinary,
            constants::SQLT_JSON => Self::Json,
            constants::SQLT_VEC => Self::Vector,
            _ => type_name.map(Self::from_type_name).unwrap_or(Self::Unknown),
        }
    }

    /// Classify a described column, preferring its declared type name.
    pub fn of(column: &ColumnDescription) -> Self {
        match column.type_name.as_deref() {
            Some(type_name) => match Self::from_type_name(type_name) {
                Self::Unknown => Self::from_type_code(column.type_code, None),
                category => category,
            },
            None => Self::from_type_code(column.type_code, None),
        }
    }

    /// Whether values must be converted by the remote query before they can
    /// be fetched.
    pub fn requires_conversion(self, capabilities: &Capabilities, settings: &Settings) -> bool {
        match self {
            Self::Spatial | Self::Vector | Self::Xml => settings.enable_type_conversion,
            // Servers without a native JSON type already return text.
            Self::Json => settings.enable_type_conversion && capabilities.json_type,
            Self::LargeBinary | Self::LargeText | Self::RawBinary => !settings.try_native_lobs,
            Self::PlainText | Self::Numeric | Self::Temporal | Self::Unknown => false,
        }
    }
}

/// How fetched bytes are decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Native-endian `i64`.
    Int64,
    /// Native-endian `f64`.
    Float64,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
    /// Hexadecimal text decoded to bytes.
    HexText,
    /// Text parsed as a timestamp.
    Timestamp,
    /// Text of the form `[1.5,2,3]`.
    Vector,
}

impl FetchStrategy {
    /// The native buffer layout used to fetch values.
    pub fn define_kind(self) -> DefineKind {
        match self {
            Self::Int64 => DefineKind::Int64,
            Self::Float64 => DefineKind::Float64,
            Self::Bytes => DefineKind::Bytes,
            Self::Text | Self::HexText | Self::Timestamp | Self::Vector => DefineKind::Text,
        }
    }
}

/// Everything needed to fetch and decode one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub name: String,
    pub type_code: TypeCode,
    pub category: TypeCategory,
    pub fetch: FetchStrategy,
    /// Arrow type of decoded values.
    pub data_type: DataType,
    pub nullable: bool,
    /// Bytes reserved per row in the fetch buffer.
    pub width: usize,
    /// Remote expression replacing the plain column reference.
    pub conversion: Option<String>,
}

impl ColumnPlan {
    /// Plan the fetch of a described column.
    pub fn new(column: &ColumnDescription, capabilities: &Capabilities, settings: &Settings) -> Self {
        let category = TypeCategory::of(column);
        let converted = category.requires_conversion(capabilities, settings);
        let quoted = quote_identifier(&column.name);
        let char_size = column.effective_char_size() as usize;
        let lob_size = settings.lob_max_size;

        let (fetch, width, conversion) = match category {
            TypeCategory::Numeric if integral(column) => (FetchStrategy::Int64, 8, None),
            TypeCategory::Numeric => (FetchStrategy::Float64, 8, None),
            TypeCategory::Temporal => (FetchStrategy::Timestamp, TEMPORAL_WIDTH, None),
            TypeCategory::PlainText | TypeCategory::Unknown => {
                (FetchStrategy::Text, char_size * MAX_UTF8_BYTES, None)
            }
            TypeCategory::LargeText if converted => {
                let size = lob_size.min(MAX_VARCHAR_SIZE);
                let sql = format!("DBMS_LOB.SUBSTR({quoted}, {size}, 1)");
                (FetchStrategy::Text, size, Some(sql))
            }
            TypeCategory::LargeText => (FetchStrategy::Text, lob_size, None),
            TypeCategory::LargeBinary if converted => {
                let size = lob_size.min(MAX_VARCHAR_SIZE / 2);
                let sql = format!("RAWTOHEX(DBMS_LOB.SUBSTR({quoted}, {size}, 1))");
                (FetchStrategy::HexText, size * 2, Some(sql))
            }
            TypeCategory::LargeBinary => (FetchStrategy::Bytes, lob_size, None),
            TypeCategory::RawBinary if converted => {
                let sql = format!("RAWTOHEX({quoted})");
                (FetchStrategy::HexText, char_size * 2, Some(sql))
            }
            TypeCategory::RawBinary => (FetchStrategy::Bytes, char_size, None),
            TypeCategory::Spatial => {
                let sql = format!("SDO_UTIL.TO_WKTGEOMETRY({quoted})");
                (FetchStrategy::Text, lob_size, converted.then_some(sql))
            }
            TypeCategory::Vector => {
                let sql = match (capabilities.vector_serialize, capabilities.vector) {
                    (true, _) => format!("VECTOR_SERIALIZE({quoted} RETURNING CLOB)"),
                    (false, true) => format!("FROM_VECTOR({quoted} RETURNING CLOB)"),
                    (false, false) => format!("TO_CHAR({quoted})"),
                };
                let fetch = if settings.vector_to_list {
                    FetchStrategy::Vector
                } else {
                    FetchStrategy::Text
                };
                (fetch, lob_size, converted.then_some(sql))
            }
            TypeCategory::Json => {
                let sql = format!("JSON_SERIALIZE({quoted} RETURNING CLOB)");
                (FetchStrategy::Text, lob_size, converted.then_some(sql))
            }
            TypeCategory::Xml => {
                let sql = format!("XMLSERIALIZE(CONTENT {quoted} AS CLOB)");
                (FetchStrategy::Text, lob_size, converted.then_some(sql))
            }
        };

        Self {
            name: column.name.clone(),
            type_code: column.type_code,
            category,
            fetch,
            data_type: output_type(fetch),
            nullable: column.nullable,
            width: width.max(1),
            conversion,
        }
    }

    /// The select-list item fetching this column.
    pub fn select_item(&self) -> String {
        let quoted = quote_identifier(&self.name);
        match &self.conversion {
            Some(conversion) => format!("{conversion} AS {quoted}"),
            None => quoted,
        }
    }

    pub fn field(&self) -> Field {
        Field::new(&self.name, self.data_type.clone(), self.nullable)
    }
}

/// `NUMBER` columns fit an `i64` when they have no fractional digits and at
/// most 18 significant ones.
fn integral(column: &ColumnDescription) -> bool {
    let declared = column
        .type_name
        .as_deref()
        .map(|name| name.trim().to_ascii_uppercase());
    match (declared.as_deref(), column.type_code) {
        (Some("INTEGER"), _) | (_, constants::SQLT_INT | constants::SQLT_UIN) => true,
        (Some("FLOAT" | "BINARY_FLOAT" | "BINARY_DOUBLE"), _) => false,
        (
            _,
            constants::SQLT_FLT
            | constants::SQLT_BFLOAT
            | constants::SQLT_BDOUBLE
            | constants::SQLT_IBFLOAT
            | constants::SQLT_IBDOUBLE,
        ) => false,
        _ => column.scale == 0 && column.precision <= 18,
    }
}

fn output_type(fetch: FetchStrategy) -> DataType {
    match fetch {
        FetchStrategy::Int64 => DataType::Int64,
        FetchStrategy::Float64 => DataType::Float64,
        FetchStrategy::Text => DataType::Utf8,
        FetchStrategy::Bytes | FetchStrategy::HexText => DataType::Binary,
        FetchStrategy::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        FetchStrategy::Vector => {
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
        }
    }
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
