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

//! Remote type codes and option keys.

/// Remote external datatype code as reported by a describe.
pub type TypeCode = u16;

pub const SQLT_CHR: TypeCode = 1;
pub const SQLT_NUM: TypeCode = 2;
pub const SQLT_INT: TypeCode = 3;
pub const SQLT_FLT: TypeCode = 4;
pub const SQLT_STR: TypeCode = 5;
pub const SQLT_VNU: TypeCode = 6;
pub const SQLT_LNG: TypeCode = 8;
pub const SQLT_VCS: TypeCode = 9;
pub const SQLT_DAT: TypeCode = 12;
pub const SQLT_BFLOAT: TypeCode = 21;
pub const SQLT_BDOUBLE: TypeCode = 22;
pub const SQLT_BIN: TypeCode = 23;
pub const SQLT_LBI: TypeCode = 24;
pub const SQLT_UIN: TypeCode = 68;
pub const SQLT_LVC: TypeCode = 94;
pub const SQLT_LVB: TypeCode = 95;
pub const SQLT_AFC: TypeCode = 96;
pub const SQLT_AVC: TypeCode = 97;
pub const SQLT_IBFLOAT: TypeCode = 100;
pub const SQLT_IBDOUBLE: TypeCode = 101;
pub const SQLT_RDD: TypeCode = 104;
pub const SQLT_NTY: TypeCode = 108;
pub const SQLT_CLOB: TypeCode = 112;
pub const SQLT_BLOB: TypeCode = 113;
pub const SQLT_BFILE: TypeCode = 114;
pub const SQLT_JSON: TypeCode = 119;
pub const SQLT_VEC: TypeCode = 127;
pub const SQLT_DATE: TypeCode = 184;
pub const SQLT_TIMESTAMP: TypeCode = 187;
pub const SQLT_TIMESTAMP_TZ: TypeCode = 188;
pub const SQLT_INTERVAL_YM: TypeCode = 189;
pub const SQLT_INTERVAL_DS: TypeCode = 190;
pub const SQLT_TIMESTAMP_LTZ: TypeCode = 232;

/// Character size assumed when a describe reports none.
pub const DEFAULT_CHAR_SIZE: u32 = 4000;

pub const OPTION_ENABLE_PUSHDOWN: &str = "enable_pushdown";
pub const OPTION_PREFETCH_ROWS: &str = "prefetch_rows";
pub const OPTION_PREFETCH_MEMORY: &str = "prefetch_memory";
pub const OPTION_ARRAY_SIZE: &str = "array_size";
pub const OPTION_CONNECTION_CACHE: &str = "connection_cache";
pub const OPTION_CONNECTION_LIMIT: &str = "connection_limit";
pub const OPTION_ACQUIRE_TIMEOUT: &str = "acquire_timeout";
pub const OPTION_DEBUG_SHOW_QUERIES: &str = "debug_show_queries";
pub const OPTION_LAZY_SCHEMA_LOADING: &str = "lazy_schema_loading";
pub const OPTION_USE_CURRENT_SCHEMA: &str = "use_current_schema";
pub const OPTION_METADATA_OBJECT_TYPES: &str = "metadata_object_types";
pub const OPTION_METADATA_RESULT_LIMIT: &str = "metadata_result_limit";
pub const OPTION_TRY_NATIVE_LOBS: &str = "try_native_lobs";
pub const OPTION_LOB_MAX_SIZE: &str = "lob_max_size";
pub const OPTION_VECTOR_TO_LIST: &str = "vector_to_list";
pub const OPTION_ENABLE_TYPE_CONVERSION: &str = "enable_type_conversion";
