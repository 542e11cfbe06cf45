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

//! Orabridge: Arrow-native access to remote relational databases
//!
//! The `core` library provides the vocabulary shared by the connector and
//! by native backends: errors, option keys, endpoint addresses, remote type
//! codes and the blocking native-client traits.
//!
//! # Native backends
//!
//! A native client library is made available to the connector by
//! implementing:
//! - [Driver]
//! - [Session]
//! - [Statement]

pub mod constants;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod sync;

pub use endpoint::Endpoint;
pub use sync::*;

/// Ability to configure an object by setting/getting options.
pub trait Optionable {
    type Option: AsRef<str>;

    /// Set an option.
    fn set_option(&mut self, key: Self::Option, value: options::OptionValue)
        -> error::Result<()>;

    /// Get a string option value by key.
    fn get_option_string(&self, key: Self::Option) -> error::Result<String>;

    /// Get an integer option value by key.
    fn get_option_int(&self, key: Self::Option) -> error::Result<i64>;

    /// Get a float option value by key.
    fn get_option_double(&self, key: Self::Option) -> error::Result<f64>;
}
