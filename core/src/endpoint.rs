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

//! Remote endpoint addresses.
//!
//! An endpoint is written `user/password@connect_descriptor`. The user ends at
//! the first `/`; the descriptor starts after the first `@` that follows it, so
//! passwords may contain `/` but not `@`.

use std::{fmt, str::FromStr};

use crate::error::{Error, Result, Status};

const INVALID: &str = "Invalid connection string. Expected user/password@connect_identifier";

/// Credentials and address of one remote database.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    user: String,
    password: String,
    descriptor: String,
}

impl Endpoint {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Parse `user/password@connect_descriptor`.
    ///
    /// Fails before any network activity when a part is missing.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::with_message_and_status(INVALID, Status::InvalidArguments);
        let slash = input.find('/').filter(|&pos| pos > 0).ok_or_else(invalid)?;
        let at = input[slash..]
            .find('@')
            .map(|pos| pos + slash)
            .ok_or_else(invalid)?;
        if at <= slash + 1 || at == input.len() - 1 {
            return Err(invalid());
        }
        Ok(Self::new(
            &input[..slash],
            &input[slash + 1..at],
            &input[at + 1..],
        ))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Identity used to key connection pools.
    pub fn key(&self) -> String {
        format!("{}/{}@{}", self.user, self.password, self.descriptor)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HIDDEN: &str = "*****";
        f.debug_struct("Endpoint")
            .field("user", &self.user)
            .field("password", &HIDDEN)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.descriptor)
    }
}
