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

//! Server version detection and the capabilities derived from it.

use std::fmt;

use orabridge_core::error::{Error, Result, Status};

/// Remote server release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a dotted release number such as `23.4.0.24.05`, either bare or
    /// embedded in a banner (`Oracle Database 19c ... Version 19.3.0.0.0`).
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || {
            Error::with_message_and_status(
                format!("Invalid server version: {input}"),
                Status::InvalidData,
            )
        };
        let token = input
            .split_whitespace()
            .find(|token| {
                token.contains('.') && token.starts_with(|c: char| c.is_ascii_digit())
            })
            .ok_or_else(invalid)?;
        let mut parts = token.split('.').map(|part| part.parse::<u32>());
        let major = parts.next().and_then(|part| part.ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|part| part.ok()).ok_or_else(invalid)?;
        let patch = parts.next().and_then(|part| part.ok()).unwrap_or(0);
        Ok(Self::new(major, minor, patch))
    }

    pub fn at_least(&self, other: &ServerVersion) -> bool {
        self >= other
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Server features that change how columns are converted.
///
/// [`Capabilities::default`] is the conservative "nothing supported" set used
/// until (or when failing) to detect the server version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Native JSON column type (21c and later).
    pub json_type: bool,
    /// VECTOR column type (23ai and later).
    pub vector: bool,
    /// `VECTOR_SERIALIZE` (23.4 and later).
    pub vector_serialize: bool,
}

impl Capabilities {
    const JSON_TYPE: ServerVersion = ServerVersion::new(21, 0, 0);
    const VECTOR: ServerVersion = ServerVersion::new(23, 0, 0);
    const VECTOR_SERIALIZE: ServerVersion = ServerVersion::new(23, 4, 0);

    pub fn from_version(version: &ServerVersion) -> Self {
        Self {
            json_type: version.at_least(&Self::JSON_TYPE),
            vector: version.at_least(&Self::VECTOR),
            vector_serialize: version.at_least(&Self::VECTOR_SERIALIZE),
        }
    }
}
