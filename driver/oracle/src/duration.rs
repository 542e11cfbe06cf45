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

//! Parsing of timeout settings.
//!
//! Accepts a bare integer (milliseconds) or a sequence of `<number><unit>`
//! parts such as `500ms`, `10s`, `1m30s` or `1.5h`.

use std::{sync::LazyLock, time::Duration};

use orabridge_core::error::{Error, Result, Status};
use regex::Regex;

static PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<value>[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?P<unit>ms|s|m|h)").expect("valid regex")
});

fn invalid(input: &str) -> Error {
    Error::with_message_and_status(
        format!("invalid duration: {input} (expected milliseconds or a value with unit ms, s, m or h, such as 500ms, 10s, 1m30s)"),
        Status::InvalidArguments,
    )
}

/// Parse the given string to a [`Duration`].
pub(crate) fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    if let Ok(millis) = trimmed.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    if trimmed.is_empty() {
        return Err(invalid(input));
    }

    let mut rest = trimmed;
    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let caps = PART.captures(rest).ok_or_else(|| invalid(input))?;
        let value: f64 = caps["value"].parse().map_err(|_| invalid(input))?;
        let seconds = match &caps["unit"] {
            "ms" => value / 1e3,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return Err(invalid(input)),
        };
        total += Duration::try_from_secs_f64(seconds).map_err(|_| invalid(input))?;
        rest = &rest[caps[0].len()..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("2500"), Ok(Duration::from_millis(2500)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration(" 10s "), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(".5s"), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn parse_errors() {
        for input in ["", "forever", "10x", "s", "-5s", "1m 30s"] {
            let error = parse_duration(input).unwrap_err();
            assert_eq!(error.status, Status::InvalidArguments, "{input}");
        }
    }
}
