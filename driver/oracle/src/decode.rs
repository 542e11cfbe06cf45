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

//! Decoding of fetched batch buffers into Arrow arrays.

use std::sync::Arc;

use arrow_array::{
    builder::{
        BinaryBuilder, Float64Builder, Int64Builder, ListBuilder, StringBuilder,
        TimestampMicrosecondBuilder,
    },
    ArrayRef,
};
use chrono::{NaiveDate, NaiveDateTime};

use orabridge_core::{
    error::{Error, Result, Status},
    sync::DefineBuffer,
};

use crate::classify::{ColumnPlan, FetchStrategy};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// One decoded column.
#[derive(Debug)]
pub struct DecodedColumn {
    pub array: ArrayRef,
    /// Some value was longer than the fetch buffer and was cut short.
    pub truncated: bool,
}

/// Decode the first `rows` rows of `buffer` as planned by `plan`.
pub fn decode_column(plan: &ColumnPlan, buffer: &DefineBuffer, rows: usize) -> Result<DecodedColumn> {
    if rows > buffer.capacity() {
        return Err(Error::with_message_and_status(
            format!(
                "fetch reported {rows} rows for column {} but its buffer holds {}",
                plan.name,
                buffer.capacity()
            ),
            Status::Fetch,
        ));
    }

    let mut truncated = false;
    let mut value = |row: usize| {
        let (bytes, clipped) = row_bytes(buffer, row)?;
        truncated |= clipped;
        Some((bytes, clipped))
    };

    let array: ArrayRef = match plan.fetch {
        FetchStrategy::Int64 => {
            let mut builder = Int64Builder::with_capacity(rows);
            for row in 0..rows {
                builder.append_option(word(buffer, row).map(i64::from_ne_bytes));
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::Float64 => {
            let mut builder = Float64Builder::with_capacity(rows);
            for row in 0..rows {
                builder.append_option(word(buffer, row).map(f64::from_ne_bytes));
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::Text => {
            let mut builder = StringBuilder::with_capacity(rows, rows * 16);
            for row in 0..rows {
                match value(row) {
                    Some((bytes, clipped)) => builder.append_value(text(plan, bytes, clipped)?),
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::Bytes => {
            let mut builder = BinaryBuilder::with_capacity(rows, rows * 16);
            for row in 0..rows {
                builder.append_option(value(row).map(|(bytes, _)| bytes));
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::HexText => {
            let mut builder = BinaryBuilder::with_capacity(rows, rows * 16);
            for row in 0..rows {
                match value(row) {
                    Some((bytes, _)) => {
                        let decoded = hex::decode(bytes).map_err(|error| {
                            decode_error(plan, format!("invalid hex value: {error}"))
                        })?;
                        builder.append_value(decoded);
                    }
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(rows);
            for row in 0..rows {
                match value(row) {
                    Some((bytes, clipped)) => {
                        let text = text(plan, bytes, clipped)?;
                        let timestamp = parse_timestamp(text).ok_or_else(|| {
                            decode_error(plan, format!("Failed to parse timestamp: {text}"))
                        })?;
                        builder.append_value(timestamp.and_utc().timestamp_micros());
                    }
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        FetchStrategy::Vector => {
            let mut builder = ListBuilder::new(Float64Builder::new());
            for row in 0..rows {
                match value(row) {
                    Some((bytes, clipped)) => {
                        let text = text(plan, bytes, clipped)?;
                        let elements: Vec<f64> = serde_json::from_str(text).map_err(|error| {
                            decode_error(plan, format!("invalid vector {text}: {error}"))
                        })?;
                        builder.values().append_slice(&elements);
                        builder.append(true);
                    }
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(DecodedColumn { array, truncated })
}

/// Parse the text form of a date or timestamp. A value that does not parse as
/// is is retried without its fractional seconds and anything after them.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let parse = |text: &str| {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    };
    let text = text.trim();
    parse(text).or_else(|| {
        let (seconds, _) = text.split_once('.')?;
        parse(seconds)
    })
}

/// Bytes of `row` clipped to the buffer width, with whether the clip cut the
/// value short, or `None` for a null.
fn row_bytes(buffer: &DefineBuffer, row: usize) -> Option<(&[u8], bool)> {
    if buffer.is_null(row) {
        return None;
    }
    let length = buffer.lengths[row] as usize;
    Some((&buffer.slot(row)[..length.min(buffer.width)], length > buffer.width))
}

/// The fixed 8-byte slot of a numeric row. Lengths are not consulted.
fn word(buffer: &DefineBuffer, row: usize) -> Option<[u8; 8]> {
    if buffer.is_null(row) {
        return None;
    }
    buffer.slot(row).get(..8)?.try_into().ok()
}

fn text<'a>(plan: &ColumnPlan, bytes: &'a [u8], clipped: bool) -> Result<&'a str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text),
        // A clip may split the last character.
        Err(error) if clipped && error.error_len().is_none() => {
            std::str::from_utf8(&bytes[..error.valid_up_to()])
                .map_err(|error| decode_error(plan, error))
        }
        Err(error) => Err(decode_error(plan, error)),
    }
}

fn decode_error(plan: &ColumnPlan, message: impl std::fmt::Display) -> Error {
    Error::with_message_and_status(
        format!("decode column {}: {message}", plan.name),
        Status::Decode,
    )
}

#[cfg(test)]
mod tests {
    use arrow_array::{
        cast::AsArray,
        types::{Float64Type, Int64Type, TimestampMicrosecondType},
        Array,
    };
    use chrono::Timelike;
    use orabridge_core::{
        constants,
        sync::{ColumnDescription, DefineKind, NULL_INDICATOR},
    };

    use crate::{settings::Settings, version::Capabilities};

    use super::*;

    fn plan(column: ColumnDescription) -> ColumnPlan {
        ColumnPlan::new(&column, &Capabilities::default(), &Settings::default())
    }

    fn fill(buffer: &mut DefineBuffer, values: &[Option<&[u8]>]) {
        for (row, value) in values.iter().enumerate() {
            match value {
                Some(bytes) => {
                    let copied = bytes.len().min(buffer.width);
                    buffer.slot_mut(row)[..copied].copy_from_slice(&bytes[..copied]);
                    buffer.indicators[row] = 0;
                    buffer.lengths[row] = bytes.len() as u32;
                }
                None => buffer.indicators[row] = NULL_INDICATOR,
            }
        }
    }

    #[test]
    fn mixed_nulls() {
        let plan = plan(ColumnDescription::new("NAME", constants::SQLT_CHR).with_char_size(8));
        let mut buffer = DefineBuffer::new(DefineKind::Text, plan.width, 4);
        fill(
            &mut buffer,
            &[Some(b"alpha"), None, Some(b""), Some(b"delta")],
        );
        let decoded = decode_column(&plan, &buffer, 4).unwrap();
        assert!(!decoded.truncated);
        let strings = decoded.array.as_string::<i32>();
        assert_eq!(strings.len(), 4);
        assert_eq!(strings.value(0), "alpha");
        assert!(strings.is_null(1));
        assert!(strings.is_valid(2));
        assert_eq!(strings.value(2), "");
        assert_eq!(strings.value(3), "delta");
    }

    #[test]
    fn fixed_width_numbers() {
        let ints = plan(ColumnDescription::new("ID", constants::SQLT_INT));
        let mut buffer = DefineBuffer::new(DefineKind::Int64, 8, 3);
        fill(
            &mut buffer,
            &[Some(&7i64.to_ne_bytes()), None, Some(&(-3i64).to_ne_bytes())],
        );
        // Only the rows reported by the fetch are decoded.
        let decoded = decode_column(&ints, &buffer, 2).unwrap();
        let values = decoded.array.as_primitive::<Int64Type>();
        assert_eq!(values.len(), 2);
        assert_eq!(values.value(0), 7);
        assert!(values.is_null(1));

        let floats = plan(ColumnDescription::new("X", constants::SQLT_BDOUBLE));
        let mut buffer = DefineBuffer::new(DefineKind::Float64, 8, 1);
        fill(&mut buffer, &[Some(&2.5f64.to_ne_bytes())]);
        let decoded = decode_column(&floats, &buffer, 1).unwrap();
        assert_eq!(decoded.array.as_primitive::<Float64Type>().value(0), 2.5);
    }

    #[test]
    fn numbers_ignore_reported_lengths() {
        let ints = plan(ColumnDescription::new("ID", constants::SQLT_INT));
        let mut buffer = DefineBuffer::new(DefineKind::Int64, 8, 2);
        buffer.slot_mut(0).copy_from_slice(&42i64.to_ne_bytes());
        buffer.slot_mut(1).copy_from_slice(&7i64.to_ne_bytes());
        buffer.indicators.fill(0);
        buffer.lengths.fill(0);
        let decoded = decode_column(&ints, &buffer, 2).unwrap();
        assert_eq!(
            decoded.array.as_primitive::<Int64Type>().values().to_vec(),
            vec![42, 7]
        );
        assert!(!decoded.truncated);
    }

    #[test]
    fn truncated_values_are_clipped() {
        let plan = plan(ColumnDescription::new("NAME", constants::SQLT_CHR).with_char_size(4));
        let mut buffer = DefineBuffer::new(DefineKind::Text, 4, 1);
        fill(&mut buffer, &[Some(b"abcdefgh")]);
        let decoded = decode_column(&plan, &buffer, 1).unwrap();
        assert!(decoded.truncated);
        assert_eq!(decoded.array.as_string::<i32>().value(0), "abcd");
    }

    #[test]
    fn clipped_text_keeps_whole_characters() {
        let plan = plan(ColumnDescription::new("NAME", constants::SQLT_CHR).with_char_size(1));
        let mut buffer = DefineBuffer::new(DefineKind::Text, 2, 2);
        fill(&mut buffer, &[Some("aé".as_bytes()), Some("é".as_bytes())]);
        let decoded = decode_column(&plan, &buffer, 2).unwrap();
        assert!(decoded.truncated);
        let strings = decoded.array.as_string::<i32>();
        assert_eq!(strings.value(0), "a");
        assert_eq!(strings.value(1), "é");

        // Bytes that were not clipped must still be valid.
        let mut buffer = DefineBuffer::new(DefineKind::Text, 2, 1);
        fill(&mut buffer, &[Some(&[b'a', 0xc3])]);
        let error = decode_column(&plan, &buffer, 1).unwrap_err();
        assert_eq!(error.status, Status::Decode);
    }

    #[test]
    fn rows_beyond_the_buffer_are_rejected() {
        let plan = plan(ColumnDescription::new("ID", constants::SQLT_INT));
        let buffer = DefineBuffer::new(DefineKind::Int64, 8, 2);
        let error = decode_column(&plan, &buffer, 3).unwrap_err();
        assert_eq!(error.status, Status::Fetch);
        assert!(error.message.contains("buffer holds 2"));
    }

    #[test]
    fn timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(12, 30, 5, 250_000)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 12:30:05.25"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01 12:30:05.250000 +02:00"),
            Some(expected.with_nanosecond(0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("01-MAR-24"), None);

        let plan = plan(ColumnDescription::new("AT", constants::SQLT_TIMESTAMP));
        let mut buffer = DefineBuffer::new(DefineKind::Text, plan.width, 2);
        fill(&mut buffer, &[Some(b"2024-03-01 12:30:05.25"), None]);
        let decoded = decode_column(&plan, &buffer, 2).unwrap();
        let values = decoded.array.as_primitive::<TimestampMicrosecondType>();
        assert_eq!(values.value(0), expected.and_utc().timestamp_micros());
        assert!(values.is_null(1));

        fill(&mut buffer, &[Some(b"yesterday")]);
        let error = decode_column(&plan, &buffer, 1).unwrap_err();
        assert_eq!(error.status, Status::Decode);
        assert!(error.message.contains("Failed to parse timestamp"));
    }

    #[test]
    fn hex_and_vectors() {
        let settings = Settings {
            try_native_lobs: false,
            lob_max_size: 64,
            ..Default::default()
        };
        let capabilities = Capabilities::default();
        let raw = ColumnPlan::new(
            &ColumnDescription::new("ID", constants::SQLT_BIN).with_char_size(4),
            &capabilities,
            &settings,
        );
        let mut buffer = DefineBuffer::new(DefineKind::Text, raw.width, 2);
        fill(&mut buffer, &[Some(b"DEADBEEF"), None]);
        let decoded = decode_column(&raw, &buffer, 2).unwrap();
        let binary = decoded.array.as_binary::<i32>();
        assert_eq!(binary.value(0), [0xde, 0xad, 0xbe, 0xef]);
        assert!(binary.is_null(1));

        let vector = ColumnPlan::new(
            &ColumnDescription::new("EMB", constants::SQLT_VEC),
            &capabilities,
            &settings,
        );
        let mut buffer = DefineBuffer::new(DefineKind::Text, vector.width, 2);
        fill(&mut buffer, &[Some(b"[1.5,-2,3.0E+000]"), None]);
        let decoded = decode_column(&vector, &buffer, 2).unwrap();
        let lists = decoded.array.as_list::<i32>();
        assert!(lists.is_null(1));
        let first = lists.value(0);
        assert_eq!(
            first.as_primitive::<Float64Type>().values().to_vec(),
            vec![1.5, -2.0, 3.0]
        );
    }
}
