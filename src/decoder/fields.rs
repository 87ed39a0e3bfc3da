//! Text-to-value conversions for field tags.
//!
//! Every conversion is strict: a value that does not parse fails the whole
//! decode, it is never replaced by a default.

use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::DecodeError;

/// Train Tracker timestamps, e.g. `20240618 23:26:12`.
const TRAIN_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S";
/// Bus Tracker timestamps, e.g. `20240618 23:26`.
const BUS_TIME_FORMAT: &str = "%Y%m%d %H:%M";

pub(crate) fn number<T>(tag: &str, text: &str) -> Result<T, DecodeError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.trim()
        .parse::<T>()
        .map_err(|e| DecodeError::InvalidNumber {
            tag: tag.to_string(),
            value: text.to_string(),
            source: Box::new(e),
        })
}

/// Accepts `0`/`1` and `true`/`false` (any case); everything else is an error.
pub(crate) fn boolean(tag: &str, text: &str) -> Result<bool, DecodeError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(DecodeError::InvalidBoolean {
            tag: tag.to_string(),
            value: text.to_string(),
        }),
    }
}

fn time(tag: &str, text: &str, format: &str) -> Result<NaiveDateTime, DecodeError> {
    NaiveDateTime::parse_from_str(text.trim(), format).map_err(|source| {
        DecodeError::InvalidDate {
            tag: tag.to_string(),
            value: text.to_string(),
            source,
        }
    })
}

pub(crate) fn train_time(tag: &str, text: &str) -> Result<NaiveDateTime, DecodeError> {
    time(tag, text, TRAIN_TIME_FORMAT)
}

pub(crate) fn bus_time(tag: &str, text: &str) -> Result<NaiveDateTime, DecodeError> {
    time(tag, text, BUS_TIME_FORMAT)
}
