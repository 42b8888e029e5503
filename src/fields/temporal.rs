//! Temporal field support
//!
//! Timestamp fields hold epoch milliseconds, datetime fields a
//! `DateTime<FixedOffset>` and date fields a `NaiveDate`. Representation
//! projects into the configured timezone and formats with one of the named
//! formats or a strftime pattern.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, Utc};
use std::fmt::Write;

use crate::config;
use crate::error::{Result, SchemaError};
use crate::value::Value;

const DATETIME_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";
const DATE_PATTERN: &str = "%Y-%m-%d";

/// Internal value shape of a temporal field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Timestamp,
    DateTime,
    Date,
}

impl TemporalKind {
    fn label(self) -> &'static str {
        match self {
            TemporalKind::Timestamp => "timestamp",
            TemporalKind::DateTime => "datetime",
            TemporalKind::Date => "date",
        }
    }
}

/// Representation format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    /// Epoch milliseconds
    Timestamp,
    /// ISO-8601 with milliseconds and offset
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    /// strftime pattern
    Pattern(String),
}

impl Format {
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "timestamp" => Ok(Format::Timestamp),
            "datetime" => Ok(Format::DateTime),
            "date" => Ok(Format::Date),
            pattern => {
                if pattern.is_empty()
                    || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
                {
                    return Err(SchemaError::configuration(format!(
                        "invalid date format pattern '{pattern}'"
                    )));
                }
                Ok(Format::Pattern(pattern.to_string()))
            }
        }
    }
}

/// Timezone a value is projected into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    Fixed(FixedOffset),
    Local,
}

impl Timezone {
    /// Accepts `UTC`, `Z`, `local` and numeric offsets (`+08:00`, `-0530`, `+02`).
    /// Named zones need a tz database and are rejected.
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || {
            SchemaError::configuration(format!(
                "timezone '{name}' cannot be represented; use UTC, local or a fixed offset"
            ))
        };
        match name {
            "UTC" | "utc" | "Z" | "GMT" => return Ok(Timezone::Fixed(utc_offset())),
            "local" | "Local" => return Ok(Timezone::Local),
            _ => {}
        }

        let (sign, rest) = match name.as_bytes().first() {
            Some(b'+') => (1, &name[1..]),
            Some(b'-') => (-1, &name[1..]),
            _ => return Err(invalid()),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
            4 => (
                digits[..2].parse::<i32>().map_err(|_| invalid())?,
                digits[2..].parse::<i32>().map_err(|_| invalid())?,
            ),
            _ => return Err(invalid()),
        };
        if minutes >= 60 {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Timezone::Fixed)
            .ok_or_else(invalid)
    }

    pub fn project(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Timezone::Fixed(offset) => instant.with_timezone(offset),
            Timezone::Local => instant.with_timezone(&Local).fixed_offset(),
        }
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Format and timezone configuration of a temporal field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Temporal {
    kind: TemporalKind,
    format: String,
    timezone: Option<String>,
}

impl Temporal {
    /// New configuration seeded from the installed field settings.
    ///
    /// Date fields default to the `date` format and never pick up the
    /// default timezone, since dates carry none.
    pub fn new(kind: TemporalKind) -> Self {
        let settings = config::settings();
        match kind {
            TemporalKind::Date => Self {
                kind,
                format: "date".to_string(),
                timezone: None,
            },
            _ => Self {
                kind,
                format: settings.default_format,
                timezone: settings.default_timezone,
            },
        }
    }

    pub fn kind(&self) -> TemporalKind {
        self.kind
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub(crate) fn set_format(&mut self, format: impl Into<String>) {
        self.format = format.into();
    }

    pub(crate) fn set_timezone(&mut self, timezone: impl Into<String>) {
        self.timezone = Some(timezone.into());
    }

    /// Validate format and timezone
    pub fn check(&self) -> Result<()> {
        Format::parse(&self.format)?;
        if let Some(tz) = &self.timezone {
            if self.kind == TemporalKind::Date {
                return Err(SchemaError::configuration(format!(
                    "date fields carry no timezone; cannot apply '{tz}'"
                )));
            }
            Timezone::parse(tz)?;
        }
        Ok(())
    }

    fn zone(&self) -> Result<Option<Timezone>> {
        self.timezone.as_deref().map(Timezone::parse).transpose()
    }

    /// Current instant in this field's internal shape
    pub fn now(&self) -> Result<Value> {
        let now = Utc::now().fixed_offset();
        Ok(match self.kind {
            TemporalKind::Timestamp => Value::Int(now.timestamp_millis()),
            TemporalKind::DateTime => match self.zone()? {
                Some(zone) => Value::DateTime(zone.project(&now)),
                None => Value::DateTime(now),
            },
            TemporalKind::Date => Value::Date(now.date_naive()),
        })
    }

    pub fn to_internal(&self, value: &Value) -> Result<Value> {
        let label = self.kind.label();
        let instant = match value {
            Value::Null => return Ok(Value::Null),
            Value::Date(date) if self.kind == TemporalKind::Date => return Ok(Value::Date(*date)),
            Value::Str(s) if self.kind == TemporalKind::Date => {
                if let Ok(date) = NaiveDate::parse_from_str(s, DATE_PATTERN) {
                    return Ok(Value::Date(date));
                }
                parse_instant(s).ok_or_else(|| {
                    SchemaError::conversion(label, format!("'{s}' is not a parseable date"))
                })?
            }
            other => instant_of(other).ok_or_else(|| {
                SchemaError::conversion(label, format!("cannot read {} as an instant", other.type_name()))
            })?,
        };

        Ok(match self.kind {
            TemporalKind::Timestamp => Value::Int(instant.timestamp_millis()),
            TemporalKind::DateTime => match self.zone()? {
                Some(zone) => Value::DateTime(zone.project(&instant)),
                None => Value::DateTime(instant),
            },
            TemporalKind::Date => Value::Date(instant.date_naive()),
        })
    }

    pub fn to_representation(&self, value: &Value) -> Result<serde_json::Value> {
        let format = Format::parse(&self.format)?;
        let zone = self.zone()?;

        let instant = match value {
            Value::Null => return Ok(serde_json::Value::Null),
            Value::Date(date) => {
                if let Some(tz) = &self.timezone {
                    return Err(SchemaError::configuration(format!(
                        "date value {date} carries no timezone; cannot project into '{tz}'"
                    )));
                }
                date.and_hms_opt(0, 0, 0)
                    .map(|midnight| midnight.and_utc().fixed_offset())
                    .ok_or_else(|| SchemaError::conversion(self.kind.label(), "invalid date"))?
            }
            other => instant_of(other).ok_or_else(|| {
                SchemaError::conversion(
                    self.kind.label(),
                    format!("cannot format {} as an instant", other.type_name()),
                )
            })?,
        };
        let instant = match zone {
            Some(zone) => zone.project(&instant),
            None => instant,
        };

        let pattern = match format {
            Format::Timestamp => return Ok(serde_json::Value::from(instant.timestamp_millis())),
            Format::DateTime => DATETIME_PATTERN,
            Format::Date => DATE_PATTERN,
            Format::Pattern(ref pattern) => pattern.as_str(),
        };
        let mut out = String::new();
        write!(out, "{}", instant.format(pattern)).map_err(|_| {
            SchemaError::conversion(self.kind.label(), format!("cannot format with '{pattern}'"))
        })?;
        Ok(serde_json::Value::String(out))
    }
}

/// Interpret an internal or external value as an instant
fn instant_of(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Int(ms) => DateTime::from_timestamp_millis(*ms).map(|d| d.fixed_offset()),
        Value::Float(ms) => DateTime::from_timestamp_millis(*ms as i64).map(|d| d.fixed_offset()),
        Value::Str(s) => parse_instant(s),
        Value::DateTime(d) => Some(*d),
        Value::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().fixed_offset()),
        _ => None,
    }
}

/// RFC 3339 first, then naive datetimes and plain dates read as UTC
pub fn parse_instant(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d);
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, DATE_PATTERN)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().fixed_offset())
}
