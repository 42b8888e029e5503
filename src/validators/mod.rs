//! Validators and validation error payloads
//!
//! A validator is a plain function `(value, field) -> Ok(()) | Err(payload)`.
//! Payloads nest: a model reports a map of field name to payload, a list
//! field a map of index to payload, a model set a list of element payloads.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::fields::Field;
use crate::value::Value;

/// Structured validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValidateError {
    Message(String),
    Messages(Vec<String>),
    Fields(IndexMap<String, ValidateError>),
    Items(Vec<ValidateError>),
}

impl ValidateError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Nested payload for a field name or list index
    pub fn get(&self, key: &str) -> Option<&ValidateError> {
        match self {
            ValidateError::Fields(map) => map.get(key),
            ValidateError::Items(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Number of direct entries carried by the payload
    pub fn len(&self) -> usize {
        match self {
            ValidateError::Message(_) => 1,
            ValidateError::Messages(messages) => messages.len(),
            ValidateError::Fields(map) => map.len(),
            ValidateError::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateError::Message(message) => write!(f, "{}", message),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for ValidateError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for ValidateError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Vec<String>> for ValidateError {
    fn from(messages: Vec<String>) -> Self {
        Self::Messages(messages)
    }
}

/// Outcome of a single validator
pub type ValidatorResult = std::result::Result<(), ValidateError>;

/// Instance-level validator attached to a field
pub type Validator = Arc<dyn Fn(&Value, &Field) -> ValidatorResult + Send + Sync>;

/// Wrap a closure as a [`Validator`]
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Value, &Field) -> ValidatorResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a validator from a predicate and a fixed message
pub fn predicate<F>(message: impl Into<String>, f: F) -> Validator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    let message = message.into();
    validator(move |value, _| {
        if f(value) {
            Ok(())
        } else {
            Err(ValidateError::Message(message.clone()))
        }
    })
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Str(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        Value::Set(set) => Some(set.len()),
        _ => None,
    }
}

//
// Length
//

pub fn min_len(min: usize) -> Validator {
    len_range(Some(min), None)
}

pub fn max_len(max: usize) -> Validator {
    len_range(None, Some(max))
}

/// Inclusive length bounds for strings and collections
pub fn len_range(min: Option<usize>, max: Option<usize>) -> Validator {
    validator(move |value, _| {
        let Some(len) = length_of(value) else {
            return Err(format!("{} has no length", value.type_name()).into());
        };
        if let Some(min) = min {
            if len < min {
                return Err(format!("length ({len}) is lower than minimum of {min}").into());
            }
        }
        if let Some(max) = max {
            if len > max {
                return Err(format!("length ({len}) is greater than maximum of {max}").into());
            }
        }
        Ok(())
    })
}

//
// Numeric
//

pub fn min(min: f64) -> Validator {
    validator(move |value, _| match value.as_f64() {
        Some(n) if n >= min => Ok(()),
        Some(n) => Err(format!("{n} is lower than minimum of {min}").into()),
        None => Err(format!("{} is not a number", value.type_name()).into()),
    })
}

pub fn max(max: f64) -> Validator {
    validator(move |value, _| match value.as_f64() {
        Some(n) if n <= max => Ok(()),
        Some(n) => Err(format!("{n} is greater than maximum of {max}").into()),
        None => Err(format!("{} is not a number", value.type_name()).into()),
    })
}

//
// Text
//

/// String must match `pattern`; an invalid pattern is reported by every call
pub fn pattern(pattern: &str) -> Validator {
    let compiled = Regex::new(pattern).map_err(|e| e.to_string());
    let source = pattern.to_string();
    validator(move |value, _| {
        let regex = compiled
            .as_ref()
            .map_err(|e| ValidateError::message(format!("invalid pattern '{source}': {e}")))?;
        match value.as_str() {
            Some(s) if regex.is_match(s) => Ok(()),
            Some(s) => Err(format!("'{s}' does not match pattern '{source}'").into()),
            None => Err(format!("{} is not a string", value.type_name()).into()),
        }
    })
}

pub fn email() -> Validator {
    let check = pattern(r"^\S+@\S+\.\S+$");
    validator(move |value, field| check(value, field).map_err(|_| "Invalid email".into()))
}

pub fn url() -> Validator {
    predicate("URL must start with 'http://' or 'https://'", |value| {
        value
            .as_str()
            .is_some_and(|s| s.starts_with("http://") || s.starts_with("https://"))
    })
}

//
// Membership
//

pub fn one_of<I, V>(allowed: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    validator(move |value, _| {
        if allowed.contains(value) {
            Ok(())
        } else {
            Err(format!("{value} is not one of the allowed values").into())
        }
    })
}
