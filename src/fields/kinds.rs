//! Per-kind behavior: conversion, defaults and kind-level checks.
//!
//! Kind checks live in constant tables and run before a field's own
//! validators.

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use std::str::FromStr;
use std::sync::Arc;

use super::{DeclaredType, Field, Temporal};
use crate::error::{Result, SchemaError};
use crate::validators::ValidateError;
use crate::value::Value;

/// Kind of a field, with kind-specific configuration
#[derive(Debug, Clone)]
pub enum FieldKind {
    Any,
    String,
    Integer,
    Float,
    Boolean,
    Decimal,
    Temporal(Temporal),
    Enum,
    Nested,
    List(Arc<Field>),
}

pub(crate) type Check = fn(&Field, &Value) -> Result<Option<ValidateError>>;

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Decimal => "decimal",
            FieldKind::Temporal(_) => "temporal",
            FieldKind::Enum => "enum",
            FieldKind::Nested => "nested",
            FieldKind::List(_) => "list",
        }
    }

    pub(crate) fn checks(&self) -> &'static [Check] {
        match self {
            FieldKind::Any => NO_CHECKS,
            FieldKind::String => STRING_CHECKS,
            FieldKind::Integer => INTEGER_CHECKS,
            FieldKind::Float => FLOAT_CHECKS,
            FieldKind::Boolean => BOOLEAN_CHECKS,
            FieldKind::Decimal => DECIMAL_CHECKS,
            FieldKind::Temporal(_) => TEMPORAL_CHECKS,
            FieldKind::Enum => ENUM_CHECKS,
            FieldKind::Nested => NESTED_CHECKS,
            FieldKind::List(_) => LIST_CHECKS,
        }
    }
}

const NO_CHECKS: &[Check] = &[];
const STRING_CHECKS: &[Check] = &[is_string];
const INTEGER_CHECKS: &[Check] = &[is_integer];
const FLOAT_CHECKS: &[Check] = &[is_number];
const BOOLEAN_CHECKS: &[Check] = &[is_boolean];
const DECIMAL_CHECKS: &[Check] = &[is_decimal];
const TEMPORAL_CHECKS: &[Check] = &[is_temporal];
const ENUM_CHECKS: &[Check] = &[is_member];
const NESTED_CHECKS: &[Check] = &[nested_is_valid];
const LIST_CHECKS: &[Check] = &[is_sequence, items_are_valid];

fn fail(message: impl Into<String>) -> Result<Option<ValidateError>> {
    Ok(Some(ValidateError::message(message)))
}

fn is_string(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Str(_) => Ok(None),
        _ => fail("Not a valid string."),
    }
}

/// `f` as an `i64` when it is whole and inside the `i64` range
fn whole_i64(f: f64) -> Option<i64> {
    // 2^63; i64::MAX itself is not representable as f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

fn is_integer(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Int(_) => Ok(None),
        Value::Float(f) if whole_i64(*f).is_some() => Ok(None),
        _ => fail("A valid integer is required."),
    }
}

fn is_number(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(None),
        _ => fail("A valid number is required."),
    }
}

fn is_boolean(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Bool(_) => Ok(None),
        _ => fail("Must be a valid boolean."),
    }
}

fn is_decimal(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Decimal(_) => Ok(None),
        _ => fail("A valid decimal is required."),
    }
}

fn is_temporal(field: &Field, value: &Value) -> Result<Option<ValidateError>> {
    let FieldKind::Temporal(temporal) = field.kind() else {
        return Ok(None);
    };
    let valid = match temporal.kind() {
        super::TemporalKind::Timestamp => matches!(value, Value::Int(_)),
        super::TemporalKind::DateTime => matches!(value, Value::DateTime(_)),
        super::TemporalKind::Date => matches!(value, Value::Date(_)),
    };
    if valid {
        Ok(None)
    } else {
        fail(format!("Not a valid {}.", value_label(temporal)))
    }
}

fn value_label(temporal: &Temporal) -> &'static str {
    match temporal.kind() {
        super::TemporalKind::Timestamp => "timestamp",
        super::TemporalKind::DateTime => "datetime",
        super::TemporalKind::Date => "date",
    }
}

fn is_member(field: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match field.ty() {
        Some(DeclaredType::Enum(ty)) if ty.contains(value) => Ok(None),
        Some(DeclaredType::Enum(ty)) => fail(format!("{value} is not a valid {}.", ty.name())),
        _ => Err(SchemaError::configuration("enum field is not bound to an enumeration")),
    }
}

fn nested_is_valid(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::Record(record) => record.run_validators(),
        Value::Set(set) => set.run_validators(),
        other => fail(format!("Expected a model instance, got {}.", other.type_name())),
    }
}

fn is_sequence(_: &Field, value: &Value) -> Result<Option<ValidateError>> {
    match value {
        Value::List(_) => Ok(None),
        other => fail(format!("Expected a list of items but got type \"{}\".", other.type_name())),
    }
}

fn items_are_valid(field: &Field, value: &Value) -> Result<Option<ValidateError>> {
    let (Some(child), Value::List(items)) = (field.child(), value) else {
        return Ok(None);
    };
    let mut errors = IndexMap::new();
    for (index, item) in items.iter().enumerate() {
        if let Some(error) = child.run_validators(Some(item))? {
            errors.insert(index.to_string(), error);
        }
    }
    if errors.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ValidateError::Fields(errors)))
    }
}

pub(crate) fn to_internal(field: &Field, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match field.kind() {
        FieldKind::Integer => Ok(match value {
            Value::Float(f) => whole_i64(*f).map_or(Value::Float(*f), Value::Int),
            other => other.clone(),
        }),
        FieldKind::Float => Ok(match value {
            Value::Int(i) => Value::Float(*i as f64),
            other => other.clone(),
        }),
        FieldKind::Decimal => match value {
            Value::Str(s) => BigDecimal::from_str(s.trim())
                .map(Value::Decimal)
                .map_err(|e| SchemaError::conversion("decimal", format!("'{s}': {e}"))),
            Value::Int(i) => Ok(Value::Decimal(BigDecimal::from(*i))),
            Value::Float(f) => BigDecimal::from_str(&f.to_string())
                .map(Value::Decimal)
                .map_err(|e| SchemaError::conversion("decimal", format!("{f}: {e}"))),
            other => Ok(other.clone()),
        },
        FieldKind::Temporal(temporal) => temporal.to_internal(value),
        FieldKind::Nested => nested_to_internal(field, value),
        FieldKind::List(child) => match value {
            Value::List(items) => items
                .iter()
                .map(|item| child.to_internal_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            other => Ok(other.clone()),
        },
        FieldKind::Any | FieldKind::String | FieldKind::Boolean | FieldKind::Enum => {
            Ok(value.clone())
        }
    }
}

fn nested_to_internal(field: &Field, value: &Value) -> Result<Value> {
    match field.ty() {
        Some(DeclaredType::Model(model)) => match value {
            Value::Record(record) if record.is_instance_of(model) => Ok(value.clone()),
            Value::Record(_) | Value::Map(_) => model.init(Some(value.clone())).map(Value::Record),
            other => Err(SchemaError::Type(format!(
                "{} field expects a map, got {}",
                model.name(),
                other.type_name()
            ))),
        },
        Some(DeclaredType::Set(set)) => match value {
            Value::Set(records) if records.is_instance_of(set) => Ok(value.clone()),
            Value::Set(records) => set
                .init(Some(Value::List(
                    records.iter().cloned().map(Value::Record).collect(),
                )))
                .map(Value::Set),
            other => set.init(Some(other.clone())).map(Value::Set),
        },
        _ => Err(SchemaError::configuration("nested field is not bound to a model")),
    }
}

pub(crate) fn to_representation(field: &Field, value: &Value) -> Result<serde_json::Value> {
    if value.is_null() {
        return Ok(serde_json::Value::Null);
    }
    match field.kind() {
        FieldKind::Decimal => Ok(match value {
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            other => other.to_json(),
        }),
        FieldKind::Temporal(temporal) => temporal.to_representation(value),
        FieldKind::Nested => match value {
            Value::Record(record) => record.to_representation(),
            Value::Set(set) => set.to_representation(),
            other => Err(SchemaError::Type(format!(
                "nested field holds {} instead of a model instance",
                other.type_name()
            ))),
        },
        FieldKind::List(child) => match value {
            Value::List(items) => items
                .iter()
                .map(|item| child.to_representation(item))
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
            other => Ok(other.to_json()),
        },
        FieldKind::Any
        | FieldKind::String
        | FieldKind::Integer
        | FieldKind::Float
        | FieldKind::Boolean
        | FieldKind::Enum => Ok(value.to_json()),
    }
}

pub(crate) fn kind_default(field: &Field) -> Result<Option<Value>> {
    Ok(match field.kind() {
        FieldKind::Any | FieldKind::Enum => None,
        FieldKind::String => Some(Value::Str(String::new())),
        FieldKind::Integer => Some(Value::Int(0)),
        FieldKind::Float => Some(Value::Float(0.0)),
        FieldKind::Boolean => Some(Value::Bool(false)),
        FieldKind::Decimal => Some(Value::Decimal(BigDecimal::from(0))),
        FieldKind::Temporal(temporal) => Some(temporal.now()?),
        FieldKind::Nested => match field.ty() {
            Some(DeclaredType::Model(model)) => Some(Value::Record(model.init(None)?)),
            Some(DeclaredType::Set(set)) => Some(Value::Set(set.init(None)?)),
            _ => return Err(SchemaError::configuration("nested field is not bound to a model")),
        },
        FieldKind::List(_) => Some(Value::List(Vec::new())),
    })
}
