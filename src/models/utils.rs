//! Helpers over model instances

use super::{ModelInstance, Record};
use crate::error::Result;
use crate::value::Value;

/// Deep copy of an instance with its stored errors dropped
pub fn clone_model<T: ModelInstance>(model: &T) -> T {
    let mut copy = model.clone();
    copy.clear_errors();
    copy
}

/// Internal values of the declared fields as plain JSON, with no field
/// conversion. Nested records and sets are unwrapped the same way.
pub fn model_to_raw(value: &Value) -> serde_json::Value {
    match value {
        Value::Record(record) => {
            let mut raw = serde_json::Map::new();
            for name in record.model().fields().keys() {
                if let Some(value) = record.get(name) {
                    raw.insert(name.clone(), model_to_raw(value));
                }
            }
            serde_json::Value::Object(raw)
        }
        Value::Set(set) => serde_json::Value::Array(
            set.iter()
                .map(|record| model_to_raw(&Value::Record(record.clone())))
                .collect(),
        ),
        other => other.to_json(),
    }
}

/// Shallow-assign converted `data` onto `record`; properties absent from
/// `data` are left as they are
pub fn assign_model(record: &mut Record, data: &Value) -> Result<()> {
    let internal = record.model().to_internal_value(data)?;
    record.values_mut().extend(internal);
    Ok(())
}

/// True for record and record set values
pub fn is_model(value: &Value) -> bool {
    matches!(value, Value::Record(_) | Value::Set(_))
}
