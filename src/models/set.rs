//! Model sets
//!
//! A [`ModelSet`] is a collection class bound to one element [`Model`]; a
//! [`RecordSet`] is an instance of it. Conversion and validation mirror the
//! model contract element by element.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use super::{Model, ModelInstance, Record};
use crate::error::{Result, SchemaError};
use crate::validators::ValidateError;
use crate::value::Value;

/// Collection class bound to a single element model
#[derive(Clone)]
pub struct ModelSet(Arc<SetDef>);

struct SetDef {
    name: String,
    model: Model,
}

impl ModelSet {
    /// Bind a set class to `model`
    pub fn from_model(model: &Model) -> Self {
        Self::named(format!("{}Set", model.name()), model)
    }

    pub fn named(name: impl Into<String>, model: &Model) -> Self {
        Self(Arc::new(SetDef {
            name: name.into(),
            model: model.clone(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Element model
    pub fn model(&self) -> &Model {
        &self.0.model
    }

    /// Create an instance, coercing `data` when given
    pub fn init(&self, data: Option<Value>) -> Result<RecordSet> {
        let items = match data {
            Some(data) if !data.is_null() => self.to_internal_value(&data)?,
            _ => Vec::new(),
        };
        Ok(RecordSet {
            set: self.clone(),
            items,
            errors: None,
        })
    }

    /// Coerce a list of elements.
    ///
    /// Instances of the element model pass through as they are; anything
    /// else is handed to the element model's `init`.
    pub fn to_internal_value(&self, data: &Value) -> Result<Vec<Record>> {
        let Value::List(items) = data else {
            return Err(SchemaError::Type(format!(
                "{} expects a list, got {}",
                self.name(),
                data.type_name()
            )));
        };
        items.iter().map(|item| self.coerce(item)).collect()
    }

    fn coerce(&self, item: &Value) -> Result<Record> {
        match item {
            Value::Record(record) if record.is_instance_of(self.model()) => Ok(record.clone()),
            other => self.model().init(Some(other.clone())),
        }
    }

    pub fn to_representation(&self, records: &RecordSet) -> Result<serde_json::Value> {
        records
            .iter()
            .map(Record::to_representation)
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    }

    /// Errors of the failing elements only, `None` when all pass
    pub fn run_validators(&self, records: &RecordSet) -> Result<Option<ValidateError>> {
        let mut errors = Vec::new();
        for record in records {
            if let Some(error) = record.run_validators()? {
                errors.push(error);
            }
        }
        if errors.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ValidateError::Items(errors)))
        }
    }
}

impl PartialEq for ModelSet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSet")
            .field("name", &self.0.name)
            .field("model", &self.0.model.name())
            .finish()
    }
}

/// Ordered instance of a [`ModelSet`]
#[derive(Clone)]
pub struct RecordSet {
    set: ModelSet,
    items: Vec<Record>,
    errors: Option<ValidateError>,
}

impl RecordSet {
    pub fn set(&self) -> &ModelSet {
        &self.set
    }

    pub fn is_instance_of(&self, set: &ModelSet) -> bool {
        self.set == *set
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.items.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.items.get_mut(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.items
    }

    /// Append one element, coerced like [`ModelSet::to_internal_value`]
    pub fn push(&mut self, item: impl Into<Value>) -> Result<()> {
        let record = self.set.coerce(&item.into())?;
        self.items.push(record);
        Ok(())
    }

    pub(crate) fn push_record(&mut self, record: Record) {
        self.items.push(record);
    }

    pub fn errors(&self) -> Option<&ValidateError> {
        self.errors.as_ref()
    }

    pub fn to_representation(&self) -> Result<serde_json::Value> {
        self.set.to_representation(self)
    }

    pub fn run_validators(&self) -> Result<Option<ValidateError>> {
        self.set.run_validators(self)
    }

    pub fn validate(&mut self) -> Result<bool> {
        self.errors = self.run_validators()?;
        tracing::debug!(set = %self.set.name(), valid = self.errors.is_none(), "validated record set");
        Ok(self.errors.is_none())
    }
}

impl ModelInstance for RecordSet {
    fn to_representation(&self) -> Result<serde_json::Value> {
        RecordSet::to_representation(self)
    }

    fn run_validators(&self) -> Result<Option<ValidateError>> {
        RecordSet::run_validators(self)
    }

    fn validate(&mut self) -> Result<bool> {
        RecordSet::validate(self)
    }

    fn errors(&self) -> Option<&ValidateError> {
        RecordSet::errors(self)
    }

    fn clear_errors(&mut self) {
        self.errors = None;
    }
}

impl Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set && self.items == other.items
    }
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("set", &self.set.name())
            .field("items", &self.items)
            .field("errors", &self.errors)
            .finish()
    }
}
