//! Models
//!
//! A [`Model`] is a class handle: a name, an ordered field map, property
//! initializers and an optional parent. Models are immutable once built;
//! `exclude`, `include` and `pick` derive new models and never touch the
//! receiver. A [`Record`] is one instance of a model.

pub mod set;
pub mod utils;

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::fields::{DeclaredType, DefaultValue, Field, TypeResolver};
use crate::validators::ValidateError;
use crate::value::Value;

pub use set::{ModelSet, RecordSet};
pub use utils::{assign_model, clone_model, is_model, model_to_raw};

/// Contract shared by model instances and model set instances
pub trait ModelInstance: Clone {
    fn to_representation(&self) -> Result<serde_json::Value>;

    fn run_validators(&self) -> Result<Option<ValidateError>>;

    /// Run the validation cascade, store the result and report success
    fn validate(&mut self) -> Result<bool>;

    fn errors(&self) -> Option<&ValidateError>;

    fn clear_errors(&mut self);
}

/// Model class handle
#[derive(Clone)]
pub struct Model(Arc<ModelDef>);

struct ModelDef {
    name: String,
    fields: IndexMap<String, Arc<Field>>,
    initializers: IndexMap<String, DefaultValue>,
    parent: Option<Model>,
}

impl Model {
    /// Start a new root model
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name.into(), None)
    }

    /// Start a subclass seeded with this model's fields and initializers
    pub fn extend(&self, name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name.into(), Some(self.clone()))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &IndexMap<String, Arc<Field>> {
        &self.0.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.0.fields.get(name).map(|field| field.as_ref())
    }

    pub fn initializers(&self) -> &IndexMap<String, DefaultValue> {
        &self.0.initializers
    }

    pub fn parent(&self) -> Option<&Model> {
        self.0.parent.as_ref()
    }

    /// True for the model itself and every model it derives from
    pub fn is_subclass_of(&self, other: &Model) -> bool {
        let mut current = Some(self);
        while let Some(model) = current {
            if model == other {
                return true;
            }
            current = model.parent();
        }
        false
    }

    /// Create an instance.
    ///
    /// Each property starts from its initializer, else its field default.
    /// `data`, when given, is then converted and shallow-assigned on top.
    pub fn init(&self, data: Option<Value>) -> Result<Record> {
        let mut record = Record::new(self.clone());

        for (name, field) in self.fields() {
            let value = match self.0.initializers.get(name) {
                Some(initializer) => Some(initializer.produce()),
                None => field.get_default()?,
            };
            if let Some(value) = value {
                record.values.insert(name.clone(), value);
            }
        }
        for (name, initializer) in &self.0.initializers {
            if !record.values.contains_key(name) {
                record.values.insert(name.clone(), initializer.produce());
            }
        }

        match data {
            Some(data) if !data.is_null() => assign_model(&mut record, &data)?,
            _ => {}
        }
        Ok(record)
    }

    /// Create an instance from a JSON document
    pub fn parse(&self, json: &str) -> Result<Record> {
        let data: serde_json::Value = serde_json::from_str(json)?;
        self.init(Some(data.into()))
    }

    /// Convert external data into internal values, in field order.
    ///
    /// A [`Record`] given as input is read by property name.
    pub fn to_internal_value(&self, data: &Value) -> Result<IndexMap<String, Value>> {
        if !matches!(data, Value::Map(_) | Value::Record(_)) {
            return Err(SchemaError::Type(format!(
                "{} expects a map, got {}",
                self.name(),
                data.type_name()
            )));
        }
        let mut internal = IndexMap::new();
        for (name, field) in self.fields() {
            field.set_internal_value_to_obj(&mut internal, name, data)?;
        }
        tracing::trace!(model = %self.name(), properties = internal.len(), "converted to internal");
        Ok(internal)
    }

    /// External form of `record`; readonly fields are omitted
    pub fn to_representation(&self, record: &Record) -> Result<serde_json::Value> {
        let mut external = serde_json::Map::new();
        for (name, field) in self.fields() {
            field.set_representation_to_obj(&mut external, name, &record.values)?;
        }
        Ok(serde_json::Value::Object(external))
    }

    /// Field name to error for every failing field, `None` when all pass
    pub fn run_validators(&self, record: &Record) -> Result<Option<ValidateError>> {
        let mut errors = IndexMap::new();
        for (name, field) in self.fields() {
            let outcome = field.run_validators(record.get(name)).map_err(|e| match e {
                SchemaError::Validation(message) => {
                    SchemaError::Validation(format!("{name}: {message}"))
                }
                other => other,
            })?;
            if let Some(error) = outcome {
                errors.insert(name.clone(), error);
            }
        }
        if errors.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ValidateError::Fields(errors)))
        }
    }

    /// New model without the named fields
    pub fn exclude(&self, names: &[&str]) -> Model {
        let fields = self
            .fields()
            .iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect();
        self.derive(fields, "exclude")
    }

    /// New model with only the named fields, in declaration order
    pub fn pick(&self, names: &[&str]) -> Model {
        let fields = self
            .fields()
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect();
        self.derive(fields, "pick")
    }

    /// New model with `fields` added; a new field replaces an inherited one
    /// of the same name
    pub fn include<I, K>(&self, fields: I) -> Result<Model>
    where
        I: IntoIterator<Item = (K, Field)>,
        K: Into<String>,
    {
        fields
            .into_iter()
            .fold(self.extend(self.name()), |builder, (name, field)| {
                builder.field(name, field)
            })
            .build()
    }

    fn derive(&self, fields: IndexMap<String, Arc<Field>>, how: &str) -> Model {
        tracing::debug!(model = %self.name(), how, fields = fields.len(), "derived model");
        Model(Arc::new(ModelDef {
            name: self.0.name.clone(),
            fields,
            initializers: self.0.initializers.clone(),
            parent: Some(self.clone()),
        }))
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.0.name)
            .field("fields", &self.0.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Model`]. Fields are bound when [`build`](Self::build) runs.
pub struct ModelBuilder {
    name: String,
    parent: Option<Model>,
    fields: IndexMap<String, Arc<Field>>,
    pending: Vec<(String, Option<DeclaredType>, Field)>,
    initializers: IndexMap<String, DefaultValue>,
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl ModelBuilder {
    fn new(name: String, parent: Option<Model>) -> Self {
        let (fields, initializers) = match &parent {
            Some(parent) => (parent.0.fields.clone(), parent.0.initializers.clone()),
            None => (IndexMap::new(), IndexMap::new()),
        };
        Self {
            name,
            parent,
            fields,
            pending: Vec::new(),
            initializers,
            resolver: None,
        }
    }

    /// Add a field declared with its natural type (or the resolver's answer)
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.pending.push((name.into(), None, field));
        self
    }

    /// Add a field with an explicit declared property type
    pub fn declare(mut self, name: impl Into<String>, declared: DeclaredType, field: Field) -> Self {
        self.pending.push((name.into(), Some(declared), field));
        self
    }

    /// Initial property value, used instead of the field default
    pub fn initial(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initializers
            .insert(name.into(), DefaultValue::Value(value.into()));
        self
    }

    /// Initial property value produced fresh for every instance
    pub fn initial_with<F>(mut self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.initializers
            .insert(name.into(), DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Source of declared property types for fields added with [`field`](Self::field)
    pub fn resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn build(self) -> Result<Model> {
        let ModelBuilder {
            name,
            parent,
            mut fields,
            pending,
            initializers,
            resolver,
        } = self;

        for (property, declared, mut field) in pending {
            let declared = declared
                .or_else(|| {
                    resolver
                        .as_ref()
                        .and_then(|r| r.resolve_declared_type(&name, &property))
                })
                .unwrap_or_else(|| field.natural_type());
            field.bind(&property, declared).map_err(|e| match e {
                SchemaError::Configuration(message) => {
                    SchemaError::Configuration(format!("{name}.{property}: {message}"))
                }
                other => other,
            })?;
            fields.insert(property, Arc::new(field));
        }

        tracing::debug!(
            model = %name,
            parent = parent.as_ref().map(Model::name),
            fields = fields.len(),
            "built model"
        );
        Ok(Model(Arc::new(ModelDef {
            name,
            fields,
            initializers,
            parent,
        })))
    }
}

/// Instance of a [`Model`]
#[derive(Clone)]
pub struct Record {
    model: Model,
    values: IndexMap<String, Value>,
    errors: Option<ValidateError>,
}

impl Record {
    fn new(model: Model) -> Self {
        Self {
            model,
            values: IndexMap::new(),
            errors: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Set a property without conversion, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All properties, declared fields and initializer-only ones alike
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut IndexMap<String, Value> {
        &mut self.values
    }

    /// Errors stored by the last [`validate`](Self::validate)
    pub fn errors(&self) -> Option<&ValidateError> {
        self.errors.as_ref()
    }

    pub fn is_instance_of(&self, model: &Model) -> bool {
        self.model.is_subclass_of(model)
    }

    pub fn to_representation(&self) -> Result<serde_json::Value> {
        self.model.to_representation(self)
    }

    pub fn run_validators(&self) -> Result<Option<ValidateError>> {
        self.model.run_validators(self)
    }

    pub fn validate(&mut self) -> Result<bool> {
        self.errors = self.run_validators()?;
        tracing::debug!(model = %self.model.name(), valid = self.errors.is_none(), "validated record");
        Ok(self.errors.is_none())
    }
}

impl ModelInstance for Record {
    fn to_representation(&self) -> Result<serde_json::Value> {
        Record::to_representation(self)
    }

    fn run_validators(&self) -> Result<Option<ValidateError>> {
        Record::run_validators(self)
    }

    fn validate(&mut self) -> Result<bool> {
        Record::validate(self)
    }

    fn errors(&self) -> Option<&ValidateError> {
        Record::errors(self)
    }

    fn clear_errors(&mut self) {
        self.errors = None;
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name())
            .field("values", &self.values)
            .field("errors", &self.errors)
            .finish()
    }
}
