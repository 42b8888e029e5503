//! Field descriptors
//!
//! A [`Field`] owns conversion, default and validation behavior for one named
//! value slot. Fields are bound once into a model's field map and shared by
//! every record of that model (and of models derived from it); they hold no
//! per-record state.
//!
//! ```
//! use familiar_models::{Field, FieldOptions, Model, validators};
//!
//! let user = Model::builder("User")
//!     .field("id", Field::integer().readonly(true))
//!     .field("name", Field::string())
//!     .field("email", Field::string().validator(validators::email()))
//!     .field("tags", Field::string().many(FieldOptions::new()).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let record = user.init(Some(serde_json::json!({"id": 7, "name": "Ann"}).into())).unwrap();
//! assert_eq!(
//!     record.to_representation().unwrap(),
//!     serde_json::json!({"name": "Ann", "email": "", "tags": []})
//! );
//! ```

pub mod enumeration;
mod kinds;
pub mod temporal;

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::models::{Model, ModelSet};
use crate::validators::{ValidateError, Validator};
use crate::value::Value;

pub use enumeration::EnumType;
pub use kinds::FieldKind;
pub use temporal::{Format, Temporal, TemporalKind, Timezone};

/// Static type a property is declared with.
///
/// `Any` is the untyped fallback: a property declared `Any` defaults to
/// nullable, and nested fields refuse to bind to it.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Any,
    Str,
    Int,
    Float,
    Bool,
    Decimal,
    Timestamp,
    DateTime,
    Date,
    Enum(EnumType),
    Model(Model),
    Set(ModelSet),
    List(Box<DeclaredType>),
}

/// Resolves the declared type of a property at binding time
pub trait TypeResolver: Send + Sync {
    fn resolve_declared_type(&self, owner: &str, property: &str) -> Option<DeclaredType>;
}

impl<F> TypeResolver for F
where
    F: Fn(&str, &str) -> Option<DeclaredType> + Send + Sync,
{
    fn resolve_declared_type(&self, owner: &str, property: &str) -> Option<DeclaredType> {
        self(owner, property)
    }
}

/// Fixed default or a producer re-invoked on every request
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Recognized field options; `None` keeps the field's current setting
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub source: Option<String>,
    pub ty: Option<DeclaredType>,
    pub nullable: Option<bool>,
    pub readonly: Option<bool>,
    pub validators: Option<Vec<Validator>>,
    pub default: Option<DefaultValue>,
    pub many: Option<Box<FieldOptions>>,
    pub format: Option<String>,
    pub timezone: Option<String>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn ty(mut self, ty: DeclaredType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = Some(readonly);
        self
    }

    pub fn validators(mut self, validators: Vec<Validator>) -> Self {
        self.validators = Some(validators);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Promote the configured field to a list; `list` configures the list itself
    pub fn many(mut self, list: FieldOptions) -> Self {
        self.many = Some(Box::new(list));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Typed descriptor for one value slot of a model
#[derive(Clone)]
pub struct Field {
    kind: FieldKind,
    source: Option<String>,
    ty: Option<DeclaredType>,
    nullable: Option<bool>,
    readonly: bool,
    default: Option<DefaultValue>,
    validators: Vec<Validator>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            source: None,
            ty: None,
            nullable: None,
            readonly: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn decimal() -> Self {
        Self::new(FieldKind::Decimal)
    }

    pub fn timestamp() -> Self {
        Self::new(FieldKind::Temporal(Temporal::new(TemporalKind::Timestamp)))
    }

    pub fn datetime() -> Self {
        Self::new(FieldKind::Temporal(Temporal::new(TemporalKind::DateTime)))
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Temporal(Temporal::new(TemporalKind::Date)))
    }

    pub fn enumeration(ty: EnumType) -> Self {
        let mut field = Self::new(FieldKind::Enum);
        field.ty = Some(DeclaredType::Enum(ty));
        field
    }

    /// Nested field whose model comes from the declared property type
    pub fn nested() -> Self {
        Self::new(FieldKind::Nested)
    }

    pub fn model(model: &Model) -> Self {
        let mut field = Self::nested();
        field.ty = Some(DeclaredType::Model(model.clone()));
        field
    }

    pub fn model_set(set: &ModelSet) -> Self {
        let mut field = Self::nested();
        field.ty = Some(DeclaredType::Set(set.clone()));
        field
    }

    /// List of `child`, with default list options
    pub fn list(child: Field) -> Result<Self> {
        child.many(FieldOptions::new())
    }

    /// Apply `options` on top of the current configuration.
    ///
    /// With `many` set, the configured field becomes the element of a new
    /// list field configured by the `many` options.
    pub fn init(mut self, options: FieldOptions) -> Result<Self> {
        let FieldOptions {
            source,
            ty,
            nullable,
            readonly,
            validators,
            default,
            many,
            format,
            timezone,
        } = options;

        if source.is_some() {
            self.source = source;
        }
        if ty.is_some() {
            self.ty = ty;
        }
        if nullable.is_some() {
            self.nullable = nullable;
        }
        if let Some(readonly) = readonly {
            self.readonly = readonly;
        }
        if let Some(validators) = validators {
            self.validators = validators;
        }
        if default.is_some() {
            self.default = default;
        }

        if format.is_some() || timezone.is_some() {
            let FieldKind::Temporal(temporal) = &mut self.kind else {
                return Err(SchemaError::configuration(format!(
                    "format and timezone apply to temporal fields, not {} fields",
                    self.kind.label()
                )));
            };
            if let Some(format) = format {
                temporal.set_format(format);
            }
            if let Some(timezone) = timezone {
                temporal.set_timezone(timezone);
            }
        }

        self.check_options()?;

        match many {
            Some(list) => self.many(*list),
            None => Ok(self),
        }
    }

    fn check_options(&self) -> Result<()> {
        match &self.kind {
            FieldKind::Enum if !matches!(self.ty, Some(DeclaredType::Enum(_))) => Err(
                SchemaError::configuration("Please specify the type of the enum field"),
            ),
            FieldKind::Temporal(temporal) => temporal.check(),
            _ => Ok(()),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Promote this field to the element field of a new list field
    pub fn many(mut self, options: FieldOptions) -> Result<Self> {
        let declared = self.natural_type();
        self.bind("[]", declared)?;
        Field::new(FieldKind::List(Arc::new(self))).init(options)
    }

    /// Resolve the type and nullability for `property`.
    ///
    /// An explicit `ty` wins over `declared`; nullability defaults to true
    /// only for properties declared [`DeclaredType::Any`].
    pub fn bind(&mut self, property: &str, declared: DeclaredType) -> Result<()> {
        let nullable = self.nullable.unwrap_or(declared == DeclaredType::Any);
        let resolved = match &self.ty {
            Some(ty) => ty.clone(),
            None => declared,
        };

        match &self.kind {
            FieldKind::Nested if !matches!(resolved, DeclaredType::Model(_) | DeclaredType::Set(_)) => {
                return Err(SchemaError::configuration(format!(
                    "Please specify the type of the model field '{property}'"
                )));
            }
            FieldKind::Enum => {
                if !matches!(resolved, DeclaredType::Enum(_)) {
                    return Err(SchemaError::configuration(format!(
                        "Please specify the type of the enum field '{property}'"
                    )));
                }
                // list elements never read their own default
                if property != "[]" && !nullable && self.default.is_none() {
                    return Err(SchemaError::configuration(format!(
                        "Please specify the default value of the enum field '{property}'"
                    )));
                }
            }
            FieldKind::Temporal(temporal) => temporal.check()?,
            _ => {}
        }

        tracing::trace!(property, kind = self.kind.label(), nullable, "bound field");
        self.nullable = Some(nullable);
        self.ty = Some(resolved);
        Ok(())
    }

    /// Type a property holding this field would naturally be declared with
    pub fn natural_type(&self) -> DeclaredType {
        match &self.kind {
            FieldKind::Any => DeclaredType::Any,
            FieldKind::String => DeclaredType::Str,
            FieldKind::Integer => DeclaredType::Int,
            FieldKind::Float => DeclaredType::Float,
            FieldKind::Boolean => DeclaredType::Bool,
            FieldKind::Decimal => DeclaredType::Decimal,
            FieldKind::Temporal(temporal) => match temporal.kind() {
                TemporalKind::Timestamp => DeclaredType::Timestamp,
                TemporalKind::DateTime => DeclaredType::DateTime,
                TemporalKind::Date => DeclaredType::Date,
            },
            FieldKind::Enum | FieldKind::Nested => self.ty.clone().unwrap_or(DeclaredType::Any),
            FieldKind::List(child) => DeclaredType::List(Box::new(child.natural_type())),
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn ty(&self) -> Option<&DeclaredType> {
        self.ty.as_ref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Element field of a list field
    pub fn child(&self) -> Option<&Field> {
        match &self.kind {
            FieldKind::List(child) => Some(child),
            _ => None,
        }
    }

    /// Key this field reads and writes in external data
    pub fn external_key<'a>(&'a self, property: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(property)
    }

    pub fn to_internal_value(&self, value: &Value) -> Result<Value> {
        kinds::to_internal(self, value)
    }

    pub fn to_representation(&self, value: &Value) -> Result<serde_json::Value> {
        kinds::to_representation(self, value)
    }

    /// Convert `external[source ?? property]` into `target[property]`; an
    /// absent key leaves `target` untouched.
    ///
    /// Records already hold their data by property name, so `source` is
    /// ignored when `external` is a [`Value::Record`].
    pub fn set_internal_value_to_obj(
        &self,
        target: &mut IndexMap<String, Value>,
        property: &str,
        external: &Value,
    ) -> Result<()> {
        let key = match external {
            Value::Record(_) => property,
            _ => self.external_key(property),
        };
        let Some(value) = external.get(key) else {
            return Ok(());
        };
        target.insert(property.to_string(), self.to_internal_value(value)?);
        Ok(())
    }

    /// Convert `internal[property]` into `target[source ?? property]`.
    /// Readonly fields and absent properties write nothing.
    pub fn set_representation_to_obj(
        &self,
        target: &mut serde_json::Map<String, serde_json::Value>,
        property: &str,
        internal: &IndexMap<String, Value>,
    ) -> Result<()> {
        if self.readonly {
            return Ok(());
        }
        let Some(value) = internal.get(property) else {
            return Ok(());
        };
        let represented = if self.is_nullable() && value.is_null() {
            serde_json::Value::Null
        } else {
            self.to_representation(value)?
        };
        target.insert(self.external_key(property).to_string(), represented);
        Ok(())
    }

    /// Default for a new record; `None` leaves the property unset.
    ///
    /// A configured default always wins; otherwise nullable fields default to
    /// null and the rest to their kind's default.
    pub fn get_default(&self) -> Result<Option<Value>> {
        if let Some(default) = &self.default {
            return Ok(Some(default.produce()));
        }
        if self.is_nullable() {
            return Ok(Some(Value::Null));
        }
        kinds::kind_default(self)
    }

    /// Run kind checks then instance validators; the first failure wins.
    ///
    /// Null or absent values pass on nullable fields and are a hard
    /// [`SchemaError::Validation`] otherwise.
    pub fn run_validators(&self, value: Option<&Value>) -> Result<Option<ValidateError>> {
        let value = match value {
            None | Some(Value::Null) if self.is_nullable() => return Ok(None),
            None | Some(Value::Null) => {
                return Err(SchemaError::Validation("value cannot be null".to_string()))
            }
            Some(value) => value,
        };

        for check in self.kind.checks() {
            if let Some(error) = check(self, value)? {
                return Ok(Some(error));
            }
        }
        for validator in &self.validators {
            if let Err(error) = validator(value, self) {
                return Ok(Some(error));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("ty", &self.ty)
            .field("nullable", &self.nullable)
            .field("readonly", &self.readonly)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish()
    }
}
