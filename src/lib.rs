//! Familiar Models
//!
//! A declarative data-modeling layer. Records are described as an ordered
//! set of named, typed fields; from that description the crate derives
//! default construction, conversion between the external JSON form and the
//! internal typed form, and validation with structured error payloads.
//!
//! ## Features
//!
//! - **Fields**: string, number, boolean, decimal, temporal, enum, nested model and list kinds
//! - **Models**: builder-defined schemas with `exclude` / `include` / `pick` derivation
//! - **Model sets**: ordered collections bound to one element model
//! - **Validation**: kind checks, custom validators and nested error payloads
//! - **Branches**: snapshot / rollback / fork / merge over any value
//!
//! ## Layout
//!
//! ```text
//! external JSON ──to_internal_value──▶ Record { Value, .. } ──to_representation──▶ external JSON
//!                                            │
//!                                      run_validators
//!                                            ▼
//!                                      ValidateError
//! ```

pub mod branch;
pub mod config;
pub mod error;
pub mod fields;
pub mod models;
pub mod validators;
pub mod value;

pub use branch::{Branch, MergeOptions, Mergeable, Properties};
pub use config::{FieldSettings, ModelConfig};
pub use error::{Result, SchemaError};
pub use fields::{
    DeclaredType, DefaultValue, EnumType, Field, FieldKind, FieldOptions, TypeResolver,
};
pub use models::{
    assign_model, clone_model, is_model, model_to_raw, Model, ModelBuilder, ModelInstance,
    ModelSet, Record, RecordSet,
};
pub use validators::{ValidateError, Validator};
pub use value::Value;
