//! Enumerations backing enum fields

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// A named set of `member name -> value` pairs.
///
/// Equality is identity: two enumerations with the same members are
/// distinct types.
#[derive(Clone)]
pub struct EnumType(Arc<EnumDef>);

struct EnumDef {
    name: String,
    members: IndexMap<String, Value>,
}

impl EnumType {
    pub fn new<I, K, V>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(Arc::new(EnumDef {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Value of a member by name
    pub fn value_of(&self, member: &str) -> Option<&Value> {
        self.0.members.get(member)
    }

    /// Name of the first member holding `value`
    pub fn name_of(&self, value: &Value) -> Option<&str> {
        self.0
            .members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.members.values().any(|v| v == value)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.members.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.members.keys().map(String::as_str)
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.0.name)
            .field("members", &self.0.members)
            .finish()
    }
}
