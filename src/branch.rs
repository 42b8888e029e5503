//! Branches
//!
//! A [`Branch`] wraps a value with snapshot, rollback, fork and merge
//! transitions. Branches form a tree: a forked branch keeps a handle on its
//! master, masters know nothing of their children. Applying a branch merges
//! it into its master and keeps going up to the root.
//!
//! Branches are an editing-session tool and are single-threaded
//! (`Rc<RefCell<..>>`).

use indexmap::IndexMap;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::{Result, SchemaError};
use crate::models::{Record, RecordSet};
use crate::value::Value;

/// Overwrite-merge of one value onto another.
///
/// Properties present in `other` replace those on `self`; properties only
/// `self` has are left untouched.
pub trait Mergeable: Clone {
    fn assign(&mut self, other: Self);
}

impl Mergeable for Record {
    fn assign(&mut self, other: Self) {
        self.values_mut().extend(other.values().clone());
    }
}

impl Mergeable for RecordSet {
    fn assign(&mut self, other: Self) {
        for (index, record) in other.records().iter().enumerate() {
            match self.get_mut(index) {
                Some(slot) => *slot = record.clone(),
                None => self.push_record(record.clone()),
            }
        }
    }
}

impl Mergeable for Value {
    fn assign(&mut self, other: Self) {
        match (self, other) {
            (Value::Map(target), Value::Map(source)) => target.extend(source),
            (Value::Record(target), Value::Record(source)) => target.assign(source),
            (Value::Set(target), Value::Set(source)) => target.assign(source),
            (Value::List(target), Value::List(source)) => assign_indexed(target, source),
            (target, source) => *target = source,
        }
    }
}

impl Mergeable for serde_json::Value {
    fn assign(&mut self, other: Self) {
        match (self, other) {
            (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
                target.extend(source)
            }
            (serde_json::Value::Array(target), serde_json::Value::Array(source)) => {
                assign_indexed(target, source)
            }
            (target, source) => *target = source,
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Mergeable for HashMap<K, V> {
    fn assign(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Mergeable for IndexMap<K, V> {
    fn assign(&mut self, other: Self) {
        self.extend(other);
    }
}

fn assign_indexed<T>(target: &mut Vec<T>, source: Vec<T>) {
    for (index, item) in source.into_iter().enumerate() {
        match target.get_mut(index) {
            Some(slot) => *slot = item,
            None => target.push(item),
        }
    }
}

/// Named property access for values a branch can forward to
pub trait Properties {
    fn property(&self, name: &str) -> Option<Value>;

    /// Write an existing property; returns false when there is none
    fn set_property(&mut self, name: &str, value: Value) -> bool;
}

impl Properties for Record {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        if self.contains(name) || self.model().fields().contains_key(name) {
            self.set(name, value);
            true
        } else {
            false
        }
    }
}

impl Properties for Value {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        match self {
            Value::Map(map) => match map.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            Value::Record(record) => record.set_property(name, value),
            _ => false,
        }
    }
}

impl Properties for serde_json::Value {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).map(Value::from)
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value.to_json();
                true
            }
            None => false,
        }
    }
}

/// Options for [`Branch::merge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Apply the receiver to its own master after merging
    pub chain: bool,
}

impl MergeOptions {
    pub fn chained() -> Self {
        Self { chain: true }
    }
}

/// Shared handle on a branch; clones refer to the same branch
pub struct Branch<T>(Rc<RefCell<BranchState<T>>>);

struct BranchState<T> {
    model: T,
    last_snapshot: Option<T>,
    master: Option<Branch<T>>,
}

impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Mergeable> Branch<T> {
    /// Wrap `model` and take the initial snapshot
    pub fn new(model: T) -> Self {
        let branch = Self(Rc::new(RefCell::new(BranchState {
            model,
            last_snapshot: None,
            master: None,
        })));
        branch.snapshot();
        branch
    }

    /// Record a copy of the current value and return it
    pub fn snapshot(&self) -> T {
        let mut state = self.0.borrow_mut();
        let copy = state.model.clone();
        state.last_snapshot = Some(copy.clone());
        tracing::trace!("branch snapshot");
        copy
    }

    /// Restore the last snapshot
    pub fn rollback(&self) {
        let snapshot = self.0.borrow().last_snapshot.clone();
        if let Some(snapshot) = snapshot {
            tracing::trace!("branch rollback");
            self.0.borrow_mut().model.assign(snapshot);
        }
    }

    /// Overwrite-merge a copy of `other` onto the current value
    pub fn reset_from(&self, other: &T) {
        let copy = other.clone();
        self.0.borrow_mut().model.assign(copy);
    }

    /// New child branch over a copy of the current value
    pub fn fork(&self) -> Branch<T> {
        let child = Branch::new(self.model());
        child.0.borrow_mut().master = Some(self.clone());
        child
    }

    /// New sibling branch over a copy of the current value, sharing this
    /// branch's master
    pub fn copy(&self) -> Branch<T> {
        let sibling = Branch::new(self.model());
        sibling.0.borrow_mut().master = self.master();
        sibling
    }

    /// Take `other`'s value, then apply upward when `options.chain` is set
    pub fn merge(&self, other: &Branch<T>, options: MergeOptions) {
        let incoming = other.model();
        tracing::trace!(chain = options.chain, "branch merge");
        self.0.borrow_mut().model.assign(incoming);
        if options.chain {
            self.apply();
        }
    }

    /// Merge this branch into its master, chaining up to the root
    pub fn apply(&self) {
        if let Some(master) = self.master() {
            master.merge(self, MergeOptions::chained());
        }
    }

    /// Copy of the current value
    pub fn model(&self) -> T {
        self.0.borrow().model.clone()
    }

    pub fn last_snapshot(&self) -> Option<T> {
        self.0.borrow().last_snapshot.clone()
    }
}

impl<T> Branch<T> {
    pub fn master(&self) -> Option<Branch<T>> {
        self.0.borrow().master.clone()
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        Ref::map(self.0.borrow(), |state| &state.model)
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        RefMut::map(self.0.borrow_mut(), |state| &mut state.model)
    }

    /// True when both handles refer to the same branch
    pub fn same_branch(&self, other: &Branch<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Properties> Branch<T> {
    /// Read a property of the wrapped value
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().model.property(name)
    }

    /// Write a property the wrapped value already has
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        if self.0.borrow_mut().model.set_property(name, value.into()) {
            Ok(())
        } else {
            Err(SchemaError::UnknownProperty(name.to_string()))
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Branch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Branch")
            .field("model", &state.model)
            .field("has_master", &state.master.is_some())
            .finish()
    }
}
