//! Persistence directives
//!
//! An `UpdateDoc` is what a builder hands to storage: fields to set and fields
//! to unset. A path is never in both lists; the later call wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::document::{remove_path, set_path, Document};

/// Field-level patch applied to a single document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDoc {
    /// Fields to set, keyed by path
    pub set: BTreeMap<String, Value>,
    /// Paths to remove
    pub unset: BTreeSet<String>,
}

impl UpdateDoc {
    /// Create an empty directive
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a field assignment
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let path = path.into();
        self.unset.remove(&path);
        self.set.insert(path, value.into());
        self
    }

    /// Stage a field removal
    pub fn unset(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        self.set.remove(&path);
        self.unset.insert(path);
        self
    }

    /// Builder-style assignment
    pub fn with_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    /// Builder-style removal
    pub fn with_unset(mut self, path: impl Into<String>) -> Self {
        self.unset(path);
        self
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Apply the directive to a document in place
    pub fn apply(&self, doc: &mut Document) {
        for (path, value) in &self.set {
            set_path(doc, path, value.clone());
        }
        for path in &self.unset {
            remove_path(doc, path);
        }
    }
}
