//! Document filters
//!
//! A `Filter` is a pure value; evaluation against a document lives here so the
//! in-memory store and the pipeline `Match` stage share one definition.
//! Semantics follow common document-store rules: a path that crosses an array
//! matches when any element matches, and a missing field is unequal to
//! everything except `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::document::{resolve_path, Document};

/// Predicate over a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every document
    All,
    /// Field equals value
    Eq(String, Value),
    /// Field does not equal value (missing fields match)
    Ne(String, Value),
    /// Field equals any of the values
    In(String, Vec<Value>),
    /// Field is strictly greater than value
    Gt(String, Value),
    /// Field presence
    Exists(String, bool),
    /// Every sub-filter matches
    And(Vec<Filter>),
    /// At least one sub-filter matches
    Or(Vec<Filter>),
}

impl Filter {
    /// Field equals value
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(path.into(), value.into())
    }

    /// Field does not equal value
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(path.into(), value.into())
    }

    /// Field equals any of the values
    pub fn is_in<V, I>(path: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::In(path.into(), values.into_iter().map(Into::into).collect())
    }

    /// Field is greater than value
    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(path.into(), value.into())
    }

    /// Field presence
    pub fn exists(path: impl Into<String>, present: bool) -> Self {
        Self::Exists(path.into(), present)
    }

    /// Conjunction of this filter and another
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), f) => {
                left.push(f);
                Self::And(left)
            }
            (f, other) => Self::And(vec![f, other]),
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq(path, value) => field_equals(doc, path, value),
            Self::Ne(path, value) => !field_equals(doc, path, value),
            Self::In(path, values) => values.iter().any(|v| field_equals(doc, path, v)),
            Self::Gt(path, value) => resolve_path(doc, path)
                .into_iter()
                .any(|candidate| compare(candidate, value) == Some(Ordering::Greater)),
            Self::Exists(path, present) => resolve_path(doc, path).is_empty() != *present,
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn field_equals(doc: &Document, path: &str, value: &Value) -> bool {
    let resolved = resolve_path(doc, path);
    if resolved.is_empty() {
        return value.is_null();
    }
    resolved.into_iter().any(|candidate| match candidate {
        Value::Array(items) => candidate == value || items.iter().any(|item| item == value),
        _ => candidate == value,
    })
}

/// Order two scalar values of the same kind
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}
