//! Aggregation pipelines as data
//!
//! A `Pipeline` is an ordered list of stage descriptors. Pipelines compose by
//! concatenation and never touch storage; executing one is the job of a
//! `DocumentStore`.

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::identifiers::Collection;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Computed field expression used by `Stage::Set`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Length of the array at a path (0 when absent)
    Size(String),
    /// Elements of the array at `input` that satisfy `cond`
    FilterArray {
        /// Array path
        input: String,
        /// Predicate evaluated against each element
        cond: Filter,
    },
    /// `field` of the first element of `input` satisfying `cond`, or null
    FirstMatchField {
        /// Array path
        input: String,
        /// Predicate evaluated against each element
        cond: Filter,
        /// Field read from the first match
        field: String,
    },
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    /// Keep matching documents
    Match(Filter),
    /// Order documents by a field
    Sort {
        /// Sort key path
        field: String,
        /// Direction
        order: SortOrder,
    },
    /// Keep at most this many documents
    Limit(usize),
    /// Join documents from another collection whose `foreign_field` equals any
    /// value at `local_field`, storing them as an array at `as_field`
    Lookup {
        /// Joined collection
        from: Collection,
        /// Path in the current document; arrays fan out
        local_field: String,
        /// Path in the joined documents
        foreign_field: String,
        /// Output array field
        as_field: String,
    },
    /// Add or replace computed fields
    Set(Vec<(String, Expr)>),
    /// Remove fields
    Unset(Vec<String>),
    /// Collapse every document into one, pushing each into `into` as an array
    GroupAll {
        /// Output array field
        into: String,
    },
}

/// Ordered list of stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage when `stage` is present
    pub fn stage_if(self, stage: Option<Stage>) -> Self {
        match stage {
            Some(stage) => self.stage(stage),
            None => self,
        }
    }

    /// Concatenate pipelines in order
    pub fn combine(parts: impl IntoIterator<Item = Pipeline>) -> Self {
        Self {
            stages: parts.into_iter().flat_map(|p| p.stages).collect(),
        }
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}
