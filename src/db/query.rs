// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed query language shared by every store backend.
//!
//! Filters, patches and aggregation pipelines are plain data. The memory
//! store evaluates them directly; the MongoDB store translates them into
//! native query documents.

use serde_json::{Map, Value};

/// A stored document (JSON object with a string `_id`).
pub type Document = Map<String, Value>;

/// Field holding the document identifier.
pub const ID_FIELD: &str = "_id";

// ─── Filters ─────────────────────────────────────────────────

/// Predicate over a document.
///
/// Dotted paths traverse embedded documents and fan out over arrays,
/// and equality against an array field matches any element.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Exists(String, bool),
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    /// Match a document by its identifier.
    pub fn id(id: &str) -> Self {
        Filter::eq(ID_FIELD, id)
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Filter::Exists(field.into(), exists)
    }

    /// Case-insensitive substring match. The needle is escaped, so user
    /// input is always treated literally.
    pub fn contains_ignore_case(field: impl Into<String>, needle: &str) -> Self {
        Filter::Regex {
            field: field.into(),
            pattern: regex::escape(needle),
            case_insensitive: true,
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }
}

// ─── Patches ─────────────────────────────────────────────────

/// A single field update.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set(String, Value),
    Unset(String),
    /// Remove every array element equal to the value.
    Pull(String, Value),
    /// Append unless an equal element is already present.
    AddToSet(String, Value),
    Inc(String, i64),
}

/// Ordered list of field updates applied atomically to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    updates: Vec<Update>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.updates.push(Update::Set(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.updates.push(Update::Unset(field.into()));
        self
    }

    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.updates.push(Update::Pull(field.into(), value.into()));
        self
    }

    pub fn add_to_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.updates.push(Update::AddToSet(field.into(), value.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        self.updates.push(Update::Inc(field.into(), by));
        self
    }

    /// Stamp `updatedAt` with the current time.
    pub fn touch(self) -> Self {
        self.set("updatedAt", crate::time_utils::now_rfc3339())
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

// ─── Aggregation Pipelines ───────────────────────────────────

/// Computed field expression for `AddFields`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Length of the array at a path (0 when missing).
    Size(String),
    /// First element of the array at a path (field removed when empty).
    First(String),
    /// Numeric sum of every value reachable at a path.
    Sum(String),
    /// Whether `value` occurs among the values reachable at `array`.
    In { value: Value, array: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Field allow-list or deny-list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep `_id` plus the listed fields.
    Include(Vec<String>),
    /// Drop the listed fields.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include(fields: &[&str]) -> Self {
        Projection::Include(fields.iter().map(|f| f.to_string()).collect())
    }

    pub fn exclude(fields: &[&str]) -> Self {
        Projection::Exclude(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// Left-outer join against another collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    /// Stages applied to the joined documents before embedding.
    pub pipeline: Pipeline,
}

impl Lookup {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
            pipeline: Pipeline::new(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    Unwind {
        path: String,
        include_array_index: Option<String>,
        preserve_empty: bool,
    },
    AddFields(Vec<(String, Expr)>),
    Project(Projection),
    /// Promote the embedded document at a path to the top level.
    ReplaceRoot(String),
    Sort(Vec<(String, SortOrder)>),
    Skip(u64),
    Limit(u64),
}

/// Ordered sequence of stages evaluated by the store as one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn lookup(self, lookup: Lookup) -> Self {
        self.stage(Stage::Lookup(lookup))
    }

    /// Unwind an array, dropping documents where it is missing or empty.
    pub fn unwind(self, path: &str) -> Self {
        self.stage(Stage::Unwind {
            path: path.to_string(),
            include_array_index: None,
            preserve_empty: false,
        })
    }

    /// Unwind an array, recording each element's position in `index_field`.
    pub fn unwind_with_index(self, path: &str, index_field: &str) -> Self {
        self.stage(Stage::Unwind {
            path: path.to_string(),
            include_array_index: Some(index_field.to_string()),
            preserve_empty: false,
        })
    }

    pub fn add_fields(self, fields: Vec<(&str, Expr)>) -> Self {
        self.stage(Stage::AddFields(
            fields
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        ))
    }

    pub fn project(self, projection: Projection) -> Self {
        self.stage(Stage::Project(projection))
    }

    pub fn replace_root(self, path: &str) -> Self {
        self.stage(Stage::ReplaceRoot(path.to_string()))
    }

    pub fn sort(self, fields: &[(&str, SortOrder)]) -> Self {
        self.stage(Stage::Sort(
            fields
                .iter()
                .map(|(name, order)| (name.to_string(), *order))
                .collect(),
        ))
    }

    pub fn skip(self, n: u64) -> Self {
        self.stage(Stage::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains_ignore_case_escapes_input() {
        let filter = Filter::contains_ignore_case("title", "a.b*(c)");
        match filter {
            Filter::Regex {
                pattern,
                case_insensitive,
                ..
            } => {
                assert_eq!(pattern, r"a\.b\*\(c\)");
                assert!(case_insensitive);
            }
            other => panic!("unexpected filter {other:?}"),
        }
    }

    #[test]
    fn test_patch_builder_preserves_order() {
        let patch = Patch::new()
            .set("title", "new")
            .unset("refreshToken")
            .inc("views", 1);

        assert_eq!(
            patch.updates(),
            &[
                Update::Set("title".into(), json!("new")),
                Update::Unset("refreshToken".into()),
                Update::Inc("views".into(), 1),
            ]
        );
    }

    #[test]
    fn test_pipeline_builder_appends_stages() {
        let pipeline = Pipeline::new()
            .matching(Filter::id("abc"))
            .sort(&[("createdAt", SortOrder::Desc)])
            .limit(5);

        assert_eq!(pipeline.stages().len(), 3);
        assert_eq!(pipeline.stages()[2], Stage::Limit(5));
    }
}
