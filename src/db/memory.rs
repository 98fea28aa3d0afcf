// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Each collection is a vector of documents in insertion order behind a
//! sharded lock, so every single-document write (including conditional
//! updates) is atomic. Pipelines run over a snapshot of the source
//! collection; joined collections are snapshotted once per lookup stage.

use super::query::{
    Document, Expr, Filter, Lookup, Patch, Pipeline, Projection, SortOrder, Stage, Update, ID_FIELD,
};
use super::{new_object_id, DocumentStore, DocumentStream};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Vec<Document>>>,
    unique_fields: Arc<DashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    /// Name of the first unique field `candidate` would duplicate.
    fn unique_violation(
        &self,
        collection: &str,
        docs: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> Option<String> {
        let fields = self.unique_fields.get(collection)?;
        fields
            .iter()
            .find(|field| {
                let Some(value) = candidate.get(field.as_str()).filter(|v| !v.is_null()) else {
                    return false;
                };
                docs.iter().enumerate().any(|(i, doc)| {
                    Some(i) != skip
                        && doc
                            .get(field.as_str())
                            .is_some_and(|existing| values_equal(existing, value))
                })
            })
            .cloned()
    }

    /// Run a pipeline over an input set.
    pub fn run_pipeline(
        &self,
        mut docs: Vec<Document>,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, AppError> {
        for stage in pipeline.stages() {
            docs = match stage {
                Stage::Match(filter) => {
                    let matcher = Matcher::new(filter);
                    docs.into_iter().filter(|d| matcher.matches(d)).collect()
                }
                Stage::Lookup(lookup) => self.lookup(docs, lookup)?,
                Stage::Unwind {
                    path,
                    include_array_index,
                    preserve_empty,
                } => unwind(docs, path, include_array_index.as_deref(), *preserve_empty),
                Stage::AddFields(fields) => docs
                    .into_iter()
                    .map(|mut doc| {
                        let input = doc.clone();
                        for (name, expr) in fields {
                            match eval_expr(expr, &input) {
                                Some(value) => doc.insert(name.clone(), value),
                                None => doc.remove(name),
                            };
                        }
                        doc
                    })
                    .collect(),
                Stage::Project(projection) => docs
                    .into_iter()
                    .map(|doc| project(doc, projection))
                    .collect(),
                Stage::ReplaceRoot(path) => docs
                    .into_iter()
                    .map(|doc| match doc.get(path) {
                        Some(Value::Object(inner)) => Ok(inner.clone()),
                        _ => Err(AppError::Database(format!(
                            "replaceRoot target '{}' is not a document",
                            path
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Stage::Sort(keys) => {
                    docs.sort_by(|a, b| compare_documents(a, b, keys));
                    docs
                }
                Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
                Stage::Limit(n) => {
                    docs.truncate(*n as usize);
                    docs
                }
            };
        }
        Ok(docs)
    }

    fn lookup(&self, mut docs: Vec<Document>, lookup: &Lookup) -> Result<Vec<Document>, AppError> {
        let foreign = self.snapshot(&lookup.from);

        for doc in docs.iter_mut() {
            let keys = join_keys(doc, &lookup.local_field);
            let joined: Vec<Document> = foreign
                .iter()
                .filter(|candidate| {
                    join_keys(candidate, &lookup.foreign_field)
                        .iter()
                        .any(|fk| keys.iter().any(|k| values_equal(k, fk)))
                })
                .cloned()
                .collect();

            let joined = self.run_pipeline(joined, &lookup.pipeline)?;
            doc.insert(
                lookup.as_field.clone(),
                Value::Array(joined.into_iter().map(Value::Object).collect()),
            );
        }

        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| {
                let matcher = Matcher::new(filter);
                docs.iter().find(|d| matcher.matches(d)).cloned()
            }))
    }

    async fn create(&self, collection: &str, mut document: Document) -> Result<Document, AppError> {
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD.to_string(), Value::String(new_object_id()));
        }

        let mut docs = self.collections.entry(collection.to_string()).or_default();

        let id = document.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        if docs.iter().any(|d| d.get(ID_FIELD) == Some(&id)) {
            return Err(AppError::Conflict(format!("Duplicate _id in {}", collection)));
        }
        if let Some(field) = self.unique_violation(collection, &docs, &document, None) {
            return Err(AppError::Conflict(format!("{} already exists", field)));
        }

        docs.push(document.clone());
        Ok(document)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Document>, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let matcher = Matcher::new(filter);
        let Some(index) = docs.iter().position(|d| matcher.matches(d)) else {
            return Ok(None);
        };

        let mut updated = docs[index].clone();
        apply_patch(&mut updated, patch)?;

        if let Some(field) = self.unique_violation(collection, &docs, &updated, Some(index)) {
            return Err(AppError::Conflict(format!("{} already exists", field)));
        }

        docs[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let matcher = Matcher::new(filter);
        Ok(docs
            .iter()
            .position(|d| matcher.matches(d))
            .map(|index| docs.remove(index)))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<DocumentStream, AppError> {
        let results = self.run_pipeline(self.snapshot(collection), pipeline)?;
        Ok(stream::iter(results.into_iter().map(Ok)).boxed())
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), AppError> {
        let mut fields = self
            .unique_fields
            .entry(collection.to_string())
            .or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }
}

// ─── Path Resolution ─────────────────────────────────────────

/// Every value reachable at a dotted path. Intermediate arrays fan out;
/// a terminal array is returned as a single value.
fn resolve(doc: &Document, path: &str) -> Vec<Value> {
    let mut parts = path.split('.');
    let mut current: Vec<&Value> = match parts.next().and_then(|first| doc.get(first)) {
        Some(value) => vec![value],
        None => return Vec::new(),
    };

    for part in parts {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(part)),
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(map) = item {
                            next.extend(map.get(part));
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    current.into_iter().cloned().collect()
}

/// [`resolve`] with terminal arrays expanded one level.
fn resolve_flat(doc: &Document, path: &str) -> Vec<Value> {
    resolve(doc, path)
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items,
            other => vec![other],
        })
        .collect()
}

/// Keys used for a lookup join; a missing field joins on null.
fn join_keys(doc: &Document, path: &str) -> Vec<Value> {
    let keys = resolve_flat(doc, path);
    if keys.is_empty() {
        vec![Value::Null]
    } else {
        keys
    }
}

// ─── Filters ─────────────────────────────────────────────────

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn field_equals(doc: &Document, field: &str, expected: &Value) -> bool {
    let values = resolve(doc, field);
    if expected.is_null() && values.is_empty() {
        return true;
    }
    values.iter().any(|value| {
        values_equal(value, expected)
            || matches!(value, Value::Array(items) if items.iter().any(|i| values_equal(i, expected)))
    })
}

/// A filter with its regexes compiled, evaluated against many documents.
enum Matcher<'a> {
    All,
    Eq(&'a str, &'a Value),
    Ne(&'a str, &'a Value),
    Exists(&'a str, bool),
    /// `None` when the pattern does not compile; matches nothing.
    Regex(&'a str, Option<Regex>),
    And(Vec<Matcher<'a>>),
    Or(Vec<Matcher<'a>>),
}

impl<'a> Matcher<'a> {
    fn new(filter: &'a Filter) -> Self {
        match filter {
            Filter::All => Matcher::All,
            Filter::Eq(field, value) => Matcher::Eq(field, value),
            Filter::Ne(field, value) => Matcher::Ne(field, value),
            Filter::Exists(field, exists) => Matcher::Exists(field, *exists),
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => Matcher::Regex(
                field,
                RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .ok(),
            ),
            Filter::And(filters) => Matcher::And(filters.iter().map(Matcher::new).collect()),
            Filter::Or(filters) => Matcher::Or(filters.iter().map(Matcher::new).collect()),
        }
    }

    fn matches(&self, doc: &Document) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Eq(field, value) => field_equals(doc, field, value),
            Matcher::Ne(field, value) => !field_equals(doc, field, value),
            Matcher::Exists(field, exists) => resolve(doc, field).is_empty() != *exists,
            Matcher::Regex(field, re) => re.as_ref().is_some_and(|re| {
                resolve_flat(doc, field)
                    .iter()
                    .any(|v| v.as_str().is_some_and(|s| re.is_match(s)))
            }),
            Matcher::And(matchers) => matchers.iter().all(|m| m.matches(doc)),
            Matcher::Or(matchers) => matchers.iter().any(|m| m.matches(doc)),
        }
    }
}

// ─── Patches ─────────────────────────────────────────────────

fn array_field<'a>(doc: &'a mut Document, field: &str) -> Result<&'a mut Vec<Value>, AppError> {
    let slot = doc
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
        .ok_or_else(|| AppError::Database(format!("Field '{}' is not an array", field)))
}

fn apply_patch(doc: &mut Document, patch: &Patch) -> Result<(), AppError> {
    for update in patch.updates() {
        match update {
            Update::Set(field, value) => {
                doc.insert(field.clone(), value.clone());
            }
            Update::Unset(field) => {
                doc.remove(field);
            }
            Update::Pull(field, value) => {
                if let Some(Value::Array(items)) = doc.get_mut(field) {
                    items.retain(|item| !values_equal(item, value));
                }
            }
            Update::AddToSet(field, value) => {
                let items = array_field(doc, field)?;
                if !items.iter().any(|item| values_equal(item, value)) {
                    items.push(value.clone());
                }
            }
            Update::Inc(field, by) => {
                let current = match doc.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(value) => value.as_i64().ok_or_else(|| {
                        AppError::Database(format!("Field '{}' is not an integer", field))
                    })?,
                };
                doc.insert(field.clone(), json!(current + by));
            }
        }
    }
    Ok(())
}

// ─── Pipeline Stages ─────────────────────────────────────────

fn unwind(
    docs: Vec<Document>,
    path: &str,
    index_field: Option<&str>,
    preserve_empty: bool,
) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());

    for doc in docs {
        match doc.get(path).cloned() {
            Some(Value::Array(items)) if !items.is_empty() => {
                for (position, item) in items.into_iter().enumerate() {
                    let mut copy = doc.clone();
                    copy.insert(path.to_string(), item);
                    if let Some(index_field) = index_field {
                        copy.insert(index_field.to_string(), json!(position));
                    }
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve_empty {
                    let mut copy = doc;
                    copy.remove(path);
                    if let Some(index_field) = index_field {
                        copy.insert(index_field.to_string(), Value::Null);
                    }
                    out.push(copy);
                }
            }
            Some(_) => {
                let mut copy = doc;
                if let Some(index_field) = index_field {
                    copy.insert(index_field.to_string(), Value::Null);
                }
                out.push(copy);
            }
        }
    }

    out
}

fn eval_expr(expr: &Expr, doc: &Document) -> Option<Value> {
    match expr {
        Expr::Size(path) => Some(json!(resolve_flat(doc, path).len())),
        Expr::First(path) => resolve_flat(doc, path).into_iter().next(),
        Expr::Sum(path) => {
            let values = resolve_flat(doc, path);
            let numbers: Vec<&Value> = values.iter().filter(|v| v.is_number()).collect();
            if numbers.iter().all(|v| v.is_i64()) {
                Some(json!(numbers.iter().filter_map(|v| v.as_i64()).sum::<i64>()))
            } else {
                Some(json!(numbers
                    .iter()
                    .filter_map(|v| v.as_f64())
                    .sum::<f64>()))
            }
        }
        Expr::In { value, array } => Some(Value::Bool(
            resolve_flat(doc, array)
                .iter()
                .any(|candidate| values_equal(candidate, value)),
        )),
    }
}

fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => {
            let mut out = Document::new();
            if let Some(id) = doc.get(ID_FIELD) {
                out.insert(ID_FIELD.to_string(), id.clone());
            }
            for field in fields {
                if let Some(value) = doc.get(field) {
                    out.insert(field.clone(), value.clone());
                }
            }
            out
        }
        Projection::Exclude(fields) => {
            let mut out = doc;
            for field in fields {
                out.remove(field);
            }
            out
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Document, b: &Document, keys: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in keys {
        let left = resolve(a, field).into_iter().next().unwrap_or(Value::Null);
        let right = resolve(b, field).into_iter().next().unwrap_or(Value::Null);
        let ordering = match order {
            SortOrder::Asc => compare_values(&left, &right),
            SortOrder::Desc => compare_values(&right, &left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
