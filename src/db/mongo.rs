// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB-backed document store.
//!
//! Documents keep their string `_id`. Filters, patches and pipelines are
//! translated into native query documents, so each read model runs as a
//! single server-side aggregation.

use super::query::{
    Document, Expr, Filter, Lookup, Patch, Pipeline, Projection, Stage, Update, ID_FIELD,
};
use super::{new_object_id, DocumentStore, DocumentStream};
use crate::error::AppError;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use mongodb::bson::{self, doc, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        tracing::info!(db_name, "Connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.db.collection::<bson::Document>(name)
    }
}

fn is_duplicate_key_error(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn map_error(error: mongodb::error::Error) -> AppError {
    if is_duplicate_key_error(&error) {
        AppError::Conflict("Record already exists".to_string())
    } else {
        AppError::Database(error.to_string())
    }
}

// ─── Conversions ─────────────────────────────────────────────

fn to_bson(value: &Value) -> Result<Bson, AppError> {
    bson::to_bson(value).map_err(|e| AppError::Database(format!("BSON encode error: {}", e)))
}

fn to_bson_document(document: &Document) -> Result<bson::Document, AppError> {
    bson::to_document(document).map_err(|e| AppError::Database(format!("BSON encode error: {}", e)))
}

fn from_bson_document(document: bson::Document) -> Result<Document, AppError> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Database(format!(
            "Expected a document, got {}",
            other
        ))),
    }
}

fn count_to_i64(stage: &str, n: u64) -> Result<i64, AppError> {
    i64::try_from(n).map_err(|_| AppError::Validation(format!("{} is out of range", stage)))
}

fn field_ref(path: &str) -> String {
    format!("${}", path)
}

// ─── Translation ─────────────────────────────────────────────

pub(crate) fn filter_to_bson(filter: &Filter) -> Result<bson::Document, AppError> {
    Ok(match filter {
        Filter::All => doc! {},
        Filter::Eq(field, value) => doc! { field.as_str(): { "$eq": to_bson(value)? } },
        Filter::Ne(field, value) => doc! { field.as_str(): { "$ne": to_bson(value)? } },
        Filter::Exists(field, exists) => doc! { field.as_str(): { "$exists": *exists } },
        Filter::Regex {
            field,
            pattern,
            case_insensitive,
        } => {
            let options = if *case_insensitive { "i" } else { "" };
            doc! { field.as_str(): { "$regex": pattern.as_str(), "$options": options } }
        }
        Filter::And(filters) if filters.is_empty() => doc! {},
        Filter::And(filters) => {
            let filters = filters
                .iter()
                .map(filter_to_bson)
                .collect::<Result<Vec<_>, _>>()?;
            doc! { "$and": filters }
        }
        // An empty disjunction matches nothing.
        Filter::Or(filters) if filters.is_empty() => doc! { "$nor": [{}] },
        Filter::Or(filters) => {
            let filters = filters
                .iter()
                .map(filter_to_bson)
                .collect::<Result<Vec<_>, _>>()?;
            doc! { "$or": filters }
        }
    })
}

pub(crate) fn patch_to_bson(patch: &Patch) -> Result<bson::Document, AppError> {
    let mut operators = bson::Document::new();

    for update in patch.updates() {
        let (operator, field, value) = match update {
            Update::Set(field, value) => ("$set", field, to_bson(value)?),
            Update::Unset(field) => ("$unset", field, Bson::String(String::new())),
            Update::Pull(field, value) => ("$pull", field, to_bson(value)?),
            Update::AddToSet(field, value) => ("$addToSet", field, to_bson(value)?),
            Update::Inc(field, by) => ("$inc", field, Bson::Int64(*by)),
        };

        if !operators.contains_key(operator) {
            operators.insert(operator, bson::Document::new());
        }
        if let Some(Bson::Document(fields)) = operators.get_mut(operator) {
            fields.insert(field.as_str(), value);
        }
    }

    Ok(operators)
}

fn expr_to_bson(expr: &Expr) -> Result<Bson, AppError> {
    Ok(match expr {
        Expr::Size(path) => {
            Bson::Document(doc! { "$size": { "$ifNull": [field_ref(path), []] } })
        }
        Expr::First(path) => Bson::Document(doc! { "$first": field_ref(path) }),
        Expr::Sum(path) => Bson::Document(doc! { "$sum": field_ref(path) }),
        Expr::In { value, array } => Bson::Document(doc! {
            "$in": [to_bson(value)?, { "$ifNull": [field_ref(array), []] }]
        }),
    })
}

fn lookup_to_bson(lookup: &Lookup) -> Result<bson::Document, AppError> {
    let mut spec = doc! {
        "from": lookup.from.as_str(),
        "localField": lookup.local_field.as_str(),
        "foreignField": lookup.foreign_field.as_str(),
        "as": lookup.as_field.as_str(),
    };
    if !lookup.pipeline.is_empty() {
        spec.insert("pipeline", pipeline_to_bson(&lookup.pipeline)?);
    }
    Ok(spec)
}

fn stage_to_bson(stage: &Stage) -> Result<bson::Document, AppError> {
    Ok(match stage {
        Stage::Match(filter) => doc! { "$match": filter_to_bson(filter)? },
        Stage::Lookup(lookup) => doc! { "$lookup": lookup_to_bson(lookup)? },
        Stage::Unwind {
            path,
            include_array_index,
            preserve_empty,
        } => {
            let mut spec = doc! {
                "path": field_ref(path),
                "preserveNullAndEmptyArrays": *preserve_empty,
            };
            if let Some(index_field) = include_array_index {
                spec.insert("includeArrayIndex", index_field.as_str());
            }
            doc! { "$unwind": spec }
        }
        Stage::AddFields(fields) => {
            let mut spec = bson::Document::new();
            for (name, expr) in fields {
                spec.insert(name.as_str(), expr_to_bson(expr)?);
            }
            doc! { "$addFields": spec }
        }
        Stage::Project(Projection::Include(fields)) => {
            let mut spec = bson::Document::new();
            for field in fields {
                spec.insert(field.as_str(), 1);
            }
            doc! { "$project": spec }
        }
        Stage::Project(Projection::Exclude(fields)) => {
            let mut spec = bson::Document::new();
            for field in fields {
                spec.insert(field.as_str(), 0);
            }
            doc! { "$project": spec }
        }
        Stage::ReplaceRoot(path) => doc! { "$replaceRoot": { "newRoot": field_ref(path) } },
        Stage::Sort(keys) => {
            let mut spec = bson::Document::new();
            for (field, order) in keys {
                spec.insert(field.as_str(), order.as_i32());
            }
            doc! { "$sort": spec }
        }
        Stage::Skip(n) => doc! { "$skip": count_to_i64("skip", *n)? },
        Stage::Limit(n) => doc! { "$limit": count_to_i64("limit", *n)? },
    })
}

pub(crate) fn pipeline_to_bson(pipeline: &Pipeline) -> Result<Vec<bson::Document>, AppError> {
    pipeline.stages().iter().map(stage_to_bson).collect()
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        self.collection(collection)
            .find_one(filter_to_bson(filter)?)
            .await
            .map_err(map_error)?
            .map(from_bson_document)
            .transpose()
    }

    async fn create(&self, collection: &str, mut document: Document) -> Result<Document, AppError> {
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD.to_string(), Value::String(new_object_id()));
        }

        self.collection(collection)
            .insert_one(to_bson_document(&document)?)
            .await
            .map_err(map_error)?;

        Ok(document)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Document>, AppError> {
        if patch.is_empty() {
            return self.find_one(collection, filter).await;
        }

        self.collection(collection)
            .find_one_and_update(filter_to_bson(filter)?, patch_to_bson(patch)?)
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_error)?
            .map(from_bson_document)
            .transpose()
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        self.collection(collection)
            .find_one_and_delete(filter_to_bson(filter)?)
            .await
            .map_err(map_error)?
            .map(from_bson_document)
            .transpose()
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<DocumentStream, AppError> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline_to_bson(pipeline)?)
            .await
            .map_err(map_error)?;

        Ok(cursor
            .map_err(map_error)
            .and_then(|d| async move { from_bson_document(d) })
            .boxed())
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(
                IndexOptions::builder()
                    .name(format!("uniq_{}", field))
                    .unique(true)
                    .build(),
            )
            .build();

        self.collection(collection)
            .create_index(index)
            .await
            .map_err(map_error)?;

        tracing::debug!(collection, field, "Ensured unique index");
        Ok(())
    }
}
