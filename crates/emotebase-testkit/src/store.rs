//! In-memory document store for testing
//!
//! Collections live in an `Arc<RwLock<HashMap>>`. Every pipeline stage is
//! evaluated in memory with the same filter semantics the engine assumes of a
//! real store. Individual operations can be made to fail on demand.

use async_lock::RwLock;
use async_trait::async_trait;
use emotebase_core::document::{get_path, remove_path, resolve_path, set_path};
use emotebase_core::filter::compare;
use emotebase_core::{
    Collection, Cursor, Document, DocumentStore, Expr, Filter, ObjectId, Pipeline,
    ReturnDocument, SortOrder, Stage, StoreError, UpdateDoc, UpdateResult, ID_FIELD,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `find_one`
    FindOne,
    /// `find_one_and_update`
    FindOneAndUpdate,
    /// `update_one`
    UpdateOne,
    /// `update_many`
    UpdateMany,
    /// `insert_one`
    InsertOne,
    /// `aggregate`
    Aggregate,
}

/// Memory document store for testing
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    data: Arc<RwLock<HashMap<Collection, Vec<Document>>>>,
    failures: Arc<RwLock<HashSet<(Collection, StoreOp)>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` on `collection` fail with a backend error
    pub async fn fail_on(&self, collection: Collection, op: StoreOp) {
        self.failures.write().await.insert((collection, op));
    }

    /// Stop failing `op` on `collection`
    pub async fn heal(&self, collection: Collection, op: StoreOp) {
        self.failures.write().await.remove(&(collection, op));
    }

    /// Number of successful write operations so far
    pub fn writes(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Every document in a collection (for testing)
    pub async fn documents(&self, collection: Collection) -> Vec<Document> {
        self.data
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Document with the given id, if present
    pub async fn get(&self, collection: Collection, id: ObjectId) -> Option<Document> {
        let filter = Filter::eq(ID_FIELD, id);
        self.documents(collection)
            .await
            .into_iter()
            .find(|doc| filter.matches(doc))
    }

    /// Insert a document without counting it as a write
    pub async fn seed(&self, collection: Collection, mut doc: Document) -> ObjectId {
        let id = assign_id(&mut doc).unwrap_or_default();
        self.data
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(doc);
        id
    }

    async fn check(&self, collection: Collection, op: StoreOp) -> Result<(), StoreError> {
        if self.failures.read().await.contains(&(collection, op)) {
            return Err(StoreError::backend(format!(
                "injected failure: {op:?} on {collection}"
            )));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
    }

    async fn update_matching(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
        limit: Option<usize>,
    ) -> UpdateResult {
        let mut data = self.data.write().await;
        let docs = data.entry(collection).or_default();
        let mut result = UpdateResult::default();
        for doc in docs.iter_mut().filter(|doc| filter.matches(doc)) {
            if limit.is_some_and(|n| result.matched as usize >= n) {
                break;
            }
            result.matched += 1;
            let before = doc.clone();
            update.apply(doc);
            if *doc != before {
                result.modified += 1;
            }
        }
        result
    }
}

fn assign_id(doc: &mut Document) -> Result<ObjectId, StoreError> {
    let existing = match doc.get(ID_FIELD) {
        Some(Value::String(s)) => Some(
            s.parse::<ObjectId>()
                .map_err(|e| StoreError::decode(format!("bad _id: {e}")))?,
        ),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(StoreError::decode(format!("bad _id: {other}")));
        }
    };
    match existing {
        Some(id) if !id.is_nil() => Ok(id),
        _ => {
            let id = ObjectId::new();
            doc.insert(ID_FIELD.to_string(), id.into());
            Ok(id)
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Document, StoreError> {
        self.check(collection, StoreOp::FindOne).await?;
        let data = self.data.read().await;
        data.get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
        returning: ReturnDocument,
    ) -> Result<Document, StoreError> {
        self.check(collection, StoreOp::FindOneAndUpdate).await?;
        let mut data = self.data.write().await;
        let doc = data
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|doc| filter.matches(doc))
            .ok_or(StoreError::NotFound)?;
        let before = doc.clone();
        update.apply(doc);
        self.record_write();
        Ok(match returning {
            ReturnDocument::Before => before,
            ReturnDocument::After => doc.clone(),
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateResult, StoreError> {
        self.check(collection, StoreOp::UpdateOne).await?;
        let result = self.update_matching(collection, filter, update, Some(1)).await;
        self.record_write();
        Ok(result)
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateResult, StoreError> {
        self.check(collection, StoreOp::UpdateMany).await?;
        let result = self.update_matching(collection, filter, update, None).await;
        self.record_write();
        Ok(result)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> Result<ObjectId, StoreError> {
        self.check(collection, StoreOp::InsertOne).await?;
        let id = assign_id(&mut doc)?;
        self.data
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(doc);
        self.record_write();
        Ok(id)
    }

    async fn aggregate(
        &self,
        collection: Collection,
        pipeline: &Pipeline,
    ) -> Result<Cursor, StoreError> {
        self.check(collection, StoreOp::Aggregate).await?;
        let data = self.data.read().await;
        let mut docs = data.get(&collection).cloned().unwrap_or_default();
        for stage in pipeline.stages() {
            docs = run_stage(&data, docs, stage);
        }
        Ok(Cursor::new(docs))
    }
}

fn run_stage(
    data: &HashMap<Collection, Vec<Document>>,
    mut docs: Vec<Document>,
    stage: &Stage,
) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => {
            docs.retain(|doc| filter.matches(doc));
            docs
        }
        Stage::Sort { field, order } => {
            docs.sort_by(|a, b| {
                let ordering = compare(&sort_key(a, field), &sort_key(b, field))
                    .unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
            docs
        }
        Stage::Limit(n) => {
            docs.truncate(*n);
            docs
        }
        Stage::Lookup {
            from,
            local_field,
            foreign_field,
            as_field,
        } => {
            let foreign = data.get(from).map(Vec::as_slice).unwrap_or_default();
            for doc in &mut docs {
                let locals = flatten(resolve_path(doc, local_field));
                let joined: Vec<Value> = foreign
                    .iter()
                    .filter(|candidate| {
                        flatten(resolve_path(candidate, foreign_field))
                            .iter()
                            .any(|value| locals.contains(value))
                    })
                    .cloned()
                    .map(Value::Object)
                    .collect();
                set_path(doc, as_field, Value::Array(joined));
            }
            docs
        }
        Stage::Set(fields) => {
            for doc in &mut docs {
                for (path, expr) in fields {
                    let value = eval(doc, expr);
                    set_path(doc, path, value);
                }
            }
            docs
        }
        Stage::Unset(paths) => {
            for doc in &mut docs {
                for path in paths {
                    remove_path(doc, path);
                }
            }
            docs
        }
        Stage::GroupAll { into } => {
            if docs.is_empty() {
                return docs;
            }
            let mut grouped = Document::new();
            grouped.insert(ID_FIELD.to_string(), Value::Null);
            grouped.insert(
                into.clone(),
                Value::Array(docs.into_iter().map(Value::Object).collect()),
            );
            vec![grouped]
        }
    }
}

fn sort_key(doc: &Document, field: &str) -> Value {
    resolve_path(doc, field)
        .into_iter()
        .next()
        .cloned()
        .unwrap_or(Value::Null)
}

fn flatten(values: Vec<&Value>) -> Vec<Value> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => out.extend(items.iter().cloned()),
            Value::Null => {}
            other => out.push(other.clone()),
        }
    }
    out
}

fn array_items<'a>(doc: &'a Document, path: &str) -> &'a [Value] {
    match get_path(doc, path) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

fn eval(doc: &Document, expr: &Expr) -> Value {
    let element_matches = |cond: &Filter, item: &Value| match item {
        Value::Object(map) => cond.matches(map),
        _ => false,
    };
    match expr {
        Expr::Size(path) => Value::from(array_items(doc, path).len()),
        Expr::FilterArray { input, cond } => Value::Array(
            array_items(doc, input)
                .iter()
                .filter(|item| element_matches(cond, item))
                .cloned()
                .collect(),
        ),
        Expr::FirstMatchField { input, cond, field } => array_items(doc, input)
            .iter()
            .find(|item| element_matches(cond, item))
            .and_then(|item| item.as_object())
            .and_then(|map| get_path(map, field))
            .cloned()
            .unwrap_or(Value::Null),
    }
}
