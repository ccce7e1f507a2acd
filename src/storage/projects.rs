use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::{auto_id, Direction, Document, Fields, Query, SharedStore, StoreResult, WriteOp};
use crate::model::NewProject;

pub const COLLECTION: &str = "projects";
pub const LIST_LIMIT: usize = 50;
pub const CREATED_AT: &str = "createdAt";

/// Fields a merge may never overwrite.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", CREATED_AT];

/// Project CRUD over the `projects` collection.
#[derive(Clone)]
pub struct ProjectStore {
    store: SharedStore,
    /// Last stamped creation time; keeps `createdAt` non-decreasing if the wall clock steps back.
    last_created: Arc<Mutex<Option<DateTime<Utc>>>>,
}

fn strip_immutable(mut partial: Fields) -> Fields {
    for k in IMMUTABLE_FIELDS {
        partial.remove(k);
    }
    partial
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-01-01T00:00:00.000Z`.
pub fn iso_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ProjectStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store, last_created: Arc::new(Mutex::new(None)) }
    }

    fn stamp(&self) -> String {
        self.stamp_at(Utc::now())
    }

    fn stamp_at(&self, now: DateTime<Utc>) -> String {
        let mut last = self.last_created.lock();
        let t = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(t);
        iso_timestamp(t)
    }

    /// Persist a validated project and return its new id.
    pub fn create(&self, project: NewProject) -> StoreResult<String> {
        let fields = project.into_fields(self.stamp());
        let id = self.store.add(COLLECTION, fields)?;
        debug!(target: "projects", id = %id, "created");
        Ok(id)
    }

    /// Insert several projects in one atomic batch; either all land or none do.
    pub fn create_many(&self, projects: Vec<NewProject>) -> StoreResult<Vec<String>> {
        let stamp = self.stamp();
        let mut ids = Vec::with_capacity(projects.len());
        let mut ops = Vec::with_capacity(projects.len());
        for p in projects {
            let id = auto_id()?;
            ops.push(WriteOp::Set { id: id.clone(), fields: p.into_fields(stamp.clone()) });
            ids.push(id);
        }
        self.store.commit(COLLECTION, ops)?;
        debug!(target: "projects", count = ids.len(), "batch created");
        Ok(ids)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.store.get(COLLECTION, id)
    }

    pub fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Newest first, at most `LIST_LIMIT`.
    pub fn list(&self) -> StoreResult<Vec<Document>> {
        let q = Query::new().order_by(CREATED_AT, Direction::Desc).limit(LIST_LIMIT);
        self.store.query(COLLECTION, &q)
    }

    /// Merge `partial` into the project without validating it or checking that it exists;
    /// an absent id ends up holding just the merged fields.
    pub fn update(&self, id: &str, partial: Fields) -> StoreResult<()> {
        self.store.merge(COLLECTION, id, strip_immutable(partial))
    }

    /// Merge only if the project exists; `false` means nothing was written.
    pub fn update_existing(&self, id: &str, partial: Fields) -> StoreResult<bool> {
        self.store.update_existing(COLLECTION, id, strip_immutable(partial))
    }

    pub fn remove(&self, id: &str) -> StoreResult<()> {
        self.store.delete(COLLECTION, id)
    }
}
