use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    auto_id, compare_values, merge_fields, Direction, Document, DocumentStore, Fields, Query,
    StoreError, StoreResult, WriteOp,
};

const SNAPSHOT_FILE: &str = "snapshot.bin";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone)]
struct Entry {
    fields: Fields,
    /// Insertion sequence; breaks ties between equal ordering values (newer wins on desc).
    seq: u64,
}

#[derive(Clone, Default)]
struct State {
    next_seq: u64,
    /// collection -> (id -> entry)
    collections: HashMap<String, HashMap<String, Entry>>,
}

impl State {
    fn collection_mut(&mut self, name: &str) -> &mut HashMap<String, Entry> {
        self.collections.entry(name.to_string()).or_default()
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections.get(collection).is_some_and(|c| c.contains_key(id))
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn apply(&mut self, collection: &str, op: WriteOp) {
        match op {
            WriteOp::Set { id, fields } => {
                let seq = self.bump();
                self.collection_mut(collection).insert(id, Entry { fields, seq });
            }
            WriteOp::Merge { id, fields } => {
                let seq = self.bump();
                let col = self.collection_mut(collection);
                match col.get_mut(&id) {
                    Some(existing) => merge_fields(&mut existing.fields, fields),
                    None => {
                        let mut fresh = Fields::new();
                        merge_fields(&mut fresh, fields);
                        col.insert(id, Entry { fields: fresh, seq });
                    }
                }
            }
            WriteOp::Delete { id } => {
                if let Some(col) = self.collections.get_mut(collection) {
                    col.remove(&id);
                }
            }
        }
    }
}

// Field maps travel as JSON bytes: bincode cannot decode self-describing serde_json values.
#[derive(Serialize, Deserialize)]
struct SnapEntry { collection: String, id: String, seq: u64, fields: Vec<u8> }
#[derive(Serialize, Deserialize)]
struct Snapshot { version: u32, created_ms: i64, next_seq: u64, entries: Vec<SnapEntry> }

/// In-memory document store with optional write-through snapshot persistence.
///
/// When opened on a directory, every mutation rewrites `<dir>/snapshot.bin`
/// (temp file + rename). If that write fails the mutation is rolled back and the
/// caller sees `StoreError::Unavailable`, so memory never runs ahead of disk.
///
/// Each persisted write clones the state and rewrites the whole snapshot under the
/// write lock, so write cost grows with store size. Fine for starter-sized data sets.
pub struct MemoryStore {
    state: RwLock<State>,
    dir: Option<PathBuf>,
}

impl MemoryStore {
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(State::default()), dir: None }
    }

    /// Open (or create) a persisted store rooted at `dir`, loading any snapshot found there.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Unavailable(format!("create {}: {}", dir.display(), e)))?;
        let store = Self { state: RwLock::new(State::default()), dir: Some(dir) };
        store.load_snapshot()?;
        Ok(store)
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(SNAPSHOT_FILE))
    }

    fn load_snapshot(&self) -> StoreResult<()> {
        let Some(path) = self.snapshot_path() else { return Ok(()) };
        if !path.exists() { return Ok(()); }
        let bytes = std::fs::read(&path)
            .map_err(|e| StoreError::Unavailable(format!("read {}: {}", path.display(), e)))?;
        let snap: Snapshot = bincode::deserialize(&bytes).map_err(|e| StoreError::Encoding(e.to_string()))?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(StoreError::Encoding(format!("unsupported snapshot version {}", snap.version)));
        }
        let mut st = State { next_seq: snap.next_seq, collections: HashMap::new() };
        let count = snap.entries.len();
        for e in snap.entries.into_iter() {
            let fields: Fields = serde_json::from_slice(&e.fields).map_err(|err| StoreError::Encoding(err.to_string()))?;
            st.collection_mut(&e.collection).insert(e.id, Entry { fields, seq: e.seq });
        }
        *self.state.write() = st;
        info!(target: "storage", path = %path.display(), documents = count, "snapshot loaded");
        Ok(())
    }

    fn save_snapshot(&self, st: &State) -> StoreResult<()> {
        let Some(path) = self.snapshot_path() else { return Ok(()) };
        let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);
        let mut entries = Vec::new();
        for (collection, docs) in st.collections.iter() {
            for (id, ent) in docs.iter() {
                let fields = serde_json::to_vec(&ent.fields).map_err(|e| StoreError::Encoding(e.to_string()))?;
                entries.push(SnapEntry { collection: collection.clone(), id: id.clone(), seq: ent.seq, fields });
            }
        }
        let snap = Snapshot { version: SNAPSHOT_VERSION, created_ms: now_ms, next_seq: st.next_seq, entries };
        let bytes = bincode::serialize(&snap).map_err(|e| StoreError::Encoding(e.to_string()))?;
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| StoreError::Unavailable(format!("write {}: {}", path.display(), e)))?;
        debug!(target: "storage", documents = snap.entries.len(), "snapshot written");
        Ok(())
    }

    /// Apply a mutation, persist, and roll back if persistence fails.
    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> StoreResult<T> {
        let mut st = self.state.write();
        self.write_locked(&mut st, f)
    }

    /// Same as `write`, for callers that already hold the lock (check-then-write).
    fn write_locked<T>(&self, st: &mut State, f: impl FnOnce(&mut State) -> T) -> StoreResult<T> {
        if self.dir.is_none() {
            return Ok(f(st));
        }
        let backup = st.clone();
        let out = f(st);
        if let Err(e) = self.save_snapshot(st) {
            warn!(target: "storage", error = %e, "persist failed, rolling back");
            *st = backup;
            return Err(e);
        }
        Ok(out)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let st = self.state.read();
        Ok(st
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|e| Document { id: id.to_string(), fields: e.fields.clone() }))
    }

    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = auto_id()?;
        let key = id.clone();
        self.write(|st| st.apply(collection, WriteOp::Set { id: key, fields }))?;
        Ok(id)
    }

    fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.write(|st| st.apply(collection, WriteOp::Set { id: id.to_string(), fields }))
    }

    fn merge(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.write(|st| st.apply(collection, WriteOp::Merge { id: id.to_string(), fields }))
    }

    fn update_existing(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<bool> {
        let mut st = self.state.write();
        if !st.contains(collection, id) {
            return Ok(false);
        }
        self.write_locked(&mut st, |st| st.apply(collection, WriteOp::Merge { id: id.to_string(), fields }))?;
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut st = self.state.write();
        // Deleting nothing still succeeds, but skip the snapshot rewrite.
        if !st.contains(collection, id) {
            return Ok(());
        }
        self.write_locked(&mut st, |st| st.apply(collection, WriteOp::Delete { id: id.to_string() }))
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let st = self.state.read();
        let Some(col) = st.collections.get(collection) else { return Ok(Vec::new()) };
        let mut rows: Vec<(&String, &Entry)> = match &query.order_by {
            Some((field, _)) => col.iter().filter(|(_, e)| e.fields.contains_key(field)).collect(),
            None => col.iter().collect(),
        };
        match &query.order_by {
            Some((field, dir)) => rows.sort_by(|(_, a), (_, b)| {
                let (x, y) = (a.fields.get(field).unwrap_or(&Value::Null), b.fields.get(field).unwrap_or(&Value::Null));
                let ord = compare_values(x, y).then(a.seq.cmp(&b.seq));
                if *dir == Direction::Desc { ord.reverse() } else { ord }
            }),
            None => rows.sort_by(|(a, _), (b, _)| a.cmp(b)),
        }
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(id, e)| Document { id: id.clone(), fields: e.fields.clone() })
            .collect())
    }

    fn commit(&self, collection: &str, ops: Vec<WriteOp>) -> StoreResult<()> {
        self.write(|st| {
            for op in ops {
                st.apply(collection, op);
            }
        })
    }

    fn flush(&self) -> StoreResult<()> {
        let st = self.state.read();
        self.save_snapshot(&*st)
    }
}
