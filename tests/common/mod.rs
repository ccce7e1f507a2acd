#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use strata::config::{LocaleConfig, PatchPolicy};
use strata::identity::{mint_token, HmacTokenVerifier, ServiceAccount};
use strata::server::{self, AppState};
use strata::storage::{Document, DocumentStore, Fields, MemoryStore, Query, SharedStore, StoreError, StoreResult, WriteOp};
use strata::web::{self, ApiClient, WebState};

pub const PROJECT_ID: &str = "strata-test";

pub fn account() -> ServiceAccount {
    ServiceAccount { project_id: Some(PROJECT_ID.into()), client_email: None, signing_key: "integration-key".into() }
}

pub fn token() -> String {
    mint_token(&account(), "tester", Duration::from_secs(600)).unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {}", token())
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start the API on an ephemeral port; returns its base URL.
pub async fn spawn_api(store: SharedStore, policy: PatchPolicy) -> String {
    spawn_state(AppState::new(store, HmacTokenVerifier::new(&account()), policy)).await
}

pub async fn spawn_state(state: AppState) -> String {
    let (listener, addr) = bind().await;
    tokio::spawn(server::serve(listener, state, std::future::pending()));
    format!("http://{addr}")
}

/// Start the frontend against `api_base` with a valid demo token.
pub async fn spawn_web(api_base: &str) -> String {
    let (listener, addr) = bind().await;
    let api = ApiClient::new(api_base, &token()).unwrap();
    tokio::spawn(web::serve(listener, WebState::new(api, LocaleConfig::default()), std::future::pending()));
    format!("http://{addr}")
}

pub fn http() -> reqwest::Client {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap()
}

/// Memory store that counts every call reaching it.
pub struct CountingStore {
    inner: MemoryStore,
    pub calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Self { inner: MemoryStore::in_memory(), calls: calls.clone() }, calls)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl DocumentStore for CountingStore {
    fn get(&self, c: &str, id: &str) -> StoreResult<Option<Document>> { self.hit(); self.inner.get(c, id) }
    fn add(&self, c: &str, f: Fields) -> StoreResult<String> { self.hit(); self.inner.add(c, f) }
    fn set(&self, c: &str, id: &str, f: Fields) -> StoreResult<()> { self.hit(); self.inner.set(c, id, f) }
    fn merge(&self, c: &str, id: &str, f: Fields) -> StoreResult<()> { self.hit(); self.inner.merge(c, id, f) }
    fn update_existing(&self, c: &str, id: &str, f: Fields) -> StoreResult<bool> { self.hit(); self.inner.update_existing(c, id, f) }
    fn delete(&self, c: &str, id: &str) -> StoreResult<()> { self.hit(); self.inner.delete(c, id) }
    fn query(&self, c: &str, q: &Query) -> StoreResult<Vec<Document>> { self.hit(); self.inner.query(c, q) }
    fn commit(&self, c: &str, ops: Vec<WriteOp>) -> StoreResult<()> { self.hit(); self.inner.commit(c, ops) }
}

/// Store whose backend is gone.
pub struct DownStore;

impl DocumentStore for DownStore {
    fn get(&self, _: &str, _: &str) -> StoreResult<Option<Document>> { Err(down()) }
    fn add(&self, _: &str, _: Fields) -> StoreResult<String> { Err(down()) }
    fn set(&self, _: &str, _: &str, _: Fields) -> StoreResult<()> { Err(down()) }
    fn merge(&self, _: &str, _: &str, _: Fields) -> StoreResult<()> { Err(down()) }
    fn update_existing(&self, _: &str, _: &str, _: Fields) -> StoreResult<bool> { Err(down()) }
    fn delete(&self, _: &str, _: &str) -> StoreResult<()> { Err(down()) }
    fn query(&self, _: &str, _: &Query) -> StoreResult<Vec<Document>> { Err(down()) }
    fn commit(&self, _: &str, _: Vec<WriteOp>) -> StoreResult<()> { Err(down()) }
}

fn down() -> StoreError {
    StoreError::Unavailable("backend offline".into())
}

/// Memory store where a concurrent DELETE always wins the race against PATCH:
/// the target is removed just before the conditional update runs.
pub struct DeletedUnderfootStore {
    pub inner: MemoryStore,
}

impl DocumentStore for DeletedUnderfootStore {
    fn get(&self, c: &str, id: &str) -> StoreResult<Option<Document>> { self.inner.get(c, id) }
    fn add(&self, c: &str, f: Fields) -> StoreResult<String> { self.inner.add(c, f) }
    fn set(&self, c: &str, id: &str, f: Fields) -> StoreResult<()> { self.inner.set(c, id, f) }
    fn merge(&self, c: &str, id: &str, f: Fields) -> StoreResult<()> { self.inner.merge(c, id, f) }
    fn update_existing(&self, c: &str, id: &str, f: Fields) -> StoreResult<bool> {
        self.inner.delete(c, id)?;
        self.inner.update_existing(c, id, f)
    }
    fn delete(&self, c: &str, id: &str) -> StoreResult<()> { self.inner.delete(c, id) }
    fn query(&self, c: &str, q: &Query) -> StoreResult<Vec<Document>> { self.inner.query(c, q) }
    fn commit(&self, c: &str, ops: Vec<WriteOp>) -> StoreResult<()> { self.inner.commit(c, ops) }
}
