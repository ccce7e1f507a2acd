//! Demo data: `Project 1..=N` with descriptions `Demo 1..=N`, written as one batch.

use tracing::info;

use crate::model::NewProject;
use crate::storage::{SharedStore, StoreResult};

pub const DEFAULT_COUNT: usize = 5;

/// Returns the ids written, in `Project 1..=N` order.
pub fn seed_projects(store: &SharedStore, count: usize) -> StoreResult<Vec<String>> {
    let batch = (1..=count)
        .map(|i| NewProject::new(format!("Project {i}"), Some(format!("Demo {i}"))))
        .collect();
    let ids = store.projects().create_many(batch)?;
    info!(target: "seed", count = ids.len(), "seeded projects");
    Ok(ids)
}
