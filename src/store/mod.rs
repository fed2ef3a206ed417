//! The project document store.
//!
//! The pipeline checkpoints through this interface only. Saves are atomic
//! for the whole Project aggregate, and the controller never issues
//! concurrent saves for the same project.

mod memory;
mod sqlite;

pub use memory::MemoryProjectStore;
pub use sqlite::SqliteProjectStore;

use async_trait::async_trait;

use crate::domain::Project;
use crate::error::Result;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project by id; `AppError::ProjectNotFound` when absent.
    async fn load(&self, project_id: &str) -> Result<Project>;

    /// Persist the whole aggregate atomically, inserting or replacing.
    async fn save(&self, project: &Project) -> Result<()>;

    /// Remove a project; absent ids are not an error.
    async fn delete(&self, project_id: &str) -> Result<()>;
}
