//! In-memory project store for tests and storeless runs.

use async_trait::async_trait;
use dashmap::DashMap;

use super::ProjectStore;
use crate::domain::Project;
use crate::error::{AppError, Result};

#[derive(Default)]
pub struct MemoryProjectStore {
    projects: DashMap<String, Project>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, project_id: &str) -> bool {
        self.projects.contains_key(project_id)
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn load(&self, project_id: &str) -> Result<Project> {
        self.projects
            .get(project_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
    }

    async fn save(&self, project: &Project) -> Result<()> {
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        self.projects.remove(project_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InputFiles;

    #[tokio::test]
    async fn behaves_like_a_store() {
        let store = MemoryProjectStore::new();
        let project = Project::new("https://old.site", "https://new.site", InputFiles::default());

        store.save(&project).await.unwrap();
        assert!(store.contains(&project.id));

        let loaded = store.load(&project.id).await.unwrap();
        assert_eq!(loaded.id, project.id);

        store.delete(&project.id).await.unwrap();
        assert!(matches!(
            store.load(&project.id).await,
            Err(AppError::ProjectNotFound(_))
        ));
    }
}
