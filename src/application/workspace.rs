//! # Project Workspaces
//!
//! Maps project ids to directories under one base directory, creating them on first use,
//! and hands out a per-project lease so two calls never run in the same tree at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::errors::WorkspaceError;

/// Project id used when a request leaves it empty.
pub const DEFAULT_PROJECT_ID: &str = "default";

/// Exclusive hold on one project directory for the duration of a call.
pub struct ProjectLease {
    pub project_id: String,
    pub working_dir: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug)]
pub struct ProjectWorkspaces {
    base: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProjectWorkspaces {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = std::path::absolute(&base).unwrap_or(base);
        Self {
            base,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Validates the id and returns `{base}/{id}`, creating the directory if needed.
    pub fn resolve(&self, project_id: &str) -> Result<(String, PathBuf), WorkspaceError> {
        let id = normalize_project_id(project_id)?;
        let dir = self.base.join(&id);
        std::fs::create_dir_all(&dir).map_err(|source| WorkspaceError::Create {
            path: dir.clone(),
            source,
        })?;
        Ok((id, dir))
    }

    /// Resolves the project and waits until no other call holds it.
    pub async fn lease(&self, project_id: &str) -> Result<ProjectLease, WorkspaceError> {
        let (id, working_dir) = self.resolve(project_id)?;
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        if lock.try_lock().is_err() {
            tracing::info!("Project '{}' is busy, waiting for the running call", id);
        }
        let guard = lock.lock_owned().await;
        Ok(ProjectLease {
            project_id: id,
            working_dir,
            _guard: guard,
        })
    }
}

/// Empty ids map to the default project; ids must be a single plain path component.
pub fn normalize_project_id(project_id: &str) -> Result<String, WorkspaceError> {
    let id = project_id.trim();
    if id.is_empty() {
        return Ok(DEFAULT_PROJECT_ID.to_string());
    }
    let invalid = id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || id.chars().any(char::is_control);
    if invalid {
        return Err(WorkspaceError::InvalidProjectId(project_id.to_string()));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_normalize_project_id() {
        assert_eq!(normalize_project_id("").unwrap(), "default");
        assert_eq!(normalize_project_id("  web-app ").unwrap(), "web-app");
        for bad in ["..", ".", "a/b", "../etc", "a\\b", "x\ny"] {
            assert!(normalize_project_id(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_resolve_creates_directory_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let workspaces = ProjectWorkspaces::new(dir.path());
        let (id, path) = workspaces.resolve("demo").unwrap();
        assert_eq!(id, "demo");
        assert_eq!(path, dir.path().join("demo"));
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_lease_serializes_same_project() {
        let dir = tempfile::tempdir().unwrap();
        let workspaces = Arc::new(ProjectWorkspaces::new(dir.path()));

        let first = workspaces.lease("demo").await.unwrap();
        let contender = {
            let workspaces = workspaces.clone();
            tokio::spawn(async move { workspaces.lease("demo").await.map(|l| l.project_id) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        // A different project is not blocked.
        let other = workspaces.lease("other").await.unwrap();
        assert_eq!(other.project_id, "other");

        drop(first);
        let id = contender.await.unwrap().unwrap();
        assert_eq!(id, "demo");
    }
}
