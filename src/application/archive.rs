//! # Plan Archive
//!
//! Audit trail of multi-part fetches: every prompt, every received part and the
//! reassembled plan land in one directory, stamped per fetch. Write failures are
//! logged and never interrupt the fetch.

use chrono::Local;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PlanArchive {
    dir: PathBuf,
    project_id: String,
    stamp: String,
}

impl PlanArchive {
    pub fn new(dir: impl Into<PathBuf>, project_id: &str) -> Self {
        Self {
            dir: dir.into(),
            project_id: project_id.to_string(),
            stamp: Local::now().format("%Y%m%d%H%M%S%3f").to_string(),
        }
    }

    pub fn request_path(&self, part: usize, total: usize) -> PathBuf {
        self.dir.join(format!(
            "{}-request-part-{}-of-{}-{}.txt",
            self.project_id, part, total, self.stamp
        ))
    }

    pub fn part_path(&self, part: usize, total: usize) -> PathBuf {
        self.dir.join(format!(
            "{}-plan-part-{}-of-{}-{}.txt",
            self.project_id, part, total, self.stamp
        ))
    }

    pub fn complete_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}-complete-{}.txt", self.project_id, self.stamp))
    }

    pub async fn record_request(&self, part: usize, total: usize, prompt: &str) {
        self.write(self.request_path(part, total), prompt).await;
    }

    pub async fn record_part(&self, part: usize, total: usize, content: &str) {
        self.write(self.part_path(part, total), content).await;
    }

    pub async fn record_complete(&self, plan: &str) {
        self.write(self.complete_path(), plan).await;
    }

    async fn write(&self, path: PathBuf, content: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!("Plan archive {} unavailable: {}", self.dir.display(), e);
            return;
        }
        match tokio::fs::write(&path, content).await {
            Ok(()) => tracing::debug!("Archived {}", path.display()),
            Err(e) => tracing::warn!("Failed to archive {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_land_in_archive_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PlanArchive::new(dir.path().join("plans"), "demo");
        archive.record_request(1, 2, "prompt").await;
        archive.record_part(1, 2, "part one").await;
        archive.record_complete("plan").await;

        assert_eq!(std::fs::read_to_string(archive.request_path(1, 2)).unwrap(), "prompt");
        assert_eq!(std::fs::read_to_string(archive.part_path(1, 2)).unwrap(), "part one");
        assert_eq!(std::fs::read_to_string(archive.complete_path()).unwrap(), "plan");

        let name = archive.part_path(1, 2);
        let name = name.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("demo-plan-part-1-of-2-"));
    }

    #[tokio::test]
    async fn test_back_to_back_fetches_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = PlanArchive::new(dir.path().to_path_buf(), "demo");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = PlanArchive::new(dir.path().to_path_buf(), "demo");
        assert_ne!(first.complete_path(), second.complete_path());

        first.record_complete("one").await;
        second.record_complete("two").await;
        assert_eq!(std::fs::read_to_string(first.complete_path()).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second.complete_path()).unwrap(), "two");

        let name = first.complete_path();
        let stamp = name.file_stem().unwrap().to_string_lossy();
        let stamp = stamp.trim_start_matches("demo-complete-");
        assert_eq!(stamp.len(), 17);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_unwritable_archive_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let archive = PlanArchive::new(blocker.join("plans"), "demo");
        archive.record_complete("plan").await;
        assert!(!archive.complete_path().exists());
    }
}
