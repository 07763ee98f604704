//! # File Executor
//!
//! create / update / str_replace / append / delete on one sandboxed path.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use super::{ExecStream, preview};
use crate::application::sandbox;
use crate::domain::types::{ExecChunk, FileAction, FileOp};
use crate::strings::messages;

const QUOTE_LIMIT: usize = 120;

pub fn run(action: FileAction, working_dir: PathBuf) -> ExecStream {
    Box::pin(futures::stream::once(async move {
        let chunk = apply(&action, &working_dir).await.unwrap_or_else(|e| {
            tracing::error!("File {} on {} failed: {:#}", action.op.name(), action.path, e);
            ExecChunk::failed(messages::file_operation_failed(action.op.name(), &format!("{:#}", e)))
        });
        Ok(chunk)
    }))
}

/// Metadata of `path`, or `None` when nothing exists there.
async fn probe(path: &Path) -> Result<Option<Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to inspect {}", path.display())),
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create parent directory {}", parent.display()))?;
    }
    Ok(())
}

pub async fn apply(action: &FileAction, working_dir: &Path) -> Result<ExecChunk> {
    let target = match sandbox::resolve(&action.path, working_dir) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("File {} rejected: {}", action.op.name(), e);
            return Ok(ExecChunk::failed(e.to_string()));
        }
    };
    let shown = target.display().to_string();
    let existing = probe(&target).await?;

    let chunk = match &action.op {
        FileOp::Create { file_text } => {
            if existing.is_some() {
                ExecChunk::warning(messages::file_already_exists(&shown))
            } else {
                ensure_parent(&target).await?;
                tokio::fs::write(&target, file_text)
                    .await
                    .with_context(|| format!("Failed to write {}", shown))?;
                ExecChunk::success(messages::file_created(&shown))
            }
        }
        FileOp::Update { file_text } => {
            if existing.as_ref().is_some_and(|m| m.is_dir()) {
                return Ok(ExecChunk::failed(messages::path_is_directory(&shown)));
            }
            ensure_parent(&target).await?;
            tokio::fs::write(&target, file_text)
                .await
                .with_context(|| format!("Failed to write {}", shown))?;
            ExecChunk::success(messages::file_updated(&shown))
        }
        FileOp::StrReplace { old_str, new_str } => {
            match &existing {
                None => return Ok(ExecChunk::failed(messages::file_not_found(&shown))),
                Some(meta) if meta.is_dir() => {
                    return Ok(ExecChunk::failed(messages::path_is_directory(&shown)));
                }
                Some(_) => {}
            }
            let content = tokio::fs::read_to_string(&target)
                .await
                .with_context(|| format!("Failed to read {}", shown))?;
            let count = content.matches(old_str.as_str()).count();
            if count == 0 {
                return Ok(ExecChunk::failed(messages::old_str_not_found(
                    &shown,
                    &preview(old_str, QUOTE_LIMIT),
                )));
            }

            let backup = format!("{}.bak", shown);
            tokio::fs::copy(&target, &backup)
                .await
                .with_context(|| format!("Failed to back up {} to {}", shown, backup))?;
            tokio::fs::write(&target, content.replace(old_str.as_str(), new_str))
                .await
                .with_context(|| format!("Failed to write {}", shown))?;
            ExecChunk::success(messages::file_replaced(&shown, count, &backup))
        }
        FileOp::Append { append_text } => {
            if existing.as_ref().is_some_and(|m| m.is_dir()) {
                return Ok(ExecChunk::failed(messages::path_is_directory(&shown)));
            }
            ensure_parent(&target).await?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&target)
                .await
                .with_context(|| format!("Failed to open {}", shown))?;
            file.write_all(append_text.as_bytes())
                .await
                .with_context(|| format!("Failed to append to {}", shown))?;
            file.flush().await?;
            ExecChunk::success(messages::file_appended(&shown))
        }
        FileOp::Delete => match &existing {
            None => ExecChunk::warning(messages::file_not_found(&shown)),
            Some(meta) if meta.is_dir() => ExecChunk::failed(messages::path_is_directory(&shown)),
            Some(_) => {
                tokio::fs::remove_file(&target)
                    .await
                    .with_context(|| format!("Failed to delete {}", shown))?;
                ExecChunk::success(messages::file_deleted(&shown))
            }
        },
    };

    tracing::debug!("file {} on {} -> {:?}", action.op.name(), shown, chunk.exit);
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ActionStatus;
    use tempfile::TempDir;

    fn file_action(path: &str, op: FileOp) -> FileAction {
        FileAction {
            path: path.to_string(),
            op,
        }
    }

    async fn status_of(dir: &TempDir, path: &str, op: FileOp) -> ActionStatus {
        apply(&file_action(path, op), dir.path())
            .await
            .unwrap()
            .exit
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_create_then_create_again_warns() {
        let dir = tempfile::tempdir().unwrap();
        let op = FileOp::Create {
            file_text: "hello".into(),
        };
        assert_eq!(status_of(&dir, "src/a.txt", op.clone()).await, ActionStatus::Success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/a.txt")).unwrap(),
            "hello"
        );

        let again = FileOp::Create {
            file_text: "other".into(),
        };
        assert_eq!(status_of(&dir, "src/a.txt", again).await, ActionStatus::Warning);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/a.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_update_overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.txt"), "old").unwrap();
        let op = |text: &str| FileOp::Update {
            file_text: text.into(),
        };
        assert_eq!(status_of(&dir, "x.txt", op("new")).await, ActionStatus::Success);
        assert_eq!(std::fs::read_to_string(dir.path().join("x.txt")).unwrap(), "new");
        assert_eq!(status_of(&dir, "/deep/er/y.txt", op("y")).await, ActionStatus::Success);
        assert!(dir.path().join("deep/er/y.txt").is_file());
    }

    #[tokio::test]
    async fn test_str_replace_replaces_all_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, "a = 1\nb = 1\n").unwrap();
        let op = FileOp::StrReplace {
            old_str: "= 1".into(),
            new_str: "= 2".into(),
        };
        assert_eq!(status_of(&dir, "app.py", op).await, ActionStatus::Success);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a = 2\nb = 2\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("app.py.bak")).unwrap(),
            "a = 1\nb = 1\n"
        );
    }

    #[tokio::test]
    async fn test_str_replace_missing_old_str_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        let original = b"print('hi')\r\n\xe2\x9c\x93\n".to_vec();
        std::fs::write(&path, &original).unwrap();
        let op = FileOp::StrReplace {
            old_str: "print('bye')".into(),
            new_str: "x".into(),
        };
        let status = status_of(&dir, "app.py", op).await;
        assert_ne!(status, ActionStatus::Success);
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_str_replace_on_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let op = FileOp::StrReplace {
            old_str: "a".into(),
            new_str: "b".into(),
        };
        assert_eq!(status_of(&dir, "nope.txt", op).await, ActionStatus::Failed);
    }

    #[tokio::test]
    async fn test_append_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let append = |text: &str| FileOp::Append {
            append_text: text.into(),
        };
        assert_eq!(status_of(&dir, "log/out.txt", append("a\n")).await, ActionStatus::Success);
        assert_eq!(status_of(&dir, "log/out.txt", append("b\n")).await, ActionStatus::Success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("log/out.txt")).unwrap(),
            "a\nb\n"
        );

        assert_eq!(status_of(&dir, "log/out.txt", FileOp::Delete).await, ActionStatus::Success);
        assert!(!dir.path().join("log/out.txt").exists());
        assert_eq!(status_of(&dir, "log/out.txt", FileOp::Delete).await, ActionStatus::Warning);
    }

    #[tokio::test]
    async fn test_escaping_path_fails_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("ws");
        std::fs::create_dir(&inner).unwrap();
        let chunk = apply(
            &file_action(
                "../escaped.txt",
                FileOp::Update {
                    file_text: "x".into(),
                },
            ),
            &inner,
        )
        .await
        .unwrap();
        assert_eq!(chunk.exit.unwrap().status, ActionStatus::Failed);
        assert!(!dir.path().join("escaped.txt").exists());
    }
}
