//! # Directory Executor
//!
//! Idempotent create and recursive delete of one sandboxed directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::ExecStream;
use crate::application::sandbox;
use crate::domain::types::{DirAction, DirOp, ExecChunk};
use crate::strings::messages;

pub fn run(action: DirAction, working_dir: PathBuf) -> ExecStream {
    Box::pin(futures::stream::once(async move {
        let op = match action.op {
            DirOp::Create => "create",
            DirOp::Delete => "delete",
        };
        let chunk = apply(&action, &working_dir).await.unwrap_or_else(|e| {
            tracing::error!("Directory {} on {} failed: {:#}", op, action.path, e);
            ExecChunk::failed(messages::dir_operation_failed(op, &format!("{:#}", e)))
        });
        Ok(chunk)
    }))
}

pub async fn apply(action: &DirAction, working_dir: &Path) -> Result<ExecChunk> {
    let target = match sandbox::resolve(&action.path, working_dir) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("Directory operation rejected: {}", e);
            return Ok(ExecChunk::failed(e.to_string()));
        }
    };
    let shown = target.display().to_string();

    let existing = match tokio::fs::metadata(&target).await {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e).with_context(|| format!("Failed to inspect {}", shown)),
    };

    let chunk = match action.op {
        DirOp::Create => match existing {
            Some(meta) if meta.is_dir() => ExecChunk::success(messages::dir_already_exists(&shown)),
            Some(_) => ExecChunk::failed(messages::path_is_file(&shown)),
            None => {
                tokio::fs::create_dir_all(&target)
                    .await
                    .with_context(|| format!("Failed to create {}", shown))?;
                ExecChunk::success(messages::dir_created(&shown))
            }
        },
        DirOp::Delete => {
            if sandbox::resolve(".", working_dir).is_ok_and(|root| root == target) {
                return Ok(ExecChunk::failed(messages::REFUSE_DELETE_ROOT));
            }
            match existing {
                None => ExecChunk::success(messages::dir_not_found(&shown)),
                Some(meta) if !meta.is_dir() => ExecChunk::failed(messages::path_is_file(&shown)),
                Some(_) => {
                    tokio::fs::remove_dir_all(&target)
                        .await
                        .with_context(|| format!("Failed to delete {}", shown))?;
                    ExecChunk::success(messages::dir_deleted(&shown))
                }
            }
        }
    };
    Ok(chunk)
}
