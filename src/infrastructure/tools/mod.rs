//! # Tools Module
//!
//! Action executors (shell, file, directory) confined to one project working directory.
//! Each execution is a lazy stream of output chunks whose last item carries the exit status.

pub mod directory;
pub mod file;
pub mod shell;

use futures::stream::BoxStream;
use std::path::PathBuf;

use crate::domain::types::{Action, ActionKind, ExecChunk};

/// Chunks produced by one execution. An `Err` item ends the execution as a failure.
pub type ExecStream = BoxStream<'static, anyhow::Result<ExecChunk>>;

/// Executes validated actions inside a working directory.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    working_dir: PathBuf,
    output_buffer: usize,
}

impl ToolExecutor {
    pub fn new(working_dir: impl Into<PathBuf>, output_buffer: usize) -> Self {
        Self {
            working_dir: working_dir.into(),
            output_buffer: output_buffer.max(1),
        }
    }

    pub fn execute(&self, action: &Action) -> ExecStream {
        let working_dir = self.working_dir.clone();
        match &action.kind {
            ActionKind::Shell(shell) => shell::run(shell.clone(), working_dir, self.output_buffer),
            ActionKind::File(file) => file::run(file.clone(), working_dir),
            ActionKind::Directory(dir) => directory::run(dir.clone(), working_dir),
        }
    }
}

/// Shortens long values quoted in feedback messages.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
        assert_eq!(preview("日本語テキスト", 3), "日本語...");
    }
}
