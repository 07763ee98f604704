//! # Project Bootstrap
//!
//! Turns free-form project steps into a bash script through the LLM, stores the script
//! in the project directory and wraps its execution in a single shell action.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::errors::LlmError;
use crate::domain::traits::{CompletionRequest, LlmProvider};
use crate::domain::types::Action;
use crate::strings::{messages, prompts};

/// A generated script written into the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScript {
    pub path: PathBuf,
    pub file_name: String,
    pub content: String,
}

impl ProjectScript {
    /// Shell action running the script from the project directory.
    pub fn action(&self) -> Action {
        Action::shell(
            format!("bash ./{}", self.file_name),
            messages::run_project_script(&self.file_name),
        )
    }
}

#[derive(Clone)]
pub struct ProjectBootstrap {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl ProjectBootstrap {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Asks the LLM for a script implementing `steps`. Markdown fences are removed.
    pub async fn generate(&self, steps: &str) -> Result<String, LlmError> {
        let request = CompletionRequest::new(prompts::project_script_prompt(steps))
            .with_max_tokens(self.max_tokens);
        let raw = self.llm.completion(request).await?;
        let script = extract_script(&raw);
        tracing::info!("Generated project script:\n{}", script);
        Ok(script)
    }
}

/// Returns the script body: the content of the outermost ``` fence when present,
/// otherwise the whole response.
pub fn extract_script(raw: &str) -> String {
    let text = raw.trim();
    let body = match text.find("```") {
        Some(start) => {
            let after_open = &text[start + 3..];
            // Skip the rest of the opening fence line (language tag).
            let body = after_open
                .find('\n')
                .map(|nl| &after_open[nl + 1..])
                .unwrap_or("");
            match body.rfind("```") {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => text,
    };
    format!("{}\n", body.trim())
}

/// Writes the script as `create-project-<timestamp>.sh`, executable on unix.
pub async fn write_script(working_dir: &Path, content: &str) -> Result<ProjectScript> {
    let file_name = format!("create-project-{}.sh", Local::now().format("%Y%m%d%H%M%S%3f"));
    let path = working_dir.join(&file_name);
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write project script {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .await
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    Ok(ProjectScript {
        path,
        file_name,
        content: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ActionKind;
    use async_trait::async_trait;

    struct FixedLlm(String);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn completion(&self, request: CompletionRequest) -> Result<String, LlmError> {
            assert_eq!(request.max_tokens, Some(2048));
            assert!(request.prompt.contains("mkdir api"));
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_extract_script() {
        assert_eq!(extract_script("echo hi"), "echo hi\n");
        assert_eq!(
            extract_script("Here you go:\n```bash\n#!/bin/bash\nmkdir app\n```\nEnjoy"),
            "#!/bin/bash\nmkdir app\n"
        );
        let nested = "```sh\ncat > README.md <<'EOF'\n```\ncode\n```\nEOF\n```";
        assert_eq!(
            extract_script(nested),
            "cat > README.md <<'EOF'\n```\ncode\n```\nEOF\n"
        );
    }

    #[tokio::test]
    async fn test_generate_strips_fences() {
        let llm = Arc::new(FixedLlm("```bash\nmkdir api\n```".into()));
        let script = ProjectBootstrap::new(llm, 2048)
            .generate("1. mkdir api")
            .await
            .unwrap();
        assert_eq!(script, "mkdir api\n");
    }

    #[tokio::test]
    async fn test_write_script_and_action() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo hi\n").await.unwrap();
        assert!(script.file_name.starts_with("create-project-"));
        assert!(script.file_name.ends_with(".sh"));
        assert_eq!(std::fs::read_to_string(&script.path).unwrap(), "echo hi\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&script.path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        let action = script.action();
        match action.kind {
            ActionKind::Shell(shell) => {
                assert_eq!(shell.command, format!("bash ./{}", script.file_name));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
