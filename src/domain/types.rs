//! # Domain Types
//!
//! Common data structures used across the parser, the executors and the agent.

use serde::{Deserialize, Serialize};

/// One validated unit of work extracted from plan text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// Parameters in order of appearance, entity-unescaped, alias-implied values included.
    pub parameters: Vec<(String, String)>,
    pub description: String,
}

impl Action {
    /// A shell action built outside the parser (generated scripts).
    pub fn shell(command: impl Into<String>, description: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            kind: ActionKind::Shell(ShellAction {
                command: command.clone(),
                cwd: None,
            }),
            parameters: vec![("command".to_string(), command)],
            description: description.into(),
        }
    }

    /// Canonical action type name (`shell_command`, `file_edit`, `directory`).
    pub fn action_type(&self) -> &'static str {
        self.kind.action_type()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `command` parameter, reported in every Feedback for this action.
    pub fn command(&self) -> &str {
        self.param("command").unwrap_or_default()
    }

    /// Renders the action back into function-call markup. Values are entity-escaped so
    /// embedded markup survives a re-parse unchanged.
    pub fn to_markup(&self) -> String {
        let mut out = format!("<function={}>\n", self.action_type());
        for (key, value) in &self.parameters {
            out.push_str(&format!(
                "<parameter={}>{}</parameter>\n",
                key,
                quick_xml::escape::minimal_escape(value)
            ));
        }
        out.push_str("</function>");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Shell(ShellAction),
    File(FileAction),
    Directory(DirAction),
}

impl ActionKind {
    pub fn action_type(&self) -> &'static str {
        match self {
            ActionKind::Shell(_) => crate::domain::schema::SHELL_COMMAND,
            ActionKind::File(_) => crate::domain::schema::FILE_EDIT,
            ActionKind::Directory(_) => crate::domain::schema::DIRECTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAction {
    pub command: String,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAction {
    pub path: String,
    pub op: FileOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    Create { file_text: String },
    Update { file_text: String },
    StrReplace { old_str: String, new_str: String },
    Append { append_text: String },
    Delete,
}

impl FileOp {
    pub fn name(&self) -> &'static str {
        match self {
            FileOp::Create { .. } => "create",
            FileOp::Update { .. } => "update",
            FileOp::StrReplace { .. } => "str_replace",
            FileOp::Append { .. } => "append",
            FileOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirAction {
    pub path: String,
    pub op: DirOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOp {
    Create,
    Delete,
}

/// Lifecycle of one action as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Warning,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Running => "running",
            ActionStatus::Success => "success",
            ActionStatus::Warning => "warning",
            ActionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionStatus::Running)
    }
}

/// Action index used for events that do not belong to an action (plan, parse, translation).
pub const PLAN_EVENT_INDEX: i32 = -1;

/// One streamed progress/result event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub action_index: i32,
    pub action_type: String,
    pub description: String,
    pub status: ActionStatus,
    pub output: String,
    pub error: String,
    pub command: String,
    pub step_index: u32,
    pub total_steps: u32,
    pub exit_code: i32,
    pub complete_plan: Option<String>,
}

impl Feedback {
    /// Event scoped to one action of one step.
    pub fn for_action(
        action_index: usize,
        action: &Action,
        step: StepPosition,
        status: ActionStatus,
    ) -> Self {
        Self {
            action_index: action_index as i32,
            action_type: action.action_type().to_string(),
            description: action.description.clone(),
            status,
            output: String::new(),
            error: String::new(),
            command: action.command().to_string(),
            step_index: step.index,
            total_steps: step.total,
            exit_code: 0,
            complete_plan: None,
        }
    }

    /// Event that is not tied to an action (parse failures, plan delivery).
    pub fn plan_event(
        action_type: &str,
        description: impl Into<String>,
        status: ActionStatus,
        step: StepPosition,
    ) -> Self {
        Self {
            action_index: PLAN_EVENT_INDEX,
            action_type: action_type.to_string(),
            description: description.into(),
            status,
            output: String::new(),
            error: String::new(),
            command: String::new(),
            step_index: step.index,
            total_steps: step.total,
            exit_code: 0,
            complete_plan: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_complete_plan(mut self, plan: impl Into<String>) -> Self {
        self.complete_plan = Some(plan.into());
        self
    }
}

/// 1-based step index plus the step count, known when the plan is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepPosition {
    pub index: u32,
    pub total: u32,
}

impl StepPosition {
    pub fn new(index: usize, total: usize) -> Self {
        Self {
            index: index as u32,
            total: total as u32,
        }
    }
}

/// Terminal marker carried by the last chunk of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    pub code: i32,
    pub status: ActionStatus,
}

/// One piece of executor output: `(stdout, stderr, exit|none)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecChunk {
    pub stdout: String,
    pub stderr: String,
    pub exit: Option<Exit>,
}

impl ExecChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            ..Default::default()
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stderr: text.into(),
            ..Default::default()
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::stdout(message).finish(ActionStatus::Success, 0)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::stderr(message).finish(ActionStatus::Warning, 0)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::stderr(message).finish(ActionStatus::Failed, 1)
    }

    pub fn finish(mut self, status: ActionStatus, code: i32) -> Self {
        self.exit = Some(Exit { code, status });
        self
    }
}

/// One round-trip to the completion endpoint during a multi-part fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPart {
    pub sequence_number: usize,
    pub total_parts: usize,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(command: &str) -> Action {
        Action {
            kind: ActionKind::Shell(ShellAction {
                command: command.to_string(),
                cwd: None,
            }),
            parameters: vec![("command".to_string(), command.to_string())],
            description: format!("shell_command(command='{}')", command),
        }
    }

    #[test]
    fn test_feedback_for_action_carries_command() {
        let action = shell("ls -la");
        let fb = Feedback::for_action(2, &action, StepPosition::new(1, 3), ActionStatus::Running);
        assert_eq!(fb.action_index, 2);
        assert_eq!(fb.action_type, "shell_command");
        assert_eq!(fb.command, "ls -la");
        assert_eq!(fb.step_index, 1);
        assert_eq!(fb.total_steps, 3);
        assert!(fb.complete_plan.is_none());
    }

    #[test]
    fn test_to_markup() {
        let markup = shell("pwd").to_markup();
        assert_eq!(
            markup,
            "<function=shell_command>\n<parameter=command>pwd</parameter>\n</function>"
        );
    }

    #[test]
    fn test_terminal_chunks() {
        assert_eq!(
            ExecChunk::failed("boom").exit,
            Some(Exit { code: 1, status: ActionStatus::Failed })
        );
        assert!(ExecChunk::stdout("x").exit.is_none());
        assert!(ActionStatus::Warning.is_terminal());
        assert!(!ActionStatus::Running.is_terminal());
    }
}
