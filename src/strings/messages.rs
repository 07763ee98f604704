//! # Messages
//!
//! Output and error text carried by Feedback events.

// File executor
pub fn file_created(path: &str) -> String {
    format!("File created: {path}\n")
}

pub fn file_already_exists(path: &str) -> String {
    format!("File already exists, left untouched: {path}")
}

pub fn file_updated(path: &str) -> String {
    format!("File content overwritten: {path}\n")
}

pub fn file_not_found(path: &str) -> String {
    format!("File does not exist: {path}")
}

pub fn old_str_not_found(path: &str, old_str: &str) -> String {
    format!("Text to replace not found in {path}: {old_str}")
}

pub fn file_replaced(path: &str, count: usize, backup: &str) -> String {
    format!("Replaced {count} occurrence(s) in {path} (backup: {backup})\n")
}

pub fn file_appended(path: &str) -> String {
    format!("Content appended to file: {path}\n")
}

pub fn file_deleted(path: &str) -> String {
    format!("File deleted: {path}\n")
}

pub fn path_is_directory(path: &str) -> String {
    format!("Path is a directory, not a file: {path}")
}

pub fn file_operation_failed(op: &str, err: &str) -> String {
    format!("File {op} failed: {err}")
}

// Directory executor
pub fn dir_created(path: &str) -> String {
    format!("Directory created: {path}\n")
}

pub fn dir_already_exists(path: &str) -> String {
    format!("Directory already exists: {path}\n")
}

pub fn dir_deleted(path: &str) -> String {
    format!("Directory deleted: {path}\n")
}

pub fn dir_not_found(path: &str) -> String {
    format!("Directory does not exist: {path}\n")
}

pub fn path_is_file(path: &str) -> String {
    format!("Path exists and is not a directory: {path}")
}

pub const REFUSE_DELETE_ROOT: &str = "Refusing to delete the project working directory itself";

pub fn dir_operation_failed(op: &str, err: &str) -> String {
    format!("Directory {op} failed: {err}")
}

// Shell executor
pub fn command_finished(code: i32) -> String {
    format!("Command finished, exit code: {code}\n")
}

pub const COMMAND_KILLED: &str = "Command terminated by a signal";

pub fn command_spawn_failed(err: &str) -> String {
    format!("Failed to start command: {err}")
}

// Agent
pub fn step_parse_failed(err: &str) -> String {
    format!("Step could not be parsed: {err}")
}

pub fn step_translation_failed(err: &str) -> String {
    format!("Step translation through the LLM failed: {err}")
}

pub const STEP_ACTION_TYPE: &str = "plan_step";

pub const STEP_NOT_TRANSLATED: &str =
    "Step contains no function blocks and step translation is disabled";
pub const STEP_HAS_NO_ACTIONS: &str = "Step produced no actions";
pub const STEP_DESCRIPTION: &str = "Parse step into actions";

pub fn action_aborted(err: &str) -> String {
    format!("Action aborted: {err}")
}

// Plans
pub const PLAN_ACTION_TYPE: &str = "llm_plan";
pub const PLAN_COMPLETE: &str = "Complete plan generated";

pub fn plan_fetch_failed(err: &str) -> String {
    format!("Plan fetch failed: {err}")
}

pub const SCRIPT_ACTION_TYPE: &str = "project_script";
pub const SCRIPT_GENERATED: &str = "Project script generated";

pub fn script_generation_failed(err: &str) -> String {
    format!("Project script generation failed: {err}")
}

pub fn run_project_script(script: &str) -> String {
    format!("Run generated project script: {script}")
}
