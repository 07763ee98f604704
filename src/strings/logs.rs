//! # Log Strings
//!
//! Templates for recurring log lines.

pub fn call_started(rpc: &str, project_id: &str, size: usize) -> String {
    format!("{rpc}: project '{project_id}', {size} bytes of input")
}

pub fn call_finished(rpc: &str, project_id: &str) -> String {
    format!("{rpc}: project '{project_id}' finished")
}

pub fn caller_gone(rpc: &str, project_id: &str) -> String {
    format!("{rpc}: caller for project '{project_id}' disconnected, aborting")
}

pub fn executing_action(step: u32, index: usize, action_type: &str, description: &str) -> String {
    format!("Step {step} action #{index} [{action_type}]: {description}")
}

pub fn requesting_part(current: usize, total: usize) -> String {
    format!("Requesting plan part {current}/{total}")
}

pub const SERVER_STARTING: &str = "Starting project helper gRPC server";
pub const SHUTDOWN: &str = "Shutting down...";
