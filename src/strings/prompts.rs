//! # Prompts
//!
//! Prompt templates sent to the completion endpoint and the builder that fills them.

use crate::domain::schema::ACTION_SCHEMAS;

/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        // Flag any {{VAR}} left behind; user text can legitimately contain braces, so only log.
        if let Some(start) = result.find("{{")
            && let Some(end) = result[start..].find("}}")
        {
            let placeholder = &result[start..start + end + 2];
            tracing::warn!("Unreplaced placeholder in rendered prompt: {}", placeholder);
        }

        result
    }
}

pub const ACTION_PARSER_TEMPLATE: &str = include_str!("../../prompts/action_parser.md");
pub const CONTINUATION_TEMPLATE: &str = include_str!("../../prompts/continuation.md");
pub const PROJECT_SCRIPT_TEMPLATE: &str = include_str!("../../prompts/project_script.md");

/// Renders the function catalogue from the action schemas.
pub fn build_functions_description() -> String {
    let mut desc = String::new();
    for (idx, schema) in ACTION_SCHEMAS.iter().enumerate() {
        let idx = idx + 1;
        desc.push_str(&format!("---- BEGIN FUNCTION #{}: {} ----\n", idx, schema.name));
        desc.push_str(&format!("Description: {}\n", schema.description));
        desc.push_str("Parameters:\n");
        for (j, param) in schema.params.iter().enumerate() {
            let req = if param.required { "required" } else { "optional" };
            let options = if param.allowed.is_empty() {
                String::new()
            } else {
                let values: Vec<String> =
                    param.allowed.iter().map(|v| format!("\"{}\"", v)).collect();
                format!(" options: [{}]", values.join(", "))
            };
            desc.push_str(&format!(
                "  ({}) {} ({}, {}): {}{}\n",
                j + 1,
                param.name,
                param.kind,
                req,
                param.description,
                options
            ));
        }
        desc.push_str(&format!("---- END FUNCTION #{} ----\n", idx));
    }
    desc
}

/// Prompt turning a natural-language step into function-call blocks.
pub fn action_parser_prompt(task: &str, working_dir: &str) -> String {
    PromptRenderer::new(ACTION_PARSER_TEMPLATE)
        .set("{{FUNCTIONS}}", build_functions_description())
        .set("{{WORKING_DIR}}", working_dir)
        .set("{{TASK}}", task)
        .render()
}

/// Prompt for part `current` of a multi-part plan. The first part is the bare requirement.
pub fn continuation_prompt(requirement: &str, history: &str, current: usize, total: usize) -> String {
    if current <= 1 {
        return requirement.to_string();
    }
    PromptRenderer::new(CONTINUATION_TEMPLATE)
        .set("{{DELIVERED}}", (current - 1).to_string())
        .set("{{CURRENT}}", current.to_string())
        .set("{{TOTAL}}", total.to_string())
        .set("{{HISTORY}}", history)
        .set("{{REQUIREMENT}}", requirement)
        .render()
}

/// Prompt asking for a bash script that performs the given project steps.
pub fn project_script_prompt(steps: &str) -> String {
    PromptRenderer::new(PROJECT_SCRIPT_TEMPLATE)
        .set("{{STEPS}}", steps)
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functions_description_lists_every_schema() {
        let desc = build_functions_description();
        assert!(desc.starts_with("---- BEGIN FUNCTION #1: shell_command ----\n"));
        assert!(desc.contains("---- BEGIN FUNCTION #2: file_edit ----"));
        assert!(desc.contains("---- END FUNCTION #3 ----"));
        assert!(desc.contains("  (1) command (string, required): Shell command to execute\n"));
        assert!(desc.contains(
            "options: [\"create\", \"update\", \"str_replace\", \"append\", \"delete\"]"
        ));
    }

    #[test]
    fn test_action_parser_prompt() {
        let prompt = action_parser_prompt("Create a flask app", "/srv/ws/demo");
        assert!(prompt.contains("The workdir is always at /srv/ws/demo."));
        assert!(prompt.contains("Create a flask app"));
        assert!(prompt.contains("---- BEGIN FUNCTION #1: shell_command ----"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_task_text_is_not_rendered_as_template() {
        let prompt = action_parser_prompt("echo {{WORKING_DIR}}", "/w");
        assert!(prompt.contains("echo {{WORKING_DIR}}"));
    }

    #[test]
    fn test_continuation_prompt() {
        assert_eq!(continuation_prompt("req", "", 1, 3), "req");
        let prompt = continuation_prompt("req", "foo\n\nbar\n\n", 3, 3);
        assert!(prompt.starts_with("req\n"));
        assert!(prompt.contains("Parts already delivered: 2"));
        assert!(prompt.contains("foo\n\nbar"));
        assert!(prompt.contains("part 3/3"));
    }
}
