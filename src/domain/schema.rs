//! # Action Schemas
//!
//! Static registry of the action types the agent understands, their parameter
//! contracts and the historical function names LLMs use for them.

/// One parameter of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
    /// Allowed values; empty means free text.
    pub allowed: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ActionSchema {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }
}

/// A synonym for a canonical action, optionally implying parameter values
/// the synonym already expresses (`mkdir` means `command=create`).
#[derive(Debug, Clone, Copy)]
pub struct ActionAlias {
    pub name: &'static str,
    pub canonical: &'static str,
    pub implied: &'static [(&'static str, &'static str)],
}

pub const SHELL_COMMAND: &str = "shell_command";
pub const FILE_EDIT: &str = "file_edit";
pub const DIRECTORY: &str = "directory";

pub static ACTION_SCHEMAS: &[ActionSchema] = &[
    ActionSchema {
        name: SHELL_COMMAND,
        description: "Execute a shell command.",
        params: &[
            ParamSpec {
                name: "command",
                kind: "string",
                required: true,
                description: "Shell command to execute",
                allowed: &[],
            },
            ParamSpec {
                name: "cwd",
                kind: "string",
                required: false,
                description: "Working directory for the command (optional)",
                allowed: &[],
            },
        ],
    },
    ActionSchema {
        name: FILE_EDIT,
        description: "Edit file: create, update, replace, append, or delete.",
        params: &[
            ParamSpec {
                name: "command",
                kind: "string",
                required: true,
                description: "Operation type for file editing",
                allowed: &["create", "update", "str_replace", "append", "delete"],
            },
            ParamSpec {
                name: "path",
                kind: "string",
                required: true,
                description: "File path",
                allowed: &[],
            },
            ParamSpec {
                name: "file_text",
                kind: "string",
                required: false,
                description: "File content (for create and update)",
                allowed: &[],
            },
            ParamSpec {
                name: "old_str",
                kind: "string",
                required: false,
                description: "String to replace",
                allowed: &[],
            },
            ParamSpec {
                name: "new_str",
                kind: "string",
                required: false,
                description: "Replacement string",
                allowed: &[],
            },
            ParamSpec {
                name: "append_text",
                kind: "string",
                required: false,
                description: "Text to append",
                allowed: &[],
            },
        ],
    },
    ActionSchema {
        name: DIRECTORY,
        description: "Create or delete directory.",
        params: &[
            ParamSpec {
                name: "command",
                kind: "string",
                required: true,
                description: "Operation type for directory",
                allowed: &["create", "mkdir", "delete", "rmdir"],
            },
            ParamSpec {
                name: "path",
                kind: "string",
                required: true,
                description: "Directory path",
                allowed: &[],
            },
        ],
    },
];

pub static ACTION_ALIASES: &[ActionAlias] = &[
    ActionAlias { name: "run_command", canonical: SHELL_COMMAND, implied: &[] },
    ActionAlias { name: "execute_bash", canonical: SHELL_COMMAND, implied: &[] },
    ActionAlias { name: "npm_install", canonical: SHELL_COMMAND, implied: &[] },
    ActionAlias { name: "npm_init", canonical: SHELL_COMMAND, implied: &[] },
    ActionAlias { name: "create_directory", canonical: DIRECTORY, implied: &[("command", "create")] },
    ActionAlias { name: "mkdir", canonical: DIRECTORY, implied: &[("command", "create")] },
    ActionAlias { name: "delete_directory", canonical: DIRECTORY, implied: &[("command", "delete")] },
    ActionAlias { name: "write_file", canonical: FILE_EDIT, implied: &[("command", "update")] },
    ActionAlias { name: "edit_file", canonical: FILE_EDIT, implied: &[] },
    ActionAlias { name: "str_replace_editor", canonical: FILE_EDIT, implied: &[] },
    ActionAlias { name: "append_file", canonical: FILE_EDIT, implied: &[("command", "append")] },
    ActionAlias { name: "file", canonical: FILE_EDIT, implied: &[] },
];

/// Looks up an alias entry by the raw function name.
pub fn alias(name: &str) -> Option<&'static ActionAlias> {
    ACTION_ALIASES.iter().find(|a| a.name == name)
}

/// Maps a raw function name to its canonical action type. Unknown names map to themselves.
pub fn canonical_name(name: &str) -> &str {
    alias(name).map(|a| a.canonical).unwrap_or(name)
}

pub fn schema_for(canonical: &str) -> Option<&'static ActionSchema> {
    ACTION_SCHEMAS.iter().find(|s| s.name == canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_to_registered_schemas() {
        for alias in ACTION_ALIASES {
            assert!(
                schema_for(alias.canonical).is_some(),
                "alias {} points at unknown schema {}",
                alias.name,
                alias.canonical
            );
        }
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("execute_bash"), "shell_command");
        assert_eq!(canonical_name("str_replace_editor"), "file_edit");
        assert_eq!(canonical_name("mkdir"), "directory");
        assert_eq!(canonical_name("directory"), "directory");
        assert_eq!(canonical_name("launch_rockets"), "launch_rockets");
    }

    #[test]
    fn test_required_params() {
        let file = schema_for(FILE_EDIT).unwrap();
        let required: Vec<_> = file.required().map(|p| p.name).collect();
        assert_eq!(required, vec!["command", "path"]);
        assert!(file.param("old_str").is_some_and(|p| !p.required));
    }
}
