//! # Parsing Utils
//!
//! Extracts `<function=NAME>...</function>` call blocks from LLM output, canonicalizes
//! historical function names, validates them against the action schemas and builds
//! typed `Action` records in order of appearance.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::errors::ParseError;
use crate::domain::schema::{self, ActionSchema};
use crate::domain::types::{Action, ActionKind, DirAction, DirOp, FileAction, FileOp, ShellAction};

/// Longest entity name (between `&` and `;`) considered for unescaping.
const MAX_ENTITY_LEN: usize = 32;

fn function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<function=([^>]+)>(.*?)</function>").expect("valid regex"))
}

fn parameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<parameter=([^>]+)>(.*?)</parameter>").expect("valid regex")
    })
}

/// True when the text carries at least one function-call block.
pub fn contains_function_calls(text: &str) -> bool {
    function_regex().is_match(text)
}

pub fn parse_actions(text: &str) -> Result<Vec<Action>, ParseError> {
    let mut actions = Vec::new();

    for caps in function_regex().captures_iter(text) {
        let raw_name = caps[1].trim();
        let body = &caps[2];
        actions.push(parse_block(raw_name, body)?);
    }

    let opened = text.matches("<function=").count();
    if opened > actions.len() {
        tracing::warn!(
            "{} function block(s) left unterminated in LLM output",
            opened - actions.len()
        );
    }

    Ok(actions)
}

fn parse_block(raw_name: &str, body: &str) -> Result<Action, ParseError> {
    let canonical = schema::canonical_name(raw_name);
    let schema = schema::schema_for(canonical).ok_or_else(|| ParseError::UnknownAction {
        name: raw_name.to_string(),
        canonical: canonical.to_string(),
    })?;

    let mut parameters: Vec<(String, String)> = Vec::new();
    for p in parameter_regex().captures_iter(body) {
        let key = p[1].trim().to_string();
        let value = unescape_entities(p[2].trim());
        match parameters.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => parameters.push((key, value)),
        }
    }

    if let Some(alias) = schema::alias(raw_name) {
        for (key, value) in alias.implied {
            if !parameters.iter().any(|(k, _)| k == key) {
                parameters.push((key.to_string(), value.to_string()));
            }
        }
    }

    let missing: Vec<String> = schema
        .required()
        .filter(|spec| !parameters.iter().any(|(k, _)| k == spec.name))
        .map(|spec| spec.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingParameters {
            action: schema.name.to_string(),
            missing,
        });
    }

    validate_allowed_values(schema, &parameters)?;

    let kind = build_kind(schema, &parameters)?;
    let description = describe(schema.name, &parameters);
    Ok(Action {
        kind,
        parameters,
        description,
    })
}

fn validate_allowed_values(
    schema: &ActionSchema,
    parameters: &[(String, String)],
) -> Result<(), ParseError> {
    for (key, value) in parameters {
        if let Some(spec) = schema.param(key)
            && !spec.allowed.is_empty()
            && !spec.allowed.contains(&value.as_str())
        {
            return Err(ParseError::InvalidValue {
                action: schema.name.to_string(),
                parameter: key.clone(),
                value: value.clone(),
                allowed: spec.allowed.iter().map(|v| v.to_string()).collect(),
            });
        }
    }
    Ok(())
}

fn build_kind(schema: &ActionSchema, parameters: &[(String, String)]) -> Result<ActionKind, ParseError> {
    let get = |name: &str| {
        parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    // Required parameters were checked by the caller.
    let required = |name: &str| get(name).unwrap_or_default();

    let kind = match schema.name {
        schema::SHELL_COMMAND => ActionKind::Shell(ShellAction {
            command: required("command"),
            cwd: get("cwd").filter(|c| !c.is_empty()),
        }),
        schema::FILE_EDIT => {
            let op = match required("command").as_str() {
                "create" => FileOp::Create {
                    file_text: get("file_text").unwrap_or_default(),
                },
                "update" => FileOp::Update {
                    file_text: get("file_text").unwrap_or_default(),
                },
                "str_replace" => {
                    // An empty needle would match between every character.
                    let old_str = get("old_str").filter(|s| !s.is_empty()).ok_or_else(|| {
                        ParseError::MissingParameters {
                            action: schema.name.to_string(),
                            missing: vec!["old_str".to_string()],
                        }
                    })?;
                    FileOp::StrReplace {
                        old_str,
                        new_str: get("new_str").unwrap_or_default(),
                    }
                }
                "append" => FileOp::Append {
                    append_text: get("append_text").unwrap_or_default(),
                },
                _ => FileOp::Delete,
            };
            ActionKind::File(FileAction {
                path: required("path"),
                op,
            })
        }
        _ => {
            let op = match required("command").as_str() {
                "delete" | "rmdir" => DirOp::Delete,
                _ => DirOp::Create,
            };
            ActionKind::Directory(DirAction {
                path: required("path"),
                op,
            })
        }
    };
    Ok(kind)
}

/// `canonical(k='v', ...)` in parameter order.
fn describe(canonical: &str, parameters: &[(String, String)]) -> String {
    let args: Vec<String> = parameters
        .iter()
        .map(|(k, v)| format!("{}='{}'", k, v))
        .collect();
    format!("{}({})", canonical, args.join(", "))
}

/// Unescapes HTML/XML character references (`&lt;`, `&amp;`, `&#60;`, `&nbsp;` ...).
/// Anything that is not a well-formed reference (`&&` in shell commands) is kept verbatim.
pub fn unescape_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let end = tail[1..].find(';').filter(|&end| end > 0 && end <= MAX_ENTITY_LEN);
        let resolved = end.and_then(|end| {
            let candidate = &tail[..end + 2];
            quick_xml::escape::unescape_with(candidate, quick_xml::escape::resolve_html5_entity)
                .ok()
                .map(|text| (text.into_owned(), end + 2))
        });
        match resolved {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_alias() {
        let text = "<function=execute_bash>\n<parameter=command>pwd && ls</parameter>\n</function>";
        let actions = parse_actions(text).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type(), "shell_command");
        assert_eq!(
            actions[0].kind,
            ActionKind::Shell(ShellAction {
                command: "pwd && ls".to_string(),
                cwd: None
            })
        );
        assert_eq!(actions[0].description, "shell_command(command='pwd && ls')");
    }

    #[test]
    fn test_order_is_preserved() {
        let text = r#"
Some chatter first.
<function=mkdir><parameter=path>app</parameter></function>
<function=write_file>
<parameter=path>app/main.py</parameter>
<parameter=file_text>
print("hi")
</parameter>
</function>
<function=run_command><parameter=command>python app/main.py</parameter></function>
"#;
        let actions = parse_actions(text).unwrap();
        let types: Vec<_> = actions.iter().map(|a| a.action_type()).collect();
        assert_eq!(types, vec!["directory", "file_edit", "shell_command"]);
        assert_eq!(
            actions[0].kind,
            ActionKind::Directory(DirAction {
                path: "app".into(),
                op: DirOp::Create
            })
        );
        assert_eq!(
            actions[1].kind,
            ActionKind::File(FileAction {
                path: "app/main.py".into(),
                op: FileOp::Update {
                    file_text: "print(\"hi\")".into()
                }
            })
        );
    }

    #[test]
    fn test_multiline_value_keeps_inner_structure() {
        let text = "<function=file_edit><parameter=command>create</parameter><parameter=path>a.py</parameter><parameter=file_text>\n\ndef f():\n    return 1\n\n</parameter></function>";
        let actions = parse_actions(text).unwrap();
        assert_eq!(actions[0].param("file_text"), Some("def f():\n    return 1"));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let text = "<function=str_replace_editor>\n<parameter=command>str_replace</parameter>\n<parameter=path>/app.py</parameter>\n<parameter=old_str>return x</parameter>\n<parameter=new_str>return '&lt;b&gt;' + x + '&lt;/b&gt;'</parameter>\n</function>";
        let actions = parse_actions(text).unwrap();
        match &actions[0].kind {
            ActionKind::File(FileAction {
                op: FileOp::StrReplace { new_str, .. },
                ..
            }) => assert_eq!(new_str, "return '<b>' + x + '</b>'"),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = parse_actions("<function=launch_rockets><parameter=x>1</parameter></function>")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownAction {
                name: "launch_rockets".into(),
                canonical: "launch_rockets".into()
            }
        );
    }

    #[test]
    fn test_missing_parameters_lists_all() {
        let err = parse_actions("<function=file_edit></function>").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingParameters {
                action: "file_edit".into(),
                missing: vec!["command".into(), "path".into()]
            }
        );
    }

    #[test]
    fn test_str_replace_requires_old_str() {
        let text = "<function=file_edit><parameter=command>str_replace</parameter><parameter=path>a</parameter></function>";
        assert!(matches!(
            parse_actions(text),
            Err(ParseError::MissingParameters { .. })
        ));
    }

    #[test]
    fn test_invalid_enum_value() {
        let text = "<function=directory><parameter=command>chmod</parameter><parameter=path>a</parameter></function>";
        assert!(matches!(
            parse_actions(text),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_no_blocks_yields_empty() {
        assert!(parse_actions("just prose, no calls").unwrap().is_empty());
        assert!(!contains_function_calls("just prose"));
    }

    #[test]
    fn test_reparse_of_markup_is_identical() {
        let text = r#"
<function=execute_bash><parameter=command>echo "a < b" && ls</parameter></function>
<function=file_edit>
<parameter=command>str_replace</parameter>
<parameter=path>src/lib.rs</parameter>
<parameter=old_str>fn a() {}</parameter>
<parameter=new_str>fn a() -> Vec<u8> { vec![] }</parameter>
</function>
<function=directory><parameter=command>rmdir</parameter><parameter=path>tmp</parameter></function>
"#;
        let first = parse_actions(text).unwrap();
        let markup: Vec<String> = first.iter().map(|a| a.to_markup()).collect();
        let second = parse_actions(&markup.join("\n")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_entities("a &amp;&amp; b"), "a && b");
        assert_eq!(unescape_entities("cd x && make; echo ok"), "cd x && make; echo ok");
        assert_eq!(unescape_entities("&#60;div&#62;"), "<div>");
        assert_eq!(unescape_entities("AT&T; &quot;q&quot;"), "AT&T; \"q\"");
        assert_eq!(unescape_entities("tail &"), "tail &");
    }
}
