//! # Path Sandbox
//!
//! Confines every path an action touches to the project's working directory.
//! Absolute paths are treated as rooted at the working directory ("/" is the
//! project root); the check runs after `..`/`.` resolution.
//!
//! Resolution is lexical. Symlinks inside the working directory are not
//! followed, so a link pointing outside the project is a known gap.

use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use crate::domain::errors::SandboxError;

/// Device paths shell commands may keep referencing verbatim.
const PASSTHROUGH_PATHS: &[&str] = &["/dev/null", "/dev/stdout", "/dev/stderr"];

/// Resolves `requested` against `working_dir`.
/// Returns the working directory itself or a descendant of it, never anything else.
pub fn resolve(requested: &str, working_dir: &Path) -> Result<PathBuf, SandboxError> {
    let root = normalize(&absolute(working_dir));
    let relative = requested.trim().trim_start_matches('/');
    let resolved = normalize(&root.join(relative));

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(SandboxError::PathEscape {
            requested: requested.to_string(),
            working_dir: root,
        })
    }
}

/// Strips a leading copy of the working directory from a caller-supplied path.
/// LLMs are told where the project lives and often echo the absolute location back.
pub fn strip_working_dir(path: &str, working_dir: &Path) -> String {
    let root = normalize(&absolute(working_dir));
    let trimmed = path.trim();
    let candidate = Path::new(trimmed);
    if candidate.is_absolute()
        && let Ok(rest) = normalize(candidate).strip_prefix(&root)
    {
        let rest = rest.to_string_lossy();
        return if rest.is_empty() {
            ".".to_string()
        } else {
            rest.into_owned()
        };
    }
    trimmed.to_string()
}

/// Rewrites every `/`-rooted token of a shell command so it points inside the working directory.
/// Fails if any token still escapes after resolution (e.g. `/../../etc`).
pub fn remap_command_paths(command: &str, working_dir: &Path) -> Result<String, SandboxError> {
    let mut escape = None;
    let rewritten = path_token_regex().replace_all(command, |caps: &Captures| {
        let prefix = &caps[1];
        let token = &caps[2];
        if PASSTHROUGH_PATHS.contains(&token) {
            return format!("{}{}", prefix, token);
        }
        let relative = strip_working_dir(token, working_dir);
        match resolve(&relative, working_dir) {
            Ok(path) => format!("{}{}", prefix, path.display()),
            Err(e) => {
                escape.get_or_insert(e);
                format!("{}{}", prefix, token)
            }
        }
    });

    match escape {
        Some(e) => Err(e),
        None => Ok(rewritten.into_owned()),
    }
}

/// A `/` that starts a token: at the beginning, or after whitespace, a quote, `=` or `(`.
fn path_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(^|[\s'"=(])(/[A-Za-z0-9_\-./~+@%]*)"#).expect("valid path token regex")
    })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Lexical normalization: drops `.`, applies `..` (never above the filesystem root).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wd() -> PathBuf {
        PathBuf::from("/srv/ws/demo")
    }

    #[test]
    fn test_relative_path_joins() {
        assert_eq!(
            resolve("src/main.rs", &wd()).unwrap(),
            PathBuf::from("/srv/ws/demo/src/main.rs")
        );
    }

    #[test]
    fn test_absolute_path_is_rerooted() {
        assert_eq!(
            resolve("/etc/passwd", &wd()).unwrap(),
            PathBuf::from("/srv/ws/demo/etc/passwd")
        );
        assert_eq!(resolve("/", &wd()).unwrap(), wd());
    }

    #[test]
    fn test_traversal_is_rejected() {
        for p in ["../../etc/passwd", "/../x", "a/../../b", "./../demo2", ".."] {
            let err = resolve(p, &wd()).unwrap_err();
            assert!(matches!(err, SandboxError::PathEscape { .. }), "{p}");
        }
    }

    #[test]
    fn test_traversal_that_stays_inside_is_allowed() {
        assert_eq!(
            resolve("a/b/../c", &wd()).unwrap(),
            PathBuf::from("/srv/ws/demo/a/c")
        );
        assert_eq!(
            resolve("../demo/x", &wd()).unwrap(),
            PathBuf::from("/srv/ws/demo/x")
        );
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_outside() {
        // "/srv/ws/demo2" shares a string prefix with the root but is not inside it.
        assert!(resolve("../demo2/file", &wd()).is_err());
    }

    #[test]
    fn test_never_returns_outside_root() {
        let inputs = [
            "",
            ".",
            "demo",
            "demo/demo/demo",
            "/srv/ws/demo/app.py",
            "//double//slash",
            "../../../../../../",
            "a/./b/./../../..",
            "/demo/../../..",
            "~/.ssh/id_rsa",
            "x/../../demo/y",
        ];
        for p in inputs {
            if let Ok(path) = resolve(p, &wd()) {
                assert!(path.starts_with(wd()), "{p} resolved to {}", path.display());
            }
        }
    }

    #[test]
    fn test_strip_working_dir() {
        assert_eq!(strip_working_dir("/srv/ws/demo/app.py", &wd()), "app.py");
        assert_eq!(strip_working_dir("/srv/ws/demo", &wd()), ".");
        assert_eq!(strip_working_dir("/srv/ws/demo2/app.py", &wd()), "/srv/ws/demo2/app.py");
        assert_eq!(strip_working_dir("app.py", &wd()), "app.py");
    }

    #[test]
    fn test_remap_command_paths() {
        let cmd = remap_command_paths("ls /src && cat /etc/hosts > /dev/null", &wd()).unwrap();
        assert_eq!(
            cmd,
            "ls /srv/ws/demo/src && cat /srv/ws/demo/etc/hosts > /dev/null"
        );
    }

    #[test]
    fn test_remap_leaves_relative_paths_and_urls() {
        let cmd = "cat src/main.rs && curl https://example.com/api";
        assert_eq!(remap_command_paths(cmd, &wd()).unwrap(), cmd);
    }

    #[test]
    fn test_remap_keeps_working_dir_references() {
        let cmd = remap_command_paths("cd /srv/ws/demo/app && npm i", &wd()).unwrap();
        assert_eq!(cmd, "cd /srv/ws/demo/app && npm i");
    }

    #[test]
    fn test_remap_quoted_and_assigned_tokens() {
        let cmd = remap_command_paths("cp a '/b' --prefix=/usr", &wd()).unwrap();
        assert_eq!(cmd, "cp a '/srv/ws/demo/b' --prefix=/srv/ws/demo/usr");
    }

    #[test]
    fn test_remap_rejects_escaping_tokens() {
        assert!(remap_command_paths("cat /../../etc/shadow", &wd()).is_err());
    }
}
