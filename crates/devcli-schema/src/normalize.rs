//! Relaxed-JSON normalization for `devcontainer.json`.
//!
//! The devcontainer dialect allows `//` and `/* */` comments, trailing commas and
//! `${...}` placeholders. [`normalize`] rewrites such text into strict JSON with a
//! fixed sequence of passes; later passes assume the output of earlier ones.
//!
//! Comment stripping is line-oriented, not a tokenizer: a `//` is removed only at
//! the start of a line (after optional indentation) or when preceded by spaces or
//! tabs. `"https://host"` survives, `"a //b"` inside a string does not.

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Root directory for project sources inside every container.
pub const CONTAINER_WORKSPACE_ROOT: &str = "/workspaces";

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[ \t]+)//.*").expect("valid regex"));
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("valid regex"));
static TRAILING_COMMA_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid regex"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid regex"));
static LOCAL_ENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{localEnv:(.+?)\}").expect("valid regex"));

const LOCAL_WORKSPACE_FOLDER: &str = "${localWorkspaceFolder}";
const LOCAL_WORKSPACE_FOLDER_BASENAME: &str = "${localWorkspaceFolderBasename}";
const CONTAINER_WORKSPACE_FOLDER: &str = "${containerWorkspaceFolder}";

/// Values substituted for the workspace placeholders of one resolution root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceVars {
    pub local_folder: String,
    pub basename: String,
    pub container_folder: String,
}

impl WorkspaceVars {
    pub fn for_root(root: &Path) -> Self {
        let basename = root_basename(root);
        Self {
            local_folder: root.to_string_lossy().into_owned(),
            container_folder: format!("{CONTAINER_WORKSPACE_ROOT}/{basename}"),
            basename,
        }
    }
}

/// Final path segment of a resolution root, or an empty string for `/`.
pub fn root_basename(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Normalize relaxed JSON against the process environment.
pub fn normalize(raw: &str, root: &Path) -> String {
    normalize_with_env(raw, root, |name| {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    })
}

/// Normalize relaxed JSON, resolving `${localEnv:NAME}` through `lookup`.
///
/// An unresolved variable is replaced by an empty string and reported with a
/// warning; it never fails the normalization. Whether the result is valid JSON
/// is decided by the caller's deserializer.
pub fn normalize_with_env<F>(raw: &str, root: &Path, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let text = strip_comments(raw);
    let text = strip_trailing_commas(&text);
    let text = substitute_local_env(&text, lookup);
    substitute_workspace(&text, &WorkspaceVars::for_root(root))
}

/// Remove line comments first, then block comments.
pub fn strip_comments(text: &str) -> String {
    let text = LINE_COMMENT.replace_all(text, "");
    BLOCK_COMMENT.replace_all(&text, "").into_owned()
}

pub fn strip_trailing_commas(text: &str) -> String {
    let text = TRAILING_COMMA_OBJECT.replace_all(text, "}");
    TRAILING_COMMA_ARRAY.replace_all(&text, "]").into_owned()
}

fn substitute_local_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    LOCAL_ENV
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            if let Some(value) = lookup(name) {
                debug!(env = name, value = %value, "set env variable");
                value
            } else {
                warn!(env = name, "environment variable is not set");
                String::new()
            }
        })
        .into_owned()
}

fn substitute_workspace(text: &str, vars: &WorkspaceVars) -> String {
    text.replace(LOCAL_WORKSPACE_FOLDER, &vars.local_folder)
        .replace(LOCAL_WORKSPACE_FOLDER_BASENAME, &vars.basename)
        .replace(CONTAINER_WORKSPACE_FOLDER, &vars.container_folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io;
    use std::sync::{Arc, Mutex};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|e| panic!("invalid JSON {text:?}: {e}"))
    }

    #[test]
    fn strips_line_and_block_comments() {
        let raw = "// comment\n{\"image\": \"x\"} /* block \n comment */";
        let out = normalize_with_env(raw, Path::new("/home/u/proj"), no_env);
        assert_eq!(parse(&out), json!({"image": "x"}));
    }

    #[test]
    fn keeps_double_slash_after_content() {
        let raw = r#"{"image": "https://registry.example.com/base"}"#;
        let out = normalize_with_env(raw, Path::new("/p"), no_env);
        assert_eq!(
            parse(&out),
            json!({"image": "https://registry.example.com/base"})
        );
    }

    #[test]
    fn strips_indented_and_inline_comments() {
        let raw = "{\n    // leading\n    \"name\": \"dev\", // trailing\n    \"image\": \"x\"\n}";
        let out = normalize_with_env(raw, Path::new("/p"), no_env);
        assert_eq!(parse(&out), json!({"name": "dev", "image": "x"}));
    }

    #[test]
    fn block_comment_is_non_greedy() {
        let raw = r#"{/* a */"name": "keep", /* b */ "image": "x"}"#;
        let out = normalize_with_env(raw, Path::new("/p"), no_env);
        assert_eq!(parse(&out), json!({"name": "keep", "image": "x"}));
    }

    #[test]
    fn tolerates_trailing_commas() {
        let out = normalize_with_env(r#"{"mounts": ["a",],}"#, Path::new("/p"), no_env);
        assert_eq!(parse(&out), json!({"mounts": ["a"]}));
    }

    #[test]
    fn trailing_commas_across_newlines() {
        let raw = "{\n  \"runArgs\": [\n    \"--init\",\n  ],\n}\n";
        let out = normalize_with_env(raw, Path::new("/p"), no_env);
        assert_eq!(parse(&out), json!({"runArgs": ["--init"]}));
    }

    #[test]
    fn resolves_local_env() {
        let lookup = |name: &str| (name == "USER_X").then(|| "alice".to_owned());
        let out = normalize_with_env(
            r#"{"name": "${localEnv:USER_X}-${localEnv:USER_X}"}"#,
            Path::new("/p"),
            lookup,
        );
        assert_eq!(parse(&out), json!({"name": "alice-alice"}));
    }

    #[test]
    fn missing_env_becomes_empty_string() {
        let out = normalize_with_env(
            r#"{"name": "${localEnv:NOPE_XYZ}"}"#,
            Path::new("/p"),
            no_env,
        );
        assert_eq!(parse(&out), json!({"name": ""}));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_env_logs_warning_with_name() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let out = tracing::subscriber::with_default(subscriber, || {
            normalize_with_env(
                r#"{"name": "${localEnv:DEVCLI_UNSET_FOR_WARNING}"}"#,
                Path::new("/p"),
                no_env,
            )
        });
        assert_eq!(parse(&out), json!({"name": ""}));

        let logged = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "log: {logged}");
        assert!(logged.contains("DEVCLI_UNSET_FOR_WARNING"), "log: {logged}");
        assert!(logged.contains("environment variable is not set"), "log: {logged}");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_env_value_is_substituted_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("DEVCLI_NON_UTF8_VALUE", OsStr::from_bytes(b"a\xffb"));
        let out = normalize(
            r#"{"name": "${localEnv:DEVCLI_NON_UTF8_VALUE}"}"#,
            Path::new("/p"),
        );
        std::env::remove_var("DEVCLI_NON_UTF8_VALUE");
        assert_eq!(parse(&out), json!({"name": "a\u{FFFD}b"}));
    }

    #[test]
    fn resolves_workspace_placeholders() {
        let raw = r#"{
            "mounts": ["source=${localWorkspaceFolder}/cache,target=${containerWorkspaceFolder}/cache,type=bind"],
            "name": "${localWorkspaceFolderBasename}"
        }"#;
        let out = normalize_with_env(raw, Path::new("/home/u/proj"), no_env);
        assert_eq!(
            parse(&out),
            json!({
                "mounts": ["source=/home/u/proj/cache,target=/workspaces/proj/cache,type=bind"],
                "name": "proj"
            })
        );
    }

    #[test]
    fn workspace_vars_for_root() {
        let vars = WorkspaceVars::for_root(Path::new("/home/u/proj"));
        assert_eq!(vars.local_folder, "/home/u/proj");
        assert_eq!(vars.basename, "proj");
        assert_eq!(vars.container_folder, "/workspaces/proj");
    }

    #[test]
    fn env_values_are_not_reinterpreted_as_comments() {
        let lookup = |_: &str| Some("a // b".to_owned());
        let out = normalize_with_env(r#"{"name": "${localEnv:X}"}"#, Path::new("/p"), lookup);
        assert_eq!(parse(&out), json!({"name": "a // b"}));
    }
}
