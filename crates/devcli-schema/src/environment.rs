use crate::identity::{compute_identity, EnvIdentity};
use crate::manifest::{config_dir, load_config, ConfigError};
use crate::merge::EffectiveConfig;
use crate::normalize::{root_basename, CONTAINER_WORKSPACE_ROOT};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of every image and container name owned by devcli.
pub const NAME_PREFIX: &str = "devcli";

/// A resolved development environment: where it lives, what it is, and its identity.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Devcontainer {
    pub root: PathBuf,
    pub config: EffectiveConfig,
    pub identity: EnvIdentity,
}

/// Resolve the environment for `root`.
///
/// The global scope at `global_root` is merged first when present; a missing
/// global file is skipped. The project scope must exist.
pub fn resolve_devcontainer(
    root: &Path,
    global_root: Option<&Path>,
) -> Result<Devcontainer, ConfigError> {
    let mut sources = Vec::with_capacity(2);
    if let Some(global_root) = global_root {
        match load_config(global_root) {
            Ok(record) => sources.push(record),
            Err(e) if e.is_not_found() => {
                debug!("no global devcontainer config at {}", global_root.display());
            }
            Err(e) => return Err(e),
        }
    }
    sources.push(load_config(root)?);

    let config = EffectiveConfig::from_sources(sources);
    Devcontainer::new(root, config)
}

impl Devcontainer {
    pub fn new(root: impl Into<PathBuf>, config: EffectiveConfig) -> Result<Self, ConfigError> {
        let root = root.into();
        let identity = compute_identity(&config, &root).map_err(ConfigError::Serialization)?;
        debug!(env_id = %identity.env_id, "calculated devcontainer identity");
        Ok(Self {
            root,
            config,
            identity,
        })
    }

    /// `devcli_<basename>_`, shared by every identity version of this root.
    pub fn name_prefix(&self) -> String {
        format!("{NAME_PREFIX}_{}_", sanitize_name(&root_basename(&self.root)))
    }

    pub fn container_name(&self) -> String {
        format!("{}{}", self.name_prefix(), self.identity.short_id)
    }

    /// The configured image, else the derived build tag, else `None`.
    pub fn image_name(&self) -> Option<String> {
        if !self.config.image.is_empty() {
            Some(self.config.image.clone())
        } else if self.config.has_build_file() {
            Some(self.container_name())
        } else {
            None
        }
    }

    /// `/workspaces/<basename>`
    pub fn container_workspace(&self) -> String {
        format!("{CONTAINER_WORKSPACE_ROOT}/{}", root_basename(&self.root))
    }

    /// Directory passed as build context: `.devcontainer/<context>`.
    pub fn build_context_dir(&self) -> PathBuf {
        let dir = config_dir(&self.root);
        if self.config.build_context.is_empty() {
            dir
        } else {
            dir.join(&self.config.build_context)
        }
    }
}

/// Basename used when sanitizing leaves nothing, e.g. for `/`.
const FALLBACK_BASENAME: &str = "workspace";

/// Make a root basename usable inside both container names and image tags.
///
/// Lowercases, maps everything outside `[a-z0-9_.-]` to `-`, drops leading and
/// trailing separators, and turns runs of separators into a single `-`.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending: Option<char> = None;
    let mut run = 0;
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        let c = if c.is_ascii_alphanumeric() || is_separator(c) {
            c
        } else {
            '-'
        };
        if is_separator(c) {
            pending.get_or_insert(c);
            run += 1;
            continue;
        }
        if let Some(sep) = pending.take() {
            if !out.is_empty() {
                out.push(if run == 1 { sep } else { '-' });
            }
        }
        run = 0;
        out.push(c);
    }
    if out.is_empty() {
        FALLBACK_BASENAME.to_owned()
    } else {
        out
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '.' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EnvIdentity;
    use crate::types::{EnvId, ShortId};
    use std::fs;

    fn with_identity(root: &str, config: EffectiveConfig, hex: &str) -> Devcontainer {
        Devcontainer {
            root: PathBuf::from(root),
            config,
            identity: EnvIdentity {
                env_id: EnvId::new(hex),
                short_id: ShortId::new(&hex[..7]),
            },
        }
    }

    fn write(root: &Path, json: &str) {
        fs::create_dir_all(config_dir(root)).unwrap();
        fs::write(config_dir(root).join("devcontainer.json"), json).unwrap();
    }

    #[test]
    fn derived_names_from_build_file() {
        let config = EffectiveConfig {
            build_file_content: "FROM alpine\n".to_owned(),
            ..EffectiveConfig::default()
        };
        let devc = with_identity("/home/u/myproj", config, "abcdef1234567890");
        assert_eq!(devc.image_name().as_deref(), Some("devcli_myproj_abcdef1"));
        assert_eq!(devc.container_name(), "devcli_myproj_abcdef1");
    }

    #[test]
    fn configured_image_is_used_verbatim() {
        let config = EffectiveConfig {
            image: "mcr.microsoft.com/devcontainers/rust:1".to_owned(),
            ..EffectiveConfig::default()
        };
        let devc = with_identity("/home/u/myproj", config, "abcdef1234567890");
        assert_eq!(
            devc.image_name().as_deref(),
            Some("mcr.microsoft.com/devcontainers/rust:1")
        );
        assert_eq!(devc.container_name(), "devcli_myproj_abcdef1");
    }

    #[test]
    fn no_image_without_build_file() {
        let devc = with_identity("/p/x", EffectiveConfig::default(), "0123456789");
        assert_eq!(devc.image_name(), None);
        assert_eq!(devc.container_name(), "devcli_x_0123456");
    }

    #[test]
    fn sanitizes_root_basename() {
        assert_eq!(sanitize_name("My Project"), "my-project");
        assert_eq!(sanitize_name("api_v2.1"), "api_v2.1");
        let devc = with_identity("/src/MyRepo", EffectiveConfig::default(), "fedcba9876");
        assert_eq!(devc.name_prefix(), "devcli_myrepo_");
    }

    #[test]
    fn sanitized_names_are_valid_image_tags() {
        assert_eq!(sanitize_name("-foo"), "foo");
        assert_eq!(sanitize_name("..hidden"), "hidden");
        assert_eq!(sanitize_name("a..b"), "a-b");
        assert_eq!(sanitize_name("a_-b"), "a-b");
        assert_eq!(sanitize_name("trailing-"), "trailing");
        assert_eq!(sanitize_name("My  Project"), "my-project");
        assert_eq!(sanitize_name("..."), "workspace");
        assert_eq!(sanitize_name(""), "workspace");

        let config = EffectiveConfig {
            build_file_content: "FROM alpine\n".to_owned(),
            ..EffectiveConfig::default()
        };
        let devc = with_identity("/src/-foo", config, "abcdef1234567890");
        assert_eq!(devc.image_name().as_deref(), Some("devcli_foo_abcdef1"));
        let root = with_identity("/", EffectiveConfig::default(), "abcdef1234567890");
        assert_eq!(root.container_name(), "devcli_workspace_abcdef1");
    }

    #[test]
    fn build_context_dir_is_relative_to_config_dir() {
        let mut devc = with_identity("/src/app", EffectiveConfig::default(), "fedcba9876");
        assert_eq!(devc.build_context_dir(), PathBuf::from("/src/app/.devcontainer"));
        devc.config.build_context = "..".to_owned();
        assert_eq!(
            devc.build_context_dir(),
            PathBuf::from("/src/app/.devcontainer/..")
        );
        assert_eq!(devc.container_workspace(), "/workspaces/app");
    }

    #[test]
    fn resolves_global_then_project() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(global.path(), r#"{"name": "g", "mounts": ["a"], "image": "g:1"}"#);
        write(project.path(), r#"{"name": "p", "mounts": ["b"], "image": "p:1"}"#);

        let devc = resolve_devcontainer(project.path(), Some(global.path())).unwrap();
        assert_eq!(devc.config.name, "p");
        assert_eq!(devc.config.mounts, vec!["a", "b"]);
        assert_eq!(devc.image_name().as_deref(), Some("p:1"));
    }

    #[test]
    fn missing_global_is_skipped() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(project.path(), r#"{"name": "p", "mounts": ["b"]}"#);

        let with_missing = resolve_devcontainer(project.path(), Some(global.path())).unwrap();
        let without = resolve_devcontainer(project.path(), None).unwrap();
        assert_eq!(with_missing, without);
    }

    #[test]
    fn missing_project_is_not_found() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(global.path(), r#"{"image": "g:1"}"#);

        let err = resolve_devcontainer(project.path(), Some(global.path())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn global_build_file_is_read_from_global_dir() {
        let global = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        write(global.path(), r#"{"dockerFile": "Dockerfile"}"#);
        fs::write(config_dir(global.path()).join("Dockerfile"), "FROM busybox\n").unwrap();
        write(project.path(), r#"{"postStartCommand": "true"}"#);

        // last writer wins: the project leaves the build file unset
        let devc = resolve_devcontainer(project.path(), Some(global.path())).unwrap();
        assert!(devc.config.build_file_content.is_empty());
    }

    #[test]
    fn identity_is_deterministic_across_resolutions() {
        let project = tempfile::tempdir().unwrap();
        write(
            project.path(),
            r#"{"build": {"dockerfile": "Dockerfile"}, "runArgs": ["--init"]}"#,
        );
        fs::write(config_dir(project.path()).join("Dockerfile"), "FROM alpine\n").unwrap();

        let a = resolve_devcontainer(project.path(), None).unwrap();
        let b = resolve_devcontainer(project.path(), None).unwrap();
        assert_eq!(a.identity, b.identity);

        fs::write(config_dir(project.path()).join("Dockerfile"), "FROM debian\n").unwrap();
        let c = resolve_devcontainer(project.path(), None).unwrap();
        assert_ne!(a.identity, c.identity);
    }
}
