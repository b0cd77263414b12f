use crate::normalize::normalize;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory holding `devcontainer.json` and its build files, relative to a root.
pub const CONFIG_DIR: &str = ".devcontainer";
pub const CONFIG_FILE: &str = "devcontainer.json";
/// Subdirectory of the per-user config dir that acts as the global-scope root.
pub const GLOBAL_CONFIG_SUBDIR: &str = "devcli";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("devcontainer config not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read devcontainer config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read build file {}: {source}", path.display())]
    BuildFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse devcontainer config {}: {source}\n{text}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
        text: String,
    },
    #[error("failed to serialize effective config: {0}")]
    Serialization(serde_json::Error),
    #[error("cannot determine the user config directory (HOME is not set)")]
    NoConfigDir,
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A registry rewrite rule: every occurrence of `original` becomes `alias`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryAlias {
    pub original: String,
    pub alias: String,
}

impl RegistryAlias {
    pub fn new(original: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            alias: alias.into(),
        }
    }
}

/// Wire shape of `devcontainer.json`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevcontainerJson {
    pub name: Option<String>,
    /// Legacy top-level form of `build.dockerfile`.
    pub docker_file: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub build: BuildSection,
    pub image: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub mounts: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub run_args: Vec<String>,
    pub post_create_command: Option<String>,
    pub post_start_command: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub customizations: Customizations,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildSection {
    pub dockerfile: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Customizations {
    #[serde(deserialize_with = "null_as_default")]
    pub devcli: DevcliCustomizations,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevcliCustomizations {
    #[serde(deserialize_with = "null_as_default")]
    pub registry_aliases: Vec<RegistryAlias>,
}

/// An explicit `null` reads the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl DevcontainerJson {
    /// The build file reference, `build.dockerfile` winning over `dockerFile`.
    pub fn dockerfile(&self) -> Option<&str> {
        self.build
            .dockerfile
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.docker_file.as_deref().filter(|s| !s.is_empty()))
    }
}

/// One loaded configuration source, with the build file already read.
///
/// Only the build file's content is kept, never its path, so two scopes
/// referencing identical Dockerfiles at different locations are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRecord {
    pub name: String,
    pub image: String,
    pub build_file_content: String,
    pub build_context: String,
    pub mounts: Vec<String>,
    pub run_args: Vec<String>,
    pub post_create_command: String,
    pub post_start_command: String,
    pub registry_aliases: Vec<RegistryAlias>,
}

/// `<root>/.devcontainer`
pub fn config_dir(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR)
}

/// `<root>/.devcontainer/devcontainer.json`
pub fn config_path(root: &Path) -> PathBuf {
    config_dir(root).join(CONFIG_FILE)
}

/// Global-scope root: `<user config dir>/devcli`.
pub fn global_config_root() -> Result<PathBuf, ConfigError> {
    Ok(user_config_dir()?.join(GLOBAL_CONFIG_SUBDIR))
}

#[cfg(target_os = "macos")]
fn user_config_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::NoConfigDir)?;
    Ok(PathBuf::from(home).join("Library/Application Support"))
}

#[cfg(not(target_os = "macos"))]
fn user_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        let xdg = PathBuf::from(xdg);
        if xdg.is_absolute() {
            return Ok(xdg);
        }
    }
    let home = std::env::var_os("HOME").ok_or(ConfigError::NoConfigDir)?;
    Ok(PathBuf::from(home).join(".config"))
}

/// Parse already-read config text for `root`, without touching build files.
pub fn parse_config_str(raw: &str, root: &Path) -> Result<DevcontainerJson, ConfigError> {
    let text = normalize(raw, root);
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: config_path(root),
        source,
        text,
    })
}

/// Load the configuration of `root` into a [`ConfigRecord`].
///
/// A missing file yields [`ConfigError::NotFound`]; the caller decides whether
/// that is fatal. A referenced build file is read relative to the config dir.
pub fn load_config(root: &Path) -> Result<ConfigRecord, ConfigError> {
    let path = config_path(root);
    debug!("parsing devcontainer json from {}", path.display());
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound { path });
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let parsed = parse_config_str(&raw, root)?;
    let record = into_record(parsed, &config_dir(root))?;
    debug!(?record, "parsed devcontainer config");
    Ok(record)
}

fn into_record(json: DevcontainerJson, dir: &Path) -> Result<ConfigRecord, ConfigError> {
    let build_file_content = match json.dockerfile() {
        Some(file) => {
            let path = dir.join(file);
            fs::read_to_string(&path).map_err(|source| ConfigError::BuildFile { path, source })?
        }
        None => String::new(),
    };

    Ok(ConfigRecord {
        name: json.name.unwrap_or_default(),
        image: json.image.unwrap_or_default(),
        build_file_content,
        build_context: json.build.context.unwrap_or_default(),
        mounts: json.mounts,
        run_args: json.run_args,
        post_create_command: json.post_create_command.unwrap_or_default(),
        post_start_command: json.post_start_command.unwrap_or_default(),
        registry_aliases: json.customizations.devcli.registry_aliases,
    })
}
