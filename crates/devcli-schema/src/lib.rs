//! devcontainer.json resolution and environment identity for devcli.
//!
//! This crate is the configuration layer: relaxed-JSON normalization
//! (`normalize`), loading a scope's `devcontainer.json` into a `ConfigRecord`,
//! folding global and project scopes into an `EffectiveConfig`, and deriving the
//! deterministic identity (`compute_identity`) that names images and containers.

pub mod environment;
pub mod identity;
pub mod manifest;
pub mod merge;
pub mod normalize;
pub mod types;

pub use environment::{resolve_devcontainer, sanitize_name, Devcontainer, NAME_PREFIX};
pub use identity::{compute_identity, EnvIdentity, SHORT_ID_LEN};
pub use manifest::{
    config_dir, config_path, global_config_root, load_config, parse_config_str, ConfigError,
    ConfigRecord, DevcontainerJson, RegistryAlias,
};
pub use merge::EffectiveConfig;
pub use normalize::{normalize, normalize_with_env, WorkspaceVars, CONTAINER_WORKSPACE_ROOT};
pub use types::{EnvId, ShortId};
