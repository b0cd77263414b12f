use crate::merge::EffectiveConfig;
use crate::types::{EnvId, ShortId};
use serde::Serialize;
use std::path::Path;

/// Length of the identity prefix embedded in image and container names.
pub const SHORT_ID_LEN: usize = 7;

/// Deterministic identity for an environment, derived from its resolved configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnvIdentity {
    pub env_id: EnvId,
    pub short_id: ShortId,
}

/// Compute the identity of `config` resolved at `root`.
///
/// The digest covers, in order, the root path bytes and the canonical JSON of the
/// effective configuration. Build-file content is part of that JSON and is not
/// hashed a second time. Identical root, configuration and build-file bytes always
/// produce the same identity.
pub fn compute_identity(
    config: &EffectiveConfig,
    root: &Path,
) -> Result<EnvIdentity, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(root.as_os_str().as_encoded_bytes());
    hasher.update(config.canonical_json()?.as_bytes());

    let hex = hasher.finalize().to_hex().to_string();
    let short = hex[..SHORT_ID_LEN].to_owned();

    Ok(EnvIdentity {
        env_id: EnvId::new(hex),
        short_id: ShortId::new(short),
    })
}
