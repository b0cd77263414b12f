//! Scope merging for devcontainer configuration.
//!
//! Scalars follow last-writer-wins (an unset incoming value clears the base),
//! lists are appended in order with duplicates kept, and each merge adds exactly
//! one lifecycle command slot per kind. Registry aliases are applied once, after
//! all scopes are folded.

use crate::manifest::{ConfigRecord, RegistryAlias};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fully merged configuration consumed by identity hashing and the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub name: String,
    pub image: String,
    pub build_file_content: String,
    pub build_context: String,
    pub mounts: Vec<String>,
    pub run_args: Vec<String>,
    pub post_create_commands: Vec<String>,
    pub post_start_commands: Vec<String>,
    pub registry_aliases: Vec<RegistryAlias>,
}

impl EffectiveConfig {
    /// Merge one configuration source on top of `self`.
    #[must_use]
    pub fn merge(mut self, incoming: ConfigRecord) -> Self {
        self.name = incoming.name;
        self.image = incoming.image;
        self.build_file_content = incoming.build_file_content;
        self.build_context = incoming.build_context;
        self.mounts.extend(incoming.mounts);
        self.run_args.extend(incoming.run_args);
        self.post_create_commands.push(incoming.post_create_command);
        self.post_start_commands.push(incoming.post_start_command);
        self.registry_aliases.extend(incoming.registry_aliases);
        self
    }

    /// Fold sources in order: earlier records are overridden by later ones.
    pub fn from_sources(sources: impl IntoIterator<Item = ConfigRecord>) -> Self {
        sources
            .into_iter()
            .fold(Self::default(), Self::merge)
            .with_registry_aliases()
    }

    /// Rewrite `image` and `build_file_content` with every alias, in list order.
    ///
    /// Later pairs see the output of earlier ones, so `a->b, b->c` maps `a` to `c`.
    #[must_use]
    pub fn with_registry_aliases(mut self) -> Self {
        for alias in &self.registry_aliases {
            if alias.original.is_empty() {
                continue;
            }
            debug!(
                original = %alias.original,
                alias = %alias.alias,
                "apply registry alias"
            );
            self.image = self.image.replace(&alias.original, &alias.alias);
            self.build_file_content = self
                .build_file_content
                .replace(&alias.original, &alias.alias);
        }
        self
    }

    pub fn has_build_file(&self) -> bool {
        !self.build_file_content.is_empty()
    }

    /// Lifecycle commands to execute, with empty placeholder slots dropped.
    pub fn post_create(&self) -> impl Iterator<Item = &str> {
        non_empty(&self.post_create_commands)
    }

    pub fn post_start(&self) -> impl Iterator<Item = &str> {
        non_empty(&self.post_start_commands)
    }

    /// Canonical JSON: object keys sorted, independent of field declaration order.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        // serde_json::Map is a BTreeMap unless `preserve_order` is enabled.
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&value)
    }
}

fn non_empty(commands: &[String]) -> impl Iterator<Item = &str> {
    commands
        .iter()
        .map(String::as_str)
        .filter(|cmd| !cmd.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ConfigRecord {
        ConfigRecord::default()
    }

    #[test]
    fn project_scalar_wins_over_global() {
        let global = ConfigRecord {
            name: "g".to_owned(),
            ..record()
        };
        let project = ConfigRecord {
            name: "p".to_owned(),
            ..record()
        };

        let effective = EffectiveConfig::from_sources([global.clone(), project.clone()]);
        assert_eq!(effective.name, "p");

        let reversed = EffectiveConfig::from_sources([project, global]);
        assert_eq!(reversed.name, "g");
    }

    #[test]
    fn unset_scalar_overwrites_base() {
        let global = ConfigRecord {
            image: "ubuntu:24.04".to_owned(),
            build_context: "..".to_owned(),
            ..record()
        };
        let effective = EffectiveConfig::from_sources([global, record()]);
        assert!(effective.image.is_empty());
        assert!(effective.build_context.is_empty());
    }

    #[test]
    fn lists_append_in_order() {
        let global = ConfigRecord {
            mounts: vec!["a".to_owned()],
            run_args: vec!["--init".to_owned()],
            ..record()
        };
        let project = ConfigRecord {
            mounts: vec!["b".to_owned(), "a".to_owned()],
            run_args: vec!["--init".to_owned()],
            ..record()
        };

        let effective = EffectiveConfig::from_sources([global, project]);
        assert_eq!(effective.mounts, vec!["a", "b", "a"]);
        assert_eq!(effective.run_args, vec!["--init", "--init"]);
    }

    #[test]
    fn one_command_slot_per_merge() {
        let global = ConfigRecord {
            post_create_command: "echo global".to_owned(),
            ..record()
        };
        let project = ConfigRecord {
            post_start_command: "echo start".to_owned(),
            ..record()
        };

        let effective = EffectiveConfig::from_sources([global, project]);
        assert_eq!(effective.post_create_commands, vec!["echo global", ""]);
        assert_eq!(effective.post_start_commands, vec!["", "echo start"]);
        assert_eq!(effective.post_create().collect::<Vec<_>>(), vec!["echo global"]);
        assert_eq!(effective.post_start().collect::<Vec<_>>(), vec!["echo start"]);
    }

    #[test]
    fn registry_aliases_chain_in_order() {
        let project = ConfigRecord {
            image: "foo:latest".to_owned(),
            registry_aliases: vec![RegistryAlias::new("foo", "bar"), RegistryAlias::new("bar", "baz")],
            ..record()
        };
        let effective = EffectiveConfig::from_sources([project]);
        assert_eq!(effective.image, "baz:latest");
    }

    #[test]
    fn global_aliases_apply_to_project_build_file() {
        let global = ConfigRecord {
            registry_aliases: vec![RegistryAlias::new("docker.io", "mirror.corp:5000")],
            ..record()
        };
        let project = ConfigRecord {
            build_file_content: "FROM docker.io/library/rust:1\nRUN echo docker.io\n".to_owned(),
            ..record()
        };

        let effective = EffectiveConfig::from_sources([global, project]);
        assert_eq!(
            effective.build_file_content,
            "FROM mirror.corp:5000/library/rust:1\nRUN echo mirror.corp:5000\n"
        );
        assert_eq!(effective.registry_aliases.len(), 1);
    }

    #[test]
    fn aliases_are_applied_once() {
        let project = ConfigRecord {
            image: "ghcr.io/acme/app".to_owned(),
            registry_aliases: vec![RegistryAlias::new("ghcr.io", "ghcr.io.mirror")],
            ..record()
        };
        let effective = EffectiveConfig::from_sources([record(), project]);
        assert_eq!(effective.image, "ghcr.io.mirror/acme/app");
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let json = EffectiveConfig::default().canonical_json().unwrap();
        let build_ctx = json.find("\"buildContext\"").unwrap();
        let name = json.find("\"name\"").unwrap();
        let run_args = json.find("\"runArgs\"").unwrap();
        assert!(build_ctx < name && name < run_args);
    }
}
