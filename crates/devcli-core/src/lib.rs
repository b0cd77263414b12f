//! Core orchestration for devcli environments.
//!
//! This crate ties schema resolution and the container runtime together into the
//! `Engine`: resolving the global and project scopes of a workspace, planning the
//! build/run/exec requests for its container, bringing the container up with its
//! lifecycle commands, and cleaning containers and images afterwards.

pub mod engine;
pub mod lifecycle;
pub mod plan;

pub use engine::{CleanReport, ContainerSummary, Engine, EngineOptions, Inventory, UpReport};
pub use lifecycle::{ContainerState, UpAction};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] devcli_schema::ConfigError),
    #[error("runtime error: {0}")]
    Runtime(#[from] devcli_runtime::RuntimeError),
    #[error("no image or build file configured for {}", .0.display())]
    NoImage(PathBuf),
}
