//! Container runtime drivers for devcli environments.
//!
//! This crate implements the execution layer: the `ContainerRuntime` trait with a
//! CLI-driven backend for `docker` (and the CLI-compatible `podman`), an in-memory
//! mock backend, prerequisite checking, host user lookup and terminal markers.
//! Runtimes only report success, failure and existence; they hold no state of
//! their own beyond what the container engine keeps.

pub mod backend;
pub mod docker;
pub mod host;
pub mod mock;
pub mod prereq;
pub mod terminal;

pub use backend::{select_runtime, BuildSpec, ContainerRuntime, ExecSpec, RunSpec};
pub use docker::DockerCli;
pub use mock::{MockCall, MockRuntime};
pub use prereq::{check_runtime_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("runtime '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
}
