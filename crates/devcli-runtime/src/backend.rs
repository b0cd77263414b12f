use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Inputs for building an image from in-memory build-file content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSpec {
    pub tag: String,
    pub dockerfile: String,
    pub context: PathBuf,
}

impl BuildSpec {
    /// `build -f - -t <tag> <context>`; the build file is fed on stdin.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "build".to_owned(),
            "-f".to_owned(),
            "-".to_owned(),
            "-t".to_owned(),
            self.tag.clone(),
            self.context.to_string_lossy().into_owned(),
        ]
    }
}

/// Inputs for creating and starting a detached container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub volumes: Vec<String>,
    pub mounts: Vec<String>,
    pub run_args: Vec<String>,
    pub command: Vec<String>,
}

impl RunSpec {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "-d".to_owned(),
            "--name".to_owned(),
            self.name.clone(),
        ];
        for volume in &self.volumes {
            args.push("--volume".to_owned());
            args.push(volume.clone());
        }
        for mount in &self.mounts {
            args.push("--mount".to_owned());
            args.push(mount.clone());
        }
        args.extend(self.run_args.iter().cloned());
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// A process to start inside a running container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecSpec {
    pub container: String,
    pub command: Vec<String>,
    pub interactive: bool,
    /// `uid:gid` to run as; `None` keeps the image's default user.
    pub user: Option<String>,
}

impl ExecSpec {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_owned()];
        if self.interactive {
            args.push("-it".to_owned());
        }
        if let Some(user) = &self.user {
            args.push("--user".to_owned());
            args.push(user.clone());
        }
        args.push(self.container.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// The narrow interface devcli needs from a container engine.
///
/// Every call blocks until the engine finishes; no call is retried.
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError>;

    fn remove_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Image repositories whose name starts with `prefix`.
    fn list_images(&self, prefix: &str) -> Result<Vec<String>, RuntimeError>;

    fn container_exists(&self, name: &str) -> Result<bool, RuntimeError>;

    fn container_running(&self, name: &str) -> Result<bool, RuntimeError>;

    fn run_container(&self, spec: &RunSpec) -> Result<(), RuntimeError>;

    fn start_container(&self, name: &str) -> Result<(), RuntimeError>;

    fn stop_container(&self, name: &str) -> Result<(), RuntimeError>;

    fn remove_container(&self, name: &str) -> Result<(), RuntimeError>;

    /// Container names (running or not) that start with `prefix`.
    fn list_containers(&self, prefix: &str) -> Result<Vec<String>, RuntimeError>;

    fn exec(&self, spec: &ExecSpec) -> Result<(), RuntimeError>;
}

pub fn select_runtime(name: &str) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
    match name {
        "docker" | "podman" => Ok(Box::new(crate::docker::DockerCli::new(name))),
        "mock" => Ok(Box::new(crate::mock::MockRuntime::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
