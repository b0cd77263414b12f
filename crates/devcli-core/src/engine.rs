use crate::lifecycle::{ContainerState, UpAction};
use crate::plan::{build_spec, lifecycle_exec, run_spec, shell_exec, DEFAULT_SHELL};
use crate::CoreError;
use devcli_runtime::host::current_user_spec;
use devcli_runtime::{terminal, ContainerRuntime};
use devcli_schema::{resolve_devcontainer, Devcontainer, NAME_PREFIX};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Knobs for the `up` flow and scope resolution.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Global-scope root; `None` skips the global merge entirely.
    pub global_root: Option<PathBuf>,
    /// Pause after creating a container, before post-create commands.
    pub settle_after_create: Duration,
    /// Pause before post-start commands and the interactive shell.
    pub settle_before_attach: Duration,
    pub shell: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            global_root: None,
            settle_after_create: Duration::from_secs(2),
            settle_before_attach: Duration::from_secs(1),
            shell: DEFAULT_SHELL.to_owned(),
        }
    }
}

impl EngineOptions {
    /// No settle delays; for runtimes that are ready as soon as they return.
    #[must_use]
    pub fn immediate(mut self) -> Self {
        self.settle_after_create = Duration::ZERO;
        self.settle_before_attach = Duration::ZERO;
        self
    }
}

/// Outcome of bringing an environment up (everything before the shell).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpReport {
    pub container: String,
    pub image: Option<String>,
    pub previous_state: ContainerState,
    pub action: UpAction,
    pub post_create_commands: usize,
    pub post_start_commands: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CleanReport {
    pub removed_containers: Vec<String>,
    pub removed_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContainerSummary {
    pub name: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Inventory {
    pub containers: Vec<ContainerSummary>,
    pub images: Vec<String>,
}

/// Orchestrates resolution and the container runtime for devcli environments.
pub struct Engine {
    runtime: Box<dyn ContainerRuntime>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(runtime: Box<dyn ContainerRuntime>) -> Self {
        Self::with_options(runtime, EngineOptions::default())
    }

    pub fn with_options(runtime: Box<dyn ContainerRuntime>, options: EngineOptions) -> Self {
        Self { runtime, options }
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Resolve the effective environment for `root` (global scope first, then project).
    pub fn resolve(&self, root: &Path) -> Result<Devcontainer, CoreError> {
        info!("resolving devcontainer for {}", root.display());
        let devc = resolve_devcontainer(root, self.options.global_root.as_deref())?;
        debug!(
            container = %devc.container_name(),
            image = ?devc.image_name(),
            "resolved devcontainer"
        );
        Ok(devc)
    }

    pub fn container_state(&self, name: &str) -> Result<ContainerState, CoreError> {
        let running = self.runtime.container_running(name)?;
        let exists = running || self.runtime.container_exists(name)?;
        Ok(ContainerState::from_flags(exists, running))
    }

    /// Make the environment's image available: pull a configured image, or build
    /// the build file when no image with the derived tag exists yet.
    pub fn ensure_image(&self, devc: &Devcontainer) -> Result<String, CoreError> {
        if !devc.config.image.is_empty() {
            let image = devc.config.image.clone();
            info!(image = %image, "pulling image");
            self.runtime.pull_image(&image)?;
            return Ok(image);
        }

        let Some(spec) = build_spec(devc) else {
            return Err(CoreError::NoImage(devc.root.clone()));
        };
        let exists = self.runtime.image_exists(&spec.tag)?;
        debug!(image = %spec.tag, exists, "checking if image exists");
        if !exists {
            info!(image = %spec.tag, context = %spec.context.display(), "building image");
            self.runtime.build_image(&spec)?;
        }
        Ok(spec.tag)
    }

    /// Bring the container to the running state and run lifecycle commands.
    pub fn prepare(&self, devc: &Devcontainer) -> Result<UpReport, CoreError> {
        let container = devc.container_name();
        let state = self.container_state(&container)?;
        let action = UpAction::for_state(state);
        debug!(container = %container, %state, ?action, "container state");

        let mut image = devc.image_name();
        let mut post_create_commands = 0;
        match action {
            UpAction::Reuse => {}
            UpAction::Start => {
                info!(container = %container, "starting container");
                self.runtime.start_container(&container)?;
            }
            UpAction::Create => {
                let ensured = self.ensure_image(devc)?;
                info!(container = %container, image = %ensured, "creating container");
                self.runtime.run_container(&run_spec(devc, &ensured))?;
                image = Some(ensured);
            }
        }
        if action.runs_post_create() {
            settle(self.options.settle_after_create);
            post_create_commands = self.run_commands(&container, devc.config.post_create())?;
        }

        settle(self.options.settle_before_attach);
        let post_start_commands = self.run_commands(&container, devc.config.post_start())?;

        Ok(UpReport {
            container,
            image,
            previous_state: state,
            action,
            post_create_commands,
            post_start_commands,
        })
    }

    /// Open the interactive shell as the host user.
    pub fn attach(&self, devc: &Devcontainer) -> Result<(), CoreError> {
        let container = devc.container_name();
        debug!(container = %container, "exec into container");
        let image = devc.image_name().unwrap_or_default();
        terminal::print_container_banner(&container, &image);
        let result = self.runtime.exec(&shell_exec(
            &container,
            &self.options.shell,
            current_user_spec(),
        ));
        terminal::print_container_exit(&container);
        result.map_err(CoreError::from)
    }

    /// `prepare` followed by `attach`.
    pub fn up(&self, devc: &Devcontainer) -> Result<UpReport, CoreError> {
        let report = self.prepare(devc)?;
        self.attach(devc)?;
        Ok(report)
    }

    fn run_commands<'a>(
        &self,
        container: &str,
        commands: impl Iterator<Item = &'a str>,
    ) -> Result<usize, CoreError> {
        let mut count = 0;
        for command in commands {
            info!(container, command, "running lifecycle command");
            self.runtime.exec(&lifecycle_exec(container, command))?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove a container, stopping it first. Absent containers are skipped.
    pub fn remove_container(&self, name: &str) -> Result<bool, CoreError> {
        match self.container_state(name)? {
            ContainerState::Absent => return Ok(false),
            ContainerState::Running => {
                debug!(container = name, "stopping container");
                self.runtime.stop_container(name)?;
            }
            ContainerState::Stopped => {}
        }
        debug!(container = name, "removing container");
        self.runtime.remove_container(name)?;
        Ok(true)
    }

    /// Remove an image. Absent images are skipped.
    pub fn remove_image(&self, image: &str) -> Result<bool, CoreError> {
        if image.is_empty() || !self.runtime.image_exists(image)? {
            return Ok(false);
        }
        debug!(image, "removing image");
        self.runtime.remove_image(image)?;
        Ok(true)
    }

    /// Remove this environment's container and image.
    pub fn clean(&self, devc: &Devcontainer) -> Result<CleanReport, CoreError> {
        let mut report = CleanReport::default();
        let container = devc.container_name();
        if self.remove_container(&container)? {
            report.removed_containers.push(container);
        }
        if let Some(image) = devc.image_name() {
            if self.remove_image(&image)? {
                report.removed_images.push(image);
            }
        }
        Ok(report)
    }

    /// Remove every container and image version belonging to this root.
    pub fn clean_all_versions(&self, devc: &Devcontainer) -> Result<CleanReport, CoreError> {
        self.clean_prefix(&devc.name_prefix())
    }

    /// Remove every container and image created by devcli.
    pub fn clean_global(&self) -> Result<CleanReport, CoreError> {
        self.clean_prefix(&format!("{NAME_PREFIX}_"))
    }

    fn clean_prefix(&self, prefix: &str) -> Result<CleanReport, CoreError> {
        info!(prefix, "cleaning containers and images");
        let mut report = CleanReport::default();
        for container in self.runtime.list_containers(prefix)? {
            if self.remove_container(&container)? {
                report.removed_containers.push(container);
            }
        }
        for image in self.runtime.list_images(prefix)? {
            if self.remove_image(&image)? {
                report.removed_images.push(image);
            }
        }
        Ok(report)
    }

    /// Every devcli container (with its state) and image known to the runtime.
    pub fn inventory(&self) -> Result<Inventory, CoreError> {
        let prefix = format!("{NAME_PREFIX}_");
        let mut containers = Vec::new();
        for name in self.runtime.list_containers(&prefix)? {
            let state = self.container_state(&name)?;
            containers.push(ContainerSummary { name, state });
        }
        let images = self.runtime.list_images(&prefix)?;
        Ok(Inventory { containers, images })
    }
}

fn settle(delay: Duration) {
    if !delay.is_zero() {
        debug!(?delay, "waiting for container to settle");
        std::thread::sleep(delay);
    }
}
