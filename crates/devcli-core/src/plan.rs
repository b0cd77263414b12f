//! Pure translation of a resolved [`Devcontainer`] into runtime requests.

use devcli_runtime::{BuildSpec, ExecSpec, RunSpec};
use devcli_schema::Devcontainer;

/// Keeps a detached container alive so later `exec` calls have a target.
pub const KEEP_ALIVE: [&str; 3] = ["/bin/sh", "-c", "while true; do sleep 5; done;"];

/// Interactive shell opened by `up`.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Image build request, or `None` when the environment has no build file.
pub fn build_spec(devc: &Devcontainer) -> Option<BuildSpec> {
    if !devc.config.has_build_file() {
        return None;
    }
    Some(BuildSpec {
        tag: devc.container_name(),
        dockerfile: devc.config.build_file_content.clone(),
        context: devc.build_context_dir(),
    })
}

/// `run` request: workspace volume, then mounts, then run args verbatim.
pub fn run_spec(devc: &Devcontainer, image: &str) -> RunSpec {
    RunSpec {
        name: devc.container_name(),
        image: image.to_owned(),
        volumes: vec![format!(
            "{}:{}",
            devc.root.display(),
            devc.container_workspace()
        )],
        mounts: devc.config.mounts.clone(),
        run_args: devc.config.run_args.clone(),
        command: KEEP_ALIVE.iter().map(|s| (*s).to_owned()).collect(),
    }
}

/// Non-interactive `sh -c <command>` as the container's default user.
pub fn lifecycle_exec(container: &str, command: &str) -> ExecSpec {
    ExecSpec {
        container: container.to_owned(),
        command: vec!["sh".to_owned(), "-c".to_owned(), command.to_owned()],
        interactive: false,
        user: None,
    }
}

/// Interactive shell as `user`.
pub fn shell_exec(container: &str, shell: &str, user: String) -> ExecSpec {
    ExecSpec {
        container: container.to_owned(),
        command: vec![shell.to_owned()],
        interactive: true,
        user: Some(user),
    }
}
