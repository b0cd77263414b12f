use crate::backend::{BuildSpec, ContainerRuntime, ExecSpec, RunSpec};
use crate::RuntimeError;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Drives a Docker-compatible CLI (`docker`, `podman`) as child processes.
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    fn check(&self, args: &[String], output: &Output) -> Result<(), RuntimeError> {
        if output.status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: self.describe(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }

    /// Run to completion with captured output; fail on a non-zero exit.
    fn run(&self, args: &[String]) -> Result<Output, RuntimeError> {
        debug!(command = %self.describe(args), "invoking container runtime");
        let output = self.command(args).output()?;
        self.check(args, &output)?;
        Ok(output)
    }

    /// Run with the terminal attached.
    fn run_attached(&self, args: &[String]) -> Result<(), RuntimeError> {
        debug!(command = %self.describe(args), "invoking container runtime (attached)");
        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: self.describe(args),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn stdout_lines(&self, args: &[String]) -> Result<Vec<String>, RuntimeError> {
        let output = self.run(args)?;
        Ok(parse_lines(&String::from_utf8_lossy(&output.stdout)))
    }

    fn has_output(&self, args: &[String]) -> Result<bool, RuntimeError> {
        Ok(!self.stdout_lines(args)?.is_empty())
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_owned()).collect()
}

/// Non-empty, trimmed lines of CLI output.
pub fn parse_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Exact-match name filter for `ps -f`.
fn name_filter(name: &str) -> String {
    format!("name=^{name}$")
}

impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        &self.program
    }

    fn available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.has_output(&args(&["images", "-q", image]))
    }

    fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.run(&args(&["pull", image])).map(drop)
    }

    fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        let args = spec.to_args();
        debug!(command = %self.describe(&args), "building image");
        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(spec.dockerfile.as_bytes())?;
        }
        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: self.describe(&args),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn remove_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.run(&args(&["image", "rm", image])).map(drop)
    }

    fn list_images(&self, prefix: &str) -> Result<Vec<String>, RuntimeError> {
        let reference = format!("reference={prefix}*");
        let lines = self.stdout_lines(&args(&[
            "images",
            "--filter",
            &reference,
            "--format",
            "{{.Repository}}",
        ]))?;
        Ok(lines
            .into_iter()
            .filter(|image| image.starts_with(prefix))
            .collect())
    }

    fn container_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.has_output(&args(&["ps", "-aq", "-f", &name_filter(name)]))
    }

    fn container_running(&self, name: &str) -> Result<bool, RuntimeError> {
        self.has_output(&args(&["ps", "-q", "-f", &name_filter(name)]))
    }

    fn run_container(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        self.run(&spec.to_args()).map(drop)
    }

    fn start_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&args(&["start", name])).map(drop)
    }

    fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&args(&["stop", name])).map(drop)
    }

    fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&args(&["container", "rm", name])).map(drop)
    }

    fn list_containers(&self, prefix: &str) -> Result<Vec<String>, RuntimeError> {
        let filter = format!("name={prefix}");
        let lines = self.stdout_lines(&args(&[
            "ps",
            "-a",
            "--filter",
            &filter,
            "--format",
            "{{.Names}}",
        ]))?;
        Ok(lines
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    fn exec(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        let args = spec.to_args();
        if spec.interactive {
            self.run_attached(&args)
        } else {
            let output = self.run(&args)?;
            debug!(
                stdout = %String::from_utf8_lossy(&output.stdout),
                "command finished in container"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lines_skips_blanks() {
        let out = "devcli_a_1234567\n\n  devcli_b_7654321  \n";
        assert_eq!(parse_lines(out), vec!["devcli_a_1234567", "devcli_b_7654321"]);
        assert!(parse_lines("\n").is_empty());
    }

    #[test]
    fn name_filter_is_anchored() {
        assert_eq!(name_filter("devcli_a_1234567"), "name=^devcli_a_1234567$");
    }

    #[test]
    fn missing_program_is_unavailable() {
        let cli = DockerCli::new("devcli-no-such-runtime-binary");
        assert!(!cli.available());
        assert!(matches!(
            cli.image_exists("alpine"),
            Err(RuntimeError::Io(_))
        ));
    }

    #[test]
    fn runtime_name_is_program() {
        assert_eq!(DockerCli::default().name(), "docker");
        assert_eq!(DockerCli::new("podman").name(), "podman");
    }
}
