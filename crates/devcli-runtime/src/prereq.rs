use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn engine_reachable(program: &str) -> bool {
    Command::new(program)
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that `program` is installed and its engine answers.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_runtime_prereqs(program: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if program == "mock" {
        return missing;
    }

    if !command_exists(program) {
        missing.push(MissingPrereq {
            name: program.to_owned(),
            purpose: "building images and running devcontainers",
            install_hint: "https://docs.docker.com/engine/install/ | https://podman.io/docs/installation",
        });
    } else if !engine_reachable(program) {
        missing.push(MissingPrereq {
            name: format!("{program} engine"),
            purpose: "the container engine must be running and reachable by this user",
            install_hint: "start the daemon (systemctl start docker) or add your user to the docker group",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\ndevcli requires a container engine to create devcontainers.");
    msg
}
