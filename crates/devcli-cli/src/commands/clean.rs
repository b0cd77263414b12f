use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use devcli_core::{CleanReport, Engine};
use std::path::Path;

/// Which objects a clean removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// This environment's current container and image.
    Current,
    /// Every identity version for this root.
    AllVersions,
    /// Everything devcli ever created.
    Global,
}

pub fn run(engine: &Engine, root: &Path, scope: Scope, json: bool) -> Result<u8, String> {
    let pb = if json {
        None
    } else {
        Some(spinner("cleaning devcontainers..."))
    };

    let result = match scope {
        Scope::Global => engine.clean_global(),
        Scope::Current | Scope::AllVersions => engine.resolve(root).and_then(|devc| {
            if scope == Scope::AllVersions {
                engine.clean_all_versions(&devc)
            } else {
                engine.clean(&devc)
            }
        }),
    };
    let report = match result {
        Ok(report) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &summary(&report));
            }
            report
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "clean failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        for container in &report.removed_containers {
            println!("removed container {container}");
        }
        for image in &report.removed_images {
            println!("removed image {image}");
        }
    }
    Ok(EXIT_SUCCESS)
}

fn summary(report: &CleanReport) -> String {
    match (report.removed_containers.len(), report.removed_images.len()) {
        (0, 0) => "nothing to clean".to_owned(),
        (c, i) => format!("removed {c} container(s) and {i} image(s)"),
    }
}
