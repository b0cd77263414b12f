use super::{json_pretty, spin_fail, spin_ok, spinner, suspended, EXIT_SUCCESS};
use devcli_core::{Engine, UpAction};
use std::path::Path;

pub fn run(engine: &Engine, root: &Path, json: bool) -> Result<u8, String> {
    let devc = engine.resolve(root).map_err(|e| e.to_string())?;

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("preparing {}...", devc.container_name())))
    };
    // build output and lifecycle commands write to the terminal directly
    let report = match suspended(pb.as_ref(), || engine.prepare(&devc)) {
        Ok(report) => {
            if let Some(ref pb) = pb {
                let verb = match report.action {
                    UpAction::Create => "created",
                    UpAction::Start => "started",
                    UpAction::Reuse => "reusing",
                };
                spin_ok(pb, &format!("{verb} {}", report.container));
            }
            report
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "failed to bring devcontainer up");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    }
    engine.attach(&devc).map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
