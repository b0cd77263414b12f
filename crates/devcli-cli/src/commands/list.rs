use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use devcli_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let inventory = engine.inventory().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&inventory)?);
        return Ok(EXIT_SUCCESS);
    }

    if inventory.containers.is_empty() {
        println!("no devcontainers found");
    } else {
        println!("{:<40} STATE", "CONTAINER");
        for container in &inventory.containers {
            println!(
                "{:<40} {}",
                container.name,
                colorize_state(&container.state.to_string())
            );
        }
    }
    if !inventory.images.is_empty() {
        println!();
        println!("IMAGE");
        for image in &inventory.images {
            println!("{image}");
        }
    }
    Ok(EXIT_SUCCESS)
}
