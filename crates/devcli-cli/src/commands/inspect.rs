use super::{json_pretty, EXIT_SUCCESS};
use devcli_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, root: &Path, json: bool) -> Result<u8, String> {
    let devc = engine.resolve(root).map_err(|e| e.to_string())?;
    let image = devc.image_name();
    if json {
        let payload = serde_json::json!({
            "root": devc.root,
            "env_id": devc.identity.env_id,
            "short_id": devc.identity.short_id,
            "container": devc.container_name(),
            "image": image,
            "workspace": devc.container_workspace(),
            "config": devc.config,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let config = &devc.config;
        println!("root:        {}", devc.root.display());
        println!("env_id:      {}", devc.identity.env_id);
        println!("short_id:    {}", devc.identity.short_id);
        println!("container:   {}", devc.container_name());
        println!("image:       {}", image.as_deref().unwrap_or("(none)"));
        println!("workspace:   {}", devc.container_workspace());
        println!(
            "name:        {}",
            if config.name.is_empty() { "(none)" } else { config.name.as_str() }
        );
        println!("build file:  {}", if config.has_build_file() { "yes" } else { "no" });
        println!("mounts:      {}", config.mounts.len());
        println!("run args:    {}", config.run_args.join(" "));
        println!("post-create: {}", config.post_create().count());
        println!("post-start:  {}", config.post_start().count());
        println!("aliases:     {}", config.registry_aliases.len());
    }
    Ok(EXIT_SUCCESS)
}
