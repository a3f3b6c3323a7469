//! `switchyard config init`

use crate::cli::ConfigInitArgs;
use crate::config::{SwitchyardConfig, EXAMPLE_CONFIG};
use colored::Colorize;
use std::fs;

/// Write the annotated sample fleet and describe what it routes.
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<String, Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "{} already exists; pass --force to replace it",
            args.output.display()
        )
        .into());
    }

    let sample: SwitchyardConfig = toml::from_str(EXAMPLE_CONFIG)?;
    fs::write(&args.output, EXAMPLE_CONFIG)?;

    let capabilities: Vec<&str> = sample.capabilities.iter().map(|c| c.id.as_str()).collect();
    Ok(format!(
        "{} Configuration file created: {}\n  {} backends routing {}\n  next: edit backends and grants, then run `switchyard check -c {}`",
        "✓".green(),
        args.output.display(),
        sample.backends.len(),
        capabilities.join(", "),
        args.output.display(),
    ))
}
