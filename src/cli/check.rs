//! Check command implementation

use crate::cli::{load_config, offline_engine, CheckArgs};
use crate::dispatch::NullTransport;
use colored::Colorize;
use std::sync::Arc;

/// Validate a configuration file and summarize what it would load.
pub fn handle_check(args: &CheckArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let engine = offline_engine(&config, Arc::new(NullTransport))?;

    let unassigned: Vec<String> = engine
        .capabilities()
        .into_iter()
        .filter(|c| c.candidates().is_empty())
        .map(|c| c.id)
        .collect();
    let active_model = engine
        .active_permission_model()
        .map(|m| m.id)
        .unwrap_or_else(|| "none".to_string());

    let mut out = format!(
        "{} Configuration valid: {}\n  backends: {}\n  capabilities: {}\n  permission models: {} (active: {})",
        "✓".green(),
        args.config.display(),
        engine.backends().len(),
        engine.capabilities().len(),
        engine.permission_models().len(),
        active_model,
    );
    if engine.active_permission_model().is_none() {
        out.push_str(&format!(
            "\n  {} no active permission model: every request will be denied",
            "!".yellow()
        ));
    }
    if !unassigned.is_empty() {
        out.push_str(&format!(
            "\n  {} capabilities without backends: {}",
            "!".yellow(),
            unassigned.join(", ")
        ));
    }
    Ok(out)
}
