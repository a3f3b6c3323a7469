//! Capabilities command implementation

use crate::cli::output::{format_capabilities_json, format_capabilities_table};
use crate::cli::CapabilitiesListArgs;
use crate::engine::Engine;

/// Handle capabilities list command
pub fn handle_capabilities_list(args: &CapabilitiesListArgs, engine: &Engine) -> String {
    let capabilities = engine.capabilities();
    if args.json {
        format_capabilities_json(&capabilities)
    } else {
        format_capabilities_table(&capabilities)
    }
}
