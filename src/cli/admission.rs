//! Admission command implementation

use crate::cli::output::{format_admission_json, format_admission_table};
use crate::cli::AdmissionArgs;
use crate::engine::Engine;

/// Handle admission status command
pub fn handle_admission(args: &AdmissionArgs, engine: &Engine) -> String {
    let status = engine.admission_status();
    if args.json {
        format_admission_json(&status)
    } else {
        format_admission_table(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::offline_engine;
    use crate::config::{SwitchyardConfig, EXAMPLE_CONFIG};
    use crate::dispatch::NullTransport;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_example_config_admission() {
        let config: SwitchyardConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        let engine = offline_engine(&config, Arc::new(NullTransport)).unwrap();
        let args = AdmissionArgs {
            json: true,
            config: PathBuf::from("switchyard.toml"),
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&handle_admission(&args, &engine)).unwrap();
        let rows = parsed["admission"].as_array().unwrap();
        let gpt = rows.iter().find(|r| r["backend_id"] == "gpt-4o").unwrap();
        let llama = rows
            .iter()
            .find(|r| r["backend_id"] == "llama-local")
            .unwrap();

        // Backend override beats the admission default
        assert_eq!(gpt["rate_limit"]["max_requests"], 30);
        assert_eq!(gpt["pool"]["max_connections"], 8);
        assert_eq!(llama["pool"]["max_connections"], 2);
        assert_eq!(llama["rate_limit"]["max_requests"], 60);
    }
}
