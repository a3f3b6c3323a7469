//! Backends command implementation

use crate::cli::output::{format_backends_json, format_backends_table, BackendView};
use crate::cli::BackendsListArgs;
use crate::engine::Engine;
use crate::registry::BackendStatus;

/// Handle backends list command
pub fn handle_backends_list(
    args: &BackendsListArgs,
    engine: &Engine,
) -> Result<String, Box<dyn std::error::Error>> {
    let backends = match &args.capability {
        Some(capability) => engine.registry().list_by_capability(capability),
        None => engine.backends(),
    };

    // Filter by status if provided
    let filtered = if let Some(ref status) = args.status {
        let target: BackendStatus = status.parse()?;
        backends
            .into_iter()
            .filter(|b| b.status == target)
            .collect()
    } else {
        backends
    };

    let views: Vec<BackendView> = filtered.iter().map(BackendView::from).collect();

    if args.json {
        Ok(format_backends_json(&views))
    } else {
        Ok(format_backends_table(&views))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::offline_engine;
    use crate::config::SwitchyardConfig;
    use crate::dispatch::NullTransport;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn engine() -> Engine {
        let config: SwitchyardConfig = toml::from_str(
            r#"
            [[backends]]
            id = "fast"
            provider = "openai"
            capabilities = ["summarize"]
            priority = 10

            [[backends]]
            id = "slow"
            provider = "local"
            capabilities = ["summarize", "classify"]
            priority = 1
            "#,
        )
        .unwrap();
        offline_engine(&config, Arc::new(NullTransport)).unwrap()
    }

    fn args() -> BackendsListArgs {
        BackendsListArgs {
            json: true,
            status: None,
            capability: None,
            config: PathBuf::from("switchyard.toml"),
        }
    }

    #[test]
    fn test_list_in_rank_order() {
        let output = handle_backends_list(&args(), &engine()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["backends"][0]["id"], "fast");
        assert_eq!(parsed["backends"][1]["id"], "slow");
    }

    #[test]
    fn test_filter_by_capability() {
        let args = BackendsListArgs {
            capability: Some("classify".to_string()),
            ..args()
        };
        let output = handle_backends_list(&args, &engine()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["backends"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["backends"][0]["id"], "slow");
    }

    #[test]
    fn test_invalid_status_filter() {
        let args = BackendsListArgs {
            status: Some("healthy".to_string()),
            ..args()
        };
        let err = handle_backends_list(&args, &engine()).unwrap_err();
        assert!(err.to_string().contains("Invalid status"));
    }
}
