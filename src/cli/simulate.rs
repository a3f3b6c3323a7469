//! Simulate command implementation
//!
//! Runs one real dispatch through the configured engine, with a scripted
//! transport standing in for the backends.

use crate::cli::output::format_trace_table;
use crate::cli::{load_config, offline_engine, SimulateArgs};
use crate::dispatch::{DispatchRequest, ScriptedBehavior, ScriptedTransport};
use crate::policy::Actor;
use colored::Colorize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Build the scripted transport for `--fail` / `--slow`.
pub fn scripted_transport(args: &SimulateArgs) -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    for backend in &args.fail {
        transport.script(backend, ScriptedBehavior::Fail("simulated failure".to_string()));
    }
    for backend in &args.slow {
        transport.script(backend, ScriptedBehavior::Stall);
    }
    transport
}

/// Handle simulate command.
///
/// Prints the attempt trace. A failed dispatch is returned as an error after
/// the trace has been printed.
pub async fn handle_simulate(args: &SimulateArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let engine = offline_engine(&config, Arc::new(scripted_transport(args)))?;

    let payload: Value = match &args.payload {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    let request = DispatchRequest::new(&args.capability, Actor::new(&args.actor, &args.role))
        .with_payload(payload);

    match engine.dispatch(request).await {
        Ok(success) => {
            if args.json {
                return Ok(serde_json::to_string_pretty(&success)?);
            }
            Ok(format!(
                "{}\n{} {} served by {} after {} attempt(s)",
                format_trace_table(&success.trace),
                "✓".green(),
                success.capability,
                success.backend_id.bold(),
                success.trace.len()
            ))
        }
        Err(err) => {
            if let Some(trace) = err.trace() {
                if args.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "error": err.error_type(),
                            "trace": trace,
                        }))?
                    );
                } else {
                    println!("{}", format_trace_table(trace));
                }
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXAMPLE_CONFIG;
    use tempfile::NamedTempFile;

    fn args(config: &NamedTempFile, role: &str, fail: &[&str]) -> SimulateArgs {
        SimulateArgs {
            capability: "summarization".to_string(),
            role: role.to_string(),
            actor: "tester".to_string(),
            fail: fail.iter().map(|s| s.to_string()).collect(),
            slow: Vec::new(),
            payload: None,
            json: true,
            config: config.path().to_path_buf(),
        }
    }

    fn example_file() -> NamedTempFile {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), EXAMPLE_CONFIG).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_simulate_falls_back() {
        let file = example_file();
        let output = handle_simulate(&args(&file, "analyst", &["gpt-4o"]))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["backend_id"], "claude-sonnet");
        assert_eq!(parsed["trace"][0]["outcome"], "failure");
        assert_eq!(parsed["trace"][1]["outcome"], "success");
    }

    #[tokio::test]
    async fn test_simulate_exhaustion_is_error() {
        let file = example_file();
        let result = handle_simulate(&args(
            &file,
            "analyst",
            &["gpt-4o", "claude-sonnet", "llama-local"],
        ))
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("all 3 candidate(s)"));
    }

    #[tokio::test]
    async fn test_simulate_permission_denied() {
        let file = example_file();
        let err = handle_simulate(&args(&file, "viewer", &[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("may not execute"));
    }

    #[test]
    fn test_scripted_transport_from_args() {
        let file = example_file();
        let mut a = args(&file, "analyst", &["gpt-4o"]);
        a.slow = vec!["llama-local".to_string()];
        let transport = scripted_transport(&a);
        assert!(transport.call_log().is_empty());
    }
}
