//! End-to-end dispatch through the engine: fallback, exhaustion, timeouts,
//! deadlines, admission rejections and cancellation.

mod common;

use common::{admin, analyst, fleet_config, harness, harness_with, viewer};
use std::time::Duration;
use switchyard::dispatch::{
    AttemptOutcome, DispatchError, DispatchRequest, ScriptedBehavior, ScriptedTransport,
};
use switchyard::registry::BackendStatus;
use switchyard::telemetry::{AuditOutcome, DispatchOutcome};
use tokio_util::sync::CancellationToken;

fn outcomes(trace: &switchyard::dispatch::AttemptTrace) -> Vec<AttemptOutcome> {
    trace.iter().map(|a| a.outcome).collect()
}

#[tokio::test]
async fn test_fallback_to_second_candidate() {
    let h = harness(
        ScriptedTransport::new().with("secondary", ScriptedBehavior::Fail("boom".to_string())),
    );

    let success = h
        .engine
        .dispatch(DispatchRequest::new("summarization", analyst()))
        .await
        .unwrap();

    assert_eq!(success.backend_id, "primary");
    assert_eq!(success.trace.len(), 2);
    assert_eq!(
        outcomes(&success.trace),
        vec![AttemptOutcome::Failure, AttemptOutcome::Success]
    );
    assert_eq!(success.trace.attempts()[0].backend_id, "secondary");
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_tries_each_candidate_once() {
    let h = harness(
        ScriptedTransport::new()
            .with("primary", ScriptedBehavior::Fail("down".to_string()))
            .with("secondary", ScriptedBehavior::Stall)
            .with("local", ScriptedBehavior::Fail("down".to_string())),
    );

    let err = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap_err();

    let DispatchError::AllFallbacksExhausted { capability, trace } = err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(capability, "market_analysis");
    assert_eq!(
        outcomes(&trace),
        vec![
            AttemptOutcome::Failure,
            AttemptOutcome::Timeout,
            AttemptOutcome::Failure
        ]
    );
    assert_eq!(
        trace.backends().collect::<Vec<_>>(),
        vec!["primary", "secondary", "local"]
    );
    for backend in ["primary", "secondary", "local"] {
        assert_eq!(h.transport.calls(backend), 1, "{backend} attempted once");
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_attempt_times_out_on_its_own_clock() {
    let h = harness(ScriptedTransport::new().with("primary", ScriptedBehavior::Stall));

    let success = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap();

    let first = &success.trace.attempts()[0];
    assert_eq!(first.outcome, AttemptOutcome::Timeout);
    assert!(first.latency_ms >= 200, "latency {}", first.latency_ms);
    assert_eq!(success.backend_id, "secondary");
}

#[tokio::test(start_paused = true)]
async fn test_deadline_skips_attempt_that_cannot_fit() {
    let mut config = fleet_config();
    config.dispatch.overall_deadline_ms = Some(300);
    let h = harness_with(
        &config,
        ScriptedTransport::new().with("primary", ScriptedBehavior::Stall),
    );

    let err = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap_err();

    // primary times out at 200ms; secondary needs 400ms but only 100ms remain
    let trace = err.trace().unwrap();
    assert!(matches!(err, DispatchError::AllFallbacksExhausted { .. }));
    assert_eq!(trace.len(), 1);
    assert_eq!(h.transport.calls("secondary"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_overrides_config() {
    let h = harness(ScriptedTransport::new());

    let err = h
        .engine
        .dispatch(
            DispatchRequest::new("market_analysis", analyst())
                .with_deadline(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::AllFallbacksExhausted { .. }));
    assert!(err.trace().unwrap().is_empty());
    assert!(h.transport.call_log().is_empty());
}

#[tokio::test]
async fn test_unbounded_deadline_behaves_like_none() {
    let h = harness(
        ScriptedTransport::new().with("primary", ScriptedBehavior::Fail("down".to_string())),
    );

    let success = h
        .engine
        .dispatch(
            DispatchRequest::new("market_analysis", analyst()).with_deadline(Duration::MAX),
        )
        .await
        .unwrap();

    assert_eq!(success.backend_id, "secondary");
    assert_eq!(
        outcomes(&success.trace),
        vec![AttemptOutcome::Failure, AttemptOutcome::Success]
    );
}

#[tokio::test]
async fn test_rate_limited_candidate_is_recorded_and_skipped() {
    let h = harness(ScriptedTransport::new());
    h.engine.set_rate_limit(&admin(), "primary", 1, None).unwrap();

    let first = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap();
    assert_eq!(first.backend_id, "primary");

    let second = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap();
    assert_eq!(second.backend_id, "secondary");
    let rejected = &second.trace.attempts()[0];
    assert_eq!(rejected.backend_id, "primary");
    assert_eq!(rejected.outcome, AttemptOutcome::RateLimited);
    assert_eq!(rejected.latency_ms, 0);
    assert_eq!(h.transport.calls("primary"), 1);
}

#[tokio::test]
async fn test_pool_exhausted_candidate_is_recorded_and_skipped() {
    let mut config = fleet_config();
    config.backends[0].max_connections = Some(1);
    let h = harness_with(&config, ScriptedTransport::new());

    let held = h.engine.admission().pools().acquire("primary").unwrap();
    let success = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap();
    assert_eq!(
        outcomes(&success.trace),
        vec![AttemptOutcome::PoolExhausted, AttemptOutcome::Success]
    );

    drop(held);
    let success = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()))
        .await
        .unwrap();
    assert_eq!(success.backend_id, "primary");
}

#[tokio::test]
async fn test_permission_denied_makes_no_attempts() {
    let h = harness(ScriptedTransport::new());

    let err = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", viewer()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::PermissionDenied { .. }));
    assert!(err.trace().is_none());
    assert!(h.transport.call_log().is_empty());
    assert!(h.telemetry.attempts().is_empty());

    let summaries = h.telemetry.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].outcome, DispatchOutcome::PermissionDenied);

    let audit = h.audit.recent(1);
    assert_eq!(audit[0].outcome, AuditOutcome::Denied);
    assert_eq!(audit[0].resource, "market_analysis");
}

#[tokio::test]
async fn test_unknown_capability() {
    let h = harness(ScriptedTransport::new());

    let err = h
        .engine
        .dispatch(DispatchRequest::new("weather", admin()))
        .await
        .unwrap_err();

    assert_eq!(err, DispatchError::CapabilityNotFound("weather".to_string()));
}

#[tokio::test]
async fn test_empty_chain_with_failing_active_exhausts_after_one_attempt() {
    let h = harness(
        ScriptedTransport::new().with("secondary", ScriptedBehavior::Fail("down".to_string())),
    );
    h.engine
        .set_fallback_chain(&admin(), "summarization", Vec::new())
        .unwrap();

    let err = h
        .engine
        .dispatch(DispatchRequest::new("summarization", analyst()))
        .await
        .unwrap_err();

    assert_eq!(err.trace().unwrap().len(), 1);
    assert_eq!(h.transport.calls("primary"), 0);
}

#[tokio::test]
async fn test_cancelled_before_first_attempt() {
    let h = harness(ScriptedTransport::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .engine
        .dispatch(DispatchRequest::new("market_analysis", analyst()).with_cancellation(cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Cancelled { .. }));
    assert!(err.trace().unwrap().is_empty());
    assert_eq!(
        h.telemetry.summaries()[0].outcome,
        DispatchOutcome::Cancelled
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_lets_in_flight_attempt_finish() {
    let h = harness(ScriptedTransport::new().with(
        "primary",
        ScriptedBehavior::Delay(
            Duration::from_millis(100),
            Box::new(ScriptedBehavior::Fail("late".to_string())),
        ),
    ));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let (result, _) = tokio::join!(
        h.engine.dispatch(
            DispatchRequest::new("market_analysis", analyst()).with_cancellation(cancel)
        ),
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        }
    );

    let err = result.unwrap_err();
    let DispatchError::Cancelled { trace, .. } = err else {
        panic!("expected cancellation, got {err:?}");
    };
    assert_eq!(outcomes(&trace), vec![AttemptOutcome::Failure]);
    assert_eq!(h.transport.calls("secondary"), 0);
}

#[tokio::test]
async fn test_telemetry_sees_every_attempt() {
    let h = harness(
        ScriptedTransport::new().with("secondary", ScriptedBehavior::Fail("boom".to_string())),
    );

    let success = h
        .engine
        .dispatch(DispatchRequest::new("summarization", analyst()))
        .await
        .unwrap();

    let spans = h.telemetry.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].dispatch_id, success.dispatch_id);
    assert_eq!(spans[0].actor_id, "quant-7");

    let attempts = h.telemetry.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.capability == "summarization"));

    let summary = &h.telemetry.summaries()[0];
    assert_eq!(summary.outcome, DispatchOutcome::Success);
    assert_eq!(summary.backend_id.as_deref(), Some("primary"));
    assert_eq!(summary.attempts, 2);
}

#[tokio::test]
async fn test_repeated_failures_degrade_status_without_reordering() {
    let h = harness(
        ScriptedTransport::new().with("secondary", ScriptedBehavior::Fail("boom".to_string())),
    );

    for _ in 0..3 {
        h.engine
            .dispatch(DispatchRequest::new("summarization", analyst()))
            .await
            .unwrap();
    }

    assert_eq!(
        h.engine.backend("secondary").unwrap().status,
        BackendStatus::Degraded
    );
    let entry = h.engine.capability("summarization").unwrap();
    assert_eq!(entry.active_backend.as_deref(), Some("secondary"));
    assert_eq!(h.transport.calls("secondary"), 3);
}

#[tokio::test]
async fn test_concurrent_dispatches() {
    let h = harness(ScriptedTransport::new());

    let requests = (0..20).map(|_| {
        h.engine
            .dispatch(DispatchRequest::new("market_analysis", analyst()))
    });
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(h.transport.calls("primary"), 20);
    assert_eq!(h.telemetry.summaries().len(), 20);
}
