// Path: crates/core/tests/telemetry_init.rs

//! Smoke test for the logging bootstrap. Lives in its own test binary
//! because the subscriber is process-global.

#[test]
fn tracing_initializes_once() {
    covenant_telemetry::init_tracing().unwrap();
    tracing::info!(component = "telemetry-test", "structured logging is live");

    // A second initialization must fail rather than silently replace the
    // global subscriber.
    assert!(covenant_telemetry::init_tracing().is_err());
}
