//! # Observability & Tracing
//!
//! The runtime logs through `tracing` with structured fields. Nothing is printed unless the
//! host installs a subscriber; [`setup_tracing`] installs the default one.
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | actor started, normal or cancelled exit, supervisor start/stop, admin actions |
//! | `warn` | abnormal exits, restart decisions, failed background tasks, unknown requests |
//! | `error` | a supervisor exceeding its restart intensity |
//! | `debug` | calls, stale or unknown notifications, background task bookkeeping |
//! | `trace` | messages dropped because the target had terminated |
//!
//! Fields use `Display` for pids and reasons, so a restart reads like:
//!
//! ```text
//! WARN Actor exited actor="Flaky" pid=<0.7> reason=error: crash requested
//! WARN Restarting supervisor="AppSupervisor" child="flaky" reason=error: crash requested strategy=OneForOne restarting=1
//! INFO Actor started actor="Flaky" pid=<0.9>
//! ```
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -p otp-sample
//! RUST_LOG=actor_otp=debug cargo run -p otp-sample
//! ```

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // actor and supervisor names are logged as fields
        .compact()
        .try_init();
}
