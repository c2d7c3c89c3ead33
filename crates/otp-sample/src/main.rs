//! # OTP Sample
//!
//! Starts the [`AppSystem`](otp_sample::app::AppSystem), drives the counter, crashes the flaky
//! worker to show a restart, and shuts everything down.
//!
//! ```bash
//! RUST_LOG=info cargo run -p otp-sample
//! ```

use actor_otp::logging::setup_tracing;
use actor_otp::message;
use actor_otp::testing::Probe;
use otp_sample::app::AppSystem;
use otp_sample::flaky;
use std::time::Duration;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let system = AppSystem::start(10).map_err(|e| e.to_string())?;

    let span = tracing::info_span!("counter");
    async {
        let counter = system.counter().await.map_err(|e| e.to_string())?;
        let total = counter.add(5).await.map_err(|e| e.to_string())?;
        info!(total, "Added to counter");
        counter.reset();
        let total = counter.get().await.map_err(|e| e.to_string())?;
        info!(total, "Counter reset");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("restart");
    let restarted = async {
        let before = system.flaky().await?;
        flaky::crash(&before);

        // The supervisor needs a moment to notice the exit and start a replacement.
        let mut probe = Probe::new();
        for _ in 0..50 {
            let after = system.flaky().await?;
            if after != before {
                message::send(&after, ("ping", probe.pid()));
                let pong = probe.next(Duration::from_secs(1)).await?;
                info!(%before, %after, %pong, "Flaky worker was restarted");
                return Ok(true);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok::<_, actor_otp::ActorError>(false)
    }
    .instrument(span)
    .await;

    match restarted {
        Ok(true) => {}
        Ok(false) => error!("Flaky worker was not restarted"),
        Err(e) => error!(error = %e, "Restart demonstration failed"),
    }

    let children = system
        .supervisor()
        .which_children()
        .await
        .map_err(|e| e.to_string())?;
    for child in children {
        info!(id = %child.id, pid = %child.pid, restart = %child.restart, "Child");
    }

    system.shutdown().await;
    info!("Sample completed");
    Ok(())
}
