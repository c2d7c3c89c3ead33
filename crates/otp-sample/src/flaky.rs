//! # Flaky
//!
//! A worker that answers pings and fails on request, used to watch a supervisor restart it.
//!
//! - `("ping", from)` sends `("pong", self, pings)` back to `from`.
//! - `"crash"` ends the actor with an error.

use actor_otp::{message, Actor, ActorError, Clause, Context, ExitReason, Kind, Pid};
use async_trait::async_trait;
use tracing::{info, warn};

enum Request {
    Ping(Pid),
    Crash,
}

#[derive(Debug, Default)]
pub struct Flaky;

#[async_trait]
impl Actor for Flaky {
    /// Pings answered by this instance.
    type State = i64;

    async fn init(&mut self, ctx: &mut Context) -> Result<i64, ActorError> {
        info!(pid = %ctx.pid(), "Flaky worker up");
        Ok(0)
    }

    async fn run(&mut self, pings: &mut i64, ctx: &mut Context) -> Result<(), ActorError> {
        let request = ctx
            .receive_with(
                vec![
                    Clause::sync(("ping", Kind::Pid), |captures| {
                        captures[0].as_pid().cloned().map(Request::Ping)
                    }),
                    Clause::sync("crash", |_| Some(Request::Crash)),
                ],
                None,
            )
            .await?;

        match request {
            Some(Request::Ping(from)) => {
                *pings += 1;
                message::send(&from, ("pong", ctx.pid(), *pings));
                Ok(())
            }
            Some(Request::Crash) => Err(ActorError::failed("crash requested")),
            None => Ok(()),
        }
    }

    async fn terminate(&mut self, reason: &ExitReason, pings: &mut i64, ctx: &mut Context) {
        warn!(pid = %ctx.pid(), pings = *pings, %reason, "Flaky worker going down");
    }
}

/// Asks a [`Flaky`] worker to crash.
pub fn crash(pid: &Pid) {
    message::send(pid, "crash");
}
