//! # Counter
//!
//! A GenServer holding one integer.
//!
//! | Message | Kind | Effect |
//! |---------|------|--------|
//! | `"get"` | call | replies with the count |
//! | `("add", n)` | call | adds `n`, replies with the new count or `("error", "overflow")` |
//! | `"reset"` | cast | sets the count to zero |
//! | `("set", n)` | cast | sets the count to `n` |
//!
//! Anything else sent as a call is answered with `("error", "unknown request")`; stray casts
//! and info messages are logged and dropped.

use actor_otp::registry::Registry;
use actor_otp::{message, ActorError, Context, ExitReason, GenServer, Pid, Ref, Value};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter unreachable: {0}")]
    Actor(#[from] ActorError),

    #[error("counter rejected request: {0}")]
    Rejected(Value),
}

/// Counter server. Optionally registers itself under a name every time it starts, so a
/// restarted instance is found under the same name.
#[derive(Default)]
pub struct Counter {
    initial: i64,
    registration: Option<(Arc<Registry>, String)>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            initial,
            registration: None,
        }
    }

    pub fn registered_as(mut self, registry: Arc<Registry>, name: impl Into<String>) -> Self {
        self.registration = Some((registry, name.into()));
        self
    }
}

#[async_trait]
impl GenServer for Counter {
    type State = i64;

    async fn init(&mut self, ctx: &mut Context) -> Result<i64, ActorError> {
        if let Some((registry, name)) = &self.registration {
            if !registry.register(name.as_str(), ctx.pid()) {
                return Err(ActorError::usage(format!("name '{name}' is already taken")));
            }
        }
        info!(pid = %ctx.pid(), count = self.initial, "Counter ready");
        Ok(self.initial)
    }

    async fn handle_call(
        &mut self,
        request: Value,
        _from: Ref,
        count: &mut i64,
        _ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        if request == "get" {
            return Ok(Value::Int(*count));
        }
        match request.as_tuple() {
            Some([op, Value::Int(n)]) if *op == "add" => match count.checked_add(*n) {
                Some(total) => {
                    *count = total;
                    debug!(added = n, count = total, "Counter updated");
                    Ok(Value::Int(total))
                }
                None => {
                    warn!(added = n, count = *count, "Counter overflow");
                    Ok(Value::from(("error", "overflow")))
                }
            },
            _ => {
                warn!(%request, "Unknown counter call");
                Ok(Value::from(("error", "unknown request")))
            }
        }
    }

    async fn handle_cast(
        &mut self,
        request: Value,
        count: &mut i64,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        match request.as_tuple() {
            Some([op, Value::Int(n)]) if *op == "set" => *count = *n,
            _ if request == "reset" => *count = 0,
            _ => warn!(%request, "Unknown counter cast"),
        }
        Ok(())
    }

    async fn handle_info(
        &mut self,
        message: Value,
        _count: &mut i64,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        debug!(%message, "Counter ignored message");
        Ok(())
    }

    async fn terminate(&mut self, reason: &ExitReason, count: &mut i64, ctx: &mut Context) {
        if let Some((registry, name)) = &self.registration {
            if registry.whereis(name).as_ref() == Some(ctx.pid()) {
                registry.unregister(name);
            }
        }
        info!(pid = %ctx.pid(), count = *count, %reason, "Counter stopped");
    }
}

/// Typed client for a running [`Counter`].
#[derive(Debug, Clone)]
pub struct CounterClient {
    pid: Pid,
    timeout: Duration,
}

impl CounterClient {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            timeout: message::DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    #[instrument(skip(self), fields(counter = %self.pid))]
    pub async fn get(&self) -> Result<i64, CounterError> {
        let reply = message::call(&self.pid, "get", self.timeout).await?;
        reply.as_int().ok_or(CounterError::Rejected(reply))
    }

    #[instrument(skip(self), fields(counter = %self.pid))]
    pub async fn add(&self, n: i64) -> Result<i64, CounterError> {
        let reply = message::call(&self.pid, ("add", n), self.timeout).await?;
        reply.as_int().ok_or(CounterError::Rejected(reply))
    }

    pub fn set(&self, n: i64) {
        message::cast(&self.pid, ("set", n));
    }

    pub fn reset(&self) {
        message::cast(&self.pid, "reset");
    }
}
