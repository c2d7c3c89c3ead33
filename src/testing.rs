//! # Testing Helpers
//!
//! Small tools for writing deterministic tests against real actors.
//!
//! | Helper | Use it to |
//! |--------|-----------|
//! | [`Probe`] | hand a pid to an actor and selectively receive what it sends back |
//! | [`assert_receives`] | receive-or-panic with a readable failure message |
//! | [`with_timeout`] | bound any future, turning a hang into [`ActorError::Timeout`] |
//! | [`wait_for`] | poll a condition until it holds |
//! | [`Collector`] | a ready-made server that records every info message it gets |
//!
//! ## Probing an actor
//!
//! Actors under test usually report lifecycle events to a probe passed in at construction:
//!
//! ```rust,ignore
//! let mut probe = Probe::new();
//! let pid = Worker::new(probe.pid().clone()).start(&scope)?;
//! let started = assert_receives(&mut probe, ("started", Kind::Pid), Duration::from_secs(1)).await;
//! assert_eq!(started[0].as_pid(), Some(&pid));
//! ```
//!
//! Prefer waiting on a message or a condition over sleeping; sleeps make tests slow and flaky.

use crate::actor::Context;
use crate::error::{ActorError, ReceiveTimeout};
use crate::gen_server::GenServer;
use crate::mailbox::Mailbox;
use crate::message;
use crate::pattern::{Captures, Pattern, ANY};
use crate::pid::{Pid, Ref};
use crate::value::Value;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// A pid with a mailbox the test owns.
#[derive(Default)]
pub struct Probe {
    mailbox: Mailbox,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pid(&self) -> &Pid {
        self.mailbox.pid()
    }

    /// Selectively receives the first message matching `pattern`.
    pub async fn receive(
        &mut self,
        pattern: impl Into<Pattern>,
        timeout: Duration,
    ) -> Result<Captures, ActorError> {
        let matched = self.mailbox.receive(&[pattern.into()], Some(timeout)).await?;
        Ok(matched.captures)
    }

    /// Receives whatever arrives next.
    pub async fn next(&mut self, timeout: Duration) -> Result<Value, ActorError> {
        let [message] = self
            .receive(ANY, timeout)
            .await?
            .into_array()
            .ok_or_else(|| ActorError::usage("ANY binds exactly one value"))?;
        Ok(message)
    }

    /// Messages received but skipped by earlier selective receives.
    pub fn pending(&self) -> usize {
        self.mailbox.saved()
    }
}

/// Receives a message matching `pattern` or panics.
pub async fn assert_receives(
    probe: &mut Probe,
    pattern: impl Into<Pattern>,
    timeout: Duration,
) -> Captures {
    let pattern = pattern.into();
    match probe.receive(pattern.clone(), timeout).await {
        Ok(captures) => captures,
        Err(error) => panic!("expected a message matching {pattern:?}: {error}"),
    }
}

pub async fn with_timeout<F: Future>(timeout: Duration, future: F) -> Result<F::Output, ActorError> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| ReceiveTimeout { timeout }.into())
}

/// Polls `condition` every `interval` until it returns true.
pub async fn wait_for<F>(
    mut condition: F,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ActorError>
where
    F: FnMut() -> bool,
{
    with_timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(interval).await;
        }
    })
    .await
}

/// A server that keeps every info message and optionally forwards a copy.
///
/// `call(pid, "messages")` returns everything collected so far as a list.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    forward: Option<Pid>,
}

impl Collector {
    pub fn forwarding_to(pid: &Pid) -> Self {
        Self {
            forward: Some(pid.clone()),
        }
    }
}

#[async_trait]
impl GenServer for Collector {
    type State = Vec<Value>;

    async fn init(&mut self, _ctx: &mut Context) -> Result<Vec<Value>, ActorError> {
        Ok(Vec::new())
    }

    async fn handle_call(
        &mut self,
        request: Value,
        _from: Ref,
        state: &mut Vec<Value>,
        _ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        if request == "messages" {
            Ok(Value::List(state.clone()))
        } else {
            Ok(Value::Nil)
        }
    }

    async fn handle_info(
        &mut self,
        message: Value,
        state: &mut Vec<Value>,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        if let Some(to) = &self.forward {
            message::send(to, message.clone());
        }
        state.push(message);
        Ok(())
    }
}
