//! # Actor Runtime
//!
//! This module runs the lifecycle shared by every actor, whether hand-written, a
//! [`GenServer`](crate::GenServer) or a [`Supervisor`](crate::Supervisor).
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> Initializing -> Running -> Terminating -> Terminated
//!            init()          run()*     terminate()    on_exit(pid, reason)
//! ```
//!
//! 1. [`start`] / [`start_link`] allocate the mailbox and a child [`Scope`] of the starter's
//!    scope, then spawn the actor as a tokio task.
//! 2. `init` produces the initial state. If it fails, or the scope is cancelled first, the
//!    actor exits without calling `terminate` (there is no state to clean up).
//! 3. `run` is called in a loop. Each call normally performs one receive and updates the state
//!    in place. The loop ends when the actor calls [`Context::stop`], `run` returns an error
//!    or panics, or the scope is cancelled.
//! 4. `terminate(reason, state)` runs once.
//! 5. The actor's own scope is shut down (its children and background tasks are cancelled and
//!    awaited), then the linker's `on_exit` fires.
//!
//! ## Exit reasons
//!
//! | How the actor stopped | Reason |
//! |-----------------------|--------|
//! | `ctx.stop(ExitReason::Normal)` | `"normal"` |
//! | scope cancelled | `"cancelled"` |
//! | `init`/`run` returned `Err(e)` | `"error: <e>"` |
//! | panic | `"error: panicked: <payload>"` |
//!
//! Failures never reach unrelated callers; they only become exit reasons.
//!
//! ## Example
//!
//! ```rust
//! use actor_otp::{actor, message, Actor, ActorError, Context, ExitReason, Pattern, Scope, ANY};
//! use async_trait::async_trait;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Actor for Echo {
//!     type State = ();
//!
//!     async fn init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
//!         Ok(())
//!     }
//!
//!     async fn run(&mut self, _state: &mut (), ctx: &mut Context) -> Result<(), ActorError> {
//!         let matched = ctx.receive(&[Pattern::from(("echo", actor_otp::Kind::Pid, ANY))], None).await?;
//!         let [to, body] = matched.captures.into_array().ok_or_else(|| ActorError::usage("shape"))?;
//!         if let Some(to) = to.as_pid() {
//!             message::send(to, body);
//!         }
//!         ctx.stop(ExitReason::Normal);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let scope = Scope::new();
//!     let handle = actor::start_link(&scope, Echo, |_, _| {}).unwrap();
//!     let mut probe = actor_otp::testing::Probe::new();
//!     message::send(handle.pid(), ("echo", probe.pid(), "hi"));
//!     let got = probe.next(std::time::Duration::from_secs(1)).await.unwrap();
//!     assert_eq!(got, "hi");
//!     assert_eq!(handle.join().await, ExitReason::Normal);
//! }
//! ```

use crate::error::{ActorError, ExitReason};
use crate::mailbox::{Clause, Mailbox, Matched};
use crate::message;
use crate::pattern::Pattern;
use crate::pid::{Pid, Ref};
use crate::scope::Scope;
use crate::value::Value;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Callback fired once with the actor's pid and exit reason after it has fully stopped.
pub type OnExit = Box<dyn FnOnce(Pid, ExitReason) + Send>;

/// The contract every actor implements.
///
/// Handlers get the state by `&mut` so it survives cancellation of a suspended `run` and is
/// still available to `terminate`.
#[async_trait]
pub trait Actor: Send + 'static {
    type State: Send + 'static;

    /// Name used in logs. Defaults to the type name without its module path.
    fn name(&self) -> &'static str {
        type_label::<Self>()
    }

    async fn init(&mut self, ctx: &mut Context) -> Result<Self::State, ActorError>;

    /// One step of the actor's loop. Usually performs exactly one receive.
    async fn run(&mut self, state: &mut Self::State, ctx: &mut Context) -> Result<(), ActorError>;

    async fn terminate(
        &mut self,
        _reason: &ExitReason,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) {
    }
}

/// What an actor can do to itself: receive, call out, stop, and spawn into its own scope.
pub struct Context {
    mailbox: Mailbox,
    scope: Scope,
    stop: Option<ExitReason>,
    pub(crate) tasks: HashMap<Pid, Ref>,
}

impl Context {
    fn new(mailbox: Mailbox, scope: Scope) -> Self {
        Self {
            mailbox,
            scope,
            stop: None,
            tasks: HashMap::new(),
        }
    }

    pub fn pid(&self) -> &Pid {
        self.mailbox.pid()
    }

    /// The actor's own scope. Actors started in it are cancelled when this actor exits.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub async fn receive(
        &mut self,
        patterns: &[Pattern],
        timeout: Option<Duration>,
    ) -> Result<Matched, ActorError> {
        self.mailbox.receive(patterns, timeout).await
    }

    pub async fn receive_with<'a, R: Send + 'a>(
        &mut self,
        clauses: Vec<Clause<'a, R>>,
        timeout: Option<Duration>,
    ) -> Result<R, ActorError> {
        self.mailbox.receive_with(clauses, timeout).await
    }

    /// Calls another actor, waiting for the reply on this actor's own mailbox.
    ///
    /// Unrelated messages that arrive meanwhile stay queued for later receives.
    pub async fn call(
        &mut self,
        pid: &Pid,
        request: impl Into<Value> + Send,
        timeout: Duration,
    ) -> Result<Value, ActorError> {
        message::call_via(&mut self.mailbox, pid, request.into(), timeout).await
    }

    /// Ends the run loop after the current step with the given reason.
    pub fn stop(&mut self, reason: ExitReason) {
        self.stop = Some(reason);
    }

    fn take_stop(&mut self) -> Option<ExitReason> {
        self.stop.take()
    }
}

/// Owner-side handle of a linked actor.
pub struct ActorHandle {
    pid: Pid,
    scope: Scope,
    join: JoinHandle<ExitReason>,
}

impl ActorHandle {
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Cancels the actor's scope. The actor runs `terminate` with `"cancelled"`.
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the actor has stopped and its exit notification has fired.
    pub async fn join(self) -> ExitReason {
        self.join
            .await
            .unwrap_or_else(ExitReason::from_join_error)
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("pid", &self.pid)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Starts an unlinked actor in `scope`.
pub fn start<A: Actor>(scope: &Scope, actor: A) -> Result<Pid, ActorError> {
    spawn(scope, actor, None).map(|handle| handle.pid)
}

/// Starts an actor in `scope` and calls `on_exit` once it has stopped.
pub fn start_link<A, F>(scope: &Scope, actor: A, on_exit: F) -> Result<ActorHandle, ActorError>
where
    A: Actor,
    F: FnOnce(Pid, ExitReason) + Send + 'static,
{
    spawn(scope, actor, Some(Box::new(on_exit)))
}

fn spawn<A: Actor>(
    parent: &Scope,
    actor: A,
    on_exit: Option<OnExit>,
) -> Result<ActorHandle, ActorError> {
    let mailbox = Mailbox::new();
    let pid = mailbox.pid().clone();
    let own = parent.child();
    let name = actor.name();
    let ctx = Context::new(mailbox, own.clone());

    let exited = pid.clone();
    let children = own.clone();
    let join = parent.spawn(async move {
        let reason = tokio::spawn(lifecycle(actor, ctx))
            .await
            .unwrap_or_else(ExitReason::from_join_error);
        children.shutdown().await;

        if reason.is_abnormal() {
            warn!(actor = name, pid = %exited, %reason, "Actor exited");
        } else {
            info!(actor = name, pid = %exited, %reason, "Actor exited");
        }
        if let Some(on_exit) = on_exit {
            on_exit(exited, reason.clone());
        }
        reason
    })?;

    debug!(actor = name, %pid, "Actor spawned");
    Ok(ActorHandle {
        pid,
        scope: own,
        join,
    })
}

async fn lifecycle<A: Actor>(mut actor: A, mut ctx: Context) -> ExitReason {
    let name = actor.name();
    let scope = ctx.scope().clone();

    let init = tokio::select! {
        biased;
        _ = scope.cancelled() => return ExitReason::Cancelled,
        init = actor.init(&mut ctx) => init,
    };
    let mut state = match init {
        Ok(state) => state,
        Err(error) => {
            warn!(actor = name, pid = %ctx.pid(), %error, "init failed");
            return error.into();
        }
    };
    info!(actor = name, pid = %ctx.pid(), "Actor started");

    let reason = loop {
        if let Some(reason) = ctx.take_stop() {
            break reason;
        }
        tokio::select! {
            biased;
            _ = scope.cancelled() => break ExitReason::Cancelled,
            step = AssertUnwindSafe(actor.run(&mut state, &mut ctx)).catch_unwind() => match step {
                Ok(Ok(())) => {}
                Ok(Err(error)) => break error.into(),
                Err(payload) => {
                    let reason = ExitReason::from_panic(payload);
                    error!(actor = name, pid = %ctx.pid(), %reason, "run panicked");
                    break reason;
                }
            }
        }
    };

    debug!(actor = name, pid = %ctx.pid(), %reason, "terminate");
    actor.terminate(&reason, &mut state, &mut ctx).await;
    reason
}

/// `a::b::Type<c::D>` becomes `Type`.
pub(crate) fn type_label<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
