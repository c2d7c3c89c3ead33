//! # GenServer Behavior
//!
//! A [`GenServer`] is an actor whose `run` loop is fixed: it receives one message and
//! dispatches it to a handler.
//!
//! | Message | Handler |
//! |---------|---------|
//! | `("$call", ref, from, request)` | [`GenServer::handle_call`], reply sent as `("$reply", ref, reply)` |
//! | `("$cast", request)` | [`GenServer::handle_cast`] |
//! | `("$task_success", task_pid, result)` | [`GenServer::handle_task_success`] |
//! | `("$task_failure", task_pid, reason)` | [`GenServer::handle_task_failure`] |
//! | anything else | [`GenServer::handle_info`] |
//!
//! Only `init` is required. Unhandled casts and info messages are dropped; an unhandled call
//! fails the server with [`ActorError::NotImplemented`].
//!
//! ## Background tasks
//!
//! [`Context::start_background_task`] runs a future next to the server, inside the server's
//! scope, and posts exactly one completion message for it. Errors, panics and cancellation
//! through the returned [`TaskHandle`] are all reported as failures. Completions whose task pid
//! is not registered with this server (for example forged ones) are delivered to `handle_info`.
//!
//! ```rust
//! use actor_otp::{message, ActorError, Context, GenServer, Ref, Scope, Value};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Counter;
//!
//! #[async_trait]
//! impl GenServer for Counter {
//!     type State = i64;
//!
//!     async fn init(&mut self, _ctx: &mut Context) -> Result<i64, ActorError> {
//!         Ok(0)
//!     }
//!
//!     async fn handle_call(
//!         &mut self,
//!         request: Value,
//!         _from: Ref,
//!         state: &mut i64,
//!         _ctx: &mut Context,
//!     ) -> Result<Value, ActorError> {
//!         if request == "incr" {
//!             *state += 1;
//!         }
//!         Ok(Value::Int(*state))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let scope = Scope::new();
//!     let pid = Counter.start(&scope).unwrap();
//!     let reply = message::call(&pid, "incr", Duration::from_secs(1)).await.unwrap();
//!     assert_eq!(reply, Value::Int(1));
//!     scope.shutdown().await;
//! }
//! ```

use crate::actor::{self, type_label, Actor, ActorHandle, Context};
use crate::error::{ActorError, ExitReason};
use crate::mailbox::Matched;
use crate::message::{self, CALL, CAST, REPLY, TASK_FAILURE, TASK_SUCCESS};
use crate::pattern::{Pattern, ANY};
use crate::pid::{Pid, Ref};
use crate::scope::Scope;
use crate::value::{Kind, Value};
use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, warn};

#[async_trait]
pub trait GenServer: Send + Sized + 'static {
    type State: Send + 'static;

    fn name(&self) -> &'static str {
        type_label::<Self>()
    }

    async fn init(&mut self, ctx: &mut Context) -> Result<Self::State, ActorError>;

    /// Answers a synchronous request. The returned value is sent back to the caller.
    async fn handle_call(
        &mut self,
        _request: Value,
        _from: Ref,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        Err(ActorError::NotImplemented {
            behavior: self.name(),
        })
    }

    async fn handle_cast(
        &mut self,
        _request: Value,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle_info(
        &mut self,
        _message: Value,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle_task_success(
        &mut self,
        _tag: Ref,
        _task: Pid,
        _result: Value,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle_task_failure(
        &mut self,
        _tag: Ref,
        _task: Pid,
        _reason: String,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    async fn terminate(
        &mut self,
        _reason: &ExitReason,
        _state: &mut Self::State,
        _ctx: &mut Context,
    ) {
    }

    fn start(self, scope: &Scope) -> Result<Pid, ActorError> {
        actor::start(scope, GenServerActor::new(self))
    }

    fn start_link<F>(self, scope: &Scope, on_exit: F) -> Result<ActorHandle, ActorError>
    where
        F: FnOnce(Pid, ExitReason) + Send + 'static,
    {
        actor::start_link(scope, GenServerActor::new(self), on_exit)
    }
}

/// Runs a [`GenServer`] as an [`Actor`]. Mostly useful in a [`ChildSpec`](crate::ChildSpec).
pub struct GenServerActor<G> {
    server: G,
    patterns: Vec<Pattern>,
}

impl<G: GenServer> GenServerActor<G> {
    pub fn new(server: G) -> Self {
        Self {
            server,
            patterns: vec![
                Pattern::from((CALL, Kind::Ref, Kind::Pid, ANY)),
                Pattern::from((CAST, ANY)),
                Pattern::from((TASK_SUCCESS, Kind::Pid, ANY)),
                Pattern::from((TASK_FAILURE, Kind::Pid, ANY)),
                ANY,
            ],
        }
    }
}

#[async_trait]
impl<G: GenServer> Actor for GenServerActor<G> {
    type State = G::State;

    fn name(&self) -> &'static str {
        self.server.name()
    }

    async fn init(&mut self, ctx: &mut Context) -> Result<G::State, ActorError> {
        self.server.init(ctx).await
    }

    async fn run(&mut self, state: &mut G::State, ctx: &mut Context) -> Result<(), ActorError> {
        let Matched { clause, captures } = ctx.receive(&self.patterns, None).await?;
        let mut bound = captures.into_iter();
        let mut next = || bound.next().ok_or_else(malformed);

        match clause {
            0 => {
                let tag = next()?.as_token().ok_or_else(malformed)?;
                let from = next()?.as_pid().cloned().ok_or_else(malformed)?;
                let request = next()?;
                debug!(server = self.server.name(), %tag, %request, "handle_call");
                let reply = self.server.handle_call(request, tag, state, ctx).await?;
                message::send(&from, (REPLY, tag, reply));
                Ok(())
            }
            1 => self.server.handle_cast(next()?, state, ctx).await,
            2 | 3 => {
                let task = next()?.as_pid().cloned().ok_or_else(malformed)?;
                let outcome = next()?;
                let Some(tag) = ctx.tasks.remove(&task) else {
                    let tag = if clause == 2 { TASK_SUCCESS } else { TASK_FAILURE };
                    debug!(server = self.server.name(), %task, "Completion from unknown task");
                    return self
                        .server
                        .handle_info(Value::from((tag, task, outcome)), state, ctx)
                        .await;
                };
                if clause == 2 {
                    self.server
                        .handle_task_success(tag, task, outcome, state, ctx)
                        .await
                } else {
                    let reason = match outcome {
                        Value::Str(reason) => reason,
                        other => other.to_string(),
                    };
                    self.server
                        .handle_task_failure(tag, task, reason, state, ctx)
                        .await
                }
            }
            _ => self.server.handle_info(next()?, state, ctx).await,
        }
    }

    async fn terminate(&mut self, reason: &ExitReason, state: &mut G::State, ctx: &mut Context) {
        self.server.terminate(reason, state, ctx).await;
    }
}

fn malformed() -> ActorError {
    ActorError::usage("malformed protocol message")
}

/// Control over one background task started by a server.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pid: Pid,
    scope: Scope,
}

impl TaskHandle {
    /// Identifies the task in its completion message.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Aborts the task. The server receives a `"cancelled"` failure for it.
    pub fn cancel(&self) {
        self.scope.cancel();
    }
}

impl Context {
    /// Runs `work` inside this actor's scope and posts one completion message when it ends.
    ///
    /// Pass `tag` to reuse a caller-chosen [`Ref`]; otherwise a fresh one is minted.
    pub fn start_background_task<F>(
        &mut self,
        work: F,
        tag: Option<Ref>,
    ) -> Result<(Ref, TaskHandle), ActorError>
    where
        F: Future<Output = Result<Value, ActorError>> + Send + 'static,
    {
        let tag = tag.unwrap_or_else(Ref::make);
        let task = Pid::detached();
        let scope = self.scope().child();
        let owner = self.pid().clone();

        let reported = task.clone();
        let watched = scope.clone();
        self.scope().spawn(async move {
            let mut running = tokio::spawn(work);
            let joined = tokio::select! {
                joined = &mut running => Some(joined),
                _ = watched.cancelled() => None,
            };
            let completion = match joined {
                Some(Ok(Ok(result))) => Value::from((TASK_SUCCESS, &reported, result)),
                Some(Ok(Err(error))) => {
                    let reason = ExitReason::from(error);
                    warn!(task = %reported, %reason, "Background task failed");
                    Value::from((TASK_FAILURE, &reported, reason.to_string()))
                }
                Some(Err(join_error)) => {
                    let reason = ExitReason::from_join_error(join_error);
                    warn!(task = %reported, %reason, "Background task failed");
                    Value::from((TASK_FAILURE, &reported, reason.to_string()))
                }
                None => {
                    running.abort();
                    debug!(task = %reported, "Background task cancelled");
                    Value::from((TASK_FAILURE, &reported, ExitReason::Cancelled.to_string()))
                }
            };
            message::send(&owner, completion);
        })?;

        self.tasks.insert(task.clone(), tag);
        debug!(owner = %self.pid(), %task, %tag, "Background task started");
        Ok((tag, TaskHandle { pid: task, scope }))
    }
}
