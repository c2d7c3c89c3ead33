//! # Supervisor Engine
//!
//! A supervisor is an actor that starts a fixed list of children, watches them, and restarts
//! them according to a [`RestartStrategy`] and each child's [`RestartType`].
//!
//! ## Exit handling
//!
//! Every child is linked with an exit callback that posts `("$child_down", id, pid, reason)`
//! into the supervisor's own mailbox, so exits are handled one at a time like any other
//! message. The runtime posts the [`ExitReason`] itself; a reason given as a string such as
//! `"error: boom"` is parsed from its display form. On a down notification the supervisor:
//!
//! 1. ignores it if the id is unknown or the pid is not the one currently tracked for that id
//!    (a stale notification from an instance that was already replaced);
//! 2. drops the child if its restart type says no restart for this reason;
//! 3. records the restart in a sliding window of `max_seconds` and, if more than
//!    `max_restarts` restarts fall inside the window, exits with
//!    [`ExitReason::MaxRestartsExceeded`] so its own supervisor can react;
//! 4. otherwise stops the children selected by the strategy, last started first, waits until
//!    each has exited, and starts fresh instances in start order.
//!
//! ## Configuration
//!
//! [`SupervisorFlags`] can be deserialized from host configuration:
//!
//! ```rust
//! use actor_otp::{RestartStrategy, SupervisorFlags};
//!
//! let flags: SupervisorFlags = serde_json::from_str(r#"{"strategy": "rest_for_one"}"#).unwrap();
//! assert_eq!(flags.strategy, RestartStrategy::RestForOne);
//! assert_eq!(flags.max_restarts, 3);
//! ```
//!
//! ## Administration
//!
//! Supervisors answer calls (`which_children`, `count_children`, `terminate_child`,
//! `restart_child`, `child`). `terminate_child` and `restart_child` reply only after the old
//! instance has exited. Use [`SupervisorClient`] rather than building the requests by hand.

mod child_spec;
mod client;

pub use child_spec::{ChildSpec, RestartStrategy, RestartType};
pub use client::{ChildInfo, SupervisorClient};

use crate::actor::{self, type_label, Actor, ActorHandle, Context};
use crate::error::{ActorError, ExitReason};
use crate::mailbox::Matched;
use crate::message::{self, CALL, CHILD_DOWN};
use crate::pattern::{Pattern, ANY};
use crate::pid::Pid;
use crate::scope::Scope;
use crate::value::{Kind, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub(crate) const WHICH_CHILDREN: &str = "which_children";
pub(crate) const COUNT_CHILDREN: &str = "count_children";
pub(crate) const TERMINATE_CHILD: &str = "terminate_child";
pub(crate) const RESTART_CHILD: &str = "restart_child";
pub(crate) const CHILD: &str = "child";

/// Strategy and restart intensity of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorFlags {
    pub strategy: RestartStrategy,
    /// Restarts tolerated within `max_seconds`.
    pub max_restarts: usize,
    pub max_seconds: f64,
}

impl Default for SupervisorFlags {
    fn default() -> Self {
        Self {
            strategy: RestartStrategy::OneForOne,
            max_restarts: 3,
            max_seconds: 5.0,
        }
    }
}

impl SupervisorFlags {
    pub fn new(strategy: RestartStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_intensity(mut self, max_restarts: usize, max_seconds: f64) -> Self {
        self.max_restarts = max_restarts;
        self.max_seconds = max_seconds;
        self
    }

    /// The restart-history window. Non-positive or NaN values mean an empty window.
    pub fn window(&self) -> Duration {
        if self.max_seconds > 0.0 {
            Duration::try_from_secs_f64(self.max_seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

/// The contract of a supervisor: which children to run and how to restart them.
pub trait Supervisor: Send + Sized + 'static {
    fn child_specs(&self) -> Result<Vec<ChildSpec>, ActorError>;

    fn flags(&self) -> SupervisorFlags {
        SupervisorFlags::default()
    }

    fn name(&self) -> &'static str {
        type_label::<Self>()
    }

    fn start(self, scope: &Scope) -> Result<Pid, ActorError> {
        actor::start(scope, SupervisorActor::new(self))
    }

    fn start_link<F>(self, scope: &Scope, on_exit: F) -> Result<ActorHandle, ActorError>
    where
        F: FnOnce(Pid, ExitReason) + Send + 'static,
    {
        actor::start_link(scope, SupervisorActor::new(self), on_exit)
    }
}

impl ChildSpec {
    /// Shorthand for a child that is itself a supervisor.
    pub fn supervisor<S, F>(id: impl Into<String>, factory: F) -> Result<Self, ActorError>
    where
        S: Supervisor,
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self::new(id, move || SupervisorActor::new(factory()))
    }
}

/// Runs a [`Supervisor`] as an [`Actor`].
pub struct SupervisorActor<S> {
    supervisor: S,
    flags: SupervisorFlags,
    patterns: Vec<Pattern>,
}

impl<S: Supervisor> SupervisorActor<S> {
    pub fn new(supervisor: S) -> Self {
        let flags = supervisor.flags();
        Self {
            supervisor,
            flags,
            patterns: vec![
                Pattern::from((CHILD_DOWN, Kind::Str, Kind::Pid, ANY)),
                Pattern::from((CALL, Kind::Ref, Kind::Pid, ANY)),
                ANY,
            ],
        }
    }
}

/// Children in start order plus the restart window.
pub struct SupervisorState {
    children: Vec<ChildRecord>,
    restart_history: RestartHistory,
}

struct ChildRecord {
    spec: ChildSpec,
    handle: ActorHandle,
}

#[derive(Debug, Default)]
struct RestartHistory(VecDeque<Instant>);

impl RestartHistory {
    /// Records a restart at `now`, prunes entries older than the window and reports whether
    /// the restart is still within budget.
    fn record(&mut self, now: Instant, flags: &SupervisorFlags) -> bool {
        self.0.push_back(now);
        let window = flags.window();
        while let Some(&oldest) = self.0.front() {
            if now.saturating_duration_since(oldest) > window {
                self.0.pop_front();
            } else {
                break;
            }
        }
        self.0.len() <= flags.max_restarts
    }
}

#[async_trait]
impl<S: Supervisor> Actor for SupervisorActor<S> {
    type State = SupervisorState;

    fn name(&self) -> &'static str {
        self.supervisor.name()
    }

    async fn init(&mut self, ctx: &mut Context) -> Result<SupervisorState, ActorError> {
        let specs = self.supervisor.child_specs()?;
        {
            let mut seen = HashSet::new();
            if let Some(duplicate) = specs.iter().find(|spec| !seen.insert(spec.id())) {
                return Err(ActorError::usage(format!(
                    "duplicate child id '{}'",
                    duplicate.id()
                )));
            }
        }

        let mut children = Vec::with_capacity(specs.len());
        for spec in specs {
            let handle = start_child(ctx, &spec)?;
            debug!(supervisor = self.name(), child = spec.id(), pid = %handle.pid(), "Child started");
            children.push(ChildRecord { spec, handle });
        }
        info!(
            supervisor = self.name(),
            children = children.len(),
            strategy = ?self.flags.strategy,
            "Supervisor started"
        );

        Ok(SupervisorState {
            children,
            restart_history: RestartHistory::default(),
        })
    }

    async fn run(&mut self, state: &mut SupervisorState, ctx: &mut Context) -> Result<(), ActorError> {
        let Matched { clause, captures } = ctx.receive(&self.patterns, None).await?;
        let mut bound = captures.into_iter();
        let mut next = || bound.next().ok_or_else(malformed);

        match clause {
            0 => {
                let id = next()?;
                let pid = next()?;
                let reason = next()?;
                let (Some(id), Some(pid)) = (id.as_str(), pid.as_pid()) else {
                    return Err(malformed());
                };
                let reason = exit_reason(reason);
                self.handle_down(id, pid, reason, state, ctx).await
            }
            1 => {
                let tag = next()?.as_token().ok_or_else(malformed)?;
                let from = next()?.as_pid().cloned().ok_or_else(malformed)?;
                let request = next()?;
                let reply = self.handle_admin(&request, state, ctx).await?;
                message::reply(&from, tag, reply);
                Ok(())
            }
            _ => {
                let unexpected = next()?;
                debug!(supervisor = self.name(), message = %unexpected, "Discarding unexpected message");
                Ok(())
            }
        }
    }

    async fn terminate(&mut self, reason: &ExitReason, state: &mut SupervisorState, _ctx: &mut Context) {
        // Children live in this supervisor's scope and are shut down with it.
        info!(
            supervisor = self.name(),
            children = state.children.len(),
            %reason,
            "Supervisor stopping"
        );
    }
}

impl<S: Supervisor> SupervisorActor<S> {
    async fn handle_down(
        &mut self,
        id: &str,
        pid: &Pid,
        reason: ExitReason,
        state: &mut SupervisorState,
        ctx: &mut Context,
    ) -> Result<(), ActorError> {
        let name = self.name();
        let Some(index) = position(state, id) else {
            debug!(supervisor = name, child = id, "Down notification for unknown child");
            return Ok(());
        };
        if state.children[index].handle.pid() != pid {
            debug!(supervisor = name, child = id, %pid, "Stale down notification");
            return Ok(());
        }

        let restart = state.children[index].spec.restart_type();
        if !restart.should_restart(&reason) {
            info!(supervisor = name, child = id, %restart, %reason, "Child exited, not restarting");
            state.children.remove(index);
            return Ok(());
        }

        if !state.restart_history.record(Instant::now(), &self.flags) {
            error!(
                supervisor = name,
                child = id,
                max_restarts = self.flags.max_restarts,
                max_seconds = self.flags.max_seconds,
                "Restart intensity exceeded"
            );
            return Err(ActorError::MaxRestartsExceeded {
                child: id.to_string(),
                max_restarts: self.flags.max_restarts,
                max_seconds: self.flags.max_seconds,
            });
        }

        let targets = self.restart_targets(index, state.children.len());
        warn!(
            supervisor = name,
            child = id,
            %reason,
            strategy = ?self.flags.strategy,
            restarting = targets.len(),
            "Restarting"
        );
        restart_range(ctx, state, targets).await
    }

    fn restart_targets(&self, failed: usize, len: usize) -> Range<usize> {
        match self.flags.strategy {
            RestartStrategy::OneForOne => failed..failed + 1,
            RestartStrategy::OneForAll => 0..len,
            RestartStrategy::RestForOne => failed..len,
        }
    }

    async fn handle_admin(
        &mut self,
        request: &Value,
        state: &mut SupervisorState,
        ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        let (command, id) = match request {
            Value::Str(command) => (command.as_str(), None),
            Value::Tuple(items) => match items.as_slice() {
                [Value::Str(command), Value::Str(id)] => (command.as_str(), Some(id.as_str())),
                _ => ("", None),
            },
            _ => ("", None),
        };

        let reply = match (command, id) {
            (WHICH_CHILDREN, None) => Value::list(state.children.iter().map(|child| {
                Value::from((
                    child.spec.id(),
                    child.handle.pid(),
                    child.spec.restart_type().as_str(),
                ))
            })),
            (COUNT_CHILDREN, None) => {
                Value::Int(i64::try_from(state.children.len()).unwrap_or(i64::MAX))
            }
            (TERMINATE_CHILD, Some(id)) => match position(state, id) {
                Some(index) => {
                    let child = state.children.remove(index);
                    child.handle.cancel();
                    child.handle.join().await;
                    info!(supervisor = self.name(), child = id, "Child terminated");
                    Value::Bool(true)
                }
                None => Value::Bool(false),
            },
            (RESTART_CHILD, Some(id)) => match position(state, id) {
                Some(index) => {
                    restart_range(ctx, state, index..index + 1).await?;
                    info!(supervisor = self.name(), child = id, "Child restarted on request");
                    Value::from(state.children[index].handle.pid())
                }
                None => Value::Nil,
            },
            (CHILD, Some(id)) => position(state, id)
                .map(|index| Value::from(state.children[index].handle.pid()))
                .unwrap_or(Value::Nil),
            _ => {
                warn!(supervisor = self.name(), %request, "Unknown supervisor request");
                Value::Nil
            }
        };
        Ok(reply)
    }
}

fn position(state: &SupervisorState, id: &str) -> Option<usize> {
    state.children.iter().position(|child| child.spec.id() == id)
}

/// Stops the selected children (last started first) and waits for them, then starts fresh
/// instances in the original order.
async fn restart_range(
    ctx: &mut Context,
    state: &mut SupervisorState,
    targets: Range<usize>,
) -> Result<(), ActorError> {
    let start = targets.start;
    let stopping: Vec<ChildRecord> = state.children.drain(targets).collect();
    for child in stopping.iter().rev() {
        child.handle.cancel();
    }
    let mut specs = Vec::with_capacity(stopping.len());
    for ChildRecord { spec, handle } in stopping.into_iter().rev() {
        handle.join().await;
        specs.push(spec);
    }
    specs.reverse();

    let mut fresh = Vec::with_capacity(specs.len());
    for spec in specs {
        let handle = start_child(ctx, &spec)?;
        debug!(child = spec.id(), pid = %handle.pid(), "Child restarted");
        fresh.push(ChildRecord { spec, handle });
    }
    state.children.splice(start..start, fresh);
    Ok(())
}

fn start_child(ctx: &Context, spec: &ChildSpec) -> Result<ActorHandle, ActorError> {
    let supervisor = ctx.pid().clone();
    let id = spec.id().to_string();
    spec.start(
        ctx.scope(),
        Box::new(move |pid, reason| {
            message::send(&supervisor, (CHILD_DOWN, id, pid, Value::opaque(reason)));
        }),
    )
}

/// Reasons posted by the runtime are `ExitReason` values; a string reason is parsed from its
/// display form.
fn exit_reason(reason: Value) -> ExitReason {
    if let Some(reason) = reason.downcast_ref::<ExitReason>() {
        return reason.clone();
    }
    match reason.as_str() {
        Some(text) => text.parse().unwrap_or_else(|never| match never {}),
        None => ExitReason::error(reason.to_string()),
    }
}

fn malformed() -> ActorError {
    ActorError::usage("malformed supervisor message")
}
