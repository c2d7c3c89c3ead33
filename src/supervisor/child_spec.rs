//! # Child Specifications
//!
//! A [`ChildSpec`] is the immutable recipe a supervisor uses to (re)start one child: a unique
//! id, a factory producing a fresh actor value for every start, and a [`RestartType`].

use crate::actor::{self, Actor, ActorHandle, OnExit};
use crate::error::{ActorError, ExitReason};
use crate::gen_server::{GenServer, GenServerActor};
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which children a supervisor restarts when one of them exits and is eligible for restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartStrategy {
    /// Only the failed child.
    #[default]
    OneForOne,
    /// Every child.
    OneForAll,
    /// The failed child and every child started after it.
    RestForOne,
}

/// Whether a child is restarted at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartType {
    /// Always restarted.
    #[default]
    Permanent,
    /// Restarted only after an abnormal exit.
    Transient,
    /// Never restarted.
    Temporary,
}

impl RestartType {
    pub fn should_restart(self, reason: &ExitReason) -> bool {
        match self {
            RestartType::Permanent => true,
            RestartType::Transient => reason.is_abnormal(),
            RestartType::Temporary => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RestartType::Permanent => "permanent",
            RestartType::Transient => "transient",
            RestartType::Temporary => "temporary",
        }
    }
}

impl fmt::Display for RestartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartType {
    type Err = ActorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permanent" => Ok(RestartType::Permanent),
            "transient" => Ok(RestartType::Transient),
            "temporary" => Ok(RestartType::Temporary),
            other => Err(ActorError::usage(format!("unknown restart type '{other}'"))),
        }
    }
}

type StartFn = dyn Fn(&Scope, OnExit) -> Result<ActorHandle, ActorError> + Send + Sync;

#[derive(Clone)]
pub struct ChildSpec {
    id: String,
    restart: RestartType,
    start: Arc<StartFn>,
}

impl ChildSpec {
    /// A permanent child built by `factory` on every (re)start.
    ///
    /// Fails with a usage error if `id` is empty.
    pub fn new<A, F>(id: impl Into<String>, factory: F) -> Result<Self, ActorError>
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let id = id.into();
        if id.is_empty() {
            return Err(ActorError::usage("child id cannot be empty"));
        }
        Ok(Self {
            id,
            restart: RestartType::default(),
            start: Arc::new(move |scope: &Scope, on_exit: OnExit| {
                actor::start_link(scope, factory(), on_exit)
            }),
        })
    }

    /// Shorthand for a child running a [`GenServer`].
    pub fn gen_server<G, F>(id: impl Into<String>, factory: F) -> Result<Self, ActorError>
    where
        G: GenServer,
        F: Fn() -> G + Send + Sync + 'static,
    {
        Self::new(id, move || GenServerActor::new(factory()))
    }

    pub fn with_restart(mut self, restart: RestartType) -> Self {
        self.restart = restart;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn restart_type(&self) -> RestartType {
        self.restart
    }

    pub(crate) fn start(&self, scope: &Scope, on_exit: OnExit) -> Result<ActorHandle, ActorError> {
        (self.start)(scope, on_exit)
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("restart", &self.restart)
            .finish_non_exhaustive()
    }
}
