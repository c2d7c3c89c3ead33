//! # Supervisor Client
//!
//! Typed wrapper around the call protocol a supervisor answers.

use super::{RestartType, CHILD, COUNT_CHILDREN, RESTART_CHILD, TERMINATE_CHILD, WHICH_CHILDREN};
use crate::error::ActorError;
use crate::message::{self, DEFAULT_CALL_TIMEOUT};
use crate::pid::Pid;
use crate::value::Value;
use std::time::Duration;
use tracing::debug;

/// One entry of [`SupervisorClient::which_children`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChildInfo {
    pub id: String,
    pub pid: Pid,
    pub restart: RestartType,
}

/// ## SupervisorClient
///
/// Holds only the supervisor's pid, so it is cheap to clone and share. Every method is a
/// `call` and fails with [`ActorError::Timeout`] if the supervisor does not answer in time.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    pid: Pid,
    timeout: Duration,
}

impl SupervisorClient {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Children in start order.
    pub async fn which_children(&self) -> Result<Vec<ChildInfo>, ActorError> {
        let reply = message::call(&self.pid, WHICH_CHILDREN, self.timeout).await?;
        let entries = reply.as_list().ok_or_else(|| unexpected(&reply))?;
        entries
            .iter()
            .map(|entry| match entry.as_tuple() {
                Some([Value::Str(id), Value::Pid(pid), Value::Str(restart)]) => Ok(ChildInfo {
                    id: id.clone(),
                    pid: pid.clone(),
                    restart: restart.parse()?,
                }),
                _ => Err(unexpected(entry)),
            })
            .collect()
    }

    pub async fn count_children(&self) -> Result<usize, ActorError> {
        let reply = message::call(&self.pid, COUNT_CHILDREN, self.timeout).await?;
        reply
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| unexpected(&reply))
    }

    /// Stops a child without restarting it. Returns `false` if no child has that id.
    pub async fn terminate_child(&self, id: &str) -> Result<bool, ActorError> {
        debug!(supervisor = %self.pid, child = id, "terminate_child");
        let reply = message::call(&self.pid, (TERMINATE_CHILD, id), self.timeout).await?;
        reply.as_bool().ok_or_else(|| unexpected(&reply))
    }

    /// Cancels and restarts a child. Returns the new pid, or `None` if no child has that id.
    pub async fn restart_child(&self, id: &str) -> Result<Option<Pid>, ActorError> {
        debug!(supervisor = %self.pid, child = id, "restart_child");
        let reply = message::call(&self.pid, (RESTART_CHILD, id), self.timeout).await?;
        optional_pid(reply)
    }

    /// Current pid of a child.
    pub async fn child(&self, id: &str) -> Result<Option<Pid>, ActorError> {
        let reply = message::call(&self.pid, (CHILD, id), self.timeout).await?;
        optional_pid(reply)
    }
}

fn optional_pid(reply: Value) -> Result<Option<Pid>, ActorError> {
    match reply {
        Value::Nil => Ok(None),
        Value::Pid(pid) => Ok(Some(pid)),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(reply: &Value) -> ActorError {
    ActorError::Failed(format!("unexpected supervisor reply: {reply}"))
}
