//! # Messaging Primitives
//!
//! The three ways to talk to an actor, all built on one non-blocking enqueue:
//!
//! - [`send`]: fire-and-forget. Never suspends, never fails, even if the target is gone.
//! - [`cast`]: `send(pid, ("$cast", request))`, handled by `GenServer::handle_cast`.
//! - [`call`]: sends `("$call", ref, from, request)` and selectively receives the matching
//!   `("$reply", ref, reply)`. Only the caller gives up on timeout; the callee may still
//!   process the request later.
//!
//! The tags are public so hand-written actors can speak the same protocol.

use crate::error::ActorError;
use crate::mailbox::Mailbox;
use crate::pattern::{Pattern, ANY};
use crate::pid::{Pid, Ref};
use crate::value::Value;
use std::time::Duration;
use tracing::{debug, trace};

pub const CALL: &str = "$call";
pub const CAST: &str = "$cast";
pub const REPLY: &str = "$reply";
pub const TASK_SUCCESS: &str = "$task_success";
pub const TASK_FAILURE: &str = "$task_failure";
/// Posted by the runtime into a supervisor's mailbox when a linked child exits.
pub const CHILD_DOWN: &str = "$child_down";

/// Default deadline used by typed clients.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub fn send(pid: &Pid, message: impl Into<Value>) {
    if !pid.deliver(message.into()) {
        trace!(pid = %pid, "Dropped message for terminated actor");
    }
}

pub fn cast(pid: &Pid, request: impl Into<Value>) {
    send(pid, (CAST, request.into()));
}

/// Synchronous request/reply from outside any actor.
///
/// A temporary mailbox stands in for the caller. Inside an actor use
/// `Context::call`, which waits on the actor's own mailbox.
pub async fn call(
    pid: &Pid,
    request: impl Into<Value>,
    timeout: Duration,
) -> Result<Value, ActorError> {
    let mut mailbox = Mailbox::new();
    call_via(&mut mailbox, pid, request.into(), timeout).await
}

pub(crate) async fn call_via(
    mailbox: &mut Mailbox,
    pid: &Pid,
    request: Value,
    timeout: Duration,
) -> Result<Value, ActorError> {
    let tag = Ref::make();
    debug!(to = %pid, %tag, %request, "call");
    send(pid, (CALL, tag, mailbox.pid(), request));

    let matched = mailbox
        .receive(&[Pattern::from((REPLY, tag, ANY))], Some(timeout))
        .await?;
    let [reply] = matched
        .captures
        .into_array()
        .ok_or_else(|| ActorError::usage("malformed reply"))?;
    Ok(reply)
}

/// Answers a `$call` that was received by hand.
pub fn reply(to: &Pid, tag: Ref, value: impl Into<Value>) {
    send(to, (REPLY, tag, value.into()));
}
