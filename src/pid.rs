//! # Process Identity
//!
//! [`Pid`] names one running actor instance. It carries the sending half of that actor's
//! mailbox, so holding a `Pid` is enough to deliver messages, but it never owns the actor.
//! Once the actor terminates its mailbox is gone and deliveries are silently dropped.
//!
//! [`Ref`] is a correlation token. The caller side of a `call` mints one per request and
//! background tasks are tagged with one, so a reply or completion can be matched to exactly
//! one outstanding operation.

use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

static NEXT_PID: AtomicU64 = AtomicU64::new(1);
static NEXT_REF: AtomicU64 = AtomicU64::new(1);

/// Non-owning handle to an actor's mailbox. Equality and hashing use the unique id only.
#[derive(Clone)]
pub struct Pid {
    id: u64,
    sender: mpsc::UnboundedSender<Value>,
}

impl Pid {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            id: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            sender,
        }
    }

    /// A pid with no mailbox behind it, used to identify background tasks.
    pub(crate) fn detached() -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self::new(sender)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the mailbox behind this pid still exists.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Enqueues without suspending. Returns `false` if the target has terminated.
    pub(crate) fn deliver(&self, message: Value) -> bool {
        self.sender.send(message).is_ok()
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.id)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}>", self.id)
    }
}

/// Unique, comparable correlation token. Only [`Ref::make`] creates new ones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(u64);

impl Ref {
    pub fn make() -> Self {
        Ref(NEXT_REF.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.0)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Ref<{}>", self.0)
    }
}
