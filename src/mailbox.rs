//! # Mailbox & Selective Receive
//!
//! Each actor owns exactly one [`Mailbox`]: an unbounded multi-producer, single-consumer FIFO.
//! Producers hold the actor's [`Pid`]; only the owner consumes.
//!
//! ## Selective receive
//!
//! [`Mailbox::receive`] takes an ordered list of patterns and consumes the *first queued
//! message* that matches *any* of them. Messages are examined in arrival order and, for each
//! message, patterns are tried in declaration order. Messages that match nothing are kept in a
//! save queue in their original order and are examined first by the next receive:
//!
//! ```text
//! queue: [A, B, C]     receive(C-pattern)  -> C
//! queue: [A, B]        receive(ANY)        -> A
//! queue: [B]           receive(ANY)        -> B
//! ```
//!
//! If nothing queued matches, the receive suspends until a new message arrives or the deadline
//! expires, in which case it fails with [`ReceiveTimeout`].
//!
//! [`Mailbox::receive_with`] pairs each pattern with a handler ([`Clause`]) and returns whatever
//! the chosen handler produces. Handlers may be plain closures or async blocks.

use crate::error::{ActorError, ReceiveTimeout};
use crate::pattern::{Captures, Pattern};
use crate::pid::Pid;
use crate::value::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// The result of a pattern-only receive: which pattern matched and what it bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
    pub clause: usize,
    pub captures: Captures,
}

pub struct Mailbox {
    pid: Pid,
    receiver: mpsc::UnboundedReceiver<Value>,
    saved: VecDeque<Value>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            pid: Pid::new(sender),
            receiver,
            saved: VecDeque::new(),
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Enqueues a message as if it had been sent to this mailbox's pid.
    pub fn put(&self, message: impl Into<Value>) {
        self.pid.deliver(message.into());
    }

    /// Number of messages skipped by earlier receives and still waiting.
    pub fn saved(&self) -> usize {
        self.saved.len()
    }

    /// Consumes the first message matching any of `patterns`.
    ///
    /// `timeout: None` waits forever.
    pub async fn receive(
        &mut self,
        patterns: &[Pattern],
        timeout: Option<Duration>,
    ) -> Result<Matched, ActorError> {
        if patterns.is_empty() {
            return Err(ActorError::usage("receive requires at least one pattern"));
        }

        if let Some((index, matched)) = self
            .saved
            .iter()
            .enumerate()
            .find_map(|(index, message)| first_match(patterns, message).map(|m| (index, m)))
        {
            self.saved.remove(index);
            return Ok(matched);
        }

        let deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        loop {
            let next = match deadline {
                Some((at, timeout)) => tokio::time::timeout_at(at, self.receiver.recv())
                    .await
                    .map_err(|_| ReceiveTimeout { timeout })?,
                None => self.receiver.recv().await,
            };
            let Some(message) = next else {
                return Err(ActorError::usage("mailbox closed"));
            };
            match first_match(patterns, &message) {
                Some(matched) => return Ok(matched),
                None => self.saved.push_back(message),
            }
        }
    }

    /// Consumes the first message matching any clause and runs that clause's handler.
    pub async fn receive_with<'a, R>(
        &mut self,
        clauses: Vec<Clause<'a, R>>,
        timeout: Option<Duration>,
    ) -> Result<R, ActorError>
    where
        R: Send + 'a,
    {
        let patterns: Vec<Pattern> = clauses.iter().map(|c| c.pattern.clone()).collect();
        let Matched { clause, captures } = self.receive(&patterns, timeout).await?;
        let clause = clauses
            .into_iter()
            .nth(clause)
            .ok_or_else(|| ActorError::usage("matched clause out of range"))?;
        Ok((clause.handler)(captures).await)
    }
}

fn first_match(patterns: &[Pattern], message: &Value) -> Option<Matched> {
    patterns
        .iter()
        .enumerate()
        .find_map(|(clause, pattern)| {
            pattern
                .matches(message)
                .map(|captures| Matched { clause, captures })
        })
}

type Handler<'a, R> =
    Box<dyn FnOnce(Captures) -> Pin<Box<dyn Future<Output = R> + Send + 'a>> + Send + 'a>;

/// A pattern paired with the handler that runs when it is selected.
pub struct Clause<'a, R> {
    pattern: Pattern,
    handler: Handler<'a, R>,
}

impl<'a, R: Send + 'a> Clause<'a, R> {
    /// A clause whose handler suspends.
    pub fn new<F, Fut>(pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: FnOnce(Captures) -> Fut + Send + 'a,
        Fut: Future<Output = R> + Send + 'a,
    {
        Self {
            pattern: pattern.into(),
            handler: Box::new(move |captures| Box::pin(handler(captures))),
        }
    }

    /// A clause whose handler returns immediately.
    pub fn sync<F>(pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: FnOnce(Captures) -> R + Send + 'a,
    {
        Self::new(pattern, move |captures| std::future::ready(handler(captures)))
    }
}
