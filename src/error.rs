//! # Runtime Errors & Exit Reasons
//!
//! This module defines the failure taxonomy shared by every part of the runtime.
//!
//! - [`ActorError`] is what operations return: receive/call timeouts, usage errors,
//!   unimplemented behaviors, application failures, and a supervisor's restart-limit breach.
//! - [`ExitReason`] is what a linker observes when an actor stops. Failures inside an
//!   actor never surface as errors to unrelated callers; they become exit reasons.

use std::any::Any;
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinError;

/// No message matched the supplied patterns before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No matching message within {}s", .timeout.as_secs_f64())]
pub struct ReceiveTimeout {
    pub timeout: Duration,
}

/// Errors that can occur within the actor runtime.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// A `receive` or `call` deadline expired. Recoverable; the caller decides whether to retry.
    #[error(transparent)]
    Timeout(#[from] ReceiveTimeout),

    /// The runtime was used incorrectly (programmer error, never retried).
    #[error("usage error: {0}")]
    Usage(String),

    /// A behavior was asked to answer a call without overriding `handle_call`.
    #[error("{behavior}.handle_call/3 not implemented")]
    NotImplemented { behavior: &'static str },

    /// A supervisor restarted its children more often than its intensity budget allows.
    #[error(
        "MaxRestartsExceeded: child {child} exceeded restart limit \
         ({max_restarts} restarts in {max_seconds}s)"
    )]
    MaxRestartsExceeded {
        child: String,
        max_restarts: usize,
        max_seconds: f64,
    },

    /// Any application-level failure raised from `init`, `run` or a handler.
    #[error("{0}")]
    Failed(String),
}

impl ActorError {
    pub fn usage(message: impl Into<String>) -> Self {
        ActorError::Usage(message.into())
    }

    /// Wraps any displayable error as an application failure.
    pub fn failed(error: impl Display) -> Self {
        ActorError::Failed(error.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ActorError::Timeout(_))
    }
}

/// Why an actor stopped.
///
/// The `Display` form is the string reason handed to linkers: `"normal"`, `"cancelled"`,
/// or `"error: <description>"`. A supervisor that blew its restart budget exits with
/// [`ExitReason::MaxRestartsExceeded`], which renders as an error too, so an outer
/// supervisor treats it like any other abnormal child exit.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    Normal,
    Cancelled,
    Error(String),
    MaxRestartsExceeded(String),
}

impl ExitReason {
    pub fn error(description: impl Into<String>) -> Self {
        ExitReason::Error(description.into())
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }

    /// True for exits caused by a failure. Cancellation is not abnormal.
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self,
            ExitReason::Error(_) | ExitReason::MaxRestartsExceeded(_)
        )
    }

    /// Classifies a failed tokio join: cancellation or a captured panic.
    pub(crate) fn from_join_error(error: JoinError) -> Self {
        match error.try_into_panic() {
            Ok(payload) => Self::from_panic(payload),
            Err(_) => ExitReason::Cancelled,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        ExitReason::Error(format!("panicked: {message}"))
    }
}

/// Parses the display form back: `"normal"`, `"cancelled"`, `"error: <description>"`.
/// Any other text is taken as an error description.
impl FromStr for ExitReason {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "normal" => ExitReason::Normal,
            "cancelled" => ExitReason::Cancelled,
            _ => {
                let description = s.strip_prefix("error: ").unwrap_or(s);
                if description.starts_with("MaxRestartsExceeded:") {
                    ExitReason::MaxRestartsExceeded(description.to_string())
                } else {
                    ExitReason::Error(description.to_string())
                }
            }
        })
    }
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::Cancelled => write!(f, "cancelled"),
            ExitReason::Error(description) | ExitReason::MaxRestartsExceeded(description) => {
                write!(f, "error: {description}")
            }
        }
    }
}

impl From<ActorError> for ExitReason {
    fn from(error: ActorError) -> Self {
        match error {
            ActorError::MaxRestartsExceeded { .. } => {
                ExitReason::MaxRestartsExceeded(error.to_string())
            }
            other => ExitReason::Error(other.to_string()),
        }
    }
}
