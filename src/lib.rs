#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Actor OTP
//!
//! > **Erlang/OTP-style actors on Tokio.**
//!
//! Isolated actors communicate only by sending messages into each other's mailboxes. On top of
//! that sit the two OTP behaviors that make the model useful: the request/reply **GenServer**
//! and the restarting **Supervisor**.
//!
//! ## 🏗️ Design Philosophy
//!
//! - **No shared state.** Each actor owns its state and processes one message at a time, so
//!   handlers never need a lock.
//! - **Selective receive.** A mailbox is consumed by pattern, not by position. Messages that
//!   do not match stay queued in arrival order.
//! - **Let it crash.** An error inside an actor ends that actor only. Whoever linked it gets an
//!   exit reason, and a supervisor decides whether to restart it.
//! - **Structured concurrency.** Every actor runs inside a [`Scope`]. Cancelling a scope
//!   unwinds everything started in it.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Primitives ([`value`], [`pid`], [`pattern`], [`message`])
//! - **Role**: what a message is, who it goes to, and what shape a receiver accepts.
//! - **Key items**: [`Value`], [`Pid`], [`Ref`], [`Pattern`], [`send`](message::send),
//!   [`call`](message::call), [`cast`](message::cast).
//!
//! ### 2. The Engine ([`mailbox`], [`actor`], [`scope`])
//! - **Role**: selective receive and the `init → run* → terminate` lifecycle.
//! - **Key items**: [`Mailbox`], [`Actor`], [`Context`], [`ActorHandle`].
//!
//! ### 3. Behaviors ([`gen_server`], [`supervisor`])
//! - **Role**: call/cast/info dispatch with background tasks, and restart strategies with an
//!   intensity limit.
//! - **Key items**: [`GenServer`], [`Supervisor`], [`ChildSpec`], [`SupervisorClient`].
//!
//! ### 4. Around the core ([`registry`], [`testing`], [`logging`])
//! - **Role**: name lookup, test helpers, and subscriber setup.
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use actor_otp::{message, ActorError, Context, GenServer, Ref, Scope, Value};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl GenServer for Greeter {
//!     type State = ();
//!
//!     async fn init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
//!         Ok(())
//!     }
//!
//!     async fn handle_call(
//!         &mut self,
//!         request: Value,
//!         _from: Ref,
//!         _state: &mut (),
//!         _ctx: &mut Context,
//!     ) -> Result<Value, ActorError> {
//!         Ok(Value::from(format!("hello, {}", request.as_str().unwrap_or("stranger"))))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ActorError> {
//!     let scope = Scope::new();
//!     let pid = Greeter.start(&scope)?;
//!     let reply = message::call(&pid, "world", Duration::from_secs(1)).await?;
//!     assert_eq!(reply, "hello, world");
//!     scope.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -p otp-sample
//! ```

pub mod actor;
pub mod error;
pub mod gen_server;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod pattern;
pub mod pid;
pub mod registry;
pub mod scope;
pub mod supervisor;
pub mod testing;
pub mod value;

// Re-export core types for convenience
pub use actor::{Actor, ActorHandle, Context};
pub use error::{ActorError, ExitReason, ReceiveTimeout};
pub use gen_server::{GenServer, GenServerActor, TaskHandle};
pub use mailbox::{Clause, Mailbox, Matched};
pub use message::{call, cast, send};
pub use pattern::{Captures, Pattern, ANY, IGNORE};
pub use pid::{Pid, Ref};
pub use scope::Scope;
pub use supervisor::{
    ChildInfo, ChildSpec, RestartStrategy, RestartType, Supervisor, SupervisorActor,
    SupervisorClient, SupervisorFlags,
};
pub use value::{Kind, Value};
