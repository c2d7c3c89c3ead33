//! # Application Lifecycle
//!
//! [`AppSystem`] is the conductor of the sample: it owns the root [`Scope`], starts the
//! supervision tree and hands out clients.
//!
//! ```text
//! AppSupervisor (one_for_one, 3 restarts / 5s)
//! ├── "counter"  Counter GenServer, registered as "counter"
//! └── "flaky"    Flaky worker
//! ```
//!
//! Shutting down cancels the root scope. The supervisor and both children run `terminate`
//! with `"cancelled"` and nothing is restarted.

use crate::counter::{Counter, CounterClient};
use crate::flaky::Flaky;
use actor_otp::registry::Registry;
use actor_otp::{
    ActorError, ChildSpec, Pid, RestartStrategy, Scope, Supervisor, SupervisorClient,
    SupervisorFlags,
};
use std::sync::Arc;
use tracing::info;

pub const COUNTER: &str = "counter";
pub const FLAKY: &str = "flaky";

/// Root supervisor of the sample application.
pub struct AppSupervisor {
    registry: Arc<Registry>,
    initial_count: i64,
}

impl AppSupervisor {
    pub fn new(registry: Arc<Registry>, initial_count: i64) -> Self {
        Self {
            registry,
            initial_count,
        }
    }
}

impl Supervisor for AppSupervisor {
    fn child_specs(&self) -> Result<Vec<ChildSpec>, ActorError> {
        let registry = self.registry.clone();
        let initial = self.initial_count;
        Ok(vec![
            ChildSpec::gen_server(COUNTER, move || {
                Counter::new(initial).registered_as(registry.clone(), COUNTER)
            })?,
            ChildSpec::new(FLAKY, || Flaky)?,
        ])
    }

    fn flags(&self) -> SupervisorFlags {
        SupervisorFlags::new(RestartStrategy::OneForOne).with_intensity(3, 5.0)
    }
}

/// The running application.
pub struct AppSystem {
    scope: Scope,
    registry: Arc<Registry>,
    supervisor: SupervisorClient,
}

impl AppSystem {
    /// Starts the supervision tree. Must be called from inside a Tokio runtime.
    pub fn start(initial_count: i64) -> Result<Self, ActorError> {
        let scope = Scope::new();
        let registry = Arc::new(Registry::new());
        let pid = AppSupervisor::new(registry.clone(), initial_count).start(&scope)?;
        info!(supervisor = %pid, "Application started");
        Ok(Self {
            scope,
            registry,
            supervisor: SupervisorClient::new(pid),
        })
    }

    pub fn supervisor(&self) -> &SupervisorClient {
        &self.supervisor
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Client for the current counter instance.
    ///
    /// Looks the name up first. Until the counter has finished `init` the name is not yet
    /// registered, so the supervisor is asked instead.
    pub async fn counter(&self) -> Result<CounterClient, ActorError> {
        if let Some(pid) = self.registry.whereis(COUNTER) {
            return Ok(CounterClient::new(pid));
        }
        self.child(COUNTER).await.map(CounterClient::new)
    }

    pub async fn flaky(&self) -> Result<Pid, ActorError> {
        self.child(FLAKY).await
    }

    async fn child(&self, id: &str) -> Result<Pid, ActorError> {
        self.supervisor
            .child(id)
            .await?
            .ok_or_else(|| ActorError::Failed(format!("child '{id}' is not running")))
    }

    /// Cancels the whole tree and waits for every actor to stop.
    pub async fn shutdown(self) {
        info!("Shutting down application");
        self.scope.shutdown().await;
        info!("Application stopped");
    }
}
