use anyhow::Context;
use rand::seq::SliceRandom;
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::nodes::agent;
use crate::nodes::cancel::CancellationBroadcast;
use crate::nodes::policy;
use crate::persistence::Registry;
use crate::types;

/// A running cohort: its shutdown signal and every task its agents spawned.
struct Session {
    cancellation: CancellationBroadcast,
    tracker: TaskTracker,
    endpoints: Vec<types::AgentEndpoint>,
}

impl Session {
    /// Signal, then wait for every tracked task to finish. Returns
    /// `false` if they did not drain within `limit`.
    async fn shutdown(self, limit: std::time::Duration) -> bool {
        self.cancellation.signal();
        self.tracker.close();
        timeout(limit, self.tracker.wait()).await.is_ok()
    }
}

/// Owns the lifecycle of one cohort of agents at a time and keeps the
/// registry in step with it.
pub struct SessionController<R> {
    config: types::Config,
    registry: R,
    current: Option<Session>,
}

impl<R: Registry> SessionController<R> {
    pub fn new(config: types::Config, registry: R) -> Self {
        SessionController {
            config,
            registry,
            current: None,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Endpoints of the running session in registry order.
    pub fn endpoints(&self) -> &[types::AgentEndpoint] {
        self.current
            .as_ref()
            .map(|s| s.endpoints.as_slice())
            .unwrap_or_default()
    }

    /// Tear down any running session, bring up a fresh cohort, shuffle
    /// its endpoints, and persist them. Liars are spawned first; the
    /// shuffle keeps registry position from revealing who lies.
    ///
    /// Parameters no cohort could satisfy are rejected before the running
    /// session is touched.
    pub async fn start(
        &mut self,
        params: types::StartParams,
    ) -> anyhow::Result<Vec<types::AgentEndpoint>> {
        let (num_liars, num_honest) = params.cohort();
        if num_liars > 0 {
            policy::check_liar_range(params.max_value).context("cannot start liar agents")?;
        }

        self.shutdown_current().await;
        let session = Session {
            cancellation: CancellationBroadcast::new(),
            tracker: TaskTracker::new(),
            endpoints: Vec::new(),
        };

        let roles = std::iter::repeat(types::AgentRole::Liar)
            .take(num_liars)
            .chain(std::iter::repeat(types::AgentRole::Honest).take(num_honest));
        let mut endpoints = Vec::new();
        for (idx, role) in roles.enumerate() {
            let started = agent::start(
                types::AgentId::new(idx as u64),
                &self.config.bind_host,
                params.network_value,
                params.max_value,
                role,
                session.cancellation.clone(),
                &session.tracker,
            )
            .await;
            match started {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => {
                    self.abandon(session).await;
                    return Err(e).context("failed to start agent");
                }
            }
        }

        endpoints.shuffle(&mut rand::thread_rng());
        if let Err(e) = self.registry.store(&endpoints) {
            self.abandon(session).await;
            return Err(e).context("failed to persist agent registry");
        }

        info!(
            "started {} agents ({} liars, {} honest)",
            endpoints.len(),
            num_liars,
            num_honest
        );
        self.current = Some(Session {
            endpoints: endpoints.clone(),
            ..session
        });
        Ok(endpoints)
    }

    /// Stop the running session, if any, and empty the registry.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.shutdown_current().await;
        self.registry
            .clear()
            .context("failed to clear agent registry")?;
        Ok(())
    }

    // A failed start leaves no agents running and no stale endpoints
    // from the session it replaced.
    async fn abandon(&self, session: Session) {
        if !session.shutdown(self.config.timeouts.shutdown_timeout).await {
            warn!("partially started agents still draining");
        }
        if let Err(e) = self.registry.clear() {
            warn!("failed to clear agent registry: {}", e);
        }
    }

    async fn shutdown_current(&mut self) {
        let Some(session) = self.current.take() else {
            debug!("no session running");
            return;
        };
        let agents = session.endpoints.len();
        let limit = self.config.timeouts.shutdown_timeout;
        if session.shutdown(limit).await {
            info!("stopped {} agents", agents);
        } else {
            warn!("agents still draining after {:?}, moving on", limit);
        }
    }
}
