use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::RoundError;
use crate::nodes::collector::SampleCollector;
use crate::persistence::Registry;
use crate::transport::Transport;
use crate::types::AgentEndpoint;

/// Runs query rounds: ask every registered agent once, in parallel, and
/// reduce the answers to the most frequent value.
pub struct QueryCoordinator<T> {
    transport: Arc<T>,
}

impl<T> QueryCoordinator<T>
where
    T: Transport + Send + Sync + 'static,
{
    pub fn new(transport: T) -> Self {
        QueryCoordinator {
            transport: Arc::new(transport),
        }
    }

    /// Query every endpoint concurrently and return once all workers are
    /// done. Workers that cannot dial or read contribute nothing.
    pub async fn collect(&self, endpoints: &[AgentEndpoint]) -> Vec<u32> {
        let samples = SampleCollector::with_capacity(endpoints.len());
        let mut workers = JoinSet::new();

        for &endpoint in endpoints {
            let transport = Arc::clone(&self.transport);
            let samples = samples.clone();
            workers.spawn(async move {
                match transport.query(endpoint).await {
                    Ok(value) => samples.append(value),
                    Err(e) => warn!("no sample from {}: {}", endpoint, e),
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("query worker aborted: {}", e);
            }
        }
        samples.snapshot()
    }

    /// Run one round against the endpoints currently in `registry`.
    ///
    /// Every endpoint must answer: a single missing sample fails the
    /// whole round with [`RoundError::Shortfall`] even though the vote
    /// itself would tolerate it. An empty registry collects zero of zero
    /// samples and yields `Ok(None)`.
    pub async fn play_round<R: Registry + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<Option<u32>, RoundError> {
        let endpoints = registry.load()?;
        debug!("querying {} agents", endpoints.len());

        let samples = self.collect(&endpoints).await;
        if samples.len() != endpoints.len() {
            return Err(RoundError::Shortfall {
                collected: samples.len(),
                expected: endpoints.len(),
            });
        }

        let value = mode(&samples);
        info!("round over {} samples settled on {:?}", samples.len(), value);
        Ok(value)
    }
}

/// The most frequent value, or `None` for no values. Among equally
/// frequent values the smallest wins.
pub fn mode(values: &[u32]) -> Option<u32> {
    let mut frequency: HashMap<u32, usize> = HashMap::new();
    let mut best: Option<(u32, usize)> = None;

    for &value in values {
        let count = frequency.entry(value).or_insert(0);
        *count += 1;
        let count = *count;
        best = match best {
            Some((v, c)) if c > count || (c == count && v <= value) => Some((v, c)),
            _ => Some((value, count)),
        };
    }
    best.map(|(value, _)| value)
}
