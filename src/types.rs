use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_BIND_HOST, DEFAULT_REGISTRY_PATH};

/// The network address of one running agent. Fixed once the agent
/// has bound its listener.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct AgentEndpoint(SocketAddr);

impl AgentEndpoint {
    pub fn new(addr: SocketAddr) -> AgentEndpoint {
        AgentEndpoint(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for AgentEndpoint {
    fn from(addr: SocketAddr) -> Self {
        AgentEndpoint(addr)
    }
}

impl FromStr for AgentEndpoint {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<SocketAddr>().map(AgentEndpoint)
    }
}

/// Renders as `<host>:<port>`, the registry line format.
impl fmt::Display for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-local identifier of an agent, used only in logs.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct AgentId(u64);

impl AgentId {
    pub fn new(id: u64) -> AgentId {
        AgentId(id)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Agent{}", self.0)
    }
}

/// Whether an agent reports the network value or a different one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AgentRole {
    Honest,
    Liar,
}

impl AgentRole {
    pub fn is_liar(&self) -> bool {
        matches!(self, AgentRole::Liar)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AgentRole::Honest => write!(f, "honest"),
            AgentRole::Liar => write!(f, "liar"),
        }
    }
}

/// Parameters of a `start` command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartParams {
    pub network_value: u32,
    pub max_value: u32,
    pub num_agents: usize,
    pub liar_ratio: f64,
}

impl StartParams {
    /// Splits the cohort into `(liars, honest)`. Halves round away from zero.
    pub fn cohort(&self) -> (usize, usize) {
        let liars = (self.num_agents as f64 * self.liar_ratio).round() as usize;
        let liars = liars.min(self.num_agents);
        (liars, self.num_agents - liars)
    }
}

/// Timeouts for dialing agents, reading their replies, and waiting for
/// a stopped session to drain.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeoutConfig {
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            dial_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub registry_path: PathBuf,
    pub bind_host: String,
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            bind_host: DEFAULT_BIND_HOST.to_string(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(num_agents: usize, liar_ratio: f64) -> StartParams {
        StartParams {
            network_value: 3,
            max_value: 10,
            num_agents,
            liar_ratio,
        }
    }

    #[test]
    fn cohort_rounds_liar_count() {
        assert_eq!(params(5, 0.0).cohort(), (0, 5));
        assert_eq!(params(5, 0.4).cohort(), (2, 3));
        assert_eq!(params(5, 0.5).cohort(), (3, 2));
        assert_eq!(params(5, 1.0).cohort(), (5, 0));
        assert_eq!(params(0, 0.7).cohort(), (0, 0));
    }

    #[test]
    fn endpoint_renders_as_registry_line() {
        let endpoint: AgentEndpoint = "127.0.0.1:4242".parse().unwrap();
        assert_eq!(endpoint.to_string(), "127.0.0.1:4242");
        assert_eq!(endpoint.addr().port(), 4242);
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!("not-an-address".parse::<AgentEndpoint>().is_err());
        assert!("127.0.0.1".parse::<AgentEndpoint>().is_err());
    }
}
