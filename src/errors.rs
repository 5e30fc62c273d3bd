use std::io;

use thiserror::Error;

use crate::types::AgentEndpoint;

pub const START_USAGE: &str =
    "start --value v --max-value max --num-agents number --liar-ratio ratio";

/// The liar draw is only defined when there is at least one value
/// other than the network value to choose from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("liar agents need max value >= 2, got {max_value}")]
    MaxValueTooSmall { max_value: u32 },
}

/// Raised while bringing an agent up; fatal to the enclosing `start`.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to bind agent listener on {host}: {source}")]
    Bind {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("wrong number of tokens. Usage: {}", START_USAGE)]
    TokenCount,

    #[error("wrong keys. Usage: {}", START_USAGE)]
    Keys,

    #[error("{field} should be an integer in 0..={max}. Usage: {}", START_USAGE)]
    Integer { field: &'static str, max: u64 },

    #[error("ratio should be a float in [0, 1]. Usage: {}", START_USAGE)]
    Ratio,

    #[error("unknown command: {0}")]
    Unknown(String),
}

/// One query worker failed; the endpoint contributes no sample.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("dial to {endpoint} timed out")]
    DialTimeout { endpoint: AgentEndpoint },

    #[error("dial to {endpoint} failed: {source}")]
    Dial {
        endpoint: AgentEndpoint,
        #[source]
        source: io::Error,
    },

    #[error("sending query to {endpoint} failed: {source}")]
    Write {
        endpoint: AgentEndpoint,
        #[source]
        source: io::Error,
    },

    #[error("reading reply from {endpoint} timed out")]
    ReadTimeout { endpoint: AgentEndpoint },

    #[error("reading reply from {endpoint} failed: {source}")]
    Read {
        endpoint: AgentEndpoint,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed registry line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Received {collected} out of {expected} values")]
    Shortfall { collected: usize, expected: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
