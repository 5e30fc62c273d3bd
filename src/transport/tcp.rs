use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::REPLY_LEN;
use crate::errors::QueryError;
use crate::messages;
use crate::transport::Transport;
use crate::types::{AgentEndpoint, TimeoutConfig};

/// Opens a fresh connection per query. Both the dial and the reply read
/// are bounded, so a silent agent costs at most `dial + read` timeouts.
#[derive(Clone, Debug, Default)]
pub struct TcpTransport {
    timeouts: TimeoutConfig,
}

impl TcpTransport {
    pub fn new(timeouts: TimeoutConfig) -> Self {
        TcpTransport { timeouts }
    }
}

impl Transport for TcpTransport {
    async fn query(&self, endpoint: AgentEndpoint) -> Result<u32, QueryError> {
        let mut stream = timeout(self.timeouts.dial_timeout, TcpStream::connect(endpoint.addr()))
            .await
            .map_err(|_| QueryError::DialTimeout { endpoint })?
            .map_err(|source| QueryError::Dial { endpoint, source })?;

        stream
            .write_all(&messages::query())
            .await
            .map_err(|source| QueryError::Write { endpoint, source })?;

        let mut reply = [0u8; REPLY_LEN];
        timeout(self.timeouts.read_timeout, stream.read_exact(&mut reply))
            .await
            .map_err(|_| QueryError::ReadTimeout { endpoint })?
            .map_err(|source| QueryError::Read { endpoint, source })?;

        let value = messages::decode_reply(&reply).ok_or_else(|| QueryError::Read {
            endpoint,
            source: io::Error::new(io::ErrorKind::InvalidData, "malformed reply frame"),
        })?;
        debug!("{} replied {}", endpoint, value);
        Ok(value)
    }
}
