use std::future::Future;
use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::constants::READ_CHUNK;
use crate::errors::AgentError;
use crate::messages;
use crate::nodes::cancel::CancellationBroadcast;
use crate::nodes::policy;
use crate::types;

/// A simulated participant that answers every query with one fixed value.
pub struct AgentProcess {
    id: types::AgentId,
    role: types::AgentRole,
    value: u32,
    endpoint: types::AgentEndpoint,
    listener: TcpListener,
}

impl AgentProcess {
    /// Bind an ephemeral port on `host` and fix the agent's value.
    /// Either failure is fatal to this agent.
    pub async fn bind(
        id: types::AgentId,
        host: &str,
        network_value: u32,
        max_value: u32,
        role: types::AgentRole,
    ) -> Result<AgentProcess, AgentError> {
        let value = policy::agent_value(network_value, max_value, role, &mut rand::thread_rng())?;
        let bind_err = |source| AgentError::Bind {
            host: host.to_string(),
            source,
        };
        let listener = TcpListener::bind((host, 0)).await.map_err(bind_err)?;
        let endpoint = listener.local_addr().map_err(bind_err)?.into();
        info!("{}: listening on {} as {}", id, endpoint, role);

        Ok(AgentProcess {
            id,
            role,
            value,
            endpoint,
            listener,
        })
    }

    pub fn endpoint(&self) -> types::AgentEndpoint {
        self.endpoint
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn role(&self) -> types::AgentRole {
        self.role
    }

    /// Start accepting connections in the background. The accept loop
    /// and every connection handler are tracked by `tracker` and exit
    /// once `cancellation` fires.
    pub fn spawn(
        self,
        cancellation: CancellationBroadcast,
        tracker: &TaskTracker,
    ) -> types::AgentEndpoint {
        tracker.spawn(accept_loop(
            self.listener,
            self.id,
            self.value,
            cancellation,
            tracker.clone(),
        ));
        self.endpoint
    }
}

/// Source of inbound connections for an agent's accept loop.
pub trait Incoming: Send + 'static {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Incoming for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

// A failed accept costs only that connection; the loop ends on
// cancellation alone.
async fn accept_loop<L: Incoming>(
    listener: L,
    id: types::AgentId,
    value: u32,
    cancellation: CancellationBroadcast,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                debug!("{}: new connection from {}", id, peer);
                tracker.spawn(serve_connection(id, value, stream, cancellation.clone()));
            }
            Err(e) => debug!("{}: accept failed: {}", id, e),
        }
    }
    debug!("{}: listener closed", id);
}

/// Bind an agent and start serving. Returns its endpoint once bound.
pub async fn start(
    id: types::AgentId,
    host: &str,
    network_value: u32,
    max_value: u32,
    role: types::AgentRole,
    cancellation: CancellationBroadcast,
    tracker: &TaskTracker,
) -> Result<types::AgentEndpoint, AgentError> {
    let agent = AgentProcess::bind(id, host, network_value, max_value, role).await?;
    Ok(agent.spawn(cancellation, tracker))
}

// Every non-empty read is a query and gets the value back. Errors end
// this connection only.
async fn serve_connection(
    id: types::AgentId,
    value: u32,
    mut stream: TcpStream,
    cancellation: CancellationBroadcast,
) {
    let reply = messages::encode_reply(value);
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            read = stream.read_buf(&mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("{}: read failed: {}", id, e);
                break;
            }
        }

        let written = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            written = stream.write_all(&reply) => written,
        };
        if let Err(e) = written {
            debug!("{}: write failed: {}", id, e);
            break;
        }
    }
    debug!("{}: connection closed", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, AgentRole};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn ask(stream: &mut TcpStream) -> u32 {
        stream.write_all(b"ping").await.unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.unwrap();
        messages::decode_reply(&reply).unwrap()
    }

    async fn spawn_agent(
        role: AgentRole,
        cancellation: &CancellationBroadcast,
        tracker: &TaskTracker,
    ) -> types::AgentEndpoint {
        start(AgentId::new(1), "127.0.0.1", 3, 10, role, cancellation.clone(), tracker)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn honest_agent_replies_with_network_value() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let endpoint = spawn_agent(AgentRole::Honest, &cancellation, &tracker).await;

        let mut stream = TcpStream::connect(endpoint.addr()).await.unwrap();
        assert_eq!(ask(&mut stream).await, 3);
        cancellation.signal();
    }

    #[tokio::test]
    async fn liar_agent_replies_with_other_value() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let agent = AgentProcess::bind(AgentId::new(2), "127.0.0.1", 3, 10, AgentRole::Liar)
            .await
            .unwrap();
        assert_eq!(agent.role(), AgentRole::Liar);
        let expected = agent.value();
        let bound = agent.endpoint();
        let endpoint = agent.spawn(cancellation.clone(), &tracker);
        assert_eq!(bound, endpoint);

        let mut stream = TcpStream::connect(endpoint.addr()).await.unwrap();
        let v = ask(&mut stream).await;
        assert_eq!(v, expected);
        assert!(v != 3 && (1..=10).contains(&v));
        cancellation.signal();
    }

    #[tokio::test]
    async fn connection_serves_repeated_queries_with_same_value() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let endpoint = spawn_agent(AgentRole::Liar, &cancellation, &tracker).await;

        let mut stream = TcpStream::connect(endpoint.addr()).await.unwrap();
        let first = ask(&mut stream).await;
        for _ in 0..5 {
            assert_eq!(ask(&mut stream).await, first);
        }
        // a second connection sees the same fixed value
        let mut other = TcpStream::connect(endpoint.addr()).await.unwrap();
        assert_eq!(ask(&mut other).await, first);
        cancellation.signal();
    }

    #[tokio::test]
    async fn dropped_connection_leaves_siblings_running() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let endpoint = spawn_agent(AgentRole::Honest, &cancellation, &tracker).await;

        let mut survivor = TcpStream::connect(endpoint.addr()).await.unwrap();
        let mut doomed = TcpStream::connect(endpoint.addr()).await.unwrap();
        assert_eq!(ask(&mut doomed).await, 3);
        drop(doomed);

        assert_eq!(ask(&mut survivor).await, 3);
        let mut fresh = TcpStream::connect(endpoint.addr()).await.unwrap();
        assert_eq!(ask(&mut fresh).await, 3);
        cancellation.signal();
    }

    #[tokio::test]
    async fn cancellation_stops_listener_and_open_connections() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let endpoint = spawn_agent(AgentRole::Honest, &cancellation, &tracker).await;

        let mut open = TcpStream::connect(endpoint.addr()).await.unwrap();
        assert_eq!(ask(&mut open).await, 3);

        cancellation.signal();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .unwrap();

        // the handler is gone, so the open connection sees EOF
        let mut rest = Vec::new();
        let n = open.read_to_end(&mut rest).await.unwrap_or(0);
        assert_eq!(n, 0);
        assert!(TcpStream::connect(endpoint.addr()).await.is_err());
    }

    #[tokio::test]
    async fn liar_with_degenerate_range_fails_to_start() {
        let err = AgentProcess::bind(AgentId::new(9), "127.0.0.1", 1, 1, AgentRole::Liar)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Policy(_)));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let err = AgentProcess::bind(AgentId::new(9), "192.0.2.1", 3, 10, AgentRole::Honest)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Bind { .. }));
    }

    /// Fails the first `failures` accepts before handing out real ones.
    struct FlakyListener {
        inner: TcpListener,
        failures: AtomicUsize,
    }

    impl Incoming for FlakyListener {
        async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(io::Error::from(io::ErrorKind::ConnectionAborted));
            }
            self.inner.accept().await
        }
    }

    #[tokio::test]
    async fn accept_errors_do_not_close_the_listener() {
        let cancellation = CancellationBroadcast::new();
        let tracker = TaskTracker::new();
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = inner.local_addr().unwrap();
        let listener = FlakyListener {
            inner,
            failures: AtomicUsize::new(3),
        };
        tracker.spawn(accept_loop(
            listener,
            AgentId::new(4),
            3,
            cancellation.clone(),
            tracker.clone(),
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let v = tokio::time::timeout(Duration::from_secs(1), ask(&mut stream))
            .await
            .unwrap();
        assert_eq!(v, 3);

        cancellation.signal();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait())
            .await
            .unwrap();
    }
}
