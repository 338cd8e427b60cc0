use crate::comm::config::CommConfig;
use crate::comm::error::{CommError, CommInitError};
use crate::comm::session::serve_lines;
use crate::gateway::Gateway;
use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// TCP server - one line-protocol session per connection
pub struct Server {
    listener: TcpListener,
    gateway: Arc<Gateway>,
    connections: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener described by `config`
    pub async fn bind(config: &CommConfig, gateway: Arc<Gateway>) -> StdResult<Self, CommInitError> {
        let addr = config
            .bind_addr()
            .map_err(|e| CommInitError::InvalidAddress(e.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CommInitError::BindFailed(e.to_string()))?;

        Ok(Self {
            listener,
            gateway,
            connections: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Get local socket address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped
    ///
    /// Past `max_connections`, new connections wait in the accept backlog
    /// until a session ends.
    pub async fn run(self) -> StdResult<(), CommError> {
        if let Ok(addr) = self.local_addr() {
            info!(addr = %addr, "listening for connections");
        }

        loop {
            let permit = Arc::clone(&self.connections)
                .acquire_owned()
                .await
                .map_err(|_| CommError::LimitClosed)?;

            let (stream, peer) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    // Per-connection failures (e.g. reset before accept) are not fatal
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            debug!(peer = %peer, "connection accepted");

            let gateway = Arc::clone(&self.gateway);
            tokio::spawn(async move {
                let peer = peer.to_string();
                let (reader, writer) = stream.into_split();
                if let Err(e) = serve_lines(reader, writer, gateway, &peer).await {
                    warn!(peer = %peer, error = %e, "session ended with error");
                }
                drop(permit);
            });
        }
    }
}
