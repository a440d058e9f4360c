//! TCP Server
//!
//! Accepts connections and runs one session thread per connection.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;
use super::Connection;

/// TCP server for the memcache text protocol
pub struct Server {
    config: Config,
    storage: Arc<dyn Storage>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Stops a running server from another thread
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

/// Releases a connection slot when the session thread ends, however it ends
struct SlotGuard(Arc<AtomicUsize>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Validate the config and bind the listener
    pub fn bind(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            storage,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of sessions currently running
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// A handle that can stop this server from another thread
    pub fn handle(&self) -> ServerHandle {
        let mut wake_addr = self.local_addr;
        if wake_addr.ip().is_unspecified() {
            let loopback: std::net::IpAddr = match wake_addr {
                SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            };
            wake_addr.set_ip(loopback);
        }

        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
            wake_addr,
        }
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Releases the storage backend on the way out.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.spawn_session(stream),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            }
        }

        tracing::info!(
            "Server on {} stopped accepting, {} sessions still open",
            self.local_addr,
            self.active_connections()
        );
        self.storage.shutdown()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    fn spawn_session(&self, stream: TcpStream) {
        let limit = self.config.max_connections;
        if self.active.fetch_add(1, Ordering::SeqCst) >= limit {
            self.active.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                "Refusing connection from {:?}: {} connections open",
                stream.peer_addr().ok(),
                limit
            );
            return;
        }

        let slot = SlotGuard(Arc::clone(&self.active));
        let storage = Arc::clone(&self.storage);
        let session = self.config.session;

        let spawned = thread::Builder::new()
            .name("mcwire-session".to_string())
            .spawn(move || {
                let _slot = slot;
                let result = Connection::new(stream, storage, session).and_then(|mut c| c.handle());
                if let Err(e) = result {
                    tracing::debug!("Session ended with error: {}", e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn session thread: {}", e);
        }
    }
}

impl ServerHandle {
    /// Set the shutdown flag and wake the accept loop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // accept() only returns on a new connection
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::debug!("Wake-up connection to {} failed: {}", self.wake_addr, e);
        }
    }
}
