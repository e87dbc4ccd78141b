//! # Server Endpoint
//!
//! Accepts many connections through one background I/O thread and hands
//! application policy to a [`ServerHandler`] implementation.
//!
//! Threading contract: `on_client_connect` and `on_client_validated` run
//! on the I/O thread at accept/validation time, so they must be quick and
//! non-blocking. `on_message` and `on_client_disconnect` run on whichever
//! application thread calls [`Server::update`], [`Server::message_client`]
//! or [`Server::message_all_clients`] - the inbound queue decouples them
//! from the I/O thread entirely.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::config::{NetConfig, MAX_PAYLOAD_SIZE};
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::error::{Result, WireError};
use crate::protocol::handshake::{self, Scramble, VersionScramble};
use crate::transport::connection::{self, Connection, ValidatedCallback};
use crate::utils::SharedDeque;

/// Application policy for a server endpoint.
///
/// The handler is shared between the I/O thread and application threads,
/// so implementations hold their state behind interior mutability.
pub trait ServerHandler<T: MessageKind>: Send + Sync + 'static {
    /// Accept/reject predicate for a new socket, called before any
    /// handshake. Rejection drops the socket silently. Defaults to reject.
    fn on_client_connect(&self, client: &Arc<Connection<T>>) -> bool {
        let _ = client;
        false
    }

    /// Called on the I/O thread once a client passes handshake validation.
    fn on_client_validated(&self, client: &Arc<Connection<T>>) {
        let _ = client;
    }

    /// Called when a dead connection is swept out of tracking.
    fn on_client_disconnect(&self, client: &Arc<Connection<T>>) {
        let _ = client;
    }

    /// Called from [`Server::update`] for each drained inbound message.
    fn on_message(&self, client: &Arc<Connection<T>>, message: Message<T>);
}

/// Tracked connections and their ids. The two lists move together:
/// every tracked connection's id is in `ids` and vice versa.
struct Registry<T: MessageKind> {
    connections: Vec<Arc<Connection<T>>>,
    ids: Vec<u32>,
}

impl<T: MessageKind> Registry<T> {
    fn new() -> Self {
        Self {
            connections: Vec::new(),
            ids: Vec::new(),
        }
    }

    fn remove(&mut self, client: &Arc<Connection<T>>) {
        self.connections.retain(|c| !Arc::ptr_eq(c, client));
        let id = client.id();
        self.ids.retain(|tracked| *tracked != id);
    }
}

/// A listening endpoint: many connections, one I/O thread.
pub struct Server<T: MessageKind, H: ServerHandler<T>> {
    listen_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    scramble: Arc<dyn Scramble>,
    max_payload: usize,
    handler: Arc<H>,
    inbound: Arc<SharedDeque<OwnedMessage<T>>>,
    registry: Arc<Mutex<Registry<T>>>,
    shutdown: Option<watch::Sender<bool>>,
    io_thread: Option<JoinHandle<()>>,
}

impl<T: MessageKind, H: ServerHandler<T>> Server<T, H> {
    /// Creates a server listening on all interfaces at `port`, validating
    /// clients against the given protocol version.
    pub fn new(port: u16, version: f32, handler: H) -> Self {
        Self::with_scramble(
            SocketAddr::from(([0, 0, 0, 0], port)),
            Arc::new(VersionScramble::new(version)),
            MAX_PAYLOAD_SIZE,
            handler,
        )
    }

    /// Creates a server with a custom handshake transform and payload cap.
    pub fn with_scramble(
        listen_addr: SocketAddr,
        scramble: Arc<dyn Scramble>,
        max_payload: usize,
        handler: H,
    ) -> Self {
        Self {
            listen_addr,
            local_addr: None,
            scramble,
            max_payload,
            handler: Arc::new(handler),
            inbound: Arc::new(SharedDeque::new()),
            registry: Arc::new(Mutex::new(Registry::new())),
            shutdown: None,
            io_thread: None,
        }
    }

    /// Creates a server from a loaded configuration.
    pub fn from_config(config: &NetConfig, handler: H) -> Result<Self> {
        let listen_addr = config
            .server
            .address
            .parse::<SocketAddr>()
            .map_err(|e| WireError::ConfigError(format!("invalid server address: {e}")))?;
        Ok(Self::with_scramble(
            listen_addr,
            Arc::new(VersionScramble::new(config.server.version)),
            config.transport.max_payload_size,
            handler,
        ))
    }

    /// Binds the listener and brings up the accept loop on the I/O thread.
    ///
    /// Bind failures are returned synchronously; the server is not
    /// started. Calling `start` on a running server is a no-op.
    #[instrument(skip(self), fields(address = %self.listen_addr))]
    pub fn start(&mut self) -> Result<()> {
        if self.io_thread.is_some() {
            return Ok(());
        }

        let listener = std::net::TcpListener::bind(self.listen_addr).map_err(|e| {
            error!(address = %self.listen_addr, error = %e, "bind failed");
            WireError::Io(e)
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handler = Arc::clone(&self.handler);
        let inbound = Arc::clone(&self.inbound);
        let registry = Arc::clone(&self.registry);
        let scramble = Arc::clone(&self.scramble);
        let max_payload = self.max_payload;

        let thread = std::thread::Builder::new()
            .name("server-io".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "failed to build I/O runtime");
                        return;
                    }
                };
                runtime.block_on(accept_loop(
                    listener,
                    shutdown_rx,
                    handler,
                    inbound,
                    registry,
                    scramble,
                    max_payload,
                ));
                // Dropping the runtime here aborts every connection task
                // still in flight, closing their sockets.
            })
            .map_err(WireError::Io)?;

        self.shutdown = Some(shutdown_tx);
        self.io_thread = Some(thread);
        info!(address = %local_addr, "server started");
        Ok(())
    }

    /// Halts the accept loop and joins the I/O thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(thread) = self.io_thread.take() {
            let _ = thread.join();
            info!("server stopped");
        }
    }

    /// The bound address, available once `start` has succeeded. Useful
    /// when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of currently tracked connections (dead ones linger until a
    /// send path sweeps them).
    pub fn client_count(&self) -> usize {
        lock_registry(&self.registry).connections.len()
    }

    /// Sends to one client if it is alive; otherwise treats the attempt as
    /// the discovery of a disconnect - fires `on_client_disconnect` and
    /// removes the client from tracking.
    pub fn message_client(&self, client: &Arc<Connection<T>>, message: Message<T>) {
        if client.is_connected() {
            client.send(message);
        } else {
            info!(id = client.id(), "removing client");
            self.handler.on_client_disconnect(client);
            lock_registry(&self.registry).remove(client);
        }
    }

    /// Sends to every connected tracked client, except `ignore` if given.
    ///
    /// Dead connections found along the way are swept out in a second
    /// pass, after the sends: removal never mutates the collection being
    /// iterated, and each dead client is reported exactly once.
    pub fn message_all_clients(&self, message: &Message<T>, ignore: Option<&Arc<Connection<T>>>) {
        let snapshot = lock_registry(&self.registry).connections.clone();
        let mut dead = Vec::new();

        for client in &snapshot {
            if client.is_connected() {
                let ignored = ignore.is_some_and(|skip| Arc::ptr_eq(skip, client));
                if !ignored {
                    client.send(message.clone());
                }
            } else {
                dead.push(Arc::clone(client));
            }
        }

        if !dead.is_empty() {
            for client in &dead {
                info!(id = client.id(), "removing client");
                self.handler.on_client_disconnect(client);
            }
            let mut registry = lock_registry(&self.registry);
            for client in &dead {
                registry.remove(client);
            }
        }
    }

    /// Drains up to `max_messages` inbound messages into the handler's
    /// `on_message`, on the calling thread. With `wait` set, blocks until
    /// at least one message is queued. Pass `usize::MAX` to drain
    /// everything available.
    pub fn update(&self, max_messages: usize, wait: bool) {
        if wait {
            self.inbound.wait();
        }

        let mut processed = 0;
        while processed < max_messages {
            let Some(owned) = self.inbound.pop_front() else {
                break;
            };
            // Server-side messages always carry provenance.
            if let Some(remote) = owned.remote {
                self.handler.on_message(&remote, owned.message);
            }
            processed += 1;
        }
    }
}

impl<T: MessageKind, H: ServerHandler<T>> Drop for Server<T, H> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_registry<T: MessageKind>(
    registry: &Arc<Mutex<Registry<T>>>,
) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn accept_loop<T: MessageKind, H: ServerHandler<T>>(
    listener: std::net::TcpListener,
    mut shutdown: watch::Receiver<bool>,
    handler: Arc<H>,
    inbound: Arc<SharedDeque<OwnedMessage<T>>>,
    registry: Arc<Mutex<Registry<T>>>,
    scramble: Arc<dyn Scramble>,
    max_payload: usize,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "listener registration failed");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("accept loop stopping");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "new connection");
                    let conn = Arc::new(Connection::server(
                        peer,
                        Arc::clone(&scramble),
                        max_payload,
                    ));

                    if handler.on_client_connect(&conn) {
                        let id = {
                            let mut reg = lock_registry(&registry);
                            let id = generate_unique_id(&reg.ids, scramble.as_ref());
                            conn.assign_id(id);
                            reg.connections.push(Arc::clone(&conn));
                            reg.ids.push(id);
                            id
                        };
                        info!(id, peer = %peer, "connection approved");

                        let validated_handler = Arc::clone(&handler);
                        let on_validated: ValidatedCallback<T> =
                            Box::new(move |client| validated_handler.on_client_validated(client));
                        tokio::spawn(connection::run(
                            conn,
                            stream,
                            Arc::clone(&inbound),
                            Some(on_validated),
                        ));
                    } else {
                        info!(peer = %peer, "connection denied");
                        // stream drops here; no handshake is attempted
                    }
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

/// Picks an id not present in `ids`.
///
/// Seeded from the high-resolution clock and re-rolled through the
/// handshake transform on collision. Zero is reserved as the "no id"
/// marker, so it is never handed out.
fn generate_unique_id(ids: &[u32], scramble: &dyn Scramble) -> u32 {
    let mut candidate = fold(handshake::clock_challenge());
    let mut attempt = 0u64;
    while candidate == 0 || ids.contains(&candidate) {
        attempt += 1;
        candidate = fold(scramble.scramble(u64::from(candidate) ^ (attempt << 32)));
    }
    candidate
}

fn fold(value: u64) -> u32 {
    ((value >> 32) ^ value) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handshake::VersionScramble;

    #[test]
    fn generated_ids_are_unique_and_nonzero() {
        let scramble = VersionScramble::new(1.0);
        let mut ids = Vec::new();
        for _ in 0..200 {
            let id = generate_unique_id(&ids, &scramble);
            assert_ne!(id, 0);
            assert!(!ids.contains(&id));
            ids.push(id);
        }
    }

    #[test]
    fn generation_never_returns_a_tracked_id() {
        let scramble = VersionScramble::new(1.0);
        let first = generate_unique_id(&[], &scramble);
        let id = generate_unique_id(&[first], &scramble);
        assert_ne!(id, first);
        assert_ne!(id, 0);
    }
}
