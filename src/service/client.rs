//! # Client Endpoint
//!
//! Owns exactly one [`Connection`] and exactly one background I/O thread
//! running a current-thread async runtime. `connect` resolves the address
//! synchronously (resolution failures are reported to the caller); the TCP
//! connect and handshake then complete asynchronously on the I/O thread,
//! after which `is_connected` reflects the live socket.
//!
//! Received messages land in the queue returned by [`Client::incoming`];
//! the application drains it at its own pace. There is no push
//! notification for connection loss - poll [`Client::is_connected`].

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::net::TcpStream;
use tracing::{error, info, instrument};

use crate::config::{NetConfig, MAX_PAYLOAD_SIZE};
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::error::{constants, Result, WireError};
use crate::protocol::handshake::{Scramble, VersionScramble};
use crate::transport::connection::{self, Connection};
use crate::utils::SharedDeque;

/// A connecting endpoint: one connection, one I/O thread.
pub struct Client<T: MessageKind> {
    scramble: Arc<dyn Scramble>,
    max_payload: usize,
    connection: Option<Arc<Connection<T>>>,
    inbound: Arc<SharedDeque<OwnedMessage<T>>>,
    io_thread: Option<JoinHandle<()>>,
}

impl<T: MessageKind> Client<T> {
    /// Creates a client validating against the given protocol version.
    pub fn new(version: f32) -> Self {
        Self::with_scramble(Arc::new(VersionScramble::new(version)), MAX_PAYLOAD_SIZE)
    }

    /// Creates a client with a custom handshake transform and payload cap.
    pub fn with_scramble(scramble: Arc<dyn Scramble>, max_payload: usize) -> Self {
        Self {
            scramble,
            max_payload,
            connection: None,
            inbound: Arc::new(SharedDeque::new()),
            io_thread: None,
        }
    }

    /// Creates a client from a loaded configuration.
    pub fn from_config(config: &NetConfig) -> Self {
        Self::with_scramble(
            Arc::new(VersionScramble::new(config.client.version)),
            config.transport.max_payload_size,
        )
    }

    /// Resolves `host:port` and brings up the I/O thread.
    ///
    /// Returns `Ok` once the background connect is underway; resolution
    /// failures are returned synchronously. Success here does not mean the
    /// socket is open yet - poll [`Client::is_connected`].
    #[instrument(skip(self))]
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        // Re-connecting tears down any previous session first.
        self.disconnect();

        let addr = resolve(host, port)?;
        let conn = Arc::new(Connection::client(
            addr,
            Arc::clone(&self.scramble),
            self.max_payload,
        ));

        let task_conn = Arc::clone(&conn);
        let inbound = Arc::clone(&self.inbound);
        let thread = std::thread::Builder::new()
            .name("client-io".into())
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
                runtime.block_on(io_main(task_conn, addr, inbound));
            })
            .map_err(WireError::Io)?;

        self.connection = Some(conn);
        self.io_thread = Some(thread);
        Ok(())
    }

    /// Closes the connection, stops the event loop, and joins the I/O
    /// thread. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.disconnect();
        }
        if let Some(thread) = self.io_thread.take() {
            let _ = thread.join();
        }
    }

    /// Whether the underlying socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.is_connected())
    }

    /// Forwards a message to the connection's outbound queue.
    pub fn send(&self, message: Message<T>) -> Result<()> {
        match &self.connection {
            Some(conn) => {
                conn.send(message);
                Ok(())
            }
            None => Err(WireError::ConnectionClosed),
        }
    }

    /// The queue of completed inbound messages. `remote` is always `None`
    /// here - a client has exactly one peer.
    pub fn incoming(&self) -> &SharedDeque<OwnedMessage<T>> {
        &self.inbound
    }
}

impl<T: MessageKind> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            error!(host, port, error = %e, "address resolution failed");
            WireError::Io(e)
        })?
        .next()
        .ok_or_else(|| WireError::ConfigError(constants::ERR_BAD_ADDRESS.into()))
}

/// Body of the I/O thread: connect, then run the connection to completion.
async fn io_main<T: MessageKind>(
    conn: Arc<Connection<T>>,
    addr: SocketAddr,
    inbound: Arc<SharedDeque<OwnedMessage<T>>>,
) {
    let mut closing = conn.closing();
    if *closing.borrow_and_update() {
        return;
    }

    let stream = tokio::select! {
        _ = closing.changed() => return,
        result = TcpStream::connect(addr) => match result {
            Ok(stream) => stream,
            Err(e) => {
                error!(peer = %addr, error = %e, "connect failed");
                return;
            }
        }
    };

    conn.mark_connected();
    info!(peer = %addr, "connected");

    connection::run(conn, stream, inbound, None).await;
}
