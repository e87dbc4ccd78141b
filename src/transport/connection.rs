//! # Connection
//!
//! One socket's full-duplex state machine:
//! `Disconnected → Handshake → Validated(streaming) → Closed`.
//!
//! A [`Connection`] is the shared handle; the socket itself lives inside a
//! single task on the endpoint's I/O runtime. That task drives the
//! handshake and then runs exactly one read pipeline and one write
//! pipeline concurrently, so there is never more than one in-flight
//! operation per direction:
//!
//! - The read pipeline decodes a fixed-size header, then the body, wraps
//!   the completed message with its provenance, pushes it onto the shared
//!   inbound queue, and immediately re-arms. Any read error closes the
//!   socket and stops the loop - no retry.
//! - The write pipeline drains the outbound queue one message at a time in
//!   FIFO order, sleeping on a wake signal when the queue runs dry. Any
//!   write error closes the socket.
//!
//! Callers on application threads interact only through thread-safe
//! surfaces: [`Connection::send`] enqueues and wakes the writer,
//! [`Connection::disconnect`] posts a close request that the I/O task
//! observes, and [`Connection::is_connected`] reflects live socket state.
//! Socket mutation happens exclusively on the I/O thread.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::core::codec::MessageCodec;
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::error::{constants, Result, WireError};
use crate::protocol::handshake::{self, Scramble};
use crate::utils::SharedDeque;

/// Which endpoint owns this connection. The role decides handshake
/// direction and whether inbound messages carry provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Callback fired on the I/O thread once a server-side handshake passes.
pub(crate) type ValidatedCallback<T> = Box<dyn FnOnce(&Arc<Connection<T>>) + Send>;

/// Shared handle to one socket's state machine.
pub struct Connection<T: MessageKind> {
    role: Role,
    id: AtomicU32,
    peer_addr: SocketAddr,
    scramble: Arc<dyn Scramble>,
    challenge: u64,
    expected: u64,
    outbound: SharedDeque<Message<T>>,
    writer_wake: Notify,
    closing_tx: watch::Sender<bool>,
    closing_rx: watch::Receiver<bool>,
    connected: AtomicBool,
    max_payload: usize,
}

impl<T: MessageKind> Connection<T> {
    /// Creates the server-side handle for a freshly accepted socket.
    ///
    /// The challenge and its expected scrambled response are fixed here,
    /// before any bytes move, so validation later is a plain comparison.
    pub(crate) fn server(
        peer_addr: SocketAddr,
        scramble: Arc<dyn Scramble>,
        max_payload: usize,
    ) -> Self {
        let challenge = handshake::clock_challenge();
        let expected = scramble.scramble(challenge);
        let (closing_tx, closing_rx) = watch::channel(false);
        Self {
            role: Role::Server,
            id: AtomicU32::new(0),
            peer_addr,
            scramble,
            challenge,
            expected,
            outbound: SharedDeque::new(),
            writer_wake: Notify::new(),
            closing_tx,
            closing_rx,
            connected: AtomicBool::new(true),
            max_payload,
        }
    }

    /// Creates the client-side handle. The client issues no challenge; it
    /// answers the server's.
    pub(crate) fn client(
        peer_addr: SocketAddr,
        scramble: Arc<dyn Scramble>,
        max_payload: usize,
    ) -> Self {
        let (closing_tx, closing_rx) = watch::channel(false);
        Self {
            role: Role::Client,
            id: AtomicU32::new(0),
            peer_addr,
            scramble,
            challenge: 0,
            expected: 0,
            outbound: SharedDeque::new(),
            writer_wake: Notify::new(),
            closing_tx,
            closing_rx,
            connected: AtomicBool::new(false),
            max_payload,
        }
    }

    /// Server-assigned identity; zero on the client side.
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Relaxed)
    }

    pub(crate) fn assign_id(&self, id: u32) {
        self.id.store(id, Ordering::Relaxed);
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the underlying socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Enqueues a message for transmission and wakes the writer.
    ///
    /// All sends to one connection are FIFO; at most one write is in
    /// flight at any time.
    pub fn send(&self, message: Message<T>) {
        self.outbound.push_back(message);
        self.writer_wake.notify_one();
    }

    /// Posts a close request. Safe from any thread; the I/O task observes
    /// it and tears the socket down. Idempotent.
    pub fn disconnect(&self) {
        let _ = self.closing_tx.send(true);
    }

    pub(crate) fn closing(&self) -> watch::Receiver<bool> {
        self.closing_rx.clone()
    }

    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::Relaxed);
    }

    fn mark_closed(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

/// Drives one connection from handshake to teardown.
///
/// Runs as a single task on the endpoint's I/O runtime. Returning drops
/// the stream, which closes the socket.
pub(crate) async fn run<T: MessageKind>(
    conn: Arc<Connection<T>>,
    stream: TcpStream,
    inbound: Arc<SharedDeque<OwnedMessage<T>>>,
    on_validated: Option<ValidatedCallback<T>>,
) {
    let mut closing = conn.closing();
    if *closing.borrow_and_update() {
        // Disconnected before the task got scheduled.
        conn.mark_closed();
        return;
    }

    tokio::select! {
        _ = closing.changed() => {
            debug!(id = conn.id(), "connection closed locally");
        }
        () = drive(&conn, stream, &inbound, on_validated) => {}
    }

    conn.mark_closed();
    debug!(id = conn.id(), peer = %conn.peer_addr(), "connection terminated");
}

async fn drive<T: MessageKind>(
    conn: &Arc<Connection<T>>,
    mut stream: TcpStream,
    inbound: &Arc<SharedDeque<OwnedMessage<T>>>,
    on_validated: Option<ValidatedCallback<T>>,
) {
    let handshake = match conn.role {
        Role::Server => server_handshake(conn, &mut stream).await,
        Role::Client => client_handshake(conn, &mut stream).await,
    };

    if let Err(e) = handshake {
        // Handshake failures are silent towards the application: the
        // socket closes and the connection is discarded.
        error!(id = conn.id(), peer = %conn.peer_addr(), error = %e, "handshake failed");
        return;
    }

    if conn.role == Role::Server {
        info!(id = conn.id(), peer = %conn.peer_addr(), "client validated");
    }
    if let Some(notify) = on_validated {
        notify(conn);
    }

    let (rd, wr) = stream.into_split();
    let reader = FramedRead::new(rd, MessageCodec::<T>::new(conn.max_payload));
    let writer = FramedWrite::new(wr, MessageCodec::<T>::new(conn.max_payload));

    // Both pipelines run concurrently on this one task; whichever stops
    // first (error or EOF) tears down the other with it.
    tokio::select! {
        () = read_pipeline(conn, reader, inbound) => {}
        () = write_pipeline(conn, writer) => {}
    }
}

/// Server side: issue the challenge, read the echo, compare.
async fn server_handshake<T: MessageKind>(
    conn: &Connection<T>,
    stream: &mut TcpStream,
) -> Result<()> {
    stream.write_all(&conn.challenge.to_ne_bytes()).await?;

    let mut raw = [0u8; 8];
    stream.read_exact(&mut raw).await?;
    let response = u64::from_ne_bytes(raw);

    if response == conn.expected {
        Ok(())
    } else {
        Err(WireError::HandshakeError(
            constants::ERR_VALIDATION_MISMATCH.into(),
        ))
    }
}

/// Client side: read the challenge, scramble it, echo it back.
async fn client_handshake<T: MessageKind>(
    conn: &Connection<T>,
    stream: &mut TcpStream,
) -> Result<()> {
    let mut raw = [0u8; 8];
    stream.read_exact(&mut raw).await?;

    let response = conn.scramble.scramble(u64::from_ne_bytes(raw));
    stream.write_all(&response.to_ne_bytes()).await?;
    Ok(())
}

async fn read_pipeline<T: MessageKind>(
    conn: &Arc<Connection<T>>,
    mut reader: FramedRead<OwnedReadHalf, MessageCodec<T>>,
    inbound: &Arc<SharedDeque<OwnedMessage<T>>>,
) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(message) => {
                let remote = match conn.role {
                    Role::Server => Some(Arc::clone(conn)),
                    Role::Client => None,
                };
                inbound.push_back(OwnedMessage { remote, message });
            }
            Err(e) => {
                error!(id = conn.id(), peer = %conn.peer_addr(), error = %e, "read failed");
                return;
            }
        }
    }

    debug!(id = conn.id(), "peer closed the stream");
}

async fn write_pipeline<T: MessageKind>(
    conn: &Arc<Connection<T>>,
    mut writer: FramedWrite<OwnedWriteHalf, MessageCodec<T>>,
) {
    loop {
        while let Some(message) = conn.outbound.pop_front() {
            if let Err(e) = writer.send(message).await {
                error!(id = conn.id(), peer = %conn.peer_addr(), error = %e, "write failed");
                return;
            }
        }

        // `notify_one` stores a permit, so a send racing this await is not
        // lost - the next `notified()` completes immediately.
        conn.writer_wake.notified().await;
    }
}
