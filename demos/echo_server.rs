//! Demo server: accepts everyone, echoes pings back to their sender, and
//! broadcasts a liveness check once a minute.
//!
//! Run with `cargo run --example echo_server`, then point one or more
//! `ping_client` instances at it.

use std::sync::Arc;
use std::time::Instant;

use gamewire::{Connection, Message, MessageKind, Server, ServerHandler};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Ping,
    Check,
}

impl MessageKind for Msg {
    fn to_wire(self) -> u32 {
        match self {
            Msg::Ping => 0,
            Msg::Check => 1,
        }
    }

    fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Msg::Ping),
            1 => Some(Msg::Check),
            _ => None,
        }
    }
}

struct GameServer;

impl ServerHandler<Msg> for GameServer {
    fn on_client_connect(&self, _client: &Arc<Connection<Msg>>) -> bool {
        true
    }

    fn on_client_validated(&self, client: &Arc<Connection<Msg>>) {
        info!(id = client.id(), peer = %client.peer_addr(), "player joined");
    }

    fn on_client_disconnect(&self, client: &Arc<Connection<Msg>>) {
        info!(id = client.id(), "player left");
    }

    fn on_message(&self, client: &Arc<Connection<Msg>>, message: Message<Msg>) {
        match message.header.id {
            Msg::Ping => {
                info!(id = client.id(), "ping");
                client.send(message);
            }
            Msg::Check => {}
        }
    }
}

fn main() -> gamewire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut server = Server::new(60000, 1.0, GameServer);
    server.start()?;

    let started = Instant::now();
    let mut checks_sent = 0;

    loop {
        server.update(usize::MAX, true);

        let minutes = started.elapsed().as_secs() / 60;
        if minutes > checks_sent {
            checks_sent = minutes;
            info!("liveness sweep");
            server.message_all_clients(&Message::new(Msg::Check), None);
        }
    }
}
