//! Demo client: pings the echo server once a second with a timestamp and
//! reports the measured round-trip time.
//!
//! Run with `cargo run --example ping_client` against a running
//! `echo_server`.

use std::time::{Duration, Instant};

use gamewire::{Client, Message, MessageKind};
use tracing::{error, info};

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

fn main() -> gamewire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut client = Client::<Msg>::new(1.0);
    client.connect("127.0.0.1", 60000)?;

    let started = Instant::now();
    while !client.is_connected() {
        if started.elapsed() > Duration::from_secs(5) {
            error!("could not reach the server");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    info!("connected");

    loop {
        let mut ping = Message::new(Msg::Ping);
        ping.push(started.elapsed().as_secs_f32());
        client.send(ping)?;

        std::thread::sleep(Duration::from_secs(1));

        while let Some(mut owned) = client.incoming().pop_front() {
            match owned.message.header.id {
                Msg::Ping => {
                    let then: f32 = owned.message.pop()?;
                    let rtt = started.elapsed().as_secs_f32() - then;
                    info!(rtt_secs = rtt, "pong");
                }
                Msg::Check => info!("server liveness check"),
            }
        }

        if !client.is_connected() {
            info!("server down");
            break;
        }
    }

    client.disconnect();
    Ok(())
}
