//! chatrelay integration test harness.
//!
//! Each test starts its own relay in-process on `127.0.0.1:0` with a
//! throwaway SQLite file, then drives it with plain UDP client sockets.
//! Nothing here needs root or a network namespace.
//!
//!   cargo test --test integration

mod accounts;
mod blacklist;
mod failures;
mod messaging;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use chatrelay_core::config::RelayConfig;
use chatrelayd::{build_dispatcher, RelayServer};

pub const PASSWORD: &str = "password123";

/// How long a client waits for a datagram it expects.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client listens before concluding nothing is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

// ── Relay ─────────────────────────────────────────────────────────────────────

/// A relay running on a background task. Shuts down on drop.
pub struct Relay {
    pub addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    _db_dir: tempfile::TempDir,
}

impl Relay {
    pub async fn start() -> Result<Self> {
        let db_dir = tempfile::tempdir().context("failed to create temp dir")?;

        let mut config = RelayConfig::default();
        config.network.bind_addr = "127.0.0.1:0".parse()?;
        config.storage.database_path = db_dir.path().join("relay.db");

        let dispatcher = build_dispatcher(&config)?;
        let (shutdown, _) = broadcast::channel(1);
        let server = RelayServer::bind(
            config.network.bind_addr,
            dispatcher,
            config.network.max_datagram_size,
            shutdown.subscribe(),
        )
        .await?;
        let addr = server.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                eprintln!("relay exited with error: {e:#}");
            }
        });

        Ok(Self {
            addr,
            shutdown,
            _db_dir: db_dir,
        })
    }

    pub async fn client(&self) -> Result<Client> {
        Client::new(self.addr).await
    }

    /// A registered, logged-in client for `login`.
    pub async fn online_user(&self, login: &str) -> Result<Client> {
        let client = self.client().await?;
        expect_success(&client.register(login).await?)?;
        expect_success(&client.login(login).await?)?;
        Ok(client)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct Client {
    socket: UdpSocket,
    relay: SocketAddr,
}

impl Client {
    pub async fn new(relay: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .context("failed to bind client socket")?;
        Ok(Self { socket, relay })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send(&self, body: &Value) -> Result<()> {
        self.send_raw(body.to_string().as_bytes()).await
    }

    pub async fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        self.socket.send_to(bytes, self.relay).await?;
        Ok(())
    }

    /// Next datagram, or an error after [`RECV_TIMEOUT`].
    pub async fn recv(&self) -> Result<Value> {
        let mut buf = vec![0u8; 65_507];
        let (len, _) = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf))
            .await
            .context("timed out waiting for a datagram")??;
        serde_json::from_slice(&buf[..len]).context("relay sent invalid JSON")
    }

    /// Fails if anything arrives within [`QUIET_PERIOD`].
    pub async fn expect_nothing(&self) -> Result<()> {
        let mut buf = vec![0u8; 65_507];
        match tokio::time::timeout(QUIET_PERIOD, self.socket.recv_from(&mut buf)).await {
            Err(_) => Ok(()),
            Ok(Ok((len, _))) => bail!(
                "unexpected datagram: {}",
                String::from_utf8_lossy(&buf[..len])
            ),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    pub async fn request(&self, body: Value) -> Result<Value> {
        self.send(&body).await?;
        self.recv().await
    }

    pub async fn register(&self, login: &str) -> Result<Value> {
        self.request(json!({
            "Type": "Register",
            "Login": login,
            "Email": format!("{login}@example.com"),
            "Password": PASSWORD,
            "PasswordConfirm": PASSWORD,
        }))
        .await
    }

    pub async fn login(&self, login: &str) -> Result<Value> {
        self.request(json!({ "Type": "Login", "Login": login, "Password": PASSWORD }))
            .await
    }

    pub async fn logout(&self, login: &str) -> Result<Value> {
        self.request(json!({ "Type": "Logout", "Login": login })).await
    }

    /// Fire-and-forget: a successful send produces no reply.
    pub async fn send_message(&self, from: &str, to: &[&str], text: &str) -> Result<()> {
        self.send(&json!({
            "Type": "SendMessage",
            "SenderLogin": from,
            "Recipients": to,
            "Text": text,
        }))
        .await
    }
}

// ── Assertions ────────────────────────────────────────────────────────────────

pub fn expect_success(reply: &Value) -> Result<()> {
    if reply["Status"] != "Success" {
        bail!("expected Success, got {reply}");
    }
    Ok(())
}

pub fn expect_fail(reply: &Value, kind: &str, message: &str) -> Result<()> {
    if reply["Type"] != kind || reply["Status"] != "Fail" || reply["Message"] != message {
        bail!("expected {kind} Fail {message:?}, got {reply}");
    }
    Ok(())
}
