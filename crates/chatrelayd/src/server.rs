//! The relay loop: one datagram in, its outbound datagrams out, repeat.
//!
//! Datagrams are handled strictly one at a time; every outbound packet for a
//! datagram is sent before the next receive. Socket errors are logged and
//! the loop carries on. Only the shutdown signal ends it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use chatrelay_api::{Dispatcher, Outbound};

pub struct RelayServer {
    socket: Arc<UdpSocket>,
    dispatcher: Dispatcher,
    max_datagram_size: usize,
    shutdown: broadcast::Receiver<()>,
}

impl RelayServer {
    pub async fn bind(
        addr: SocketAddr,
        dispatcher: Dispatcher,
        max_datagram_size: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind relay socket on {addr}"))?;
        Ok(Self {
            socket: Arc::new(socket),
            dispatcher,
            max_datagram_size,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(mut self) -> Result<()> {
        let mut buf = vec![0u8; self.max_datagram_size];

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("relay shutting down");
                    return Ok(());
                }

                result = self.socket.recv_from(&mut buf) => {
                    let (len, src) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, "recv_from failed");
                            continue;
                        }
                    };

                    for out in self.dispatcher.handle(&buf[..len], src) {
                        self.transmit(out).await;
                    }
                }
            }
        }
    }

    async fn transmit(&self, out: Outbound) {
        let bytes = match out.packet.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(kind = out.packet.type_name(), error = %e, "failed to encode packet");
                return;
            }
        };
        match self.socket.send_to(&bytes, out.addr).await {
            Ok(_) => {
                tracing::trace!(to = %out.addr, kind = out.packet.type_name(), "sent");
            }
            Err(e) => {
                tracing::warn!(to = %out.addr, kind = out.packet.type_name(), error = %e, "send_to failed");
            }
        }
    }
}
