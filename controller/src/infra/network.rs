//! TCP implementation of `LivenessProbe`.

use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpStream;

use crate::application::ports::LivenessProbe;

/// An agent is alive if its control port accepts a TCP connection.
pub struct TcpLivenessProbe {
    connect_timeout: Duration,
}

impl TcpLivenessProbe {
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl LivenessProbe for TcpLivenessProbe {
    async fn probe(&self, ip: &str, port: u16) -> Result<bool> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect((ip, port))).await {
            Ok(Ok(_stream)) => Ok(true),
            Ok(Err(e)) => {
                tracing::trace!(ip, port, error = %e, "connect failed");
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}
