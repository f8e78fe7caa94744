//! Runs one network on one byte stream.
//!
//! The driver task exclusively owns the network: serial input, timer expiry
//! and requests from the web handlers are handled one at a time, and pending
//! output is written after each of them.

use crate::link::LinkError;
use crate::network::{Network, NetworkRequest};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serial link closed")]
    Closed,
}

impl DriverError {
    /// The form handed to a network's error callback.
    pub fn link_error(&self) -> LinkError {
        match self {
            DriverError::Io(e) => LinkError::from(e),
            DriverError::Closed => LinkError::Closed,
        }
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drives `network` until the port fails or every request sender is gone.
///
/// A port failure is first reported through
/// [`Network::on_transport_error`]. On return all queued requests have been
/// failed with [`LinkError::Closed`].
pub async fn run<N, P>(
    mut network: N,
    mut port: P,
    mut requests: mpsc::Receiver<NetworkRequest>,
) -> Result<(), DriverError>
where
    N: Network,
    P: AsyncRead + AsyncWrite + Unpin,
{
    let transport = network.transport();
    tracing::info!(transport, "link driver started");
    let mut buf = [0u8; 256];
    let result = loop {
        let output = network.take_output();
        if !output.is_empty() {
            if let Err(e) = port.write_all(&output).await {
                break Err(DriverError::from(e));
            }
            if let Err(e) = port.flush().await {
                break Err(DriverError::from(e));
            }
        }

        let deadline = network.deadline();
        tokio::select! {
            read = port.read(&mut buf) => match read {
                Ok(0) => break Err(DriverError::Closed),
                Ok(n) => network.receive(&buf[..n]),
                Err(e) => break Err(DriverError::from(e)),
            },
            _ = expiry(deadline) => network.on_timeout(),
            request = requests.recv() => match request {
                Some(request) => request.apply(&mut network),
                None => break Ok(()),
            },
        }
    };

    if let Err(e) = &result {
        network.on_transport_error(&e.link_error());
    }
    network.close();
    match &result {
        Ok(()) => tracing::info!(transport, "link driver stopped"),
        Err(e) => tracing::error!(transport, error = %e, "link driver failed"),
    }
    result
}
