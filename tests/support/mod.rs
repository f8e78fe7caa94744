//! Scripted Z-Wave controller on the far end of an in-memory serial link.

#![allow(dead_code)]

use mesh_gateway::codec::zwave::ACK;
use mesh_gateway::codec::{Control, DataFrame, Decoded, FrameCodec, ZWaveCodec};
use mesh_gateway::link::driver::{self, DriverError};
use mesh_gateway::network::{Network, NetworkHandle};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const STEP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct FakeController {
    stream: DuplexStream,
    buf: Vec<u8>,
}

impl FakeController {
    /// Next frame or control symbol written by the gateway.
    pub async fn next(&mut self) -> Decoded<DataFrame> {
        loop {
            let step = ZWaveCodec.decode(&self.buf);
            if step != Decoded::NeedMore {
                self.buf.drain(..step.consumed());
                return step;
            }
            let mut chunk = [0u8; 64];
            let n = timeout(STEP_TIMEOUT, self.stream.read(&mut chunk))
                .await
                .expect("gateway went quiet")
                .expect("read from gateway");
            assert!(n > 0, "gateway closed the link");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    pub async fn expect_frame(&mut self) -> DataFrame {
        match self.next().await {
            Decoded::Frame(frame, _) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    pub async fn expect_ack(&mut self) {
        assert_eq!(self.next().await, Decoded::Control(Control::Ack));
    }

    /// True if the gateway writes nothing within `wait`.
    pub async fn is_quiet(&mut self, wait: Duration) -> bool {
        if !self.buf.is_empty() {
            return false;
        }
        let mut chunk = [0u8; 64];
        timeout(wait, self.stream.read(&mut chunk)).await.is_err()
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write to gateway");
    }

    pub async fn send_frame(&mut self, frame: DataFrame) {
        let bytes = ZWaveCodec.encode(&frame).expect("encodable frame");
        self.send(&bytes).await;
    }

    /// ACKs the last request, then sends `frame` and waits for its ACK.
    pub async fn answer(&mut self, frame: DataFrame) {
        self.send(&[ACK]).await;
        self.send_frame(frame).await;
        self.expect_ack().await;
    }
}

/// Runs `network` against a fake controller.
pub fn start<N: Network + 'static>(
    network: N,
) -> (NetworkHandle, FakeController, JoinHandle<Result<(), DriverError>>) {
    let (gateway_side, controller_side) = tokio::io::duplex(1024);
    let (handle, requests) = NetworkHandle::channel(8);
    let task = tokio::spawn(driver::run(network, gateway_side, requests));
    (handle, FakeController { stream: controller_side, buf: Vec::new() }, task)
}
