//! The hand-off between the vector producer and the controller.
//!
//! Every channel holds a single message. A producer that pushes a second
//! input before the controller drained the first blocks until it has, and
//! every receive waits without a timeout. The controller's own publishes
//! never block: a message the producer has not yet taken is reported as a
//! backlog instead.

use crate::codec::{RawVector, VECTOR_BYTES};

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The other side of the channel has been torn down.
    #[error("transport disconnected")]
    Disconnected,
    /// The producer has not taken the previous outbound message yet.
    #[error("outbound slot is still occupied")]
    Backlog,
    /// A raw vector of the wrong width reached the boundary.
    #[error("raw vector is {len} bytes, expected {expected}")]
    Malformed { len: usize, expected: usize },
}

/// A message from the controller back to the producer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// A training cycle completed.
    Ack,
    /// The encoded actuator decision of an inference cycle.
    Decision(RawVector),
}

/// The controller's view of the transport.
pub trait Transport {
    /// Blocks until the next raw input vector arrives.
    fn recv_input(&mut self) -> Result<RawVector, TransportError>;

    /// Publishes an actuator decision without blocking.
    fn send_output(&mut self, raw: RawVector) -> Result<(), TransportError>;

    /// Signals that a training cycle completed, without blocking.
    fn acknowledge(&mut self) -> Result<(), TransportError>;

    /// Blocks until the producer confirms it consumed the last decision.
    fn wait_ack(&mut self) -> Result<(), TransportError>;
}

/// Controller end of a channel transport.
#[derive(Debug)]
pub struct ChannelTransport {
    inputs: Receiver<RawVector>,
    outputs: SyncSender<Outbound>,
    acks: Receiver<()>,
}

/// Producer end of a channel transport.
#[derive(Debug)]
pub struct Producer {
    inputs: SyncSender<RawVector>,
    outputs: Receiver<Outbound>,
    acks: SyncSender<()>,
}

/// Creates a connected producer/controller pair of single-slot channels.
pub fn channel() -> (Producer, ChannelTransport) {
    let (input_tx, input_rx) = mpsc::sync_channel(1);
    let (output_tx, output_rx) = mpsc::sync_channel(1);
    let (ack_tx, ack_rx) = mpsc::sync_channel(1);
    let producer = Producer {
        inputs: input_tx,
        outputs: output_rx,
        acks: ack_tx,
    };
    let transport = ChannelTransport {
        inputs: input_rx,
        outputs: output_tx,
        acks: ack_rx,
    };
    (producer, transport)
}

fn publish(outputs: &SyncSender<Outbound>, message: Outbound) -> Result<(), TransportError> {
    outputs.try_send(message).map_err(|e| match e {
        TrySendError::Full(_) => TransportError::Backlog,
        TrySendError::Disconnected(_) => TransportError::Disconnected,
    })
}

impl Transport for ChannelTransport {
    fn recv_input(&mut self) -> Result<RawVector, TransportError> {
        self.inputs.recv().map_err(|_| TransportError::Disconnected)
    }

    fn send_output(&mut self, raw: RawVector) -> Result<(), TransportError> {
        publish(&self.outputs, Outbound::Decision(raw))
    }

    fn acknowledge(&mut self) -> Result<(), TransportError> {
        publish(&self.outputs, Outbound::Ack)
    }

    fn wait_ack(&mut self) -> Result<(), TransportError> {
        self.acks.recv().map_err(|_| TransportError::Disconnected)
    }
}

impl Producer {
    /// Pushes a raw input vector, blocking while the previous one has not
    /// been taken.
    pub fn send_input(&self, raw: RawVector) -> Result<(), TransportError> {
        self.inputs
            .send(raw)
            .map_err(|_| TransportError::Disconnected)
    }

    /// Validates the width of `bytes` before pushing them as a raw vector.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let raw = RawVector::try_from(bytes).map_err(|_| TransportError::Malformed {
            len: bytes.len(),
            expected: VECTOR_BYTES,
        })?;
        self.send_input(raw)
    }

    /// Blocks until the controller posts its next outbound message.
    pub fn recv_output(&self) -> Result<Outbound, TransportError> {
        self.outputs.recv().map_err(|_| TransportError::Disconnected)
    }

    /// Confirms that the last decision was consumed.
    pub fn send_ack(&self) -> Result<(), TransportError> {
        self.acks.send(()).map_err(|_| TransportError::Disconnected)
    }
}
