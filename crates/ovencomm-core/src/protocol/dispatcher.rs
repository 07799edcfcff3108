//! Dispatch state machine
//!
//! Owns the command queue, the receive buffer and the response timer, and
//! decides when the head of the queue goes on the wire. A request is only
//! written while the dispatcher is idle, so responses can be matched to
//! commands purely by queue order.

use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use super::frame::{self, Decoded};
use super::{
    Command, CommandQueue, LineFault, ProtocolError, TimeoutSupervisor, Transport, TransportError,
};

/// Notifications emitted by the protocol engine, in the order they occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OvenEvent {
    /// A command failed; `command` is [`Command::None`] if nothing was pending
    Error {
        /// What went wrong
        error: ProtocolError,
        /// The command the error relates to
        command: Command,
    },
    /// A command completed with a verified response value
    Value {
        /// Raw decoded value (0..=65535)
        value: u16,
        /// The command this value answers
        command: Command,
    },
    /// A well-shaped response frame arrived (checksum not yet verified)
    RawFrame(Vec<u8>),
    /// The link was closed because of a fatal transport fault
    Disconnected {
        /// Description of the fault
        reason: String,
    },
}

/// Dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing on the wire
    Idle,
    /// A request was written and its response is pending
    AwaitingResponse,
}

/// Result of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Nothing was sent (busy, empty queue)
    Nothing,
    /// The head request was written
    Sent,
    /// Writing failed and the head request was dropped
    Failed {
        /// The failure requires the link to be closed
        fatal: bool,
    },
}

/// Protocol state machine for one oven link
#[derive(Debug)]
pub struct Dispatcher {
    queue: CommandQueue,
    buffer: Vec<u8>,
    timer: TimeoutSupervisor,
    state: DispatchState,
    events: UnboundedSender<OvenEvent>,
}

impl Dispatcher {
    /// Create an idle dispatcher that reports on `events`
    pub fn new(response_timeout: Duration, events: UnboundedSender<OvenEvent>) -> Self {
        Self {
            queue: CommandQueue::new(),
            buffer: Vec::new(),
            timer: TimeoutSupervisor::new(response_timeout),
            state: DispatchState::Idle,
            events,
        }
    }

    /// Current state
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Pending requests, head first
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Bytes received for the in-flight request so far
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Queue a request; it is sent by a later [`Dispatcher::dispatch`]
    pub fn enqueue(&mut self, command: Command, payload: u16) {
        trace!("enqueue {} payload={:#06x}", command, payload);
        self.queue.enqueue(command, payload);
    }

    /// Report an error for a request that was never queued
    pub fn reject(&self, error: ProtocolError, command: Command) {
        debug!("rejecting {}: {}", command, error);
        self.emit(OvenEvent::Error { error, command });
    }

    /// Write the head request if the link is idle
    pub fn dispatch<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now: Instant,
    ) -> Dispatched {
        if self.state != DispatchState::Idle || self.timer.is_running() {
            return Dispatched::Nothing;
        }
        let Some(request) = self.queue.head() else {
            return Dispatched::Nothing;
        };

        if !transport.is_open() {
            self.fail_head(ProtocolError::NotOpen);
            return Dispatched::Failed { fatal: false };
        }

        let bytes = frame::encode_request(request.command, request.payload);
        debug!(
            "sending {}: {:?}",
            request.command,
            String::from_utf8_lossy(&bytes)
        );

        match transport.write(&bytes) {
            Ok(()) => {
                self.buffer.clear();
                self.timer.start(now);
                self.state = DispatchState::AwaitingResponse;
                Dispatched::Sent
            }
            Err(TransportError::NotOpen) => {
                self.fail_head(ProtocolError::NotOpen);
                Dispatched::Failed { fatal: false }
            }
            Err(TransportError::Fault { fault, message }) => {
                let fatal = self.on_line_fault(fault, message);
                Dispatched::Failed { fatal }
            }
        }
    }

    /// Feed received bytes into the frame buffer
    pub fn on_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.state != DispatchState::AwaitingResponse {
            debug!(
                "discarding {} unsolicited bytes: {:?}",
                bytes.len(),
                String::from_utf8_lossy(bytes)
            );
            return;
        }

        self.buffer.extend_from_slice(bytes);

        match frame::try_decode(&self.buffer) {
            Decoded::Incomplete => {}
            Decoded::Invalid => {
                trace!(
                    "receive buffer does not form a frame: {:?}",
                    String::from_utf8_lossy(&self.buffer)
                );
            }
            Decoded::Frame(response) => {
                self.emit(OvenEvent::RawFrame(self.buffer.clone()));
                self.timer.stop();

                match response.verify() {
                    Ok(value) => {
                        self.buffer.clear();
                        let command = self
                            .queue
                            .drop_head()
                            .map(|r| r.command)
                            .unwrap_or(Command::None);
                        self.state = DispatchState::Idle;
                        debug!("{} -> {}", command, value);
                        self.emit(OvenEvent::Value { value, command });
                    }
                    Err(error) => self.fail_head(error),
                }
            }
        }
    }

    /// Report a timeout if the in-flight request is overdue
    ///
    /// Returns `true` if a timeout was reported.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        if self.state != DispatchState::AwaitingResponse || !self.timer.is_expired(now) {
            return false;
        }

        let error = ProtocolError::ResponseTimeout {
            timeout_ms: self.timer.interval().as_millis() as u64,
            received: self.buffer.len(),
        };
        self.fail_head(error);
        true
    }

    /// Handle a fault reported by the transport
    ///
    /// Returns `true` if the fault is fatal and the link must be closed.
    pub fn on_line_fault(&mut self, fault: LineFault, message: impl Into<String>) -> bool {
        let message = message.into();
        warn!("transport {} fault: {}", fault, message);
        self.fail_head(ProtocolError::TransportFault { fault, message });
        fault.is_fatal()
    }

    /// Check for an overdue response, then dispatch the next request
    pub fn tick<T: Transport + ?Sized>(&mut self, transport: &mut T, now: Instant) -> Dispatched {
        self.poll_timeout(now);
        self.dispatch(transport, now)
    }

    /// Drop all pending work and return to idle
    pub fn reset(&mut self) {
        if !self.queue.is_empty() {
            debug!("discarding {} pending requests", self.queue.len());
        }
        self.queue.clear();
        self.buffer.clear();
        self.timer.stop();
        self.state = DispatchState::Idle;
    }

    /// Emit a notification
    pub(crate) fn emit(&self, event: OvenEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.events.send(event);
    }

    fn fail_head(&mut self, error: ProtocolError) {
        self.timer.stop();
        self.buffer.clear();
        let command = self
            .queue
            .drop_head()
            .map(|r| r.command)
            .unwrap_or(Command::None);
        self.state = DispatchState::Idle;
        debug!("{} failed: {}", command, error);
        self.emit(OvenEvent::Error { error, command });
    }
}
