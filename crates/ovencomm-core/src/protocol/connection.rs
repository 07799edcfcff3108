//! Connection management
//!
//! [`OvenConnection`] is the API the front end talks to: it opens and
//! closes the link, turns each controller operation into a queued request,
//! and forwards transport input to the dispatcher on every service tick.

use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{info, warn};

use super::{
    Command, DispatchState, Dispatched, Dispatcher, LineFault, OvenEvent, PortConfig,
    ProtocolError, Transport, TransportError, DEFAULT_TIMEOUT_MS,
};
use crate::values::{status_to_payload, temperature_to_payload};

/// Receiving end of the event stream
pub type EventReceiver = UnboundedReceiver<OvenEvent>;

/// Protocol timing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// How long to wait for a complete response
    pub response_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Oven controller connection over a [`Transport`]
pub struct OvenConnection<T: Transport> {
    transport: T,
    dispatcher: Dispatcher,
    port: Option<PortConfig>,
}

impl<T: Transport> OvenConnection<T> {
    /// Create a closed connection and the receiver for its events
    pub fn new(transport: T, settings: ConnectionSettings) -> (Self, EventReceiver) {
        let (tx, rx) = unbounded_channel();
        let conn = Self {
            transport,
            dispatcher: Dispatcher::new(settings.response_timeout, tx),
            port: None,
        };
        (conn, rx)
    }

    /// Open the link
    pub fn open(&mut self, config: &PortConfig) -> Result<(), ProtocolError> {
        if self.is_open() {
            self.close();
        }
        self.dispatcher.reset();

        self.transport.open(config)?;
        self.port = Some(config.clone());
        info!("connected to {}", config.port_name);
        Ok(())
    }

    /// Close the link, discarding every pending request
    pub fn close(&mut self) {
        self.transport.close();
        self.dispatcher.reset();
        if let Some(port) = self.port.take() {
            info!("disconnected from {}", port.port_name);
        }
    }

    /// Check whether the link is open
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Settings the link was opened with
    pub fn port_config(&self) -> Option<&PortConfig> {
        self.port.as_ref()
    }

    /// Write a new temperature set point in °C
    pub fn set_temperature(&mut self, celsius: f64) {
        match temperature_to_payload(celsius) {
            Ok(payload) => self.request(Command::SetTemp, payload),
            Err(error) => self.dispatcher.reject(error, Command::SetTemp),
        }
    }

    /// Read the current temperature
    pub fn read_temperature(&mut self) {
        self.request(Command::GetTemp, 0);
    }

    /// Read the temperature set point
    pub fn read_set_temperature(&mut self) {
        self.request(Command::GetSetTemp, 0);
    }

    /// Read the heater output level
    pub fn read_output(&mut self) {
        self.request(Command::GetOutput, 0);
    }

    /// Read the sensor status flag
    pub fn read_sensor_status(&mut self) {
        self.request(Command::GetSensorStatus, 0);
    }

    /// Switch the heater power on or off
    pub fn set_power_status(&mut self, on: bool) {
        self.request(Command::SetPowerStatus, status_to_payload(on));
    }

    /// Read the power status flag
    pub fn read_power_status(&mut self) {
        self.request(Command::GetPowerStatus, 0);
    }

    /// Queue a request; rejected with [`ProtocolError::NotOpen`] while closed
    pub fn request(&mut self, command: Command, payload: u16) {
        if !self.is_open() {
            self.dispatcher.reject(ProtocolError::NotOpen, command);
            return;
        }
        self.dispatcher.enqueue(command, payload);
    }

    /// Process received bytes, check the response timer and send the next request
    pub fn service(&mut self, now: Instant) {
        if !self.is_open() {
            return;
        }

        match self.transport.read_available() {
            Ok(bytes) => self.dispatcher.on_bytes(&bytes),
            Err(TransportError::NotOpen) => {
                self.handle_line_fault(LineFault::Resource, "port closed unexpectedly");
                return;
            }
            Err(TransportError::Fault { fault, message }) => {
                let fatal = fault.is_fatal();
                self.handle_line_fault(fault, message);
                if fatal {
                    return;
                }
            }
        }

        let outcome = self.dispatcher.tick(&mut self.transport, now);
        if matches!(outcome, Dispatched::Failed { fatal: true }) {
            self.drop_link("write failed");
        }
    }

    /// Report a fault signalled by the transport outside of [`OvenConnection::service`]
    pub fn handle_line_fault(&mut self, fault: LineFault, message: impl Into<String>) {
        let message = message.into();
        if self.dispatcher.on_line_fault(fault, message.clone()) {
            self.drop_link(&message);
        }
    }

    /// Number of requests waiting or in flight
    pub fn pending(&self) -> usize {
        self.dispatcher.queue().len()
    }

    /// Current dispatcher state
    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn drop_link(&mut self, reason: &str) {
        warn!("closing link after fatal fault: {}", reason);
        self.close();
        self.dispatcher.emit(OvenEvent::Disconnected {
            reason: reason.to_string(),
        });
    }
}
