//! Demo Mode - Simulated oven controller for testing
//!
//! Answers request frames the way a real controller does, so the protocol
//! engine and the CLI can run without hardware. The oven heats toward its
//! set point while powered and cools toward ambient otherwise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::protocol::frame::{encode_response, sum8};
use crate::protocol::{
    Command, LineFault, PortConfig, Transport, TransportError, REQUEST_FRAME_LEN,
};
use crate::values::{payload_to_temperature, temperature_to_payload, OUTPUT_FULL_SCALE};

/// Room temperature the oven cools toward
const AMBIENT_C: f64 = 20.0;

/// Fraction of the remaining temperature gap closed per request
const HEAT_RATE: f64 = 0.1;

/// Simulated oven controller implementing [`Transport`]
pub struct DemoOven {
    open: bool,
    current_temp: f64,
    set_point: f64,
    power_on: bool,
    sensor_ok: bool,
    /// Partial request bytes written by the host
    inbox: Vec<u8>,
    /// Response bytes waiting to be read by the host
    outbox: Vec<u8>,
    corrupt_next: bool,
    silent_next: bool,
    pending_fault: Option<TransportError>,
    received: Vec<(Command, u16)>,
    rng: StdRng,
}

impl Default for DemoOven {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoOven {
    /// Create a cold, powered-off oven
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an oven with reproducible temperature noise
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            open: false,
            current_temp: AMBIENT_C,
            set_point: 0.0,
            power_on: false,
            sensor_ok: true,
            inbox: Vec::new(),
            outbox: Vec::new(),
            corrupt_next: false,
            silent_next: false,
            pending_fault: None,
            received: Vec::new(),
            rng,
        }
    }

    /// Send a wrong checksum in the next response
    pub fn corrupt_next_response(&mut self) {
        self.corrupt_next = true;
    }

    /// Do not answer the next request
    pub fn drop_next_response(&mut self) {
        self.silent_next = true;
    }

    /// Report `fault` on the next read
    pub fn inject_fault(&mut self, fault: LineFault, message: impl Into<String>) {
        self.pending_fault = Some(TransportError::fault(fault, message));
    }

    /// Report the temperature sensor as failed or healthy
    pub fn set_sensor_ok(&mut self, ok: bool) {
        self.sensor_ok = ok;
    }

    /// Current simulated temperature
    pub fn temperature(&self) -> f64 {
        self.current_temp
    }

    /// Current set point
    pub fn set_point(&self) -> f64 {
        self.set_point
    }

    /// Whether the heater is powered
    pub fn is_powered(&self) -> bool {
        self.power_on
    }

    /// Every valid request received so far
    pub fn received(&self) -> &[(Command, u16)] {
        &self.received
    }

    /// Parse complete request frames out of the inbox
    fn process_inbox(&mut self) {
        while let Some(end) = self.inbox.iter().position(|b| *b == b'\r') {
            let frame: Vec<u8> = self.inbox.drain(..=end).collect();
            match parse_request(&frame) {
                Some((command, payload)) => self.handle(command, payload),
                None => debug!(
                    "demo oven ignoring malformed request {:?}",
                    String::from_utf8_lossy(&frame)
                ),
            }
        }
    }

    fn handle(&mut self, command: Command, payload: u16) {
        self.received.push((command, payload));
        self.step();

        let value = match command {
            Command::GetTemp => temperature_to_payload(self.current_temp).unwrap_or_default(),
            Command::GetSetTemp => temperature_to_payload(self.set_point).unwrap_or_default(),
            Command::GetOutput => self.output(),
            Command::GetSensorStatus => u16::from(self.sensor_ok),
            Command::GetPowerStatus => u16::from(self.power_on),
            Command::SetTemp => {
                self.set_point = payload_to_temperature(payload);
                payload
            }
            Command::SetPowerStatus => {
                self.power_on = payload != 0;
                payload
            }
            Command::None => return,
        };

        if self.silent_next {
            self.silent_next = false;
            return;
        }

        let mut response = encode_response(value);
        if self.corrupt_next {
            self.corrupt_next = false;
            // Off by one so it can never match
            let bad = sum8(&response[1..5]).wrapping_add(1);
            response[5..7].copy_from_slice(format!("{:02x}", bad).as_bytes());
        }
        self.outbox.extend_from_slice(&response);
    }

    /// Advance the thermal model by one request
    fn step(&mut self) {
        let target = if self.power_on && self.sensor_ok {
            self.set_point
        } else {
            AMBIENT_C
        };
        let noise: f64 = self.rng.gen_range(-0.05..0.05);
        self.current_temp += (target - self.current_temp) * HEAT_RATE + noise;
    }

    /// Heater output proportional to the remaining gap, full scale at 10 °C
    fn output(&self) -> u16 {
        if !self.power_on || !self.sensor_ok {
            return 0;
        }
        let gap = (self.set_point - self.current_temp).clamp(0.0, 10.0);
        (gap / 10.0 * OUTPUT_FULL_SCALE as f64) as u16
    }
}

/// Parse `*CCDDDDKK\r`, returning `None` for anything malformed
fn parse_request(frame: &[u8]) -> Option<(Command, u16)> {
    if frame.len() != REQUEST_FRAME_LEN || frame[0] != b'*' {
        return None;
    }
    let text = std::str::from_utf8(&frame[1..9]).ok().filter(|t| t.is_ascii())?;
    let code: u8 = text[0..2].parse().ok()?;
    let payload = u16::from_str_radix(&text[2..6], 16).ok()?;
    let checksum = u8::from_str_radix(&text[6..8], 16).ok()?;

    if checksum != sum8(&frame[1..7]) {
        return None;
    }
    Some((Command::from_code(code)?, payload))
}

impl Transport for DemoOven {
    fn open(&mut self, config: &PortConfig) -> Result<(), TransportError> {
        debug!("demo oven opened as {:?}", config.port_name);
        self.open = true;
        self.inbox.clear();
        self.outbox.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.inbox.clear();
        self.outbox.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.inbox.extend_from_slice(data);
        self.process_inbox();
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if let Some(fault) = self.pending_fault.take() {
            return Err(fault);
        }
        Ok(std::mem::take(&mut self.outbox))
    }
}
