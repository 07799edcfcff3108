//! Typed readings
//!
//! Converts raw 16-bit response values into engineering units, and
//! temperatures into request payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::{Command, ProtocolError};

/// Raw output value that corresponds to 100% output
pub const OUTPUT_FULL_SCALE: u16 = 28800;

/// Temperatures travel as hundredths of a degree
const TEMPERATURE_SCALE: f64 = 100.0;

/// A response value interpreted for the command it answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// Temperature in °C (current or set point)
    Temperature(f64),
    /// Heater output in percent
    OutputPercent(f64),
    /// Sensor or power status flag
    Status(bool),
    /// Echo of a set command's value
    Acknowledged(u16),
}

impl Reading {
    /// Interpret `raw` as the answer to `command`
    pub fn from_response(command: Command, raw: u16) -> Option<Reading> {
        let reading = match command {
            Command::GetTemp | Command::GetSetTemp => {
                Reading::Temperature(payload_to_temperature(raw))
            }
            Command::GetOutput => {
                Reading::OutputPercent(raw as f64 / OUTPUT_FULL_SCALE as f64 * 100.0)
            }
            Command::GetSensorStatus | Command::GetPowerStatus => Reading::Status(raw != 0),
            Command::SetTemp | Command::SetPowerStatus => Reading::Acknowledged(raw),
            Command::None => return None,
        };
        Some(reading)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Temperature(c) => write!(f, "{:.2} °C", c),
            Reading::OutputPercent(p) => write!(f, "{:.1} %", p),
            Reading::Status(true) => f.write_str("on"),
            Reading::Status(false) => f.write_str("off"),
            Reading::Acknowledged(raw) => write!(f, "ok ({})", raw),
        }
    }
}

/// Encode a temperature as a request payload
///
/// Negative temperatures are sent as 16-bit two's complement.
pub fn temperature_to_payload(celsius: f64) -> Result<u16, ProtocolError> {
    if !celsius.is_finite() {
        return Err(ProtocolError::InvalidPayload(format!(
            "temperature {} is not a number",
            celsius
        )));
    }

    let hundredths = (celsius * TEMPERATURE_SCALE).round();
    if hundredths < i16::MIN as f64 || hundredths > i16::MAX as f64 {
        return Err(ProtocolError::InvalidPayload(format!(
            "temperature {} °C is outside {:.2}..={:.2} °C",
            celsius,
            i16::MIN as f64 / TEMPERATURE_SCALE,
            i16::MAX as f64 / TEMPERATURE_SCALE
        )));
    }

    Ok(hundredths as i16 as u16)
}

/// Decode a temperature payload into °C
pub fn payload_to_temperature(raw: u16) -> f64 {
    raw as i16 as f64 / TEMPERATURE_SCALE
}

/// Encode a power status flag as a request payload
pub fn status_to_payload(on: bool) -> u16 {
    u16::from(on)
}
