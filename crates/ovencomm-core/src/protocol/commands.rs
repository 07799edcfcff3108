//! Protocol commands
//!
//! Defines the commands understood by the oven controller and their wire codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol commands for oven communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// No command; used to tag errors that have no pending request
    None,

    /// Read the current temperature (code 01)
    GetTemp,

    /// Read the output level, 0..=28800 (code 03)
    GetOutput,

    /// Read the sensor status flag (code 04)
    GetSensorStatus,

    /// Read the temperature set point (code 30)
    GetSetTemp,

    /// Read the power status flag (code 35)
    GetPowerStatus,

    /// Write the temperature set point, payload is degrees x 100 (code 60)
    SetTemp,

    /// Switch power on or off, payload is 0/1 (code 65)
    SetPowerStatus,
}

/// Wire code table; the single source of truth for command codes
const CODE_TABLE: [(Command, u8); 8] = [
    (Command::None, 0),
    (Command::GetTemp, 1),
    (Command::GetOutput, 3),
    (Command::GetSensorStatus, 4),
    (Command::GetSetTemp, 30),
    (Command::GetPowerStatus, 35),
    (Command::SetTemp, 60),
    (Command::SetPowerStatus, 65),
];

impl Command {
    /// All commands, in code order
    pub const ALL: [Command; 8] = [
        Command::None,
        Command::GetTemp,
        Command::GetOutput,
        Command::GetSensorStatus,
        Command::GetSetTemp,
        Command::GetPowerStatus,
        Command::SetTemp,
        Command::SetPowerStatus,
    ];

    /// Get the two-digit decimal wire code
    pub fn code(&self) -> u8 {
        CODE_TABLE
            .iter()
            .find(|(cmd, _)| cmd == self)
            .map(|(_, code)| *code)
            .unwrap_or(0)
    }

    /// Look up a command by its wire code
    pub fn from_code(code: u8) -> Option<Command> {
        CODE_TABLE
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(cmd, _)| *cmd)
    }

    /// Check if this command carries a caller-supplied payload
    ///
    /// Read commands always send a zero payload.
    pub fn takes_payload(&self) -> bool {
        matches!(self, Command::SetTemp | Command::SetPowerStatus)
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Command::None => "NONE",
            Command::GetTemp => "GET_TEMP",
            Command::GetOutput => "GET_OUTPUT",
            Command::GetSensorStatus => "GET_SENSOR_STATUS",
            Command::GetSetTemp => "GET_SET_TEMP",
            Command::GetPowerStatus => "GET_POWER_STATUS",
            Command::SetTemp => "SET_TEMP",
            Command::SetPowerStatus => "SET_POWER_STATUS",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:02})", self.name(), self.code())
    }
}
