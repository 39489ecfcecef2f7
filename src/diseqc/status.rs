//! # Positioner Status
//!
//! Decoding of the DiSEqC 2.2 "read positioner status" reply.
//!
//! The status byte is the first data byte after the `0xE4` reply framing:
//!
//! | Bit | Mask | Meaning |
//! |-----|------|---------|
//! | 7 | 0x80 | movement complete |
//! | 6 | 0x40 | software limits enabled |
//! | 5 | 0x20 | moving west |
//! | 4 | 0x10 | motor running |
//! | 3 | 0x08 | software limit reached |
//! | 2 | 0x04 | no power |
//! | 1 | 0x02 | hardware limit reached |
//! | 0 | 0x01 | no reference position |

use super::protocol::*;
use crate::error::{DiseqcError, Result};

pub const MOVEMENT_COMPLETE: u8 = 0x80;
pub const SOFT_LIMITS_ENABLED: u8 = 0x40;
pub const MOVING_WEST: u8 = 0x20;
pub const MOTOR_RUNNING: u8 = 0x10;
pub const SOFT_LIMIT_REACHED: u8 = 0x08;
pub const NO_POWER: u8 = 0x04;
pub const HARD_LIMIT_REACHED: u8 = 0x02;
pub const NO_REFERENCE_POSITION: u8 = 0x01;

/// Raw positioner status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionerStatus(pub u8);

impl PositionerStatus {
    pub fn movement_complete(&self) -> bool {
        self.0 & MOVEMENT_COMPLETE != 0
    }

    pub fn soft_limits_enabled(&self) -> bool {
        self.0 & SOFT_LIMITS_ENABLED != 0
    }

    pub fn moving_west(&self) -> bool {
        self.0 & MOVING_WEST != 0
    }

    pub fn motor_running(&self) -> bool {
        self.0 & MOTOR_RUNNING != 0
    }

    pub fn soft_limit_reached(&self) -> bool {
        self.0 & SOFT_LIMIT_REACHED != 0
    }

    pub fn no_power(&self) -> bool {
        self.0 & NO_POWER != 0
    }

    pub fn hard_limit_reached(&self) -> bool {
        self.0 & HARD_LIMIT_REACHED != 0
    }

    pub fn no_reference_position(&self) -> bool {
        self.0 & NO_REFERENCE_POSITION != 0
    }

    /// True when the positioner has stopped: movement complete, hard limit
    /// reached, or motor no longer running
    pub fn is_stopped(&self) -> bool {
        self.movement_complete() || self.hard_limit_reached() || !self.motor_running()
    }
}

/// Decode a slave reply to `RD_POS_STATUS`
///
/// # Errors
///
/// Returns `Protocol` if the reply framing is not `0xE4` or no status byte follows
pub fn decode_status_reply(reply: &ReplyFrame) -> Result<PositionerStatus> {
    match reply.framing() {
        Some(SLAVE_REPLY_OK) => reply
            .data()
            .first()
            .map(|&status| PositionerStatus(status))
            .ok_or_else(|| DiseqcError::Protocol("status reply carries no data byte".to_string())),
        Some(SLAVE_REPLY_UNSUPPORTED) => Err(DiseqcError::Protocol(
            "positioner does not support status reporting".to_string(),
        )),
        Some(SLAVE_REPLY_PARITY_ERR) => Err(DiseqcError::Protocol(
            "positioner reported a parity error".to_string(),
        )),
        Some(SLAVE_REPLY_CMD_UNKNOWN) => Err(DiseqcError::Protocol(
            "positioner did not recognise the command".to_string(),
        )),
        Some(other) => Err(DiseqcError::Protocol(format!(
            "unexpected reply framing 0x{:02x}",
            other
        ))),
        None => Err(DiseqcError::Protocol("empty slave reply".to_string())),
    }
}
