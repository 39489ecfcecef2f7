//! # DiSEqC Protocol Constants and Types
//!
//! Core protocol definitions for the DiSEqC bus (Eutelsat bus specification 4.2).
//!
//! A master command is `FRAMING ADDRESS COMMAND [DATA...]`, 3 to 6 bytes. The
//! frontend driver adds the parity bits and the 22 kHz modulation.

use crate::error::{DiseqcError, Result};

/// Master command, no reply required, first transmission
pub const MASTER_CMD_NO_RESPONSE: u8 = 0xE0;
/// Master command, no reply required, repeated transmission
pub const MASTER_CMD_NO_RESPONSE_REPEATED: u8 = 0xE1;
/// Master command, reply required, first transmission
pub const MASTER_CMD_WITH_RESPONSE: u8 = 0xE2;
/// Master command, reply required, repeated transmission
pub const MASTER_CMD_WITH_RESPONSE_REPEATED: u8 = 0xE3;
/// Slave reply: OK, data follows
pub const SLAVE_REPLY_OK: u8 = 0xE4;
/// Slave reply: command not supported by slave
pub const SLAVE_REPLY_UNSUPPORTED: u8 = 0xE5;
/// Slave reply: parity error, request repeat
pub const SLAVE_REPLY_PARITY_ERR: u8 = 0xE6;
/// Slave reply: command not recognised, request repeat
pub const SLAVE_REPLY_CMD_UNKNOWN: u8 = 0xE7;

/// Any device (address byte)
pub const ADDR_ANY_DEVICE: u8 = 0x00;
/// Any LNB, switcher or SMATV
pub const ADDR_ANY_LNB: u8 = 0x10;
/// LNB
pub const ADDR_LNB: u8 = 0x11;
/// Switcher with DC blocking
pub const ADDR_SWITCHER_DC_BLOCKING: u8 = 0x14;
/// Any positioner
pub const ADDR_ANY_POSITIONER: u8 = 0x30;
/// Polar / azimuth positioner
pub const ADDR_POSITIONER_POLAR_AZIMUTH: u8 = 0x31;
/// Elevation positioner
pub const ADDR_POSITIONER_ELEVATION: u8 = 0x32;

/// Reset all slaves
pub const CMD_RESET: u8 = 0x00;
/// Switch peripheral power supply off
pub const CMD_STANDBY: u8 = 0x02;
/// Switch peripheral power supply on
pub const CMD_POWER_ON: u8 = 0x03;
/// Write committed switches port group (N0)
pub const CMD_WR_N0_COMMITTED: u8 = 0x38;
/// Write uncommitted switches port group (N1)
pub const CMD_WR_N1_UNCOMMITTED: u8 = 0x39;
/// Unicable (EN 50494) ODU channel change
pub const CMD_ODU_CHANNEL_CHANGE: u8 = 0x5A;
/// Unicable (EN 50494) ODU power off
pub const CMD_ODU_POWER_OFF: u8 = 0x5B;
/// Unicable (EN 50494) ODU channel change with PIN
pub const CMD_ODU_CHANNEL_CHANGE_PIN: u8 = 0x5C;
/// Stop positioner movement
pub const CMD_HALT: u8 = 0x60;
/// Disable software limits
pub const CMD_LIMITS_OFF: u8 = 0x63;
/// Read positioner status (DiSEqC 2.2)
pub const CMD_RD_POS_STATUS: u8 = 0x64;
/// Set east limit at current position
pub const CMD_LIMIT_EAST: u8 = 0x66;
/// Set west limit at current position
pub const CMD_LIMIT_WEST: u8 = 0x67;
/// Drive motor east
pub const CMD_DRIVE_EAST: u8 = 0x68;
/// Drive motor west
pub const CMD_DRIVE_WEST: u8 = 0x69;
/// Store satellite position nn (0 enables limits)
pub const CMD_STORE_SAT_POS: u8 = 0x6A;
/// Drive to stored satellite position nn
pub const CMD_GOTO_SAT_POS_NN: u8 = 0x6B;
/// Drive to angle nn.n
pub const CMD_GOTO_ANGLE_NN_N: u8 = 0x6E;
/// Recalculate stored satellite positions
pub const CMD_SET_POSNS: u8 = 0x6F;

/// Unicable II (EN 50607) ODU channel change, no framing byte
pub const EN50607_CHANNEL_CHANGE: u8 = 0x70;
/// Unicable II (EN 50607) ODU channel change with PIN
pub const EN50607_CHANNEL_CHANGE_PIN: u8 = 0x71;

/// Shortest valid master command (framing + address + command)
pub const FRAME_MIN_LEN: usize = 3;
/// Longest valid master command (three data bytes)
pub const FRAME_MAX_LEN: usize = 6;
/// Longest slave reply the frontend API can return
pub const REPLY_MAX_LEN: usize = 4;

/// 22 kHz continuous tone state. On selects the high LNB band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMode {
    On,
    Off,
}

impl ToneMode {
    /// Tone state that selects the given LNB band
    pub fn for_band(hiband: bool) -> Self {
        if hiband {
            ToneMode::On
        } else {
            ToneMode::Off
        }
    }
}

/// LNB supply voltage. 18 V selects horizontal polarization and fast rotor slew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voltage {
    V13,
    V18,
}

impl Voltage {
    pub fn from_18v(use_18v: bool) -> Self {
        if use_18v {
            Voltage::V18
        } else {
            Voltage::V13
        }
    }
}

/// Mini-DiSEqC tone burst selecting satellite A or B on simple switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstSelector {
    A,
    B,
}

impl BurstSelector {
    /// Burst for a switch position: even positions are A, odd positions are B
    pub fn for_position(switch_position: u32) -> Self {
        if switch_position % 2 == 0 {
            BurstSelector::A
        } else {
            BurstSelector::B
        }
    }
}

/// DiSEqC master command frame
///
/// Fixed 6-byte buffer plus an explicit length, mirroring the driver's
/// `dvb_diseqc_master_cmd`. Bytes beyond `len` are always zero and never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    msg: [u8; FRAME_MAX_LEN],
    len: u8,
}

impl CommandFrame {
    /// Create a frame from framing, address, command and up to three data bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if more than three data bytes are given
    pub fn new(framing: u8, address: u8, command: u8, data: &[u8]) -> Result<Self> {
        if data.len() > FRAME_MAX_LEN - FRAME_MIN_LEN {
            return Err(DiseqcError::InvalidArgument(format!(
                "{} data bytes exceed maximum {}",
                data.len(),
                FRAME_MAX_LEN - FRAME_MIN_LEN
            )));
        }

        let mut msg = [0u8; FRAME_MAX_LEN];
        msg[0] = framing;
        msg[1] = address;
        msg[2] = command;
        msg[FRAME_MIN_LEN..FRAME_MIN_LEN + data.len()].copy_from_slice(data);

        Ok(Self {
            msg,
            len: (FRAME_MIN_LEN + data.len()) as u8,
        })
    }

    /// Build a frame from a raw buffer, for compile-time tables
    ///
    /// `len` must be within 3..=6; bytes past `len` are cleared.
    pub const fn from_raw(msg: [u8; FRAME_MAX_LEN], len: usize) -> Self {
        assert!(len >= FRAME_MIN_LEN && len <= FRAME_MAX_LEN);

        let mut clean = [0u8; FRAME_MAX_LEN];
        let mut i = 0;
        while i < len {
            clean[i] = msg[i];
            i += 1;
        }

        Self {
            msg: clean,
            len: len as u8,
        }
    }

    /// Create a frame from a byte slice of 3 to 6 bytes
    ///
    /// Used for the Unicable II frames, which carry no framing byte.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the slice length is outside 3..=6
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_MIN_LEN || bytes.len() > FRAME_MAX_LEN {
            return Err(DiseqcError::InvalidArgument(format!(
                "frame length {} outside {}..={}",
                bytes.len(),
                FRAME_MIN_LEN,
                FRAME_MAX_LEN
            )));
        }

        let mut msg = [0u8; FRAME_MAX_LEN];
        msg[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            msg,
            len: bytes.len() as u8,
        })
    }

    /// Meaningful bytes of the frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.msg[..self.len as usize]
    }

    /// Full 6-byte buffer, as handed to the driver
    pub fn raw(&self) -> &[u8; FRAME_MAX_LEN] {
        &self.msg
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Frames always carry at least three bytes
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn framing(&self) -> u8 {
        self.msg[0]
    }

    pub fn address(&self) -> u8 {
        self.msg[1]
    }

    pub fn command(&self) -> u8 {
        self.msg[2]
    }

    /// Data bytes following the command byte
    pub fn data(&self) -> &[u8] {
        &self.msg[FRAME_MIN_LEN..self.len as usize]
    }
}

impl std::fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// DiSEqC slave reply as returned by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyFrame {
    msg: [u8; REPLY_MAX_LEN],
    len: u8,
}

impl ReplyFrame {
    /// Create a reply from received bytes; anything past 4 bytes is dropped
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(REPLY_MAX_LEN);
        let mut msg = [0u8; REPLY_MAX_LEN];
        msg[..len].copy_from_slice(&bytes[..len]);
        Self { msg, len: len as u8 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.msg[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reply framing byte, `None` for an empty reply
    pub fn framing(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }

    /// Bytes following the framing byte
    pub fn data(&self) -> &[u8] {
        self.as_bytes().get(1..).unwrap_or(&[])
    }
}
