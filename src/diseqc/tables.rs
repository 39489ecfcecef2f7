//! # Switch Command Tables
//!
//! Precomputed DiSEqC 1.0/1.1 switch frames, built at compile time.
//!
//! ## Committed switches (N0, command 0x38)
//!
//! Indexed by `4 * switch_position + 2 * hiband + use_18v`:
//!
//! ```text
//! Data byte: 1111 PPVB
//!            |||| |||└─ B: band (1 = high)
//!            |||| ||└── V: polarization / voltage (1 = horizontal, 18 V)
//!            |||| └└─── PP: switch position (0-3)
//!            └└└└────── clear-all nibble
//! ```
//!
//! ## Uncommitted switches (N1, command 0x39)
//!
//! Indexed directly by the 4-bit port number: data byte `0xF0 | port`.

use super::protocol::*;
use crate::error::{DiseqcError, Result};

/// Number of committed switch frames (4 positions x 2 bands x 2 voltages)
pub const COMMITTED_SWITCH_COUNT: usize = 16;

/// Number of uncommitted switch frames (16 ports)
pub const UNCOMMITTED_SWITCH_COUNT: usize = 16;

/// Committed switch frames, see the module docs for the index formula
pub static COMMITTED_SWITCH_CMDS: [CommandFrame; COMMITTED_SWITCH_COUNT] = generate_committed_table();

/// Uncommitted switch frames, indexed by port
pub static UNCOMMITTED_SWITCH_CMDS: [CommandFrame; UNCOMMITTED_SWITCH_COUNT] = generate_uncommitted_table();

/// Generate committed switch table at compile time
const fn generate_committed_table() -> [CommandFrame; COMMITTED_SWITCH_COUNT] {
    let mut table = [CommandFrame::from_raw([0; FRAME_MAX_LEN], FRAME_MIN_LEN); COMMITTED_SWITCH_COUNT];
    let mut i = 0;

    while i < COMMITTED_SWITCH_COUNT {
        let position = (i / 4) as u8;
        let hiband = ((i >> 1) & 1) as u8;
        let horizontal = (i & 1) as u8;
        let data = 0xF0 | (position << 2) | (horizontal << 1) | hiband;

        table[i] = CommandFrame::from_raw(
            [MASTER_CMD_NO_RESPONSE, ADDR_ANY_LNB, CMD_WR_N0_COMMITTED, data, 0x00, 0x00],
            4,
        );
        i += 1;
    }

    table
}

/// Generate uncommitted switch table at compile time
const fn generate_uncommitted_table() -> [CommandFrame; UNCOMMITTED_SWITCH_COUNT] {
    let mut table = [CommandFrame::from_raw([0; FRAME_MAX_LEN], FRAME_MIN_LEN); UNCOMMITTED_SWITCH_COUNT];
    let mut i = 0;

    while i < UNCOMMITTED_SWITCH_COUNT {
        table[i] = CommandFrame::from_raw(
            [MASTER_CMD_NO_RESPONSE, ADDR_ANY_LNB, CMD_WR_N1_UNCOMMITTED, 0xF0 | i as u8, 0x00, 0x00],
            4,
        );
        i += 1;
    }

    table
}

/// Committed table index for a switch position, band and voltage
pub fn committed_index(switch_position: i32, hiband: bool, use_18v: bool) -> i64 {
    4 * switch_position as i64 + 2 * hiband as i64 + use_18v as i64
}

/// Look up a committed switch frame
///
/// # Errors
///
/// Returns `InvalidArgument` if `index` is outside the table
pub fn committed_frame(index: i64) -> Result<&'static CommandFrame> {
    lookup(&COMMITTED_SWITCH_CMDS, index, "committed switch")
}

/// Look up an uncommitted switch frame
///
/// # Errors
///
/// Returns `InvalidArgument` if `port` is outside the table
pub fn uncommitted_frame(port: i64) -> Result<&'static CommandFrame> {
    lookup(&UNCOMMITTED_SWITCH_CMDS, port, "uncommitted switch")
}

fn lookup(table: &'static [CommandFrame], index: i64, what: &str) -> Result<&'static CommandFrame> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .ok_or_else(|| {
            DiseqcError::InvalidArgument(format!(
                "{} index {} out of range 0..{}",
                what,
                index,
                table.len()
            ))
        })
}
