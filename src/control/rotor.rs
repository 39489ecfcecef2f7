//! # Rotor Controller
//!
//! DiSEqC 1.2 positioner control with optional DiSEqC 2.2 status polling.
//!
//! A move drives the dish to a stored satellite slot, then waits for the
//! time the slew should take at 18 V. While the positioner answers status
//! queries the wait ends as soon as it reports a stop. The first failed query
//! switches the [`RotorState`] to blind timing for good.
//!
//! ## Move sequence
//!
//! ```text
//! tone off -> 15ms -> 18V -> 15ms -> (15ms -> goto N) x2
//!   -> poll up to ceil(angle / 2.4) times
//!   -> tone (band) -> 15ms -> voltage (polarization) -> 15ms
//! ```

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::diseqc::protocol::*;
use crate::diseqc::status::{decode_status_reply, PositionerStatus};
use crate::error::Result;
use crate::frontend::{FrontendIo, Sleeper};
use crate::satellite::SatelliteCatalog;
use crate::transport::{BusTransport, SETTLE_DELAY};

/// Slew speed at 18 V, degrees per second
pub const SLEW_SPEED_18V: f64 = 2.4;

/// Rotation assumed when the current position is unknown
pub const UNKNOWN_ROTATION_DEG: f64 = 180.0;

/// Wait per poll iteration without status support
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait before each status query: one poll interval less the bus exchange
pub const STATUS_POLL_DELAY: Duration = Duration::from_micros(917_500);

/// Default slave reply timeout for status queries
pub const STATUS_REPLY_TIMEOUT: Duration = Duration::from_millis(150);

/// Transmissions per positioner command
pub const ROTOR_COMMAND_REPEATS: usize = 2;

/// Motor drive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Run until halted or a limit is hit
    Continuous,
    /// Run for `n` steps
    Steps(u8),
}

impl DriveMode {
    fn data(self) -> u8 {
        match self {
            DriveMode::Continuous => 0x00,
            // Step counts are sent as 256 - n
            DriveMode::Steps(n) => n.wrapping_neg(),
        }
    }
}

/// Positioner command for the polar/azimuth positioner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotorCommand {
    Halt,
    DisableLimits,
    EnableLimits,
    SetEastLimit,
    SetWestLimit,
    DriveEast(DriveMode),
    DriveWest(DriveMode),
    StorePosition(u8),
    GotoPosition(u8),
    /// Recalculate stored positions relative to slot `n`
    Recalculate(u8),
    /// Drive to angle, two bytes of `nn.n` encoding
    GotoAngle(u8, u8),
}

impl RotorCommand {
    /// Build the master command frame
    pub fn to_frame(&self) -> CommandFrame {
        let (command, data, len): (u8, [u8; 2], usize) = match *self {
            RotorCommand::Halt => (CMD_HALT, [0, 0], 3),
            RotorCommand::DisableLimits => (CMD_LIMITS_OFF, [0, 0], 3),
            RotorCommand::SetEastLimit => (CMD_LIMIT_EAST, [0, 0], 3),
            RotorCommand::SetWestLimit => (CMD_LIMIT_WEST, [0, 0], 3),
            RotorCommand::DriveEast(mode) => (CMD_DRIVE_EAST, [mode.data(), 0], 4),
            RotorCommand::DriveWest(mode) => (CMD_DRIVE_WEST, [mode.data(), 0], 4),
            RotorCommand::StorePosition(n) => (CMD_STORE_SAT_POS, [n, 0], 4),
            RotorCommand::GotoPosition(n) => (CMD_GOTO_SAT_POS_NN, [n, 0], 4),
            RotorCommand::Recalculate(n) => (CMD_SET_POSNS, [n, 0], 4),
            // Storing slot 0 re-enables the soft limits
            RotorCommand::EnableLimits => (CMD_STORE_SAT_POS, [0, 0], 4),
            RotorCommand::GotoAngle(hi, lo) => (CMD_GOTO_ANGLE_NN_N, [hi, lo], 5),
        };

        CommandFrame::from_raw(
            [
                MASTER_CMD_NO_RESPONSE,
                ADDR_POSITIONER_POLAR_AZIMUTH,
                command,
                data[0],
                data[1],
                0x00,
            ],
            len,
        )
    }
}

impl RotorCommand {
    /// True for commands that start the motor
    pub fn drives_motor(&self) -> bool {
        matches!(
            self,
            RotorCommand::DriveEast(_)
                | RotorCommand::DriveWest(_)
                | RotorCommand::GotoPosition(_)
                | RotorCommand::GotoAngle(..)
        )
    }
}

/// Last phase of the positioning state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotorPhase {
    Idle,
    /// Goto command being sent
    Moving,
    /// Waiting for the positioner to arrive
    Confirming,
    Done,
    Failed,
}

/// How a [`move_to`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Target has no satellite, nothing was sent
    Ignored,
    /// Already at the target, only tone and voltage were restored
    AlreadyInPosition,
    /// Positioner reported a stop after `polls` iterations
    Confirmed { polls: u32 },
    /// Time budget of `polls` iterations ran out without a confirmed stop
    Assumed { polls: u32 },
}

/// Positioner state owned by one bus
#[derive(Debug, Clone)]
pub struct RotorState {
    /// Rotor slot the dish points at, negative if unknown
    pub current_position: i32,
    /// Slot of the last requested move
    pub target_position: i32,
    /// Cleared for good on the first failed status query
    pub diseqc2x_supported: bool,
    pub phase: RotorPhase,
    /// Slave reply timeout for status queries
    pub reply_timeout: Duration,
}

impl RotorState {
    /// Uncalibrated state: position unknown, status polling enabled
    pub fn new() -> Self {
        Self {
            current_position: -1,
            target_position: -1,
            diseqc2x_supported: true,
            phase: RotorPhase::Idle,
            reply_timeout: STATUS_REPLY_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn position_known(&self) -> bool {
        self.current_position >= 0
    }
}

impl Default for RotorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotation between two dish angles along the shorter arc, degrees
///
/// `from` is `None` when the current position is unknown.
pub fn rotation_angle(from: Option<f64>, to: f64) -> f64 {
    match from {
        None => UNKNOWN_ROTATION_DEG,
        Some(from) => {
            let diff = (to - from).abs();
            if diff > 180.0 {
                360.0 - diff
            } else {
                diff
            }
        }
    }
}

/// Number of one-second poll iterations for a rotation
pub fn poll_budget(rotation_deg: f64) -> u32 {
    (rotation_deg / SLEW_SPEED_18V).ceil() as u32
}

/// Send a positioner command, repeated, each transmission after a settle delay
///
/// Tone and voltage are left untouched, so the tone must already be off.
///
/// # Errors
///
/// Returns `Transport` on the first failed transmission
pub async fn send_rotor_command<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    command: RotorCommand,
) -> Result<()> {
    let frame = command.to_frame();
    debug!("rotor command {:?}", command);

    for repeat in 0..ROTOR_COMMAND_REPEATS {
        bus.delay(SETTLE_DELAY).await;
        bus.send_frame(&frame, repeat).await?;
    }
    Ok(())
}

/// Send a positioner command on its own, outside a [`move_to`]
///
/// The tone is switched off first, and commands that start the motor raise the
/// supply to 18 V. Tone and voltage are left that way afterwards.
///
/// # Errors
///
/// Returns `Transport` on the first failed step
pub async fn command_positioner<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    command: RotorCommand,
) -> Result<()> {
    bus.tone_off().await?;
    bus.delay(SETTLE_DELAY).await;
    if command.drives_motor() {
        // 18 V for fast slew
        bus.set_voltage(Voltage::V18).await?;
        bus.delay(SETTLE_DELAY).await;
    }
    send_rotor_command(bus, command).await
}

/// Switch the tone off, then read the positioner status
///
/// # Errors
///
/// Same as [`query_status`], plus `Transport` if the tone cannot be switched off
pub async fn read_positioner_status<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    timeout: Duration,
) -> Result<PositionerStatus> {
    bus.tone_off().await?;
    bus.delay(SETTLE_DELAY).await;
    query_status(bus, timeout).await
}

/// Read the positioner status (DiSEqC 2.2)
///
/// The tone must already be off.
/// # Errors
///
/// Returns `Transport` if sending or receiving fails, `Protocol` if the reply
/// is not an OK reply with a status byte
pub async fn query_status<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    timeout: Duration,
) -> Result<PositionerStatus> {
    let request = CommandFrame::from_raw(
        [
            MASTER_CMD_WITH_RESPONSE,
            ADDR_POSITIONER_POLAR_AZIMUTH,
            CMD_RD_POS_STATUS,
            0x00,
            0x00,
            0x00,
        ],
        3,
    );

    bus.send_frame(&request, 0).await?;
    let reply = bus.recv_reply(timeout).await?;
    let status = decode_status_reply(&reply)?;
    debug!("positioner status 0x{:02x}", status.0);
    Ok(status)
}

/// Rotate the dish to the satellite stored at rotor slot `target`
///
/// The new position is committed once the positioner reports a stop or the
/// expected slew time has passed, whichever comes first. Tone and voltage are
/// restored afterwards in every branch that moves or stays.
///
/// # Arguments
///
/// * `bus` - Bus transport of the tuner driving the positioner
/// * `catalog` - Satellite lookup by rotor slot
/// * `state` - Positioner state of this bus
/// * `target` - Rotor slot to drive to
/// * `use_18v` - Voltage to restore afterwards
/// * `hiband` - Tone to restore afterwards
///
/// # Errors
///
/// Returns `Hardware` if the goto command or the tone/voltage restoration
/// fails. An unknown target is not an error.
pub async fn move_to<F, S, C>(
    bus: &mut BusTransport<F, S>,
    catalog: &C,
    state: &mut RotorState,
    target: i32,
    use_18v: bool,
    hiband: bool,
) -> Result<MoveOutcome>
where
    F: FrontendIo,
    S: Sleeper,
    C: SatelliteCatalog + ?Sized,
{
    let target_sat = match catalog.lookup_satellite(target) {
        Some(sat) if target >= 0 => sat,
        _ => {
            warn!("Rotor position {} has no satellite, ignored", target);
            return Ok(MoveOutcome::Ignored);
        }
    };
    state.target_position = target;

    let outcome = if target == state.current_position {
        info!("Rotor already at {} (rotor position {})", target_sat.name, target);
        MoveOutcome::AlreadyInPosition
    } else {
        let from_sat = if state.position_known() {
            catalog.lookup_satellite(state.current_position)
        } else {
            None
        };

        match &from_sat {
            Some(from) => info!(
                "Moving rotor from {} (rotor position {}) to {} (rotor position {})",
                from.name, from.rotor_position, target_sat.name, target_sat.rotor_position
            ),
            None => info!(
                "Initializing rotor to {} (rotor position {})",
                target_sat.name, target_sat.rotor_position
            ),
        }

        let angle = rotation_angle(from_sat.map(|s| s.angle()), target_sat.angle());
        let budget = poll_budget(angle);
        info!(
            "Expected rotation {:.2}deg ({:.1} sec)",
            angle,
            angle / SLEW_SPEED_18V
        );

        state.phase = RotorPhase::Moving;
        if let Err(e) = start_move(bus, target_sat.rotor_position).await {
            state.phase = RotorPhase::Failed;
            return Err(e.into_hardware());
        }

        state.phase = RotorPhase::Confirming;
        let outcome = wait_for_stop(bus, state, budget).await;
        state.current_position = target;
        info!("Rotation completed ({:?})", outcome);
        outcome
    };

    if let Err(e) = restore_tone_and_voltage(bus, use_18v, hiband).await {
        state.phase = RotorPhase::Failed;
        return Err(e.into_hardware());
    }

    state.phase = RotorPhase::Done;
    Ok(outcome)
}

async fn start_move<F: FrontendIo, S: Sleeper>(bus: &mut BusTransport<F, S>, slot: u8) -> Result<()> {
    command_positioner(bus, RotorCommand::GotoPosition(slot)).await
}

async fn wait_for_stop<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    state: &mut RotorState,
    budget: u32,
) -> MoveOutcome {
    for poll in 0..budget {
        if state.diseqc2x_supported {
            bus.delay(STATUS_POLL_DELAY).await;
            match query_status(bus, state.reply_timeout).await {
                Ok(status) if status.is_stopped() => {
                    return MoveOutcome::Confirmed { polls: poll + 1 };
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Positioner status unavailable ({}), using timed positioning", e);
                    state.diseqc2x_supported = false;
                }
            }
        } else {
            bus.delay(POLL_INTERVAL).await;
        }
        debug!("{} s remaining", budget - poll - 1);
    }

    MoveOutcome::Assumed { polls: budget }
}

async fn restore_tone_and_voltage<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    use_18v: bool,
    hiband: bool,
) -> Result<()> {
    bus.set_tone(ToneMode::for_band(hiband)).await?;
    bus.delay(SETTLE_DELAY).await;
    bus.set_voltage(Voltage::from_18v(use_18v)).await?;
    bus.delay(SETTLE_DELAY).await;
    Ok(())
}
