//! # Satellite Channel Routing
//!
//! Unicable (EN 50494) and Unicable II (EN 50607) user band programming.
//!
//! The receiver asks the routing switch to translate the wanted transponder
//! onto a fixed user band, then tunes to that user band plus the reported
//! offset.
//!
//! ## EN 50494 (revision A)
//!
//! ```text
//! E0 10 5A D0 D1 [PIN]      (5C with PIN)
//! D0: SSS P V B TT          slot, sat position, pol, band, tuning word 9..8
//! D1: TTTTTTTT              tuning word 7..0
//! ```
//!
//! ## EN 50607 (revision B)
//!
//! ```text
//! 70 D0 D1 D2 [PIN]         (71 with PIN)
//! D0: SSSSS TTT             slot, tuning word 10..8
//! D1: TTTTTTTT              tuning word 7..0
//! D2: position | V<<5 | B<<4 | V<<1 | B
//! ```

use std::time::Duration;
use tracing::{debug, info};

use crate::diseqc::protocol::*;
use crate::error::{DiseqcError, Result};
use crate::frontend::{FrontendIo, Sleeper};
use crate::lnb::{LnbParams, Transponder};
use crate::transport::BusTransport;

/// Dwell after switching to 18 V and after the frame
pub const SCR_DWELL: Duration = Duration::from_millis(5);

/// Gap between repeated tune frames
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Intermediate frequency range the routing switch accepts, MHz
pub const IF_MIN_MHZ: u32 = 950;
pub const IF_MAX_MHZ: u32 = 2150;

/// Revision A fVCO value that switches the user band off
const VCO_OFF_MHZ: u32 = 1400;

/// Routing protocol revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrNorm {
    /// EN 50494, 8 slots, 4 MHz tuning steps
    En50494,
    /// EN 50607, 32 slots, 1 MHz tuning steps
    En50607,
}

impl ScrNorm {
    /// Highest slot the revision can address
    pub fn max_slot(&self) -> u8 {
        match self {
            ScrNorm::En50494 => 7,
            ScrNorm::En50607 => 31,
        }
    }
}

impl TryFrom<u8> for ScrNorm {
    type Error = DiseqcError;

    fn try_from(norm: u8) -> Result<Self> {
        match norm {
            1 => Ok(ScrNorm::En50494),
            2 => Ok(ScrNorm::En50607),
            other => Err(DiseqcError::FatalConfig(format!("unknown SCR norm '{}'", other))),
        }
    }
}

/// Routing switch setup of one receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrConfig {
    /// 1 = EN 50494, 2 = EN 50607
    pub norm: u8,
    /// User band slot
    pub slot: u8,
    /// Satellite position bits, layout depends on `norm`
    pub position: u8,
    /// User band center frequency, MHz
    pub user_frequency: u16,
    /// User band PIN; values of 256 and above mean no PIN
    pub pin: u16,
}

impl ScrConfig {
    /// Marker for "no PIN"
    pub const NO_PIN: u16 = 256;

    /// Build a config from a satellite position letter
    ///
    /// `A`/`B` select EN 50494 positions 0/1. `a` to `p` select EN 50607
    /// positions 0 to 15.
    ///
    /// # Errors
    ///
    /// Returns `FatalConfig` for any other letter
    pub fn from_position_letter(slot: u8, user_frequency: u16, letter: char, pin: Option<u8>) -> Result<Self> {
        let (norm, position) = match letter {
            'A' => (1, 0),
            'B' => (1, 1),
            'a'..='p' => {
                let k = letter as u8 - b'a';
                (2, (k / 4) << 6 | (k % 4) << 2)
            }
            other => {
                return Err(DiseqcError::FatalConfig(format!(
                    "unknown SCR satellite position '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            norm,
            slot,
            position,
            user_frequency,
            pin: pin.map_or(Self::NO_PIN, u16::from),
        })
    }

    pub fn pin(&self) -> Option<u8> {
        u8::try_from(self.pin).ok()
    }

    fn checked_norm(&self) -> Result<ScrNorm> {
        let norm = ScrNorm::try_from(self.norm)?;
        if self.slot > norm.max_slot() {
            return Err(DiseqcError::InvalidArgument(format!(
                "SCR slot {} outside 0..={} for {:?}",
                self.slot,
                norm.max_slot(),
                norm
            )));
        }
        Ok(norm)
    }
}

/// Encoded channel change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrTuning {
    pub frame: CommandFrame,
    /// MHz to add to the user band frequency when tuning
    pub offset: i32,
    pub user_frequency: u16,
}

impl ScrTuning {
    /// Frequency the receiver must tune to, MHz
    pub fn tune_frequency_mhz(&self) -> i32 {
        self.user_frequency as i32 + self.offset
    }
}

/// Intermediate frequency of a transponder in MHz, rounded
pub fn intermediate_frequency_mhz(transponder: &Transponder, lnb: &LnbParams) -> u32 {
    let hiband = lnb.is_hiband(transponder.frequency_khz);
    let oscillator = lnb.local_oscillator(hiband);
    (transponder.frequency_khz.abs_diff(oscillator) as f64 / 1000.0).round() as u32
}

fn if_in_range(f_if: u32) -> bool {
    (IF_MIN_MHZ..=IF_MAX_MHZ).contains(&f_if)
}

/// Build the channel change frame for a transponder
///
/// # Errors
///
/// Returns `FatalConfig` for an unknown norm and `InvalidArgument` for a slot
/// the norm cannot address
pub fn encode_tuning(transponder: &Transponder, lnb: &LnbParams, config: &ScrConfig) -> Result<ScrTuning> {
    let norm = config.checked_norm()?;
    let hiband = lnb.is_hiband(transponder.frequency_khz) as u8;
    let horizontal = transponder.polarization.is_horizontal() as u8;
    let f_if = intermediate_frequency_mhz(transponder, lnb);

    let (frame, offset) = match norm {
        ScrNorm::En50494 => {
            let f_vco = if if_in_range(f_if) {
                f_if + config.user_frequency as u32
            } else {
                VCO_OFF_MHZ
            };
            let word = (f_vco as f64 / 4.0 - 350.0).round().clamp(0.0, 0x3FF as f64) as u16;

            let d0 = config.slot << 5
                | (config.position & 1) << 4
                | horizontal << 3
                | hiband << 2
                | ((word >> 8) & 0x03) as u8;
            let d1 = (word & 0xFF) as u8;

            // Residual of the 4 MHz VCO stepping
            let offset = (word as i32 + 350) * 4 - f_vco as i32;
            (en50494_frame(config, d0, d1), offset)
        }
        ScrNorm::En50607 => {
            let word: u16 = if if_in_range(f_if) {
                (f_if - 100).min(0x7FF) as u16
            } else {
                0
            };

            let d0 = config.slot << 3 | ((word >> 8) & 0x07) as u8;
            let d1 = (word & 0xFF) as u8;
            let d2 = config.position | hiband | horizontal << 1 | hiband << 4 | horizontal << 5;

            (en50607_frame(config, d0, d1, d2), 0)
        }
    };

    debug!("SCR fIF {} MHz, {:?}, frame {}", f_if, norm, frame);
    Ok(ScrTuning {
        frame,
        offset,
        user_frequency: config.user_frequency,
    })
}

/// Build the frame that releases the user band
///
/// # Errors
///
/// Same as [`encode_tuning`]
pub fn encode_power_off(config: &ScrConfig) -> Result<CommandFrame> {
    match config.checked_norm()? {
        ScrNorm::En50494 => Ok(en50494_frame(config, config.slot << 5, 0)),
        ScrNorm::En50607 => Ok(en50607_frame(config, config.slot << 3, 0, config.position)),
    }
}

fn en50494_frame(config: &ScrConfig, d0: u8, d1: u8) -> CommandFrame {
    match config.pin() {
        Some(pin) => CommandFrame::from_raw(
            [MASTER_CMD_NO_RESPONSE, ADDR_ANY_LNB, CMD_ODU_CHANNEL_CHANGE_PIN, d0, d1, pin],
            6,
        ),
        None => CommandFrame::from_raw(
            [MASTER_CMD_NO_RESPONSE, ADDR_ANY_LNB, CMD_ODU_CHANNEL_CHANGE, d0, d1, 0x00],
            5,
        ),
    }
}

fn en50607_frame(config: &ScrConfig, d0: u8, d1: u8, d2: u8) -> CommandFrame {
    match config.pin() {
        Some(pin) => CommandFrame::from_raw([EN50607_CHANNEL_CHANGE_PIN, d0, d1, d2, pin, 0x00], 5),
        None => CommandFrame::from_raw([EN50607_CHANNEL_CHANGE, d0, d1, d2, 0x00, 0x00], 4),
    }
}

/// Send one routing frame: tone off, 18 V, frame, back to 13 V
///
/// No tone burst is sent.
pub async fn send_scr_frame<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    frame: &CommandFrame,
) -> Result<()> {
    bus.tone_off().await?;
    bus.set_voltage(Voltage::V18).await?;
    bus.delay(SCR_DWELL).await;
    bus.send_frame(frame, 0).await?;
    bus.delay(SCR_DWELL).await;
    bus.set_voltage(Voltage::V13).await
}

/// Program the routing switch for a transponder
///
/// # Errors
///
/// Returns `FatalConfig` or `InvalidArgument` before any hardware call if the
/// config is unusable, `Transport` if a step fails
pub async fn compute_tuning<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    transponder: &Transponder,
    lnb: &LnbParams,
    config: &ScrConfig,
) -> Result<ScrTuning> {
    let tuning = encode_tuning(transponder, lnb, config)?;
    send_scr_frame(bus, &tuning.frame).await?;
    info!(
        "SCR slot {}: tune to {} MHz (offset {} MHz)",
        config.slot,
        tuning.tune_frequency_mhz(),
        tuning.offset
    );
    Ok(tuning)
}

/// Program the routing switch `repeat` times, [`REPEAT_INTERVAL`] apart
///
/// The switch never acknowledges, so the request is simply sent again.
pub async fn tune<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    transponder: &Transponder,
    lnb: &LnbParams,
    config: &ScrConfig,
    repeat: u32,
) -> Result<ScrTuning> {
    let mut tuning = compute_tuning(bus, transponder, lnb, config).await?;
    for _ in 1..repeat {
        bus.delay(REPEAT_INTERVAL).await;
        tuning = compute_tuning(bus, transponder, lnb, config).await?;
    }
    Ok(tuning)
}

/// Release the user band
pub async fn power_off<F: FrontendIo, S: Sleeper>(bus: &mut BusTransport<F, S>, config: &ScrConfig) -> Result<()> {
    let frame = encode_power_off(config)?;
    send_scr_frame(bus, &frame).await?;
    info!("SCR slot {} released", config.slot);
    Ok(())
}
