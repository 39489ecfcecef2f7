//! # Control Module
//!
//! High-level peripheral operations built on the bus transport.
//!
//! This module handles:
//! - Committed/uncommitted switch selection
//! - DiSEqC 1.2 positioner commands and the closed-loop rotor move
//! - Unicable (EN 50494) and Unicable II (EN 50607) channel routing

pub mod rotor;
pub mod scr;
pub mod switch;

pub use rotor::{move_to, MoveOutcome, RotorCommand, RotorPhase, RotorState};
pub use scr::{ScrConfig, ScrNorm, ScrTuning};
pub use switch::select_switch;
