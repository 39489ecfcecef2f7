//! # diseqc-ctl Library
//!
//! Drive DiSEqC switches, rotors and Unicable (SCR) routers from a DVB-S frontend.
//!
//! This library encodes switch, positioner and channel routing requests into
//! DiSEqC master commands and sequences the voltage, tone, frame and burst
//! steps the equipment expects.

pub mod config;
pub mod control;
pub mod diseqc;
pub mod error;
pub mod frontend;
pub mod lnb;
pub mod satellite;
pub mod transport;
