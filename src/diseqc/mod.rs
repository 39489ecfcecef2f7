//! # DiSEqC Protocol Module
//!
//! Frame model of the DiSEqC bus.
//!
//! This module handles:
//! - Framing, address and command byte constants
//! - Master command and slave reply frames
//! - Compile-time switch command tables
//! - Positioner status decoding

pub mod protocol;
pub mod tables;
pub mod status;
