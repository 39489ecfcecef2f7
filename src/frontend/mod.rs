//! # Frontend Module
//!
//! Boundary to the DVB frontend driver.
//!
//! This module handles:
//! - The `FrontendIo` trait over tone, voltage, burst and DiSEqC message ioctls
//! - The `Sleeper` trait for settle delays
//! - The Linux DVB API backend

pub mod io_trait;
#[cfg(target_os = "linux")]
pub mod linux;

pub use io_trait::{FrontendIo, Sleeper, TokioSleeper};

#[cfg(test)]
pub use io_trait::mocks;
