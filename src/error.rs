//! # Error Types
//!
//! Custom error types for diseqc-ctl using `thiserror`.

use std::fmt;
use std::io;

use thiserror::Error;

/// Hardware step of a bus transaction, reported with device failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStep {
    /// Switching the 22 kHz carrier off before transmission
    ToneOff,
    /// Setting the LNB supply voltage
    SetVoltage,
    /// Sending frame `n` (0-based) of a command sequence
    SendFrame(usize),
    /// Sending the mini-DiSEqC tone burst
    SendBurst,
    /// Setting the final 22 kHz tone state
    SetTone,
    /// Reading a slave reply
    ReceiveReply,
}

impl fmt::Display for TransportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStep::ToneOff => write!(f, "tone off"),
            TransportStep::SetVoltage => write!(f, "set voltage"),
            TransportStep::SendFrame(index) => write!(f, "send frame #{}", index),
            TransportStep::SendBurst => write!(f, "send tone burst"),
            TransportStep::SetTone => write!(f, "set tone"),
            TransportStep::ReceiveReply => write!(f, "receive reply"),
        }
    }
}

/// Main error type for diseqc-ctl
#[derive(Debug, Error)]
pub enum DiseqcError {
    /// Bad table index or port, a caller bug
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A frontend call failed while delivering a command sequence
    #[error("Transport fault at {step}: {source}")]
    Transport {
        step: TransportStep,
        #[source]
        source: io::Error,
    },

    /// Malformed or unexpected slave reply
    #[error("DiSEqC protocol error: {0}")]
    Protocol(String),

    /// Rotor positioning or tone/voltage restoration failed
    #[error("Hardware fault at {step}: {source}")]
    Hardware {
        step: TransportStep,
        #[source]
        source: io::Error,
    },

    /// Unusable setup, such as an unknown SCR revision
    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DiseqcError {
    /// Reclassify a transport fault as a hardware fault.
    ///
    /// Other variants are returned unchanged.
    pub fn into_hardware(self) -> Self {
        match self {
            DiseqcError::Transport { step, source } => DiseqcError::Hardware { step, source },
            other => other,
        }
    }
}

/// Result type alias for diseqc-ctl
pub type Result<T> = std::result::Result<T, DiseqcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_step_display() {
        assert_eq!(TransportStep::ToneOff.to_string(), "tone off");
        assert_eq!(TransportStep::SendFrame(2).to_string(), "send frame #2");
        assert_eq!(TransportStep::ReceiveReply.to_string(), "receive reply");
    }

    #[test]
    fn test_into_hardware_keeps_step() {
        let err = DiseqcError::Transport {
            step: TransportStep::SetVoltage,
            source: io::Error::new(io::ErrorKind::Other, "ioctl failed"),
        };

        match err.into_hardware() {
            DiseqcError::Hardware { step, .. } => assert_eq!(step, TransportStep::SetVoltage),
            other => panic!("Expected Hardware error, got: {:?}", other),
        }
    }

    #[test]
    fn test_into_hardware_leaves_other_variants() {
        let err = DiseqcError::InvalidArgument("port 99".to_string());
        assert!(matches!(err.into_hardware(), DiseqcError::InvalidArgument(_)));
    }

    #[test]
    fn test_error_message_includes_step() {
        let err = DiseqcError::Transport {
            step: TransportStep::SendBurst,
            source: io::Error::new(io::ErrorKind::Other, "EIO"),
        };
        let msg = err.to_string();
        assert!(msg.contains("send tone burst"));
        assert!(msg.contains("EIO"));
    }
}
