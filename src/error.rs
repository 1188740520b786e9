use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::GpsCommand;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Which side of the relay a channel is bound to
pub enum ChannelRole {
    /// The link to the GNSS receiver
    Receiver,
    /// The link to the character LCD
    Display,
}

impl Display for ChannelRole {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ChannelRole::Receiver => write!(f, "receiver"),
            ChannelRole::Display => write!(f, "display"),
        }
    }
}

#[derive(Error, Debug)]
/// Errors raised by the command encoder, the display and the relay loop
pub enum RelayError {
    /// The underlying transport failed while reading or writing
    #[error("{role} channel fault: {source}")]
    ChannelFault {
        /// The channel that failed
        role: ChannelRole,
        /// The transport error
        #[source]
        source: std::io::Error,
    },
    /// A serial device could not be opened or configured
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        /// Device path
        port: String,
        /// The serial driver error
        #[source]
        source: serialport::Error,
    },
    /// An encoded configuration frame does not have its documented length
    #[error("Frame for {command} is {actual} bytes, expected {declared}")]
    FrameLengthMismatch {
        /// The offending command
        command: GpsCommand,
        /// Documented frame length
        declared: usize,
        /// Length actually produced
        actual: usize,
    },
    /// A literal frame is not a well formed UBX message
    #[error("Invalid UBX frame: {0}")]
    InvalidFrame(String),
    /// A command name did not match any known command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl RelayError {
    pub(crate) fn fault(role: ChannelRole) -> impl FnOnce(std::io::Error) -> Self {
        move |source| RelayError::ChannelFault { role, source }
    }
}
