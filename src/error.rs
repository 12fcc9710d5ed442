use std::fmt;

/// Errors raised on the control and persistence paths.
///
/// The render path never produces one of these; transport problems there
/// degrade to silence (see [`crate::dsp::transport::TransportFault`]).
#[derive(Debug)]
pub enum GateError {
    UnknownParameter { key: String },
    InvalidState(serde_json::Error),
    InvalidSettings(serde_json::Error),
    ChannelMismatch { expected: usize, found: usize },
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::UnknownParameter { key } => write!(f, "Unknown parameter '{key}'"),
            GateError::InvalidState(e) => write!(f, "Invalid parameter state: {e}"),
            GateError::InvalidSettings(e) => write!(f, "Invalid engine settings: {e}"),
            GateError::ChannelMismatch { expected, found } => {
                write!(f, "Expected {expected} channels, found {found}")
            }
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::InvalidState(e) | GateError::InvalidSettings(e) => Some(e),
            _ => None,
        }
    }
}
