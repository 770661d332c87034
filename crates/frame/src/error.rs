use thiserror::Error;

/// Errors produced by the mapping layer. All of these are local input
/// problems; none of them is retriable.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("invalid cell address: {input}")]
    InvalidAddress { input: String },

    #[error("cannot decode grid: {reason}")]
    Decode { reason: String },

    #[error("cannot encode frame: {reason}")]
    Encode { reason: String },

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl FrameError {
    pub(crate) fn invalid_address(input: impl Into<String>) -> Self {
        FrameError::InvalidAddress {
            input: input.into(),
        }
    }

    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        FrameError::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn encode(reason: impl Into<String>) -> Self {
        FrameError::Encode {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
