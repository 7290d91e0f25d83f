use thiserror::Error;

use crate::core::session::EfId;
use crate::core::utils::describe_status_word;

/// Errors surfaced by card sessions and the record protocol built on them
#[derive(Debug, Error)]
pub enum CardError {
    #[error("File {0} not found")]
    FileNotFound(EfId),

    #[error("Access denied: security status not satisfied")]
    AccessDenied,

    #[error("Short read: expected {expected} bytes, card returned {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("TLV header truncated after {0} bytes")]
    TruncatedHeader(usize),

    #[error("Unsupported TLV encoding")]
    UnsupportedEncoding,

    #[error("Malformed record: {0}")]
    MalformedEncoding(String),

    #[error("Incorrect PIN, {remaining} attempts remaining")]
    IncorrectPin { remaining: u8 },

    #[error("PIN is blocked")]
    PinBlocked,

    #[error("PIN must be 1 to 255 bytes long")]
    InvalidPin,

    #[error("Card returned {sw1:02X} {sw2:02X} ({})", status_text(.sw1, .sw2))]
    UnexpectedStatus { sw1: u8, sw2: u8 },

    #[error("PC/SC transport failure: {0}")]
    Transport(#[from] pcsc::Error),

    #[error("No card connected")]
    NotConnected,
}

fn status_text(sw1: &u8, sw2: &u8) -> String {
    describe_status_word(*sw1, *sw2)
}

impl CardError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CardError::MalformedEncoding(reason.into())
    }
}

pub type CardResult<T> = std::result::Result<T, CardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CardError::FileNotFound(EfId::ATTRIBUTES).to_string(),
            "File 00 02 not found"
        );
        assert_eq!(
            CardError::ShortRead {
                expected: 7,
                actual: 3
            }
            .to_string(),
            "Short read: expected 7 bytes, card returned 3"
        );
        assert_eq!(
            CardError::IncorrectPin { remaining: 2 }.to_string(),
            "Incorrect PIN, 2 attempts remaining"
        );
    }

    #[test]
    fn test_unexpected_status_describes_status_word() {
        let err = CardError::UnexpectedStatus {
            sw1: 0x6A,
            sw2: 0x86,
        };
        assert_eq!(
            err.to_string(),
            "Card returned 6A 86 (Error: Incorrect parameters P1-P2)"
        );
    }
}
