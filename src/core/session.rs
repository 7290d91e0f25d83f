use std::fmt;

use crate::core::error::CardResult;

/// Two-byte identifier of an elementary file (EF) inside the selected application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EfId(pub [u8; 2]);

impl EfId {
    /// EF holding the identity number record
    pub const IDENTITY_NUMBER: EfId = EfId([0x00, 0x01]);
    /// EF holding the attribute bundle (name, address, birth, sex)
    pub const ATTRIBUTES: EfId = EfId([0x00, 0x02]);
    /// EF of the standard four digit PIN
    pub const STANDARD_PIN: EfId = EfId([0x00, 0x11]);
    /// EF of verification PIN A
    pub const PIN_A: EfId = EfId([0x00, 0x14]);
    /// EF of verification PIN B
    pub const PIN_B: EfId = EfId([0x00, 0x15]);

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl fmt::Display for EfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.0[0], self.0[1])
    }
}

/// A stateful handle to a card application.
///
/// Implementations own the EF selection and PIN authentication state. Every
/// call blocks until the card answers or the transport gives up; callers must
/// not share one session between concurrent operations.
pub trait CardSession {
    /// Select an elementary file, making it the target of subsequent reads
    /// and PIN operations.
    fn select(&mut self, file: EfId) -> CardResult<()>;

    /// Read up to `len` bytes of the selected file starting at offset 0.
    ///
    /// Returns fewer than `len` bytes when the card signals end of data.
    fn read_binary(&mut self, len: usize) -> CardResult<Vec<u8>>;

    /// Remaining verification attempts for the selected PIN file.
    fn lookup_pin(&mut self) -> CardResult<u8>;

    /// Submit a PIN for the selected PIN file.
    fn verify(&mut self, pin: &str) -> CardResult<()>;
}
