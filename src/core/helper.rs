use crate::core::decoder::{decode_attributes, decode_identity_number};
use crate::core::error::CardResult;
use crate::core::pin::{self, PinSlot, PinStatus};
use crate::core::record::read_record;
use crate::core::records::{AttributeRecord, IdentityNumber};
use crate::core::session::{CardSession, EfId};

/// Bytes read up front from the identity number EF; always covers its header
pub const IDENTITY_NUMBER_PROBE: usize = 16;
/// Bytes read up front from the attributes EF; always covers its header
pub const ATTRIBUTES_PROBE: usize = 7;

/// Access to the card input helper application through a borrowed session.
///
/// The application itself must already be selected on the session.
#[derive(Debug)]
pub struct CardInputHelper<'a, S: CardSession + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: CardSession + ?Sized> CardInputHelper<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }

    /// Read the identity number. Requires the standard PIN to be verified.
    pub fn read_identity_number(&mut self) -> CardResult<IdentityNumber> {
        let bytes = read_record(&mut *self.session, EfId::IDENTITY_NUMBER, IDENTITY_NUMBER_PROBE)?;
        decode_identity_number(&bytes)
    }

    /// Read the attribute bundle. Requires the standard PIN to be verified.
    pub fn read_attributes(&mut self) -> CardResult<AttributeRecord> {
        let bytes = read_record(&mut *self.session, EfId::ATTRIBUTES, ATTRIBUTES_PROBE)?;
        decode_attributes(&bytes)
    }

    pub fn lookup_pin(&mut self, slot: PinSlot) -> CardResult<PinStatus> {
        pin::lookup_attempts(&mut *self.session, slot)
    }

    pub fn verify_pin(&mut self, slot: PinSlot, pin: &str) -> CardResult<()> {
        pin::verify(&mut *self.session, slot, pin)
    }
}
