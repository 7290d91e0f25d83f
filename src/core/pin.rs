use std::fmt;
use std::str::FromStr;

use crate::core::error::CardResult;
use crate::core::session::{CardSession, EfId};

/// The three PINs guarding the card input helper application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinSlot {
    /// Four digit PIN chosen by the card holder
    Standard,
    /// Verification number A: the identity number itself
    SlotA,
    /// Verification number B: birth date, expiry year and security code
    SlotB,
}

impl PinSlot {
    pub const ALL: [PinSlot; 3] = [PinSlot::Standard, PinSlot::SlotA, PinSlot::SlotB];

    /// EF holding this PIN
    pub const fn file(self) -> EfId {
        match self {
            PinSlot::Standard => EfId::STANDARD_PIN,
            PinSlot::SlotA => EfId::PIN_A,
            PinSlot::SlotB => EfId::PIN_B,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PinSlot::Standard => "standard",
            PinSlot::SlotA => "a",
            PinSlot::SlotB => "b",
        }
    }
}

impl fmt::Display for PinSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "s" => Ok(PinSlot::Standard),
            "a" => Ok(PinSlot::SlotA),
            "b" => Ok(PinSlot::SlotB),
            _ => Err(format!("Invalid PIN slot: {s}")),
        }
    }
}

/// Remaining verification attempts of one PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStatus {
    pub slot: PinSlot,
    pub remaining: u8,
}

impl PinStatus {
    /// A blocked PIN can only be recovered by resetting it at the issuer
    pub fn is_blocked(&self) -> bool {
        self.remaining == 0
    }
}

/// Select the EF of `slot` and read its remaining attempts counter.
pub fn lookup_attempts<S: CardSession + ?Sized>(
    session: &mut S,
    slot: PinSlot,
) -> CardResult<PinStatus> {
    session.select(slot.file())?;
    let remaining = session.lookup_pin()?;
    Ok(PinStatus { slot, remaining })
}

/// Select the EF of `slot` and submit `pin`.
///
/// A wrong PIN consumes one attempt. The outcome is returned as is; nothing
/// is retried.
pub fn verify<S: CardSession + ?Sized>(session: &mut S, slot: PinSlot, pin: &str) -> CardResult<()> {
    session.select(slot.file())?;
    session.verify(pin)
}
