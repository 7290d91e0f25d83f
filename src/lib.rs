//! myna-reader - reads the card input helper application of a My Number card
//!
//! The library implements the record protocol of the application (probe read,
//! TLV length resolution, exact read, field decoding) and its three PINs on
//! top of any [`CardSession`]; [`PcscReader`] provides one over PC/SC.

pub mod cli;
pub mod core;

// Re-export commonly used types
pub use crate::core::{
    error::{CardError, CardResult},
    helper::CardInputHelper,
    pin::{PinSlot, PinStatus},
    reader::{PcscReader, ReaderInfo},
    records::{AttributeRecord, AttributeSummary, IdentityNumber, SexCategory},
    session::{CardSession, EfId},
    tlv::{resolve_header, TlvHeader},
};
