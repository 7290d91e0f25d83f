use crate::core::error::{CardError, CardResult};

const HIGH_TAG_MARKER: u8 = 0x1F;
const CONSTRUCTED_BIT: u8 = 0x20;
const CONTINUATION_BIT: u8 = 0x80;
const LONG_FORM_BIT: u8 = 0x80;

// Tag numbers and lengths wider than 32 bits never occur on the card
const MAX_TAG_CONTINUATION_OCTETS: usize = 4;
const MAX_LENGTH_OCTETS: usize = 4;

/// Class bits (the top two bits) of a TLV tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    fn from_octet(octet: u8) -> Self {
        match octet >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }
}

/// Tag and length of one TLV record, parsed from its first bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    pub class: TagClass,
    pub constructed: bool,
    pub tag_number: u32,
    /// Number of tag octets
    pub tag_length: usize,
    /// Number of tag and length octets together
    pub header_length: usize,
    /// Number of value octets following the header
    pub content_length: usize,
}

impl TlvHeader {
    /// Size of the whole record: header plus content
    pub fn total_length(&self) -> usize {
        self.header_length + self.content_length
    }
}

/// Parse the tag and length octets at the start of `prefix`.
///
/// `prefix` only needs to hold the header; content bytes are not inspected.
/// Indefinite lengths are rejected with [`CardError::UnsupportedEncoding`].
pub fn resolve_header(prefix: &[u8]) -> CardResult<TlvHeader> {
    let truncated = || CardError::TruncatedHeader(prefix.len());

    let first = *prefix.first().ok_or_else(truncated)?;
    let mut pos = 1;

    let tag_number = if first & HIGH_TAG_MARKER == HIGH_TAG_MARKER {
        let mut number: u32 = 0;
        loop {
            if pos > MAX_TAG_CONTINUATION_OCTETS {
                return Err(CardError::UnsupportedEncoding);
            }
            let octet = *prefix.get(pos).ok_or_else(truncated)?;
            pos += 1;
            number = (number << 7) | u32::from(octet & !CONTINUATION_BIT);
            if octet & CONTINUATION_BIT == 0 {
                break number;
            }
        }
    } else {
        u32::from(first & HIGH_TAG_MARKER)
    };
    let tag_length = pos;

    let length_octet = *prefix.get(pos).ok_or_else(truncated)?;
    pos += 1;

    let content_length = if length_octet & LONG_FORM_BIT == 0 {
        usize::from(length_octet)
    } else {
        let count = usize::from(length_octet & !LONG_FORM_BIT);
        if count == 0 || count > MAX_LENGTH_OCTETS {
            return Err(CardError::UnsupportedEncoding);
        }
        let octets = prefix.get(pos..pos + count).ok_or_else(truncated)?;
        pos += count;
        octets
            .iter()
            .fold(0usize, |acc, &octet| (acc << 8) | usize::from(octet))
    };
    // total_length() must not overflow on 32-bit targets
    if pos.checked_add(content_length).is_none() {
        return Err(CardError::UnsupportedEncoding);
    }

    Ok(TlvHeader {
        class: TagClass::from_octet(first),
        constructed: first & CONSTRUCTED_BIT != 0,
        tag_number,
        tag_length,
        header_length: pos,
        content_length,
    })
}

/// Split one complete record off the front of `bytes`.
///
/// Returns the header, the value octets and whatever follows the record.
/// Header faults are returned as the resolver reports them; a value shorter
/// than its declared length is a [`CardError::MalformedEncoding`].
pub fn split_record(bytes: &[u8]) -> CardResult<(TlvHeader, &[u8], &[u8])> {
    let header = resolve_header(bytes)?;
    if bytes.len() < header.total_length() {
        return Err(CardError::malformed(format!(
            "value of tag {} declares {} bytes but only {} are present",
            header.tag_number,
            header.content_length,
            bytes.len() - header.header_length
        )));
    }
    let (record, rest) = bytes.split_at(header.total_length());
    Ok((header, &record[header.header_length..], rest))
}
