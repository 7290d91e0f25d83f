use crate::core::error::{CardError, CardResult};
use crate::core::records::{AttributeRecord, IdentityNumber};
use crate::core::tlv::{split_record, TagClass, TlvHeader};

/// Private tag wrapping the identity number digits
pub const IDENTITY_NUMBER_TAG: u32 = 16;
/// Private, constructed tag wrapping the attribute fields
pub const ATTRIBUTES_TAG: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeField {
    Header,
    Name,
    Address,
    Birth,
    Sex,
}

/// Private tag numbers of the fields inside the attribute record
const ATTRIBUTE_FIELDS: [(u32, AttributeField); 5] = [
    (33, AttributeField::Header),
    (34, AttributeField::Name),
    (35, AttributeField::Address),
    (36, AttributeField::Birth),
    (37, AttributeField::Sex),
];

fn field_for_tag(tag_number: u32) -> Option<AttributeField> {
    ATTRIBUTE_FIELDS
        .iter()
        .find(|(tag, _)| *tag == tag_number)
        .map(|&(_, field)| field)
}

/// Split the outer record, requiring it to fill `bytes` exactly.
fn unwrap_envelope(bytes: &[u8], expected_tag: u32) -> CardResult<(TlvHeader, &[u8])> {
    let (header, value, rest) = split_record(bytes).map_err(into_malformed)?;

    expect_private(&header, expected_tag)?;
    if !rest.is_empty() {
        return Err(CardError::malformed(format!(
            "{} trailing bytes after tag {expected_tag}",
            rest.len()
        )));
    }
    Ok((header, value))
}

fn expect_private(header: &TlvHeader, expected_tag: u32) -> CardResult<()> {
    if header.class != TagClass::Private || header.tag_number != expected_tag {
        return Err(CardError::malformed(format!(
            "expected private tag {expected_tag}, found {:?} tag {}",
            header.class, header.tag_number
        )));
    }
    Ok(())
}

// Inside a complete buffer every header fault is a grammar violation
fn into_malformed(err: CardError) -> CardError {
    match err {
        CardError::TruncatedHeader(len) => {
            CardError::malformed(format!("TLV header truncated after {len} bytes"))
        }
        CardError::UnsupportedEncoding => CardError::malformed("unsupported TLV encoding"),
        other => other,
    }
}

fn utf8_field(value: &[u8], tag_number: u32) -> CardResult<String> {
    String::from_utf8(value.to_vec())
        .map_err(|e| CardError::malformed(format!("tag {tag_number} is not valid UTF-8: {e}")))
}

/// Decode the identity number record (private tag 16 holding 12 digits).
pub fn decode_identity_number(bytes: &[u8]) -> CardResult<IdentityNumber> {
    let (_, value) = unwrap_envelope(bytes, IDENTITY_NUMBER_TAG)?;
    let digits = utf8_field(value, IDENTITY_NUMBER_TAG)?;

    IdentityNumber::new(digits).ok_or_else(|| {
        CardError::malformed(format!(
            "identity number must be 12 digits, found {} bytes",
            value.len()
        ))
    })
}

/// Decode the attribute record (private, constructed tag 32).
///
/// Fields are matched by tag number; tags outside the table are skipped.
pub fn decode_attributes(bytes: &[u8]) -> CardResult<AttributeRecord> {
    let (header, mut fields) = unwrap_envelope(bytes, ATTRIBUTES_TAG)?;
    if !header.constructed {
        return Err(CardError::malformed(format!(
            "tag {ATTRIBUTES_TAG} must be constructed"
        )));
    }

    let mut card_header = None;
    let mut name = None;
    let mut address = None;
    let mut birth = None;
    let mut sex = None;

    while !fields.is_empty() {
        let (field_header, value, rest) = split_record(fields).map_err(into_malformed)?;
        fields = rest;

        let Some(field) = field_for_tag(field_header.tag_number) else {
            log::trace!("Skipping attribute tag {}", field_header.tag_number);
            continue;
        };
        expect_private(&field_header, field_header.tag_number)?;

        let tag = field_header.tag_number;
        let duplicate = match field {
            AttributeField::Header => card_header.replace(value.to_vec()).is_some(),
            AttributeField::Name => name.replace(utf8_field(value, tag)?).is_some(),
            AttributeField::Address => address.replace(utf8_field(value, tag)?).is_some(),
            AttributeField::Birth => birth.replace(utf8_field(value, tag)?).is_some(),
            AttributeField::Sex => sex.replace(utf8_field(value, tag)?).is_some(),
        };
        if duplicate {
            return Err(CardError::malformed(format!("tag {tag} appears twice")));
        }
    }

    let missing = |tag: u32| CardError::malformed(format!("missing attribute tag {tag}"));
    Ok(AttributeRecord {
        header: card_header.ok_or_else(|| missing(33))?,
        name: name.ok_or_else(|| missing(34))?,
        address: address.ok_or_else(|| missing(35))?,
        birth: birth.ok_or_else(|| missing(36))?,
        sex: sex.ok_or_else(|| missing(37))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(tag: u8, value: &[u8]) -> Vec<u8> {
        let mut out = vec![0xDF, tag, value.len() as u8];
        out.extend_from_slice(value);
        out
    }

    fn attributes(fields: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = fields.concat();
        let mut out = vec![0xFF, 0x20, 0x82];
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend(body);
        out
    }

    fn standard_fields() -> Vec<Vec<u8>> {
        vec![
            field(0x21, &[0x01, 0x02, 0x03]),
            field(0x22, "山田 太郎".as_bytes()),
            field(0x23, "東京都千代田区1-1".as_bytes()),
            field(0x24, b"19700101"),
            field(0x25, b"1"),
        ]
    }

    #[test]
    fn test_decode_identity_number() {
        let mut bytes = vec![0xD0, 0x0C];
        bytes.extend_from_slice(b"123456789018");
        let number = decode_identity_number(&bytes).unwrap();
        assert_eq!(number.as_str(), "123456789018");
    }

    #[test]
    fn test_identity_number_wrong_tag() {
        let mut bytes = vec![0xD1, 0x0C];
        bytes.extend_from_slice(b"123456789018");
        assert!(matches!(
            decode_identity_number(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));

        // Context specific class with the right number
        bytes[0] = 0x90;
        assert!(matches!(
            decode_identity_number(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_identity_number_bad_digits() {
        let mut bytes = vec![0xD0, 0x0C];
        bytes.extend_from_slice(b"12345678901X");
        assert!(matches!(
            decode_identity_number(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));

        let mut bytes = vec![0xD0, 0x04];
        bytes.extend_from_slice(b"1234");
        assert!(matches!(
            decode_identity_number(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_identity_number_trailing_bytes() {
        let mut bytes = vec![0xD0, 0x0C];
        bytes.extend_from_slice(b"123456789018");
        bytes.extend_from_slice(&[0xFF, 0xFF]);
        assert!(matches!(
            decode_identity_number(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_decode_attributes() {
        let record = decode_attributes(&attributes(&standard_fields())).unwrap();
        assert_eq!(record.header, vec![0x01, 0x02, 0x03]);
        assert_eq!(record.name, "山田 太郎");
        assert_eq!(record.address, "東京都千代田区1-1");
        assert_eq!(record.birth, "19700101");
        assert_eq!(record.sex, "1");
    }

    #[test]
    fn test_attribute_fields_any_order_and_unknown_tags() {
        let mut fields = standard_fields();
        fields.reverse();
        fields.insert(2, field(0x30, b"ignored"));
        let record = decode_attributes(&attributes(&fields)).unwrap();
        assert_eq!(record.name, "山田 太郎");
        assert_eq!(record.sex, "1");
    }

    #[test]
    fn test_attributes_missing_field() {
        let mut fields = standard_fields();
        fields.remove(1);
        let err = decode_attributes(&attributes(&fields)).unwrap_err();
        assert!(matches!(err, CardError::MalformedEncoding(ref msg) if msg.contains("34")));
    }

    #[test]
    fn test_attributes_duplicate_field() {
        let mut fields = standard_fields();
        fields.push(field(0x25, b"2"));
        assert!(matches!(
            decode_attributes(&attributes(&fields)),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_attributes_invalid_utf8() {
        let mut fields = standard_fields();
        fields[1] = field(0x22, &[0xE5, 0xB1]);
        assert!(matches!(
            decode_attributes(&attributes(&fields)),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_attributes_inner_field_wrong_class() {
        let mut fields = standard_fields();
        // Context specific tag 34
        fields[1][0] = 0x9F;
        assert!(matches!(
            decode_attributes(&attributes(&fields)),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_attributes_primitive_envelope_rejected() {
        let mut bytes = attributes(&standard_fields());
        bytes[0] = 0xDF;
        assert!(matches!(
            decode_attributes(&bytes),
            Err(CardError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_attributes_truncated_buffer() {
        let bytes = attributes(&standard_fields());
        for cut in [1, 4, 5, 10, bytes.len() - 1] {
            assert!(
                matches!(
                    decode_attributes(&bytes[..cut]),
                    Err(CardError::MalformedEncoding(_))
                ),
                "buffer cut at {cut}"
            );
        }
    }

    #[test]
    fn test_attributes_inner_value_overruns_envelope() {
        let mut fields = standard_fields();
        // Sex field claims two bytes but only one follows
        fields[4] = vec![0xDF, 0x25, 0x02, b'1'];
        assert!(matches!(
            decode_attributes(&attributes(&fields)),
            Err(CardError::MalformedEncoding(_))
        ));
    }
}
