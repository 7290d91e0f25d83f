use crate::core::error::{CardError, CardResult};
use crate::core::session::EfId;
use crate::core::utils::format_hex;

/// AID of the card input helper application
pub const CARD_INPUT_HELPER_AID: [u8; 10] = [0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x04, 0x08];

/// Largest Le requested by a single READ BINARY
pub const MAX_READ_CHUNK: usize = 0xFF;

/// Highest offset addressable through P1-P2 of READ BINARY
pub const MAX_READ_OFFSET: usize = 0x7FFF;

const INS_SELECT: u8 = 0xA4;
const INS_READ_BINARY: u8 = 0xB0;
const INS_VERIFY: u8 = 0x20;

/// An ISO 7816-4 command APDU (short form)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub le: Option<u8>,
    /// Data carries a secret and must not be logged
    pub sensitive: bool,
}

impl Command {
    fn new(ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla: 0x00,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
            sensitive: false,
        }
    }

    /// SELECT by DF name, no response data
    pub fn select_application(aid: &[u8]) -> Self {
        Self {
            data: aid.to_vec(),
            ..Self::new(INS_SELECT, 0x04, 0x0C)
        }
    }

    /// SELECT an EF by identifier under the current DF, no response data
    pub fn select_file(file: EfId) -> Self {
        Self {
            data: file.as_bytes().to_vec(),
            ..Self::new(INS_SELECT, 0x02, 0x0C)
        }
    }

    /// READ BINARY of `len` bytes at `offset` of the selected EF, or `None`
    /// when the range cannot be addressed by one command
    pub fn read_binary(offset: usize, len: usize) -> Option<Self> {
        if offset > MAX_READ_OFFSET || len == 0 || len > MAX_READ_CHUNK {
            return None;
        }
        Some(Self {
            le: Some(len as u8),
            ..Self::new(INS_READ_BINARY, (offset >> 8) as u8, (offset & 0xFF) as u8)
        })
    }

    /// VERIFY without data, answered with the retry counter
    pub fn lookup_pin() -> Self {
        Self::new(INS_VERIFY, 0x00, 0x80)
    }

    /// VERIFY the selected PIN
    pub fn verify(pin: &str) -> CardResult<Self> {
        if pin.is_empty() || pin.len() > 0xFF {
            return Err(CardError::InvalidPin);
        }
        Ok(Self {
            data: pin.as_bytes().to_vec(),
            sensitive: true,
            ..Self::new(INS_VERIFY, 0x00, 0x80)
        })
    }

    /// Serialized APDU bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];
        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            apdu.push(le);
        }
        apdu
    }

    /// APDU as hex for logging, with secret data masked
    pub fn to_log_string(&self) -> String {
        if self.sensitive {
            let header = format_hex(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
            format!("{header}{}", "**".repeat(self.data.len()))
        } else {
            format_hex(&self.to_bytes())
        }
    }
}

/// Response to one transmitted command
#[derive(Debug, Clone)]
pub struct TransmitResult {
    /// Response data without the status word
    pub response: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
    pub duration_ms: u64,
}

impl TransmitResult {
    /// Split a raw card response into data and status word
    pub fn from_raw(raw: &[u8], duration_ms: u64) -> Self {
        let (response, sw1, sw2) = match raw {
            [data @ .., sw1, sw2] => (data.to_vec(), *sw1, *sw2),
            _ => (Vec::new(), 0, 0),
        };
        Self {
            response,
            sw1,
            sw2,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// `63Cx`: verification failed, `x` attempts remain
    pub fn retry_counter(&self) -> Option<u8> {
        (self.sw1 == 0x63 && self.sw2 & 0xF0 == 0xC0).then_some(self.sw2 & 0x0F)
    }

    pub fn unexpected(&self) -> CardError {
        CardError::UnexpectedStatus {
            sw1: self.sw1,
            sw2: self.sw2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_application() {
        assert_eq!(
            Command::select_application(&CARD_INPUT_HELPER_AID).to_bytes(),
            vec![0x00, 0xA4, 0x04, 0x0C, 0x0A, 0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x04, 0x08]
        );
    }

    #[test]
    fn test_select_file() {
        assert_eq!(
            Command::select_file(EfId::ATTRIBUTES).to_bytes(),
            vec![0x00, 0xA4, 0x02, 0x0C, 0x02, 0x00, 0x02]
        );
    }

    #[test]
    fn test_read_binary() {
        assert_eq!(
            Command::read_binary(0, 7).unwrap().to_bytes(),
            vec![0x00, 0xB0, 0x00, 0x00, 0x07]
        );
        assert_eq!(
            Command::read_binary(0x01FE, 0xFF).unwrap().to_bytes(),
            vec![0x00, 0xB0, 0x01, 0xFE, 0xFF]
        );
        assert!(Command::read_binary(0, 0).is_none());
        assert!(Command::read_binary(0, 256).is_none());
        assert!(Command::read_binary(0x8000, 1).is_none());
    }

    #[test]
    fn test_verify_and_lookup() {
        assert_eq!(Command::lookup_pin().to_bytes(), vec![0x00, 0x20, 0x00, 0x80]);
        assert_eq!(
            Command::verify("1234").unwrap().to_bytes(),
            vec![0x00, 0x20, 0x00, 0x80, 0x04, b'1', b'2', b'3', b'4']
        );
        assert!(matches!(Command::verify(""), Err(CardError::InvalidPin)));
        assert!(matches!(Command::verify(&"9".repeat(256)), Err(CardError::InvalidPin)));
    }

    #[test]
    fn test_pin_masked_in_logs() {
        let command = Command::verify("1234").unwrap();
        let logged = command.to_log_string();
        assert_eq!(logged, "0020008004********");
        assert!(!logged.contains("31323334"));

        assert_eq!(
            Command::select_file(EfId::IDENTITY_NUMBER).to_log_string(),
            "00A4020C020001"
        );
    }

    #[test]
    fn test_transmit_result_parsing() {
        let result = TransmitResult::from_raw(&[0x48, 0x65, 0x90, 0x00], 3);
        assert_eq!(result.response, vec![0x48, 0x65]);
        assert!(result.is_success());
        assert_eq!(result.retry_counter(), None);

        let result = TransmitResult::from_raw(&[0x63, 0xC2], 1);
        assert!(result.response.is_empty());
        assert!(!result.is_success());
        assert_eq!(result.retry_counter(), Some(2));

        let result = TransmitResult::from_raw(&[0x90], 1);
        assert_eq!((result.sw1, result.sw2), (0, 0));
        assert!(matches!(
            result.unexpected(),
            CardError::UnexpectedStatus { sw1: 0, sw2: 0 }
        ));
    }
}
