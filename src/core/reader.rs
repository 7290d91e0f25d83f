use anyhow::{Context as AnyhowContext, Result};
use pcsc::{Card, Context, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use std::ffi::CString;
use std::time::Instant;

use crate::core::commands::{
    Command, TransmitResult, CARD_INPUT_HELPER_AID, MAX_READ_CHUNK, MAX_READ_OFFSET,
};
use crate::core::error::{CardError, CardResult};
use crate::core::session::{CardSession, EfId};
use crate::core::utils::format_hex_spaced;

/// Information about a PCSC reader
#[derive(Debug, Clone)]
pub struct ReaderInfo {
    pub name: String,
    pub is_connected: bool,
    pub atr: Option<Vec<u8>>,
}

/// PCSC reader manager, and the card session of the connected card
pub struct PcscReader {
    context: Context,
    current_card: Option<Card>,
}

impl PcscReader {
    /// Create a new PCSC reader manager
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User).context("Failed to establish PCSC context")?;

        Ok(Self {
            context,
            current_card: None,
        })
    }

    /// List all available readers
    pub fn list_readers(&self) -> Result<Vec<ReaderInfo>> {
        let mut readers_buf = vec![0; 2048];
        let readers = self
            .context
            .list_readers(&mut readers_buf)
            .context("Failed to list readers")?;

        let mut reader_infos = Vec::new();

        for reader_name in readers {
            let reader_name_str = reader_name.to_string_lossy().to_string();

            let (is_connected, atr) = self
                .get_reader_status(&reader_name_str)
                .unwrap_or((false, None));

            reader_infos.push(ReaderInfo {
                name: reader_name_str,
                is_connected,
                atr,
            });
        }

        Ok(reader_infos)
    }

    /// Get the status of a specific reader
    fn get_reader_status(&self, reader_name: &str) -> Result<(bool, Option<Vec<u8>>)> {
        let reader_cstr = CString::new(reader_name).context("Invalid reader name")?;

        match self.context.connect(&reader_cstr, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => match card.status2_owned() {
                Ok(status) => Ok((true, Some(status.atr().to_vec()))),
                Err(_) => Ok((true, None)),
            },
            Err(_) => Ok((false, None)),
        }
    }

    /// Connect to a specific reader
    pub fn connect(&mut self, reader_name: &str, share_mode: ShareMode) -> Result<()> {
        log::info!("Connecting to reader: {}", reader_name);

        let reader_cstr = CString::new(reader_name).context("Invalid reader name")?;
        let card = self
            .context
            .connect(&reader_cstr, share_mode, Protocols::ANY)
            .with_context(|| format!("Failed to connect to reader: {}", reader_name))?;

        self.current_card = Some(card);

        log::info!("Successfully connected to reader: {}", reader_name);
        Ok(())
    }

    /// Disconnect from current reader
    pub fn disconnect(&mut self) {
        if let Some(card) = self.current_card.take() {
            if let Err((_, err)) = card.disconnect(pcsc::Disposition::ResetCard) {
                log::warn!("Failed to disconnect cleanly from card: {}", err);
            }
            log::info!("Disconnected from reader");
        }
    }

    /// Send one command to the connected card
    pub fn transmit(&self, command: &Command) -> CardResult<TransmitResult> {
        let card = self.current_card.as_ref().ok_or(CardError::NotConnected)?;

        log::debug!("Transmitting APDU: {}", command.to_log_string());

        let start_time = Instant::now();
        let mut response_buf = [0; MAX_BUFFER_SIZE];
        let raw = card.transmit(&command.to_bytes(), &mut response_buf)?;
        let result = TransmitResult::from_raw(raw, start_time.elapsed().as_millis() as u64);

        log::debug!(
            "Received {} bytes, status {:02X} {:02X} ({}ms)",
            result.response.len(),
            result.sw1,
            result.sw2,
            result.duration_ms
        );
        log::trace!("Response data: {}", format_hex_spaced(&result.response));

        Ok(result)
    }

    /// Select the card input helper application
    pub fn select_card_input_helper(&mut self) -> CardResult<()> {
        let result = self.transmit(&Command::select_application(&CARD_INPUT_HELPER_AID))?;
        if result.is_success() {
            Ok(())
        } else {
            Err(result.unexpected())
        }
    }
}

impl CardSession for PcscReader {
    fn select(&mut self, file: EfId) -> CardResult<()> {
        let result = self.transmit(&Command::select_file(file))?;
        select_outcome(file, &result)
    }

    fn read_binary(&mut self, len: usize) -> CardResult<Vec<u8>> {
        read_chunked(len, |command| self.transmit(command))
    }

    fn lookup_pin(&mut self) -> CardResult<u8> {
        let result = self.transmit(&Command::lookup_pin())?;
        lookup_outcome(&result)
    }

    fn verify(&mut self, pin: &str) -> CardResult<()> {
        let result = self.transmit(&Command::verify(pin)?)?;
        verify_outcome(&result)
    }
}

impl Drop for PcscReader {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn select_outcome(file: EfId, result: &TransmitResult) -> CardResult<()> {
    match (result.sw1, result.sw2) {
        (0x90, 0x00) => Ok(()),
        (0x6A, 0x82) => Err(CardError::FileNotFound(file)),
        (0x69, 0x82) | (0x69, 0x85) | (0x69, 0x86) => Err(CardError::AccessDenied),
        _ => Err(result.unexpected()),
    }
}

fn lookup_outcome(result: &TransmitResult) -> CardResult<u8> {
    if let Some(remaining) = result.retry_counter() {
        return Ok(remaining);
    }
    match (result.sw1, result.sw2) {
        (0x69, 0x83) | (0x69, 0x84) => Ok(0),
        _ => Err(result.unexpected()),
    }
}

fn verify_outcome(result: &TransmitResult) -> CardResult<()> {
    if result.is_success() {
        return Ok(());
    }
    match result.retry_counter() {
        Some(0) => Err(CardError::PinBlocked),
        Some(remaining) => Err(CardError::IncorrectPin { remaining }),
        None => match (result.sw1, result.sw2) {
            (0x69, 0x83) | (0x69, 0x84) => Err(CardError::PinBlocked),
            _ => Err(result.unexpected()),
        },
    }
}

/// Read `len` bytes from offset 0 with as many READ BINARY commands as needed.
///
/// Stops early, returning what was read, when the card runs out of data.
fn read_chunked<F>(len: usize, mut transmit: F) -> CardResult<Vec<u8>>
where
    F: FnMut(&Command) -> CardResult<TransmitResult>,
{
    let mut data = Vec::with_capacity(len.min(MAX_READ_OFFSET + MAX_READ_CHUNK));

    while data.len() < len {
        let chunk = (len - data.len()).min(MAX_READ_CHUNK);
        let Some(command) = Command::read_binary(data.len(), chunk) else {
            break;
        };

        let result = transmit(&command)?;
        let end_of_file = match (result.sw1, result.sw2) {
            (0x90, 0x00) => false,
            (0x62, 0x82) => true,
            (0x6B, 0x00) => break,
            (0x69, 0x82) => return Err(CardError::AccessDenied),
            _ => return Err(result.unexpected()),
        };

        let received = result.response.len();
        data.extend_from_slice(&result.response);
        if end_of_file || received < chunk {
            break;
        }
    }

    data.truncate(len);
    Ok(data)
}
