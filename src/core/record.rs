use crate::core::error::{CardError, CardResult};
use crate::core::session::{CardSession, EfId};
use crate::core::tlv::{resolve_header, TlvHeader};

/// Progress of a two-phase record read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPhase {
    /// Next exchange reads the fixed-size prefix
    AwaitingProbe { probe_size: usize },
    /// Header resolved; next exchange reads the whole record from offset 0
    AwaitingFullRead { header: TlvHeader },
    /// The record bytes, exactly `header.total_length()` long
    Complete(Vec<u8>),
}

/// A variable-length record read against an already selected EF.
///
/// The record size is unknown until its header has been read, so the read
/// happens in two exchanges: a probe of `probe_size` bytes which must contain
/// the full header, then a read of exactly the resolved size. Each call to
/// [`RecordRead::step`] performs one exchange.
#[derive(Debug, Clone)]
pub struct RecordRead {
    file: EfId,
    phase: ReadPhase,
}

impl RecordRead {
    pub fn new(file: EfId, probe_size: usize) -> Self {
        Self {
            file,
            phase: ReadPhase::AwaitingProbe { probe_size },
        }
    }

    pub fn phase(&self) -> &ReadPhase {
        &self.phase
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, ReadPhase::Complete(_))
    }

    /// Perform the next exchange with the card. Does nothing once complete.
    ///
    /// On error the phase is left unchanged.
    pub fn step<S: CardSession + ?Sized>(&mut self, session: &mut S) -> CardResult<()> {
        match self.phase {
            ReadPhase::AwaitingProbe { probe_size } => {
                let probe = read_exact(session, probe_size)?;
                let header = resolve_header(&probe)?;
                log::debug!(
                    "EF {}: header {} bytes, content {} bytes",
                    self.file,
                    header.header_length,
                    header.content_length
                );
                self.phase = ReadPhase::AwaitingFullRead { header };
            }
            ReadPhase::AwaitingFullRead { header } => {
                let bytes = read_exact(session, header.total_length())?;
                self.phase = ReadPhase::Complete(bytes);
            }
            ReadPhase::Complete(_) => {}
        }
        Ok(())
    }

    /// Record bytes, if the read has completed
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.phase {
            ReadPhase::Complete(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Drive the remaining exchanges to completion.
    pub fn run<S: CardSession + ?Sized>(mut self, session: &mut S) -> CardResult<Vec<u8>> {
        loop {
            if let ReadPhase::Complete(bytes) = self.phase {
                return Ok(bytes);
            }
            self.step(session)?;
        }
    }
}

fn read_exact<S: CardSession + ?Sized>(session: &mut S, len: usize) -> CardResult<Vec<u8>> {
    let mut bytes = session.read_binary(len)?;
    if bytes.len() < len {
        return Err(CardError::ShortRead {
            expected: len,
            actual: bytes.len(),
        });
    }
    bytes.truncate(len);
    Ok(bytes)
}

/// Select `file` and read the one TLV record it holds.
///
/// `probe_size` must be large enough to hold the record's tag and length
/// octets. Short reads are fatal and never retried.
pub fn read_record<S: CardSession + ?Sized>(
    session: &mut S,
    file: EfId,
    probe_size: usize,
) -> CardResult<Vec<u8>> {
    session.select(file)?;

    RecordRead::new(file, probe_size).run(session)
}
