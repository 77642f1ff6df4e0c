use crate::constants::{CRC_LEN, PAGE_SIZE};
use crate::error::{EpromError, EpromResult};
use crate::protocol::crc16;

/// Wire opcodes understood by the burner backend.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Identify = b'i',
    ReadPage = b'r',
    FastReadPage = b'f',
    WritePage = b'w',
}

/// A single protocol command. Each variant carries exactly the fields
/// that are valid for its opcode, so a malformed command cannot be
/// represented at all.
#[derive(Debug, Clone)]
pub enum Command {
    Identify,
    ReadPage { page: u16 },
    FastReadPage { page: u16 },
    WritePage { page: u16, data: Vec<u8> },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Identify => Opcode::Identify,
            Command::ReadPage { .. } => Opcode::ReadPage,
            Command::FastReadPage { .. } => Opcode::FastReadPage,
            Command::WritePage { .. } => Opcode::WritePage,
        }
    }

    pub fn page(&self) -> Option<u16> {
        match self {
            Command::Identify => None,
            Command::ReadPage { page }
            | Command::FastReadPage { page }
            | Command::WritePage { page, .. } => Some(*page),
        }
    }

    /// Expected response length in bytes, trailing checksum included.
    pub fn response_len(&self) -> usize {
        match self {
            Command::Identify => 38 + CRC_LEN,
            Command::ReadPage { .. } | Command::FastReadPage { .. } => PAGE_SIZE + CRC_LEN,
            Command::WritePage { .. } => 4 + CRC_LEN,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Identify => "identify",
            Command::ReadPage { .. } => "read page",
            Command::FastReadPage { .. } => "fast read page",
            Command::WritePage { .. } => "write page",
        }
    }

    /// Serialize to the exact wire byte sequence: opcode, little-endian
    /// page index, payload, then CRC16 over everything so far.
    pub fn encode(&self) -> EpromResult<Frame> {
        if let Command::WritePage { data, .. } = self {
            if data.len() != PAGE_SIZE {
                return Err(EpromError::InvalidCommand(format!(
                    "write page payload must be {} bytes, got {}",
                    PAGE_SIZE,
                    data.len()
                )));
            }
        }

        let mut raw = Vec::with_capacity(1 + 2 + PAGE_SIZE + CRC_LEN);
        raw.push(self.opcode() as u8);
        if let Some(page) = self.page() {
            raw.extend_from_slice(&page.to_le_bytes());
        }
        if let Command::WritePage { data, .. } = self {
            raw.extend_from_slice(data);
        }
        let crc = crc16::checksum(&raw);
        raw.extend_from_slice(&crc);

        Ok(Frame(raw))
    }
}

/// A fully serialized command, checksum appended. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
