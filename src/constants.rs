pub(crate) const SERIAL_TIMEOUT_MS: u64 = 500;
pub(crate) const READ_CHUNK_SIZE: usize = 1024;

/// EPROM page size; every bulk transfer moves whole pages.
pub(crate) const PAGE_SIZE: usize = 256;
/// Acknowledgement window: tag byte + CRC16 over it.
pub(crate) const ACK_LEN: usize = 3;
pub(crate) const CRC_LEN: usize = 2;

pub(crate) const ACK_ACCEPTED: u8 = b'a';
pub(crate) const ACK_BAD_CRC: u8 = b'e';

/// Fast dump always moves a full 64 KB regardless of the requested size.
pub(crate) const FAST_DUMP_PAGES: u16 = 256;
