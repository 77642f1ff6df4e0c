//! The protocol engine: single-shot command round trips and the
//! page-oriented transfer loops built on top of them.
//!
//! Every round trip walks the same state machine: write the frame, read
//! the 3-byte acknowledgement, then (if accepted) read the fixed-size
//! response. There is no retry transition anywhere in here; a failure is
//! terminal for the current operation and retry policy belongs to
//! whoever wraps the whole state machine.

use tracing::{debug, info};

use crate::constants::{ACK_ACCEPTED, ACK_BAD_CRC, ACK_LEN, CRC_LEN, FAST_DUMP_PAGES, PAGE_SIZE};
use crate::error::{EpromError, EpromResult};
use crate::protocol::command::Command;
use crate::protocol::crc16;
use crate::transport::ByteTransport;
use crate::util::create_progress_bar;

/// Number of 256-byte pages covering a ROM of the given size in kilobits.
pub(crate) fn page_count(size_kbit: u32) -> u16 {
    (size_kbit as usize * 1024 / 8 / PAGE_SIZE) as u16
}

/// Byte size of a ROM declared in kilobits.
pub(crate) fn rom_bytes(size_kbit: u32) -> usize {
    size_kbit as usize * 1024 / 8
}

/// Perform one blocking command round trip: write the encoded frame,
/// validate the acknowledgement, then read and validate the response.
/// Returns the response body with its trailing checksum stripped.
pub fn roundtrip<T: ByteTransport + ?Sized>(
    transport: &mut T,
    cmd: &Command,
) -> EpromResult<Vec<u8>> {
    let frame = cmd.encode()?;
    transport.write(frame.as_bytes())?;

    let ack = transport.read(ACK_LEN)?;
    if ack.is_empty() {
        return Err(EpromError::NoResponse);
    }
    if ack.len() != ACK_LEN {
        return Err(EpromError::ShortRead {
            expected: ACK_LEN,
            actual: ack.len(),
        });
    }
    if !crc16::verify(&ack) {
        return Err(EpromError::CorruptedAck);
    }
    match ack[0] {
        ACK_ACCEPTED => {}
        ACK_BAD_CRC => return Err(EpromError::RejectedByDevice),
        tag => return Err(EpromError::UnrecognizedDevice { tag }),
    }
    debug!("Backend accepted {} command", cmd.name());

    let expected = cmd.response_len();
    let mut response = transport.read(expected)?;
    if response.len() != expected {
        return Err(EpromError::ShortRead {
            expected,
            actual: response.len(),
        });
    }
    if !crc16::verify(&response) {
        return Err(EpromError::CorruptedPayload);
    }

    response.truncate(expected - CRC_LEN);
    Ok(response)
}

/// One dump/burn/check session over an exclusively owned transport.
pub struct EpromSession<T: ByteTransport> {
    transport: T,
    progress_bar_enable: bool,
}

impl<T: ByteTransport> EpromSession<T> {
    pub fn new(transport: T) -> Self {
        EpromSession {
            transport,
            progress_bar_enable: false,
        }
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.progress_bar_enable = enable;
    }

    /// Ask the backend who it is. Returns the raw 38-byte identity
    /// string; matching it against a known-good signature is up to the
    /// caller.
    pub fn identify(&mut self) -> EpromResult<Vec<u8>> {
        roundtrip(&mut self.transport, &Command::Identify)
    }

    /// Read the whole ROM, page by page in ascending index order. Fast
    /// mode uses the dedicated fast-read opcode and always transfers the
    /// full 64 KB address space, whatever size was requested.
    pub fn dump(&mut self, size_kbit: u32, fast: bool) -> EpromResult<Vec<u8>> {
        let pages = if fast {
            FAST_DUMP_PAGES
        } else {
            page_count(size_kbit)
        };
        info!("Dumping {} pages", pages);

        let pb = self
            .progress_bar_enable
            .then(|| create_progress_bar(pages as u64, "Dumping"));

        let mut image = Vec::with_capacity(pages as usize * PAGE_SIZE);
        for page in 0..pages {
            let cmd = if fast {
                Command::FastReadPage { page }
            } else {
                Command::ReadPage { page }
            };
            let body = roundtrip(&mut self.transport, &cmd).map_err(|e| {
                EpromError::DumpFailed {
                    page,
                    source: Box::new(e),
                }
            })?;
            image.extend_from_slice(&body);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish();
        }
        info!("Dumped {} bytes", image.len());
        Ok(image)
    }

    /// Write a complete ROM image, page by page. The image length is
    /// checked against the declared ROM size before a single byte goes
    /// out; once writing has started, any failure leaves the EPROM
    /// partially programmed and is reported as such.
    pub fn burn(&mut self, image: &[u8], size_kbit: u32) -> EpromResult<()> {
        let expected = rom_bytes(size_kbit);
        if image.len() != expected || image.len() % PAGE_SIZE != 0 {
            return Err(EpromError::SizeMismatch {
                expected,
                actual: image.len(),
            });
        }

        let pages = (image.len() / PAGE_SIZE) as u16;
        info!("Burning {} pages", pages);

        let pb = self
            .progress_bar_enable
            .then(|| create_progress_bar(pages as u64, "Burning"));

        for (page, chunk) in image.chunks_exact(PAGE_SIZE).enumerate() {
            let page = page as u16;
            let cmd = Command::WritePage {
                page,
                data: chunk.to_vec(),
            };
            roundtrip(&mut self.transport, &cmd).map_err(|e| EpromError::BurnInterrupted {
                page,
                source: Box::new(e),
            })?;
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish();
        }
        info!("Burnt {} bytes", image.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted transport: records every write, serves reads from a
    /// queue of canned responses.
    struct MockTransport {
        reads: VecDeque<Vec<u8>>,
        writes: Vec<Vec<u8>>,
    }

    impl MockTransport {
        fn new(reads: Vec<Vec<u8>>) -> Self {
            MockTransport {
                reads: reads.into(),
                writes: Vec::new(),
            }
        }
    }

    impl ByteTransport for MockTransport {
        fn write(&mut self, bytes: &[u8]) -> EpromResult<()> {
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn read(&mut self, _len: usize) -> EpromResult<Vec<u8>> {
            Ok(self.reads.pop_front().unwrap_or_default())
        }
    }

    fn ack(tag: u8) -> Vec<u8> {
        let mut ack = vec![tag];
        ack.extend_from_slice(&crc16::checksum(&[tag]));
        ack
    }

    fn with_checksum(body: &[u8]) -> Vec<u8> {
        let mut resp = body.to_vec();
        resp.extend_from_slice(&crc16::checksum(body));
        resp
    }

    fn write_ack_body() -> Vec<u8> {
        b"done".to_vec()
    }

    #[test]
    fn silent_device_is_no_response() {
        let mut transport = MockTransport::new(vec![]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(err, EpromError::NoResponse));
    }

    #[test]
    fn truncated_ack_is_short_read() {
        let mut transport = MockTransport::new(vec![vec![b'a', 0x7E]]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(
            err,
            EpromError::ShortRead {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn ack_with_bad_checksum_is_corrupted_ack() {
        let mut transport = MockTransport::new(vec![vec![b'a', 0x00, 0x00]]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(err, EpromError::CorruptedAck));
    }

    #[test]
    fn reject_tag_fails_without_reading_payload() {
        let payload = with_checksum(&[0u8; 38]);
        let mut transport = MockTransport::new(vec![ack(b'e'), payload]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(err, EpromError::RejectedByDevice));
        // The payload response must still be sitting in the queue
        assert_eq!(transport.reads.len(), 1);
    }

    #[test]
    fn unknown_tag_is_unrecognized_device() {
        let mut transport = MockTransport::new(vec![ack(b'x')]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(err, EpromError::UnrecognizedDevice { tag: b'x' }));
    }

    #[test]
    fn corrupt_payload_is_never_returned() {
        let mut payload = with_checksum(&[0x42u8; 38]);
        payload[0] ^= 0xFF;
        let mut transport = MockTransport::new(vec![ack(b'a'), payload]);
        let err = roundtrip(&mut transport, &Command::Identify).unwrap_err();
        assert!(matches!(err, EpromError::CorruptedPayload));
    }

    #[test]
    fn accepted_roundtrip_strips_checksum() {
        let ident = b"RECCurection eprom-burner backend v0.1";
        let mut transport = MockTransport::new(vec![ack(b'a'), with_checksum(ident)]);
        let payload = roundtrip(&mut transport, &Command::Identify).unwrap();
        assert_eq!(payload, ident);
        // One frame went out: opcode + checksum
        assert_eq!(transport.writes.len(), 1);
        assert_eq!(transport.writes[0], vec![b'i', 0x7F, 0x6E]);
    }

    #[test]
    fn dump_concatenates_pages_in_order() {
        let mut reads = Vec::new();
        for page in 0u8..4 {
            reads.push(ack(b'a'));
            reads.push(with_checksum(&[page; PAGE_SIZE]));
        }
        // 4 pages of 256 bytes = 1024 bytes = 8 kbit
        let mut session = EpromSession::new(MockTransport::new(reads));
        let image = session.dump(8, false).unwrap();

        assert_eq!(image.len(), 1024);
        for page in 0u8..4 {
            let start = page as usize * PAGE_SIZE;
            assert!(image[start..start + PAGE_SIZE].iter().all(|&b| b == page));
        }

        // Read commands carry ascending little-endian page indices
        let writes = &session.transport.writes;
        assert_eq!(writes.len(), 4);
        for (page, frame) in writes.iter().enumerate() {
            assert_eq!(frame[0], b'r');
            assert_eq!(frame[1], page as u8);
            assert_eq!(frame[2], 0);
        }
    }

    #[test]
    fn fast_dump_uses_fast_opcode_and_full_address_space() {
        let mut reads = Vec::new();
        for page in 0..FAST_DUMP_PAGES {
            reads.push(ack(b'a'));
            reads.push(with_checksum(&[page as u8; PAGE_SIZE]));
        }
        // Requested size is ignored in fast mode
        let mut session = EpromSession::new(MockTransport::new(reads));
        let image = session.dump(8, true).unwrap();

        assert_eq!(image.len(), 64 * 1024);
        let writes = &session.transport.writes;
        assert_eq!(writes.len(), FAST_DUMP_PAGES as usize);
        assert!(writes.iter().all(|frame| frame[0] == b'f'));
    }

    #[test]
    fn dump_stops_at_first_error_and_reports_page() {
        let reads = vec![
            ack(b'a'),
            with_checksum(&[0u8; PAGE_SIZE]),
            ack(b'a'),
            with_checksum(&[1u8; PAGE_SIZE]),
            ack(b'e'),
        ];
        let mut session = EpromSession::new(MockTransport::new(reads));
        let err = session.dump(8, false).unwrap_err();

        match err {
            EpromError::DumpFailed { page, source } => {
                assert_eq!(page, 2);
                assert!(matches!(*source, EpromError::RejectedByDevice));
            }
            other => panic!("expected DumpFailed, got {:?}", other),
        }
        assert_eq!(session.transport.writes.len(), 3);
    }

    #[test]
    fn burn_rejects_unaligned_image_before_any_write() {
        let mut session = EpromSession::new(MockTransport::new(vec![]));
        let err = session.burn(&vec![0u8; 1000], 8).unwrap_err();
        assert!(matches!(
            err,
            EpromError::SizeMismatch {
                expected: 1024,
                actual: 1000
            }
        ));
        assert!(session.transport.writes.is_empty());
    }

    #[test]
    fn burn_rejects_image_not_matching_declared_size() {
        let mut session = EpromSession::new(MockTransport::new(vec![]));
        // 1024 bytes of image against a declared 16 kbit (2048 byte) ROM
        let err = session.burn(&vec![0u8; 1024], 16).unwrap_err();
        assert!(matches!(
            err,
            EpromError::SizeMismatch {
                expected: 2048,
                actual: 1024
            }
        ));
        assert!(session.transport.writes.is_empty());
    }

    #[test]
    fn burn_writes_every_page_on_success() {
        let mut reads = Vec::new();
        for _ in 0..4 {
            reads.push(ack(b'a'));
            reads.push(with_checksum(&write_ack_body()));
        }
        let image: Vec<u8> = (0..1024u32).map(|i| i as u8).collect();
        let mut session = EpromSession::new(MockTransport::new(reads));
        session.burn(&image, 8).unwrap();

        let writes = &session.transport.writes;
        assert_eq!(writes.len(), 4);
        for (page, frame) in writes.iter().enumerate() {
            assert_eq!(frame.len(), 1 + 2 + PAGE_SIZE + 2);
            assert_eq!(frame[0], b'w');
            assert_eq!(frame[1], page as u8);
            assert_eq!(&frame[3..3 + PAGE_SIZE], &image[page * PAGE_SIZE..][..PAGE_SIZE]);
            assert!(crc16::verify(frame));
        }
    }

    #[test]
    fn burn_failure_mid_transfer_stops_immediately() {
        let mut reads = Vec::new();
        for _ in 0..7 {
            reads.push(ack(b'a'));
            reads.push(with_checksum(&write_ack_body()));
        }
        // Page 7 times out; pages 8..15 must never be attempted
        let image = vec![0u8; 16 * PAGE_SIZE];
        let mut session = EpromSession::new(MockTransport::new(reads));
        let err = session.burn(&image, 32).unwrap_err();

        match err {
            EpromError::BurnInterrupted { page, source } => {
                assert_eq!(page, 7);
                assert!(matches!(*source, EpromError::NoResponse));
            }
            other => panic!("expected BurnInterrupted, got {:?}", other),
        }
        assert_eq!(session.transport.writes.len(), 8);
    }

    #[test]
    fn page_count_follows_declared_size() {
        // 27c256: 256 kbit = 32 KB = 128 pages
        assert_eq!(page_count(256), 128);
        // 27c010: 1024 kbit = 128 KB = 512 pages
        assert_eq!(page_count(1024), 512);
        assert_eq!(rom_bytes(256), 32 * 1024);
    }
}
