use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpromError {
    /// Serial link could not be opened, written to or read from.
    #[error("Communication error: {0}")]
    Communication(String),

    /// The backend never answered within the transport timeout. The
    /// protocol cannot tell a slow device from an absent one here.
    #[error("Timeout: no response from backend")]
    NoResponse,

    #[error("Received {actual} bytes, expected {expected}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Corrupted acknowledgement received")]
    CorruptedAck,

    #[error("Corrupted data received")]
    CorruptedPayload,

    /// The backend saw a bad checksum in what we sent.
    #[error("Bad CRC transmitted to backend")]
    RejectedByDevice,

    /// Ack tag was neither 'a' nor 'e'; wrong firmware or not our device.
    #[error(
        "Unacceptable reply from backend (tag 0x{tag:02X}); check the device connectivity and backend version"
    )]
    UnrecognizedDevice { tag: u8 },

    /// Caller-side contract violation, raised before any I/O.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// ROM image length disagrees with the declared ROM size.
    #[error("ROM image size mismatch: image is {actual} bytes, rom size = {expected} bytes")]
    SizeMismatch { expected: usize, actual: usize },

    /// Dump aborted; the partial image is discarded, the EPROM is untouched.
    #[error("Dump failed at page {page}: {source}")]
    DumpFailed {
        page: u16,
        #[source]
        source: Box<EpromError>,
    },

    /// Burn aborted mid-transfer; the EPROM may be partially programmed.
    #[error("Burn interrupted at page {page}, device left in an unknown state: {source}")]
    BurnInterrupted {
        page: u16,
        #[source]
        source: Box<EpromError>,
    },

    #[error("Image file error: {0}")]
    ImageError(String),

    /// Input file does not carry the expected fixed header.
    #[error("Bad image header: {0}")]
    BadImageHeader(String),
}

pub type EpromResult<T> = std::result::Result<T, EpromError>;
