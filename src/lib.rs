use std::path::Path;

use error::{EpromError, EpromResult};
use protocol::engine::EpromSession;
pub use transport::{ByteTransport, SerialParams};
use transport::SerialPortTransport;

pub(crate) mod constants;
pub mod error;
pub mod ines;
pub mod protocol;
pub mod transport;
pub(crate) mod util;

/// One serial-attached EPROM programmer. Owns the link exclusively for
/// the lifetime of the value; operations run one blocking command at a
/// time.
pub struct Eprom {
    session: EpromSession<Box<dyn ByteTransport>>,
}

impl Eprom {
    /// Open the serial link to the burner backend.
    pub fn open(params: &SerialParams) -> EpromResult<Self> {
        let transport = SerialPortTransport::new(params)?;
        Ok(Self::from_transport(Box::new(transport)))
    }

    /// Drive the protocol over any byte transport. Useful for tests and
    /// for links other than a local serial port.
    pub fn from_transport(transport: Box<dyn ByteTransport>) -> Self {
        Eprom {
            session: EpromSession::new(transport),
        }
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.session.progress_bar(enable);
    }

    /// Check that a live backend is on the other end of the link.
    /// Returns its raw identity string.
    pub fn check(&mut self) -> EpromResult<Vec<u8>> {
        self.session.identify()
    }

    /// Dump the ROM contents into memory.
    pub fn dump(&mut self, size_kbit: u32, fast: bool) -> EpromResult<Vec<u8>> {
        self.session.dump(size_kbit, fast)
    }

    /// Dump the ROM contents straight to a file. Nothing is written on
    /// error; a partial image is never a valid artifact.
    pub fn dump_to_file(&mut self, path: &Path, size_kbit: u32, fast: bool) -> EpromResult<usize> {
        let image = self.session.dump(size_kbit, fast)?;
        std::fs::write(path, &image).map_err(|e| {
            EpromError::ImageError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(image.len())
    }

    /// Burn a ROM image from memory to the device.
    pub fn burn(&mut self, image: &[u8], size_kbit: u32) -> EpromResult<()> {
        self.session.burn(image, size_kbit)
    }

    /// Burn a ROM image file to the device. The file size is validated
    /// against the declared ROM size before any page goes out.
    pub fn burn_file(&mut self, path: &Path, size_kbit: u32) -> EpromResult<()> {
        let image = std::fs::read(path).map_err(|e| {
            EpromError::ImageError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.session.burn(&image, size_kbit)
    }
}
