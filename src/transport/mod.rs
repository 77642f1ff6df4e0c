pub mod serialport;

use crate::error::EpromResult;

pub use serialport::{BaudRate, SerialParams, SerialPortName, SerialPortTransport};

/// Blocking byte-stream link to the burner backend.
///
/// `read` blocks up to the transport's configured timeout and may return
/// fewer than `len` bytes only on timeout or EOF; the protocol engine
/// turns that into the appropriate error.
pub trait ByteTransport {
    /// Write the whole buffer to the device.
    fn write(&mut self, bytes: &[u8]) -> EpromResult<()>;

    /// Read up to `len` bytes from the device.
    fn read(&mut self, len: usize) -> EpromResult<Vec<u8>>;
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> EpromResult<()> {
        (**self).write(bytes)
    }

    fn read(&mut self, len: usize) -> EpromResult<Vec<u8>> {
        (**self).read(len)
    }
}
