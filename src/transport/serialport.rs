use tracing::trace;

use super::ByteTransport;
use crate::constants::{READ_CHUNK_SIZE, SERIAL_TIMEOUT_MS};
use crate::error::{EpromError, EpromResult};
use std::io::{Read, Write};

pub type SerialPortName = String;
pub type BaudRate = u32;

/// Serial link parameters.
#[derive(Debug, Clone)]
pub struct SerialParams {
    pub port: SerialPortName,
    pub baud: BaudRate,
}

/// Serial port transport layer
pub struct SerialPortTransport {
    pub serial_port: Box<dyn serialport::SerialPort>,
}

impl SerialPortTransport {
    /// Open the port the way the backend expects it: 8 data bits, no
    /// parity, 1 stop bit, no flow control.
    pub fn new(params: &SerialParams) -> EpromResult<SerialPortTransport> {
        let serial_port = serialport::new(params.port.clone(), params.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()
            .map_err(|e| EpromError::Communication(format!("{:?}", e)))?;

        Ok(SerialPortTransport { serial_port })
    }
}

impl ByteTransport for SerialPortTransport {
    fn write(&mut self, bytes: &[u8]) -> EpromResult<()> {
        self.serial_port
            .write_all(bytes)
            .map_err(|e| EpromError::Communication(format!("{:?}", e)))?;
        trace!("Sent {} bytes", bytes.len());
        Ok(())
    }

    fn read(&mut self, len: usize) -> EpromResult<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::with_capacity(len);

        // Keep reading until we have the expected number of bytes; a
        // timeout with nothing new means the device has gone quiet.
        while buffer.len() < len {
            let mut temp_buffer = vec![0; READ_CHUNK_SIZE.min(len - buffer.len())];
            let bytes_read = self
                .serial_port
                .read(&mut temp_buffer)
                // Timeout error is fine, just stop reading
                .or_else(|e| {
                    if e.kind() == std::io::ErrorKind::TimedOut {
                        Ok(0)
                    } else {
                        Err(e)
                    }
                })
                .map_err(|e| EpromError::Communication(format!("{:?}", e)))?;

            if bytes_read == 0 {
                break;
            }

            buffer.extend_from_slice(&temp_buffer[..bytes_read]);
        }

        trace!("Received {} bytes", buffer.len());
        Ok(buffer)
    }
}
