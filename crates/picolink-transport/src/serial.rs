use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::channel::Channel;
use crate::error::{Result, TransportError};

/// Fixed baud rate of the hardware serial fallback.
pub const HARDWARE_BAUD: u32 = 115_200;

/// Default device node for the hardware serial fallback.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyAMA0";

/// How long a read waits on an idle line before reporting "no data yet".
pub const SERIAL_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Hardware serial configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device node of the UART.
    pub path: PathBuf,
    /// Line rate. Default: [`HARDWARE_BAUD`].
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SERIAL_PATH),
            baud: HARDWARE_BAUD,
        }
    }
}

impl SerialConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Raw 8N1 serial line.
///
/// Reads time out after [`SERIAL_POLL_TIMEOUT`] on an idle line and report an
/// empty read instead of blocking forever.
pub struct SerialPort {
    port: Box<dyn serialport::SerialPort>,
    path: PathBuf,
}

impl SerialPort {
    /// Open and configure the device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.path.to_string_lossy(), config.baud)
            .timeout(SERIAL_POLL_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|err| TransportError::Serial {
                path: config.path.clone(),
                source: err.into(),
            })?;

        info!(path = ?config.path, baud = config.baud, "serial line configured");
        Ok(Self {
            port,
            path: config.path.clone(),
        })
    }

    /// Device node this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Channel for SerialPort {
    fn name(&self) -> &'static str {
        "hardware-serial"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Waits until the UART has drained its output queue.
        self.port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud", &self.port.baud_rate().ok())
            .finish()
    }
}
