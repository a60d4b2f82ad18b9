use std::{
    collections::VecDeque,
    io::Read,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::error::HostError;

/// Serial line rate: 115 200 8N1.
pub const BAUD_RATE: u32 = 115_200;

/// Read timeout applied to the port so polls never block the UI.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Byte-stream transport to a device.
///
/// [`SerialLink`] is the real thing; [`PipeLink`] is the in-memory pair
/// tests and simulators run against.
pub trait Link {
    /// Read whatever is available into `buf`; `Ok(0)` when nothing is.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HostError>;
    /// Write the whole buffer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HostError>;
}

/// Names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>, HostError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// A link over a real serial port.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    /// Open `path` at the fixed protocol rate.
    pub fn open(path: &str) -> Result<Self, HostError> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        tracing::info!(path, "serial port open");
        Ok(SerialLink { port })
    }
}

impl Link for SerialLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HostError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HostError> {
        std::io::Write::write_all(&mut self.port, bytes)?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.port.name())
            .finish()
    }
}

/// In-memory link pair: whatever one endpoint writes, the other reads.
#[derive(Debug)]
pub struct PipeLink {
    rx: Arc<Mutex<VecDeque<u8>>>,
    tx: Arc<Mutex<VecDeque<u8>>>,
}

impl PipeLink {
    /// A connected pair of endpoints.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
        let a = PipeLink {
            rx: Arc::clone(&b_to_a),
            tx: Arc::clone(&a_to_b),
        };
        let b = PipeLink {
            rx: a_to_b,
            tx: b_to_a,
        };
        (a, b)
    }
}

impl Link for PipeLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, HostError> {
        let mut rx = self.rx.lock().expect("pipe lock");
        let n = buf.len().min(rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = rx.pop_front().expect("length checked");
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), HostError> {
        self.tx.lock().expect("pipe lock").extend(bytes.iter().copied());
        Ok(())
    }
}
