use std::{
    io::{ErrorKind, Read, Write},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use crate::RelayError;

/// A full-duplex byte stream bound to one UART.
///
/// Reads and writes block the calling thread until the transfer completes.
/// Implementations must not spin while waiting for data: `read_byte`
/// suspends inside the transport and only returns once a byte has arrived
/// or the transport reports a fault.
pub trait SerialChannel {
    /// Wait for and return the next inbound byte
    fn read_byte(&mut self) -> std::io::Result<u8>;

    /// Transmit a single byte
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()>;

    /// Transmit every byte of `data` in order
    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Non-blocking check for pending inbound data
    fn bytes_available(&mut self) -> std::io::Result<bool>;
}

impl<T: SerialChannel + ?Sized> SerialChannel for &mut T {
    fn read_byte(&mut self) -> std::io::Result<u8> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        (**self).write_byte(byte)
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        (**self).write_all(data)
    }

    fn bytes_available(&mut self) -> std::io::Result<bool> {
        (**self).bytes_available()
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    /// 5 bits
    Five,
    /// 6 bits
    Six,
    /// 7 bits
    Seven,
    /// 8 bits
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Settings used to open a serial channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Device path, e.g. `/dev/ttyUSB0`
    pub port: String,
    /// Line speed in bits per second
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Stop bits per character
    pub stop_bits: StopBits,
}

/// Default line speed of both the receiver and the display
pub const DEFAULT_BAUD: u32 = 9600;

impl ChannelConfig {
    /// 8-N-1 at the given speed
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

// Upper bound on a single read syscall. Timeouts only re-arm the read.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Open a serial device with the given settings
pub fn open(cfg: &ChannelConfig) -> Result<SerialPortChannel, RelayError> {
    let port = serialport::new(&cfg.port, cfg.baud_rate)
        .data_bits(cfg.data_bits.into())
        .parity(cfg.parity.into())
        .stop_bits(cfg.stop_bits.into())
        .flow_control(serialport::FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| RelayError::Open {
            port: cfg.port.clone(),
            source,
        })?;
    log::info!(
        "Opened {} at {} baud ({:?}, {:?}, {:?})",
        cfg.port,
        cfg.baud_rate,
        cfg.data_bits,
        cfg.parity,
        cfg.stop_bits
    );
    Ok(SerialPortChannel { port })
}

/// A [`SerialChannel`] backed by an operating system serial device
pub struct SerialPortChannel {
    port: Box<dyn SerialPort>,
}

impl SerialPortChannel {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Name of the underlying device, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl SerialChannel for SerialPortChannel {
    fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            match self.port.read(&mut buf) {
                Ok(1) => return Ok(buf[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.port.write_all(&[byte])?;
        self.port.flush()
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> std::io::Result<bool> {
        self.port
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(std::io::Error::from)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::{
        collections::VecDeque,
        io::ErrorKind,
        sync::{mpsc, Arc, Mutex},
    };

    use super::SerialChannel;

    /// In-memory channel: reads drain `inbound`, writes append to `outbound`
    #[derive(Debug, Default)]
    pub struct MockChannel {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
        pub fail_writes: bool,
    }

    impl MockChannel {
        pub fn with_input(data: &[u8]) -> Self {
            Self {
                inbound: data.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl SerialChannel for MockChannel {
        fn read_byte(&mut self) -> std::io::Result<u8> {
            self.inbound
                .pop_front()
                .ok_or_else(|| std::io::Error::new(ErrorKind::UnexpectedEof, "mock drained"))
        }

        fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
            if self.fail_writes {
                return Err(std::io::Error::new(ErrorKind::BrokenPipe, "mock write failure"));
            }
            self.outbound.push(byte);
            Ok(())
        }

        fn bytes_available(&mut self) -> std::io::Result<bool> {
            Ok(!self.inbound.is_empty())
        }
    }

    /// Channel whose reads park on an mpsc queue until a byte is sent
    pub struct BlockingChannel {
        pub rx: mpsc::Receiver<u8>,
        pub written: Arc<Mutex<Vec<u8>>>,
    }

    impl BlockingChannel {
        pub fn new() -> (mpsc::Sender<u8>, Self) {
            let (tx, rx) = mpsc::channel();
            (
                tx,
                Self {
                    rx,
                    written: Arc::new(Mutex::new(Vec::new())),
                },
            )
        }
    }

    impl SerialChannel for BlockingChannel {
        fn read_byte(&mut self) -> std::io::Result<u8> {
            self.rx
                .recv()
                .map_err(|e| std::io::Error::new(ErrorKind::BrokenPipe, e))
        }

        fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
            self.written
                .lock()
                .map_err(|_| std::io::Error::new(ErrorKind::Other, "poisoned"))?
                .push(byte);
            Ok(())
        }

        fn bytes_available(&mut self) -> std::io::Result<bool> {
            Ok(false)
        }
    }
}
