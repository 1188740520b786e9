use std::convert::Infallible;

use crate::{error::ChannelRole, Lcd, RelayError, SerialChannel};

/// First byte of every NMEA sentence
pub const SENTENCE_START: u8 = b'$';

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Where the relay is with respect to sentence boundaries
pub enum RelayState {
    /// Nothing pending
    #[default]
    Idle,
    /// A sentence marker was read and the display must be reset before it is forwarded
    AtSentenceStart,
}

impl RelayState {
    /// State entered after reading `byte`
    pub fn on_byte(byte: u8) -> Self {
        if byte == SENTENCE_START {
            RelayState::AtSentenceStart
        } else {
            RelayState::Idle
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Running counters
pub struct RelayStats {
    /// Bytes forwarded to the display
    pub bytes: u64,
    /// Sentence markers seen
    pub sentences: u64,
}

/// Forwards receiver output to the display one byte at a time.
///
/// Every byte read is written to the display in the order received. A
/// sentence marker first clears the display so each sentence starts at
/// the top left.
pub struct Relay<R, D> {
    receiver: R,
    display: Lcd<D>,
    state: RelayState,
    stats: RelayStats,
}

impl<R: SerialChannel, D: SerialChannel> Relay<R, D> {
    /// Connect a receiver channel to a display
    pub fn new(receiver: R, display: Lcd<D>) -> Self {
        Self {
            receiver,
            display,
            state: RelayState::Idle,
            stats: RelayStats::default(),
        }
    }

    /// Move one byte from the receiver to the display.
    ///
    /// Blocks inside the receiver read until a byte arrives; nothing is
    /// written to the display before that.
    pub fn step(&mut self) -> Result<(), RelayError> {
        let byte = self
            .receiver
            .read_byte()
            .map_err(RelayError::fault(ChannelRole::Receiver))?;
        log::trace!("rx {byte:02X}");
        self.state = RelayState::on_byte(byte);
        if self.state == RelayState::AtSentenceStart {
            self.display.clear()?;
            self.stats.sentences += 1;
            log::debug!(
                "Sentence {} starts after {} bytes",
                self.stats.sentences,
                self.stats.bytes
            );
        }
        self.display.write_byte(byte)?;
        self.stats.bytes += 1;
        self.state = RelayState::Idle;
        Ok(())
    }

    /// Relay until a channel fails
    pub fn run(&mut self) -> Result<Infallible, RelayError> {
        log::info!("Relaying receiver output to display");
        loop {
            if let Err(e) = self.step() {
                log::warn!(
                    "Relay stopped after {} bytes, {} sentences: {e}",
                    self.stats.bytes,
                    self.stats.sentences
                );
                return Err(e);
            }
        }
    }

    /// Current state
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Counters since creation
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Release both channels
    pub fn into_inner(self) -> (R, Lcd<D>) {
        (self.receiver, self.display)
    }
}
