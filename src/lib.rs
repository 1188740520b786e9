#![deny(missing_docs)]
//! # UBX LCD Relay
//! Configures a u-blox GNSS receiver and mirrors its NMEA output on a
//! serial character LCD.
//!
//! Configuration commands are UBX frames built from class, id and payload
//! with the checksum computed on encode. The relay reads the receiver one
//! byte at a time and writes each byte to the display, clearing the
//! display whenever a new sentence begins.
mod channel;
mod command;
mod display;
mod error;
mod relay;
/// UBX frame encoding
pub mod ubx;

pub use channel::{
    open, ChannelConfig, DataBits, Parity, SerialChannel, SerialPortChannel, StopBits,
    DEFAULT_BAUD,
};
pub use command::{CommandSender, CommandTable, GpsCommand};
pub use display::{Brightness, CursorStyle, Lcd, Line, DISPLAY_WIDTH};
pub use error::{ChannelRole, RelayError};
pub use relay::{Relay, RelayState, RelayStats, SENTENCE_START};

use std::{thread, time::Duration};

/// Default splash text shown before relaying starts
pub const DEFAULT_BANNER: &str = " GPS Example";

/// Send each startup command to the receiver, in order.
///
/// Stops at the first failure.
pub fn configure_receiver<C: SerialChannel>(
    sender: &mut CommandSender<C>,
    commands: &[GpsCommand],
) -> Result<(), RelayError> {
    if commands.is_empty() {
        log::info!("No receiver configuration requested");
    }
    for &cmd in commands {
        sender.send(cmd)?;
    }
    Ok(())
}

/// Show a splash text for `hold`, then clear the display
pub fn show_banner<C: SerialChannel>(
    lcd: &mut Lcd<C>,
    text: &str,
    hold: Duration,
) -> Result<(), RelayError> {
    lcd.clear()?;
    lcd.write_phrase_padded(text.as_bytes())?;
    thread::sleep(hold);
    lcd.clear()
}
