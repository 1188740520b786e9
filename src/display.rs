use crate::{error::ChannelRole, RelayError, SerialChannel};

/// Prefix for HD44780 instructions passed through the serial backpack
pub const COMMAND_PREFIX: u8 = 0xfe;
/// Prefix for backpack settings such as the backlight level
pub const SETTING_PREFIX: u8 = 0x7c;
/// Clear the display and return the cursor home
pub const CLEAR: [u8; 2] = [COMMAND_PREFIX, 0x01];
/// Move the cursor to the start of line 1
pub const LINE_ONE: [u8; 2] = [COMMAND_PREFIX, 0x80];
/// Move the cursor to the start of line 2
pub const LINE_TWO: [u8; 2] = [COMMAND_PREFIX, 0xc0];
/// Characters on the display (2 lines of 16)
pub const DISPLAY_WIDTH: usize = 32;

const BRIGHTNESS_MIN: u8 = 128;
const BRIGHTNESS_MAX: u8 = 157;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// A display line
pub enum Line {
    /// Top line
    One,
    /// Bottom line
    Two,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Cursor rendering
pub enum CursorStyle {
    /// No visible cursor
    Hidden,
    /// Underscore under the current position
    Underscore,
    /// Blinking block
    Blink,
}

impl CursorStyle {
    fn instruction(&self) -> u8 {
        match self {
            CursorStyle::Hidden => 0x0c,
            CursorStyle::Underscore => 0x0e,
            CursorStyle::Blink => 0x0d,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Backlight level as understood by the serial backpack (128 = off, 157 = full)
pub struct Brightness(u8);

impl Brightness {
    /// Backlight level from a percentage, clamped to 0..=100
    pub fn percent(pct: u8) -> Self {
        let pct = pct.min(100) as u16;
        let span = (BRIGHTNESS_MAX - BRIGHTNESS_MIN) as u16;
        Self(BRIGHTNESS_MIN + ((pct * span + 50) / 100) as u8)
    }

    /// Raw level byte
    pub fn level(&self) -> u8 {
        self.0
    }
}

/// A character LCD behind a serial backpack.
///
/// All writes go to the display channel in call order. The display keeps
/// its own cursor; every [`Lcd::clear`] returns it to the origin.
pub struct Lcd<C> {
    channel: C,
}

impl<C: SerialChannel> Lcd<C> {
    /// Wrap the display channel
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
        self.channel
            .write_all(bytes)
            .map_err(RelayError::fault(ChannelRole::Display))
    }

    /// Clear the screen and home the cursor
    pub fn clear(&mut self) -> Result<(), RelayError> {
        self.send(&CLEAR)
    }

    /// Move the cursor to the start of a line
    pub fn select_line(&mut self, line: Line) -> Result<(), RelayError> {
        match line {
            Line::One => self.send(&LINE_ONE),
            Line::Two => self.send(&LINE_TWO),
        }
    }

    /// Change how the cursor is drawn
    pub fn set_cursor_style(&mut self, style: CursorStyle) -> Result<(), RelayError> {
        self.send(&[COMMAND_PREFIX, style.instruction()])
    }

    /// Set the backlight level
    pub fn set_brightness(&mut self, level: Brightness) -> Result<(), RelayError> {
        self.send(&[SETTING_PREFIX, level.level()])
    }

    /// Write one character at the cursor
    pub fn write_byte(&mut self, byte: u8) -> Result<(), RelayError> {
        self.channel
            .write_byte(byte)
            .map_err(RelayError::fault(ChannelRole::Display))
    }

    /// Write at most [`DISPLAY_WIDTH`] bytes of `phrase`.
    ///
    /// Returns the number of bytes written, `min(phrase.len(), DISPLAY_WIDTH)`.
    pub fn write_phrase(&mut self, phrase: &[u8]) -> Result<usize, RelayError> {
        let n = phrase.len().min(DISPLAY_WIDTH);
        self.send(&phrase[..n])?;
        Ok(n)
    }

    /// Write `phrase` and fill the rest of the display with spaces
    pub fn write_phrase_padded(&mut self, phrase: &[u8]) -> Result<(), RelayError> {
        let n = self.write_phrase(phrase)?;
        self.send(&[b' '; DISPLAY_WIDTH][..DISPLAY_WIDTH - n])
    }

    /// Release the channel
    pub fn into_inner(self) -> C {
        self.channel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::mock::MockChannel;

    #[test]
    fn control_sequences() {
        let mut lcd = Lcd::new(MockChannel::default());
        lcd.clear().unwrap();
        lcd.select_line(Line::One).unwrap();
        lcd.select_line(Line::Two).unwrap();
        lcd.set_cursor_style(CursorStyle::Underscore).unwrap();
        lcd.set_brightness(Brightness::percent(40)).unwrap();
        assert_eq!(
            lcd.into_inner().outbound,
            vec![0xFE, 0x01, 0xFE, 0x80, 0xFE, 0xC0, 0xFE, 0x0E, 0x7C, 140]
        );
    }

    #[test]
    fn brightness_range() {
        assert_eq!(Brightness::percent(0).level(), 128);
        assert_eq!(Brightness::percent(100).level(), 157);
        assert_eq!(Brightness::percent(250).level(), 157);
    }

    #[test]
    fn short_phrase_is_not_overread() {
        let mut lcd = Lcd::new(MockChannel::default());
        let n = lcd.write_phrase(b" GPS Example").unwrap();
        assert_eq!(n, 12);
        assert_eq!(lcd.into_inner().outbound, b" GPS Example".to_vec());
    }

    #[test]
    fn long_phrase_is_clamped() {
        let mut lcd = Lcd::new(MockChannel::default());
        let phrase = [b'x'; 40];
        assert_eq!(lcd.write_phrase(&phrase).unwrap(), DISPLAY_WIDTH);
        assert_eq!(lcd.into_inner().outbound.len(), DISPLAY_WIDTH);
    }

    #[test]
    fn padded_phrase_fills_display() {
        let mut lcd = Lcd::new(MockChannel::default());
        lcd.write_phrase_padded(b"abc").unwrap();
        let out = lcd.into_inner().outbound;
        assert_eq!(out.len(), DISPLAY_WIDTH);
        assert_eq!(&out[..3], b"abc");
        assert!(out[3..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn write_fault_is_tagged_display() {
        let mut lcd = Lcd::new(MockChannel {
            fail_writes: true,
            ..Default::default()
        });
        assert!(matches!(
            lcd.clear(),
            Err(RelayError::ChannelFault {
                role: ChannelRole::Display,
                ..
            })
        ));
    }
}
