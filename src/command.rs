use bitfield_struct::bitfield;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{
    error::ChannelRole,
    ubx::UbxFrame,
    RelayError, SerialChannel,
};

/// UBX configuration message class
pub const CLASS_CFG: u8 = 0x06;
/// CFG-PRT: port configuration
pub const ID_CFG_PRT: u8 = 0x00;
/// CFG-MSG: per-port message output rates
pub const ID_CFG_MSG: u8 = 0x01;
/// CFG-RST: receiver reset
pub const ID_CFG_RST: u8 = 0x04;
/// CFG-RATE: navigation and measurement rate
pub const ID_CFG_RATE: u8 = 0x08;
/// CFG-SBAS: satellite based augmentation
pub const ID_CFG_SBAS: u8 = 0x16;

/// NMEA standard message class, as used by CFG-MSG
pub const CLASS_NMEA: u8 = 0xf0;
/// NMEA RMC message id
pub const NMEA_RMC: u8 = 0x04;
/// NMEA VTG message id
pub const NMEA_VTG: u8 = 0x05;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// A named receiver configuration command
pub enum GpsCommand {
    /// Restart the navigation engine keeping all stored data
    #[serde(rename = "hot-start")]
    HotStartReset,
    /// Restart discarding almanac, ephemeris and position
    #[serde(rename = "cold-start")]
    ColdStartReset,
    /// Raise the fix output rate to 5 Hz
    #[serde(rename = "five-hertz")]
    FiveHertz,
    /// Turn on the VTG (course and speed over ground) sentence
    #[serde(rename = "enable-vtg")]
    EnableVtg,
    /// Turn off the RMC (recommended minimum) sentence
    #[serde(rename = "disable-rmc")]
    DisableRmc,
    /// Set the receiver UART to 9600 baud
    #[serde(rename = "baud-9600")]
    Baud9600,
    /// Set the receiver UART to 4800 baud
    #[serde(rename = "baud-4800")]
    Baud4800,
    /// Enable SBAS corrections
    #[serde(rename = "enable-sbas")]
    EnableSbas,
    /// Disable SBAS corrections
    #[serde(rename = "disable-sbas")]
    DisableSbas,
}

impl GpsCommand {
    /// Every known command, in table order
    pub const ALL: [GpsCommand; 9] = [
        GpsCommand::HotStartReset,
        GpsCommand::ColdStartReset,
        GpsCommand::FiveHertz,
        GpsCommand::EnableVtg,
        GpsCommand::DisableRmc,
        GpsCommand::Baud9600,
        GpsCommand::Baud4800,
        GpsCommand::EnableSbas,
        GpsCommand::DisableSbas,
    ];

    /// Command line and config file name
    pub fn name(&self) -> &'static str {
        match self {
            GpsCommand::HotStartReset => "hot-start",
            GpsCommand::ColdStartReset => "cold-start",
            GpsCommand::FiveHertz => "five-hertz",
            GpsCommand::EnableVtg => "enable-vtg",
            GpsCommand::DisableRmc => "disable-rmc",
            GpsCommand::Baud9600 => "baud-9600",
            GpsCommand::Baud4800 => "baud-4800",
            GpsCommand::EnableSbas => "enable-sbas",
            GpsCommand::DisableSbas => "disable-sbas",
        }
    }

    /// Encoded length of the command frame as documented by the vendor
    pub fn documented_len(&self) -> usize {
        match self {
            GpsCommand::HotStartReset | GpsCommand::ColdStartReset => 12,
            GpsCommand::FiveHertz => 14,
            GpsCommand::EnableVtg | GpsCommand::DisableRmc => 16,
            GpsCommand::Baud9600 | GpsCommand::Baud4800 => 28,
            GpsCommand::EnableSbas | GpsCommand::DisableSbas => 16,
        }
    }

    /// The unencoded UBX message for this command
    pub fn frame(&self) -> &'static UbxFrame {
        &COMMAND_FRAMES[self]
    }
}

impl Display for GpsCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GpsCommand {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GpsCommand::ALL
            .iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| RelayError::UnknownCommand(s.to_string()))
    }
}

/// CFG-RST reset type: controlled software reset of the GNSS engine only
const RESET_GNSS_ONLY: u8 = 0x02;
/// CFG-RST battery backed RAM mask for a hot start: clear nothing
const BBR_HOT_START: u16 = 0x0000;
/// CFG-RST battery backed RAM mask for a cold start
const BBR_COLD_START: u16 = 0x87ff;

fn cfg_rst(nav_bbr_mask: u16) -> UbxFrame {
    let mask = nav_bbr_mask.to_le_bytes();
    UbxFrame::new(CLASS_CFG, ID_CFG_RST, [mask[0], mask[1], RESET_GNSS_ONLY, 0])
}

/// CFG-RATE time reference: GPS time
const TIME_REF_GPS: u16 = 1;

fn cfg_rate(meas_rate_ms: u16, nav_rate: u16) -> UbxFrame {
    let mut payload = Vec::with_capacity(6);
    payload.extend_from_slice(&meas_rate_ms.to_le_bytes());
    payload.extend_from_slice(&nav_rate.to_le_bytes());
    payload.extend_from_slice(&TIME_REF_GPS.to_le_bytes());
    UbxFrame::new(CLASS_CFG, ID_CFG_RATE, payload)
}

/// Output rates per port: I2C, UART1, UART2, USB, SPI, reserved
fn cfg_msg(msg_class: u8, msg_id: u8, rates: [u8; 6]) -> UbxFrame {
    let mut payload = Vec::with_capacity(8);
    payload.push(msg_class);
    payload.push(msg_id);
    payload.extend_from_slice(&rates);
    UbxFrame::new(CLASS_CFG, ID_CFG_MSG, payload)
}

/// CFG-PRT UART mode word
#[bitfield(u32)]
pub struct UartMode {
    #[bits(4)]
    __: u8,
    /// Reserved bit that must always be set
    #[bits(1)]
    pub always_set: bool,
    #[bits(1)]
    __: u8,
    /// Character length: 0 = 5 bits .. 3 = 8 bits
    #[bits(2)]
    pub char_len: u8,
    #[bits(1)]
    __: u8,
    /// Parity: 0b000 even, 0b001 odd, 0b10x none
    #[bits(3)]
    pub parity: u8,
    /// Stop bits: 0 = 1, 1 = 1.5, 2 = 2, 3 = 0.5
    #[bits(2)]
    pub n_stop_bits: u8,
    #[bits(18)]
    __: u32,
}

impl UartMode {
    /// 8 data bits, no parity, 1 stop bit
    pub fn eight_n_one() -> Self {
        Self::new()
            .with_always_set(true)
            .with_char_len(0b11)
            .with_parity(0b100)
            .with_n_stop_bits(0)
    }
}

/// UART1 port identifier
const PORT_UART1: u8 = 1;
/// UBX + NMEA + RTCM2
const PROTO_MASK_DEFAULT: u16 = 0x0007;

fn cfg_prt_uart1(baud_rate: u32) -> UbxFrame {
    let mut payload = Vec::with_capacity(20);
    payload.push(PORT_UART1);
    payload.push(0); // reserved
    payload.extend_from_slice(&0u16.to_le_bytes()); // txReady off
    payload.extend_from_slice(&u32::from(UartMode::eight_n_one()).to_le_bytes());
    payload.extend_from_slice(&baud_rate.to_le_bytes());
    payload.extend_from_slice(&PROTO_MASK_DEFAULT.to_le_bytes());
    payload.extend_from_slice(&PROTO_MASK_DEFAULT.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes()); // flags
    payload.extend_from_slice(&0u16.to_le_bytes()); // reserved
    UbxFrame::new(CLASS_CFG, ID_CFG_PRT, payload)
}

/// CFG-SBAS usage: ranging, diffCorr
const SBAS_USAGE: u8 = 0x03;
/// CFG-SBAS: max SBAS channels to search
const SBAS_MAX_CHANNELS: u8 = 3;
/// CFG-SBAS PRN scan mask (WAAS, EGNOS, MSAS PRNs)
const SBAS_SCANMODE1: u32 = 0x0006_6251;

fn cfg_sbas(enabled: bool) -> UbxFrame {
    let mut payload = Vec::with_capacity(8);
    payload.push(enabled as u8);
    payload.push(SBAS_USAGE);
    payload.push(SBAS_MAX_CHANNELS);
    payload.push(0); // scanmode2
    payload.extend_from_slice(&SBAS_SCANMODE1.to_le_bytes());
    UbxFrame::new(CLASS_CFG, ID_CFG_SBAS, payload)
}

lazy_static! {
    static ref COMMAND_FRAMES: HashMap<GpsCommand, UbxFrame> = GpsCommand::ALL
        .iter()
        .map(|&cmd| {
            let frame = match cmd {
                GpsCommand::HotStartReset => cfg_rst(BBR_HOT_START),
                GpsCommand::ColdStartReset => cfg_rst(BBR_COLD_START),
                GpsCommand::FiveHertz => cfg_rate(200, 1),
                GpsCommand::EnableVtg => cfg_msg(CLASS_NMEA, NMEA_VTG, [0, 1, 0, 0, 0, 1]),
                GpsCommand::DisableRmc => cfg_msg(CLASS_NMEA, NMEA_RMC, [0, 0, 0, 0, 0, 1]),
                GpsCommand::Baud9600 => cfg_prt_uart1(9600),
                GpsCommand::Baud4800 => cfg_prt_uart1(4800),
                GpsCommand::EnableSbas => cfg_sbas(true),
                GpsCommand::DisableSbas => cfg_sbas(false),
            };
            (cmd, frame)
        })
        .collect();
}

/// Encoded frames for every [`GpsCommand`], checked against their
/// documented lengths when built
#[derive(Debug, Clone)]
pub struct CommandTable {
    frames: HashMap<GpsCommand, Vec<u8>>,
}

impl CommandTable {
    /// Encode and validate every command
    pub fn load() -> Result<Self, RelayError> {
        let mut frames = HashMap::with_capacity(GpsCommand::ALL.len());
        for cmd in GpsCommand::ALL {
            let bytes = cmd.frame().to_bytes();
            Self::check(cmd, &bytes)?;
            frames.insert(cmd, bytes);
        }
        Ok(Self { frames })
    }

    fn check(cmd: GpsCommand, bytes: &[u8]) -> Result<(), RelayError> {
        if bytes.len() != cmd.documented_len() {
            log::warn!(
                "{cmd} encodes to {} bytes instead of {}",
                bytes.len(),
                cmd.documented_len()
            );
            return Err(RelayError::FrameLengthMismatch {
                command: cmd,
                declared: cmd.documented_len(),
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    /// Encoded bytes of a command
    pub fn frame(&self, cmd: GpsCommand) -> &[u8] {
        // load() inserts every command
        &self.frames[&cmd]
    }

    /// Iterate over all commands and their frames
    pub fn iter(&self) -> impl Iterator<Item = (GpsCommand, &[u8])> {
        GpsCommand::ALL
            .into_iter()
            .map(move |cmd| (cmd, self.frame(cmd)))
    }
}

/// Writes configuration frames to the receiver channel
pub struct CommandSender<C> {
    channel: C,
    table: CommandTable,
}

impl<C: SerialChannel> CommandSender<C> {
    /// Bind a validated table to the receiver's outbound channel
    pub fn new(channel: C, table: CommandTable) -> Self {
        Self { channel, table }
    }

    /// Write a frame byte by byte, blocking until each byte is accepted
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), RelayError> {
        for &byte in frame {
            self.channel
                .write_byte(byte)
                .map_err(RelayError::fault(ChannelRole::Receiver))?;
        }
        Ok(())
    }

    /// Send a named command
    pub fn send(&mut self, cmd: GpsCommand) -> Result<(), RelayError> {
        let frame = self.table.frame(cmd).to_vec();
        self.send_frame(&frame)?;
        log::info!("Sent {cmd} ({} bytes)", frame.len());
        Ok(())
    }

    /// Send a hot start reset
    pub fn hot_start_reset(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::HotStartReset)
    }

    /// Send a cold start reset
    pub fn cold_start_reset(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::ColdStartReset)
    }

    /// Switch fix output to 5 Hz
    pub fn enable_five_hertz(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::FiveHertz)
    }

    /// Enable the VTG sentence
    pub fn enable_vtg(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::EnableVtg)
    }

    /// Disable the RMC sentence
    pub fn disable_rmc(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::DisableRmc)
    }

    /// Reconfigure the receiver UART to 9600 baud
    pub fn set_baud_9600(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::Baud9600)
    }

    /// Reconfigure the receiver UART to 4800 baud
    pub fn set_baud_4800(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::Baud4800)
    }

    /// Enable SBAS corrections
    pub fn enable_sbas(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::EnableSbas)
    }

    /// Disable SBAS corrections
    pub fn disable_sbas(&mut self) -> Result<(), RelayError> {
        self.send(GpsCommand::DisableSbas)
    }

    /// The validated command table
    pub fn table(&self) -> &CommandTable {
        &self.table
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

    fn golden(cmd: GpsCommand) -> Vec<u8> {
        match cmd {
            GpsCommand::HotStartReset => vec![
                0xB5, 0x62, 0x06, 0x04, 0x04, 0x00, 0x00, 0x00, 0x02, 0x00, 0x10, 0x68,
            ],
            GpsCommand::ColdStartReset => vec![
                0xB5, 0x62, 0x06, 0x04, 0x04, 0x00, 0xFF, 0x87, 0x02, 0x00, 0x96, 0xF9,
            ],
            GpsCommand::FiveHertz => vec![
                0xB5, 0x62, 0x06, 0x08, 0x06, 0x00, 0xC8, 0x00, 0x01, 0x00, 0x01, 0x00, 0xDE, 0x6A,
            ],
            GpsCommand::EnableVtg => vec![
                0xB5, 0x62, 0x06, 0x01, 0x08, 0x00, 0xF0, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
                0x06, 0x4C,
            ],
            GpsCommand::DisableRmc => vec![
                0xB5, 0x62, 0x06, 0x01, 0x08, 0x00, 0xF0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
                0x04, 0x40,
            ],
            GpsCommand::Baud9600 => vec![
                0xB5, 0x62, 0x06, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x00, 0xD0, 0x08, 0x00, 0x00,
                0x80, 0x25, 0x00, 0x00, 0x07, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0xA6, 0xCD,
            ],
            GpsCommand::Baud4800 => vec![
                0xB5, 0x62, 0x06, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x00, 0xD0, 0x08, 0x00, 0x00,
                0xC0, 0x12, 0x00, 0x00, 0x07, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0xD3, 0xFC,
            ],
            GpsCommand::EnableSbas => vec![
                0xB5, 0x62, 0x06, 0x16, 0x08, 0x00, 0x01, 0x03, 0x03, 0x00, 0x51, 0x62, 0x06, 0x00,
                0xE4, 0x2F,
            ],
            GpsCommand::DisableSbas => vec![
                0xB5, 0x62, 0x06, 0x16, 0x08, 0x00, 0x00, 0x03, 0x03, 0x00, 0x51, 0x62, 0x06, 0x00,
                0xE3, 0x27,
            ],
        }
    }

    #[test]
    fn every_command_matches_golden_bytes() {
        let table = CommandTable::load().unwrap();
        for (cmd, frame) in table.iter() {
            assert_eq!(frame, golden(cmd).as_slice(), "{cmd}");
            assert_eq!(frame.len(), cmd.documented_len(), "{cmd}");
        }
    }

    #[test]
    fn golden_bytes_are_valid_literals() {
        for cmd in GpsCommand::ALL {
            let bytes = golden(cmd);
            let frame = UbxFrame::from_literal(&bytes, cmd.documented_len()).unwrap();
            assert_eq!(&frame, cmd.frame());
        }
    }

    #[test]
    fn uart_mode_is_8n1_word() {
        assert_eq!(u32::from(UartMode::eight_n_one()), 0x0000_08d0);
    }

    #[test]
    fn length_check_rejects_short_frame() {
        let err = CommandTable::check(GpsCommand::FiveHertz, &golden(GpsCommand::FiveHertz)[..12])
            .unwrap_err();
        match err {
            RelayError::FrameLengthMismatch {
                command,
                declared,
                actual,
            } => {
                assert_eq!(command, GpsCommand::FiveHertz);
                assert_eq!(declared, 14);
                assert_eq!(actual, 12);
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn sender_writes_whole_frame_in_order() {
        let mut sender = CommandSender::new(MockChannel::default(), CommandTable::load().unwrap());
        sender.enable_five_hertz().unwrap();
        sender.disable_sbas().unwrap();
        let mut expect = golden(GpsCommand::FiveHertz);
        expect.extend(golden(GpsCommand::DisableSbas));
        assert_eq!(sender.into_inner().outbound, expect);
    }

    #[test]
    fn send_frame_surfaces_channel_fault() {
        let channel = MockChannel {
            fail_writes: true,
            ..Default::default()
        };
        let mut sender = CommandSender::new(channel, CommandTable::load().unwrap());
        let err = sender.hot_start_reset().unwrap_err();
        assert!(matches!(
            err,
            RelayError::ChannelFault {
                role: ChannelRole::Receiver,
                ..
            }
        ));
    }

    #[test]
    fn command_names_round_trip() {
        for cmd in GpsCommand::ALL {
            assert_eq!(cmd.name().parse::<GpsCommand>().unwrap(), cmd);
        }
        assert_eq!("Five-Hertz".parse::<GpsCommand>().unwrap(), GpsCommand::FiveHertz);
        assert!(matches!(
            "ten-hertz".parse::<GpsCommand>(),
            Err(RelayError::UnknownCommand(_))
        ));
    }
}
