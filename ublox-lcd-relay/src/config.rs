use std::path::{Path, PathBuf};

use argh::FromArgs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use ublox_lcd::{ChannelConfig, GpsCommand, DEFAULT_BANNER};

#[derive(FromArgs, Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Relay GNSS receiver output to a serial character LCD
pub struct RelayCfg {
    /// receiver serial device
    #[argh(positional)]
    pub gps_port: Option<String>,
    /// display serial device
    #[argh(option, default = "String::from(\"/dev/ttyUSB1\")")]
    pub display_port: String,
    /// receiver baud rate
    #[argh(option, default = "9600")]
    pub gps_baud: u32,
    /// display baud rate
    #[argh(option, default = "9600")]
    pub display_baud: u32,
    /// configuration command sent to the receiver at startup (repeatable):
    /// hot-start, cold-start, five-hertz, enable-vtg, disable-rmc,
    /// baud-9600, baud-4800, enable-sbas, disable-sbas
    #[argh(option, long = "command")]
    #[serde(default)]
    pub commands: Vec<GpsCommand>,
    /// splash text shown before relaying
    #[argh(option, default = "String::from(DEFAULT_BANNER)")]
    pub banner: String,
    /// how long the splash text stays up, in milliseconds
    #[argh(option, default = "1000")]
    pub banner_ms: u64,
    /// backlight level in percent
    #[argh(option)]
    #[serde(default)]
    pub brightness: Option<u8>,
    /// store this configuration as the default
    #[argh(switch)]
    #[serde(skip)]
    pub save: bool,
    /// use the stored default configuration instead of these arguments
    #[argh(switch)]
    #[serde(skip)]
    pub load: bool,
}

impl RelayCfg {
    /// Apply `--load`, keeping `--save` from the command line
    pub fn resolve(self) -> Result<Self, std::io::Error> {
        if !self.load {
            return Ok(self);
        }
        let mut saved = Self::load_default()?;
        saved.save = self.save;
        Ok(saved)
    }

    /// Settings for the receiver link
    pub fn gps_channel(&self) -> Result<ChannelConfig, std::io::Error> {
        let port = self.gps_port.as_ref().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "No receiver serial port given",
            )
        })?;
        Ok(ChannelConfig::new(port.as_str(), self.gps_baud))
    }

    /// Settings for the display link
    pub fn display_channel(&self) -> ChannelConfig {
        ChannelConfig::new(self.display_port.as_str(), self.display_baud)
    }

    /// Store the configuration in the default location
    pub fn store_default(&self) -> Result<PathBuf, std::io::Error> {
        let path = get_default_path();
        std::fs::create_dir_all(&path)?;
        let path = path.join("config.json");
        self.store(&path)?;
        Ok(path)
    }

    /// Load the configuration from the default location
    pub fn load_default() -> Result<Self, std::io::Error> {
        Self::load_from(&get_default_path().join("config.json"))
    }

    /// Write the configuration as JSON
    pub fn store(&self, path: &Path) -> Result<(), std::io::Error> {
        std::fs::write(
            path,
            serde_json::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?,
        )
    }

    /// Read a configuration file; comments and trailing commas are accepted
    pub fn load_from(path: &Path) -> Result<Self, std::io::Error> {
        let data = std::fs::read_to_string(path)?;
        json5::from_str(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

fn get_default_path() -> PathBuf {
    if let Some(path) = ProjectDirs::from("", "", "ublox_lcd_relay") {
        path.config_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
