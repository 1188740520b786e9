#![deny(missing_docs)]
//! # UBX LCD Relay
//! Brings up the receiver and display links, applies the startup
//! configuration and then mirrors receiver output on the display forever.
mod config;
mod logger;

use std::{convert::Infallible, time::Duration};

use ublox_lcd::{
    configure_receiver, show_banner, Brightness, CommandSender, CommandTable, CursorStyle, Lcd,
    Relay, RelayError,
};

pub use config::RelayCfg;

fn main() {
    logger::init();
    let cfg = match argh::from_env::<RelayCfg>().resolve() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Failed to load stored configuration: {e}");
            std::process::exit(2);
        }
    };
    if cfg.save {
        match cfg.store_default() {
            Ok(path) => log::info!("Stored configuration in {path:?}"),
            Err(e) => log::warn!("Failed to store configuration: {e}"),
        }
    }
    if let Err(e) = ctrlc::set_handler(|| {
        log::info!("Interrupted, exiting");
        std::process::exit(0);
    }) {
        log::warn!("Failed to install interrupt handler: {e}");
    }
    let gps = match cfg.gps_channel() {
        Ok(gps) => gps,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };
    // only returns on failure
    if let Err(e) = run(&cfg, &gps) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cfg: &RelayCfg, gps: &ublox_lcd::ChannelConfig) -> Result<Infallible, RelayError> {
    // a bad frame table is a build defect, refuse to touch the hardware
    let table = CommandTable::load()?;
    let mut lcd = Lcd::new(ublox_lcd::open(&cfg.display_channel())?);
    let receiver = ublox_lcd::open(gps)?;

    lcd.set_cursor_style(CursorStyle::Underscore)?;
    show_banner(&mut lcd, &cfg.banner, Duration::from_millis(cfg.banner_ms))?;
    if let Some(pct) = cfg.brightness {
        lcd.set_brightness(Brightness::percent(pct))?;
    }

    let mut sender = CommandSender::new(receiver, table);
    configure_receiver(&mut sender, &cfg.commands)?;

    Relay::new(sender.into_inner(), lcd).run()
}
