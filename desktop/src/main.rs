use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use gb_core::{
    BiosKind, Disruption, Emulator, EmulatorConfig, SCREEN_HEIGHT, SCREEN_WIDTH,
    cartridge::Cartridge,
};
use minifb::{Window, WindowOptions};

use crate::{
    args::Args,
    env::{CpalSound, HostPeripherals, WindowDisplay},
};

mod args;
mod env;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let rom = fs::read(&args.rom).with_context(|| format!("failed to read ROM at {:?}", args.rom))?;
    let cartridge = Cartridge::from_bytes(&rom).context("failed to parse cartridge")?;
    log::info!("loaded cartridge: {:?}", rom.len());

    let bios_image = args.bios.as_ref()
        .map(|path| fs::read(path).with_context(|| format!("failed to read boot ROM at {:?}", path)))
        .transpose()?;
    let bios_kind = if bios_image.is_some() { BiosKind::Original } else { BiosKind::Minimal };

    let config = EmulatorConfig { bios: bios_kind, sample_rate: args.sample_rate };
    let mut emulator = Emulator::new(cartridge, config, bios_image.as_deref());

    let window = Window::new(
        "Game Boy",
        SCREEN_WIDTH * args.scale as usize,
        SCREEN_HEIGHT * args.scale as usize,
        WindowOptions::default(),
    ).context("failed to open window")?;

    let mut peripherals = HostPeripherals {
        display: WindowDisplay::new(window),
        sound: CpalSound::open(args.sample_rate).context("failed to open audio device")?,
    };

    while peripherals.display.is_open() {
        match emulator.execute_frame(&mut peripherals, |_machine| false) {
            Ok(()) => {}
            Err(Disruption::Terminated { reason }) => {
                log::error!("emulator terminated: {reason}");
                break;
            }
        }
        peripherals.display.present_to_screen().context("failed to present frame")?;
    }

    Ok(())
}
