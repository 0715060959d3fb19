use std::path::PathBuf;

use clap::Parser;

/// A cartridge file and the knobs that shape how it's run.
#[derive(Debug, Parser)]
#[command(about = "Runs a Game Boy ROM")]
pub(crate) struct Args {
    /// Path to the `.gb` ROM image to load.
    pub(crate) rom: PathBuf,

    /// Path to a real 256-byte DMG boot ROM. When given, the core runs it
    /// before handing control to the cartridge; when omitted, the core
    /// starts directly in the documented post-boot register state.
    #[arg(long)]
    pub(crate) bios: Option<PathBuf>,

    /// Window scale factor.
    #[arg(long, default_value_t = 4, value_parser = parse_scale)]
    pub(crate) scale: u32,

    /// Audio sample rate fed to the host's sound device.
    #[arg(long, default_value_t = 44_100)]
    pub(crate) sample_rate: u32,

    /// Raise the log level: `-v` for debug, `-vv` for trace. Default is
    /// `warn`.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
}

fn parse_scale(src: &str) -> Result<u32, String> {
    match src.parse() {
        Ok(n @ 1..=16) => Ok(n),
        Ok(_) => Err("scale must be between 1 and 16".to_owned()),
        Err(_) => Err("scale must be a positive integer".to_owned()),
    }
}
