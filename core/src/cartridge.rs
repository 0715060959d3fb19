//! Everything related to the cartridge and its header (`spec.md` §6).

use std::fmt;

use derive_more::Display;

use crate::{
    mbc::{Mbc, NoMbc, Mbc1, Mbc3, Mbc5},
    primitives::{Byte, Word},
};

/// Size of a cartridge's ROM, decoded from header byte `0x0148`. Stored as
/// the number of 16 KiB banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RomSize(u16);

impl RomSize {
    fn from_byte(byte: u8) -> Option<Self> {
        let banks = match byte {
            0x00..=0x08 => 2u16 << byte,
            0x52 => 72,
            0x53 => 80,
            0x54 => 96,
            _ => return None,
        };
        Some(RomSize(banks))
    }

    pub fn banks(self) -> u16 {
        self.0
    }

    pub fn len(self) -> usize {
        self.0 as usize * 0x4000
    }
}

/// Size of a cartridge's external RAM, decoded from header byte `0x0149`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RamSize(usize);

impl RamSize {
    fn from_byte(byte: u8) -> Option<Self> {
        let bytes = match byte {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => return None,
        };
        Some(RamSize(bytes))
    }

    pub fn len(self) -> usize {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[cfg(test)]
    pub(crate) fn from_len_for_test(len: usize) -> Self {
        RamSize(len)
    }
}

/// The memory bank controller a cartridge type byte selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MbcKind {
    None,
    Mbc1,
    Mbc3,
    Mbc5,
}

/// Errors that can occur while parsing a cartridge image (`spec.md` §7:
/// "Configuration errors ... surfaced to the host at load time; the core
/// does not start").
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[display(fmt = "ROM image is too short to contain a header ({} bytes)", _0)]
    TooShort(usize),

    #[display(fmt = "cartridge type byte 0x{:02x} is not a supported MBC", _0)]
    UnsupportedMbc(u8),

    #[display(fmt = "header ROM size byte 0x{:02x} is not a known size", _0)]
    UnknownRomSize(u8),

    #[display(fmt = "header RAM size byte 0x{:02x} is not a known size", _0)]
    UnknownRamSize(u8),

    #[display(
        fmt = "ROM image length ({} bytes) does not match the header's declared size ({} bytes)",
        actual, expected,
    )]
    RomSizeMismatch { expected: usize, actual: usize },
}

impl std::error::Error for CartridgeError {}

/// Returns whether the given cartridge type byte declares battery-backed
/// external RAM, per the standard header table.
fn has_battery(type_byte: u8) -> bool {
    matches!(
        type_byte,
        0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0xFF
    )
}

fn mbc_kind(type_byte: u8) -> Option<MbcKind> {
    match type_byte {
        0x00 | 0x08 | 0x09 => Some(MbcKind::None),
        0x01..=0x03 => Some(MbcKind::Mbc1),
        0x0F..=0x13 => Some(MbcKind::Mbc3),
        0x19..=0x1E => Some(MbcKind::Mbc5),
        _ => None,
    }
}

/// A loaded cartridge: header metadata plus the live MBC state machine that
/// owns ROM/RAM banking (`spec.md` §4.7).
pub struct Cartridge {
    title: String,
    type_byte: u8,
    rom_size: RomSize,
    ram_size: RamSize,
    battery_backed: bool,
    pub(crate) mbc: Box<dyn Mbc>,
}

impl Cartridge {
    /// Parses a cartridge image and builds the matching MBC. Returns an
    /// error (and never partially constructs a `Cartridge`) if the header
    /// is unsupported or the image doesn't match its declared size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < 0x150 {
            return Err(CartridgeError::TooShort(bytes.len()));
        }

        // Detect the title length by checking whether the manufacturer code
        // region contains a NUL (newer header layout) or not (older, longer
        // title field).
        let man_code = &bytes[0x013F..=0x0142];
        let max_title_len = if man_code.iter().any(|b| *b == 0x00) { 15 } else { 11 };
        let title_len = bytes[0x0134..0x0134 + max_title_len]
            .iter()
            .position(|b| *b == 0x00)
            .unwrap_or(max_title_len);
        let title = String::from_utf8_lossy(&bytes[0x0134..0x0134 + title_len]).into_owned();

        let type_byte = bytes[0x0147];
        let rom_size = RomSize::from_byte(bytes[0x0148])
            .ok_or(CartridgeError::UnknownRomSize(bytes[0x0148]))?;
        let ram_size = RamSize::from_byte(bytes[0x0149])
            .ok_or(CartridgeError::UnknownRamSize(bytes[0x0149]))?;
        let kind = mbc_kind(type_byte).ok_or(CartridgeError::UnsupportedMbc(type_byte))?;

        if bytes.len() != rom_size.len() {
            return Err(CartridgeError::RomSizeMismatch {
                expected: rom_size.len(),
                actual: bytes.len(),
            });
        }

        let mbc: Box<dyn Mbc> = match kind {
            MbcKind::None => Box::new(NoMbc::new(bytes)),
            MbcKind::Mbc1 => Box::new(Mbc1::new(bytes, ram_size)),
            MbcKind::Mbc3 => Box::new(Mbc3::new(bytes, ram_size)),
            MbcKind::Mbc5 => Box::new(Mbc5::new(bytes, ram_size)),
        };

        Ok(Self {
            title,
            type_byte,
            rom_size,
            ram_size,
            battery_backed: has_battery(type_byte),
            mbc,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rom_size(&self) -> RomSize {
        self.rom_size
    }

    pub fn ram_size(&self) -> RamSize {
        self.ram_size
    }

    /// Whether this cartridge declares battery-backed external RAM
    /// (`spec.md` §6 "Persistence").
    pub fn has_battery(&self) -> bool {
        self.battery_backed
    }

    /// Returns the current content of external RAM, suitable for writing to
    /// a sidecar save file. `None` if the cartridge has no external RAM.
    pub fn save_ram(&self) -> Option<Vec<u8>> {
        if self.ram_size.is_empty() {
            None
        } else {
            Some(self.mbc.dump_ram())
        }
    }

    /// Restores external RAM content from a previously saved sidecar file.
    /// Does nothing if `data` doesn't match the cartridge's declared RAM
    /// size.
    pub fn load_ram(&mut self, data: &[u8]) {
        if data.len() == self.ram_size.len() {
            self.mbc.load_ram(data);
        }
    }

    pub(crate) fn load_rom_byte(&self, addr: Word) -> Byte {
        self.mbc.load_rom_byte(addr)
    }

    pub(crate) fn store_rom_byte(&mut self, addr: Word, byte: Byte) {
        self.mbc.store_rom_byte(addr, byte);
    }

    pub(crate) fn load_ram_byte(&self, addr: Word) -> Byte {
        self.mbc.load_ram_byte(addr)
    }

    pub(crate) fn store_ram_byte(&mut self, addr: Word, byte: Byte) {
        self.mbc.store_ram_byte(addr, byte);
    }
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("title", &self.title)
            .field("type_byte", &format_args!("0x{:02x}", self.type_byte))
            .field("rom_size", &self.rom_size)
            .field("ram_size", &self.ram_size)
            .field("battery_backed", &self.battery_backed)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn minimal_rom(type_byte: u8, rom_size_byte: u8, ram_size_byte: u8, len: usize) -> Vec<u8> {
        let mut rom = vec![0u8; len];
        rom[0x0147] = type_byte;
        rom[0x0148] = rom_size_byte;
        rom[0x0149] = ram_size_byte;
        rom
    }

    #[test]
    fn rejects_truncated_image() {
        let rom = vec![0u8; 0x10];
        assert_eq!(Cartridge::from_bytes(&rom), Err(CartridgeError::TooShort(0x10)));
    }

    #[test]
    fn rejects_unsupported_mbc() {
        let rom = minimal_rom(0xFE, 0x00, 0x00, 0x8000);
        assert_eq!(Cartridge::from_bytes(&rom), Err(CartridgeError::UnsupportedMbc(0xFE)));
    }

    #[test]
    fn rejects_size_mismatch() {
        let rom = minimal_rom(0x00, 0x01, 0x00, 0x8000); // header says 64KiB, image is 32KiB
        assert_eq!(
            Cartridge::from_bytes(&rom),
            Err(CartridgeError::RomSizeMismatch { expected: 0x10000, actual: 0x8000 }),
        );
    }

    #[test]
    fn accepts_rom_only() {
        let rom = minimal_rom(0x00, 0x00, 0x00, 0x8000);
        let cart = Cartridge::from_bytes(&rom).unwrap();
        assert!(!cart.has_battery());
    }

    #[test]
    fn detects_battery_backed_mbc1() {
        let rom = minimal_rom(0x03, 0x00, 0x02, 0x8000);
        let cart = Cartridge::from_bytes(&rom).unwrap();
        assert!(cart.has_battery());
        assert_eq!(cart.ram_size().len(), 0x2000);
    }
}
