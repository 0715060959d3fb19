use crate::primitives::{Byte, Word};

pub(crate) use self::{
    no_mbc::NoMbc,
    mbc1::Mbc1,
    mbc3::Mbc3,
    mbc5::Mbc5,
};

mod no_mbc;
mod mbc1;
mod mbc3;
mod mbc5;

/// A memory bank controller (`spec.md` §4.7).
///
/// This part of the cartridge controls all writes and reads to and from ROM
/// and RAM. Usually some kind of banking strategy is used to store more than
/// `0x8000` bytes of ROM or `0x2000` bytes of RAM.
pub(crate) trait Mbc {
    /// Loads one byte from the cartridge ROM. `addr` is absolute and must be
    /// in `0..0x8000`.
    fn load_rom_byte(&self, addr: Word) -> Byte;

    /// Stores one byte to the cartridge ROM address space. `addr` is
    /// absolute and must be in `0..0x8000`. This never reaches ROM storage
    /// (`spec.md` §4.7: "they never reach ROM") — it writes to MBC control
    /// registers instead.
    fn store_rom_byte(&mut self, addr: Word, byte: Byte);

    /// Loads one byte from external RAM. `addr` is relative to `0xA000` and
    /// must be in `0..0x2000`. Returns `0xFF` when RAM is absent or
    /// disabled.
    fn load_ram_byte(&self, addr: Word) -> Byte;

    /// Stores one byte to external RAM. `addr` is relative to `0xA000` and
    /// must be in `0..0x2000`. A no-op when RAM is absent or disabled.
    fn store_ram_byte(&mut self, addr: Word, byte: Byte);

    /// Returns a full copy of external RAM for persistence.
    fn dump_ram(&self) -> Vec<u8>;

    /// Overwrites external RAM with previously persisted data. `data.len()`
    /// is guaranteed by the caller to match the RAM's declared size.
    fn load_ram(&mut self, data: &[u8]);
}
