use crate::primitives::{Byte, Word};
use super::Mbc;

/// No memory bank controller: ROM up to 32 KiB, no banking, optionally a
/// single fixed bank of external RAM.
pub(crate) struct NoMbc {
    rom: Box<[Byte]>,
    ram: Box<[Byte]>,
}

impl NoMbc {
    pub(crate) fn new(data: &[u8]) -> Self {
        let rom: Vec<_> = data.iter().cloned().map(Byte::new).collect();
        Self {
            rom: rom.into_boxed_slice(),
            // Some "ROM only" boards still carry a small amount of RAM;
            // allocate the usual 8 KiB window unconditionally and let the
            // cartridge-level `RamSize` decide whether it's ever exposed.
            ram: vec![Byte::zero(); 0x2000].into_boxed_slice(),
        }
    }
}

impl Mbc for NoMbc {
    fn load_rom_byte(&self, addr: Word) -> Byte {
        self.rom.get(addr.get() as usize).cloned().unwrap_or(Byte::new(0xFF))
    }

    fn store_rom_byte(&mut self, _addr: Word, _byte: Byte) {
        // No control registers to write to.
    }

    fn load_ram_byte(&self, addr: Word) -> Byte {
        self.ram.get(addr.get() as usize).cloned().unwrap_or(Byte::new(0xFF))
    }

    fn store_ram_byte(&mut self, addr: Word, byte: Byte) {
        if let Some(slot) = self.ram.get_mut(addr.get() as usize) {
            *slot = byte;
        }
    }

    fn dump_ram(&self) -> Vec<u8> {
        self.ram.iter().map(Byte::get).collect()
    }

    fn load_ram(&mut self, data: &[u8]) {
        for (slot, byte) in self.ram.iter_mut().zip(data) {
            *slot = Byte::new(*byte);
        }
    }
}
