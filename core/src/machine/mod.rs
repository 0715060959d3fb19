//! The machine: CPU register file plus every component it drives through
//! the bus, and the bus arbitration itself (`spec.md` §4.1 "Clock & Bus
//! arbitration").
//!
//! Every single memory access the CPU makes goes through [`Machine::read`]
//! or [`Machine::write`], which tick Timer, PPU, APU and Serial by one
//! machine-cycle *before* performing the access (`spec.md` §4.1, §5
//! "ordering guarantees"). This is what the rest of the crate calls
//! tick-per-access, as opposed to ticking the whole machine once per
//! instruction after the fact — the latter cannot reproduce the mid-
//! instruction edge cases (`spec.md` §1) this core exists to get right.

use crate::{
    BiosKind,
    cartridge::Cartridge,
    env::Display,
    log::*,
    primitives::{Byte, Word, Memory},
};
use self::{
    apu::Apu,
    cpu::Cpu,
    dma::Dma,
    input::InputController,
    interrupt::{InterruptController, Interrupt},
    ppu::Ppu,
    serial::Serial,
    timer::Timer,
};

#[macro_use]
mod macros;

pub(crate) mod apu;
pub(crate) mod cpu;
mod dma;
pub mod input;
mod instr;
mod instr_cb;
mod interrupt;
mod mm;
pub(crate) mod ppu;
mod serial;
mod step;
#[cfg(test)]
mod tests;
mod timer;

/// Size of the boot ROM mapped over `0000-00FF` (`spec.md` §3 Lifecycle).
const BOOT_ROM_LEN: usize = 0x100;

pub struct Machine {
    pub(crate) cpu: Cpu,
    pub(crate) cartridge: Cartridge,

    /// `Some` only when [`BiosKind::Original`] was selected; holds the
    /// 256-byte image supplied by the host at construction time (never
    /// vendored in this repository — see `SPEC_FULL.md` §3.1).
    boot_rom: Option<Memory>,
    /// Mirrors `FF50` bit 0: once set, the boot ROM is permanently
    /// unmapped, even if `boot_rom` is `Some`.
    boot_rom_disabled: bool,

    pub(crate) wram: Memory,
    pub(crate) hram: Memory,

    pub(crate) ppu: Ppu,
    pub(crate) timer: Timer,
    pub(crate) apu: Apu,
    pub(crate) serial: Serial,
    pub(crate) interrupt_controller: InterruptController,
    pub(crate) input_controller: InputController,
    dma: Dma,

    /// Set once the CPU parks itself after an undefined opcode (`spec.md`
    /// §4.9) and never cleared; [`Machine::step`] becomes a no-op once this
    /// is set, and [`crate::Emulator::execute_frame`] turns it into a
    /// [`crate::Disruption::Terminated`].
    fault: Option<String>,
}

impl Machine {
    pub(crate) fn new(
        cartridge: Cartridge,
        bios: BiosKind,
        boot_rom_image: Option<&[u8]>,
        sample_rate: u32,
    ) -> Self {
        let (cpu, boot_rom, boot_rom_disabled) = match bios {
            BiosKind::Original => {
                let image = boot_rom_image
                    .unwrap_or_else(|| panic!("BiosKind::Original requires a boot ROM image"));
                assert_eq!(image.len(), BOOT_ROM_LEN, "boot ROM image must be 256 bytes");
                (Cpu::new(), Some(Memory::from_bytes(image)), false)
            }
            BiosKind::Minimal => (Cpu::after_boot_rom(), None, true),
        };

        let mut ppu = Ppu::new();
        if bios == BiosKind::Minimal {
            // `spec.md` §3 Lifecycle: jumping straight to `0100` starts with
            // the LCD already on, matching the state the real boot ROM
            // leaves it in right before handing off.
            ppu.store_io_byte(Word::new(0xFF40), Byte::new(0x91));
        }

        Machine {
            cpu,
            cartridge,
            boot_rom,
            boot_rom_disabled,
            wram: Memory::zeroed(Word::new(0x2000)),
            hram: Memory::zeroed(Word::new(0x7F)),
            ppu,
            timer: Timer::new(),
            apu: Apu::new(sample_rate),
            serial: Serial::new(),
            interrupt_controller: InterruptController::new(),
            input_controller: InputController::new(),
            dma: Dma::new(),
            fault: None,
        }
    }

    /// Parks the CPU permanently with `reason` as the last thing it did.
    /// [`Machine::step`] becomes a no-op from this point on; the host learns
    /// about it through [`crate::Emulator::execute_frame`]'s `Err` return.
    pub(crate) fn raise_fault(&mut self, reason: String) {
        if self.fault.is_none() {
            self.fault = Some(reason);
        }
    }

    pub(crate) fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    fn bios_mounted(&self) -> bool {
        self.boot_rom.is_some() && !self.boot_rom_disabled
    }

    /// Advances Timer, PPU, APU and Serial by one machine-cycle, in that
    /// priority order (`spec.md` §4.1/§5), then runs one step of any active
    /// OAM DMA transfer.
    fn tick(&mut self, display: &mut dyn Display) {
        let sequencer_tick = self.timer.step(&mut self.interrupt_controller);
        self.ppu.step(display, &mut self.interrupt_controller);
        self.apu.step(sequencer_tick);
        self.serial.step(&mut self.interrupt_controller);

        if let Some((src, dst_offset)) = self.dma.advance() {
            let byte = self.dma_read_byte(src);
            self.ppu.dma_store_oam_byte(Word::new(0xFE00) + dst_offset as u16, byte);
        }
    }

    /// Reads a byte straight out of whichever region backs `addr`, bypassing
    /// both DMA-blocking and PPU mode-blocking. Used exclusively by the DMA
    /// unit's own source reads, which on real hardware go around the bus
    /// arbitration the CPU is subject to.
    fn dma_read_byte(&self, addr: Word) -> Byte {
        match addr.get() {
            0x0000..=0x00FF if self.bios_mounted() => self.boot_rom.as_ref().unwrap()[addr],
            0x0000..=0x7FFF => self.cartridge.load_rom_byte(addr),
            0x8000..=0x9FFF => self.ppu.vram[addr - 0x8000],
            0xA000..=0xBFFF => self.cartridge.load_ram_byte(addr - 0xA000),
            0xC000..=0xDFFF => self.wram[addr - 0xC000],
            0xE000..=0xFDFF => self.wram[addr - 0xE000],
            0xFE00..=0xFE9F => self.ppu.oam[addr - 0xFE00],
            _ => Byte::new(0xFF),
        }
    }

    /// The one CPU-facing read primitive: ticks the bus, then decodes
    /// `addr`, honouring OAM DMA bus-blocking (`spec.md` §4.6, invariant 5:
    /// everything outside HRAM/IE returns `FF` while a transfer is active).
    pub(crate) fn read(&mut self, addr: Word, display: &mut dyn Display) -> Byte {
        self.tick(display);
        if self.dma.is_active() && addr.get() < 0xFF80 {
            return Byte::new(0xFF);
        }
        self.decode_load(addr)
    }

    pub(crate) fn write(&mut self, addr: Word, byte: Byte, display: &mut dyn Display) {
        self.tick(display);
        if self.dma.is_active() && addr.get() < 0xFF80 {
            return;
        }
        self.decode_store(addr, byte);
    }

    /// Ticks the bus with no memory access, for CPU-internal cycles (extra
    /// ALU latches, `SP` arithmetic, ...) that still have to keep the rest
    /// of the machine moving (`spec.md` §4.1).
    pub(crate) fn internal_delay(&mut self, display: &mut dyn Display) {
        self.tick(display);
    }

    /// Fetches the byte at `PC`, then advances `PC` — unless the HALT bug
    /// is armed, in which case this one fetch leaves `PC` untouched so the
    /// same byte is fetched (and executed) again right after (`spec.md`
    /// §4.9, §8 scenario S5).
    pub(crate) fn fetch_byte(&mut self, display: &mut dyn Display) -> Byte {
        let byte = self.read(self.cpu.pc, display);
        if self.cpu.halt_bug {
            self.cpu.halt_bug = false;
        } else {
            self.cpu.pc += 1u16;
        }
        byte
    }

    pub(crate) fn fetch_word(&mut self, display: &mut dyn Display) -> Word {
        let lsb = self.fetch_byte(display);
        let msb = self.fetch_byte(display);
        Word::from_bytes(lsb, msb)
    }

    /// Pushes a word onto the stack: one internal cycle for the `SP`
    /// decrement, then the high byte, then the low byte (the order real
    /// hardware uses, observable when `SP` itself is the pushed value).
    pub(crate) fn push_word(&mut self, word: Word, display: &mut dyn Display) {
        let (lsb, msb) = word.into_bytes();
        self.internal_delay(display);
        self.cpu.sp -= 1u16;
        self.write(self.cpu.sp, msb, display);
        self.cpu.sp -= 1u16;
        self.write(self.cpu.sp, lsb, display);
    }

    pub(crate) fn pop_word(&mut self, display: &mut dyn Display) -> Word {
        let lsb = self.read(self.cpu.sp, display);
        self.cpu.sp += 1u16;
        let msb = self.read(self.cpu.sp, display);
        self.cpu.sp += 1u16;
        Word::from_bytes(lsb, msb)
    }

    /// Dispatches the highest-priority pending interrupt, if any (`spec.md`
    /// §4.4): 2 machine-cycles to push `PC`, plus the vector jump. Costs 5
    /// machine-cycles total, matching the spec exactly (the internal delay
    /// below plus the two push-writes account for 3; the caller's loop
    /// already ticked the wake-from-HALT cycle when applicable).
    pub(crate) fn dispatch_interrupt(&mut self, interrupt: Interrupt, display: &mut dyn Display) {
        self.internal_delay(display);
        self.internal_delay(display);
        self.push_word(self.cpu.pc, display);
        self.cpu.pc = Word::new(interrupt.handler_address());
        self.interrupt_controller.clear_ime();
    }
}
