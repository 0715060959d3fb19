//! A cycle-accurate DMG Game Boy core.
//!
//! This crate is the core only: CPU, PPU, APU, timer, serial port, joypad
//! and cartridge/MBC emulation, all stepped one machine-cycle at a time
//! (`spec.md` §4.1). It owns no window, no audio device and no input
//! surface — those are the host's job, specified at the boundary in
//! [`env`]. A host drives the core by building an [`Emulator`] and calling
//! [`Emulator::execute_frame`] once per video frame.

use crate::{
    env::Peripherals,
    log::*,
    machine::Machine,
};

pub mod cartridge;
pub mod env;
pub mod log;
pub mod machine;
pub mod mbc;
pub mod primitives;

/// Pixels per scanline.
pub const SCREEN_WIDTH: usize = 160;
/// Scanlines per frame.
pub const SCREEN_HEIGHT: usize = 144;

/// Which boot sequence the core runs before handing control to the
/// cartridge (`spec.md` §3 "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosKind {
    /// Run the real 256-byte DMG boot ROM, supplied by the host as a byte
    /// slice at [`Emulator::new`] time. This crate never vendors that image
    /// — it is Nintendo's copyrighted property, not this repository's.
    Original,
    /// Skip the boot ROM animation and scroll, and start with the CPU and
    /// I/O registers already in the documented post-boot state (`spec.md`
    /// §3's register table).
    Minimal,
}

/// Host-supplied configuration for a new [`Emulator`].
#[derive(Debug, Clone, Copy)]
pub struct EmulatorConfig {
    pub bios: BiosKind,
    /// Sample rate the APU resamples its 4.194304 MHz channels down to
    /// before handing samples to [`env::Sound`].
    pub sample_rate: u32,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            bios: BiosKind::Minimal,
            sample_rate: 44_100,
        }
    }
}

/// Why [`Emulator::execute_frame`] stopped early, instead of completing the
/// frame and returning normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disruption {
    /// The core parked itself and will not execute any further instructions
    /// — currently only raised after an undefined opcode (`spec.md` §4.9).
    /// `reason` is meant for a log line or a status bar, not for matching
    /// on.
    Terminated { reason: String },
}

/// A runnable Game Boy: the [`Machine`] plus the bookkeeping needed to pace
/// it one frame at a time.
pub struct Emulator {
    machine: Machine,
    /// Generous upper bound on instructions per frame, so a pathological
    /// ROM (e.g. one that disables the LCD and spins) can't wedge
    /// `execute_frame` in an infinite loop. At roughly 4 T-cycles per
    /// instruction on average this comfortably covers a real 70224-T-cycle
    /// frame several times over.
    max_steps_per_frame: u32,
}

impl Emulator {
    /// Builds a new emulator around `cartridge`. `boot_rom_image` must be
    /// `Some` and exactly 256 bytes when `config.bios` is
    /// [`BiosKind::Original`]; it is ignored otherwise.
    pub fn new(cartridge: cartridge::Cartridge, config: EmulatorConfig, boot_rom_image: Option<&[u8]>) -> Self {
        Emulator {
            machine: Machine::new(cartridge, config.bios, boot_rom_image, config.sample_rate),
            max_steps_per_frame: 1_000_000,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Runs the core until the PPU finishes a frame (`LY` wraps from 153
    /// back to 0, `spec.md` §5), presents it, drains queued audio samples
    /// and returns. `should_pause` is polled once per instruction boundary;
    /// if it returns `true`, execution stops for this call and resumes
    /// exactly where it left off on the next call.
    pub fn execute_frame<P: Peripherals>(
        &mut self,
        peripherals: &mut P,
        mut should_pause: impl FnMut(&Machine) -> bool,
    ) -> Result<(), Disruption> {
        let mut steps = 0u32;

        loop {
            if let Some(reason) = self.machine.fault() {
                return Err(Disruption::Terminated { reason: reason.to_owned() });
            }
            if should_pause(&self.machine) {
                return Ok(());
            }

            let line_before = self.machine.ppu.regs().current_line.get();
            self.machine.step(peripherals.display(), peripherals.input());
            let line_after = self.machine.ppu.regs().current_line.get();

            if line_before == 153 && line_after == 0 {
                break;
            }

            steps += 1;
            if steps >= self.max_steps_per_frame {
                warn!(
                    "execute_frame exceeded {} instruction steps without reaching end-of-frame; \
                     returning early (LCD likely disabled)",
                    self.max_steps_per_frame,
                );
                break;
            }
        }

        self.machine.apu.drain_samples(peripherals.sound());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cartridge::Cartridge;

    fn minimal_cartridge() -> Cartridge {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = 0x00; // ROM only
        rom[0x0148] = 0x00; // 32 KiB
        rom[0x0149] = 0x00; // no RAM
        Cartridge::from_bytes(&rom).unwrap()
    }

    #[test]
    fn minimal_bios_boots_straight_to_cartridge_entry() {
        let emu = Emulator::new(minimal_cartridge(), EmulatorConfig::default(), None);
        assert_eq!(emu.machine().cpu.pc.get(), 0x0100);
    }
}
