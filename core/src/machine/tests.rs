//! Scenarios that span the whole bus — CPU, DMA, PPU and interrupts
//! together — rather than one peripheral in isolation, so they live here
//! instead of beside the single component each one happens to touch most.

use crate::{
    cartridge::Cartridge,
    env::{Display, Input},
    machine::input::Keys,
    primitives::{Byte, Word},
    BiosKind, SCREEN_HEIGHT, SCREEN_WIDTH,
};
use super::Machine;

struct NullDisplay;
impl Display for NullDisplay {
    fn present(&mut self, _frame: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]) {}
}

struct NoInput;
impl Input for NoInput {
    fn pressed_keys(&self) -> Keys {
        Keys::none()
    }
}

fn romless_cartridge() -> Cartridge {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x00; // ROM only
    rom[0x0148] = 0x00; // 32 KiB
    rom[0x0149] = 0x00; // no external RAM
    Cartridge::from_bytes(&rom).unwrap()
}

fn machine() -> Machine {
    Machine::new(romless_cartridge(), BiosKind::Minimal, None, 44_100)
}

fn step(m: &mut Machine) {
    m.step(&mut NullDisplay, &NoInput);
}

/// Places opcode bytes directly in WRAM without ticking the bus, so setup
/// doesn't perturb the cycle counts the test is about to measure.
fn load_program(m: &mut Machine, addr: u16, bytes: &[u8]) {
    for (i, &b) in bytes.iter().enumerate() {
        m.wram[Word::new(addr + i as u16) - 0xC000] = Byte::new(b);
    }
}

/// `spec.md` §8 invariant 1: `F`'s low nibble is always zero.
#[test]
fn flag_register_low_nibble_is_always_zero() {
    let mut m = machine();
    m.cpu.pc = Word::new(0xC000);
    // ADD A,n; SUB n; OR n -- enough opcode variety to exercise every flag
    // path at least once.
    load_program(&mut m, 0xC000, &[0xC6, 0x7F, 0xD6, 0x01, 0xF6, 0x00]);
    for _ in 0..3 {
        step(&mut m);
        assert_eq!(m.cpu.f.get() & 0x0F, 0, "F = {:#04x}", m.cpu.f.get());
    }
}

/// `spec.md` §8 invariant 2: a `NOP` costs exactly one machine-cycle — 64
/// of them should advance `DIV` by exactly 1 (64 * 4 = 256 T-cycles).
#[test]
fn nop_advances_the_bus_by_exactly_one_machine_cycle() {
    let mut m = machine();
    m.cpu.pc = Word::new(0xC000);
    load_program(&mut m, 0xC000, &[0x00; 64]);

    let div_before = m.timer.load_byte(Word::new(0xFF04)).get();
    for _ in 0..64 {
        step(&mut m);
    }
    let div_after = m.timer.load_byte(Word::new(0xFF04)).get();

    assert_eq!(div_after.wrapping_sub(div_before), 1);
}

/// `spec.md` §8 invariant 5 / scenario S3: during the 160-machine-cycle OAM
/// DMA window, blocked reads return `FF`, HRAM reads are unaffected, and the
/// transfer ends up copying the source region into OAM byte for byte.
#[test]
fn oam_dma_blocks_the_bus_and_copies_source_into_oam() {
    let mut m = machine();

    for i in 0..0xA0u16 {
        m.wram[Word::new(i)] = Byte::new(i as u8);
    }
    m.write(Word::new(0xFF80), Byte::new(0xAB), &mut NullDisplay);

    m.write(Word::new(0xFF46), Byte::new(0xC0), &mut NullDisplay); // source = C000

    for i in 0..160 {
        if i < 159 {
            assert_eq!(m.read(Word::new(0x0000), &mut NullDisplay).get(), 0xFF);
        } else {
            m.read(Word::new(0x0000), &mut NullDisplay);
        }
    }

    assert_eq!(m.read(Word::new(0xFF80), &mut NullDisplay).get(), 0xAB);
    for i in 0..0xA0u16 {
        assert_eq!(m.ppu.load_oam_byte(Word::new(0xFE00 + i)).get(), i as u8);
    }
}

/// `spec.md` §8 invariant 8 / scenario S5: with `IME=0` and a pending
/// interrupt, `HALT` arms the HALT bug instead of actually halting, so the
/// byte right after it executes twice.
#[test]
fn halt_bug_executes_the_following_byte_twice() {
    let mut m = machine();
    m.cpu.pc = Word::new(0xC000);
    m.cpu.a = Byte::zero();
    load_program(&mut m, 0xC000, &[0x3C, 0x76, 0x3C]); // INC A; HALT; INC A

    m.interrupt_controller.clear_ime();
    m.interrupt_controller.store_if(Byte::new(0x01));
    m.interrupt_controller.store_ie(Byte::new(0x01));

    // INC A, HALT (arms the bug), the doubled INC A, then its real execution.
    for _ in 0..4 {
        step(&mut m);
    }

    assert_eq!(m.cpu.a.get(), 3);
    assert_eq!(m.cpu.pc.get(), 0xC003);
}

/// `spec.md` §8 scenario S6: `DI` executed immediately after `EI` cancels
/// the pending enable, so `IME` never actually turns on and the pending
/// interrupt is never dispatched.
#[test]
fn di_right_after_ei_cancels_the_pending_enable() {
    let mut m = machine();
    m.cpu.pc = Word::new(0xC000);
    load_program(&mut m, 0xC000, &[0xFB, 0xF3, 0x00]); // EI; DI; NOP

    m.interrupt_controller.store_if(Byte::new(0x01)); // VBlank pending
    m.interrupt_controller.store_ie(Byte::new(0x01));

    for _ in 0..3 {
        step(&mut m);
    }

    assert!(!m.interrupt_controller.ime());
    assert_eq!(m.cpu.pc.get(), 0xC003, "the VBlank handler must never have been entered");
}

/// `spec.md` §8 invariant 9: one full frame is exactly 70,224 T-cycles, and
/// every scanline 0..=153 is visited exactly once.
#[test]
fn one_frame_visits_every_scanline_once() {
    let mut m = machine();
    let mut seen = std::collections::HashSet::new();

    for _ in 0..(70_224 / 4) {
        seen.insert(m.ppu.regs().current_line.get());
        m.tick(&mut NullDisplay);
    }

    assert_eq!(seen.len(), 154);
    assert_eq!(m.ppu.regs().current_line.get(), 0);
}

/// `spec.md` §8 invariant 10: `DAA` makes 8-bit BCD addition round-trip.
#[test]
fn daa_corrects_bcd_addition_for_every_pair_under_100() {
    fn to_bcd(n: u8) -> u8 {
        ((n / 10) << 4) | (n % 10)
    }
    fn from_bcd(b: u8) -> u8 {
        (b >> 4) * 10 + (b & 0x0F)
    }

    for a in 0..100u8 {
        for b in 0..100u8 {
            let mut m = machine();
            m.cpu.pc = Word::new(0xC000);
            load_program(&mut m, 0xC000, &[0xC6, to_bcd(b), 0x27]); // ADD A,n; DAA
            m.cpu.a = Byte::new(to_bcd(a));

            for _ in 0..2 {
                step(&mut m);
            }

            let expected = (a as u16 + b as u16) % 100;
            assert_eq!(from_bcd(m.cpu.a.get()) as u16, expected, "a={a} b={b}");
            assert_eq!(m.cpu.carry(), (a as u16 + b as u16) >= 100, "a={a} b={b}");
        }
    }
}
