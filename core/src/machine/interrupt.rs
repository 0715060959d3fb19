//! `IE`/`IF`, `IME`, and fixed-priority interrupt dispatch (`spec.md` §4.4).

use crate::primitives::Byte;

/// The five interrupt sources, in their fixed dispatch priority (lowest
/// variant wins when more than one is pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0,
            Interrupt::LcdStat => 1,
            Interrupt::Timer => 2,
            Interrupt::Serial => 3,
            Interrupt::Joypad => 4,
        }
    }

    /// The fixed dispatch entry point in the interrupt vector table.
    pub(crate) fn handler_address(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x0040,
            Interrupt::LcdStat => 0x0048,
            Interrupt::Timer => 0x0050,
            Interrupt::Serial => 0x0058,
            Interrupt::Joypad => 0x0060,
        }
    }
}

pub(crate) struct InterruptController {
    ime: bool,
    /// Counts down the delayed effect of `EI`: `2` means "two instruction
    /// boundaries from now IME becomes true", decremented once per step.
    /// `DI` and `RETI` reset this to `0` directly.
    ei_delay: u8,
    interrupt_flag: Byte,
    interrupt_enable: Byte,
}

impl InterruptController {
    pub(crate) fn new() -> Self {
        InterruptController {
            ime: false,
            ei_delay: 0,
            interrupt_flag: Byte::zero(),
            interrupt_enable: Byte::zero(),
        }
    }

    pub(crate) fn ime(&self) -> bool {
        self.ime
    }

    /// Schedules `IME` to become true after the *next* instruction finishes
    /// executing (`spec.md` §4.9, EI-delay invariant).
    pub(crate) fn schedule_ei(&mut self) {
        self.ei_delay = 2;
    }

    /// `DI` and the interrupt dispatch itself: clears `IME` and cancels any
    /// pending `EI`.
    pub(crate) fn clear_ime(&mut self) {
        self.ime = false;
        self.ei_delay = 0;
    }

    /// `RETI`: takes effect immediately, unlike `EI`.
    pub(crate) fn set_ime_immediate(&mut self) {
        self.ime = true;
        self.ei_delay = 0;
    }

    /// Advances the EI-delay countdown by one instruction boundary. Must be
    /// called once per dispatched/executed instruction, before the
    /// interrupt-pending check for that boundary.
    pub(crate) fn advance_ei_delay(&mut self) {
        match self.ei_delay {
            0 => {}
            1 => {
                self.ime = true;
                self.ei_delay = 0;
            }
            _ => self.ei_delay -= 1,
        }
    }

    pub(crate) fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt_flag = self.interrupt_flag.with_bit(interrupt.bit(), true);
    }

    /// Whether any requested interrupt is also enabled, independent of
    /// `IME`. Used to wake the CPU from `HALT` even with interrupts globally
    /// disabled (`spec.md` §4.9 HALT invariant).
    pub(crate) fn pending(&self) -> bool {
        (self.interrupt_flag.get() & self.interrupt_enable.get() & 0x1F) != 0
    }

    /// Returns the highest-priority pending+enabled interrupt if `IME` is
    /// set, clearing its `IF` bit as a side effect of being taken. Returns
    /// `None` (and leaves all state untouched) otherwise.
    pub(crate) fn take_dispatchable(&mut self) -> Option<Interrupt> {
        if !self.ime {
            return None;
        }

        let masked = self.interrupt_flag.get() & self.interrupt_enable.get() & 0x1F;
        let interrupt = Interrupt::ALL.iter().find(|i| masked & (1 << i.bit()) != 0).copied()?;
        self.interrupt_flag = self.interrupt_flag.with_bit(interrupt.bit(), false);
        Some(interrupt)
    }

    pub(crate) fn load_if(&self) -> Byte {
        self.interrupt_flag.map(|b| b | 0b1110_0000)
    }

    pub(crate) fn store_if(&mut self, byte: Byte) {
        self.interrupt_flag = byte.map(|b| b & 0x1F);
    }

    pub(crate) fn load_ie(&self) -> Byte {
        self.interrupt_enable
    }

    pub(crate) fn store_ie(&mut self, byte: Byte) {
        self.interrupt_enable = byte;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vblank_has_highest_priority() {
        let mut ic = InterruptController::new();
        ic.set_ime_immediate();
        ic.store_ie(Byte::new(0x1F));
        ic.request_interrupt(Interrupt::Timer);
        ic.request_interrupt(Interrupt::VBlank);
        assert_eq!(ic.take_dispatchable(), Some(Interrupt::VBlank));
        assert_eq!(ic.take_dispatchable(), Some(Interrupt::Timer));
        assert_eq!(ic.take_dispatchable(), None);
    }

    #[test]
    fn disabled_interrupt_is_not_dispatched_but_still_pending_for_halt() {
        let mut ic = InterruptController::new();
        ic.set_ime_immediate();
        ic.request_interrupt(Interrupt::Joypad);
        assert_eq!(ic.take_dispatchable(), None);

        ic.store_ie(Byte::new(0x10));
        assert!(ic.pending());
    }

    #[test]
    fn ei_takes_effect_after_the_next_instruction() {
        let mut ic = InterruptController::new();
        ic.schedule_ei();

        // Boundary right after EI: IME still false.
        ic.advance_ei_delay();
        assert!(!ic.ime());

        // Boundary after the instruction following EI: IME now true.
        ic.advance_ei_delay();
        assert!(ic.ime());
    }

    #[test]
    fn di_immediately_after_ei_cancels_it() {
        let mut ic = InterruptController::new();
        ic.schedule_ei();
        ic.advance_ei_delay();
        ic.clear_ime(); // DI executes as the instruction right after EI
        ic.advance_ei_delay();
        assert!(!ic.ime());
    }
}
