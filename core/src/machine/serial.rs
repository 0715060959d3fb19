//! Serial port, `SB`/`SC` at `0xFF01`/`0xFF02` (`spec.md` §4.8).
//!
//! No link cable is modelled: a transfer always shifts in `1` bits from the
//! far end, which is exactly what real hardware sees with nothing plugged
//! in. A transfer takes 8 bits at the internal clock's 8192 Hz, i.e.
//! `8 * 512 = 4096` T-cycles (1024 machine-cycles) end to end.

use crate::primitives::Byte;
use super::interrupt::{InterruptController, Interrupt};

const TRANSFER_MACHINE_CYCLES: u32 = 1024;

pub(crate) struct Serial {
    sb: Byte,
    sc: Byte,
    cycles_remaining: Option<u32>,
}

impl Serial {
    pub(crate) fn new() -> Self {
        Serial { sb: Byte::zero(), sc: Byte::new(0x7E), cycles_remaining: None }
    }

    pub(crate) fn load_sb(&self) -> Byte {
        self.sb
    }

    pub(crate) fn store_sb(&mut self, byte: Byte) {
        self.sb = byte;
    }

    pub(crate) fn load_sc(&self) -> Byte {
        let active = self.cycles_remaining.is_some();
        self.sc.map(|b| (b & 0b0111_1111) | 0b0111_1110 | ((active as u8) << 7))
    }

    pub(crate) fn store_sc(&mut self, byte: Byte) {
        self.sc = byte;
        // Bit 0 selects the internal clock; with no link cable modelled,
        // an external-clock transfer (bit 0 clear) has no partner to shift
        // bits in from and must never complete on its own.
        if byte.bit(7) && byte.bit(0) {
            self.cycles_remaining = Some(TRANSFER_MACHINE_CYCLES);
        }
    }

    /// Advances the transfer by one machine-cycle.
    pub(crate) fn step(&mut self, interrupts: &mut InterruptController) {
        let Some(remaining) = self.cycles_remaining else { return };
        if remaining <= 1 {
            self.cycles_remaining = None;
            self.sb = Byte::new(0xFF);
            self.sc = self.sc.with_bit(7, false);
            interrupts.request_interrupt(Interrupt::Serial);
        } else {
            self.cycles_remaining = Some(remaining - 1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transfer_completes_and_requests_interrupt() {
        let mut serial = Serial::new();
        let mut ic = InterruptController::new();
        serial.store_sc(Byte::new(0x81));
        assert!(serial.load_sc().bit(7));

        for _ in 0..TRANSFER_MACHINE_CYCLES {
            serial.step(&mut ic);
        }

        assert!(!serial.load_sc().bit(7));
        assert_eq!(serial.load_sb().get(), 0xFF);
        assert!(ic.load_if().get() & 0b0000_1000 != 0);
    }

    #[test]
    fn external_clock_transfer_never_completes_without_a_peer() {
        let mut serial = Serial::new();
        let mut ic = InterruptController::new();
        serial.store_sc(Byte::new(0x80)); // bit 7 set, bit 0 (internal clock) clear

        for _ in 0..TRANSFER_MACHINE_CYCLES * 2 {
            serial.step(&mut ic);
        }

        assert!(ic.load_if().get() & 0b0000_1000 == 0);
    }
}
