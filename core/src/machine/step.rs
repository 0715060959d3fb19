//! The fetch/decode/execute loop and interrupt dispatch (`spec.md` §4.4,
//! §4.9).
//!
//! One call to [`Machine::step`] is one instruction boundary: at most one
//! instruction executes (or one interrupt is dispatched, or one HALT idle
//! cycle passes), and every boundary samples input and advances the
//! EI-delay countdown exactly once (`spec.md` §8 scenario S6).

use crate::env::{Display, Input};
use super::{instr, Machine};

impl Machine {
    pub(crate) fn step(&mut self, display: &mut dyn Display, input: &dyn Input) {
        if self.fault.is_some() {
            return;
        }

        self.input_controller.handle_input(input, &mut self.interrupt_controller);

        if self.cpu.halted {
            if self.interrupt_controller.pending() {
                self.cpu.halted = false;
            } else {
                self.internal_delay(display);
                self.interrupt_controller.advance_ei_delay();
                return;
            }
        }

        if let Some(interrupt) = self.interrupt_controller.take_dispatchable() {
            self.dispatch_interrupt(interrupt, display);
            self.interrupt_controller.advance_ei_delay();
            return;
        }

        let op_code = self.fetch_byte(display).get();
        instr::execute(self, op_code, display);
        self.interrupt_controller.advance_ei_delay();
    }
}
