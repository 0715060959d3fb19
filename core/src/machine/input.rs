use bit_field::BitField;

use crate::{
    primitives::Byte,
    env::Input,
    machine::interrupt::{InterruptController, Interrupt},
};

/// Manages the joypad, mapped to `0xFF00` (`spec.md` §4.8).
pub(crate) struct InputController {
    register: Byte,
}

impl InputController {
    /// No buttons pressed, no input group selected.
    pub(crate) fn new() -> Self {
        Self { register: Byte::new(0xFF) }
    }

    /// Bits 6 and 7 always read as 1.
    pub(crate) fn load_register(&self) -> Byte {
        self.register.map(|b| b | 0b1100_0000)
    }

    /// Only bits 4 and 5 (the group-select bits) are writable.
    pub(crate) fn store_register(&mut self, byte: Byte) {
        let mask = 0b0011_0000;
        self.register = byte.map(|b| b & mask) | self.register.map(|b| b & !mask);
    }

    /// Samples the host's current key state into the register and requests
    /// a Joypad interrupt on any 1-to-0 transition of a selected key line
    /// (`spec.md` §4.8 "the joypad interrupt fires on a button press
    /// transition, not while held").
    pub(crate) fn handle_input(&mut self, input: &impl Input, interrupts: &mut InterruptController) {
        let pressed = input.pressed_keys();
        let keys = match (self.is_direction_selected(), self.is_button_selected()) {
            (false, false) => 0,
            (false, true) => pressed.get_button_keys(),
            (true, false) => pressed.get_direction_keys(),
            (true, true) => pressed.get_direction_keys() | pressed.get_button_keys(),
        };

        let before = self.register.get() & 0b0000_1111;
        let after = !keys & 0b0000_1111;
        self.register = self.register.map(|r| (r & 0b1111_0000) | after);

        if before & !after & 0b0000_1111 != 0 {
            interrupts.request_interrupt(Interrupt::Joypad);
        }
    }

    fn is_button_selected(&self) -> bool {
        (self.register.get() & 0b0010_0000) == 0
    }

    fn is_direction_selected(&self) -> bool {
        (self.register.get() & 0b0001_0000) == 0
    }
}

/// The eight Game Boy buttons, pressed/released independent of the register
/// layout above.
#[derive(Clone, Copy, Debug, Default)]
pub struct Keys(u8);

impl Keys {
    pub fn none() -> Self {
        Keys(0x00)
    }

    pub fn set_key(mut self, key: JoypadKey, is_pressed: bool) -> Self {
        let bit = match key {
            JoypadKey::A => 0,
            JoypadKey::B => 1,
            JoypadKey::Select => 2,
            JoypadKey::Start => 3,
            JoypadKey::Right => 4,
            JoypadKey::Left => 5,
            JoypadKey::Up => 6,
            JoypadKey::Down => 7,
        };
        self.0.set_bit(bit, is_pressed);
        self
    }

    pub(crate) fn get_direction_keys(&self) -> u8 {
        (self.0 >> 4) & 0x0F
    }

    pub(crate) fn get_button_keys(&self) -> u8 {
        self.0 & 0x0F
    }
}

#[derive(Clone, Copy, Debug)]
pub enum JoypadKey {
    A,
    B,
    Start,
    Select,
    Up,
    Right,
    Down,
    Left,
}

#[cfg(test)]
mod test {
    use super::*;

    struct DummyInput {
        keys: Vec<JoypadKey>,
    }

    impl Input for DummyInput {
        fn pressed_keys(&self) -> Keys {
            let mut out = Keys::none();
            for &key in &self.keys {
                out = out.set_key(key, true);
            }
            out
        }
    }

    fn run(keys: Vec<JoypadKey>, byte: u8) -> Byte {
        let mut ic = InputController::new();
        let mut ih = InterruptController::new();
        let dummy_input = DummyInput { keys };
        ic.store_register(Byte::new(byte));
        ic.handle_input(&dummy_input, &mut ih);
        ic.load_register()
    }

    #[test]
    fn test_input_controller_handle_input() {
        assert_eq!(run(vec![], 0b1011_0011), 0b1111_1111);
        assert_eq!(run(vec![JoypadKey::A], 0b0011_1111), 0b1111_1111);

        assert_eq!(run(vec![], 0b1101_1101), 0b1101_1111);
        assert_eq!(run(vec![JoypadKey::A], 0b1001_0010), 0b1101_1110);

        assert_eq!(run(vec![], 0b1110_1101), 0b1110_1111);
        assert_eq!(run(vec![JoypadKey::Left], 0b1010_0110), 0b1110_1101);

        assert_eq!(run(vec![], 0b1100_1101), 0b1100_1111);
        assert_eq!(
            run(vec![JoypadKey::A, JoypadKey::Right, JoypadKey::Start, JoypadKey::Up], 0b0000_0000),
            0b1100_0010,
        );
    }

    #[test]
    fn press_transition_requests_joypad_interrupt() {
        let mut ic = InputController::new();
        let mut ih = InterruptController::new();
        ic.store_register(Byte::new(0b0010_0000)); // select buttons
        ic.handle_input(&DummyInput { keys: vec![JoypadKey::A] }, &mut ih);
        assert!(ih.load_if().get() & 0b0001_0000 != 0);
    }
}
