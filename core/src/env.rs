//! The boundary between the cycle-accurate core and its host.
//!
//! `spec.md` §1 puts the pixel presenter, the input surface and the audio
//! mixer backend out of scope for the core: they are *collaborators*,
//! specified only at their boundary. That boundary is this module. A host
//! (the `desktop` crate, a web frontend, a test harness, ...) implements
//! [`Peripherals`] and hands it to [`crate::Emulator::execute_frame`] every
//! frame.

use crate::{SCREEN_WIDTH, SCREEN_HEIGHT, machine::input::Keys};

/// Bundles the three peripheral traits a host has to implement.
pub trait Peripherals {
    type Display: Display;
    type Sound: Sound;
    type Input: Input;

    fn display(&mut self) -> &mut Self::Display;
    fn sound(&mut self) -> &mut Self::Sound;
    fn input(&mut self) -> &mut Self::Input;
}

/// Receives a finished frame. The buffer holds one byte per pixel, values
/// `0..=3`, row-major, `SCREEN_WIDTH * SCREEN_HEIGHT` entries — the raw
/// 2-bit hardware colour. Mapping those to an actual display colour (e.g.
/// the classic four greens) is entirely a host concern.
pub trait Display {
    fn present(&mut self, frame: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]);
}

/// Consumes interleaved stereo PCM samples produced by the APU.
pub trait Sound {
    fn push_sample(&mut self, left: i16, right: i16);
}

/// Exposes the current button mask. Implementations are expected to debounce
/// / poll their own input surface; the core only ever asks "what's pressed
/// right now".
pub trait Input {
    fn pressed_keys(&self) -> Keys;
}

/// A host-provided sink for diagnostic events the core wants to surface
/// without forcing a particular logging backend (this is a thin,
/// host-pluggable layer on top of the `log` facade used internally).
pub trait Debugger {
    fn post_event(&self, level: EventLevel, msg: String);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Debug,
    /// For things that occur extremely often (once per instruction or more).
    Trace,
}
