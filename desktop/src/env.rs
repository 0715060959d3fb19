//! Implements the core's [`gb_core::env`] traits on top of `minifb` (window
//! + keyboard) and `cpal` (audio output).

use std::sync::{Arc, Mutex};
use std::collections::VecDeque;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use gb_core::{
    SCREEN_WIDTH, SCREEN_HEIGHT,
    env::{Display, Input, Sound},
    machine::input::{JoypadKey, Keys},
};
use minifb::{Key, Window};

/// Maps the four DMG shades to the classic greenish palette, packed as
/// `0x00RRGGBB` the way `minifb` wants its framebuffer.
const PALETTE: [u32; 4] = [0xE0_F8_D0, 0x88_C0_70, 0x34_68_56, 0x08_18_20];

pub(crate) struct WindowDisplay {
    window: Window,
    buffer: Vec<u32>,
}

impl WindowDisplay {
    pub(crate) fn new(window: Window) -> Self {
        WindowDisplay { window, buffer: vec![PALETTE[0]; SCREEN_WIDTH * SCREEN_HEIGHT] }
    }

    pub(crate) fn present_to_screen(&mut self) -> Result<(), minifb::Error> {
        self.window.update_with_buffer(&self.buffer, SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }
}

impl Display for WindowDisplay {
    fn present(&mut self, frame: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]) {
        for (dst, &shade) in self.buffer.iter_mut().zip(frame.iter()) {
            *dst = PALETTE[shade as usize & 0b11];
        }
    }
}

/// The window doubles as the input surface: `minifb` polls the keyboard as
/// part of its own event loop, so there's nothing extra to drive here.
impl Input for WindowDisplay {
    fn pressed_keys(&self) -> Keys {
        const BINDINGS: [(Key, JoypadKey); 8] = [
            (Key::Z, JoypadKey::A),
            (Key::X, JoypadKey::B),
            (Key::Space, JoypadKey::Select),
            (Key::Enter, JoypadKey::Start),
            (Key::Right, JoypadKey::Right),
            (Key::Left, JoypadKey::Left),
            (Key::Up, JoypadKey::Up),
            (Key::Down, JoypadKey::Down),
        ];

        BINDINGS.iter().fold(Keys::none(), |keys, &(key, joypad_key)| {
            keys.set_key(joypad_key, self.window.is_key_down(key))
        })
    }
}

/// Feeds samples into a bounded queue a `cpal` output stream drains from on
/// its own thread; `push_sample` itself never blocks.
pub(crate) struct CpalSound {
    queue: Arc<Mutex<VecDeque<(i16, i16)>>>,
    _stream: cpal::Stream,
}

impl CpalSound {
    pub(crate) fn open(sample_rate: u32) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no audio output device available"))?;

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue: Arc<Mutex<VecDeque<(i16, i16)>>> = Arc::new(Mutex::new(VecDeque::with_capacity(4096)));
        let queue_in_callback = Arc::clone(&queue);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let mut queue = queue_in_callback.lock().unwrap();
                for frame in data.chunks_mut(2) {
                    let (left, right) = queue.pop_front().unwrap_or((0, 0));
                    frame[0] = left;
                    frame[1] = right;
                }
            },
            |err| log::error!("audio output stream error: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(CpalSound { queue, _stream: stream })
    }
}

impl Sound for CpalSound {
    fn push_sample(&mut self, left: i16, right: i16) {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= 4096 {
            queue.pop_front();
        }
        queue.push_back((left, right));
    }
}

/// Bundles the window and the audio stream into the one `impl Peripherals`
/// `Emulator::execute_frame` wants every frame.
pub(crate) struct HostPeripherals {
    pub(crate) display: WindowDisplay,
    pub(crate) sound: CpalSound,
}

impl gb_core::env::Peripherals for HostPeripherals {
    type Display = WindowDisplay;
    type Sound = CpalSound;
    type Input = WindowDisplay;

    fn display(&mut self) -> &mut WindowDisplay {
        &mut self.display
    }

    fn sound(&mut self) -> &mut CpalSound {
        &mut self.sound
    }

    fn input(&mut self) -> &mut WindowDisplay {
        &mut self.display
    }
}
