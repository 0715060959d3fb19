//! The audio processing unit (`spec.md` §4 sound requirements, expanded
//! scope): two pulse channels, a wave channel and a noise channel, mixed
//! through `NR50`/`NR51`/`NR52` and resampled down to the host's audio
//! rate.
//!
//! The frame sequencer's tick pattern — length counters at every other
//! step, the channel-1 sweep at every fourth, envelopes at every eighth —
//! mirrors the `div`-driven cadence real APU hardware runs on.

mod envelope;
mod length;
mod sweep;
mod pulse;
mod wave;
mod noise;

use std::collections::VecDeque;

use bitflags::bitflags;
use crate::{env::Sound, primitives::{Byte, Word}};
use self::{pulse::PulseChannel, sweep::Sweep, wave::WaveChannel, noise::NoiseChannel};

bitflags! {
    /// `NR51`: which channels feed the left/right mixer outputs.
    #[derive(Clone, Copy, Default)]
    struct Panning: u8 {
        const CH1_RIGHT = 0b0000_0001;
        const CH2_RIGHT = 0b0000_0010;
        const CH3_RIGHT = 0b0000_0100;
        const CH4_RIGHT = 0b0000_1000;
        const CH1_LEFT  = 0b0001_0000;
        const CH2_LEFT  = 0b0010_0000;
        const CH3_LEFT  = 0b0100_0000;
        const CH4_LEFT  = 0b1000_0000;
    }
}

/// T-cycles per machine-cycle; the APU's internal units are ticked by
/// machine-cycle (four T-cycles each) just like the rest of the bus.
const T_CYCLES_PER_STEP: u32 = 4;

/// The master clock that every other frequency in this module (T-cycles,
/// the 512 Hz frame sequencer, the host's chosen sample rate) is derived
/// from.
const MASTER_CLOCK_HZ: u32 = 4_194_304;

/// A bounded single-producer single-consumer queue of resampled stereo
/// frames. The producer (the APU, once per emitted sample) drops the
/// oldest entry on overflow rather than blocking — matching `spec.md`
/// §5's "drop-oldest backpressure" for the audio path.
pub(crate) struct SampleQueue {
    buf: VecDeque<(i16, i16)>,
    capacity: usize,
}

impl SampleQueue {
    fn new(capacity: usize) -> Self {
        SampleQueue { buf: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, left: i16, right: i16) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back((left, right));
    }

    /// Drains every queued frame into `sound`, oldest first.
    pub(crate) fn drain_into(&mut self, sound: &mut dyn Sound) {
        while let Some((left, right)) = self.buf.pop_front() {
            sound.push_sample(left, right);
        }
    }
}

pub(crate) struct Apu {
    enabled: bool,
    ch1: PulseChannel<Sweep>,
    ch2: PulseChannel<()>,
    ch3: WaveChannel,
    ch4: NoiseChannel,
    panning: Panning,
    left_volume: u8,
    right_volume: u8,
    div_apu: u8,
    sample_rate: u32,
    /// Fixed-point accumulator driving the T-cycle -> sample-rate
    /// downsampling: incremented by `sample_rate` every T-cycle, emits a
    /// sample and wraps whenever it reaches `MASTER_CLOCK_HZ`. This tracks
    /// the exact average rate with no long-term drift, unlike a fixed
    /// "every N cycles" divisor.
    sample_accum: u32,
    queue: SampleQueue,
}

impl Apu {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Apu {
            enabled: true,
            ch1: PulseChannel::default(),
            ch2: PulseChannel::default(),
            ch3: WaveChannel::default(),
            ch4: NoiseChannel::default(),
            panning: Panning::default(),
            left_volume: 7,
            right_volume: 7,
            div_apu: 0,
            sample_rate,
            sample_accum: 0,
            // A little over one 59.7 Hz frame's worth of samples at a
            // typical rate; ample slack for the host to drain once per
            // frame without ever blocking the APU.
            queue: SampleQueue::new(4096),
        }
    }

    /// Advances the whole unit by one machine-cycle (4 T-cycles), enqueuing
    /// resampled stereo frames as they come due.
    ///
    /// `sequencer_tick` tells the APU to also advance its 512 Hz frame
    /// sequencer this call; the bus derives that from the falling edge of
    /// `DIV` bit 4 rather than the APU tracking `DIV` itself.
    pub(crate) fn step(&mut self, sequencer_tick: bool) {
        if !self.enabled {
            return;
        }

        if sequencer_tick {
            self.tick_frame_sequencer();
        }

        for _ in 0..T_CYCLES_PER_STEP {
            self.ch1.step();
            self.ch2.step();
            self.ch3.step();
            self.ch4.step();

            self.sample_accum += self.sample_rate;
            if self.sample_accum >= MASTER_CLOCK_HZ {
                self.sample_accum -= MASTER_CLOCK_HZ;
                self.push_sample();
            }
        }
    }

    /// Drains every sample queued since the last call into `sound`. Called
    /// once per frame by the host-facing emulator loop.
    pub(crate) fn drain_samples(&mut self, sound: &mut dyn Sound) {
        self.queue.drain_into(sound);
    }

    fn tick_frame_sequencer(&mut self) {
        self.div_apu = self.div_apu.wrapping_add(1);

        if self.div_apu % 2 == 0 {
            self.ch1.tick_length();
            self.ch2.tick_length();
            self.ch3.tick_length();
            self.ch4.tick_length();
        }
        if self.div_apu % 4 == 2 {
            self.ch1.tick_sweep();
        }
        if self.div_apu % 8 == 7 {
            self.ch1.tick_envelope();
            self.ch2.tick_envelope();
            self.ch4.tick_envelope();
        }
    }

    fn push_sample(&mut self) {
        let mut left = 0i32;
        let mut right = 0i32;

        let channels: [(u8, Panning, Panning); 4] = [
            (self.ch1.amplitude(), Panning::CH1_LEFT, Panning::CH1_RIGHT),
            (self.ch2.amplitude(), Panning::CH2_LEFT, Panning::CH2_RIGHT),
            (self.ch3.amplitude(), Panning::CH3_LEFT, Panning::CH3_RIGHT),
            (self.ch4.amplitude(), Panning::CH4_LEFT, Panning::CH4_RIGHT),
        ];
        for (amp, left_bit, right_bit) in channels {
            // Centre a 0..=15 DAC output around 0 the way the real analog
            // mixer does, so silence on all channels is digital zero.
            let centred = amp as i32 * 2 - 15;
            if self.panning.contains(left_bit) {
                left += centred;
            }
            if self.panning.contains(right_bit) {
                right += centred;
            }
        }

        let left = left * (self.left_volume as i32 + 1) * 64;
        let right = right * (self.right_volume as i32 + 1) * 64;
        self.queue.push(left.clamp(-32768, 32767) as i16, right.clamp(-32768, 32767) as i16);
    }

    pub(crate) fn load_io_byte(&self, addr: Word) -> Byte {
        match addr.get() {
            0xFF10 => Byte::new(self.ch1.read_sweep()),
            0xFF11 => Byte::new(self.ch1.read_length_duty()),
            0xFF12 => Byte::new(self.ch1.read_envelope()),
            0xFF13 => Byte::new(0xFF),
            0xFF14 => Byte::new(self.ch1.read_freq_hi()),

            0xFF16 => Byte::new(self.ch2.read_length_duty()),
            0xFF17 => Byte::new(self.ch2.read_envelope()),
            0xFF18 => Byte::new(0xFF),
            0xFF19 => Byte::new(self.ch2.read_freq_hi()),

            0xFF1A => Byte::new(self.ch3.read_dac_enable()),
            0xFF1B => Byte::new(0xFF),
            0xFF1C => Byte::new(self.ch3.read_volume()),
            0xFF1D => Byte::new(0xFF),
            0xFF1E => Byte::new(self.ch3.read_freq_hi()),

            0xFF20 => Byte::new(0xFF),
            0xFF21 => Byte::new(self.ch4.read_envelope()),
            0xFF22 => Byte::new(self.ch4.read_poly()),
            0xFF23 => Byte::new(self.ch4.read_control()),

            0xFF24 => Byte::new((self.left_volume << 4) | self.right_volume),
            0xFF25 => Byte::new(self.panning.bits()),
            0xFF26 => Byte::new(self.read_nr52()),

            0xFF30..=0xFF3F => self.ch3.load_wave_ram((addr.get() - 0xFF30) as usize),
            _ => Byte::new(0xFF),
        }
    }

    pub(crate) fn store_io_byte(&mut self, addr: Word, byte: Byte) {
        let addr = addr.get();
        if !self.enabled && addr != 0xFF26 && !(0xFF30..=0xFF3F).contains(&addr) {
            return;
        }
        match addr {
            0xFF10 => self.ch1.write_sweep(byte),
            0xFF11 => self.ch1.write_length_duty(byte),
            0xFF12 => self.ch1.write_envelope(byte),
            0xFF13 => self.ch1.write_freq_lo(byte),
            0xFF14 => self.ch1.write_freq_hi(byte),

            0xFF16 => self.ch2.write_length_duty(byte),
            0xFF17 => self.ch2.write_envelope(byte),
            0xFF18 => self.ch2.write_freq_lo(byte),
            0xFF19 => self.ch2.write_freq_hi(byte),

            0xFF1A => self.ch3.write_dac_enable(byte),
            0xFF1B => self.ch3.write_length(byte),
            0xFF1C => self.ch3.write_volume(byte),
            0xFF1D => self.ch3.write_freq_lo(byte),
            0xFF1E => self.ch3.write_freq_hi(byte),

            0xFF20 => self.ch4.write_length(byte),
            0xFF21 => self.ch4.write_envelope(byte),
            0xFF22 => self.ch4.write_poly(byte),
            0xFF23 => self.ch4.write_control(byte),

            0xFF24 => {
                self.left_volume = (byte.get() >> 4) & 0b111;
                self.right_volume = byte.get() & 0b111;
            }
            0xFF25 => self.panning = Panning::from_bits_truncate(byte.get()),
            0xFF26 => self.write_nr52(byte),

            0xFF30..=0xFF3F => self.ch3.store_wave_ram((addr - 0xFF30) as usize, byte),
            _ => {}
        }
    }

    fn read_nr52(&self) -> u8 {
        0b0111_0000
            | ((self.enabled as u8) << 7)
            | (self.ch1.enabled as u8)
            | ((self.ch2.enabled as u8) << 1)
            | ((self.ch3.enabled as u8) << 2)
            | ((self.ch4.enabled as u8) << 3)
    }

    fn write_nr52(&mut self, byte: Byte) {
        let was_enabled = self.enabled;
        self.enabled = byte.bit(7);
        if was_enabled && !self.enabled {
            // Powering off clears every register; the length counters'
            // byte-wide load values survive on real hardware but we don't
            // model that quirk.
            *self = Apu { enabled: false, ..Apu::new(self.sample_rate) };
        }
    }
}
