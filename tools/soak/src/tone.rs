//! Test tone generator

use std::f32::consts::TAU;

/// Sine oscillator producing interleaved `i16` frames
pub struct Tone {
    phase: f32,
    step: f32,
    amplitude: f32,
}

impl Tone {
    pub fn new(frequency: f32, sample_rate: u32, amplitude: f32) -> Self {
        Self {
            phase: 0.0,
            step: TAU * frequency / sample_rate as f32,
            amplitude: amplitude.clamp(0.0, 1.0),
        }
    }

    /// Fill `out` with frames of `channels` identical samples
    pub fn render(&mut self, out: &mut [i16], channels: usize) {
        for frame in out.chunks_mut(channels.max(1)) {
            let value = (self.phase.sin() * self.amplitude * i16::MAX as f32) as i16;
            frame.fill(value);
            self.phase = (self.phase + self.step) % TAU;
        }
    }
}
