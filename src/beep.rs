use sdl2::audio::{AudioCallback, AudioSpec};

// tone pitch, in Hz
const TONE_FREQ: f32 = 440.0;

const VOLUME: f32 = 0.10;

/// The buzzer: a square wave played while the sound timer is running.
/// Adapted from sdl2::audio sample code.
pub struct Beep {
    phase_inc: f32,
    phase: f32,
    volume: f32,
}

impl Beep {
    fn new(sample_rate: i32, tone_freq: f32, volume: f32) -> Self {
        Beep {
            phase_inc: tone_freq / sample_rate as f32,
            phase: 0.0,
            volume,
        }
    }
}

impl From<AudioSpec> for Beep {
    fn from(spec: AudioSpec) -> Self {
        Beep::new(spec.freq, TONE_FREQ, VOLUME)
    }
}

impl AudioCallback for Beep {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for x in out.iter_mut() {
            *x = if self.phase <= 0.5 {
                self.volume
            } else {
                -self.volume
            };
            self.phase = (self.phase + self.phase_inc) % 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_wave() {
        // 4 samples per period
        let mut beep = Beep::new(4, 1.0, 0.5);
        let mut out = [0f32; 8];
        beep.callback(&mut out);

        assert_eq!(out, [0.5, 0.5, 0.5, -0.5, 0.5, 0.5, 0.5, -0.5]);
    }
}
