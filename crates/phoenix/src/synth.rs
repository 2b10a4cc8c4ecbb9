//! Synthetic stereo source: a soft pad with a kick drum on every beat

use std::f32::consts::TAU;

const PAD_HZ: f32 = 220.0;
const KICK_HZ: f32 = 55.0;
const KICK_SECS: f32 = 0.08;

pub struct SyntheticSource {
    sample_rate: u32,
    samples_per_beat: u64,
    position: u64,
}

impl SyntheticSource {
    pub fn new(sample_rate: u32, bpm: f32) -> Self {
        let bpm = bpm.clamp(1.0, 1000.0);
        Self {
            sample_rate,
            samples_per_beat: (sample_rate as f32 * 60.0 / bpm).round().max(1.0) as u64,
            position: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Next `len` samples per channel
    pub fn next_block(&mut self, len: usize) -> (Vec<f32>, Vec<f32>) {
        let sr = self.sample_rate as f32;
        let mut left = Vec::with_capacity(len);
        let mut right = Vec::with_capacity(len);
        for _ in 0..len {
            let t = self.position as f32 / sr;
            let pad = (TAU * PAD_HZ * t).sin() * 0.05;

            let since_beat = (self.position % self.samples_per_beat) as f32 / sr;
            let kick = if since_beat < KICK_SECS {
                let envelope = 1.0 - since_beat / KICK_SECS;
                (TAU * KICK_HZ * since_beat).sin() * envelope * 0.9
            } else {
                0.0
            };

            left.push(pad + kick);
            right.push(pad * 0.8 + kick);
            self.position += 1;
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kick_lands_on_beat() {
        let mut source = SyntheticSource::new(1000, 120.0);
        let (left, right) = source.next_block(1000);
        assert_eq!(left.len(), 1000);
        assert_eq!(right.len(), 1000);

        let energy = |block: &[f32]| block.iter().map(|s| s * s).sum::<f32>();
        // 500 samples per beat; the kick occupies the first 80 of each
        assert!(energy(&left[10..80]) > 10.0 * energy(&left[100..170]));
        assert!(energy(&left[510..580]) > 10.0 * energy(&left[600..670]));
    }
}
