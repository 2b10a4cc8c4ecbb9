//! Channel Processor - stereo separation, resampling and smoothing
//!
//! Every per-frame audio buffer is brought into the classic AVS shape before
//! effects see it: fixed length, normalized, with a synthesized center channel.

use tracing::trace;

/// Fixed per-channel sample count of the AVS waveform buffers
pub const AVS_BUFFER_SIZE: usize = 576;

/// Three-channel waveform bundle in AVS format
#[derive(Debug, Clone, PartialEq)]
pub struct AvsAudioData {
    /// Left channel, `target_size` samples in -1.0..=1.0
    pub left: Vec<f32>,
    /// Right channel, `target_size` samples in -1.0..=1.0
    pub right: Vec<f32>,
    /// Average of left and right, normalized independently
    pub center: Vec<f32>,
    /// Timestamp of the source chunk in seconds
    pub timestamp: f64,
}

impl AvsAudioData {
    /// A silent bundle of the given size
    pub fn silent(size: usize, timestamp: f64) -> Self {
        Self {
            left: vec![0.0; size],
            right: vec![0.0; size],
            center: vec![0.0; size],
            timestamp,
        }
    }
}

/// Stateless channel utilities plus the settings used by `convert_to_avs_format`
#[derive(Debug, Clone)]
pub struct ChannelProcessor {
    target_size: usize,
    low_pass_strength: f32,
}

impl Default for ChannelProcessor {
    fn default() -> Self {
        Self::new(AVS_BUFFER_SIZE, 0.1)
    }
}

impl ChannelProcessor {
    /// Create a processor producing `target_size` samples per channel
    pub fn new(target_size: usize, low_pass_strength: f32) -> Self {
        Self {
            target_size,
            low_pass_strength: low_pass_strength.clamp(0.0, 1.0),
        }
    }

    /// Samples per channel produced by this processor
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Split an interleaved stereo buffer into left and right.
    ///
    /// Empty input yields two silent buffers of the target size. A trailing
    /// unpaired sample is dropped.
    pub fn separate_channels(&self, interleaved: &[f32]) -> (Vec<f32>, Vec<f32>) {
        if interleaved.is_empty() {
            return (vec![0.0; self.target_size], vec![0.0; self.target_size]);
        }

        let frames = interleaved.len() / 2;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for pair in interleaved.chunks_exact(2) {
            left.push(pair[0]);
            right.push(pair[1]);
        }
        (left, right)
    }

    /// Resample `data` to exactly `target_size` samples.
    ///
    /// Longer input is box-averaged per target bucket, shorter input is
    /// linearly interpolated. Empty input produces silence.
    pub fn downsample(data: &[f32], target_size: usize) -> Vec<f32> {
        if target_size == 0 {
            return Vec::new();
        }
        if data.is_empty() {
            return vec![0.0; target_size];
        }
        if data.len() == target_size {
            return data.to_vec();
        }

        let len = data.len();
        if len > target_size {
            (0..target_size)
                .map(|i| {
                    let start = i * len / target_size;
                    let end = ((i + 1) * len / target_size).clamp(start + 1, len);
                    let span = &data[start..end];
                    span.iter().sum::<f32>() / span.len() as f32
                })
                .collect()
        } else if target_size == 1 {
            vec![data[0]]
        } else {
            let ratio = (len - 1) as f64 / (target_size - 1) as f64;
            (0..target_size)
                .map(|i| {
                    let pos = i as f64 * ratio;
                    let index = (pos.floor() as usize).min(len - 1);
                    let next = (index + 1).min(len - 1);
                    let frac = (pos - index as f64) as f32;
                    data[index] + (data[next] - data[index]) * frac
                })
                .collect()
        }
    }

    /// Elementwise average of two channels over the shorter length
    pub fn create_center_channel(left: &[f32], right: &[f32]) -> Vec<f32> {
        left.iter()
            .zip(right.iter())
            .map(|(l, r)| (l + r) * 0.5)
            .collect()
    }

    /// Scale so the largest absolute sample equals `target_range`.
    ///
    /// Silent input is returned unscaled.
    pub fn normalize(data: &[f32], target_range: f32) -> Vec<f32> {
        let max_abs = data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if max_abs <= f32::EPSILON {
            return data.to_vec();
        }
        let scale = target_range / max_abs;
        data.iter().map(|s| s * scale).collect()
    }

    /// One-pole IIR smoothing: `y[i] = y[i-1] * (1 - strength) + x[i] * strength`
    pub fn apply_low_pass_filter(data: &[f32], strength: f32) -> Vec<f32> {
        let strength = strength.clamp(0.0, 1.0);
        let mut out = Vec::with_capacity(data.len());
        let mut prev = match data.first() {
            Some(&first) => first,
            None => return out,
        };
        out.push(prev);
        for &x in &data[1..] {
            prev = prev * (1.0 - strength) + x * strength;
            out.push(prev);
        }
        out
    }

    /// Produce the canonical fixed-size L/R/Center bundle
    pub fn convert_to_avs_format(&self, left: &[f32], right: &[f32], timestamp: f64) -> AvsAudioData {
        if left.is_empty() && right.is_empty() {
            return AvsAudioData::silent(self.target_size, timestamp);
        }

        // A missing channel mirrors the other one
        let (left, right) = match (left.is_empty(), right.is_empty()) {
            (true, false) => (right, right),
            (false, true) => (left, left),
            _ => (left, right),
        };

        let prepare = |channel: &[f32]| {
            let clean: Vec<f32> = channel
                .iter()
                .map(|&s| if s.is_finite() { s } else { 0.0 })
                .collect();
            let resized = Self::downsample(&clean, self.target_size);
            Self::apply_low_pass_filter(&resized, self.low_pass_strength)
        };

        let left = prepare(left);
        let right = prepare(right);
        let center = Self::normalize(&Self::create_center_channel(&left, &right), 1.0);

        trace!(
            "AVS bundle: {} samples per channel at t={:.3}",
            self.target_size,
            timestamp
        );

        AvsAudioData {
            left: Self::normalize(&left, 1.0),
            right: Self::normalize(&right, 1.0),
            center,
            timestamp,
        }
    }
}
