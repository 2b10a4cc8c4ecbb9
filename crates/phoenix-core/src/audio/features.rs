//! Per-frame audio feature snapshot consumed by effect nodes

use serde::{Deserialize, Serialize};

/// Bass band limits in Hz
pub const BASS_RANGE: (f32, f32) = (20.0, 250.0);
/// Mid band limits in Hz
pub const MID_RANGE: (f32, f32) = (250.0, 4000.0);
/// Treble band lower limit in Hz; the upper limit is the Nyquist frequency
pub const TREBLE_LOW: f32 = 4000.0;

/// Immutable audio snapshot for one rendered frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Left waveform in AVS format (-1.0 - 1.0)
    pub waveform_left: Vec<f32>,
    /// Right waveform in AVS format (-1.0 - 1.0)
    pub waveform_right: Vec<f32>,
    /// Center (mono) waveform in AVS format
    pub waveform_center: Vec<f32>,
    /// Smoothed perceptual spectrum (0.0 - 1.0 per bin)
    pub spectrum: Vec<f32>,
    /// Bin center frequencies matching `spectrum`
    pub frequencies: Vec<f32>,
    /// RMS level of the raw chunk
    pub rms: f32,
    /// Peak absolute sample of the raw chunk
    pub peak: f32,
    /// Mean spectrum value in the bass band
    pub bass: f32,
    /// Mean spectrum value in the mid band
    pub mid: f32,
    /// Mean spectrum value in the treble band
    pub treble: f32,
    /// Current tempo estimate (0.0 when unknown)
    pub bpm: f32,
    /// A beat fired on this chunk
    pub beat: bool,
    /// Beat confidence (0.0 - 1.0)
    pub beat_confidence: f32,
    /// Stream time in seconds
    pub time_seconds: f64,
}

impl AudioFeatures {
    /// A silent snapshot with waveforms of `size` samples
    pub fn silent(size: usize) -> Self {
        Self {
            waveform_left: vec![0.0; size],
            waveform_right: vec![0.0; size],
            waveform_center: vec![0.0; size],
            ..Default::default()
        }
    }

    /// The mono waveform, falling back to the left channel
    pub fn waveform(&self) -> &[f32] {
        if self.waveform_center.is_empty() {
            &self.waveform_left
        } else {
            &self.waveform_center
        }
    }
}
