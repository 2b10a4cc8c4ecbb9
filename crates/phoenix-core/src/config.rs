//! Engine configuration
//!
//! Plain values handed in by whatever loads the user's settings. Every field
//! has a default so partial configuration files deserialize cleanly.

use crate::audio::channel::AVS_BUFFER_SIZE;
use crate::draw::Argb;
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Audio analysis settings
    pub audio: AudioSettings,
    /// Beat detection settings
    pub beat: BeatSettings,
    /// Frame rendering settings
    pub render: RenderSettings,
    /// Logging settings
    pub logging: LogConfig,
}

/// Audio analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Samples per channel every per-frame buffer is resampled to
    pub buffer_size: usize,
    /// FFT size (power of two)
    pub fft_size: usize,
    /// Expected input sample rate
    pub sample_rate: u32,
    /// Spectrum smoothing factor (0.0 = none, 0.99 = very slow)
    pub smoothing: f32,
    /// Input gain applied before analysis
    pub gain: f32,
    /// One-pole low-pass strength for the waveform display path (1.0 = off)
    pub low_pass_strength: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            buffer_size: AVS_BUFFER_SIZE,
            fft_size: 1024,
            sample_rate: 44100,
            smoothing: 0.7,
            gain: 1.0,
            low_pass_strength: 0.1,
        }
    }
}

/// Beat detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatSettings {
    /// Number of frames in the energy history window
    pub history_size: usize,
    /// Multiplier applied to the adaptive threshold
    pub threshold_multiplier: f32,
    /// Lowest threshold the detector will ever use
    pub min_threshold: f32,
    /// Slowest tempo accepted for BPM estimation
    pub min_bpm: f32,
    /// Fastest tempo accepted; also sets the beat cooldown
    pub max_bpm: f32,
    /// Number of inter-beat intervals kept for BPM estimation
    pub interval_history: usize,
    /// Weight of the previous estimate when smoothing BPM
    pub bpm_smoothing: f32,
}

impl Default for BeatSettings {
    fn default() -> Self {
        Self {
            history_size: 43,
            threshold_multiplier: 1.3,
            min_threshold: 0.001,
            min_bpm: 60.0,
            max_bpm: 200.0,
            interval_history: 16,
            bpm_smoothing: 0.7,
        }
    }
}

/// How the effect graph schedules its nodes each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Every enabled node renders, in execution order
    #[default]
    Stacked,
    /// Exactly one enabled node renders, rotating on a timer
    RoundRobin,
}

/// Frame rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Node scheduling mode
    pub mode: RenderMode,
    /// Seconds each node stays active in round-robin mode
    pub rotate_interval_secs: f64,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Color of the fallback visualization
    pub fallback_color: Argb,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::Stacked,
            rotate_interval_secs: 10.0,
            width: 640,
            height: 480,
            fallback_color: Argb(0xFF40_C0FF),
        }
    }
}
