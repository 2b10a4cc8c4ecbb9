//! Audio analysis
//!
//! Leaves first: `channel` and `spectrum` are pure transforms, `beat` keeps
//! rolling state, `pipeline` composes all three into `AudioFeatures`.

pub mod beat;
pub mod channel;
pub mod features;
pub mod pipeline;
pub mod spectrum;

pub use beat::{BeatDetector, BeatResult, BeatStats};
pub use channel::{AvsAudioData, ChannelProcessor, AVS_BUFFER_SIZE};
pub use features::AudioFeatures;
pub use pipeline::{AudioPipeline, SharedFeatures};
pub use spectrum::{fft_in_place, SpectrumAnalyzer, SpectrumFrame};
