//! PhoenixFlow Core - AVS preset replay engine
//!
//! This crate contains everything between decoded PCM and draw calls:
//! - Audio analysis (channel processing, FFT spectrum, beat/BPM detection)
//! - Preset data model shared with the parser
//! - Effect nodes, the effect registry and the effect graph
//! - Frame orchestration across the audio and render ticks

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod config;
pub mod draw;
pub mod effects;
pub mod graph;
pub mod logging;
pub mod orchestrator;
pub mod preset;

// Audio
pub use audio::{
    AudioFeatures, AudioPipeline, AvsAudioData, BeatDetector, BeatResult, BeatStats,
    ChannelProcessor, SharedFeatures, SpectrumAnalyzer, SpectrumFrame, AVS_BUFFER_SIZE,
};

// Configuration & Logging
pub use config::{AudioSettings, BeatSettings, EngineConfig, RenderMode, RenderSettings};
pub use logging::LogConfig;

// Drawing
pub use draw::{Argb, CommandRecorder, DrawCommand, DrawSink, Point};

// Effects & Graph
pub use effects::{
    EffectError, EffectNode, EffectParam, EffectParams, EffectRegistry, ParamKind, RenderContext,
};
pub use graph::{Connection, EffectGraph, FrameReport, GraphError, NodeId};

// Orchestration
pub use orchestrator::{AudioTick, FrameOrchestrator, FrameRenderer, GraphStager, RenderTick};

// Preset model
pub use preset::{
    DetectionResult, EffectCategory, EffectDescriptor, ParamValue, PresetFileType, RawPayload,
    Scope, ScopeSource, UnifiedPresetData,
};

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A constructor or operation received an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Structural effect graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Effect node configuration error
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    /// The other end of a channel was dropped
    #[error("Disconnected: {0}")]
    Disconnected(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
