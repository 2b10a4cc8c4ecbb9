//! Frame Orchestrator - wires audio analysis to graph evaluation
//!
//! Two periodic activities share state: the audio tick publishes
//! `AudioFeatures`, the render tick reads the latest snapshot and evaluates
//! the effect graph. New graphs are built off to the side and handed to the
//! render tick through a channel, so a graph is never mutated mid-frame.

use crate::audio::{AudioFeatures, AudioPipeline, SharedFeatures};
use crate::config::{EngineConfig, RenderSettings};
use crate::draw::{CommandRecorder, DrawCommand, DrawSink};
use crate::effects::{draw_fallback, EffectRegistry};
use crate::graph::{EffectGraph, FrameReport, GraphError};
use crate::preset::UnifiedPresetData;
use crate::CoreError;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// Render boundary: one call per frame
pub trait FrameRenderer {
    /// Draw one frame for the given snapshot
    fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn DrawSink);
}

/// Audio side: analyzes chunks and publishes snapshots
pub struct AudioTick {
    pipeline: AudioPipeline,
    shared: SharedFeatures,
}

impl AudioTick {
    /// Create an audio tick publishing into `shared`
    pub fn new(pipeline: AudioPipeline, shared: SharedFeatures) -> Self {
        Self { pipeline, shared }
    }

    /// Analyze one chunk and publish the result
    pub fn process(&mut self, left: &[f32], right: &[f32], sample_rate: u32) -> Arc<AudioFeatures> {
        let features = self.pipeline.process(left, right, sample_rate);
        self.shared.publish(features);
        self.shared.latest()
    }

    /// The analysis pipeline
    pub fn pipeline(&self) -> &AudioPipeline {
        &self.pipeline
    }

    /// Reset analysis state
    pub fn reset(&mut self) {
        self.pipeline.reset();
    }
}

/// Builds graphs off the render thread and stages them for swapping.
///
/// At most one graph waits in the staging slot; staging a newer graph
/// replaces one the render tick has not picked up yet.
#[derive(Clone)]
pub struct GraphStager {
    sender: Sender<EffectGraph>,
    stale: Receiver<EffectGraph>,
    render_alive: Receiver<()>,
    registry: Arc<EffectRegistry>,
    settings: RenderSettings,
}

impl GraphStager {
    /// Stage an already built graph. Cyclic graphs are rejected here.
    pub fn stage(&self, mut graph: EffectGraph) -> Result<(), CoreError> {
        graph.execution_order()?;
        // Never sent on; disconnects when the render tick is dropped
        if let Err(TryRecvError::Disconnected) = self.render_alive.try_recv() {
            return Err(CoreError::Disconnected("render tick is gone".to_string()));
        }

        loop {
            match self.sender.try_send(graph) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(pending)) => {
                    if self.stale.try_recv().is_ok() {
                        debug!("Replaced a staged graph that was never rendered");
                    }
                    graph = pending;
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(CoreError::Disconnected("render tick is gone".to_string()));
                }
            }
        }
    }

    /// Build a graph for a parsed preset and stage it
    pub fn stage_preset(&self, preset: &UnifiedPresetData) -> Result<(), CoreError> {
        let graph = self.registry.build_graph(preset, &self.settings)?;
        self.stage(graph)
    }
}

/// Render side: swaps in staged graphs between frames and evaluates them
pub struct RenderTick {
    graph: Option<EffectGraph>,
    staged: Receiver<EffectGraph>,
    _alive: Sender<()>,
    shared: SharedFeatures,
    settings: RenderSettings,
    last_report: FrameReport,
}

impl RenderTick {
    /// Graph swaps happen only here, before a frame starts
    fn apply_staged(&mut self) {
        if let Ok(mut graph) = self.staged.try_recv() {
            graph.reset();
            info!("Swapped in new effect graph ({} nodes)", graph.len());
            self.graph = Some(graph);
        }
    }

    /// Render one frame against `features`.
    ///
    /// A structural error drops the current graph, draws the fallback and is
    /// returned to the caller.
    pub fn render(
        &mut self,
        features: &AudioFeatures,
        canvas: &mut dyn DrawSink,
    ) -> Result<FrameReport, GraphError> {
        self.apply_staged();
        let (width, height) = (self.settings.width as f32, self.settings.height as f32);

        let result = match self.graph.as_mut() {
            Some(graph) => graph.evaluate(features, canvas, width, height),
            None => {
                draw_fallback(features, canvas, width, height, self.settings.fallback_color);
                Ok(FrameReport {
                    fallbacks: 1,
                    ..Default::default()
                })
            }
        };

        match result {
            Ok(report) => {
                self.last_report = report.clone();
                Ok(report)
            }
            Err(e) => {
                error!("Effect graph failed structurally, dropping it: {}", e);
                self.graph = None;
                draw_fallback(features, canvas, width, height, self.settings.fallback_color);
                Err(e)
            }
        }
    }

    /// Render one frame from the latest published snapshot
    pub fn tick(&mut self, canvas: &mut dyn DrawSink) -> Result<FrameReport, GraphError> {
        let features = self.shared.latest();
        self.render(&features, canvas)
    }

    /// Render the latest snapshot into an ordered draw-command list
    pub fn tick_commands(&mut self) -> Result<Vec<DrawCommand>, GraphError> {
        let mut recorder = CommandRecorder::new();
        self.tick(&mut recorder)?;
        Ok(recorder.take())
    }

    /// Report of the last successful frame
    pub fn last_report(&self) -> &FrameReport {
        &self.last_report
    }

    /// A graph is currently loaded
    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }
}

impl FrameRenderer for RenderTick {
    fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn DrawSink) {
        // Already logged and replaced by the fallback
        if let Err(e) = self.render(features, canvas) {
            trace!("Frame rendered with fallback: {}", e);
        }
    }
}

/// Audio tick, render tick and graph staging in one place
pub struct FrameOrchestrator {
    audio: AudioTick,
    render: RenderTick,
    stager: GraphStager,
}

impl FrameOrchestrator {
    /// Create an orchestrator using the built-in effect registry
    pub fn new(config: &EngineConfig) -> Result<Self, CoreError> {
        Self::with_registry(config, EffectRegistry::builtin())
    }

    /// Create an orchestrator with a caller-supplied registry
    pub fn with_registry(config: &EngineConfig, registry: EffectRegistry) -> Result<Self, CoreError> {
        let shared = SharedFeatures::new();
        shared.publish(AudioFeatures::silent(config.audio.buffer_size));
        let pipeline = AudioPipeline::from_config(config)?;
        let (sender, staged) = bounded(1);
        let (alive, render_alive) = bounded(0);

        Ok(Self {
            audio: AudioTick::new(pipeline, shared.clone()),
            render: RenderTick {
                graph: None,
                staged: staged.clone(),
                _alive: alive,
                shared,
                settings: config.render.clone(),
                last_report: FrameReport::default(),
            },
            stager: GraphStager {
                sender,
                stale: staged,
                render_alive,
                registry: Arc::new(registry),
                settings: config.render.clone(),
            },
        })
    }

    /// A handle for staging graphs from other threads
    pub fn stager(&self) -> GraphStager {
        self.stager.clone()
    }

    /// Build and stage a graph for a parsed preset
    pub fn load_preset(&self, preset: &UnifiedPresetData) -> Result<(), CoreError> {
        self.stager.stage_preset(preset)
    }

    /// Analyze one audio chunk
    pub fn process_audio(&mut self, left: &[f32], right: &[f32], sample_rate: u32) -> Arc<AudioFeatures> {
        self.audio.process(left, right, sample_rate)
    }

    /// Render the latest snapshot
    pub fn render(&mut self, canvas: &mut dyn DrawSink) -> Result<FrameReport, GraphError> {
        self.render.tick(canvas)
    }

    /// Analyze a chunk, then render it into an ordered draw-command list
    pub fn frame(
        &mut self,
        left: &[f32],
        right: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<DrawCommand>, GraphError> {
        self.process_audio(left, right, sample_rate);
        self.render.tick_commands()
    }

    /// Split into parts for separate audio and render threads
    pub fn split(self) -> (AudioTick, RenderTick, GraphStager) {
        (self.audio, self.render, self.stager)
    }
}
