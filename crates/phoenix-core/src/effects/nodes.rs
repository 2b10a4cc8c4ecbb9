//! Built-in effect nodes
//!
//! Nodes draw with vector primitives only. Effects whose legacy behavior is a
//! per-pixel operation (convolution, comments, unknown ids) keep their
//! parameters but draw nothing.

use super::{EffectError, EffectNode, EffectParam, EffectParams, RenderContext};
use crate::audio::AudioFeatures;
use crate::draw::{Argb, DrawSink, Point};
use crate::preset::{EffectDescriptor, ParamValue, Scope};
use std::f32::consts::TAU;

/// Legacy type id of the simple spectrum/oscilloscope
pub const SIMPLE_SPECTRUM_ID: i32 = 0;
/// Legacy type id of the ring
pub const RING_ID: i32 = 14;
/// Legacy type id of the comment
pub const COMMENT_ID: i32 = 21;
/// Legacy type id of clear screen
pub const CLEAR_SCREEN_ID: i32 = 25;
/// Legacy type id of the text effect
pub const TEXT_ID: i32 = 28;
/// Legacy type id of the superscope
pub const SUPERSCOPE_ID: i32 = 36;
/// Type id of the convolution filter plug-in slot
pub const CONVOLUTION_ID: i32 = 16384;

/// Number of cells in a convolution kernel (7x7)
pub const CONVOLUTION_KERNEL_LEN: usize = 49;

fn color_param(params: &EffectParams, name: &str, default: Argb) -> Argb {
    params.color(name).map(Argb).unwrap_or(default)
}

fn text_param(desc: &EffectDescriptor, name: &str) -> String {
    desc.param(name)
        .and_then(ParamValue::as_text)
        .unwrap_or_default()
        .to_string()
}

/// Map a normalized point (-1..1, y up) onto the canvas
fn to_canvas(x: f32, y: f32, width: f32, height: f32) -> Point {
    Point::new((x + 1.0) * 0.5 * width, (1.0 - (y + 1.0) * 0.5) * height)
}

/// Simple pulsing disc keyed to RMS, drawn in place of a failed node
pub fn draw_fallback(
    features: &AudioFeatures,
    sink: &mut dyn DrawSink,
    width: f32,
    height: f32,
    color: Argb,
) {
    let level = features.rms.clamp(0.0, 1.0);
    let radius = width.min(height) * (0.1 + 0.3 * level);
    let center = Point::new(width * 0.5, height * 0.5);
    sink.circle(center, radius, color.scale(0.5 + 0.5 * level), true);
}

/// Clears the canvas to a solid color
#[derive(Debug, Clone)]
pub struct ClearScreen {
    params: EffectParams,
}

impl Default for ClearScreen {
    fn default() -> Self {
        Self {
            params: EffectParams::new()
                .with("color", EffectParam::new(ParamValue::Color(Argb::BLACK.0))),
        }
    }
}

impl EffectNode for ClearScreen {
    fn name(&self) -> &str {
        "Clear Screen"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(CLEAR_SCREEN_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(&mut self, _: &[f32], _: &[f32], ctx: &mut RenderContext<'_>) -> Result<(), EffectError> {
        ctx.sink.clear(color_param(&self.params, "color", Argb::BLACK));
        Ok(())
    }
}

/// Display style of [`SimpleSpectrum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleMode {
    /// Filled spectrum bars
    SpectrumBars,
    /// Spectrum polyline
    SpectrumLines,
    /// Oscilloscope polyline
    ScopeLines,
    /// Oscilloscope dots
    ScopeDots,
}

impl SimpleMode {
    fn from_bits(mode: i32) -> Self {
        match mode & 3 {
            0 => Self::SpectrumBars,
            1 => Self::SpectrumLines,
            2 => Self::ScopeLines,
            _ => Self::ScopeDots,
        }
    }
}

/// Classic spectrum analyzer / oscilloscope with cycling colors
#[derive(Debug, Clone)]
pub struct SimpleSpectrum {
    params: EffectParams,
}

impl Default for SimpleSpectrum {
    fn default() -> Self {
        Self::with_settings(0, vec![Argb::WHITE.0])
    }
}

impl SimpleSpectrum {
    /// Frames each color of the palette stays on screen
    const COLOR_CYCLE_FRAMES: u64 = 64;

    fn with_settings(mode: i32, colors: Vec<u32>) -> Self {
        Self {
            params: EffectParams::new()
                .with("mode", EffectParam::ranged(ParamValue::Int(mode & 3), 0.0, 3.0))
                .with("colors", EffectParam::new(ParamValue::ColorArray(colors)))
                .with(
                    "thickness",
                    EffectParam::ranged(ParamValue::Float(1.0), 0.5, 8.0),
                ),
        }
    }

    /// Build from a decoded descriptor (`mode`, `colors`)
    pub fn from_descriptor(desc: &EffectDescriptor) -> Result<Self, EffectError> {
        let mode = desc.param("mode").and_then(ParamValue::as_int).unwrap_or(0);
        let colors: Vec<u32> = match desc.param("colors") {
            Some(ParamValue::ColorArray(colors)) => colors
                .iter()
                .map(|&c| Argb::from_legacy(c).0)
                .collect(),
            _ => Vec::new(),
        };
        let colors = if colors.is_empty() {
            vec![Argb::WHITE.0]
        } else {
            colors
        };
        Ok(Self::with_settings(mode, colors))
    }

    /// Current display style
    pub fn mode(&self) -> SimpleMode {
        SimpleMode::from_bits(self.params.int("mode").unwrap_or(0))
    }

    fn current_color(&self, frame: u64) -> Argb {
        match self.params.colors("colors") {
            Some(colors) if !colors.is_empty() => {
                let index = (frame / Self::COLOR_CYCLE_FRAMES) as usize % colors.len();
                Argb(colors[index])
            }
            _ => Argb::WHITE,
        }
    }
}

impl EffectNode for SimpleSpectrum {
    fn name(&self) -> &str {
        "Simple"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(SIMPLE_SPECTRUM_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(
        &mut self,
        waveform: &[f32],
        spectrum: &[f32],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), EffectError> {
        let color = self.current_color(ctx.frame);
        let thickness = self.params.float("thickness").unwrap_or(1.0);
        let (w, h) = (ctx.width, ctx.height);

        match self.mode() {
            SimpleMode::SpectrumBars => {
                let bins = spectrum.len().min(128);
                if bins == 0 {
                    return Ok(());
                }
                let bar_width = w / bins as f32;
                for (i, &value) in spectrum[..bins].iter().enumerate() {
                    let bar_height = value.clamp(0.0, 1.0) * h;
                    ctx.sink.rect(
                        Point::new(i as f32 * bar_width, h - bar_height),
                        bar_width.max(1.0),
                        bar_height,
                        color,
                        true,
                    );
                }
            }
            SimpleMode::SpectrumLines => {
                let bins = spectrum.len().min(256);
                if bins < 2 {
                    return Ok(());
                }
                let step = w / (bins - 1) as f32;
                let points: Vec<Point> = spectrum[..bins]
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Point::new(i as f32 * step, h - v.clamp(0.0, 1.0) * h))
                    .collect();
                for pair in points.windows(2) {
                    ctx.sink.line(pair[0], pair[1], color, thickness);
                }
            }
            SimpleMode::ScopeLines | SimpleMode::ScopeDots => {
                let n = waveform.len();
                if n < 2 {
                    return Ok(());
                }
                let points: Vec<Point> = waveform
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let x = i as f32 / (n - 1) as f32 * 2.0 - 1.0;
                        to_canvas(x, v.clamp(-1.0, 1.0) * 0.5, w, h)
                    })
                    .collect();
                if self.mode() == SimpleMode::ScopeLines {
                    for pair in points.windows(2) {
                        ctx.sink.line(pair[0], pair[1], color, thickness);
                    }
                } else {
                    for p in points {
                        ctx.sink.rect(p, thickness, thickness, color, true);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Superscope node.
///
/// The code sections are kept as parameters for inspection and editing. The
/// node itself renders the default superscope shape: the waveform plotted
/// left to right, brightened on beats.
#[derive(Debug, Clone)]
pub struct Superscope {
    name: String,
    params: EffectParams,
}

impl Default for Superscope {
    fn default() -> Self {
        Self::with_code("Superscope", "", "", "", "")
    }
}

impl Superscope {
    fn with_code(name: &str, init: &str, frame: &str, point: &str, beat: &str) -> Self {
        let text = |s: &str| EffectParam::new(ParamValue::Text(s.to_string()));
        Self {
            name: name.to_string(),
            params: EffectParams::new()
                .with("init", text(init))
                .with("frame", text(frame))
                .with("point", text(point))
                .with("beat", text(beat))
                .with("color", EffectParam::new(ParamValue::Color(Argb::WHITE.0)))
                .with("lines", EffectParam::new(ParamValue::Bool(true)))
                .with(
                    "thickness",
                    EffectParam::ranged(ParamValue::Float(1.0), 0.5, 8.0),
                ),
        }
    }

    /// Build from a parsed scope
    pub fn from_scope(scope: &Scope) -> Self {
        Self::with_code(
            &scope.name,
            scope.init_code.as_deref().unwrap_or_default(),
            scope.frame_code.as_deref().unwrap_or_default(),
            scope.point_code.as_deref().unwrap_or_default(),
            scope.beat_code.as_deref().unwrap_or_default(),
        )
    }

    /// Build from a decoded binary record
    pub fn from_descriptor(desc: &EffectDescriptor) -> Result<Self, EffectError> {
        let mut scope = Self::with_code(
            &desc.name,
            &text_param(desc, "init"),
            &text_param(desc, "frame"),
            &text_param(desc, "point"),
            &text_param(desc, "beat"),
        );
        if let Some(ParamValue::ColorArray(colors)) = desc.param("colors") {
            if let Some(&first) = colors.first() {
                scope
                    .params
                    .set("color", ParamValue::Color(Argb::from_legacy(first).0))?;
            }
        }
        if let Some(mode) = desc.param("draw_mode").and_then(ParamValue::as_int) {
            scope.params.set("lines", ParamValue::Bool(mode != 0))?;
        }
        Ok(scope)
    }
}

impl EffectNode for Superscope {
    fn name(&self) -> &str {
        &self.name
    }

    fn avs_id(&self) -> Option<i32> {
        Some(SUPERSCOPE_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(
        &mut self,
        waveform: &[f32],
        _: &[f32],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), EffectError> {
        let n = waveform.len();
        if n < 2 {
            return Ok(());
        }

        let base = color_param(&self.params, "color", Argb::WHITE);
        let color = if ctx.features.beat { base } else { base.scale(0.8) };
        let thickness = self.params.float("thickness").unwrap_or(1.0);

        // x = i*2-1; y = v*0.5
        let points: Vec<Point> = waveform
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = i as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let y = if v.is_finite() { v.clamp(-1.0, 1.0) * 0.5 } else { 0.0 };
                to_canvas(x, y, ctx.width, ctx.height)
            })
            .collect();

        if self.params.bool("lines").unwrap_or(true) {
            for pair in points.windows(2) {
                ctx.sink.line(pair[0], pair[1], color, thickness);
            }
        } else {
            for p in points {
                ctx.sink.rect(p, thickness, thickness, color, true);
            }
        }
        Ok(())
    }
}

/// Circular oscilloscope / spectrum
#[derive(Debug, Clone)]
pub struct Ring {
    params: EffectParams,
}

impl Default for Ring {
    fn default() -> Self {
        Self {
            params: EffectParams::new()
                .with("color", EffectParam::new(ParamValue::Color(Argb::WHITE.0)))
                .with("size", EffectParam::ranged(ParamValue::Float(0.25), 0.05, 1.0))
                .with("source", EffectParam::ranged(ParamValue::Int(0), 0.0, 1.0)),
        }
    }
}

impl Ring {
    const SEGMENTS: usize = 64;
}

impl EffectNode for Ring {
    fn name(&self) -> &str {
        "Ring"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(RING_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(
        &mut self,
        waveform: &[f32],
        spectrum: &[f32],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), EffectError> {
        let data = if self.params.int("source") == Some(1) {
            spectrum
        } else {
            waveform
        };
        let color = color_param(&self.params, "color", Argb::WHITE);
        let size = self.params.float("size").unwrap_or(0.25);
        let base = ctx.width.min(ctx.height) * 0.5 * size;
        let center = Point::new(ctx.width * 0.5, ctx.height * 0.5);

        let points: Vec<Point> = (0..Self::SEGMENTS)
            .map(|s| {
                let angle = s as f32 / Self::SEGMENTS as f32 * TAU;
                let v = if data.is_empty() {
                    0.0
                } else {
                    data[s * data.len() / Self::SEGMENTS]
                };
                let r = base * (1.0 + 0.5 * v.clamp(-1.0, 1.0));
                Point::new(center.x + angle.cos() * r, center.y + angle.sin() * r)
            })
            .collect();

        for (i, &p) in points.iter().enumerate() {
            let next = points[(i + 1) % points.len()];
            ctx.sink.line(p, next, color, 1.0);
        }
        Ok(())
    }
}

/// Static text overlay
#[derive(Debug, Clone)]
pub struct TextOverlay {
    params: EffectParams,
}

impl TextOverlay {
    /// Create an overlay showing `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            params: EffectParams::new()
                .with("text", EffectParam::new(ParamValue::Text(text.into())))
                .with("color", EffectParam::new(ParamValue::Color(Argb::WHITE.0)))
                .with("size", EffectParam::ranged(ParamValue::Float(24.0), 6.0, 128.0)),
        }
    }
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self::new("")
    }
}

impl EffectNode for TextOverlay {
    fn name(&self) -> &str {
        "Text"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(TEXT_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(&mut self, _: &[f32], _: &[f32], ctx: &mut RenderContext<'_>) -> Result<(), EffectError> {
        let text = self.params.text("text").unwrap_or_default();
        if text.is_empty() {
            return Ok(());
        }
        let size = self.params.float("size").unwrap_or(24.0);
        let approx_width = text.chars().count() as f32 * size * 0.5;
        let position = Point::new(
            (ctx.width - approx_width).max(0.0) * 0.5,
            (ctx.height - size) * 0.5,
        );
        let color = color_param(&self.params, "color", Argb::WHITE);
        ctx.sink.text(position, text, color, size);
        Ok(())
    }
}

/// Preset comment; never draws
#[derive(Debug, Clone, Default)]
pub struct Comment {
    params: EffectParams,
}

impl Comment {
    /// Create a comment node
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            params: EffectParams::new()
                .with("text", EffectParam::new(ParamValue::Text(text.into()))),
        }
    }
}

impl EffectNode for Comment {
    fn name(&self) -> &str {
        "Comment"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(COMMENT_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(&mut self, _: &[f32], _: &[f32], _: &mut RenderContext<'_>) -> Result<(), EffectError> {
        Ok(())
    }
}

/// 7x7 convolution filter settings.
///
/// Applying the kernel needs pixel access, which lives behind the canvas
/// adapter, so the node only carries the configuration.
#[derive(Debug, Clone)]
pub struct Convolution {
    params: EffectParams,
}

impl Default for Convolution {
    fn default() -> Self {
        let mut kernel = vec![0; CONVOLUTION_KERNEL_LEN];
        kernel[CONVOLUTION_KERNEL_LEN / 2] = 1;
        Self::with_settings([true, false, false, false], kernel, 0, 1)
    }
}

impl Convolution {
    fn with_settings(flags: [bool; 4], kernel: Vec<i32>, bias: i32, scale: i32) -> Self {
        let [enabled, wrap, absolute, two_pass] = flags;
        Self {
            params: EffectParams::new()
                .with("enabled", EffectParam::new(ParamValue::Bool(enabled)))
                .with("wrap", EffectParam::new(ParamValue::Bool(wrap)))
                .with("absolute", EffectParam::new(ParamValue::Bool(absolute)))
                .with("two_pass", EffectParam::new(ParamValue::Bool(two_pass)))
                .with("kernel", EffectParam::new(ParamValue::IntArray(kernel)))
                .with("bias", EffectParam::new(ParamValue::Int(bias)))
                .with("scale", EffectParam::new(ParamValue::Int(scale))),
        }
    }

    /// Build from a decoded descriptor
    pub fn from_descriptor(desc: &EffectDescriptor) -> Result<Self, EffectError> {
        let flag = |name: &str| match desc.param(name) {
            Some(ParamValue::Bool(b)) => *b,
            Some(other) => other.as_int().unwrap_or(0) != 0,
            None => false,
        };
        let kernel = match desc.param("kernel") {
            Some(ParamValue::IntArray(kernel)) => kernel.clone(),
            Some(_) => {
                return Err(EffectError::InvalidParameter {
                    name: "kernel".to_string(),
                    reason: "expected an integer array".to_string(),
                })
            }
            None => return Ok(Self::default()),
        };
        if kernel.len() != CONVOLUTION_KERNEL_LEN {
            return Err(EffectError::InvalidParameter {
                name: "kernel".to_string(),
                reason: format!(
                    "expected {} cells, got {}",
                    CONVOLUTION_KERNEL_LEN,
                    kernel.len()
                ),
            });
        }
        let int = |name: &str, default: i32| {
            desc.param(name)
                .and_then(ParamValue::as_int)
                .unwrap_or(default)
        };
        Ok(Self::with_settings(
            [
                flag("enabled"),
                flag("wrap"),
                flag("absolute"),
                flag("two_pass"),
            ],
            kernel,
            int("bias", 0),
            int("scale", 1),
        ))
    }
}

impl EffectNode for Convolution {
    fn name(&self) -> &str {
        "Convolution Filter"
    }

    fn avs_id(&self) -> Option<i32> {
        Some(CONVOLUTION_ID)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(&mut self, _: &[f32], _: &[f32], _: &mut RenderContext<'_>) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Generic node for effect ids without a dedicated implementation.
///
/// Keeps the descriptor's parameters so the preset round-trips, draws nothing.
#[derive(Debug, Clone)]
pub struct PassThrough {
    name: String,
    type_id: i32,
    params: EffectParams,
}

impl PassThrough {
    /// Wrap a descriptor
    pub fn from_descriptor(desc: &EffectDescriptor) -> Self {
        let mut params = EffectParams::new();
        for (name, value) in &desc.parameters {
            params.declare(name.clone(), EffectParam::new(value.clone()));
        }
        Self {
            name: desc.name.clone(),
            type_id: desc.type_id,
            params,
        }
    }
}

impl EffectNode for PassThrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn avs_id(&self) -> Option<i32> {
        Some(self.type_id)
    }

    fn params(&self) -> &EffectParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    fn render(&mut self, _: &[f32], _: &[f32], _: &mut RenderContext<'_>) -> Result<(), EffectError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{CommandRecorder, DrawCommand};
    use crate::preset::{EffectCategory, ScopeSource};

    fn render(node: &mut dyn EffectNode, features: &AudioFeatures) -> Vec<DrawCommand> {
        let mut recorder = CommandRecorder::new();
        {
            let mut ctx = RenderContext {
                features,
                sink: &mut recorder,
                width: 640.0,
                height: 480.0,
                frame: 0,
            };
            node.render(features.waveform(), &features.spectrum, &mut ctx)
                .unwrap();
        }
        recorder.take()
    }

    fn features() -> AudioFeatures {
        AudioFeatures {
            waveform_center: (0..16).map(|i| (i as f32 * 0.4).sin()).collect(),
            spectrum: vec![0.5; 32],
            rms: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_spectrum_modes() {
        let mut desc = EffectDescriptor::new(0, "Simple", EffectCategory::Render, 0);
        desc.parameters
            .insert("mode".to_string(), ParamValue::Int(0x12));
        desc.parameters.insert(
            "colors".to_string(),
            ParamValue::ColorArray(vec![0x00FF_0000]),
        );
        let mut node = SimpleSpectrum::from_descriptor(&desc).unwrap();
        assert_eq!(node.mode(), SimpleMode::ScopeLines);

        let commands = render(&mut node, &features());
        assert_eq!(commands.len(), 15);
        assert!(matches!(
            commands[0],
            DrawCommand::Line { color: Argb(0xFFFF_0000), .. }
        ));

        node.params_mut().set("mode", ParamValue::Int(0)).unwrap();
        let commands = render(&mut node, &features());
        assert_eq!(commands.len(), 32);
        assert_eq!(commands[0].kind(), "rect");
    }

    #[test]
    fn test_superscope_from_scope() {
        let mut scope = Scope::new("wave", ScopeSource::Phoenix);
        scope.point_code = Some("x=i*2-1; y=v*0.5;".to_string());
        let mut node = Superscope::from_scope(&scope);
        assert_eq!(node.name(), "wave");
        assert_eq!(node.params().text("point"), Some("x=i*2-1; y=v*0.5;"));

        let commands = render(&mut node, &features());
        assert_eq!(commands.len(), 15);
    }

    #[test]
    fn test_convolution_rejects_bad_kernel() {
        let mut desc = EffectDescriptor::new(CONVOLUTION_ID, "Convolution", EffectCategory::Ape, 0);
        desc.parameters
            .insert("kernel".to_string(), ParamValue::IntArray(vec![1; 9]));
        assert!(Convolution::from_descriptor(&desc).is_err());

        desc.parameters
            .insert("kernel".to_string(), ParamValue::IntArray(vec![1; 49]));
        desc.parameters.insert("scale".to_string(), ParamValue::Int(49));
        let node = Convolution::from_descriptor(&desc).unwrap();
        assert_eq!(node.params().int("scale"), Some(49));
    }

    #[test]
    fn test_fallback_draws_one_circle() {
        let mut recorder = CommandRecorder::new();
        draw_fallback(&features(), &mut recorder, 100.0, 100.0, Argb::WHITE);
        match &recorder.commands()[0] {
            DrawCommand::Circle { radius, filled, .. } => {
                assert!((radius - 25.0).abs() < 1e-4);
                assert!(*filled);
            }
            other => panic!("expected circle, got {:?}", other),
        }
    }

    #[test]
    fn test_pass_through_keeps_params() {
        let mut desc = EffectDescriptor::new(999, "Effect_999", EffectCategory::Unknown, 3);
        desc.parameters
            .insert("raw".to_string(), ParamValue::IntArray(vec![1, 2, 3]));
        let mut node = PassThrough::from_descriptor(&desc);
        assert_eq!(node.avs_id(), Some(999));
        assert_eq!(node.params().len(), 1);
        assert!(render(&mut node, &features()).is_empty());
    }
}
