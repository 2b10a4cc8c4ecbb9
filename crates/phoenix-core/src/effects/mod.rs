//! Effect nodes
//!
//! Every effect, whatever its legacy type id, is driven through the single
//! [`EffectNode`] trait. Parameters are kept in a typed, range-checked table
//! so hosts can edit them without knowing the concrete node type.

pub mod nodes;
pub mod registry;

use crate::audio::AudioFeatures;
use crate::draw::DrawSink;
use crate::preset::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use nodes::{
    draw_fallback, ClearScreen, Comment, Convolution, PassThrough, Ring, SimpleSpectrum,
    Superscope, TextOverlay,
};
pub use registry::{EffectFactory, EffectRegistry};

/// Default port name used to chain effects
pub const IMAGE_PORT: &str = "image";

/// Effect-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    /// Per-frame rendering failed
    #[error("Render failed: {0}")]
    Render(String),

    /// A parameter was rejected
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Value type of an effect parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Integer
    Int,
    /// Float
    Float,
    /// Flag
    Bool,
    /// ARGB color
    Color,
    /// Text or code
    Text,
    /// Integer list
    IntArray,
    /// Color list
    ColorArray,
}

impl ParamKind {
    /// Kind of an existing value
    pub fn of(value: &ParamValue) -> Self {
        match value {
            ParamValue::Int(_) => Self::Int,
            ParamValue::Float(_) => Self::Float,
            ParamValue::Bool(_) => Self::Bool,
            ParamValue::Color(_) => Self::Color,
            ParamValue::Text(_) => Self::Text,
            ParamValue::IntArray(_) => Self::IntArray,
            ParamValue::ColorArray(_) => Self::ColorArray,
        }
    }
}

/// One editable effect parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParam {
    /// Value type
    pub kind: ParamKind,
    /// Current value
    pub value: ParamValue,
    /// Lower bound for numeric values
    pub min: Option<f32>,
    /// Upper bound for numeric values
    pub max: Option<f32>,
}

impl EffectParam {
    /// Unbounded parameter
    pub fn new(value: ParamValue) -> Self {
        Self {
            kind: ParamKind::of(&value),
            value,
            min: None,
            max: None,
        }
    }

    /// Numeric parameter limited to `min..=max`
    pub fn ranged(value: ParamValue, min: f32, max: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::new(value)
        }
    }

    fn check(&self, name: &str, value: &ParamValue) -> Result<(), EffectError> {
        let invalid = |reason: String| EffectError::InvalidParameter {
            name: name.to_string(),
            reason,
        };

        if ParamKind::of(value) != self.kind {
            return Err(invalid(format!(
                "expected {:?}, got {:?}",
                self.kind,
                ParamKind::of(value)
            )));
        }

        if let Some(v) = value.as_float() {
            if !v.is_finite() {
                return Err(invalid("value is not finite".to_string()));
            }
            if let Some(min) = self.min.filter(|&min| v < min) {
                return Err(invalid(format!("{} is below minimum {}", v, min)));
            }
            if let Some(max) = self.max.filter(|&max| v > max) {
                return Err(invalid(format!("{} is above maximum {}", v, max)));
            }
        }
        Ok(())
    }
}

/// Named parameter table of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    params: HashMap<String, EffectParam>,
}

impl EffectParams {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter, replacing any previous declaration
    pub fn declare(&mut self, name: impl Into<String>, param: EffectParam) {
        self.params.insert(name.into(), param);
    }

    /// Builder form of [`EffectParams::declare`]
    pub fn with(mut self, name: impl Into<String>, param: EffectParam) -> Self {
        self.declare(name, param);
        self
    }

    /// Set a declared parameter, validating type and range
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), EffectError> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| EffectError::InvalidParameter {
                name: name.to_string(),
                reason: "unknown parameter".to_string(),
            })?;
        param.check(name, &value)?;
        param.value = value;
        Ok(())
    }

    /// Look up a parameter
    pub fn get(&self, name: &str) -> Option<&EffectParam> {
        self.params.get(name)
    }

    /// Float value, with integers widened
    pub fn float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|p| p.value.as_float())
    }

    /// Integer value
    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name).map(|p| &p.value) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Flag value
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name).map(|p| &p.value) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Color value
    pub fn color(&self, name: &str) -> Option<u32> {
        match self.get(name).map(|p| &p.value) {
            Some(ParamValue::Color(v)) => Some(*v),
            _ => None,
        }
    }

    /// Text value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|p| p.value.as_text())
    }

    /// Color list
    pub fn colors(&self, name: &str) -> Option<&[u32]> {
        match self.get(name).map(|p| &p.value) {
            Some(ParamValue::ColorArray(v)) => Some(v),
            _ => None,
        }
    }

    /// Parameter names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.params.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// No parameters declared
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Per-frame render context handed to every node
pub struct RenderContext<'a> {
    /// Audio snapshot for this frame
    pub features: &'a AudioFeatures,
    /// Output surface
    pub sink: &'a mut dyn DrawSink,
    /// Canvas width in pixels
    pub width: f32,
    /// Canvas height in pixels
    pub height: f32,
    /// Frame counter of the owning graph
    pub frame: u64,
}

/// Polymorphic effect node
pub trait EffectNode: Send {
    /// Display name
    fn name(&self) -> &str;

    /// Legacy type id this node was created for
    fn avs_id(&self) -> Option<i32> {
        None
    }

    /// Parameter table
    fn params(&self) -> &EffectParams;

    /// Mutable parameter table
    fn params_mut(&mut self) -> &mut EffectParams;

    /// Input port names
    fn inputs(&self) -> &'static [&'static str] {
        &[IMAGE_PORT]
    }

    /// Output port names
    fn outputs(&self) -> &'static [&'static str] {
        &[IMAGE_PORT]
    }

    /// Draw one frame
    fn render(
        &mut self,
        waveform: &[f32],
        spectrum: &[f32],
        ctx: &mut RenderContext<'_>,
    ) -> Result<(), EffectError>;

    /// Drop per-run state (called when the node is (re)activated)
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_range_validation() {
        let mut params = EffectParams::new()
            .with("size", EffectParam::ranged(ParamValue::Float(0.5), 0.0, 1.0))
            .with("label", EffectParam::new(ParamValue::Text("hi".into())));

        assert!(params.set("size", ParamValue::Float(0.8)).is_ok());
        assert_eq!(params.float("size"), Some(0.8));

        let err = params.set("size", ParamValue::Float(2.0)).unwrap_err();
        assert!(matches!(err, EffectError::InvalidParameter { ref name, .. } if name == "size"));
        assert_eq!(params.float("size"), Some(0.8), "rejected value must not stick");

        assert!(params.set("size", ParamValue::Text("x".into())).is_err());
        assert!(params.set("missing", ParamValue::Int(1)).is_err());
        assert_eq!(params.names(), vec!["label", "size"]);
    }
}
