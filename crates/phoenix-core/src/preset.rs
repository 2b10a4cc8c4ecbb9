//! Preset data model
//!
//! `UnifiedPresetData` is the only artifact the preset parser produces. It is
//! format-agnostic: binary and text presets both end up as an ordered list of
//! scopes plus an ordered list of effect descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classified preset file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresetFileType {
    /// Nothing recognizable
    #[default]
    Unknown,
    /// Legacy binary effect-chain container
    LegacyBinary,
    /// Text with section markers
    StructuredText,
    /// Any other text
    PlainText,
}

impl fmt::Display for PresetFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::LegacyBinary => "legacy binary",
            Self::StructuredText => "structured text",
            Self::PlainText => "plain text",
        };
        f.write_str(name)
    }
}

/// Result of sniffing raw preset bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected format
    pub file_type: PresetFileType,
    /// Detector confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Markers found, in detection order
    pub markers: Vec<String>,
    /// Optional explanation
    pub note: Option<String>,
}

impl DetectionResult {
    /// Create a result without markers
    pub fn new(file_type: PresetFileType, confidence: f32) -> Self {
        Self {
            file_type,
            confidence: confidence.clamp(0.0, 1.0),
            markers: Vec::new(),
            note: None,
        }
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Where a scope was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScopeSource {
    /// Structured text sections (`sn=Superscope(...)`, `[preset]`)
    Phoenix,
    /// Embedded in a legacy binary effect record
    Legacy,
    /// Freeform pattern or heuristic recovery
    #[default]
    Generic,
}

/// Named unit of preset code ("superscope")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Unique name within the preset
    pub name: String,
    /// Runs once when the scope is loaded
    pub init_code: Option<String>,
    /// Runs once per frame
    pub frame_code: Option<String>,
    /// Runs once per point
    pub point_code: Option<String>,
    /// Runs on each detected beat
    pub beat_code: Option<String>,
    /// Origin of this scope
    pub source: ScopeSource,
    /// False for low-confidence recoveries
    pub valid: bool,
    /// Why the scope was marked invalid
    pub invalid_reason: Option<String>,
}

impl Scope {
    /// Create an empty, valid scope
    pub fn new(name: impl Into<String>, source: ScopeSource) -> Self {
        Self {
            name: name.into(),
            source,
            valid: true,
            ..Default::default()
        }
    }

    /// Mark the scope as low-confidence
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        self.valid = false;
        self.invalid_reason = Some(reason.into());
    }

    fn sections(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("init", self.init_code.as_deref()),
            ("frame", self.frame_code.as_deref()),
            ("point", self.point_code.as_deref()),
            ("beat", self.beat_code.as_deref()),
        ]
    }

    /// At least one code section has non-whitespace content
    pub fn has_code(&self) -> bool {
        self.sections()
            .iter()
            .any(|(_, code)| code.is_some_and(|c| !c.trim().is_empty()))
    }

    /// All non-empty sections joined for fallback evaluation
    pub fn combined_code(&self) -> String {
        self.sections()
            .iter()
            .filter_map(|(label, code)| {
                code.filter(|c| !c.trim().is_empty())
                    .map(|c| format!("// {}\n{}", label, c.trim_end()))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Effect category, derived from the type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectCategory {
    /// Draws new content
    Render,
    /// Transforms existing content
    Trans,
    /// Control and utility effects
    Misc,
    /// Plug-in (APE) effects
    Ape,
    /// Not in the catalog
    #[default]
    Unknown,
}

/// Decoded effect parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// Flag
    Bool(bool),
    /// Packed 0xAARRGGBB color
    Color(u32),
    /// Text or code
    Text(String),
    /// Raw integers
    IntArray(Vec<i32>),
    /// Packed colors
    ColorArray(Vec<u32>),
}

impl ParamValue {
    /// Integer view of the value, if it has one
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(*b as i32),
            Self::Color(c) => Some(*c as i32),
            _ => None,
        }
    }

    /// Float view of the value, if it has one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One record of a preset's effect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Numeric type id as stored in the file
    pub type_id: i32,
    /// Human-readable name (`Effect_<id>` when unknown)
    pub name: String,
    /// Category derived from the id
    pub category: EffectCategory,
    /// Undecoded configuration bytes
    #[serde(skip)]
    pub raw_config: Vec<u8>,
    /// Decoded parameters
    pub parameters: BTreeMap<String, ParamValue>,
    /// Position in the source effect chain
    pub order: usize,
}

impl EffectDescriptor {
    /// Create a descriptor without parameters
    pub fn new(type_id: i32, name: impl Into<String>, category: EffectCategory, order: usize) -> Self {
        Self {
            type_id,
            name: name.into(),
            category,
            raw_config: Vec::new(),
            parameters: BTreeMap::new(),
            order,
        }
    }

    /// Look up a parameter
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }
}

/// Original input kept for diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawPayload {
    /// Nothing retained
    #[default]
    None,
    /// Decoded text
    Text(String),
    /// Binary bytes
    Binary(Vec<u8>),
}

/// Parsed preset, independent of its file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPresetData {
    /// Format the parser settled on
    pub file_type: PresetFileType,
    /// Scopes in source order, unique by name
    pub scopes: Vec<Scope>,
    /// Effects in source order
    pub effects: Vec<EffectDescriptor>,
    /// Detector verdict for the input
    pub detection: DetectionResult,
    /// `key=value` metadata in source order
    pub metadata: Vec<(String, String)>,
    /// Original input
    #[serde(skip)]
    pub raw: RawPayload,
}

impl UnifiedPresetData {
    /// An empty preset for the given detection verdict
    pub fn empty(detection: DetectionResult) -> Self {
        Self {
            file_type: detection.file_type,
            detection,
            ..Default::default()
        }
    }

    /// Add a scope. Scopes without code are discarded and duplicate names
    /// keep the first occurrence. Returns true when the scope was added.
    pub fn push_scope(&mut self, scope: Scope) -> bool {
        if !scope.has_code() {
            return false;
        }
        if self.scopes.iter().any(|s| s.name == scope.name) {
            return false;
        }
        self.scopes.push(scope);
        true
    }

    /// Look up a scope by name
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Look up a metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Nothing was recovered
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty() && self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_scope_dedupes_first_wins() {
        let mut preset = UnifiedPresetData::default();
        let mut first = Scope::new("a", ScopeSource::Phoenix);
        first.frame_code = Some("t=t+0.1;".to_string());
        let mut second = Scope::new("a", ScopeSource::Generic);
        second.point_code = Some("x=sin(i);".to_string());

        assert!(preset.push_scope(first));
        assert!(!preset.push_scope(second));
        assert_eq!(preset.scopes.len(), 1);
        assert_eq!(preset.scopes[0].source, ScopeSource::Phoenix);
    }

    #[test]
    fn test_push_scope_discards_empty() {
        let mut preset = UnifiedPresetData::default();
        let mut scope = Scope::new("blank", ScopeSource::Phoenix);
        scope.init_code = Some("   \n".to_string());
        assert!(!preset.push_scope(scope));
        assert!(preset.is_empty());
    }

    #[test]
    fn test_combined_code() {
        let mut scope = Scope::new("s", ScopeSource::Legacy);
        scope.init_code = Some("n=100;".to_string());
        scope.point_code = Some("x=sin(i);\n".to_string());
        assert_eq!(scope.combined_code(), "// init\nn=100;\n// point\nx=sin(i);");
    }
}
