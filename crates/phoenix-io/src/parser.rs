//! Preset parsing with strategy fallback
//!
//! The detector picks a strategy chain; the first strategy that succeeds
//! wins. Parsing itself never fails: when every strategy gives up the result
//! is an empty preset carrying the detection verdict.

use crate::binary::BinaryStrategy;
use crate::catalog::EffectCatalog;
use crate::detect::PresetFormatDetector;
use crate::error::Result;
use crate::raw::RawPresetBytes;
use crate::strings::StringScanStrategy;
use crate::text::TextStrategy;
use phoenix_core::{PresetFileType, RawPayload, UnifiedPresetData};
use std::path::Path;
use tracing::{debug, info, warn};

/// One way of turning raw bytes into a preset
pub trait ParseStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Attempt a parse
    fn parse(&self, raw: &RawPresetBytes) -> Result<UnifiedPresetData>;
}

impl ParseStrategy for BinaryStrategy {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn parse(&self, raw: &RawPresetBytes) -> Result<UnifiedPresetData> {
        self.decode(&raw.bytes)
    }
}

impl ParseStrategy for StringScanStrategy {
    fn name(&self) -> &'static str {
        "ascii-strings"
    }

    fn parse(&self, raw: &RawPresetBytes) -> Result<UnifiedPresetData> {
        self.scan(&raw.bytes)
    }
}

impl ParseStrategy for TextStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, raw: &RawPresetBytes) -> Result<UnifiedPresetData> {
        self.parse_text(&raw.decode_text())
    }
}

/// Format-agnostic preset parser
pub struct PresetParser {
    detector: PresetFormatDetector,
    binary: BinaryStrategy,
    strings: StringScanStrategy,
    text: TextStrategy,
}

impl std::fmt::Debug for PresetParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresetParser")
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

impl PresetParser {
    /// Parser using `catalog` for effect names
    pub fn new(catalog: EffectCatalog) -> Result<Self> {
        Ok(Self {
            detector: PresetFormatDetector::default(),
            binary: BinaryStrategy::new(catalog.clone()),
            strings: StringScanStrategy::new(catalog),
            text: TextStrategy::new()?,
        })
    }

    /// Parser with the built-in effect catalog
    pub fn with_builtin_catalog() -> Result<Self> {
        Self::new(EffectCatalog::builtin())
    }

    /// Replace the format detector
    pub fn with_detector(mut self, detector: PresetFormatDetector) -> Self {
        self.detector = detector;
        self
    }

    /// The active detector
    pub fn detector(&self) -> &PresetFormatDetector {
        &self.detector
    }

    fn chain(&self, file_type: PresetFileType) -> Vec<&dyn ParseStrategy> {
        match file_type {
            PresetFileType::LegacyBinary => {
                vec![&self.binary as &dyn ParseStrategy, &self.strings, &self.text]
            }
            _ => vec![&self.text as &dyn ParseStrategy],
        }
    }

    /// Parse raw preset bytes
    pub fn parse(&self, raw: &RawPresetBytes) -> UnifiedPresetData {
        let detection = self.detector.detect(&raw.bytes);
        if raw.is_empty() {
            return UnifiedPresetData::empty(detection);
        }

        for strategy in self.chain(detection.file_type) {
            match strategy.parse(raw) {
                Ok(mut preset) => {
                    info!(
                        "Parsed preset with {} strategy: {} effects, {} scopes",
                        strategy.name(),
                        preset.effects.len(),
                        preset.scopes.len()
                    );
                    preset.detection = detection;
                    return preset;
                }
                Err(err) => debug!("{} strategy failed: {}", strategy.name(), err),
            }
        }

        warn!("No strategy could parse the preset; using an empty one");
        let mut preset = UnifiedPresetData::empty(detection);
        preset.raw = RawPayload::Binary(raw.bytes.clone());
        preset
    }

    /// Parse in-memory bytes
    pub fn parse_bytes(&self, bytes: &[u8]) -> UnifiedPresetData {
        self.parse(&RawPresetBytes::from_bytes(bytes))
    }

    /// Read and parse a file. Only file-system and size errors are returned.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<UnifiedPresetData> {
        let raw = RawPresetBytes::read(path)?;
        Ok(self.parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PresetParser {
        PresetParser::with_builtin_catalog().unwrap()
    }

    #[test]
    fn test_empty_input() {
        let preset = parser().parse_bytes(b"");
        assert!(preset.is_empty());
        assert_eq!(preset.file_type, PresetFileType::Unknown);
    }

    #[test]
    fn test_text_route() {
        let preset = parser().parse_bytes(b"sn=Superscope(S)\nPOINT:\ny=sin(i);\n");
        assert_eq!(preset.file_type, PresetFileType::StructuredText);
        assert_eq!(preset.detection.file_type, PresetFileType::StructuredText);
        assert_eq!(preset.scopes.len(), 1);
    }

    #[test]
    fn test_undecodable_input_gives_empty_preset() {
        let preset = parser().parse_bytes(&[0u8, 1, 2, 3, 4, 5, 6, 7]);
        assert!(preset.is_empty());
    }
}
