//! Preset format sniffing

use crate::raw::{decode_text, printable_ratio};
use phoenix_core::{DetectionResult, PresetFileType};
use tracing::debug;

/// Signatures accepted in the first [`SIGNATURE_WINDOW`] bytes
pub const BINARY_SIGNATURES: &[&str] = &["Nullsoft AVS", "AVS Preset", "AVS_PRESET"];

/// Bytes inspected for a binary signature
pub const SIGNATURE_WINDOW: usize = 20;

/// Markers that identify structured text presets (lowercase)
pub const TEXT_MARKERS: &[&str] = &[
    "[avs]",
    "[preset",
    "[init]",
    "[frame]",
    "[point]",
    "[beat]",
    "init:",
    "frame:",
    "point:",
    "beat:",
    "sn=superscope(",
];

/// Share of text-like bytes below which input counts as undecodable
const MIN_PRINTABLE_RATIO: f32 = 0.85;

/// Classifies raw preset bytes. Never fails and has no side effects.
#[derive(Debug, Clone)]
pub struct PresetFormatDetector {
    /// Inputs larger than this that do not decode as text are treated as
    /// legacy binary even without a signature
    pub size_threshold: usize,
}

impl Default for PresetFormatDetector {
    fn default() -> Self {
        Self { size_threshold: 128 }
    }
}

impl PresetFormatDetector {
    /// Detector with the given size threshold
    pub fn new(size_threshold: usize) -> Self {
        Self { size_threshold }
    }

    /// Classify `bytes`
    pub fn detect(&self, bytes: &[u8]) -> DetectionResult {
        let result = self.classify(bytes);
        debug!(
            "Detected {} (confidence {:.2}, markers {:?})",
            result.file_type, result.confidence, result.markers
        );
        result
    }

    fn classify(&self, bytes: &[u8]) -> DetectionResult {
        if bytes.is_empty() {
            return DetectionResult::new(PresetFileType::Unknown, 0.0).with_note("empty input");
        }

        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(SIGNATURE_WINDOW)]);
        if let Some(sig) = BINARY_SIGNATURES.iter().find(|s| head.contains(*s)) {
            let mut result = DetectionResult::new(PresetFileType::LegacyBinary, 0.95);
            result.markers.push(sig.to_string());
            return result;
        }

        // The Latin-1 fallback decodes any byte, so only the byte mix decides
        if printable_ratio(bytes) < MIN_PRINTABLE_RATIO {
            if bytes.len() > self.size_threshold {
                return DetectionResult::new(PresetFileType::LegacyBinary, 0.6)
                    .with_note("large input that does not decode as text");
            }
            return DetectionResult::new(PresetFileType::Unknown, 0.1)
                .with_note("small input that does not decode as text");
        }

        let lower = decode_text(bytes).to_lowercase();
        let markers: Vec<String> = TEXT_MARKERS
            .iter()
            .filter(|m| lower.contains(*m))
            .map(|m| m.to_string())
            .collect();
        if markers.is_empty() {
            return DetectionResult::new(PresetFileType::PlainText, 0.3);
        }

        let confidence = (0.6 + 0.1 * markers.len() as f32).min(0.95);
        let mut result = DetectionResult::new(PresetFileType::StructuredText, confidence);
        result.markers = markers;
        result
    }
}
