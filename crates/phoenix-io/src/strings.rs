//! Printable-ASCII recovery for binaries the structured decoder rejects

use crate::catalog::EffectCatalog;
use crate::error::{PresetError, Result};
use phoenix_core::{EffectDescriptor, ParamValue, PresetFileType, RawPayload, UnifiedPresetData};
use tracing::debug;

/// Shortest run of printable ASCII considered a string
pub const MIN_RUN_LEN: usize = 4;

/// Runs of printable ASCII (space to tilde, plus tab) at least
/// [`MIN_RUN_LEN`] long
pub fn ascii_runs(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| !(b == b'\t' || (0x20..=0x7E).contains(&b)))
        .filter(|run| run.len() >= MIN_RUN_LEN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

/// Scans binary input for effect names
#[derive(Debug, Clone)]
pub struct StringScanStrategy {
    catalog: EffectCatalog,
}

impl StringScanStrategy {
    /// Strategy matching against `catalog`
    pub fn new(catalog: EffectCatalog) -> Self {
        Self { catalog }
    }

    /// One descriptor per keyword hit, in the order the strings appear
    pub fn scan(&self, bytes: &[u8]) -> Result<UnifiedPresetData> {
        let mut preset = UnifiedPresetData::default();
        for run in ascii_runs(bytes) {
            for entry in self.catalog.match_keywords(&run) {
                let order = preset.effects.len();
                let mut effect =
                    EffectDescriptor::new(entry.id, entry.name.clone(), entry.category, order);
                effect
                    .parameters
                    .insert("recovered_from".to_string(), ParamValue::Text(run.clone()));
                preset.effects.push(effect);
            }
        }
        if preset.effects.is_empty() {
            return Err(PresetError::Empty);
        }
        debug!("Recovered {} effects from ASCII strings", preset.effects.len());
        preset.file_type = PresetFileType::LegacyBinary;
        preset.raw = RawPayload::Binary(bytes.to_vec());
        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_runs() {
        let runs = ascii_runs(b"\x00\x01abc\x00Movement\xff\x02hello world\x00");
        assert_eq!(runs, vec!["Movement".to_string(), "hello world".to_string()]);
    }

    #[test]
    fn test_scan_matches_catalog_names() {
        let strategy = StringScanStrategy::new(EffectCatalog::builtin());
        let preset = strategy
            .scan(b"\x00\x00Trans / Water Bump\x00\x10\x00Render / Starfield\x00")
            .unwrap();
        let ids: Vec<i32> = preset.effects.iter().map(|e| e.type_id).collect();
        // "water bump" also contains "water"
        assert_eq!(ids, vec![20, 31, 27]);
        assert_eq!(preset.effects[2].order, 2);
    }

    #[test]
    fn test_scan_without_hits() {
        let strategy = StringScanStrategy::new(EffectCatalog::builtin());
        assert!(matches!(
            strategy.scan(&[0u8, 1, 2, 3, 4]),
            Err(PresetError::Empty)
        ));
    }
}
