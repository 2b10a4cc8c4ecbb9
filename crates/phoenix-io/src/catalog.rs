//! Effect id table
//!
//! Maps numeric effect ids found in legacy binary presets to names and
//! categories. The table is built explicitly by [`EffectCatalog::builtin`];
//! callers can extend it with [`EffectCatalog::register`].

use phoenix_core::EffectCategory;
use serde::Serialize;
use std::collections::BTreeMap;

/// First id used by plug-in (APE) effects
pub const APE_ID_BASE: i32 = 16384;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Effect id
    pub id: i32,
    /// Display name
    pub name: String,
    /// Category
    pub category: EffectCategory,
    /// Lowercase phrases used to spot the effect in recovered strings
    pub keywords: Vec<String>,
}

/// Lookup table from effect id to name and category
#[derive(Debug, Clone, Default)]
pub struct EffectCatalog {
    entries: BTreeMap<i32, CatalogEntry>,
}

// (id, category, name, extra keywords)
const BUILTIN: &[(i32, EffectCategory, &str, &[&str])] = &[
    (0, EffectCategory::Render, "Simple", &["simple spectrum"]),
    (1, EffectCategory::Render, "Dot Plane", &[]),
    (2, EffectCategory::Render, "Oscilloscope Star", &["oscilliscope star"]),
    (3, EffectCategory::Trans, "Fadeout", &[]),
    (4, EffectCategory::Trans, "Blitter Feedback", &[]),
    (5, EffectCategory::Render, "OnBeat Clear", &[]),
    (6, EffectCategory::Trans, "Blur", &[]),
    (7, EffectCategory::Render, "Bass Spin", &[]),
    (8, EffectCategory::Render, "Moving Particle", &[]),
    (9, EffectCategory::Trans, "Roto Blitter", &[]),
    (10, EffectCategory::Render, "SVP Loader", &[]),
    (11, EffectCategory::Trans, "Colorfade", &[]),
    (12, EffectCategory::Trans, "Color Clip", &[]),
    (13, EffectCategory::Render, "Rotating Stars", &[]),
    (14, EffectCategory::Render, "Ring", &[]),
    (15, EffectCategory::Trans, "Movement", &[]),
    (16, EffectCategory::Trans, "Scatter", &[]),
    (17, EffectCategory::Render, "Dot Grid", &[]),
    (18, EffectCategory::Misc, "Buffer Save", &[]),
    (19, EffectCategory::Render, "Dot Fountain", &[]),
    (20, EffectCategory::Trans, "Water", &[]),
    (21, EffectCategory::Misc, "Comment", &[]),
    (22, EffectCategory::Trans, "Brightness", &[]),
    (23, EffectCategory::Trans, "Interleave", &[]),
    (24, EffectCategory::Trans, "Grain", &[]),
    (25, EffectCategory::Render, "Clear Screen", &[]),
    (26, EffectCategory::Trans, "Mirror", &[]),
    (27, EffectCategory::Render, "Starfield", &[]),
    (28, EffectCategory::Render, "Text", &[]),
    (29, EffectCategory::Trans, "Bump", &[]),
    (30, EffectCategory::Trans, "Mosaic", &[]),
    (31, EffectCategory::Trans, "Water Bump", &[]),
    (32, EffectCategory::Render, "AVI", &[]),
    (33, EffectCategory::Misc, "Custom BPM", &[]),
    (34, EffectCategory::Render, "Picture", &[]),
    (35, EffectCategory::Trans, "Dynamic Distance Modifier", &[]),
    (36, EffectCategory::Render, "SuperScope", &["superscope"]),
    (37, EffectCategory::Trans, "Invert", &[]),
    (38, EffectCategory::Trans, "Unique Tone", &[]),
    (39, EffectCategory::Render, "Timescope", &[]),
    (40, EffectCategory::Misc, "Set Render Mode", &[]),
    (41, EffectCategory::Trans, "Interferences", &[]),
    (42, EffectCategory::Trans, "Dynamic Shift", &[]),
    (43, EffectCategory::Trans, "Dynamic Movement", &[]),
    (44, EffectCategory::Trans, "Fast Brightness", &[]),
    (45, EffectCategory::Trans, "Color Modifier", &[]),
    (APE_ID_BASE, EffectCategory::Ape, "Convolution Filter", &["convolution"]),
];

// Names that are too generic to identify an effect inside arbitrary strings
const MIN_KEYWORD_LEN: usize = 5;

impl EffectCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Classic built-in effects plus the Convolution Filter APE
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for &(id, category, name, extra) in BUILTIN {
            let mut keywords: Vec<String> = extra.iter().map(|k| k.to_string()).collect();
            let lower = name.to_lowercase();
            if lower.len() >= MIN_KEYWORD_LEN && !keywords.contains(&lower) {
                keywords.push(lower);
            }
            catalog.register(CatalogEntry {
                id,
                name: name.to_string(),
                category,
                keywords,
            });
        }
        catalog
    }

    /// Add or replace an entry
    pub fn register(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id, entry);
    }

    /// Look up an id
    pub fn get(&self, id: i32) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    /// Catalog name, or `Effect_<id>` for unknown ids
    pub fn name_for(&self, id: i32) -> String {
        self.get(id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("Effect_{}", id))
    }

    /// Catalog category; unknown plug-in range ids are `Ape`
    pub fn category_for(&self, id: i32) -> EffectCategory {
        match self.get(id) {
            Some(entry) => entry.category,
            None if id >= APE_ID_BASE => EffectCategory::Ape,
            None => EffectCategory::Unknown,
        }
    }

    /// Entries whose keywords occur in `text` (case-insensitive), in id order
    pub fn match_keywords(&self, text: &str) -> Vec<&CatalogEntry> {
        let lower = text.to_lowercase();
        self.entries
            .values()
            .filter(|e| e.keywords.iter().any(|k| lower.contains(k.as_str())))
            .collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let catalog = EffectCatalog::builtin();
        assert_eq!(catalog.len(), 47);
        assert_eq!(catalog.name_for(36), "SuperScope");
        assert_eq!(catalog.category_for(15), EffectCategory::Trans);
        assert_eq!(catalog.category_for(APE_ID_BASE), EffectCategory::Ape);
    }

    #[test]
    fn test_unknown_ids() {
        let catalog = EffectCatalog::builtin();
        assert_eq!(catalog.name_for(999), "Effect_999");
        assert_eq!(catalog.category_for(999), EffectCategory::Unknown);
        assert_eq!(catalog.category_for(20000), EffectCategory::Ape);
    }

    #[test]
    fn test_keyword_match() {
        let catalog = EffectCatalog::builtin();
        let ids: Vec<i32> = catalog
            .match_keywords("Render / SuperScope v2")
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![36]);
        // Short names never match on their own
        assert!(catalog.match_keywords("ring text blur").is_empty());
    }
}
