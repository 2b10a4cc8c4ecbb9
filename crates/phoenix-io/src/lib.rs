//! Phoenix IO - preset file loading and parsing
//!
//! Reads preset files of any supported format and turns them into the
//! format-agnostic [`phoenix_core::UnifiedPresetData`]:
//!
//! - [`PresetFormatDetector`] sniffs legacy binary, structured text and plain
//!   text inputs
//! - [`PresetParser`] runs the matching strategy chain (binary records,
//!   ASCII string recovery, line-oriented text) and never fails on content
//! - [`ScopeExtractor`] recovers superscope definitions from free-form text
//! - [`PresetLoader`] parses on a worker thread

#![warn(missing_docs)]

pub mod binary;
pub mod catalog;
pub mod detect;
pub mod error;
pub mod loader;
pub mod parser;
pub mod raw;
mod reader;
pub mod strings;
pub mod superscope;
pub mod text;

pub use binary::BinaryStrategy;
pub use catalog::{CatalogEntry, EffectCatalog};
pub use detect::PresetFormatDetector;
pub use error::{PresetError, Result};
pub use loader::PresetLoader;
pub use parser::{ParseStrategy, PresetParser};
pub use raw::RawPresetBytes;
pub use strings::StringScanStrategy;
pub use superscope::{validate_code, ScopeExtractor};
pub use text::TextStrategy;
