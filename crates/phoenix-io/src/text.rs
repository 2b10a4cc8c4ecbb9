//! Line-oriented text preset scanner

use crate::error::{PresetError, Result};
use crate::superscope::{validate_scope, ClaimedLines, ScopeExtractor};
use phoenix_core::{PresetFileType, RawPayload, Scope, ScopeSource, UnifiedPresetData};
use regex::Regex;
use tracing::{debug, trace};

/// Share of control characters above which decoded text is rejected
const MAX_CONTROL_RATIO: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Init,
    Frame,
    Point,
    Beat,
}

impl Region {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "init" => Some(Self::Init),
            "frame" => Some(Self::Frame),
            "point" => Some(Self::Point),
            "beat" => Some(Self::Beat),
            _ => None,
        }
    }

    fn slot(self, scope: &mut Scope) -> &mut Option<String> {
        match self {
            Self::Init => &mut scope.init_code,
            Self::Frame => &mut scope.frame_code,
            Self::Point => &mut scope.point_code,
            Self::Beat => &mut scope.beat_code,
        }
    }
}

// Scanner state for one pass over the text
struct Scan {
    preset: UnifiedPresetData,
    current: Option<Scope>,
    region: Option<Region>,
    unnamed: usize,
    claimed: ClaimedLines,
}

impl Scan {
    fn start_scope(&mut self, name: String) {
        self.flush();
        self.current = Some(Scope::new(name, ScopeSource::Phoenix));
        self.region = None;
    }

    fn enter_region(&mut self, region: Region) {
        if self.current.is_none() {
            self.unnamed += 1;
            self.current = Some(Scope::new(
                format!("scope_{}", self.unnamed),
                ScopeSource::Phoenix,
            ));
        }
        self.region = Some(region);
    }

    fn append(&mut self, index: usize, line: &str) {
        let (Some(region), Some(scope)) = (self.region, self.current.as_mut()) else {
            return;
        };
        let code = region.slot(scope).get_or_insert_with(String::new);
        if !code.is_empty() {
            code.push('\n');
        }
        code.push_str(line);
        self.claimed.insert(index);
    }

    fn flush(&mut self) {
        if let Some(mut scope) = self.current.take() {
            validate_scope(&mut scope);
            let name = scope.name.clone();
            if !self.preset.push_scope(scope) {
                debug!("Dropped scope '{}' (no code or duplicate name)", name);
            }
        }
        self.region = None;
    }
}

/// Text parse strategy: section scan followed by superscope extraction
#[derive(Debug, Clone)]
pub struct TextStrategy {
    scope_name: Regex,
    key_value: Regex,
    extractor: ScopeExtractor,
}

impl TextStrategy {
    /// Compile the line patterns
    pub fn new() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            scope_name: Regex::new(r"(?i)^sn\s*=\s*superscope\((.*)\)\s*$")?,
            key_value: Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\s*=\s*(.*)$")?,
            extractor: ScopeExtractor::new()?,
        })
    }

    /// Parse decoded text. Fails only when the text is mostly control
    /// characters.
    pub fn parse_text(&self, text: &str) -> Result<UnifiedPresetData> {
        if control_ratio(text) > MAX_CONTROL_RATIO {
            return Err(PresetError::NotText);
        }

        let mut scan = Scan {
            preset: UnifiedPresetData::default(),
            current: None,
            region: None,
            unnamed: 0,
            claimed: ClaimedLines::new(),
        };
        let mut structured = false;

        for (index, line) in text.lines().enumerate() {
            let content = line.trim_end();
            let trimmed = content.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }

            if let Some(caps) = self.scope_name.captures(trimmed) {
                structured = true;
                let name = caps[1].trim().trim_matches('"').to_string();
                let same = scan.current.as_ref().is_some_and(|s| s.name == name);
                if same {
                    scan.region = None;
                } else {
                    scan.start_scope(name);
                }
                continue;
            }

            if let Some(header) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                structured = true;
                if let Some(region) = Region::from_name(header) {
                    scan.enter_region(region);
                } else if header.to_ascii_lowercase().starts_with("preset") {
                    scan.start_scope(header.trim().to_string());
                } else {
                    trace!("Section [{}]", header);
                    scan.region = None;
                }
                continue;
            }

            if let Some((label, rest)) = trimmed.split_once(':') {
                if let Some(region) = Region::from_name(label) {
                    structured = true;
                    scan.enter_region(region);
                    if !rest.trim().is_empty() {
                        scan.append(index, rest.trim());
                    }
                    continue;
                }
            }

            if scan.region.is_some() {
                scan.append(index, content);
                continue;
            }

            if let Some(caps) = self.key_value.captures(trimmed) {
                scan.preset
                    .metadata
                    .push((caps[1].to_string(), caps[2].trim().to_string()));
            }
        }
        scan.flush();

        let mut preset = scan.preset;
        let recovered = self.extractor.extract_skipping(text, &mut preset, scan.claimed);
        if recovered > 0 {
            debug!("Recovered {} scopes from free-form text", recovered);
        }

        preset.file_type = if structured {
            PresetFileType::StructuredText
        } else {
            PresetFileType::PlainText
        };
        preset.raw = RawPayload::Text(text.to_string());
        Ok(preset)
    }
}

fn control_ratio(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    control as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> UnifiedPresetData {
        TextStrategy::new().unwrap().parse_text(text).unwrap()
    }

    #[test]
    fn test_sections_and_labels() {
        let preset = parse(
            "[preset Wave]\n[init]\nn=100;\n[frame]\nt=t+0.05;\n[point]\nx=i*2-1;\ny=sin(i*8+t)*0.5;\n",
        );
        assert_eq!(preset.file_type, PresetFileType::StructuredText);
        let scope = preset.scope("preset Wave").unwrap();
        assert_eq!(scope.init_code.as_deref(), Some("n=100;"));
        assert_eq!(scope.frame_code.as_deref(), Some("t=t+0.05;"));
        assert_eq!(scope.point_code.as_deref(), Some("x=i*2-1;\ny=sin(i*8+t)*0.5;"));
        assert!(scope.valid);
    }

    #[test]
    fn test_same_name_does_not_flush() {
        let preset = parse(
            "sn=Superscope(A)\nFRAME: t=t+0.1;\nsn=Superscope(A)\nPOINT:\ny=cos(t);\n",
        );
        assert_eq!(preset.scopes.len(), 1);
        let scope = &preset.scopes[0];
        assert_eq!(scope.frame_code.as_deref(), Some("t=t+0.1;"));
        assert_eq!(scope.point_code.as_deref(), Some("y=cos(t);"));
    }

    #[test]
    fn test_inline_label_code_is_not_recovered_again() {
        let preset = parse("sn=Superscope(Wave)\nPOINT: y=sin(i*8)*v;\n");
        let names: Vec<&str> = preset.scopes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Wave"]);
        assert_eq!(preset.scopes[0].point_code.as_deref(), Some("y=sin(i*8)*v;"));
    }

    #[test]
    fn test_metadata_and_comments() {
        let preset = parse("; header comment\n# another\nauthor = someone\nversion=2\n");
        assert_eq!(preset.metadata_value("author"), Some("someone"));
        assert_eq!(preset.metadata_value("VERSION"), Some("2"));
        assert!(preset.scopes.is_empty());
        assert_eq!(preset.file_type, PresetFileType::PlainText);
    }

    #[test]
    fn test_code_lines_are_not_metadata() {
        let preset = parse("sn=Superscope(S)\nFRAME:\nx=sin(t);\n");
        assert!(preset.metadata.is_empty());
        assert_eq!(preset.scopes[0].frame_code.as_deref(), Some("x=sin(t);"));
    }

    #[test]
    fn test_codeless_scope_discarded() {
        let preset = parse("sn=Superscope(Empty)\nsn=Superscope(Full)\nBEAT:\nr=abs(v);\n");
        assert_eq!(preset.scopes.len(), 1);
        assert_eq!(preset.scopes[0].name, "Full");
    }

    #[test]
    fn test_invalid_scope_kept_with_reason() {
        let preset = parse("sn=Superscope(Flat)\nPOINT:\nx=i; y=v;\n");
        let scope = preset.scope("Flat").unwrap();
        assert!(!scope.valid);
        assert!(scope.invalid_reason.is_some());
    }

    #[test]
    fn test_rejects_control_heavy_text() {
        let text: String = std::iter::repeat('\u{1}').take(50).collect();
        assert!(matches!(
            TextStrategy::new().unwrap().parse_text(&text),
            Err(PresetError::NotText)
        ));
    }
}
