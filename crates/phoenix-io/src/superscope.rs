//! Superscope recovery from free-form text
//!
//! Runs after the structured line scan and picks up scope definitions the
//! scanner cannot see: call-style declarations, commented assignments and,
//! as a last resort, blocks of lines that merely look like expression code.

use phoenix_core::{Scope, ScopeSource, UnifiedPresetData};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

/// Zero-based line indices, as yielded by [`str::lines`], already consumed
/// by a scope definition
pub type ClaimedLines = BTreeSet<usize>;

/// Math function tokens used by validation and the heuristic pass
pub const MATH_TOKENS: &[&str] = &[
    "sin(", "cos(", "tan(", "sqrt(", "pow(", "abs(", "log(", "exp(",
];

/// Additional functions accepted by validation
const EXTRA_MATH_FUNCTIONS: &[&str] = &[
    "asin(", "acos(", "atan(", "atan2(", "sqr(", "log10(", "min(", "max(", "floor(", "ceil(",
    "sign(", "sigmoid(", "rand(",
];

/// Shortest accepted scope code, after trimming
pub const MIN_CODE_LEN: usize = 5;

/// Reason attached to heuristically recovered scopes
pub const HEURISTIC_REASON: &str = "recovered heuristically from math expressions";

/// Why a scope's code was rejected
pub fn validate_code(code: &str) -> Result<(), String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err("code is empty".to_string());
    }
    if trimmed.len() < MIN_CODE_LEN {
        return Err(format!(
            "code is shorter than {} characters",
            MIN_CODE_LEN
        ));
    }
    let lower = trimmed.to_lowercase();
    let has_math = MATH_TOKENS
        .iter()
        .chain(EXTRA_MATH_FUNCTIONS)
        .any(|f| contains_call(&lower, f));
    if !has_math {
        return Err("code contains no recognized math function".to_string());
    }
    Ok(())
}

/// Validate every code region of a scope, marking it invalid on failure
pub fn validate_scope(scope: &mut Scope) {
    if !scope.valid {
        return;
    }
    let code: String = [
        &scope.init_code,
        &scope.frame_code,
        &scope.point_code,
        &scope.beat_code,
    ]
    .iter()
    .filter_map(|c| c.as_deref())
    .collect::<Vec<_>>()
    .join("\n");
    if let Err(reason) = validate_code(&code) {
        debug!("Scope '{}' invalid: {}", scope.name, reason);
        scope.invalidate(reason);
    }
}

// `f(` must not be the tail of a longer identifier ("asin(" is not "sin(")
fn contains_call(haystack: &str, func: &str) -> bool {
    haystack.match_indices(func).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
    })
}

/// Regex-based scope extraction passes
#[derive(Debug, Clone)]
pub struct ScopeExtractor {
    quoted: Regex,
    unquoted_start: Regex,
    commented: Regex,
}

impl ScopeExtractor {
    /// Compile the extraction patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            quoted: Regex::new(
                r#"(?i)superscope\(\s*"([^"]*)"\s*,\s*"((?:[^"\\]|\\.)*)"\s*\)"#,
            )?,
            unquoted_start: Regex::new(r"(?i)superscope\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*,")?,
            commented: Regex::new(
                r#"(?im)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"((?:[^"\\]|\\.)*)"\s*;?\s*//\s*superscope\b"#,
            )?,
        })
    }

    /// Run all passes over `text`, adding recovered scopes to `preset`.
    /// Returns the number of scopes added.
    pub fn extract(&self, text: &str, preset: &mut UnifiedPresetData) -> usize {
        self.extract_skipping(text, preset, ClaimedLines::new())
    }

    /// Like [`ScopeExtractor::extract`], but the heuristic pass also skips
    /// `claimed` lines, e.g. code lines the section scanner already stored.
    pub fn extract_skipping(
        &self,
        text: &str,
        preset: &mut UnifiedPresetData,
        mut claimed: ClaimedLines,
    ) -> usize {
        let mut added = 0;

        for caps in self.quoted.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            claim_span(text, whole.start(), whole.end(), &mut claimed);
            added += push(preset, &caps[1], unescape(&caps[2]));
        }

        for caps in self.unquoted_start.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if let Some(code) = balanced_tail(&text[whole.end()..]) {
                // Through the closing parenthesis
                claim_span(text, whole.start(), whole.end() + code.len() + 1, &mut claimed);
                added += push(preset, &caps[1], code.trim().to_string());
            }
        }

        for caps in self.commented.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            claim_span(text, whole.start(), whole.end(), &mut claimed);
            added += push(preset, &caps[1], unescape(&caps[2]));
        }

        added += self.heuristic(text, preset, &claimed);
        added
    }

    // Contiguous unclaimed lines containing math tokens
    fn heuristic(&self, text: &str, preset: &mut UnifiedPresetData, claimed: &ClaimedLines) -> usize {
        let mut blocks: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            let lower = trimmed.to_lowercase();
            let is_math = !claimed.contains(&index)
                && MATH_TOKENS.iter().any(|t| contains_call(&lower, t))
                && !lower.contains("superscope");
            if is_math {
                current.push(trimmed);
            } else if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        let mut added = 0;
        for (index, block) in blocks.into_iter().enumerate() {
            let mut scope = Scope::new(format!("heuristic_{}", index + 1), ScopeSource::Generic);
            scope.point_code = Some(block.join("\n"));
            scope.invalidate(HEURISTIC_REASON);
            if preset.push_scope(scope) {
                added += 1;
            }
        }
        added
    }
}

// Mark every line touched by the byte range `start..end`
fn claim_span(text: &str, start: usize, end: usize, claimed: &mut ClaimedLines) {
    let first = text[..start].matches('\n').count();
    let last = first + text[start..end].trim_end_matches('\n').matches('\n').count();
    claimed.extend(first..=last);
}

fn push(preset: &mut UnifiedPresetData, name: &str, code: String) -> usize {
    let mut scope = Scope::new(name.trim(), ScopeSource::Generic);
    scope.point_code = Some(code);
    validate_scope(&mut scope);
    usize::from(preset.push_scope(scope))
}

// Text up to the parenthesis that closes an already-open call
fn balanced_tail(text: &str) -> Option<&str> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn unescape(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> UnifiedPresetData {
        let mut preset = UnifiedPresetData::default();
        ScopeExtractor::new().unwrap().extract(text, &mut preset);
        preset
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("").is_err());
        assert!(validate_code("x=1").is_err());
        assert!(validate_code("x=i*2-1; y=v;").is_err());
        assert!(validate_code("x=sin(i*3.14);").is_ok());
        assert!(validate_code("r=atan2(y,x);").is_ok());
    }

    #[test]
    fn test_contains_call_respects_identifiers() {
        assert!(contains_call("y=sin(t)", "sin("));
        assert!(!contains_call("y=asin(t)", "sin("));
    }

    #[test]
    fn test_quoted_declaration() {
        let preset = extract(r#"add superscope("Wave", "y=sin(i*6.28)*0.5;\nx=i*2-1;")"#);
        let scope = preset.scope("Wave").unwrap();
        assert_eq!(scope.source, ScopeSource::Generic);
        assert!(scope.valid);
        assert_eq!(
            scope.point_code.as_deref(),
            Some("y=sin(i*6.28)*0.5;\nx=i*2-1;")
        );
    }

    #[test]
    fn test_unquoted_declaration_with_nested_calls() {
        let preset = extract("superscope(Spiral, x=cos(i*pi)*i; y=sin(i*pi)*i)");
        let scope = preset.scope("Spiral").unwrap();
        assert_eq!(
            scope.point_code.as_deref(),
            Some("x=cos(i*pi)*i; y=sin(i*pi)*i")
        );
    }

    #[test]
    fn test_commented_assignment() {
        let preset = extract("wobble = \"y=sin(t*2)*v;\"; // superscope\n");
        assert!(preset.scope("wobble").is_some());
    }

    #[test]
    fn test_multiline_declaration_is_not_recovered_twice() {
        let preset = extract("superscope(Spiral,\n  x=cos(i*3.14)*i;\n  y=sin(i*3.14)*i)\n");
        let names: Vec<&str> = preset.scopes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Spiral"]);
        assert!(preset.scopes[0].valid);
    }

    #[test]
    fn test_claimed_lines_are_skipped() {
        let text = "header\ny=sin(i*8)*v;\nx=cos(t);\n";
        let mut preset = UnifiedPresetData::default();
        let claimed = ClaimedLines::from([1]);
        ScopeExtractor::new()
            .unwrap()
            .extract_skipping(text, &mut preset, claimed);
        assert_eq!(preset.scopes.len(), 1);
        assert_eq!(preset.scopes[0].point_code.as_deref(), Some("x=cos(t);"));
    }

    #[test]
    fn test_heuristic_scope_is_invalid() {
        let preset = extract("notes\nx=cos(t);\ny=sin(t);\nmore notes\n");
        assert_eq!(preset.scopes.len(), 1);
        let scope = &preset.scopes[0];
        assert_eq!(scope.name, "heuristic_1");
        assert!(!scope.valid);
        assert_eq!(scope.invalid_reason.as_deref(), Some(HEURISTIC_REASON));
        assert_eq!(scope.point_code.as_deref(), Some("x=cos(t);\ny=sin(t);"));
    }
}
