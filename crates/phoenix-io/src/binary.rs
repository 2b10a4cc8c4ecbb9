//! Legacy binary effect-chain decoder
//!
//! Layout (little-endian):
//!
//! ```text
//! signature   16 bytes, must contain "AVS"
//! version     i16
//! count       i32, 0..=1000 (anything else is read as 0)
//! records     count x { type_id: i32, config_size: i32, config: [u8; config_size] }
//! ```
//!
//! Known record layouts are decoded into named parameters. A record whose
//! layout fails to decode is skipped; a record whose header or payload runs
//! past the end of input stops the scan.

use crate::catalog::EffectCatalog;
use crate::error::{PresetError, Result};
use crate::reader::ByteReader;
use phoenix_core::effects::nodes::{
    COMMENT_ID, CONVOLUTION_ID, CONVOLUTION_KERNEL_LEN, SIMPLE_SPECTRUM_ID, SUPERSCOPE_ID,
};
use phoenix_core::{
    EffectDescriptor, ParamValue, PresetFileType, RawPayload, Scope, ScopeSource,
    UnifiedPresetData,
};
use tracing::{debug, warn};

/// Signature field length
pub const SIGNATURE_LEN: usize = 16;

/// Largest accepted effect count
pub const MAX_EFFECTS: i32 = 1000;

/// Largest color table in a simple spectrum record
pub const MAX_SIMPLE_COLORS: i32 = 16;

/// Decoder for the legacy binary container
#[derive(Debug, Clone)]
pub struct BinaryStrategy {
    catalog: EffectCatalog,
}

impl BinaryStrategy {
    /// Decoder naming effects from `catalog`
    pub fn new(catalog: EffectCatalog) -> Self {
        Self { catalog }
    }

    /// Decode a whole container. Fails when the header is missing or bad, or
    /// when the first record is already truncated.
    pub fn decode(&self, bytes: &[u8]) -> Result<UnifiedPresetData> {
        let mut reader = ByteReader::new(bytes);
        let signature = reader.read_bytes(SIGNATURE_LEN)?;
        if !signature.windows(3).any(|w| w.eq_ignore_ascii_case(b"AVS")) {
            return Err(PresetError::BadSignature(
                String::from_utf8_lossy(signature).into_owned(),
            ));
        }
        let version = reader.read_i16_le()?;
        let mut count = reader.read_i32_le()?;
        if !(0..=MAX_EFFECTS).contains(&count) {
            warn!("Effect count {} out of range, reading no effects", count);
            count = 0;
        }

        let mut preset = UnifiedPresetData::default();
        preset.file_type = PresetFileType::LegacyBinary;
        preset
            .metadata
            .push(("version".to_string(), version.to_string()));

        for index in 0..count as usize {
            let (type_id, config) = match read_record(&mut reader) {
                Ok(record) => record,
                Err(err) if index == 0 => return Err(err),
                Err(err) => {
                    warn!("Stopping at record {}: {}", index, err);
                    break;
                }
            };

            let mut effect = EffectDescriptor::new(
                type_id,
                self.catalog.name_for(type_id),
                self.catalog.category_for(type_id),
                index,
            );
            effect.raw_config = config.to_vec();

            let decoded = match type_id {
                SIMPLE_SPECTRUM_ID => decode_simple(config, &mut effect),
                SUPERSCOPE_ID => decode_superscope(config, &mut effect).map(|scope| {
                    if !preset.push_scope(scope) {
                        debug!("Superscope record {} carries no code", index);
                    }
                }),
                COMMENT_ID => {
                    decode_comment(config, &mut effect);
                    Ok(())
                }
                CONVOLUTION_ID => decode_convolution(config, &mut effect),
                _ => {
                    decode_raw(config, &mut effect);
                    Ok(())
                }
            };
            match decoded {
                Ok(()) => preset.effects.push(effect),
                Err(err) => warn!("Skipping record {} ({}): {}", index, effect.name, err),
            }
        }

        debug!(
            "Decoded binary preset v{}: {} effects, {} scopes",
            version,
            preset.effects.len(),
            preset.scopes.len()
        );
        preset.raw = RawPayload::Binary(bytes.to_vec());
        Ok(preset)
    }
}

fn read_record<'a>(reader: &mut ByteReader<'a>) -> Result<(i32, &'a [u8])> {
    let type_id = reader.read_i32_le()?;
    let size = reader.read_i32_le()?;
    if size < 0 {
        return Err(PresetError::UnexpectedEof {
            offset: reader.position(),
            needed: 0,
        });
    }
    let config = reader.read_bytes(size as usize)?;
    Ok((type_id, config))
}

fn read_colors(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<u32>> {
    (0..count).map(|_| reader.read_u32_le()).collect()
}

fn decode_simple(config: &[u8], effect: &mut EffectDescriptor) -> Result<()> {
    let mut reader = ByteReader::new(config);
    let mode = reader.read_i32_le()?;
    let num_colors = reader.read_i32_le()?.clamp(0, MAX_SIMPLE_COLORS);
    let colors = read_colors(&mut reader, num_colors as usize)?;

    let params = &mut effect.parameters;
    params.insert("mode".to_string(), ParamValue::Int(mode));
    params.insert("num_colors".to_string(), ParamValue::Int(num_colors));
    params.insert("colors".to_string(), ParamValue::ColorArray(colors));
    Ok(())
}

// Code strings are required; the trailing channel, color table and draw mode
// are read when present.
fn decode_superscope(config: &[u8], effect: &mut EffectDescriptor) -> Result<Scope> {
    let mut reader = ByteReader::new(config);
    let format = reader.read_u8()?;
    let point = reader.read_len_string()?;
    let frame = reader.read_len_string()?;
    let beat = reader.read_len_string()?;
    let init = reader.read_len_string()?;

    let params = &mut effect.parameters;
    params.insert("format".to_string(), ParamValue::Int(i32::from(format)));
    if let Ok(channel) = reader.read_i32_le() {
        params.insert("channel".to_string(), ParamValue::Int(channel));
    }
    if let Ok(num_colors) = reader.read_i32_le() {
        let num_colors = num_colors.clamp(0, MAX_SIMPLE_COLORS) as usize;
        if let Ok(colors) = read_colors(&mut reader, num_colors) {
            params.insert("colors".to_string(), ParamValue::ColorArray(colors));
        }
    }
    if let Ok(draw_mode) = reader.read_i32_le() {
        params.insert("draw_mode".to_string(), ParamValue::Int(draw_mode));
    }

    let mut scope = Scope::new(
        format!("{} {}", effect.name, effect.order + 1),
        ScopeSource::Legacy,
    );
    for (key, code, slot) in [
        ("point", point, &mut scope.point_code),
        ("frame", frame, &mut scope.frame_code),
        ("beat", beat, &mut scope.beat_code),
        ("init", init, &mut scope.init_code),
    ] {
        if !code.trim().is_empty() {
            params.insert(key.to_string(), ParamValue::Text(code.clone()));
            *slot = Some(code);
        }
    }
    crate::superscope::validate_scope(&mut scope);
    Ok(scope)
}

fn decode_convolution(config: &[u8], effect: &mut EffectDescriptor) -> Result<()> {
    let mut reader = ByteReader::new(config);
    let enabled = reader.read_i32_le()?;
    let wrap = reader.read_i32_le()?;
    let absolute = reader.read_i32_le()?;
    let two_pass = reader.read_i32_le()?;
    let kernel = (0..CONVOLUTION_KERNEL_LEN)
        .map(|_| reader.read_i32_le())
        .collect::<Result<Vec<_>>>()?;
    let bias = reader.read_i32_le()?;
    let scale = reader.read_i32_le()?;

    let params = &mut effect.parameters;
    params.insert("enabled".to_string(), ParamValue::Bool(enabled != 0));
    params.insert("wrap".to_string(), ParamValue::Bool(wrap != 0));
    params.insert("absolute".to_string(), ParamValue::Bool(absolute != 0));
    params.insert("two_pass".to_string(), ParamValue::Bool(two_pass != 0));
    params.insert("kernel".to_string(), ParamValue::IntArray(kernel));
    params.insert("bias".to_string(), ParamValue::Int(bias));
    params.insert("scale".to_string(), ParamValue::Int(scale));
    Ok(())
}

// NUL-terminated text
fn decode_comment(config: &[u8], effect: &mut EffectDescriptor) {
    let end = config.iter().position(|&b| b == 0).unwrap_or(config.len());
    let text = crate::raw::decode_text(&config[..end]).into_owned();
    effect
        .parameters
        .insert("text".to_string(), ParamValue::Text(text));
}

fn decode_raw(config: &[u8], effect: &mut EffectDescriptor) {
    let words = config
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    effect
        .parameters
        .insert("raw".to_string(), ParamValue::IntArray(words));
}
