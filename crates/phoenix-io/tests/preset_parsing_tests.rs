use phoenix_core::effects::EffectRegistry;
use phoenix_core::{EffectCategory, ParamValue, PresetFileType, RenderSettings, ScopeSource};
use phoenix_io::{PresetError, PresetLoader, PresetParser};
use std::io::Write;
use std::time::Duration;

fn parser() -> PresetParser {
    PresetParser::with_builtin_catalog().unwrap()
}

fn header(count: i32) -> Vec<u8> {
    let mut out = b"AVS Preset 0.2\0\0".to_vec();
    out.extend_from_slice(&2i16.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out
}

fn record(out: &mut Vec<u8>, type_id: i32, config: &[u8]) {
    out.extend_from_slice(&type_id.to_le_bytes());
    out.extend_from_slice(&(config.len() as i32).to_le_bytes());
    out.extend_from_slice(config);
}

fn ints(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn superscope_config(point: &str, frame: &str) -> Vec<u8> {
    let mut config = vec![1u8];
    for code in [point, frame, "", ""] {
        config.extend_from_slice(&(code.len() as i32).to_le_bytes());
        config.extend_from_slice(code.as_bytes());
    }
    config
}

#[test]
fn test_scope_switch_produces_two_scopes() {
    let text = "\
sn=Superscope(MyScope)
FRAME:
t=t+0.1;
x=sin(t)*0.5;
sn=Superscope(Other)
POINT:
y=cos(i*3.14)*v;
";
    let preset = parser().parse_bytes(text.as_bytes());

    assert_eq!(preset.file_type, PresetFileType::StructuredText);
    assert_eq!(preset.scopes.len(), 2);
    assert_eq!(preset.scopes[0].name, "MyScope");
    assert_eq!(
        preset.scopes[0].frame_code.as_deref(),
        Some("t=t+0.1;\nx=sin(t)*0.5;")
    );
    assert_eq!(preset.scopes[1].name, "Other");
    assert!(preset.scopes.iter().all(|s| s.source == ScopeSource::Phoenix));
}

#[test]
fn test_duplicate_scope_names_keep_first() {
    let text = "\
sn=Superscope(Dup)
POINT:
y=sin(i);
sn=Superscope(Else)
POINT:
y=cos(i);
sn=Superscope(Dup)
POINT:
y=tan(i);
";
    let preset = parser().parse_bytes(text.as_bytes());
    let names: Vec<&str> = preset.scopes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Dup", "Else"]);
    assert_eq!(preset.scopes[0].point_code.as_deref(), Some("y=sin(i);"));
}

#[test]
fn test_effect_count_out_of_range_reads_nothing() {
    let mut bytes = header(5000);
    record(&mut bytes, 0, &ints(&[0, 0]));
    let preset = parser().parse_bytes(&bytes);

    assert_eq!(preset.file_type, PresetFileType::LegacyBinary);
    assert!(preset.effects.is_empty());

    let negative = parser().parse_bytes(&header(-3));
    assert!(negative.effects.is_empty());
}

#[test]
fn test_unknown_effect_id_is_preserved() {
    let mut bytes = header(2);
    record(&mut bytes, 999, &ints(&[1, 2, 3]));
    record(&mut bytes, 25, &ints(&[1, 0]));
    let preset = parser().parse_bytes(&bytes);

    assert_eq!(preset.effects.len(), 2);
    let unknown = &preset.effects[0];
    assert_eq!(unknown.type_id, 999);
    assert_eq!(unknown.name, "Effect_999");
    assert_eq!(unknown.category, EffectCategory::Unknown);
    assert_eq!(
        unknown.param("raw"),
        Some(&ParamValue::IntArray(vec![1, 2, 3]))
    );
    assert_eq!(preset.effects[1].name, "Clear Screen");
    assert_eq!(preset.effects[1].order, 1);
}

#[test]
fn test_truncated_record_keeps_earlier_effects() {
    let mut bytes = header(3);
    record(&mut bytes, 0, &ints(&[1, 1, 0x00FF_FFFF]));
    bytes.extend_from_slice(&22i32.to_le_bytes());
    bytes.extend_from_slice(&100i32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 10]);

    let preset = parser().parse_bytes(&bytes);
    assert_eq!(preset.effects.len(), 1);
    assert_eq!(preset.effects[0].name, "Simple");
}

#[test]
fn test_latin1_text_preset_keeps_its_scopes() {
    let mut bytes = b"; d\xe9mo preset for the club night, saved with the platform code page\n".to_vec();
    bytes.extend_from_slice(b"[avs]\nsn=Superscope(Wave)\nPOINT:\nx=i*2-1;\ny=sin(i*8+t)*0.5;\n");
    bytes.extend_from_slice(b"FRAME:\nt=t+0.05;\n");
    assert!(bytes.len() > 128);

    let preset = parser().parse_bytes(&bytes);
    assert_eq!(preset.detection.file_type, PresetFileType::StructuredText);
    assert!(preset.effects.is_empty());
    let names: Vec<&str> = preset.scopes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Wave"]);
    assert!(preset.scope("Wave").unwrap().valid);
}

#[test]
fn test_broken_binary_falls_back_to_strings() {
    let mut bytes = header(1);
    bytes.extend_from_slice(&36i32.to_le_bytes());
    bytes.extend_from_slice(&5000i32.to_le_bytes());
    bytes.extend_from_slice(b"\x00\x00Render / Starfield\x00\x01\x00Trans / Mirror\x00");

    let preset = parser().parse_bytes(&bytes);
    let ids: Vec<i32> = preset.effects.iter().map(|e| e.type_id).collect();
    assert_eq!(ids, vec![27, 26]);
    assert_eq!(preset.detection.file_type, PresetFileType::LegacyBinary);
}

#[test]
fn test_broken_binary_falls_back_to_text() {
    let mut bytes = header(1);
    bytes.extend_from_slice(&36i32.to_le_bytes());
    bytes.extend_from_slice(&5000i32.to_le_bytes());
    bytes.extend_from_slice(
        b"\n[preset Rescue]\n[frame]\nt=t+0.02;\n[point]\nx=i*2-1;\ny=sin(i*8+t)*0.4;\n",
    );

    let preset = parser().parse_bytes(&bytes);
    assert!(preset.effects.is_empty());
    let scope = preset.scope("preset Rescue").unwrap();
    assert_eq!(scope.frame_code.as_deref(), Some("t=t+0.02;"));
    assert_eq!(preset.detection.file_type, PresetFileType::LegacyBinary);
}

#[test]
fn test_binary_preset_builds_graph() {
    let mut bytes = header(3);
    record(&mut bytes, 25, &ints(&[1, 0]));
    record(
        &mut bytes,
        36,
        &superscope_config("x=i*2-1;y=sin(i*12)*v;", "t=t+0.1;"),
    );
    record(&mut bytes, 0, &ints(&[2, 1, 0x0040_80FF]));

    let preset = parser().parse_bytes(&bytes);
    assert_eq!(preset.effects.len(), 3);
    assert_eq!(preset.scopes.len(), 1);
    assert_eq!(preset.scopes[0].source, ScopeSource::Legacy);

    let mut graph = EffectRegistry::builtin()
        .build_graph(&preset, &RenderSettings::default())
        .unwrap();
    // The legacy scope is already represented by its superscope record
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.execution_order().unwrap().len(), 3);
}

#[test]
fn test_freeform_superscopes_and_heuristic() {
    let text = r#"
notes about this preset
superscope("Quoted", "y=sin(i*6.28)*0.5;")
superscope(Bare, x=cos(i*3.14); y=sin(i*3.14))
spin = "r=i*6.28; x=cos(r)*0.5; y=sin(r)*0.5;" // superscope
x=pow(v,2);
y=abs(v);
"#;
    let preset = parser().parse_bytes(text.as_bytes());

    for name in ["Quoted", "Bare", "spin"] {
        let scope = preset.scope(name).unwrap();
        assert!(scope.valid, "{} should validate", name);
        assert_eq!(scope.source, ScopeSource::Generic);
    }
    let heuristic = preset.scope("heuristic_1").unwrap();
    assert!(!heuristic.valid);
    assert_eq!(heuristic.point_code.as_deref(), Some("x=pow(v,2);\ny=abs(v);"));
}

#[test]
fn test_loader_parses_on_worker_thread() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[avs]\nauthor=tester\nsn=Superscope(Disk)\nPOINT:\ny=sin(i*4)*v;").unwrap();
    file.flush().unwrap();

    let loader = PresetLoader::with_builtin_catalog().unwrap();
    let rx = loader.spawn(file.path());
    let preset = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();

    assert_eq!(preset.metadata_value("author"), Some("tester"));
    assert!(preset.scope("Disk").is_some());

    let inline = loader.load(file.path()).unwrap();
    assert_eq!(inline.scopes, preset.scopes);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = parser().parse_file("/no/such/preset.avs");
    assert!(matches!(result, Err(PresetError::Io(_))));
}
