//! File-level round trips: save, load, passthrough text and can-dbc interop

use cantools_codec::dbc::{parse_document, render_document, signals_from_dbc, DEFAULT_HEADER};
use cantools_codec::persist::{load, save};
use cantools_codec::{
    ByteOrder, CodecConfig, DbcDocument, Session, Signal, SignalField, SortMode, ValueType,
};
use std::fs;
use tempfile::{NamedTempFile, TempDir};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Signals already grouped by message so file order equals store order
fn sample_signals() -> Vec<Signal> {
    vec![
        Signal::new("DI_vehicleSpeed", 0x257)
            .with_message("DI_speed")
            .with_layout(12, 12, ByteOrder::LittleEndian)
            .with_scaling(0.08, -40.0)
            .with_range(-40.0, 285.0)
            .with_unit("kph"),
        Signal::new("DI_uiSpeed", 0x257)
            .with_message("DI_speed")
            .with_layout(24, 9, ByteOrder::LittleEndian)
            .with_range(0.0, 510.0)
            .with_unit("mph"),
        Signal::new("BMS_current", 0x132)
            .with_message("BMS_hvBus")
            .with_layout(23, 16, ByteOrder::BigEndian)
            .with_value_type(ValueType::Signed)
            .with_scaling(-0.1, 0.0)
            .with_range(-3276.8, 3276.7)
            .with_unit("A"),
        Signal::new("Tiny", 0x1FFF_FFFF)
            .with_message("Extended")
            .with_layout(0, 64, ByteOrder::LittleEndian)
            .with_scaling(1e-5, 1e20),
    ]
}

fn document_with(signals: Vec<Signal>) -> DbcDocument {
    let mut doc = DbcDocument::default();
    for signal in signals {
        doc.store.add(signal).unwrap();
    }
    doc
}

#[test]
fn test_save_load_round_trip() {
    init_logging();
    let file = NamedTempFile::new().unwrap();
    let doc = document_with(sample_signals()).with_vehicle_info("Tesla Model 3 2021");
    save(file.path(), &doc).unwrap();

    let config = CodecConfig::new().with_sort_mode(SortMode::ByCanId);
    let loaded = load(file.path(), &config).unwrap();

    let mut expected = doc.store.clone();
    expected.sort(SortMode::ByCanId);
    assert_eq!(loaded.store, expected);
    assert_eq!(loaded.vehicle_info.as_deref(), Some("Tesla Model 3 2021"));
    assert_eq!(loaded.header, DEFAULT_HEADER);

    // Saving the sorted store writes the same lines in a new order
    let first = fs::read_to_string(file.path()).unwrap();
    save(file.path(), &loaded).unwrap();
    let second = fs::read_to_string(file.path()).unwrap();
    let reloaded = load(file.path(), &config).unwrap();
    assert_eq!(reloaded, loaded);
    assert_eq!(first.len(), second.len());
}

#[test]
fn test_passthrough_lines_survive_commit() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("car.dbc");
    fs::write(
        &path,
        "VERSION \"1.0\"\n\
         NS_ :\n\
         \x20   CM_\n\
         BS_:\n\
         BU_: Gateway\n\
         BO_ 599 DI_speed: 8 Gateway\n\
         \x20SG_ Speed : 12|12@1+ (0.08,-40) [-40|285] \"kph\"  Gateway\n\
         \x20SG_ Broken : 0|8 1+ (1,0) [0|255] \"\"  Gateway\n\
         BA_DEF_ SG_ \"GenSigStartValue\" INT 0 65535;\n\
         VAL_ 599 Speed 0 \"Stopped\" ;\n",
    )
    .unwrap();

    let mut session = Session::new(CodecConfig::new());
    session.load(&path).unwrap();
    assert_eq!(session.store().len(), 1);

    session.reset_defaults();
    session.validate_field(SignalField::SignalName, "Gear").unwrap();
    session.validate_field(SignalField::CanId, "0x118").unwrap();
    session.commit_signal().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("VERSION \"1.0\"\nNS_ :\n    CM_\nBS_:\nBU_: Gateway\n"));
    assert!(text.contains(" SG_ Broken : 0|8 1+ (1,0) [0|255] \"\"  Gateway\n"));
    assert!(text.contains("BA_DEF_ SG_ \"GenSigStartValue\" INT 0 65535;\n"));
    assert!(text.contains("VAL_ 599 Speed 0 \"Stopped\" ;\n"));
    assert!(text.contains("BO_ 280 Gear: 8 VehicleBus\n SG_ Gear : 12|12@1+"));
    assert!(!text.contains("BO_ 280 DI_vehicleSpeed"));
    assert_eq!(session.store().len(), 2);
}

#[test]
fn test_malformed_signal_line_is_kept_as_text() {
    let doc = parse_document(
        "BO_ 1 M: 8 X\n SG_ NoAt : 0|8 1+ (1,0) [0|0] \"\" X\n",
        32,
    );
    assert!(doc.store.is_empty());
    assert_eq!(doc.header, " SG_ NoAt : 0|8 1+ (1,0) [0|0] \"\" X\n");
}

#[test]
fn test_load_caps_signal_count() {
    init_logging();
    let file = NamedTempFile::new().unwrap();
    let mut text = String::from(DEFAULT_HEADER);
    text.push_str("BO_ 16 Bulk: 8 VehicleBus\n");
    for i in 0..40 {
        text.push_str(&format!(" SG_ S{:02} : {}|1@1+ (1,0) [0|1] \"\"  Receiver\n", i, i));
    }
    fs::write(file.path(), text).unwrap();

    let doc = load(file.path(), &CodecConfig::new()).unwrap();
    assert_eq!(doc.store.len(), 32);
    assert_eq!(doc.store.get(31).unwrap().signal_name, "S31");
    assert_eq!(doc.header, DEFAULT_HEADER);
}

#[test]
fn test_written_file_parses_with_can_dbc() {
    let doc = document_with(sample_signals());
    let text = render_document(&doc);

    let dbc = can_dbc::DBC::from_slice(text.as_bytes()).expect("can-dbc should parse our output");
    let imported = signals_from_dbc(&dbc);
    let ours: Vec<Signal> = doc.store.iter().cloned().collect();
    assert_eq!(imported, ours);
}

#[test]
fn test_decode_after_reload() {
    let dir = TempDir::new().unwrap();
    let config = CodecConfig::new().with_data_dir(dir.path());
    let mut session = Session::new(config);
    session.create_file("model3", "").unwrap();
    session.import_signals(sample_signals()).unwrap();

    let payload = [0x00, 0x30, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00];
    let results = session.decode_frame(0x257, &payload);
    assert_eq!(results.len(), 2);
    for (name, value) in results {
        let value = value.unwrap();
        match name.as_str() {
            "DI_vehicleSpeed" => assert!((value - -16.72).abs() < 1e-9),
            "DI_uiSpeed" => assert_eq!(value, 0.0),
            other => panic!("unexpected signal {other}"),
        }
    }
}
