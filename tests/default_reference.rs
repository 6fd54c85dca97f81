//! Default Configuration Reference Test
//!
//! The default builder must reproduce the checked-in reference document.

use pretty_assertions::assert_eq;
use retrieval_config::settings::ToolSettings;
use retrieval_config::{build_default, load, SectionId};
use std::path::Path;

fn reference_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/reference.yaml")
}

#[test]
fn test_default_matches_reference() {
    let reference = load(reference_path()).unwrap();
    let doc = build_default().unwrap();

    assert_eq!(doc.differing_sections(&reference), Vec::<String>::new());
    assert_eq!(doc.layout(), reference.layout());
    assert_eq!(doc, reference);
}

#[test]
fn test_default_text_matches_reference_file() {
    let text = build_default().unwrap().to_yaml_string().unwrap();
    let reference = std::fs::read_to_string(reference_path()).unwrap();
    assert_eq!(text, reference);
}

#[test]
fn test_default_is_identical_across_calls() {
    let first = build_default().unwrap();
    let second = build_default().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.to_yaml_string().unwrap(),
        second.to_yaml_string().unwrap()
    );
}

#[test]
fn test_edit_shows_up_in_diff() {
    let reference = load(reference_path()).unwrap();
    let mut doc = build_default().unwrap();

    let mut units = doc.user_units().unwrap();
    units.insert("M_sun", "2e30kg");
    doc.set_user_units(&units).unwrap();

    assert_eq!(
        doc.differing_sections(&reference),
        vec![SectionId::UserDefinedUnits.as_str()]
    );
}

#[test]
fn test_tool_settings_point_at_reference() {
    let settings = ToolSettings::from_lookup(|_| None);
    let reference = load(&settings.reference).unwrap();
    assert_eq!(reference, build_default().unwrap());
}
