use super::*;
use crate::panel::placement::{Indicator, classify_label};

#[test]
fn find_is_case_insensitive() {
    let icon = find("g3").unwrap();
    assert_eq!(icon.id, "G3");
    assert!(find("  dnd ").is_some());
}

#[test]
fn find_unknown_returns_none() {
    assert!(find("NOPE").is_none());
}

#[test]
fn catalog_ids_are_unique() {
    for (i, a) in CATALOG.iter().enumerate() {
        for b in &CATALOG[i + 1..] {
            assert_ne!(a.id, b.id, "duplicate catalog id");
        }
    }
}

#[test]
fn catalog_has_exactly_one_motion_sensor() {
    let count = CATALOG.iter().filter(|i| i.category == IconCategory::Pir).count();
    assert_eq!(count, 1);
}

#[test]
fn service_icons_classify_as_indicators() {
    assert_eq!(classify_label(find("DND").unwrap().label), Some(Indicator::DoNotDisturb));
    assert_eq!(classify_label(find("PRV").unwrap().label), Some(Indicator::DoNotDisturb));
    assert_eq!(classify_label(find("MUR").unwrap().label), Some(Indicator::MakeUpRoom));
    assert_eq!(classify_label(find("SRV").unwrap().label), Some(Indicator::MakeUpRoom));
}

#[test]
fn spec_copies_catalog_fields() {
    let spec = find("L1").unwrap().spec();
    assert_eq!(spec.icon_id, "L1");
    assert_eq!(spec.label, "Main Light");
    assert_eq!(spec.category, IconCategory::Lighting);
}
