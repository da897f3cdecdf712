use super::*;
use crate::panel::icons;

fn spec(id: &str) -> IconSpec {
    icons::find(id).unwrap().spec()
}

fn custom(id: &str, label: &str) -> IconSpec {
    IconSpec { icon_id: id.to_owned(), label: label.to_owned(), category: IconCategory::Other }
}

fn grid() -> GridDesign {
    GridDesign::new(PanelDimension::Standard)
}

// =============================================================================
// check_rules
// =============================================================================

#[test]
fn classify_label_matches_synonyms_case_insensitively() {
    assert_eq!(classify_label("DND"), Some(Indicator::DoNotDisturb));
    assert_eq!(classify_label("Guest Privacy"), Some(Indicator::DoNotDisturb));
    assert_eq!(classify_label("Do Not Disturb"), Some(Indicator::DoNotDisturb));
    assert_eq!(classify_label("MUR"), Some(Indicator::MakeUpRoom));
    assert_eq!(classify_label("Room Service"), Some(Indicator::MakeUpRoom));
    assert_eq!(classify_label("please make up"), Some(Indicator::MakeUpRoom));
    assert_eq!(classify_label("Main Light"), None);
}

#[test]
fn dnd_is_rejected_in_every_right_column_cell() {
    for position in [2, 5, 8, 11] {
        let err = check_rules("DND", "Do Not Disturb", position, 12).unwrap_err();
        assert_eq!(err, PlacementError::DndRightColumn(position));
        assert!(err.notice().is_some());
    }
    for position in [0, 1, 3, 4, 6, 7] {
        assert!(check_rules("DND", "Do Not Disturb", position, 9).is_ok());
    }
}

#[test]
fn mur_is_rejected_in_every_left_column_cell() {
    for position in [0, 3, 6, 9] {
        let err = check_rules("MUR", "Make Up Room", position, 12).unwrap_err();
        assert_eq!(err, PlacementError::MurLeftColumn(position));
        assert!(err.notice().is_some());
    }
    for position in [1, 2, 4, 5, 7, 8] {
        assert!(check_rules("MUR", "Make Up Room", position, 9).is_ok());
    }
}

#[test]
fn g1_g2_confined_to_left_two_columns() {
    for id in ["G1", "G2"] {
        for position in 0..9 {
            let result = check_rules(id, "Group", position, 9);
            if position % 3 == 2 {
                assert!(matches!(result, Err(PlacementError::ColumnRestricted { .. })));
            } else {
                assert!(result.is_ok(), "{id} should fit cell {position}");
            }
        }
    }
}

#[test]
fn g3_confined_to_right_two_columns() {
    for position in 0..9 {
        let result = check_rules("G3", "Group 3", position, 9);
        assert_eq!(result.is_ok(), position % 3 != 0, "cell {position}");
    }
}

#[test]
fn column_restriction_has_no_notice() {
    let err = check_rules("G3", "Group 3", 0, 9).unwrap_err();
    assert!(err.notice().is_none());
}

#[test]
fn check_rules_rejects_out_of_range() {
    assert_eq!(
        check_rules("L1", "Main Light", 9, 9),
        Err(PlacementError::OutOfRange { position: 9, slots: 9 })
    );
}

// =============================================================================
// place_at / place_first_free
// =============================================================================

#[test]
fn place_at_records_icon_in_cell() {
    let mut g = grid();
    let icon = g.place_at(&spec("L1"), 4).unwrap();
    assert_eq!(icon.position, 4);
    assert_eq!(g.icon_at(4).unwrap().icon_id, "L1");
}

#[test]
fn check_cell_reports_without_mutating() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    let before = g.clone();
    assert_eq!(g.check_cell(&spec("L2"), 0), Err(PlacementError::Occupied(0)));
    assert_eq!(g.check_cell(&spec("MUR"), 3), Err(PlacementError::MurLeftColumn(3)));
    assert_eq!(g.check_cell(&spec("PIR"), 7), Err(PlacementError::PirFixed));
    assert!(g.check_cell(&spec("L2"), 1).is_ok());
    assert_eq!(g, before);
}

#[test]
fn place_at_occupied_cell_is_rejected_without_change() {
    let mut g = grid();
    g.place_at(&spec("L1"), 4).unwrap();
    let before = g.clone();
    assert_eq!(g.place_at(&spec("L2"), 4), Err(PlacementError::Occupied(4)));
    assert_eq!(g, before);
}

#[test]
fn place_at_never_records_dnd_in_right_column() {
    let mut g = grid();
    for position in 0..9 {
        let _ = g.place_at(&spec("DND"), position);
    }
    assert!(g.icons.iter().all(|i| i.position % 3 != 2));
    assert_eq!(g.icons.len(), 6);
}

#[test]
fn place_at_never_records_mur_in_left_column() {
    let mut g = grid();
    for position in 0..9 {
        let _ = g.place_at(&custom("X", "Make up room please"), position);
    }
    assert!(g.icons.iter().all(|i| i.position % 3 != 0));
}

#[test]
fn label_naming_both_indicators_is_kept_to_middle_column() {
    let both = custom("X1", "Privacy / Room Service");
    assert_eq!(check_rules("X1", &both.label, 0, 9), Err(PlacementError::MurLeftColumn(0)));
    assert_eq!(check_rules("X1", &both.label, 2, 9), Err(PlacementError::DndRightColumn(2)));
    assert_eq!(check_rules("X1", &both.label, 1, 9), Ok(()));

    let mut g = grid();
    for position in 0..9 {
        let _ = g.place_at(&both, position);
    }
    assert!(g.icons.iter().all(|i| i.position % 3 == 1));
    assert_eq!(g.icons.len(), 3);
}

#[test]
fn place_at_rejects_pir() {
    let mut g = grid();
    assert_eq!(g.place_at(&spec("PIR"), 7), Err(PlacementError::PirFixed));
    assert!(g.icons.is_empty());
}

#[test]
fn text_only_panel_rejects_icons() {
    let mut g = grid();
    g.set_mode(PanelMode::TextOnly);
    assert_eq!(g.place_at(&spec("L1"), 0), Err(PlacementError::IconsDisabled));
    assert_eq!(g.place_first_free(&spec("L1")), Err(PlacementError::IconsDisabled));
}

#[test]
fn place_first_free_takes_first_empty_legal_cell() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    let placed = g.place_first_free(&spec("MUR")).unwrap();
    // cell 0 is taken and MUR cannot use the left column, so cell 1 wins.
    assert_eq!(placed.position, 1);

    let g3 = g.place_first_free(&spec("G3")).unwrap();
    assert_eq!(g3.position, 2);
}

#[test]
fn place_first_free_reports_full_grid() {
    let mut g = grid();
    for _ in 0..9 {
        g.place_first_free(&spec("L1")).unwrap();
    }
    assert_eq!(g.place_first_free(&spec("L2")), Err(PlacementError::NoFreeCell));
}

// =============================================================================
// move / swap
// =============================================================================

#[test]
fn move_to_empty_cell_moves_icon_and_text() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(0, "Main").unwrap();

    assert_eq!(g.move_icon(0, 4), Ok(MoveOutcome::Moved));
    assert!(g.icon_at(0).is_none());
    assert_eq!(g.icon_at(4).unwrap().icon_id, "L1");
    assert_eq!(g.texts.get(&4).map(String::as_str), Some("Main"));
    assert_eq!(g.texts.get(&0).map(String::as_str), None);
}

#[test]
fn swap_exchanges_icons_and_texts() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.place_at(&spec("C1"), 4).unwrap();
    g.set_text(0, "Lights").unwrap();
    g.set_text(4, "Curtains").unwrap();

    g.swap(0, 4).unwrap();
    assert_eq!(g.icon_at(4).unwrap().icon_id, "L1");
    assert_eq!(g.icon_at(0).unwrap().icon_id, "C1");
    assert_eq!(g.texts.get(&4).map(String::as_str), Some("Lights"));
    assert_eq!(g.texts.get(&0).map(String::as_str), Some("Curtains"));
}

#[test]
fn inverse_swap_restores_original_state() {
    let mut g = grid();
    g.place_at(&spec("L1"), 1).unwrap();
    g.place_at(&spec("S1"), 5).unwrap();
    g.set_text(1, "one").unwrap();
    let original = g.clone();

    g.swap(1, 5).unwrap();
    assert_ne!(g, original);
    g.swap(5, 1).unwrap();
    assert_eq!(g, original);
}

#[test]
fn swap_checks_both_icons() {
    let mut g = grid();
    g.place_at(&spec("DND"), 0).unwrap();
    g.place_at(&spec("L1"), 2).unwrap();
    let before = g.clone();

    // DND would land in the right column.
    assert_eq!(g.move_icon(0, 2), Err(PlacementError::DndRightColumn(2)));
    // Same drag from the other side: the displaced DND is the offender.
    assert_eq!(g.move_icon(2, 0), Err(PlacementError::DndRightColumn(2)));
    assert_eq!(g, before);
}

#[test]
fn swap_requires_both_cells_occupied() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    assert_eq!(g.swap(0, 1), Err(PlacementError::EmptyCell(1)));
    assert_eq!(g.swap(3, 0), Err(PlacementError::EmptyCell(3)));
}

#[test]
fn move_same_cell_is_unchanged() {
    let mut g = grid();
    g.place_at(&spec("L1"), 3).unwrap();
    assert_eq!(g.move_icon(3, 3), Ok(MoveOutcome::Unchanged));
}

#[test]
fn pir_cannot_be_dragged_or_displaced() {
    let mut g = grid();
    g.toggle_pir(&spec("PIR")).unwrap();
    g.place_at(&spec("L1"), 0).unwrap();

    assert_eq!(g.move_icon(7, 0), Err(PlacementError::PirFixed));
    assert_eq!(g.move_icon(0, 7), Err(PlacementError::PirFixed));
    assert_eq!(g.remove_at(7), Err(PlacementError::PirFixed));
}

// =============================================================================
// PIR
// =============================================================================

#[test]
fn toggle_pir_uses_dimension_slot() {
    let mut standard = grid();
    assert_eq!(standard.toggle_pir(&spec("PIR")), Ok(true));
    assert_eq!(standard.icon_at(7).unwrap().category, IconCategory::Pir);

    let mut tall = GridDesign::new(PanelDimension::Tall);
    assert_eq!(tall.toggle_pir(&spec("PIR")), Ok(true));
    assert_eq!(tall.icon_at(10).unwrap().category, IconCategory::Pir);
}

#[test]
fn toggle_pir_twice_removes_it() {
    let mut g = grid();
    g.toggle_pir(&spec("PIR")).unwrap();
    assert_eq!(g.toggle_pir(&spec("PIR")), Ok(false));
    assert!(!g.has_pir());
}

#[test]
fn at_most_one_pir_after_any_sequence() {
    let mut g = grid();
    for _ in 0..5 {
        let _ = g.toggle_pir(&spec("PIR"));
        let _ = g.place_first_free(&spec("PIR"));
        let count = g.icons.iter().filter(|i| i.is_pir()).count();
        assert!(count <= 1);
    }
}

#[test]
fn toggle_pir_rejects_occupied_slot() {
    let mut g = grid();
    g.place_at(&spec("L1"), 7).unwrap();
    assert_eq!(g.toggle_pir(&spec("PIR")), Err(PlacementError::PirSlotOccupied(7)));
}

#[test]
fn toggle_pir_rejects_other_icons() {
    let mut g = grid();
    assert_eq!(g.toggle_pir(&spec("L1")), Err(PlacementError::NotMotionSensor));
}

// =============================================================================
// text / mode / dimension
// =============================================================================

#[test]
fn icons_text_mode_requires_icon_for_caption() {
    let mut g = grid();
    g.set_mode(PanelMode::IconsText);
    assert_eq!(g.set_text(0, "Hello"), Err(PlacementError::CaptionWithoutIcon(0)));
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(0, "Hello").unwrap();
    g.remove_at(0).unwrap();
    assert_eq!(g.texts.get(&0).map(String::as_str), None);
}

#[test]
fn custom_mode_keeps_text_after_icon_removed() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(0, "Hello").unwrap();
    g.remove_at(0).unwrap();
    assert_eq!(g.texts.get(&0).map(String::as_str), Some("Hello"));
}

#[test]
fn blank_text_clears_cell() {
    let mut g = grid();
    g.set_text(2, "x").unwrap();
    g.set_text(2, "   ").unwrap();
    assert_eq!(g.texts.get(&2).map(String::as_str), None);
}

#[test]
fn switching_to_text_only_drops_icons() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(1, "Label").unwrap();
    g.set_mode(PanelMode::TextOnly);
    assert!(g.icons.is_empty());
    assert_eq!(g.texts.get(&1).map(String::as_str), Some("Label"));
}

#[test]
fn switching_to_icons_text_drops_orphan_captions() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(0, "kept").unwrap();
    g.set_text(1, "orphan").unwrap();
    g.set_mode(PanelMode::IconsText);
    assert_eq!(g.texts.get(&0).map(String::as_str), Some("kept"));
    assert_eq!(g.texts.get(&1).map(String::as_str), None);
}

#[test]
fn set_dimension_moves_pir_to_new_slot() {
    let mut g = grid();
    g.toggle_pir(&spec("PIR")).unwrap();
    g.set_dimension(PanelDimension::Tall).unwrap();
    assert_eq!(g.icon_at(10).unwrap().category, IconCategory::Pir);
    assert!(g.icon_at(7).is_none());
}

#[test]
fn set_dimension_rejects_overflowing_content() {
    let mut g = GridDesign::new(PanelDimension::Tall);
    g.place_at(&spec("L1"), 11).unwrap();
    assert_eq!(
        g.set_dimension(PanelDimension::Standard),
        Err(PlacementError::OutOfRange { position: 11, slots: 9 })
    );
    assert_eq!(g.dimension, PanelDimension::Tall);
}

#[test]
fn clear_empties_grid() {
    let mut g = grid();
    g.place_at(&spec("L1"), 0).unwrap();
    g.set_text(3, "x").unwrap();
    g.clear();
    assert!(g.icons.is_empty());
    assert!(g.texts.is_empty());
}
