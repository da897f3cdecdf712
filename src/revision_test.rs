use super::*;

#[test]
fn split_revision_parses_suffix() {
    assert_eq!(split_revision("Lobby (rev3)"), ("Lobby", Some(3)));
    assert_eq!(split_revision("Lobby(rev12)  "), ("Lobby", Some(12)));
    assert_eq!(split_revision("Lobby"), ("Lobby", None));
}

#[test]
fn split_revision_only_matches_trailing_suffix() {
    assert_eq!(split_revision("A (rev1) copy"), ("A (rev1) copy", None));
    assert_eq!(split_revision("A (rev1) (rev2)"), ("A (rev1)", Some(2)));
}

#[test]
fn split_revision_ignores_overflowing_numbers() {
    let name = "Big (rev99999999999999)";
    assert_eq!(split_revision(name), (name, None));
}

#[test]
fn next_revision_increments_suffix() {
    assert_eq!(next_revision_name("Suite (rev0)"), "Suite (rev1)");
    assert_eq!(next_revision_name("Suite (rev9)"), "Suite (rev10)");
}

#[test]
fn next_revision_of_bare_name_is_rev1() {
    assert_eq!(next_revision_name("Suite"), "Suite (rev1)");
}

#[test]
fn allocate_takes_max_plus_one() {
    let existing = ["X (rev0)", "X (rev1)"];
    assert_eq!(format_revision("X", allocate_revision("X", existing)), "X (rev2)");
}

#[test]
fn allocate_first_save_is_rev0() {
    assert_eq!(format_revision("Foo", allocate_revision("Foo", std::iter::empty())), "Foo (rev0)");
}

#[test]
fn allocate_ignores_other_bases() {
    let existing = ["Foo (rev4)", "Foobar (rev9)", "Fo (rev2)"];
    assert_eq!(allocate_revision("Foo", existing), 5);
}

#[test]
fn allocate_counts_bare_name_as_rev0() {
    assert_eq!(allocate_revision("X", ["X"]), 1);
}

#[test]
fn allocate_uses_max_not_count() {
    let existing = ["X (rev0)", "X (rev7)"];
    assert_eq!(allocate_revision("X", existing), 8);
}

#[test]
fn allocate_accepts_suffixed_base() {
    let existing = ["X (rev0)", "X (rev1)"];
    assert_eq!(allocate_revision("X (rev0)", existing), 2);
}

#[test]
fn split_bare_name_has_no_revision() {
    assert_eq!(split_revision("Plain"), ("Plain", None));
    assert_eq!(split_revision("Plain (rev5)"), ("Plain", Some(5)));
    assert_eq!(base_name("Plain (rev5)"), "Plain");
}
