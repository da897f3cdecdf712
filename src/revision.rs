//! Revision naming for saved designs.
//!
//! DESIGN
//! ======
//! A saved design is named `"<base> (rev<N>)"`. A name without the suffix is
//! treated as revision 0 everywhere, so the first save of a base is `(rev0)`
//! and the name that follows a bare `"X"` is `"X (rev1)"`.
//!
//! The functions here are pure. Uniqueness under concurrent saves is the
//! caller's job (see `services::project::save_design_revision`).

use std::sync::LazyLock;

use regex::Regex;

static REVISION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\(rev(\d+)\)\s*$").expect("revision suffix pattern is valid"));

/// Split a design name into its base and explicit revision number, if any.
#[must_use]
pub fn split_revision(name: &str) -> (&str, Option<u32>) {
    let Some(caps) = REVISION_SUFFIX.captures(name) else {
        return (name.trim(), None);
    };
    let base = caps.get(1).map_or("", |m| m.as_str()).trim();
    let revision = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
    match revision {
        Some(revision) => (base, Some(revision)),
        // Overflowing digits: keep the whole name as the base.
        None => (name.trim(), None),
    }
}

/// Base name with any revision suffix removed.
#[must_use]
pub fn base_name(name: &str) -> &str {
    split_revision(name).0
}

#[must_use]
pub fn format_revision(base: &str, revision: u32) -> String {
    format!("{} (rev{revision})", base.trim())
}

/// Name that follows `name`: `(revN)` becomes `(revN+1)`, a bare name
/// becomes `(rev1)`.
#[must_use]
pub fn next_revision_name(name: &str) -> String {
    let (base, revision) = split_revision(name);
    format_revision(base, revision.map_or(1, |n| n.saturating_add(1)))
}

/// Revision number the next save of `base` should get, given the names
/// already saved in the same scope. `0` when nothing shares the base.
#[must_use]
pub fn allocate_revision<'a, I>(base: &str, existing: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let base = base_name(base);
    existing
        .into_iter()
        .filter_map(|name| {
            let (other_base, revision) = split_revision(name);
            (other_base == base).then(|| revision.unwrap_or(0))
        })
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

#[cfg(test)]
#[path = "revision_test.rs"]
mod tests;
