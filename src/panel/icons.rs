//! Icon library offered by the customizer.

use serde::Serialize;

use super::{IconCategory, IconSpec};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogIcon {
    pub id: &'static str,
    pub label: &'static str,
    pub category: IconCategory,
}

impl CatalogIcon {
    #[must_use]
    pub fn spec(&self) -> IconSpec {
        IconSpec { icon_id: self.id.to_owned(), label: self.label.to_owned(), category: self.category }
    }
}

const fn icon(id: &'static str, label: &'static str, category: IconCategory) -> CatalogIcon {
    CatalogIcon { id, label, category }
}

pub const CATALOG: &[CatalogIcon] = &[
    icon("PIR", "Motion Sensor", IconCategory::Pir),
    icon("L1", "Main Light", IconCategory::Lighting),
    icon("L2", "Reading Light", IconCategory::Lighting),
    icon("L3", "Night Light", IconCategory::Lighting),
    icon("L4", "Dimmer", IconCategory::Lighting),
    icon("G1", "Group 1", IconCategory::Lighting),
    icon("G2", "Group 2", IconCategory::Lighting),
    icon("G3", "Group 3", IconCategory::Lighting),
    icon("C1", "Curtains Open", IconCategory::Curtains),
    icon("C2", "Curtains Close", IconCategory::Curtains),
    icon("C3", "Sheers", IconCategory::Curtains),
    icon("AC1", "Fan Speed", IconCategory::Climate),
    icon("AC2", "Temperature Up", IconCategory::Climate),
    icon("AC3", "Temperature Down", IconCategory::Climate),
    icon("S1", "Welcome", IconCategory::Scenes),
    icon("S2", "Master Off", IconCategory::Scenes),
    icon("S3", "Sleep", IconCategory::Scenes),
    icon("DND", "Do Not Disturb", IconCategory::Service),
    icon("PRV", "Privacy", IconCategory::Service),
    icon("MUR", "Make Up Room", IconCategory::Service),
    icon("SRV", "Service", IconCategory::Service),
    icon("BELL", "Doorbell", IconCategory::Other),
];

/// Look up a catalog icon by identifier (case-insensitive).
#[must_use]
pub fn find(id: &str) -> Option<&'static CatalogIcon> {
    let id = id.trim();
    CATALOG.iter().find(|icon| icon.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
#[path = "icons_test.rs"]
mod tests;
