//! Panel designs: the typed shape of one configured hardware panel.
//!
//! DESIGN
//! ======
//! Every panel type is a three-column grid of placement cells. `PanelDesign`
//! is a tagged union over the supported hardware types so that stored design
//! blobs are validated when they cross into the server instead of being read
//! as untyped JSON further down.
//!
//! INVARIANTS
//! ==========
//! - At most one `PlacedIcon` per cell.
//! - At most one motion sensor (PIR), and only on the dimension's PIR slot.
//! - Icon placement obeys the column rules in [`placement`].
//! - Free text is gated by [`PanelMode`].

pub mod icons;
pub mod placement;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use placement::{MoveOutcome, PlacementError};

/// Number of columns in every placement grid.
pub const GRID_COLUMNS: usize = 3;

const MIN_FONT_SIZE: u8 = 8;
const MAX_FONT_SIZE: u8 = 48;
const MIN_ICON_SIZE: u8 = 12;
const MAX_ICON_SIZE: u8 = 96;

// =============================================================================
// ENUMS
// =============================================================================

/// Physical size variant of a panel. Determines grid size and PIR slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelDimension {
    #[default]
    Standard,
    Tall,
}

impl PanelDimension {
    #[must_use]
    pub fn slot_count(self) -> usize {
        match self {
            Self::Standard => 9,
            Self::Tall => 12,
        }
    }

    /// Cell reserved for the motion sensor when it is switched on.
    #[must_use]
    pub fn pir_slot(self) -> usize {
        match self {
            Self::Standard => 7,
            Self::Tall => 10,
        }
    }
}

/// What a cell may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelMode {
    /// Icon, text, both, or neither.
    #[default]
    Custom,
    /// Text is a caption and needs an icon in the same cell.
    IconsText,
    /// No icons at all.
    TextOnly,
}

/// Semantic icon category. Only `Pir` changes placement behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IconCategory {
    Pir,
    Lighting,
    Curtains,
    Climate,
    Scenes,
    Service,
    #[serde(other)]
    Other,
}

/// Supported hardware panel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelType {
    Sp,
    Tag,
}

impl PanelType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sp => "SP",
            Self::Tag => "TAG",
        }
    }

    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SP" => Some(Self::Sp),
            "TAG" => Some(Self::Tag),
            _ => None,
        }
    }

    fn supports(self, dimension: PanelDimension) -> bool {
        match self {
            Self::Sp => dimension == PanelDimension::Standard,
            Self::Tag => true,
        }
    }
}

// =============================================================================
// ICONS
// =============================================================================

/// Identity of an icon independent of where it sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSpec {
    pub icon_id: String,
    pub label: String,
    pub category: IconCategory,
}

/// An icon placed into one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedIcon {
    pub id: Uuid,
    pub icon_id: String,
    pub label: String,
    pub category: IconCategory,
    pub position: usize,
}

impl PlacedIcon {
    #[must_use]
    pub fn new(spec: &IconSpec, position: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            icon_id: spec.icon_id.clone(),
            label: spec.label.clone(),
            category: spec.category,
            position,
        }
    }

    #[must_use]
    pub fn is_pir(&self) -> bool {
        self.category == IconCategory::Pir
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Visual options chosen in the design steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelStyle {
    pub background_color: String,
    pub font: String,
    pub icon_color: String,
    pub text_color: String,
    pub font_size: u8,
    pub icon_size: u8,
    pub backbox: String,
    pub extra_comments: String,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            background_color: "#1A1A1A".to_owned(),
            font: "Arial".to_owned(),
            icon_color: "#FFFFFF".to_owned(),
            text_color: "#FFFFFF".to_owned(),
            font_size: 12,
            icon_size: 40,
            backbox: "standard".to_owned(),
            extra_comments: String::new(),
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// GRID DESIGN
// =============================================================================

/// Cell contents and styling shared by every panel type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDesign {
    #[serde(default)]
    pub dimension: PanelDimension,
    #[serde(default)]
    pub mode: PanelMode,
    #[serde(default)]
    pub icons: Vec<PlacedIcon>,
    /// Free text keyed by cell index.
    #[serde(default, with = "cell_texts")]
    pub texts: BTreeMap<usize, String>,
    #[serde(default)]
    pub style: PanelStyle,
}

impl GridDesign {
    #[must_use]
    pub fn new(dimension: PanelDimension) -> Self {
        Self { dimension, ..Self::default() }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.dimension.slot_count()
    }

    #[must_use]
    pub fn icon_at(&self, position: usize) -> Option<&PlacedIcon> {
        self.icons.iter().find(|icon| icon.position == position)
    }

    #[must_use]
    pub fn has_pir(&self) -> bool {
        self.icons.iter().any(PlacedIcon::is_pir)
    }

    /// Check every stored invariant of the grid.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), PanelValidationError> {
        let slots = self.slot_count();
        let mut seen = vec![false; slots];
        let mut pir_count = 0_usize;

        if self.mode == PanelMode::TextOnly && !self.icons.is_empty() {
            return Err(PanelValidationError::IconsInTextOnly);
        }

        for icon in &self.icons {
            if icon.position >= slots {
                return Err(PanelValidationError::PositionOutOfRange { position: icon.position, slots });
            }
            if seen[icon.position] {
                return Err(PanelValidationError::DuplicatePosition(icon.position));
            }
            seen[icon.position] = true;

            if icon.is_pir() {
                pir_count += 1;
                let expected = self.dimension.pir_slot();
                if icon.position != expected {
                    return Err(PanelValidationError::PirOffSlot { position: icon.position, expected });
                }
            } else {
                placement::check_rules(&icon.icon_id, &icon.label, icon.position, slots)?;
            }
        }
        if pir_count > 1 {
            return Err(PanelValidationError::MultiplePir(pir_count));
        }

        for position in self.texts.keys() {
            if *position >= slots {
                return Err(PanelValidationError::PositionOutOfRange { position: *position, slots });
            }
            if self.mode == PanelMode::IconsText && !seen[*position] {
                return Err(PanelValidationError::CaptionWithoutIcon(*position));
            }
        }

        self.validate_style()
    }

    fn validate_style(&self) -> Result<(), PanelValidationError> {
        let style = &self.style;
        for (field, value) in [
            ("background_color", &style.background_color),
            ("icon_color", &style.icon_color),
            ("text_color", &style.text_color),
        ] {
            if !is_hex_color(value) {
                return Err(PanelValidationError::InvalidColor { field, value: value.clone() });
            }
        }
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&style.font_size) {
            return Err(PanelValidationError::FontSize(style.font_size));
        }
        if !(MIN_ICON_SIZE..=MAX_ICON_SIZE).contains(&style.icon_size) {
            return Err(PanelValidationError::IconSize(style.icon_size));
        }
        Ok(())
    }
}

/// Wire form of the text map: `[{"position": 4, "text": "…"}]`. Integer map
/// keys do not survive the buffering serde does for tagged enums.
mod cell_texts {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct CellText {
        position: usize,
        text: String,
    }

    pub fn serialize<S: Serializer>(texts: &BTreeMap<usize, String>, serializer: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<CellText> = texts
            .iter()
            .map(|(position, text)| CellText { position: *position, text: text.clone() })
            .collect();
        cells.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<usize, String>, D::Error> {
        let cells = Vec::<CellText>::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|cell| (cell.position, cell.text)).collect())
    }
}

// =============================================================================
// PANEL DESIGN
// =============================================================================

/// One panel, tagged by hardware type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PanelDesign {
    #[serde(rename = "SP")]
    Sp(GridDesign),
    #[serde(rename = "TAG")]
    Tag(GridDesign),
}

impl PanelDesign {
    #[must_use]
    pub fn new(panel_type: PanelType, dimension: PanelDimension) -> Self {
        let grid = GridDesign::new(dimension);
        match panel_type {
            PanelType::Sp => Self::Sp(grid),
            PanelType::Tag => Self::Tag(grid),
        }
    }

    #[must_use]
    pub fn panel_type(&self) -> PanelType {
        match self {
            Self::Sp(_) => PanelType::Sp,
            Self::Tag(_) => PanelType::Tag,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &GridDesign {
        match self {
            Self::Sp(grid) | Self::Tag(grid) => grid,
        }
    }

    pub fn grid_mut(&mut self) -> &mut GridDesign {
        match self {
            Self::Sp(grid) | Self::Tag(grid) => grid,
        }
    }

    /// Validate a design at the data boundary.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), PanelValidationError> {
        let panel_type = self.panel_type();
        let dimension = self.grid().dimension;
        if !panel_type.supports(dimension) {
            return Err(PanelValidationError::UnsupportedDimension { panel_type: panel_type.as_str(), dimension });
        }
        self.grid().validate()
    }

    /// Deserialize and validate a design blob.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the JSON does not match any panel type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, PanelValidationError> {
        let design: Self =
            serde_json::from_value(value).map_err(|e| PanelValidationError::Malformed(e.to_string()))?;
        design.validate()?;
        Ok(design)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelValidationError {
    #[error("malformed panel design: {0}")]
    Malformed(String),
    #[error("{panel_type} panels do not come in the {dimension:?} size")]
    UnsupportedDimension { panel_type: &'static str, dimension: PanelDimension },
    #[error("cell {position} is outside the {slots}-cell grid")]
    PositionOutOfRange { position: usize, slots: usize },
    #[error("more than one icon in cell {0}")]
    DuplicatePosition(usize),
    #[error("panel holds {0} motion sensors; at most one is allowed")]
    MultiplePir(usize),
    #[error("motion sensor sits in cell {position}, expected cell {expected}")]
    PirOffSlot { position: usize, expected: usize },
    #[error("text-only panels cannot hold icons")]
    IconsInTextOnly,
    #[error("caption in cell {0} has no icon")]
    CaptionWithoutIcon(usize),
    #[error("invalid {field} color: {value}")]
    InvalidColor { field: &'static str, value: String },
    #[error("font size {0} is out of range")]
    FontSize(u8),
    #[error("icon size {0} is out of range")]
    IconSize(u8),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
