//! Icon placement: cell legality and grid edits.
//!
//! DESIGN
//! ======
//! Legality depends only on the icon (identifier, label) and the cell's
//! column (`index % 3`):
//! - Do-not-disturb labels stay out of the right column.
//! - Make-up-room labels stay out of the left column.
//! - `G1`/`G2` live in the left two columns, `G3` in the right two.
//! - The motion sensor (PIR) has a fixed cell and is toggled, never dragged.
//!
//! ERROR HANDLING
//! ==============
//! Every edit validates before it mutates, so a rejected edit leaves the grid
//! untouched. Rejections tied to the LED wiring carry a `notice()` that the
//! UI shows as a blocking explanation; the rest are plain no-ops.

use serde::Serialize;

use super::{GRID_COLUMNS, GridDesign, IconCategory, IconSpec, PanelDimension, PanelMode, PlacedIcon};

const LEFT_COLUMN: usize = 0;
const RIGHT_COLUMN: usize = GRID_COLUMNS - 1;

const DND_SYNONYMS: [&str; 3] = ["dnd", "privacy", "do not disturb"];
const MUR_SYNONYMS: [&str; 3] = ["mur", "service", "make up"];

const DND_NOTICE: &str = "Do Not Disturb cannot go in the right-hand column. That column shares the \
                          room-status LED wiring with Make Up Room; place it in the left or middle column.";
const MUR_NOTICE: &str = "Make Up Room cannot go in the left-hand column. That column shares the \
                          room-status LED wiring with Do Not Disturb; place it in the middle or right column.";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("cell {position} is outside the {slots}-cell grid")]
    OutOfRange { position: usize, slots: usize },
    #[error("cell {0} is already occupied")]
    Occupied(usize),
    #[error("cell {0} holds no icon")]
    EmptyCell(usize),
    #[error("do-not-disturb icons cannot be placed in the right column (cell {0})")]
    DndRightColumn(usize),
    #[error("make-up-room icons cannot be placed in the left column (cell {0})")]
    MurLeftColumn(usize),
    #[error("icon {icon_id} is limited to the {allowed} columns (cell {position})")]
    ColumnRestricted { icon_id: String, allowed: &'static str, position: usize },
    #[error("the motion sensor has a fixed cell; toggle it instead")]
    PirFixed,
    #[error("icon is not a motion sensor")]
    NotMotionSensor,
    #[error("motion sensor cell {0} is occupied")]
    PirSlotOccupied(usize),
    #[error("text-only panels cannot hold icons")]
    IconsDisabled,
    #[error("no free cell accepts this icon")]
    NoFreeCell,
    #[error("captions need an icon in cell {0}")]
    CaptionWithoutIcon(usize),
}

impl PlacementError {
    /// Blocking explanation to show the user, if the rejection warrants one.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::DndRightColumn(_) => Some(DND_NOTICE),
            Self::MurLeftColumn(_) => Some(MUR_NOTICE),
            _ => None,
        }
    }
}

/// Room-status indicator an icon label refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    DoNotDisturb,
    MakeUpRoom,
}

/// What a drag did to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    Swapped,
    Unchanged,
}

// =============================================================================
// RULES
// =============================================================================

fn mentions(label: &str, synonyms: &[&str]) -> bool {
    let lower = label.to_lowercase();
    synonyms.iter().any(|s| lower.contains(s))
}

/// Classify a label by the indicator synonyms it contains. A label naming
/// both indicators classifies as do-not-disturb; placement still checks
/// each rule on its own.
#[must_use]
pub fn classify_label(label: &str) -> Option<Indicator> {
    if mentions(label, &DND_SYNONYMS) {
        return Some(Indicator::DoNotDisturb);
    }
    if mentions(label, &MUR_SYNONYMS) {
        return Some(Indicator::MakeUpRoom);
    }
    None
}

#[must_use]
pub fn column_of(position: usize) -> usize {
    position % GRID_COLUMNS
}

/// Check whether a non-PIR icon may sit in `position` of a `slots`-cell grid.
///
/// # Errors
///
/// Returns the rule the placement violates.
pub fn check_rules(icon_id: &str, label: &str, position: usize, slots: usize) -> Result<(), PlacementError> {
    if position >= slots {
        return Err(PlacementError::OutOfRange { position, slots });
    }
    let column = column_of(position);

    if column == RIGHT_COLUMN && mentions(label, &DND_SYNONYMS) {
        return Err(PlacementError::DndRightColumn(position));
    }
    if column == LEFT_COLUMN && mentions(label, &MUR_SYNONYMS) {
        return Err(PlacementError::MurLeftColumn(position));
    }

    let id = icon_id.trim();
    if (id.eq_ignore_ascii_case("G1") || id.eq_ignore_ascii_case("G2")) && column == RIGHT_COLUMN {
        return Err(PlacementError::ColumnRestricted { icon_id: id.to_owned(), allowed: "left two", position });
    }
    if id.eq_ignore_ascii_case("G3") && column == LEFT_COLUMN {
        return Err(PlacementError::ColumnRestricted { icon_id: id.to_owned(), allowed: "right two", position });
    }
    Ok(())
}

// =============================================================================
// GRID EDITS
// =============================================================================

impl GridDesign {
    fn ensure_in_range(&self, position: usize) -> Result<(), PlacementError> {
        let slots = self.slot_count();
        if position >= slots {
            return Err(PlacementError::OutOfRange { position, slots });
        }
        Ok(())
    }

    fn ensure_icons_allowed(&self, spec: &IconSpec) -> Result<(), PlacementError> {
        if spec.category == IconCategory::Pir {
            return Err(PlacementError::PirFixed);
        }
        if self.mode == PanelMode::TextOnly {
            return Err(PlacementError::IconsDisabled);
        }
        Ok(())
    }

    /// Whether `spec` could be click-placed into `position` right now.
    ///
    /// # Errors
    ///
    /// Returns the rejection `place_at` would produce.
    pub fn check_cell(&self, spec: &IconSpec, position: usize) -> Result<(), PlacementError> {
        self.ensure_icons_allowed(spec)?;
        check_rules(&spec.icon_id, &spec.label, position, self.slot_count())?;
        if self.icon_at(position).is_some() {
            return Err(PlacementError::Occupied(position));
        }
        Ok(())
    }

    /// Click-place an icon into a specific empty cell.
    ///
    /// # Errors
    ///
    /// Rejects occupied cells and any column rule violation.
    pub fn place_at(&mut self, spec: &IconSpec, position: usize) -> Result<PlacedIcon, PlacementError> {
        self.check_cell(spec, position)?;
        let icon = PlacedIcon::new(spec, position);
        self.icons.push(icon.clone());
        Ok(icon)
    }

    /// Place an icon into the first empty cell that accepts it.
    ///
    /// # Errors
    ///
    /// Returns `NoFreeCell` when no empty cell is legal for the icon.
    pub fn place_first_free(&mut self, spec: &IconSpec) -> Result<PlacedIcon, PlacementError> {
        self.ensure_icons_allowed(spec)?;
        let position = (0..self.slot_count())
            .find(|&p| self.check_cell(spec, p).is_ok())
            .ok_or(PlacementError::NoFreeCell)?;
        let icon = PlacedIcon::new(spec, position);
        self.icons.push(icon.clone());
        Ok(icon)
    }

    /// Drag the icon in `from` onto `to`. An empty target is a move; an
    /// occupied one is a swap. Free text travels with its cell either way.
    ///
    /// # Errors
    ///
    /// Rejects drags involving the motion sensor and any placement that would
    /// break a column rule for either icon.
    pub fn move_icon(&mut self, from: usize, to: usize) -> Result<MoveOutcome, PlacementError> {
        self.ensure_in_range(from)?;
        self.ensure_in_range(to)?;
        let slots = self.slot_count();

        let moving = self.icon_at(from).ok_or(PlacementError::EmptyCell(from))?;
        if moving.is_pir() {
            return Err(PlacementError::PirFixed);
        }
        if from == to {
            return Ok(MoveOutcome::Unchanged);
        }
        check_rules(&moving.icon_id, &moving.label, to, slots)?;

        let swapped = match self.icon_at(to) {
            Some(target) if target.is_pir() => return Err(PlacementError::PirFixed),
            Some(target) => {
                check_rules(&target.icon_id, &target.label, from, slots)?;
                true
            }
            None => false,
        };

        self.exchange_cells(from, to);
        Ok(if swapped { MoveOutcome::Swapped } else { MoveOutcome::Moved })
    }

    /// Swap two occupied cells, icons and text together.
    ///
    /// # Errors
    ///
    /// Requires both cells to hold an icon; otherwise same rules as `move_icon`.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), PlacementError> {
        self.ensure_in_range(b)?;
        if self.icon_at(b).is_none() {
            return Err(PlacementError::EmptyCell(b));
        }
        self.move_icon(a, b).map(|_| ())
    }

    fn exchange_cells(&mut self, a: usize, b: usize) {
        for icon in &mut self.icons {
            if icon.position == a {
                icon.position = b;
            } else if icon.position == b {
                icon.position = a;
            }
        }
        let text_a = self.texts.remove(&a);
        let text_b = self.texts.remove(&b);
        if let Some(text) = text_a {
            self.texts.insert(b, text);
        }
        if let Some(text) = text_b {
            self.texts.insert(a, text);
        }
    }

    /// Remove the icon in `position`. Captions go with it on `icons_text` panels.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCell` if nothing is there; the motion sensor must be toggled.
    pub fn remove_at(&mut self, position: usize) -> Result<PlacedIcon, PlacementError> {
        self.ensure_in_range(position)?;
        let index = self
            .icons
            .iter()
            .position(|icon| icon.position == position)
            .ok_or(PlacementError::EmptyCell(position))?;
        if self.icons[index].is_pir() {
            return Err(PlacementError::PirFixed);
        }
        let removed = self.icons.remove(index);
        if self.mode == PanelMode::IconsText {
            self.texts.remove(&position);
        }
        Ok(removed)
    }

    /// Switch the motion sensor on or off. Returns whether it is now present.
    ///
    /// # Errors
    ///
    /// Rejects non-PIR icons and an occupied PIR slot.
    pub fn toggle_pir(&mut self, spec: &IconSpec) -> Result<bool, PlacementError> {
        if spec.category != IconCategory::Pir {
            return Err(PlacementError::NotMotionSensor);
        }
        if self.has_pir() {
            self.icons.retain(|icon| !icon.is_pir());
            return Ok(false);
        }
        if self.mode == PanelMode::TextOnly {
            return Err(PlacementError::IconsDisabled);
        }
        let slot = self.dimension.pir_slot();
        if self.icon_at(slot).is_some() {
            return Err(PlacementError::PirSlotOccupied(slot));
        }
        self.icons.push(PlacedIcon::new(spec, slot));
        Ok(true)
    }

    /// Set or clear the free text of a cell. Blank text clears it.
    ///
    /// # Errors
    ///
    /// On `icons_text` panels a caption needs an icon in the same cell.
    pub fn set_text(&mut self, position: usize, text: &str) -> Result<(), PlacementError> {
        self.ensure_in_range(position)?;
        let text = text.trim();
        if text.is_empty() {
            self.texts.remove(&position);
            return Ok(());
        }
        if self.mode == PanelMode::IconsText && self.icon_at(position).is_none() {
            return Err(PlacementError::CaptionWithoutIcon(position));
        }
        self.texts.insert(position, text.to_owned());
        Ok(())
    }

    /// Change the panel mode, dropping whatever the new mode does not allow.
    pub fn set_mode(&mut self, mode: PanelMode) {
        match mode {
            PanelMode::TextOnly => self.icons.clear(),
            PanelMode::IconsText => {
                let occupied: Vec<usize> = self.icons.iter().map(|icon| icon.position).collect();
                self.texts.retain(|position, _| occupied.contains(position));
            }
            PanelMode::Custom => {}
        }
        self.mode = mode;
    }

    /// Change the physical size. The motion sensor follows to the new PIR slot.
    ///
    /// # Errors
    ///
    /// Rejects the change if content would fall outside the new grid or the
    /// new PIR slot is taken.
    pub fn set_dimension(&mut self, dimension: PanelDimension) -> Result<(), PlacementError> {
        let slots = dimension.slot_count();
        let overflow = self
            .icons
            .iter()
            .filter(|icon| !icon.is_pir())
            .map(|icon| icon.position)
            .chain(self.texts.keys().copied())
            .find(|&position| position >= slots);
        if let Some(position) = overflow {
            return Err(PlacementError::OutOfRange { position, slots });
        }

        let new_slot = dimension.pir_slot();
        if self.has_pir() {
            if let Some(other) = self.icon_at(new_slot)
                && !other.is_pir()
            {
                return Err(PlacementError::PirSlotOccupied(new_slot));
            }
            for icon in self.icons.iter_mut().filter(|icon| icon.is_pir()) {
                icon.position = new_slot;
            }
        }
        self.dimension = dimension;
        Ok(())
    }

    /// Remove every icon and text.
    pub fn clear(&mut self) {
        self.icons.clear();
        self.texts.clear();
    }
}

#[cfg(test)]
#[path = "placement_test.rs"]
mod tests;
