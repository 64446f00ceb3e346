//! Selection mode state machine.
//!
//! ```text
//!            set_mode / menu
//!   ┌───────────┐ ───────▶ ┌────────┐
//!   │ Reference │          │ Target │──▶ select_target(id)
//!   └───────────┘ ◀─────── └────────┘
//! ```
//!
//! In `Reference` mode a selection is assembled into the reference cloud.
//! In `Target` mode the first selected id becomes the scan moved by the
//! handle. There is no terminal state.

use crate::io::messages::SelectionMode;

/// Current mode plus the scan being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    mode: SelectionMode,
    active_target: Option<i64>,
}

impl SelectionState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            active_target: None,
        }
    }

    #[inline]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Id whose scan follows the handle.
    #[inline]
    pub fn active_target(&self) -> Option<i64> {
        self.active_target
    }

    /// Switch mode. Returns whether it changed.
    pub fn set_mode(&mut self, mode: SelectionMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    /// Record `id` as the active target.
    ///
    /// Only meaningful in `Target` mode; returns false (and changes nothing)
    /// otherwise.
    pub fn select_target(&mut self, id: i64) -> bool {
        if self.mode != SelectionMode::Target {
            return false;
        }
        self.active_target = Some(id);
        true
    }

    /// Forget the active target, e.g. after its pose disappeared on reload.
    pub fn clear_target(&mut self) {
        self.active_target = None;
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(SelectionMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mode_reports_change() {
        let mut state = SelectionState::new(SelectionMode::Reference);
        assert!(!state.set_mode(SelectionMode::Reference));
        assert!(state.set_mode(SelectionMode::Target));
        assert_eq!(state.mode(), SelectionMode::Target);
    }

    #[test]
    fn test_select_target_only_in_target_mode() {
        let mut state = SelectionState::new(SelectionMode::Reference);
        assert!(!state.select_target(4));
        assert_eq!(state.active_target(), None);

        state.set_mode(SelectionMode::Target);
        assert!(state.select_target(4));
        assert_eq!(state.active_target(), Some(4));
    }

    #[test]
    fn test_target_survives_mode_switch() {
        let mut state = SelectionState::new(SelectionMode::Target);
        state.select_target(8);
        state.set_mode(SelectionMode::Reference);
        assert_eq!(state.active_target(), Some(8));
    }

    #[test]
    fn test_default_is_target() {
        assert_eq!(SelectionState::default().mode(), SelectionMode::Target);
    }
}
