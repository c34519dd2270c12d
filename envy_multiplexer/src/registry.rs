//! Ordered collection of panes with a single active pane.

use log::info;

use crate::error::{MuxError, MuxResult};
use crate::pane::{Pane, PaneId};
use crate::process::Completion;

/// Owner of every pane.
///
/// The active pane is tracked as an index into `panes`, so removing or
/// reordering panes can never leave a dangling reference. The registry is
/// never empty.
#[derive(Debug)]
pub struct PaneRegistry {
    panes: Vec<Pane>,
    active: usize,
    /// Counter for generating unique pane ids.
    next_pane_id: u32,
}

impl Default for PaneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneRegistry {
    /// Create a registry with one initial pane.
    pub fn new() -> Self {
        Self { panes: vec![Pane::new(PaneId(1))], active: 0, next_pane_id: 2 }
    }

    /// Add a new pane, make it active, and return its id.
    pub fn create_pane(&mut self) -> PaneId {
        let id = PaneId(self.next_pane_id);
        self.next_pane_id += 1;
        self.panes.push(Pane::new(id));
        self.active = self.panes.len() - 1;
        info!("Created pane {id}");
        id
    }

    /// Close the pane with the given id, killing its process first.
    ///
    /// The last remaining pane cannot be closed.
    pub fn close_pane(&mut self, id: PaneId) -> MuxResult<()> {
        let idx = self.index_of(id).ok_or(MuxError::PaneNotFound(id))?;
        if self.panes.len() == 1 {
            return Err(MuxError::LastPane);
        }

        let pane = self.panes.remove(idx);
        pane.terminate();
        drop(pane);

        if idx < self.active || self.active >= self.panes.len() {
            self.active = self.active.saturating_sub(1).min(self.panes.len() - 1);
        }
        info!("Closed pane {id}");
        Ok(())
    }

    /// Close the active pane.
    pub fn close_active(&mut self) -> MuxResult<()> {
        let id = self.active_pane().id();
        self.close_pane(id)
    }

    /// Focus the pane at `idx`; out-of-range indices are ignored.
    pub fn set_active(&mut self, idx: usize) {
        if idx < self.panes.len() {
            self.active = idx;
        }
    }

    /// Focus the next pane, stopping at the last one.
    pub fn focus_next(&mut self) {
        self.set_active(self.active + 1);
    }

    /// Focus the previous pane, stopping at the first one.
    pub fn focus_prev(&mut self) {
        if self.active > 0 {
            self.active -= 1;
        }
    }

    /// Index of the active pane.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active pane.
    pub fn active_pane(&self) -> &Pane {
        &self.panes[self.active]
    }

    /// Mutable access to the active pane.
    pub fn active_pane_mut(&mut self) -> &mut Pane {
        &mut self.panes[self.active]
    }

    /// Look up a pane by id.
    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.iter().find(|p| p.id() == id)
    }

    /// Look up a pane by id, mutably.
    pub fn get_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.id() == id)
    }

    /// Position of a pane in tab order.
    pub fn index_of(&self, id: PaneId) -> Option<usize> {
        self.panes.iter().position(|p| p.id() == id)
    }

    /// All panes in tab order.
    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    /// Number of panes.
    pub fn len(&self) -> usize {
        self.panes.len()
    }

    /// Always `false`; the registry keeps at least one pane.
    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Apply a completion notification to the pane it belongs to.
    ///
    /// Completions for panes that were closed in the meantime are dropped.
    /// Returns whether a running pane went back to idle.
    pub fn complete(&mut self, completion: &Completion) -> bool {
        match self.get_mut(completion.pane_id) {
            Some(pane) => pane.finish(&completion.outcome),
            None => false,
        }
    }

    /// Kill every running process.
    pub fn terminate_all(&self) {
        for pane in &self.panes {
            pane.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExitOutcome;

    #[test]
    fn starts_with_one_pane() {
        let reg = PaneRegistry::new();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.active_index(), 0);
        assert_eq!(reg.active_pane().id(), PaneId(1));
    }

    #[test]
    fn create_pane_switches_active() {
        let mut reg = PaneRegistry::new();
        let id = reg.create_pane();
        assert_eq!(id, PaneId(2));
        assert_eq!(reg.active_index(), 1);
        assert_eq!(reg.active_pane().id(), id);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut reg = PaneRegistry::new();
        let a = reg.create_pane();
        reg.close_pane(a).unwrap();
        let b = reg.create_pane();
        assert_ne!(a, b);
    }

    #[test]
    fn last_pane_cannot_be_closed() {
        let mut reg = PaneRegistry::new();
        assert!(matches!(reg.close_active(), Err(MuxError::LastPane)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn close_unknown_pane() {
        let mut reg = PaneRegistry::new();
        reg.create_pane();
        assert!(matches!(reg.close_pane(PaneId(99)), Err(MuxError::PaneNotFound(PaneId(99)))));
    }

    #[test]
    fn close_active_last_clamps_index() {
        let mut reg = PaneRegistry::new();
        reg.create_pane();
        reg.create_pane();
        reg.close_active().unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.active_index(), 1);
    }

    #[test]
    fn close_before_active_keeps_focus() {
        let mut reg = PaneRegistry::new();
        let second = reg.create_pane();
        let third = reg.create_pane();
        reg.close_pane(second).unwrap();
        assert_eq!(reg.active_pane().id(), third);
    }

    #[test]
    fn close_after_active_keeps_focus() {
        let mut reg = PaneRegistry::new();
        let second = reg.create_pane();
        reg.set_active(0);
        reg.close_pane(second).unwrap();
        assert_eq!(reg.active_pane().id(), PaneId(1));
    }

    #[test]
    fn set_active_out_of_range_is_noop() {
        let mut reg = PaneRegistry::new();
        reg.create_pane();
        reg.set_active(7);
        assert_eq!(reg.active_index(), 1);
    }

    #[test]
    fn focus_does_not_wrap() {
        let mut reg = PaneRegistry::new();
        reg.create_pane();
        reg.focus_next();
        assert_eq!(reg.active_index(), 1);
        reg.focus_prev();
        reg.focus_prev();
        assert_eq!(reg.active_index(), 0);
    }

    #[test]
    fn completion_for_closed_pane_is_dropped() {
        let mut reg = PaneRegistry::new();
        let completion = Completion { pane_id: PaneId(42), outcome: ExitOutcome::Success };
        assert!(!reg.complete(&completion));
    }
}
