use std::collections::BTreeSet;

use shared::domain::AccessoryId;

/// Optional accessories chosen for the current item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<AccessoryId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `id` when present, inserts it otherwise. Returns whether `id`
    /// is selected afterwards.
    pub fn toggle(&mut self, id: AccessoryId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn reset(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: AccessoryId) -> bool {
        self.ids.contains(&id)
    }

    pub fn retain(&mut self, keep: impl FnMut(&AccessoryId) -> bool) {
        self.ids.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AccessoryId> + '_ {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_inserts_then_removes() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(AccessoryId(2)));
        assert!(selection.contains(AccessoryId(2)));
        assert!(!selection.toggle(AccessoryId(2)));
        assert!(selection.is_empty());
    }

    #[test]
    fn even_toggle_counts_restore_membership() {
        let ids = [AccessoryId(1), AccessoryId(2), AccessoryId(3)];
        for toggles in 0..8 {
            let mut selection = SelectionSet::new();
            selection.toggle(AccessoryId(1));
            let before: Vec<bool> = ids.iter().map(|id| selection.contains(*id)).collect();

            for _ in 0..toggles * 2 {
                selection.toggle(AccessoryId(2));
                selection.toggle(AccessoryId(1));
            }

            let after: Vec<bool> = ids.iter().map(|id| selection.contains(*id)).collect();
            assert_eq!(before, after, "after {} toggle pairs", toggles);
        }
    }

    #[test]
    fn reset_and_retain_drop_members() {
        let mut selection = SelectionSet::new();
        selection.toggle(AccessoryId(1));
        selection.toggle(AccessoryId(2));
        selection.toggle(AccessoryId(3));

        selection.retain(|id| id.0 != 2);
        assert_eq!(
            selection.iter().collect::<Vec<_>>(),
            vec![AccessoryId(1), AccessoryId(3)]
        );

        selection.reset();
        assert_eq!(selection.len(), 0);
    }
}
