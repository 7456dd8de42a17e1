use std::collections::HashSet;

use super::NodeId;

/// Node ids whose render-affecting state changed since the last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    changed: HashSet<NodeId>,
    removed: HashSet<NodeId>,
    order_changed: bool,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_changed(&mut self, id: NodeId) {
        self.removed.remove(&id);
        self.changed.insert(id);
    }

    pub fn mark_removed(&mut self, id: NodeId) {
        self.changed.remove(&id);
        self.removed.insert(id);
    }

    /// z-order changed; cached items stay valid but must be resorted.
    pub fn mark_order(&mut self) {
        self.order_changed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty() && !self.order_changed
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.changed.contains(&id)
    }

    pub fn changed(&self) -> &HashSet<NodeId> {
        &self.changed
    }

    pub fn removed(&self) -> &HashSet<NodeId> {
        &self.removed
    }

    pub fn order_changed(&self) -> bool {
        self.order_changed
    }

    /// Folds a later delta into this one.
    pub fn merge(&mut self, later: DirtySet) {
        for id in later.removed {
            self.mark_removed(id);
        }
        for id in later.changed {
            self.mark_changed(id);
        }
        self.order_changed |= later.order_changed;
    }

    /// Moves the current contents out, leaving the set empty.
    pub fn take(&mut self) -> DirtySet {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_overrides_change_and_back() {
        let id = NodeId::new();
        let mut d = DirtySet::new();
        d.mark_changed(id);
        d.mark_removed(id);
        assert!(!d.contains(id));
        assert!(d.removed().contains(&id));
        d.mark_changed(id);
        assert!(d.contains(id));
        assert!(d.removed().is_empty());
    }

    #[test]
    fn take_leaves_empty() {
        let mut d = DirtySet::new();
        d.mark_order();
        assert!(!d.is_empty());
        let taken = d.take();
        assert!(taken.order_changed());
        assert!(d.is_empty());
    }

    #[test]
    fn merge_applies_later_delta() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let mut first = DirtySet::new();
        first.mark_changed(a);
        let mut later = DirtySet::new();
        later.mark_removed(a);
        later.mark_changed(b);
        first.merge(later);
        assert!(!first.contains(a));
        assert!(first.contains(b));
        assert!(first.removed().contains(&a));
    }
}
