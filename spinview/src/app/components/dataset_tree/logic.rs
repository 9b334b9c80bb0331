use crate::error::CoreError;

use super::{ItemKind, RowHit, SelectionTree, ToggleResult, TreeItem, TreeItemId};

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a top-level group row.
    pub fn add_group(&mut self, label: &str) -> TreeItemId {
        self.insert(ItemKind::Group, label, None)
    }

    /// Insert a leaf row, under `parent` or at the top level.
    pub fn add_leaf(&mut self, parent: Option<TreeItemId>, label: &str) -> TreeItemId {
        self.insert(ItemKind::Leaf, label, parent)
    }

    fn insert(&mut self, kind: ItemKind, label: &str, parent: Option<TreeItemId>) -> TreeItemId {
        let id = TreeItemId(self.next_id);
        self.next_id += 1;
        self.items.insert(
            id,
            TreeItem {
                kind,
                label: label.to_owned(),
                parent,
                selected: false,
                children: Vec::new(),
            },
        );
        match parent.and_then(|pid| self.items.get_mut(&pid)) {
            Some(group) => group.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn get(&self, id: TreeItemId) -> Option<&TreeItem> {
        self.items.get(&id)
    }

    pub fn set_label(&mut self, id: TreeItemId, label: &str) {
        if let Some(item) = self.items.get_mut(&id) {
            label.clone_into(&mut item.label);
        }
    }

    pub fn is_leaf(&self, id: TreeItemId) -> bool {
        self.items
            .get(&id)
            .map(|item| item.kind == ItemKind::Leaf)
            .unwrap_or(false)
    }

    pub fn is_group(&self, id: TreeItemId) -> bool {
        self.items
            .get(&id)
            .map(|item| item.kind == ItemKind::Group)
            .unwrap_or(false)
    }

    pub fn children_of(&self, id: TreeItemId) -> &[TreeItemId] {
        self.items
            .get(&id)
            .map(|item| item.children.as_slice())
            .unwrap_or(&[])
    }

    /// All leaf ids below `id` (the id itself if it is a leaf), in tree
    /// order. Nesting of groups is not forbidden by construction, so this
    /// walks recursively.
    fn leaf_descendants(&self, id: TreeItemId) -> Vec<TreeItemId> {
        if self.is_leaf(id) {
            return vec![id];
        }
        self.children_of(id)
            .iter()
            .flat_map(|child| self.leaf_descendants(*child))
            .collect()
    }

    /// How deep `id` sits in the hierarchy, following the parent links
    /// (0 for top-level rows).
    pub fn depth_of(&self, id: TreeItemId) -> usize {
        let mut depth = 0;
        let mut parent = self.items.get(&id).and_then(|item| item.parent);
        while let Some(pid) = parent {
            depth += 1;
            parent = self.items.get(&pid).and_then(|item| item.parent);
        }
        depth
    }

    pub fn selected_leaf_ids(&self) -> Vec<TreeItemId> {
        self.flattened_rows()
            .into_iter()
            .filter_map(|(id, _)| {
                let item = &self.items[&id];
                (item.kind == ItemKind::Leaf && item.selected).then_some(id)
            })
            .collect()
    }

    /// Whether the glyph of `id` renders as selected: a leaf's own flag,
    /// or for groups whether all of its (at least one) leaves are selected.
    pub fn renders_selected(&self, id: TreeItemId) -> bool {
        let Some(item) = self.items.get(&id) else {
            return false;
        };
        match item.kind {
            ItemKind::Leaf => item.selected,
            ItemKind::Group => {
                let leaves = self.leaf_descendants(id);
                !leaves.is_empty() && leaves.iter().all(|leaf| self.items[leaf].selected)
            }
        }
    }

    /// Compute the selection delta a toggle of `id` would produce, without
    /// mutating anything. Callers validate resources against the delta,
    /// then commit it with [`SelectionTree::apply_delta`].
    pub fn toggle_delta(&self, id: TreeItemId) -> Result<ToggleResult, CoreError> {
        let item = self
            .items
            .get(&id)
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown tree item {:?}", id)))?;

        let mut result = ToggleResult::default();
        match item.kind {
            ItemKind::Leaf => {
                if item.selected {
                    result.removed.push(id);
                } else {
                    result.added.push(id);
                }
            }
            ItemKind::Group => {
                let leaves = self.leaf_descendants(id);
                let all_selected =
                    !leaves.is_empty() && leaves.iter().all(|leaf| self.items[leaf].selected);
                if all_selected {
                    // All selected: the whole group toggles off.
                    result.removed = leaves;
                } else {
                    // Select what is missing; already-selected leaves stay
                    // untouched.
                    result.added = leaves
                        .into_iter()
                        .filter(|leaf| !self.items[leaf].selected)
                        .collect();
                }
            }
        }
        Ok(result)
    }

    pub fn apply_delta(&mut self, delta: &ToggleResult) {
        for id in &delta.added {
            if let Some(item) = self.items.get_mut(id) {
                item.selected = true;
            }
        }
        for id in &delta.removed {
            if let Some(item) = self.items.get_mut(id) {
                item.selected = false;
            }
        }
    }

    /// Toggle a row: flip a leaf, cascade a group (select-all unless all
    /// are already selected, in which case deselect-all).
    pub fn toggle(&mut self, id: TreeItemId) -> Result<ToggleResult, CoreError> {
        let delta = self.toggle_delta(id)?;
        self.apply_delta(&delta);
        Ok(delta)
    }

    /// Force every leaf back to deselected; returns the ids that were
    /// selected.
    pub fn deselect_all(&mut self) -> Vec<TreeItemId> {
        let selected = self.selected_leaf_ids();
        for id in &selected {
            // Toggling a selected leaf flips it off; the ids come from the
            // tree itself, so this cannot fail.
            let _ = self.toggle(*id);
        }
        selected
    }

    /// Hit-test a pointer position against the toggle cells recorded by
    /// the last render. Positions outside every toggle cell (the tree
    /// indicator column, blank space) yield `None` and mutate nothing.
    pub fn click_at(&self, pos: egui::Pos2) -> Option<TreeItemId> {
        self.layout
            .iter()
            .find(|hit| hit.rect.contains(pos))
            .map(|hit| hit.item)
    }

    /// Rows in render order with their indentation depth.
    pub fn flattened_rows(&self) -> Vec<(TreeItemId, usize)> {
        let mut rows = Vec::with_capacity(self.items.len());
        for root in &self.roots {
            self.push_rows(*root, &mut rows);
        }
        rows
    }

    fn push_rows(&self, id: TreeItemId, rows: &mut Vec<(TreeItemId, usize)>) {
        rows.push((id, self.depth_of(id)));
        for child in self.children_of(id).to_vec() {
            self.push_rows(child, rows);
        }
    }

    pub(super) fn begin_layout(&mut self) {
        self.layout.clear();
    }

    pub(super) fn record_row(&mut self, hit: RowHit) {
        self.layout.push(hit);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, Rect};

    fn tree_with_group() -> (SelectionTree, TreeItemId, [TreeItemId; 3]) {
        let mut tree = SelectionTree::new();
        let group = tree.add_group("Batch1");
        let a = tree.add_leaf(Some(group), "Sample A");
        let b = tree.add_leaf(Some(group), "Sample B");
        let c = tree.add_leaf(Some(group), "Sample C");
        (tree, group, [a, b, c])
    }

    #[test]
    fn test_cascade_selects_then_deselects_all() {
        let (mut tree, group, [a, b, c]) = tree_with_group();

        let first = tree.toggle(group).unwrap();
        assert_eq!(first.added, vec![a, b, c]);
        assert!(first.removed.is_empty());
        assert!(tree.renders_selected(group));

        let second = tree.toggle(group).unwrap();
        assert!(second.added.is_empty());
        assert_eq!(second.removed, vec![a, b, c]);
        assert!(tree.selected_leaf_ids().is_empty());
    }

    #[test]
    fn test_partial_selection_cascade_leaves_selected_untouched() {
        let (mut tree, group, [a, b, c]) = tree_with_group();
        tree.toggle(a).unwrap();

        let delta = tree.toggle(group).unwrap();
        assert_eq!(delta.added, vec![b, c]);
        assert!(delta.removed.is_empty());
        assert_eq!(tree.selected_leaf_ids(), vec![a, b, c]);
    }

    #[test]
    fn test_leaf_toggle_round_trip() {
        let (mut tree, _, [a, _, _]) = tree_with_group();
        let on = tree.toggle(a).unwrap();
        assert_eq!(on.added, vec![a]);
        let off = tree.toggle(a).unwrap();
        assert_eq!(off.removed, vec![a]);
        assert!(tree.selected_leaf_ids().is_empty());
    }

    #[test]
    fn test_group_glyph_follows_children() {
        let (mut tree, group, [a, b, c]) = tree_with_group();
        assert!(!tree.renders_selected(group));
        tree.toggle(a).unwrap();
        tree.toggle(b).unwrap();
        assert!(!tree.renders_selected(group));
        tree.toggle(c).unwrap();
        assert!(tree.renders_selected(group));
    }

    #[test]
    fn test_empty_group_toggles_to_nothing() {
        let mut tree = SelectionTree::new();
        let group = tree.add_group("empty");
        let delta = tree.toggle(group).unwrap();
        assert!(delta.is_empty());
        assert!(!tree.renders_selected(group));
    }

    #[test]
    fn test_toggle_unknown_id_is_invalid_argument() {
        let (mut tree, _, _) = tree_with_group();
        let bogus = TreeItemId(999);
        assert!(matches!(
            tree.toggle(bogus),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_click_at_hits_toggle_cell_only() {
        let (mut tree, _, [a, _, _]) = tree_with_group();
        tree.begin_layout();
        tree.record_row(RowHit {
            rect: Rect::from_min_max(pos2(25.0, 0.0), pos2(200.0, 20.0)),
            item: a,
        });
        // inside the toggle cell
        assert_eq!(tree.click_at(pos2(30.0, 10.0)), Some(a));
        // the indicator column left of the cell
        assert_eq!(tree.click_at(pos2(10.0, 10.0)), None);
        // below every row
        assert_eq!(tree.click_at(pos2(30.0, 50.0)), None);
    }

    #[test]
    fn test_deselect_all_reports_previously_selected() {
        let (mut tree, group, [a, b, c]) = tree_with_group();
        tree.toggle(group).unwrap();
        let cleared = tree.deselect_all();
        assert_eq!(cleared, vec![a, b, c]);
        assert!(tree.selected_leaf_ids().is_empty());
        assert!(tree.deselect_all().is_empty());
    }
}
