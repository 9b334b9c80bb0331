mod logic;
mod ui;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const GLYPH_SELECTED: &str = "⊙";
pub const GLYPH_DESELECTED: &str = "○";

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TreeItemId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Group,
    Leaf,
}

#[derive(Debug)]
pub struct TreeItem {
    pub kind: ItemKind,
    pub label: String,
    pub parent: Option<TreeItemId>,
    /// Authoritative for leaves; groups derive their glyph from the
    /// aggregate of their leaf descendants.
    pub selected: bool,
    children: Vec<TreeItemId>,
}

/// The leaf ids whose selection state changed in one toggle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub added: Vec<TreeItemId>,
    pub removed: Vec<TreeItemId>,
}

impl ToggleResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Screen-space location of one rendered row's toggle cell, refreshed by
/// the UI layer every frame.
#[derive(Debug, Clone, Copy)]
pub struct RowHit {
    pub rect: egui::Rect,
    pub item: TreeItemId,
}

/// Hierarchy of selectable dataset rows: top-level leaves and groups of
/// leaves, each rendered with a radio glyph that reflects its state.
#[derive(Debug, Default)]
pub struct SelectionTree {
    items: HashMap<TreeItemId, TreeItem>,
    roots: Vec<TreeItemId>,
    next_id: usize,
    layout: Vec<RowHit>,
    /// The row the user interacted with last, target of row-scoped
    /// actions like baseline correction.
    pub focused: Option<TreeItemId>,
}
