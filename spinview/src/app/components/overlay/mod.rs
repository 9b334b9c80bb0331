mod logic;
mod ui;

pub use logic::parse_dataset;

use std::collections::HashMap;
use std::path::PathBuf;

use app_core::frontend::UIParameter;

use crate::backend_state::data::{Dataset, DatasetId};

use super::dataset_tree::{SelectionTree, TreeItemId};
use super::workspace::{ColorAllocator, PlotWorkspace};

/// A registry slot for one dataset. Parsing happens on the backend
/// thread, so the data arrives through a `UIParameter`; until then the
/// entry serves its error placeholder.
#[derive(Debug)]
pub struct DatasetEntry {
    pub path: PathBuf,
    pub data: UIParameter<Result<Dataset, String>>,
}

/// Mediator between the selection tree, the plot workspace and the color
/// allocator. All selection/overlay state lives here; the UI layer only
/// forwards events and renders.
pub struct OverlayController {
    pub tree: SelectionTree,
    pub workspace: PlotWorkspace,
    colors: ColorAllocator,
    registry: HashMap<DatasetId, DatasetEntry>,
    dataset_of: HashMap<TreeItemId, DatasetId>,
    leaf_of: HashMap<DatasetId, TreeItemId>,
    next_id: usize,
}
