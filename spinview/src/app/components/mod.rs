mod dataset_tree;
mod measurement;
mod overlay;
mod workspace;

pub use dataset_tree::{SelectionTree, ToggleResult, TreeItemId};
pub use measurement::MeasurementPanel;
pub use overlay::{parse_dataset, OverlayController};
pub use workspace::{ColorAllocator, Curve, CurveKind, FigureId, PlotWorkspace};
