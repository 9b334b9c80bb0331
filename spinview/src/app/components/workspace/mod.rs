mod logic;
mod palette;
mod ui;

pub use palette::{ColorAllocator, PaletteSlot};

use crate::backend_state::data::DatasetId;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct FigureId(usize);

/// What one plotted line represents for its dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CurveKind {
    Raw,
    BaselineCorrected,
    BaselineFit,
}

/// One plotted line. Curves are identified by `(dataset_id, kind)`,
/// never by their position in the figure's list.
#[derive(Debug, Clone)]
pub struct Curve {
    pub dataset_id: DatasetId,
    pub slot: PaletteSlot,
    pub label: String,
    pub kind: CurveKind,
    pub points: Vec<[f64; 2]>,
}

/// One plotting tab: an ordered list of curves under an auto-generated
/// title.
#[derive(Debug)]
pub struct Figure {
    pub id: FigureId,
    pub title: String,
    pub curves: Vec<Curve>,
}

/// The set of figure tabs. There is always at least one figure, and
/// always a current one that receives new curves.
#[derive(Debug)]
pub struct PlotWorkspace {
    figures: Vec<Figure>,
    current: FigureId,
    next_id: usize,
}
