use crate::backend_state::data::DatasetId;
use crate::error::CoreError;

use super::{Curve, CurveKind, Figure, FigureId, PlotWorkspace};

const FIRST_FIGURE_TITLE: &str = "Fig 0";

impl Default for PlotWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotWorkspace {
    /// A workspace starts out with one empty figure; it never drops below
    /// one.
    pub fn new() -> Self {
        let first = Figure {
            id: FigureId(0),
            title: FIRST_FIGURE_TITLE.to_owned(),
            curves: Vec::new(),
        };
        Self {
            current: first.id,
            figures: vec![first],
            next_id: 1,
        }
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn current_figure_id(&self) -> FigureId {
        self.current
    }

    pub fn current_figure(&self) -> &Figure {
        self.figures
            .iter()
            .find(|fig| fig.id == self.current)
            .expect("the current figure always exists")
    }

    fn current_figure_mut(&mut self) -> &mut Figure {
        let current = self.current;
        self.figures
            .iter_mut()
            .find(|fig| fig.id == current)
            .expect("the current figure always exists")
    }

    fn figure_mut(&mut self, id: FigureId) -> Result<&mut Figure, CoreError> {
        self.figures
            .iter_mut()
            .find(|fig| fig.id == id)
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown figure {:?}", id)))
    }

    /// Append a new empty figure, titled by incrementing the numeric
    /// suffix of the last figure's title; it becomes the current figure.
    pub fn create_figure(&mut self) -> FigureId {
        let title = self.next_title();
        let id = FigureId(self.next_id);
        self.next_id += 1;
        self.figures.push(Figure {
            id,
            title,
            curves: Vec::new(),
        });
        self.current = id;
        id
    }

    fn next_title(&self) -> String {
        let Some(last) = self.figures.last() else {
            return FIRST_FIGURE_TITLE.to_owned();
        };
        match last.title.rsplit_once(' ') {
            Some((prefix, suffix)) => match suffix.parse::<usize>() {
                Ok(number) => format!("{} {}", prefix, number + 1),
                Err(_) => format!("{} {}", last.title, self.next_id),
            },
            None => format!("{} {}", last.title, self.next_id),
        }
    }

    /// Remove a figure and return its curves so the caller can release
    /// their colors. If the closed figure was current, the tab that slides
    /// into its place becomes current (or the new last tab). Closing the
    /// last remaining figure immediately creates a fresh one.
    pub fn close_figure(&mut self, id: FigureId) -> Result<Vec<Curve>, CoreError> {
        let index = self
            .figures
            .iter()
            .position(|fig| fig.id == id)
            .ok_or_else(|| CoreError::InvalidArgument(format!("unknown figure {:?}", id)))?;
        let removed = self.figures.remove(index);

        if self.figures.is_empty() {
            self.create_figure();
        } else if removed.id == self.current {
            let fallback = index.min(self.figures.len() - 1);
            self.current = self.figures[fallback].id;
        }
        Ok(removed.curves)
    }

    /// Remove every figure, then create a single fresh one. Returns all
    /// removed curves for color release.
    pub fn close_all(&mut self) -> Vec<Curve> {
        let curves = self
            .figures
            .drain(..)
            .flat_map(|fig| fig.curves)
            .collect();
        self.create_figure();
        curves
    }

    pub fn set_current(&mut self, id: FigureId) -> Result<(), CoreError> {
        if self.figures.iter().any(|fig| fig.id == id) {
            self.current = id;
            Ok(())
        } else {
            Err(CoreError::InvalidArgument(format!(
                "unknown figure {:?}",
                id
            )))
        }
    }

    /// Append a curve to a figure. A second curve with the same identity
    /// `(dataset_id, kind)` within one figure is refused.
    pub fn add_curve(&mut self, figure: FigureId, curve: Curve) -> Result<(), CoreError> {
        let fig = self.figure_mut(figure)?;
        if fig
            .curves
            .iter()
            .any(|c| c.dataset_id == curve.dataset_id && c.kind == curve.kind)
        {
            return Err(CoreError::InvalidArgument(format!(
                "figure {:?} already shows ({:?}, {:?})",
                figure, curve.dataset_id, curve.kind
            )));
        }
        fig.curves.push(curve);
        Ok(())
    }

    /// Remove the curve identified by `(dataset_id, kind)` from a figure
    /// and return it. Identity-keyed removal keeps curve attribution
    /// correct when curves are added and removed out of order.
    pub fn remove_curve(
        &mut self,
        figure: FigureId,
        dataset_id: DatasetId,
        kind: CurveKind,
    ) -> Result<Curve, CoreError> {
        let fig = self.figure_mut(figure)?;
        let index = fig
            .curves
            .iter()
            .position(|c| c.dataset_id == dataset_id && c.kind == kind)
            .ok_or_else(|| {
                CoreError::InvalidArgument(format!(
                    "figure {:?} shows no curve ({:?}, {:?})",
                    figure, dataset_id, kind
                ))
            })?;
        Ok(fig.curves.remove(index))
    }

    /// Locate the figure currently showing `(dataset_id, kind)`, the
    /// current figure winning over the others.
    pub fn find_curve(&self, dataset_id: DatasetId, kind: CurveKind) -> Option<FigureId> {
        let shows = |fig: &Figure| {
            fig.curves
                .iter()
                .any(|c| c.dataset_id == dataset_id && c.kind == kind)
        };
        if shows(self.current_figure()) {
            return Some(self.current);
        }
        self.figures.iter().find(|fig| shows(fig)).map(|fig| fig.id)
    }

    /// Drop all curves of the current figure (the figure itself stays) and
    /// return them for color release.
    pub fn clear_current(&mut self) -> Vec<Curve> {
        self.current_figure_mut().curves.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(dataset: usize, kind: CurveKind, colors: &mut super::super::ColorAllocator) -> Curve {
        Curve {
            dataset_id: crate::backend_state::data::DatasetId(dataset),
            slot: colors.allocate().unwrap(),
            label: format!("dataset {}", dataset),
            kind,
            points: vec![[0.0, 0.0], [1.0, 1.0]],
        }
    }

    #[test]
    fn test_titles_increment_numeric_suffix() {
        let mut ws = PlotWorkspace::new();
        assert_eq!(ws.current_figure().title, "Fig 0");
        ws.create_figure();
        ws.create_figure();
        ws.create_figure();
        let titles: Vec<_> = ws.figures().iter().map(|f| f.title.clone()).collect();
        assert_eq!(titles, vec!["Fig 0", "Fig 1", "Fig 2", "Fig 3"]);
    }

    #[test]
    fn test_close_figure_keeps_at_least_one() {
        let mut ws = PlotWorkspace::new();
        let fig1 = ws.create_figure();
        let fig2 = ws.create_figure();
        let fig3 = ws.create_figure();

        // close "Fig 2"; three figures remain and titles are untouched
        ws.close_figure(fig2).unwrap();
        let titles: Vec<_> = ws.figures().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Fig 0", "Fig 1", "Fig 3"]);
        // the closed figure was current; its neighbor takes over
        assert_eq!(ws.current_figure_id(), fig3);

        ws.close_figure(fig3).unwrap();
        assert_eq!(ws.current_figure_id(), fig1);

        // closing the last figure replaces it with a fresh one
        let survivors: Vec<_> = ws.figures().iter().map(|f| f.id).collect();
        for id in survivors {
            ws.close_figure(id).unwrap();
        }
        assert_eq!(ws.figures().len(), 1);
        assert!(ws.current_figure().curves.is_empty());
    }

    #[test]
    fn test_close_all_leaves_one_fresh_figure() {
        let mut ws = PlotWorkspace::new();
        let mut colors = super::super::ColorAllocator::default();
        ws.create_figure();
        ws.create_figure();
        let current = ws.current_figure_id();
        ws.add_curve(current, curve(0, CurveKind::Raw, &mut colors))
            .unwrap();

        let removed = ws.close_all();
        assert_eq!(removed.len(), 1);
        assert_eq!(ws.figures().len(), 1);
        assert!(ws.current_figure().curves.is_empty());
    }

    #[test]
    fn test_curves_are_keyed_by_identity_not_position() {
        let mut ws = PlotWorkspace::new();
        let mut colors = super::super::ColorAllocator::default();
        let fig = ws.current_figure_id();
        ws.add_curve(fig, curve(0, CurveKind::Raw, &mut colors))
            .unwrap();
        ws.add_curve(fig, curve(1, CurveKind::Raw, &mut colors))
            .unwrap();
        ws.add_curve(fig, curve(2, CurveKind::Raw, &mut colors))
            .unwrap();

        // remove the middle dataset, then the first: identities stay intact
        let removed = ws
            .remove_curve(fig, crate::backend_state::data::DatasetId(1), CurveKind::Raw)
            .unwrap();
        assert_eq!(removed.slot.0, 1);
        let removed = ws
            .remove_curve(fig, crate::backend_state::data::DatasetId(0), CurveKind::Raw)
            .unwrap();
        assert_eq!(removed.slot.0, 0);
        assert_eq!(ws.current_figure().curves.len(), 1);
        assert_eq!(
            ws.current_figure().curves[0].dataset_id,
            crate::backend_state::data::DatasetId(2)
        );
    }

    #[test]
    fn test_duplicate_identity_in_one_figure_is_refused() {
        let mut ws = PlotWorkspace::new();
        let mut colors = super::super::ColorAllocator::default();
        let fig = ws.current_figure_id();
        ws.add_curve(fig, curve(0, CurveKind::Raw, &mut colors))
            .unwrap();
        let err = ws.add_curve(fig, curve(0, CurveKind::Raw, &mut colors));
        assert!(matches!(err, Err(CoreError::InvalidArgument(_))));
        // a different kind for the same dataset is fine
        ws.add_curve(fig, curve(0, CurveKind::BaselineFit, &mut colors))
            .unwrap();
    }

    #[test]
    fn test_clear_current_returns_curves_and_keeps_figure() {
        let mut ws = PlotWorkspace::new();
        let mut colors = super::super::ColorAllocator::default();
        let fig = ws.current_figure_id();
        ws.add_curve(fig, curve(0, CurveKind::Raw, &mut colors))
            .unwrap();
        ws.add_curve(fig, curve(1, CurveKind::Raw, &mut colors))
            .unwrap();
        let cleared = ws.clear_current();
        assert_eq!(cleared.len(), 2);
        assert_eq!(ws.current_figure_id(), fig);
        assert!(ws.current_figure().curves.is_empty());
    }
}
