use std::collections::HashMap;
use std::path::Path;

use app_core::frontend::UIParameter;

use crate::app::components::dataset_tree::{SelectionTree, TreeItemId};
use crate::app::components::workspace::{ColorAllocator, Curve, CurveKind, FigureId, PlotWorkspace};
use crate::backend_state::data::{Correction, Dataset, DatasetId};
use crate::error::CoreError;
use crate::math;

use super::{DatasetEntry, OverlayController};

const BASELINE_FRACTION: f64 = 0.15;
const BASELINE_ORDER: usize = 1;

impl Default for OverlayController {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayController {
    pub fn new() -> Self {
        Self {
            tree: SelectionTree::new(),
            workspace: PlotWorkspace::new(),
            colors: ColorAllocator::default(),
            registry: HashMap::new(),
            dataset_of: HashMap::new(),
            leaf_of: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn colors(&self) -> &ColorAllocator {
        &self.colors
    }

    pub fn add_group(&mut self, label: &str) -> TreeItemId {
        self.tree.add_group(label)
    }

    /// Register a dataset slot whose parse result arrives later and hang
    /// its leaf into the tree. The leaf starts out labeled with the file
    /// stem and is relabeled with the dataset title once parsed.
    pub fn insert_pending(
        &mut self,
        path: &Path,
        data: UIParameter<Result<Dataset, String>>,
        group: Option<TreeItemId>,
    ) -> DatasetId {
        let id = DatasetId(self.next_id);
        self.next_id += 1;
        let label = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("unnamed dataset");
        let leaf = self.tree.add_leaf(group, label);
        self.registry.insert(
            id,
            DatasetEntry {
                path: path.to_owned(),
                data,
            },
        );
        self.dataset_of.insert(leaf, id);
        self.leaf_of.insert(id, leaf);
        id
    }

    /// Register an already-parsed dataset (scans handed over by the
    /// instrument, tests).
    pub fn insert_loaded(
        &mut self,
        dataset: Dataset,
        group: Option<TreeItemId>,
    ) -> (TreeItemId, DatasetId) {
        let path = dataset.path.clone();
        let title = dataset.meta.title.clone();
        let id = self.insert_pending(&path, UIParameter::new(Ok(dataset)), group);
        let leaf = self.leaf_of[&id];
        self.tree.set_label(leaf, &title);
        (leaf, id)
    }

    /// Poll pending parses; relabels leaves when their dataset arrives.
    pub fn try_update(&mut self) -> bool {
        let mut was_updated = false;
        for (id, entry) in self.registry.iter_mut() {
            if entry.data.try_update() {
                was_updated = true;
                match entry.data.value() {
                    Ok(dataset) => {
                        if let Some(leaf) = self.leaf_of.get(id) {
                            self.tree.set_label(*leaf, &dataset.meta.title);
                        }
                    }
                    Err(err) => {
                        log::error!("could not load dataset {:?}: {}", entry.path, err)
                    }
                }
            }
        }
        was_updated
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.registry
            .get(&id)
            .and_then(|entry| entry.data.value().as_ref().ok())
    }

    fn loaded_dataset_of_leaf(&self, leaf: TreeItemId) -> Option<(DatasetId, &Dataset)> {
        let id = *self.dataset_of.get(&leaf)?;
        self.dataset(id).map(|dataset| (id, dataset))
    }

    /// Resolve a pointer click on the tree: hit-test, toggle, and keep the
    /// current figure's curves and the color bookkeeping in sync. Returns
    /// whether anything changed (one redraw for the whole batch).
    pub fn on_tree_click(&mut self, pos: egui::Pos2) -> Result<bool, CoreError> {
        let Some(item) = self.tree.click_at(pos) else {
            return Ok(false);
        };
        self.tree.focused = Some(item);
        self.toggle_item(item)
    }

    /// Toggle a tree row and apply the selection delta to the current
    /// figure. Capacity is checked against the delta before any state
    /// changes, so the operation applies fully or not at all.
    pub fn toggle_item(&mut self, item: TreeItemId) -> Result<bool, CoreError> {
        let delta = self.tree.toggle_delta(item)?;

        // Only leaves with a successfully parsed dataset produce curves.
        let additions: Vec<(DatasetId, Vec<[f64; 2]>, String)> = delta
            .added
            .iter()
            .filter_map(|leaf| self.loaded_dataset_of_leaf(*leaf))
            .map(|(id, dataset)| (id, dataset.raw_points(), dataset.meta.title.clone()))
            .collect();
        if additions.len() > self.colors.free_slots() {
            return Err(CoreError::ResourceExhausted(format!(
                "cannot plot {} more curve(s), only {} palette color(s) left",
                additions.len(),
                self.colors.free_slots()
            )));
        }

        self.tree.apply_delta(&delta);

        let current = self.workspace.current_figure_id();
        for (dataset_id, points, title) in additions {
            let slot = self.colors.allocate()?;
            let curve = Curve {
                dataset_id,
                slot,
                label: title,
                kind: CurveKind::Raw,
                points,
            };
            if let Err(err) = self.workspace.add_curve(current, curve) {
                // Identity collision; hand the color back instead of
                // leaking it.
                self.colors.release(slot);
                log::warn!("{}", err);
            }
        }

        for leaf in &delta.removed {
            let Some(dataset_id) = self.dataset_of.get(leaf).copied() else {
                continue;
            };
            self.remove_curve_and_release(dataset_id, CurveKind::Raw);
        }

        Ok(!delta.is_empty())
    }

    /// Remove a curve by identity wherever it is shown (the current figure
    /// wins) and release its color. Missing curves are fine: the dataset
    /// may never have been plotted, or its figure was closed.
    fn remove_curve_and_release(&mut self, dataset_id: DatasetId, kind: CurveKind) {
        let Some(figure) = self.workspace.find_curve(dataset_id, kind) else {
            return;
        };
        match self.workspace.remove_curve(figure, dataset_id, kind) {
            Ok(curve) => self.colors.release(curve.slot),
            Err(err) => log::warn!("{}", err),
        }
    }

    /// Baseline-correct the focused dataset and overlay the corrected
    /// curve together with the fitted baseline on the current figure.
    pub fn on_correct_baseline(&mut self) -> Result<(), CoreError> {
        let Some(item) = self.tree.focused else {
            return Err(CoreError::InvalidArgument(
                "no dataset row is focused".into(),
            ));
        };
        self.correct_baseline(item)
    }

    pub fn correct_baseline(&mut self, leaf: TreeItemId) -> Result<(), CoreError> {
        let (dataset_id, dataset) = self.loaded_dataset_of_leaf(leaf).ok_or_else(|| {
            CoreError::InvalidArgument(format!("tree item {:?} has no loaded dataset", leaf))
        })?;

        let Some(values) = dataset.ordinate.sweep() else {
            return Err(CoreError::UnsupportedOperation(
                "baseline correction only applies to 1D sweeps, not transient data".into(),
            ));
        };

        // Two new curves, so two free slots, and neither identity may
        // already be shown; validate everything before touching state.
        if self.colors.free_slots() < 2 {
            return Err(CoreError::ResourceExhausted(
                "baseline correction needs two free palette colors".into(),
            ));
        }
        let current = self.workspace.current_figure_id();
        for kind in [CurveKind::BaselineCorrected, CurveKind::BaselineFit] {
            if self.workspace.find_curve(dataset_id, kind) == Some(current) {
                return Err(CoreError::InvalidArgument(format!(
                    "dataset {:?} is already baseline-corrected on this figure",
                    dataset_id
                )));
            }
        }

        let region = math::baseline_region(&dataset.abscissa, BASELINE_FRACTION);
        let (corrected, baseline) = math::correct_baseline(values, BASELINE_ORDER, &region)
            .map_err(CoreError::InvalidArgument)?;

        let title = dataset.meta.title.clone();

        if let Some(entry) = self.registry.get_mut(&dataset_id) {
            if let Ok(dataset) = entry.data.value_mut() {
                dataset.correction = Correction::WithBaseline {
                    corrected,
                    baseline,
                };
            }
        }
        let (corrected_points, baseline_points) = self
            .dataset(dataset_id)
            .and_then(Dataset::corrected_points)
            .ok_or_else(|| {
                CoreError::InvalidArgument(format!(
                    "correction for dataset {:?} went missing",
                    dataset_id
                ))
            })?;

        for (kind, suffix, points) in [
            (CurveKind::BaselineCorrected, "corr", corrected_points),
            (CurveKind::BaselineFit, "bl", baseline_points),
        ] {
            let slot = self.colors.allocate()?;
            self.workspace.add_curve(
                current,
                Curve {
                    dataset_id,
                    slot,
                    label: format!("{} {}", title, suffix),
                    kind,
                    points,
                },
            )?;
        }
        Ok(())
    }

    pub fn on_new_figure(&mut self) -> FigureId {
        self.workspace.create_figure()
    }

    /// Close the current figure and release the colors its curves held.
    pub fn on_close_figure(&mut self) -> Result<(), CoreError> {
        let current = self.workspace.current_figure_id();
        let curves = self.workspace.close_figure(current)?;
        self.release_all(curves);
        Ok(())
    }

    pub fn on_close_all_figures(&mut self) {
        let curves = self.workspace.close_all();
        self.release_all(curves);
    }

    /// Empty the current figure and untoggle the whole tree, so glyph
    /// state and plotted content cannot silently diverge.
    pub fn on_clear_figure(&mut self) {
        let curves = self.workspace.clear_current();
        self.release_all(curves);
        self.tree.deselect_all();
    }

    pub fn on_tab_changed(&mut self, figure: FigureId) -> Result<(), CoreError> {
        self.workspace.set_current(figure)
    }

    fn release_all(&mut self, curves: Vec<Curve>) {
        for curve in curves {
            self.colors.release(curve.slot);
        }
    }

    /// Rebuild the session from stored group/file structure: group labels
    /// with the dataset files that were loaded under them (`None` for
    /// top-level datasets).
    pub fn grouped_paths(&self) -> Vec<(Option<String>, Vec<std::path::PathBuf>)> {
        let mut grouped: Vec<(Option<String>, Vec<std::path::PathBuf>)> = Vec::new();
        for (id, depth) in self.tree.flattened_rows() {
            if self.tree.is_group(id) {
                let label = self.tree.get(id).map(|item| item.label.clone());
                grouped.push((label, Vec::new()));
            } else if let Some(entry) = self
                .dataset_of
                .get(&id)
                .and_then(|did| self.registry.get(did))
            {
                if depth == 0 {
                    grouped.push((None, vec![entry.path.clone()]));
                } else if let Some((_, files)) = grouped.last_mut() {
                    files.push(entry.path.clone());
                }
            }
        }
        grouped
    }
}

/// Dispatch parsing of a BES3T file pair to the backend thread.
pub fn parse_dataset(
    path: &Path,
    request_tx: &mut crate::app::DynRequestSender,
) -> app_core::backend::LinkReceiver<Result<Dataset, String>> {
    let path = path.to_owned();
    let (rx, linker) = app_core::backend::BackendLink::new(
        &format!("load dataset from file {:?}", path),
        move |_b: &mut app_core::backend::BackendEventLoop<crate::BackendAppState>| {
            Dataset::from_file(&path).map_err(|err| {
                log::error!("{}", err);
                err
            })
        },
    );
    request_tx
        .send(Box::new(linker))
        .expect(app_core::BACKEND_HUNG_UP_MSG);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_state::data::{DatasetMeta, Ordinate};

    fn ramp_dataset(title: &str, n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|xi| 0.1 * xi).collect();
        Dataset {
            path: format!("/data/{}.DSC", title.replace(' ', "_")).into(),
            abscissa: x,
            ordinate: Ordinate::Sweep(y),
            meta: DatasetMeta {
                title: title.to_owned(),
                mw_frequency: Some(9.6e9),
                mw_power: Some(2e-4),
            },
            correction: Correction::Raw,
        }
    }

    fn transient_dataset(title: &str) -> Dataset {
        Dataset {
            path: "/data/transient.DSC".into(),
            abscissa: vec![0.0, 1.0, 2.0],
            ordinate: Ordinate::Transients {
                second_abscissa: vec![3300.0, 3400.0],
                rows: vec![vec![0.0, 1.0, 0.0], vec![0.0, 2.0, 0.0]],
            },
            meta: DatasetMeta {
                title: title.to_owned(),
                ..Default::default()
            },
            correction: Correction::Raw,
        }
    }

    #[test]
    fn test_folder_click_plots_both_datasets_with_distinct_colors() {
        let mut overlay = OverlayController::new();
        let batch = overlay.add_group("Batch1");
        let (_, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), Some(batch));
        let (_, _) = overlay.insert_loaded(ramp_dataset("Sample B", 11), Some(batch));

        let changed = overlay.toggle_item(batch).unwrap();
        assert!(changed);
        let figure = overlay.workspace.current_figure();
        assert_eq!(figure.curves.len(), 2);
        assert_eq!(figure.curves[0].slot.0, 0);
        assert_eq!(figure.curves[1].slot.0, 1);
        assert_eq!(overlay.colors().slots_in_use(), 2);

        // second click removes both curves and frees both colors
        overlay.toggle_item(batch).unwrap();
        assert!(overlay.workspace.current_figure().curves.is_empty());
        assert_eq!(overlay.colors().slots_in_use(), 0);
    }

    #[test]
    fn test_leaf_round_trip_leaks_nothing() {
        let mut overlay = OverlayController::new();
        let (leaf, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), None);

        let curves_before = overlay.workspace.current_figure().curves.len();
        let colors_before = overlay.colors().slots_in_use();

        overlay.toggle_item(leaf).unwrap();
        overlay.toggle_item(leaf).unwrap();

        assert_eq!(
            overlay.workspace.current_figure().curves.len(),
            curves_before
        );
        assert_eq!(overlay.colors().slots_in_use(), colors_before);
    }

    #[test]
    fn test_out_of_order_removal_keeps_attribution() {
        let mut overlay = OverlayController::new();
        let batch = overlay.add_group("Batch1");
        let (leaf_a, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), Some(batch));
        let (_, id_b) = overlay.insert_loaded(ramp_dataset("Sample B", 11), Some(batch));

        // cascade adds A and B; deselect A alone afterwards
        overlay.toggle_item(batch).unwrap();
        overlay.toggle_item(leaf_a).unwrap();

        let figure = overlay.workspace.current_figure();
        assert_eq!(figure.curves.len(), 1);
        assert_eq!(figure.curves[0].dataset_id, id_b);
        // A's color (slot 0) is free again, B keeps slot 1
        assert_eq!(figure.curves[0].slot.0, 1);
        assert_eq!(overlay.colors().slots_in_use(), 1);
    }

    #[test]
    fn test_clear_figure_resets_curves_colors_and_tree() {
        let mut overlay = OverlayController::new();
        let batch = overlay.add_group("Batch1");
        overlay.insert_loaded(ramp_dataset("Sample A", 11), Some(batch));
        overlay.insert_loaded(ramp_dataset("Sample B", 11), Some(batch));
        overlay.toggle_item(batch).unwrap();

        overlay.on_clear_figure();

        assert!(overlay.workspace.current_figure().curves.is_empty());
        assert_eq!(overlay.colors().slots_in_use(), 0);
        assert!(overlay.tree.selected_leaf_ids().is_empty());
        // clearing again is harmless
        overlay.on_clear_figure();
        assert_eq!(overlay.colors().slots_in_use(), 0);
    }

    #[test]
    fn test_deselect_after_tab_switch_finds_curve_in_other_figure() {
        let mut overlay = OverlayController::new();
        let (leaf, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), None);
        overlay.toggle_item(leaf).unwrap();

        let second = overlay.on_new_figure();
        overlay.on_tab_changed(second).unwrap();
        // the curve lives in the first figure; deselecting must still
        // remove it and free its color
        overlay.toggle_item(leaf).unwrap();

        for figure in overlay.workspace.figures() {
            assert!(figure.curves.is_empty());
        }
        assert_eq!(overlay.colors().slots_in_use(), 0);
    }

    #[test]
    fn test_palette_exhaustion_refuses_before_mutation() {
        let mut overlay = OverlayController::new();
        let batch = overlay.add_group("Batch1");
        for i in 0..12 {
            overlay.insert_loaded(ramp_dataset(&format!("Sample {}", i), 11), Some(batch));
        }

        let err = overlay.toggle_item(batch);
        assert!(matches!(err, Err(CoreError::ResourceExhausted(_))));
        // nothing was toggled or plotted
        assert!(overlay.tree.selected_leaf_ids().is_empty());
        assert!(overlay.workspace.current_figure().curves.is_empty());
        assert_eq!(overlay.colors().slots_in_use(), 0);
    }

    #[test]
    fn test_baseline_correction_adds_two_curves_and_flattens_margins() {
        let mut overlay = OverlayController::new();
        // linear baseline with a gaussian peak away from the edges
        let n = 101;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|xi| 2.0 * xi + 5.0 + 4.0 * (-((xi - 50.0) / 4.0).powi(2)).exp())
            .collect();
        let dataset = Dataset {
            path: "/data/peak.DSC".into(),
            abscissa: x.clone(),
            ordinate: Ordinate::Sweep(y),
            meta: DatasetMeta {
                title: "peak".to_owned(),
                ..Default::default()
            },
            correction: Correction::Raw,
        };
        let (leaf, id) = overlay.insert_loaded(dataset, None);

        overlay.correct_baseline(leaf).unwrap();

        let figure = overlay.workspace.current_figure();
        assert_eq!(figure.curves.len(), 2);
        let corrected = figure
            .curves
            .iter()
            .find(|c| c.kind == CurveKind::BaselineCorrected)
            .expect("corrected curve present");
        assert!(figure
            .curves
            .iter()
            .any(|c| c.kind == CurveKind::BaselineFit));
        assert_eq!(overlay.colors().slots_in_use(), 2);

        // corrected values vanish in the outer 15% margins
        let region = math::baseline_region(&x, 0.15);
        for (point, masked) in corrected.points.iter().zip(&region) {
            if *masked {
                assert!(point[1].abs() < 1e-6, "margin point {:?} not near zero", point);
            }
        }
        // the correction is attached to the dataset record
        assert!(matches!(
            overlay.dataset(id).unwrap().correction,
            Correction::WithBaseline { .. }
        ));
    }

    #[test]
    fn test_baseline_correction_of_transients_is_unsupported() {
        let mut overlay = OverlayController::new();
        let (leaf, _) = overlay.insert_loaded(transient_dataset("flash"), None);
        assert!(matches!(
            overlay.correct_baseline(leaf),
            Err(CoreError::UnsupportedOperation(_))
        ));
        assert!(overlay.workspace.current_figure().curves.is_empty());
        assert_eq!(overlay.colors().slots_in_use(), 0);
    }

    #[test]
    fn test_close_figure_releases_colors() {
        let mut overlay = OverlayController::new();
        let (leaf, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), None);
        overlay.toggle_item(leaf).unwrap();
        assert_eq!(overlay.colors().slots_in_use(), 1);

        overlay.on_close_figure().unwrap();
        assert_eq!(overlay.colors().slots_in_use(), 0);
        // the workspace never drops below one figure
        assert_eq!(overlay.workspace.figures().len(), 1);
    }

    #[test]
    fn test_unknown_item_toggle_fails_fast() {
        let mut overlay = OverlayController::new();
        let (leaf, _) = overlay.insert_loaded(ramp_dataset("Sample A", 11), None);
        overlay.toggle_item(leaf).unwrap();
        let before = overlay.workspace.current_figure().curves.len();

        // an id minted by a bigger tree does not exist in this one
        let mut other = OverlayController::new();
        let foreign = (0..9)
            .map(|i| other.add_group(&format!("foreign {}", i)))
            .last()
            .expect("nine groups were added");
        assert!(matches!(
            overlay.toggle_item(foreign),
            Err(CoreError::InvalidArgument(_))
        ));
        assert_eq!(overlay.workspace.current_figure().curves.len(), before);
    }
}
