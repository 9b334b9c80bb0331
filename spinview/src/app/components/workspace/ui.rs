use egui_plot::Legend;

use super::{ColorAllocator, FigureId, PlotWorkspace};

impl PlotWorkspace {
    /// Draw the tab strip and the current figure's canvas. Returns the id
    /// of a tab the user clicked, which the caller routes through the
    /// overlay controller as a tab-change event.
    pub fn render(&self, colors: &ColorAllocator, ui: &mut egui::Ui) -> Option<FigureId> {
        let mut clicked_tab = None;

        ui.horizontal(|ui| {
            for figure in self.figures() {
                let active = figure.id == self.current_figure_id();
                if ui.selectable_label(active, &figure.title).clicked() && !active {
                    clicked_tab = Some(figure.id);
                }
            }
        });
        ui.separator();

        let figure = self.current_figure();
        egui_plot::Plot::new(("workspace_figure", figure.id))
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for curve in &figure.curves {
                    plot_ui.line(
                        egui_plot::Line::new(curve.points.clone())
                            .color(colors.color(curve.slot))
                            .name(&curve.label),
                    );
                }
            });

        clicked_tab
    }
}
