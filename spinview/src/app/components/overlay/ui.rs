use std::path::Path;

use crate::app::{
    events::{EventQueue, LoadDatasetsRequested, LoadFolderRequested},
    DynRequestSender,
};
use crate::EguiApp;

use super::OverlayController;

impl OverlayController {
    pub(crate) fn render(
        &mut self,
        _request_tx: &mut DynRequestSender,
        event_queue: &mut EventQueue<EguiApp>,
        data_path: &Path,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
    ) {
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            ui.heading("Data Analysis")
        });

        let side_panel = egui::panel::SidePanel::left("analysis_controls").min_width(260.0);
        side_panel.show(ctx, |ui| {
            ui.vertical(|ui| {
                if ui.button("New figure").clicked() {
                    self.on_new_figure();
                }
                if ui.button("Close figure").clicked() {
                    if let Err(err) = self.on_close_figure() {
                        log::error!("could not close figure: {}", err);
                    }
                }
                if ui.button("Close all figures").clicked() {
                    self.on_close_all_figures();
                }
                if ui.button("Clear figure").clicked() {
                    self.on_clear_figure();
                }
                ui.separator();
                if ui.button("Load dataset").clicked() {
                    log::debug!("open dialog to select dataset files");
                    let dir = data_path.to_owned();
                    let handle = std::thread::spawn(move || {
                        rfd::FileDialog::new()
                            .set_directory(dir)
                            .add_filter("Description files", &["DSC"])
                            .pick_files()
                    });
                    event_queue.queue_event(Box::new(LoadDatasetsRequested::new(Some(handle))));
                }
                if ui.button("Load folder").clicked() {
                    log::debug!("open dialog to select dataset folder");
                    let dir = data_path.to_owned();
                    let handle = std::thread::spawn(move || {
                        rfd::FileDialog::new().set_directory(dir).pick_folder()
                    });
                    event_queue.queue_event(Box::new(LoadFolderRequested::new(Some(handle))));
                }
                ui.separator();
                if ui.button("Correct baseline").clicked() {
                    if let Err(err) = self.on_correct_baseline() {
                        log::error!("could not correct baseline: {}", err);
                    }
                }
                ui.weak(format!(
                    "{} plot color(s) in use, {} free",
                    self.colors().slots_in_use(),
                    self.colors().free_slots()
                ));
            });

            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                if self.tree.is_empty() {
                    ui.weak("No datasets loaded.");
                    return;
                }
                if let Some(pos) = self.tree.render(ui) {
                    match self.on_tree_click(pos) {
                        Ok(_) => (),
                        Err(err) => log::error!("could not toggle dataset: {}", err),
                    }
                }
            });
        });

        egui::panel::CentralPanel::default().show(ctx, |ui| {
            if let Some(figure) = self.workspace.render(self.colors(), ui) {
                if let Err(err) = self.on_tab_changed(figure) {
                    log::error!("could not switch figure: {}", err);
                }
            }
        });
    }
}
