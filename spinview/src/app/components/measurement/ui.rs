use egui::DragValue;

use crate::app::DynRequestSender;
use crate::backend_state::instrument::{field_steps_from_range, ExperimentKind};

use super::{MeasurementPanel, RunChoice};

impl MeasurementPanel {
    pub(crate) fn render(&mut self, request_tx: &mut DynRequestSender, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            ui.heading("Measurement")
        });

        // Connection and experiment selection.
        ui.horizontal(|ui| {
            let connected = *self.connected.value();
            if connected {
                ui.label("Instrument connected");
                if ui.button("Disconnect").clicked() {
                    self.request_connect(false, request_tx);
                }
            } else {
                ui.label("Instrument disconnected");
                if ui.button("Connect").clicked() {
                    self.request_connect(true, request_tx);
                }
            }
        });
        ui.separator();

        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Experiment")
                .selected_text(self.experiment.label())
                .show_ui(ui, |ui| {
                    for kind in ExperimentKind::all() {
                        ui.selectable_value(&mut self.experiment, kind, kind.label());
                    }
                });
            if ui.button("Send to spectrometer").clicked() {
                self.request_send_to_spectrometer(request_tx);
            }
        });

        // Sweep parameters.
        egui::Grid::new("cw_parameters").num_columns(6).show(ui, |ui| {
            ui.label("Center Field (G)");
            ui.add(DragValue::new(&mut self.params.field_center).speed(1.0));
            ui.label("Sweep Width (G)");
            ui.add(DragValue::new(&mut self.params.field_sweep).speed(1.0));
            ui.label("Field Points");
            ui.add(DragValue::new(&mut self.params.field_points).speed(1));
            ui.end_row();

            ui.label("Mod. Amplitude (G)");
            ui.add(DragValue::new(&mut self.params.mod_amplitude).speed(0.1));
            ui.label("Mod. Frequency (kHz)");
            ui.add(DragValue::new(&mut self.params.mod_frequency).speed(1.0));
            ui.label("MW Attenuation (dB)");
            ui.add(DragValue::new(&mut self.params.mw_attenuation).speed(1.0));
            ui.end_row();
        });
        match field_steps_from_range(
            self.params.field_center,
            self.params.field_sweep,
            self.params.field_points,
        ) {
            Ok(steps) => {
                ui.weak(format!(
                    "Start {:.2} G, Stop {:.2} G, Step {:.4} G",
                    steps.start, steps.stop, steps.step
                ));
            }
            Err(err) => {
                ui.colored_label(ui.visuals().warn_fg_color, err);
            }
        }
        ui.separator();

        // Run mode.
        ui.radio_value(&mut self.run_choice, RunChoice::Simple, "Run simple measurement");
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.run_choice, RunChoice::GoalSnr, "Repeat until goal SNR:");
            ui.add_enabled(
                self.run_choice == RunChoice::GoalSnr,
                egui::TextEdit::singleline(&mut self.goal_snr_entry).desired_width(60.0),
            );
        });
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.run_choice, RunChoice::Timed, "Repeat for time duration:");
            let enabled = self.run_choice == RunChoice::Timed;
            ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut self.hours_entry).desired_width(40.0),
            );
            ui.label("hours");
            ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut self.minutes_entry).desired_width(40.0),
            );
            ui.label("minutes");
        });
        ui.separator();

        // Save location.
        ui.horizontal(|ui| {
            ui.label("Save to folder:");
            ui.text_edit_singleline(&mut self.save_folder_entry);
            if ui.button("Browse").clicked() && self.awaiting_save_folder_selection.is_none() {
                log::debug!("open dialog to select save folder");
                self.awaiting_save_folder_selection =
                    Some(std::thread::spawn(|| rfd::FileDialog::new().pick_folder()));
            }
        });
        ui.horizontal(|ui| {
            ui.label("Dataset name:");
            ui.text_edit_singleline(&mut self.save_name_entry);
        });
        ui.horizontal(|ui| {
            ui.label("Set temperature at the end (K):");
            ui.add(egui::TextEdit::singleline(&mut self.temperature_entry).desired_width(60.0));
        });
        ui.separator();

        // Run control.
        ui.horizontal(|ui| {
            let running = self.is_running();
            if ui
                .add_enabled(!running, egui::Button::new("Run"))
                .clicked()
            {
                self.request_run(request_tx);
            }
            if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                self.request_stop_measurement();
            }
            if running {
                ui.spinner();
            }
        });
        ui.weak(self.status.value());
    }
}
