mod components;
pub mod config;
mod events;
pub mod storage;

use crate::app::events::{EventQueue, SaveLoadRequested};
use crate::BackendAppState;
use app_core::backend::BackendRequest;
use config::Config;
use storage::{load_json, save_json};

pub use components::{MeasurementPanel, OverlayController};

use std::{sync::mpsc::Sender, thread::JoinHandle};

pub type DynRequestSender = Sender<Box<dyn BackendRequest<BackendAppState>>>;

pub struct EguiApp {
    config: Config,
    backend_thread_handle: Option<JoinHandle<()>>,
    overlay: OverlayController,
    measurement: MeasurementPanel,
    request_tx: DynRequestSender,
    shortcuts_modal_open: bool,
    ui_selection: UISelection,
    event_queue: EventQueue<Self>,
    request_redraw: Option<()>,
}

#[derive(Debug, PartialEq, Eq)]
enum UISelection {
    Measurement,
    Analysis,
}

impl UISelection {
    fn next(&self) -> Self {
        match self {
            UISelection::Measurement => Self::Analysis,
            UISelection::Analysis => Self::Measurement,
        }
    }
}

impl EguiApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: Config,
        request_tx: Sender<Box<dyn BackendRequest<BackendAppState>>>,
        backend_thread_handle: JoinHandle<()>,
    ) -> Self {
        let measurement = MeasurementPanel::new(&config.save_path);

        Self {
            config,
            backend_thread_handle: Some(backend_thread_handle),
            overlay: OverlayController::new(),
            measurement,
            request_tx,
            shortcuts_modal_open: false,
            ui_selection: UISelection::Measurement,
            event_queue: EventQueue::<Self>::new(),
            request_redraw: None,
        }
    }

    fn reset_state(&mut self) {
        self.overlay = OverlayController::new();
        self.event_queue.discard_events();
    }

    fn update_state(&mut self) {
        self.run_events();
        if self.overlay.try_update() || self.measurement.try_update() {
            self.request_redraw();
        }
    }

    pub fn request_redraw(&mut self) {
        self.request_redraw = Some(());
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(_) = self.request_redraw.take() {
            ctx.request_repaint();
        }

        // A running acquisition reports back through a channel that no
        // egui interaction polls, so keep repainting while it runs.
        if self.measurement.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(300));
        }

        self.update_state();

        let mut should_quit = false;

        // Handle keyboard input.
        ctx.input(|i| {
            // Help window.
            if i.key_pressed(egui::Key::F1) {
                self.shortcuts_modal_open = !self.shortcuts_modal_open;
            }
            // Circle main window view.
            if i.key_pressed(egui::Key::F3) {
                self.ui_selection = self.ui_selection.next();
            }
            // Quick save app state.
            if i.key_pressed(egui::Key::F6) {
                if let Err(error) = save_json(self, None) {
                    log::error!("{}", error)
                };
            }
            // Quick load app state.
            if i.key_pressed(egui::Key::F5) {
                if let Err(error) = load_json(self, None) {
                    log::error!("{}", error)
                };
            }
            // Close app.
            if i.key_pressed(egui::Key::F10) {
                // Quitting cannot be requested from within here, the UI stops,
                // but not the backend thread.
                should_quit = true;
            }
            if i.key_pressed(egui::Key::S) && i.modifiers.ctrl {
                log::debug!("open dialog to select save path");
                let handle = std::thread::spawn(|| rfd::FileDialog::new().save_file());
                let event = SaveLoadRequested::new(true, Some(handle));
                self.event_queue.queue_event(Box::new(event));
            }
            if i.key_pressed(egui::Key::L) && i.modifiers.ctrl {
                log::debug!("open dialog to select load path");
                let handle = std::thread::spawn(|| rfd::FileDialog::new().pick_file());
                let event = SaveLoadRequested::new(false, Some(handle));
                self.event_queue.queue_event(Box::new(event));
            }
        });

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.render_shortcut_modal(ctx);
            self.menu(ui, ctx);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.central_panel(ui, ctx);
        });

        if should_quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(handle) = self.backend_thread_handle.take() {
            app_core::backend::request_stop(&self.request_tx, handle);
        }
    }
}

impl EguiApp {
    fn central_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        use UISelection as U;
        match self.ui_selection {
            U::Measurement => self.measurement.render(&mut self.request_tx, ui),
            U::Analysis => self.overlay.render(
                &mut self.request_tx,
                &mut self.event_queue,
                &self.config.data_path,
                ui,
                ctx,
            ),
        }
    }

    fn menu(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        egui::menu::bar(ui, |ui| {
            {
                ui.menu_button("File", |ui| {
                    if ui.button("Save").clicked() {
                        log::debug!("open dialog to select save path");
                        let handle = std::thread::spawn(|| rfd::FileDialog::new().save_file());
                        let event = SaveLoadRequested::new(true, Some(handle));
                        self.event_queue.queue_event(Box::new(event));
                    }
                    if ui.button("Load").clicked() {
                        log::debug!("open dialog to select load path");
                        let handle = std::thread::spawn(|| rfd::FileDialog::new().pick_file());
                        let event = SaveLoadRequested::new(false, Some(handle));
                        self.event_queue.queue_event(Box::new(event));
                    }
                    if ui.button("Quick Save").clicked() {
                        if let Err(error) = save_json(self, None) {
                            log::error!("{}", error)
                        };
                    }
                    if ui.button("Quick Load").clicked() {
                        // Loading on the main thread is fine, because the
                        // dataset files are re-parsed on the backend anyway.
                        if let Err(error) = load_json(self, None) {
                            log::error!("{}", error)
                        };
                    }
                    if ui.button("Reset Session").clicked() {
                        self.reset_state();
                    };
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                // Selection of ui view.
                ui.menu_button("View", |ui| {
                    ui.selectable_value(
                        &mut self.ui_selection,
                        UISelection::Measurement,
                        "Measurement",
                    );
                    ui.selectable_value(
                        &mut self.ui_selection,
                        UISelection::Analysis,
                        "Data Analysis",
                    );
                });

                ui.toggle_value(&mut self.shortcuts_modal_open, "Help (F1)");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    egui::widgets::global_theme_preference_buttons(ui);
                });
            };
        });
    }

    fn render_shortcut_modal(&mut self, ctx: &egui::Context) {
        if self.shortcuts_modal_open
            && egui::Modal::new("shortcut_modal".into())
                .show(ctx, |ui| {
                    ui.heading("Keyboard Shortcuts");
                    ui.separator();
                    ui.label("CTRL + S = Open Save Dialog");
                    ui.separator();
                    ui.label("CTRL + L = Open Load Dialog");
                    ui.separator();
                    ui.label("F1 = Show Keyboard Shortcuts");
                    ui.separator();
                    ui.label("F3 = Cycle View");
                    ui.separator();
                    ui.label("F6 = Save App State");
                    ui.separator();
                    ui.label("F5 = Load App State");
                    ui.separator();
                    ui.label("F10 = Quit App");
                    ui.separator();
                })
                .should_close()
        {
            self.shortcuts_modal_open = false;
        };
    }
}
