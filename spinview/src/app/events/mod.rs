use std::{path::PathBuf, thread::JoinHandle};

use derive_new::new;

use crate::app::{
    components::parse_dataset,
    storage::{load_json, save_json},
};

use super::EguiApp;
use app_core::{event::{AppEvent, EventState}, frontend::UIParameter};

// ---------------------------------------------------------------------------
//
//
// EventQueue
//
//
// ---------------------------------------------------------------------------

/// The EventQueue stores events that are processed each iteration
/// of the application GUI event loop.
pub struct EventQueue<EguiApp> {
    /// Stores events for later processing.
    queue: Vec<Box<dyn AppEvent<App = EguiApp>>>,
    /// Temporarily stores events that have not yet finished running.
    tmp_backlog: Vec<Box<dyn AppEvent<App = EguiApp>>>,
}

impl<EguiApp> EventQueue<EguiApp> {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            tmp_backlog: Vec::new(),
        }
    }

    pub fn queue_event(&mut self, event: Box<dyn AppEvent<App = EguiApp>>) {
        self.queue.push(event);
    }

    pub fn discard_events(&mut self) {
        self.queue.drain(..);
        self.tmp_backlog.drain(..);
    }
}

impl EguiApp {
    pub fn run_events(&mut self) {
        // Fully drain all queued events.
        while let Some(mut event) = self.event_queue.queue.pop() {
            match event.apply(self) {
                Ok(EventState::Finished) => {
                    self.request_redraw();
                }
                Ok(EventState::Busy) => {
                    // Add busy event to the backlog.
                    self.event_queue.tmp_backlog.push(event);
                }
                Err(err) => {
                    log::error!("event failed: {:?}", err)
                }
            }
        }

        // Putting the backlog back in the queue by swapping the
        // vectors.
        std::mem::swap(
            &mut self.event_queue.queue,
            &mut self.event_queue.tmp_backlog,
        );
    }
}

// ---------------------------------------------------------------------------
//
//
// Events
//
//
// ---------------------------------------------------------------------------

/// Load the dataset files picked in a file dialog as top-level tree rows.
#[derive(new)]
pub struct LoadDatasetsRequested {
    thread_handle: Option<JoinHandle<Option<Vec<PathBuf>>>>,
}

/// Load every descriptor file of the picked folder under a new group.
#[derive(new)]
pub struct LoadFolderRequested {
    thread_handle: Option<JoinHandle<Option<PathBuf>>>,
}

/// Handles both, saving and loading the app state, depending on whether
/// `should_save` is true or false.
#[derive(new)]
pub struct SaveLoadRequested {
    should_save: bool,
    thread_handle: Option<JoinHandle<Option<PathBuf>>>,
}

// ---------------------------------------------------------------------------
//
//
// apply()
//
//
// ---------------------------------------------------------------------------

impl AppEvent for LoadDatasetsRequested {
    type App = EguiApp;

    fn apply(&mut self, app: &mut Self::App) -> Result<EventState, String> {
        if let Some(handle) = self.thread_handle.take_if(|handle| handle.is_finished()) {
            match handle.join() {
                Ok(Some(paths)) => {
                    for path in paths {
                        load_single_dataset(app, &path, None);
                    }
                }
                Ok(None) => (),
                Err(err) => log::error!("unable to pick dataset files: {:?}", err),
            }
            Ok(EventState::Finished)
        } else {
            Ok(EventState::Busy)
        }
    }
}

impl AppEvent for LoadFolderRequested {
    type App = EguiApp;

    fn apply(&mut self, app: &mut Self::App) -> Result<EventState, String> {
        if let Some(handle) = self.thread_handle.take_if(|handle| handle.is_finished()) {
            match handle.join() {
                Ok(Some(folder)) => load_folder(app, &folder),
                Ok(None) => (),
                Err(err) => log::error!("unable to pick dataset folder: {:?}", err),
            }
            Ok(EventState::Finished)
        } else {
            Ok(EventState::Busy)
        }
    }
}

impl AppEvent for SaveLoadRequested {
    type App = EguiApp;

    fn apply(&mut self, app: &mut Self::App) -> Result<EventState, String> {
        if let Some(handle) = self.thread_handle.take_if(|handle| handle.is_finished()) {
            match handle.join() {
                Ok(Some(path)) => {
                    if self.should_save {
                        if let Err(err) = save_json(app, Some(path.as_ref())) {
                            log::error!("error while trying to save to {:?}: {:?}", &path, err)
                        };
                    } else if let Err(err) = load_json(app, Some(path.as_ref())) {
                        log::error!("error while trying to load from {:?}: {:?}", &path, err)
                    };
                }
                Ok(None) => (),
                Err(err) => {
                    let msg = if self.should_save { "save" } else { "load" };
                    log::error!("Unable to {} file: {:?}", msg, err)
                }
            };
            Ok(EventState::Finished)
        } else {
            Ok(EventState::Busy)
        }
    }
}

/// Register one dataset file with the overlay controller and dispatch its
/// parse to the backend. Files with a foreign extension are reported and
/// skipped, never raised.
pub fn load_single_dataset(
    app: &mut EguiApp,
    path: &std::path::Path,
    group: Option<crate::app::components::TreeItemId>,
) {
    if !bes3t_parser::has_supported_extension(path) {
        log::error!(
            "could not load {:?}, file extension must be '.DSC', '.DTA' or '.YGA'",
            path
        );
        return;
    }
    let mut data = UIParameter::new(Err("Data not loaded".to_string()));
    data.set_recv(parse_dataset(path, &mut app.request_tx));
    app.overlay.insert_pending(path, data, group);
    log::info!("loading dataset {:?}", path);
}

fn load_folder(app: &mut EguiApp, folder: &std::path::Path) {
    let descriptors = match std::fs::read_dir(folder) {
        Ok(entries) => {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| ext.eq_ignore_ascii_case("DSC"))
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();
            paths
        }
        Err(err) => {
            log::error!("could not read folder {:?}: {}", folder, err);
            return;
        }
    };
    if descriptors.is_empty() {
        log::warn!("no files with '.DSC' extension in {:?}", folder);
    }
    let label = folder
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("folder");
    let group = app.overlay.add_group(label);
    for path in descriptors {
        load_single_dataset(app, &path, Some(group));
    }
}
