use std::path::{Path, PathBuf};

use app_core::storage::Storage;
use serde::{Deserialize, Serialize};

use crate::EguiApp;

use super::events::load_single_dataset;

// The backend only mirrors the data path, which the frontend already
// stores, so there is nothing to persist on its side right now.
#[derive(Clone, Serialize, Deserialize)]
struct BackendStorage {}

/// Datasets are re-parsed from their files on load, so only the tree
/// structure with file paths is persisted.
#[derive(Serialize, Deserialize)]
struct FrontendStorage {
    data_path: PathBuf,
    groups: Vec<StoredGroup>,
}

#[derive(Serialize, Deserialize)]
struct StoredGroup {
    label: Option<String>,
    files: Vec<PathBuf>,
}

pub fn save_json(app: &EguiApp, path: Option<&Path>) -> Result<(), String> {
    let backend_storage = BackendStorage {};

    let frontend_storage = FrontendStorage {
        data_path: app.config.data_path.clone(),
        groups: app
            .overlay
            .grouped_paths()
            .into_iter()
            .map(|(label, files)| StoredGroup { label, files })
            .collect(),
    };
    let storage = Storage::new(backend_storage, frontend_storage);
    storage.save_json(path)
}

pub fn load_json(app: &mut EguiApp, path: Option<&Path>) -> Result<(), String> {
    let Storage::<BackendStorage, FrontendStorage> {
        backend_storage: _,
        frontend_storage,
    } = Storage::load_json(path)?;

    app.config.data_path = frontend_storage.data_path;
    app.overlay = crate::app::components::OverlayController::new();
    for StoredGroup { label, files } in frontend_storage.groups {
        let group = label.map(|label| app.overlay.add_group(&label));
        for file in files {
            load_single_dataset(app, &file, group);
        }
    }
    app.request_redraw();
    Ok(())
}
