//! This module defines the `Storage` type which collects frontend and backend
//! state information and provides methods to store/load them to/from a JSON
//! file.

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer};
use std::path::Path;

use crate::string_error::ErrorStringExt;

const STORAGE_FILE: &str = "./.app_storage.json";

#[derive(Serialize, Deserialize)]
pub struct Storage<B, F> {
    pub backend_storage: B,
    pub frontend_storage: F,
}

impl<F, B> Storage<B, F>
where
    for<'a> B: Serialize + Deserialize<'a>,
    for<'a> F: Serialize + Deserialize<'a>,
{
    pub fn new(backend_storage: B, frontend_storage: F) -> Self {
        Self {
            backend_storage,
            frontend_storage,
        }
    }

    pub fn save_json(&self, input_path: Option<&Path>) -> Result<(), String> {
        let default_path = std::path::PathBuf::from(STORAGE_FILE);
        let output_path = input_path.unwrap_or(default_path.as_path());
        let file =
            std::fs::File::create(output_path).err_to_string("could not open storage file")?;
        to_writer(file, &self).err_to_string("could not save app state to json")?;
        log::debug!("saved app state to file {:?}", output_path.canonicalize());
        Ok(())
    }

    pub fn load_json(input_path: Option<&Path>) -> Result<Storage<B, F>, String> {
        let default_path = std::path::PathBuf::from(STORAGE_FILE);
        let input_path = input_path.unwrap_or(default_path.as_path());
        let file = std::fs::File::open(input_path).err_to_string("could not open storage file")?;
        let storage =
            from_reader(file).err_to_string("could not load app state from storage file")?;
        Ok(storage)
    }
}
