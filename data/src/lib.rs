pub mod chart;
pub mod config;
pub mod log;
pub mod session;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use ::log::{info, warn};
use serde::de::DeserializeOwned;

pub use config::{Config, ScaleFactor};
pub use session::{Latest, Phase, Request, RequestKind, Session, Status};

pub const DATA_PATH_ENV: &str = "DEPTHMAP_DATA_PATH";

pub fn data_path(path_name: Option<&str>) -> PathBuf {
    let data_dir = if let Ok(path) = std::env::var(DATA_PATH_ENV) {
        PathBuf::from(path)
    } else {
        dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depthmap")
    };

    match path_name {
        Some(path_name) => data_dir.join(path_name),
        None => data_dir,
    }
}

pub fn read_from_file<T: DeserializeOwned>(file_name: &str) -> Result<T, config::Error> {
    let path = data_path(Some(file_name));

    let mut file = File::open(&path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    match serde_json::from_str(&contents) {
        Ok(value) => Ok(value),
        Err(e) => {
            drop(file);

            // Keep the broken file around under a different name so it can be fixed by hand
            let backup_file_name = if let Some(pos) = file_name.rfind('.') {
                format!("{}_old{}", &file_name[..pos], &file_name[pos..])
            } else {
                format!("{}_old", file_name)
            };

            let backup_path = data_path(Some(&backup_file_name));

            if let Err(rename_err) = std::fs::rename(&path, &backup_path) {
                warn!(
                    "Failed to backup corrupted file '{}' to '{}': {}",
                    path.display(),
                    backup_path.display(),
                    rename_err
                );
            } else {
                info!(
                    "Backed up corrupted file to '{}'. It can be restored manually.",
                    backup_path.display()
                );
            }

            Err(e.into())
        }
    }
}
