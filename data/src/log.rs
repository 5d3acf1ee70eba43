use std::path::Path;
use std::{fs, io};

use crate::data_path;

const LOG_FILE: &str = "depthmap.log";
const PREVIOUS_LOG_FILE: &str = "depthmap.prev.log";

/// Opens a fresh log for this run in the data directory.
///
/// The last run's log is kept as `depthmap.prev.log`, so a panic that ended
/// it can still be read after a restart.
pub fn file() -> Result<fs::File, Error> {
    open_in(&data_path(None))
}

fn open_in(dir: &Path) -> Result<fs::File, Error> {
    fs::create_dir_all(dir)?;

    let current = dir.join(LOG_FILE);
    if current.exists() {
        fs::rename(&current, dir.join(PREVIOUS_LOG_FILE))?;
    }

    Ok(fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(current)?)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    SetLog(#[from] log::SetLoggerError),
}
