use std::path::{Path, PathBuf};

use pulse_types::{EngineError, StockCode};

/// External collaborator: the persisted watch-list of stock codes a user
/// has added outside the realtime engine.
///
/// The engine only ever calls [`read_codes`](Self::read_codes) at startup
/// (to seed the pool with `CallerTag::Bootstrap`); writes happen from a
/// separate, out-of-scope HTTP surface and are included here only so the
/// store's contract is a single trait the engine can be tested against.
pub trait WatchlistStore: Send + Sync {
    /// Read every code currently on the watch list.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidInput`] if the file contains a
    /// malformed code.
    fn read_codes(&self) -> Result<Vec<StockCode>, EngineError>;

    /// Overwrite the watch list with `codes`.
    ///
    /// # Errors
    /// Returns [`EngineError::Other`] if the file cannot be written.
    fn write_codes(&self, codes: &[StockCode]) -> Result<(), EngineError>;
}

/// Plain line-oriented file: one stock code per line, blank lines skipped.
/// Writes go through a temp-file-then-rename so a crash mid-write never
/// leaves a truncated file behind.
pub struct FileWatchlistStore {
    path: PathBuf,
}

impl FileWatchlistStore {
    /// Back the store with the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WatchlistStore for FileWatchlistStore {
    fn read_codes(&self) -> Result<Vec<StockCode>, EngineError> {
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "watchlist file not found, starting with an empty list");
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| EngineError::Other(format!("reading watchlist: {e}")))?;
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(StockCode::parse)
            .collect()
    }

    fn write_codes(&self, codes: &[StockCode]) -> Result<(), EngineError> {
        let tmp_path = tmp_path_for(&self.path);
        let body = codes.iter().map(|c| format!("{c}\n")).collect::<String>();
        std::fs::write(&tmp_path, body).map_err(|e| EngineError::Other(format!("writing watchlist: {e}")))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| EngineError::Other(format!("renaming watchlist: {e}")))?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
