//! Background preset loading

use crate::error::{PresetError, Result};
use crate::parser::PresetParser;
use crossbeam_channel::{bounded, Receiver};
use phoenix_core::UnifiedPresetData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// Parses preset files, inline or on a worker thread
#[derive(Debug, Clone)]
pub struct PresetLoader {
    parser: Arc<PresetParser>,
}

impl PresetLoader {
    /// Loader sharing `parser`
    pub fn new(parser: Arc<PresetParser>) -> Self {
        Self { parser }
    }

    /// Loader with the built-in effect catalog
    pub fn with_builtin_catalog() -> Result<Self> {
        Ok(Self::new(Arc::new(PresetParser::with_builtin_catalog()?)))
    }

    /// Parse on the calling thread
    pub fn load(&self, path: impl AsRef<Path>) -> Result<UnifiedPresetData> {
        self.parser.parse_file(path)
    }

    /// Parse on a worker thread. The receiver yields exactly one result.
    pub fn spawn(&self, path: impl Into<PathBuf>) -> Receiver<Result<UnifiedPresetData>> {
        let path = path.into();
        let (tx, rx) = bounded(1);
        let failed = tx.clone();
        let parser = Arc::clone(&self.parser);

        let spawned = thread::Builder::new()
            .name("preset-loader".to_string())
            .spawn(move || {
                debug!("Loading preset {}", path.display());
                let result = parser.parse_file(&path);
                if tx.send(result).is_err() {
                    debug!("Preset receiver dropped before load finished");
                }
            });
        if let Err(err) = spawned {
            error!("Failed to spawn preset loader: {}", err);
            let _ = failed.send(Err(PresetError::Io(err)));
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawn_missing_file_reports_io_error() {
        let loader = PresetLoader::with_builtin_catalog().unwrap();
        let rx = loader.spawn("/definitely/not/here.avs");
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(PresetError::Io(_))));
    }
}
