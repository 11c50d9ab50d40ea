use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BootError, Result};

/// Fixed name of the one-shot maintenance marker.
pub const MAINTENANCE_FLAG: &str = "MAINTENANCE";

/// Persistent one-shot maintenance flag.
///
/// Armed by the dispatcher before a soft reboot, consumed by the next boot.
pub trait FlagStore {
    /// True when the marker is present.
    fn is_armed(&self) -> Result<bool>;

    /// Create the marker so the next boot enters maintenance.
    fn arm(&self) -> Result<()>;

    /// Remove the marker. Clearing an absent marker is not an error.
    fn clear(&self) -> Result<()>;
}

/// Flag persisted as the presence of a file in a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFlag {
    path: PathBuf,
}

impl FileFlag {
    /// Flag stored as [`MAINTENANCE_FLAG`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::at(dir.as_ref().join(MAINTENANCE_FLAG))
    }

    /// Flag stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn err(&self, source: std::io::Error) -> BootError {
        BootError::Flag {
            path: self.path.clone(),
            source,
        }
    }
}

impl FlagStore for FileFlag {
    fn is_armed(&self) -> Result<bool> {
        match std::fs::symlink_metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(self.err(err)),
        }
    }

    fn arm(&self) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| self.err(e))?;
        // The marker must be on storage before the reset that follows.
        file.sync_all().map_err(|e| self.err(e))?;
        debug!(path = ?self.path, "maintenance flag armed");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "maintenance flag cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "picolink-flag-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn arm_then_clear() {
        let dir = temp_dir("cycle");
        let flag = FileFlag::in_dir(&dir);

        assert!(!flag.is_armed().unwrap());
        flag.arm().unwrap();
        assert!(flag.is_armed().unwrap());
        assert!(dir.join(MAINTENANCE_FLAG).exists());

        flag.clear().unwrap();
        assert!(!flag.is_armed().unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn arm_is_idempotent() {
        let dir = temp_dir("twice");
        let flag = FileFlag::in_dir(&dir);
        flag.arm().unwrap();
        flag.arm().unwrap();
        assert!(flag.is_armed().unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn clearing_absent_flag_is_ok() {
        let dir = temp_dir("absent");
        FileFlag::in_dir(&dir).clear().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn arm_in_missing_dir_reports_path() {
        let flag = FileFlag::in_dir("/definitely/not/a/state/dir");
        let err = flag.arm().unwrap_err();
        assert!(matches!(err, BootError::Flag { .. }));
        assert!(err.to_string().contains(MAINTENANCE_FLAG));
    }
}
