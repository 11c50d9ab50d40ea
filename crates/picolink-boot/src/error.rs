use std::path::PathBuf;

/// Errors raised while probing boot signals.
///
/// None of these abort a boot; the selector treats them as "signal absent".
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// The maintenance flag marker could not be inspected or changed.
    #[error("maintenance flag {path}: {source}")]
    Flag {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The boot pin could not be read.
    #[error("boot pin {path}: {source}")]
    Pin {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The boot pin reported something other than `0` or `1`.
    #[error("boot pin {path} reported invalid level {raw:?}")]
    PinLevel { path: PathBuf, raw: String },
}

pub type Result<T> = std::result::Result<T, BootError>;
