use std::path::{Path, PathBuf};

use crate::error::{BootError, Result};

/// Logic level of a digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Digital input sampled once at boot.
pub trait BootPin {
    fn level(&mut self) -> Result<Level>;
}

impl<P: BootPin + ?Sized> BootPin for Box<P> {
    fn level(&mut self) -> Result<Level> {
        (**self).level()
    }
}

/// A pin with nothing attached; the internal pull-up holds it high.
#[derive(Debug, Default, Clone, Copy)]
pub struct PullUp;

impl BootPin for PullUp {
    fn level(&mut self) -> Result<Level> {
        Ok(Level::High)
    }
}

/// Pin exposed as a sysfs-style value file containing `0` or `1`.
#[derive(Debug, Clone)]
pub struct SysfsPin {
    path: PathBuf,
}

impl SysfsPin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BootPin for SysfsPin {
    fn level(&mut self) -> Result<Level> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| BootError::Pin {
            path: self.path.clone(),
            source,
        })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(BootError::PinLevel {
                path: self.path.clone(),
                raw: other.to_string(),
            }),
        }
    }
}
