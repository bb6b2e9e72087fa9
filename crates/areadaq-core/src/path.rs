//! Output-path selection for file writers.
//!
//! Writers never choose where data lands; a [`PathProvider`] hands them a
//! directory and an extension-less filename at open time, and the plugin's
//! file template turns the pair into the final path.

use std::path::PathBuf;

use chrono::Local;

use crate::document::new_uid;

/// Directory and filename a writer should use for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Directory the plugin writes into; must exist on the plugin host.
    pub directory_path: PathBuf,
    /// Filename without extension.
    pub filename: String,
}

/// Supplies output locations to file writers.
pub trait PathProvider: Send + Sync {
    /// Returns the location the named device should write to next.
    fn path_info(&self, device_name: &str) -> PathInfo;
}

/// Provider returning the same directory and filename on every call.
#[derive(Debug, Clone)]
pub struct StaticPathProvider {
    directory: PathBuf,
    filename: String,
}

impl StaticPathProvider {
    /// Creates a provider over `directory` with a random filename.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), filename: new_uid() }
    }

    /// Overrides the generated filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

impl PathProvider for StaticPathProvider {
    fn path_info(&self, _device_name: &str) -> PathInfo {
        PathInfo { directory_path: self.directory.clone(), filename: self.filename.clone() }
    }
}

/// Provider organizing output under `root/<device>/<YYYY>/<MM>/<DD>` with a
/// fresh filename per call.
#[derive(Debug, Clone)]
pub struct YmdPathProvider {
    root: PathBuf,
}

impl YmdPathProvider {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathProvider for YmdPathProvider {
    fn path_info(&self, device_name: &str) -> PathInfo {
        let today = Local::now();
        let directory_path = self
            .root
            .join(device_name)
            .join(today.format("%Y").to_string())
            .join(today.format("%m").to_string())
            .join(today.format("%d").to_string());
        PathInfo { directory_path, filename: new_uid() }
    }
}
