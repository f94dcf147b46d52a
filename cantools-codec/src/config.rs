//! Codec configuration
//!
//! Settings that the library needs to load, sort and create DBC files.
//! Front-ends deserialize this from their own configuration files.

use crate::dbc::DEFAULT_HEADER;
use crate::store::{SortMode, MAX_SIGNALS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extension given to created DBC files
pub const DBC_EXTENSION: &str = "dbc";

/// Configuration for the codec library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Maximum number of signals a loaded file may hold
    #[serde(default = "default_max_signals")]
    pub max_signals: usize,

    /// Ordering applied after every load
    #[serde(default)]
    pub sort_mode: SortMode,

    /// Directory where new DBC files are created
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Header text written to new files
    #[serde(default = "default_header")]
    pub default_header: String,
}

fn default_max_signals() -> usize {
    MAX_SIGNALS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("apps_data/can_tools")
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_signals: default_max_signals(),
            sort_mode: SortMode::default(),
            data_dir: default_data_dir(),
            default_header: default_header(),
        }
    }
}

impl CodecConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the signal limit
    pub fn with_max_signals(mut self, max_signals: usize) -> Self {
        self.max_signals = max_signals;
        self
    }

    /// Builder method: set the sort mode
    pub fn with_sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }

    /// Builder method: set the directory for new files
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Builder method: set the header for new files
    pub fn with_default_header(mut self, header: impl Into<String>) -> Self {
        self.default_header = header.into();
        self
    }
}
