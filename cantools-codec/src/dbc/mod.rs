//! DBC text format
//!
//! Reading and writing the subset of DBC used for signal definitions:
//! `BO_` message lines, `SG_` signal lines and a `CM_ "Vehicle: ..."`
//! comment. Every other line is carried through untouched as header text.

pub mod import;
pub mod reader;
pub mod writer;

use crate::store::SignalStore;

pub use import::{import_dbc_file, signals_from_dbc};
pub use reader::{parse_bo_line, parse_document, parse_sg_line, parse_vehicle_comment};
pub use writer::{format_bo_line, format_draft_entry, format_sg_line, render_document, write_document};

/// Start of the comment line carrying vehicle information
pub const VEHICLE_PREFIX: &str = "CM_ \"Vehicle: ";

/// Header written to newly created files
pub const DEFAULT_HEADER: &str = "VERSION \"\"\n\
NS_ :\n    CM_\n    BA_DEF_\n    BA_\n    VAL_\n\
BS_:\n\
BU_: Vector__XXX\n";

/// Message name used for signals that appear before any `BO_` line
pub const DEFAULT_MESSAGE_NAME: &str = "Message";

/// An in-memory DBC file
#[derive(Debug, Clone, PartialEq)]
pub struct DbcDocument {
    /// Passthrough lines, each terminated by `\n`
    pub header: String,
    /// Text of the vehicle comment, if the file has a non-empty one
    pub vehicle_info: Option<String>,
    /// Signals parsed from `SG_` lines
    pub store: SignalStore,
}

impl DbcDocument {
    /// Empty document with no header
    pub fn new(max_signals: usize) -> Self {
        Self {
            header: String::new(),
            vehicle_info: None,
            store: SignalStore::new(max_signals),
        }
    }

    /// Builder method: replace the header text
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Builder method: set the vehicle comment (blank clears it)
    pub fn with_vehicle_info(mut self, info: impl Into<String>) -> Self {
        self.set_vehicle_info(info);
        self
    }

    /// Set the vehicle comment, dropping quotes and line breaks
    pub fn set_vehicle_info(&mut self, info: impl Into<String>) {
        let info: String = info
            .into()
            .chars()
            .filter(|c| !matches!(c, '"' | '\r' | '\n'))
            .collect();
        self.vehicle_info = if info.is_empty() { None } else { Some(info) };
    }
}

impl Default for DbcDocument {
    fn default() -> Self {
        Self::new(crate::store::MAX_SIGNALS).with_header(DEFAULT_HEADER)
    }
}
