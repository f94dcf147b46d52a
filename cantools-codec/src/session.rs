//! Editing session
//!
//! A [`Session`] is the entry point for front-ends. It owns the configuration,
//! the active DBC document and its path, the draft being edited and the
//! current selection. Every change to the store goes through a save followed
//! by a reload, so the in-memory document always matches the file.

use crate::codec::{self, decode_frame_detailed};
use crate::config::CodecConfig;
use crate::dbc::{format_draft_entry, DbcDocument};
use crate::persist;
use crate::signals::{Signal, SignalDraft, SignalField};
use crate::store::{SignalStore, SortMode};
use crate::types::{CodecError, DecodeError, DecodedFrame, Result, ValidationError};
use std::path::{Path, PathBuf};

/// State of one editing session
pub struct Session {
    config: CodecConfig,
    path: Option<PathBuf>,
    document: DbcDocument,
    draft: SignalDraft,
    /// Store index being edited; `None` means the draft is a new signal
    editing: Option<usize>,
    selected: Option<usize>,
}

impl Session {
    /// Create a session with no active file
    ///
    /// # Example
    /// ```no_run
    /// use cantools_codec::{CodecConfig, Session};
    /// use std::path::Path;
    ///
    /// let mut session = Session::new(CodecConfig::new());
    /// session.load(Path::new("apps_data/can_tools/model3.dbc")).unwrap();
    /// for (name, value) in session.decode_frame(0x257, &[0x00, 0x30, 0x12]) {
    ///     println!("{}: {:?}", name, value);
    /// }
    /// ```
    pub fn new(config: CodecConfig) -> Self {
        let document = DbcDocument::new(config.max_signals);
        Self {
            config,
            path: None,
            document,
            draft: SignalDraft::new(),
            editing: None,
            selected: None,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Path of the active file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &DbcDocument {
        &self.document
    }

    pub fn store(&self) -> &SignalStore {
        &self.document.store
    }

    pub fn draft(&self) -> &SignalDraft {
        &self.draft
    }

    /// Index being edited, if the draft came from a stored signal
    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_signal(&self) -> Option<&Signal> {
        self.selected.and_then(|i| self.document.store.get(i))
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn sort_mode(&self) -> SortMode {
        self.config.sort_mode
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.document.store.len();
        if index >= len {
            return Err(CodecError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn active_path(&self) -> Result<PathBuf> {
        self.path.clone().ok_or(CodecError::NoActiveFile)
    }

    /// Make `path` the active file and load it
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let document = persist::load(path, &self.config)?;
        self.document = document;
        self.path = Some(path.to_path_buf());
        self.editing = None;
        self.selected = None;
        Ok(())
    }

    /// Reload the active file from disk
    pub fn reload(&mut self) -> Result<()> {
        let path = self.active_path()?;
        self.document = persist::load(&path, &self.config)?;
        Ok(())
    }

    /// Write the current document to the active file
    pub fn save(&self) -> Result<()> {
        let path = self.active_path()?;
        persist::save(&path, &self.document)
    }

    /// Create a new file in the data directory and make it active
    pub fn create_file(&mut self, name: &str, vehicle_info: &str) -> Result<PathBuf> {
        let path = persist::create(&self.config, name, vehicle_info)?;
        self.load(&path)?;
        Ok(path)
    }

    /// Change the vehicle comment and persist it
    ///
    /// Quotes and line breaks are dropped from `info`.
    pub fn set_vehicle_info(&mut self, info: &str) -> Result<()> {
        let path = self.active_path()?;
        let mut document = self.document.clone();
        document.set_vehicle_info(info);
        persist::save(&path, &document)?;
        self.document = document;
        Ok(())
    }

    /// Validate `text` for `field` against the draft and store it when valid
    ///
    /// A rejected value leaves the draft untouched.
    pub fn validate_field(
        &mut self,
        field: SignalField,
        text: &str,
    ) -> std::result::Result<(), ValidationError> {
        let result = self.draft.accept(field, text);
        if let Err(e) = &result {
            log::debug!("Rejected {:?}: {}", text, e);
        }
        result
    }

    /// Set the owning message name of the draft; blank groups the signal
    /// under its own name
    pub fn set_message_name(&mut self, name: &str) -> std::result::Result<(), ValidationError> {
        self.validate_field(SignalField::MessageName, name)
    }

    /// Load a stored signal into the draft for editing
    pub fn begin_edit(&mut self, index: usize) -> Result<()> {
        let signal = self.document.store.get(index).ok_or(CodecError::IndexOutOfRange {
            index,
            len: self.document.store.len(),
        })?;
        self.draft = SignalDraft::from_signal(signal);
        self.editing = Some(index);
        self.selected = Some(index);
        Ok(())
    }

    /// Blank draft for a new signal
    pub fn reset_draft(&mut self) {
        self.draft = SignalDraft::new();
        self.editing = None;
    }

    /// Fill the draft with the example vehicle speed signal
    pub fn reset_defaults(&mut self) {
        self.draft = SignalDraft::with_defaults();
    }

    /// The `BO_`/`SG_` text the draft would produce
    pub fn draft_preview(&self) -> String {
        format_draft_entry(&self.draft)
    }

    /// Commit the draft to the active file
    ///
    /// Validates every field, replaces the edited signal or appends a new one,
    /// saves, reloads and selects the committed signal. The in-memory document
    /// is left as it was when validation, the capacity check or the save fails.
    pub fn commit_signal(&mut self) -> Result<()> {
        let path = self.active_path()?;
        let signal = self.draft.to_signal()?;
        let (name, can_id) = (signal.signal_name.clone(), signal.can_id);

        let mut document = self.document.clone();
        match self.editing {
            Some(index) => document.store.replace(index, signal)?,
            None => document.store.add(signal)?,
        }
        persist::save(&path, &document)?;

        self.editing = None;
        self.reload()?;
        self.selected = self.document.store.position(&name, can_id);
        log::info!("Committed signal '{}' (0x{:X})", name, can_id);
        Ok(())
    }

    /// Delete the signal at `index`, save and reload
    pub fn delete_signal(&mut self, index: usize) -> Result<Signal> {
        let path = self.active_path()?;
        let mut document = self.document.clone();
        let removed = document.store.delete(index)?;
        persist::save(&path, &document)?;

        self.editing = None;
        self.selected = None;
        self.reload()?;
        log::info!("Deleted signal '{}'", removed.signal_name);
        Ok(removed)
    }

    /// Append signals from another source, save and reload
    ///
    /// Signals beyond the store's capacity are skipped with a warning.
    /// Returns how many were added.
    pub fn import_signals(&mut self, signals: impl IntoIterator<Item = Signal>) -> Result<usize> {
        let path = self.active_path()?;
        let mut document = self.document.clone();
        let mut added = 0;
        for signal in signals {
            if document.store.is_full() {
                log::warn!(
                    "Signal limit ({}) reached, skipping '{}'",
                    document.store.capacity(),
                    signal.signal_name
                );
                continue;
            }
            document.store.add(signal)?;
            added += 1;
        }
        persist::save(&path, &document)?;

        self.editing = None;
        self.selected = None;
        self.reload()?;
        Ok(added)
    }

    /// Switch between name and CAN ID ordering and re-sort
    pub fn toggle_sort(&mut self) -> SortMode {
        let mode = self.config.sort_mode.toggle();
        self.set_sort(mode);
        mode
    }

    /// Re-sort with `mode`; the selection is cleared since indices move
    pub fn set_sort(&mut self, mode: SortMode) {
        self.config.sort_mode = mode;
        self.document.store.sort(mode);
        self.selected = None;
    }

    /// Decode a frame against the loaded signals
    pub fn decode_frame(
        &self,
        can_id: u32,
        payload: &[u8],
    ) -> Vec<(String, std::result::Result<f64, DecodeError>)> {
        codec::decode_frame(&self.document.store, can_id, payload)
    }

    /// Decode a frame into a timestamped record
    pub fn decode_frame_detailed(&self, can_id: u32, payload: &[u8]) -> DecodedFrame {
        decode_frame_detailed(&self.document.store, can_id, payload)
    }
}
