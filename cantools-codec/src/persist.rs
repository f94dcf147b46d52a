//! DBC file persistence
//!
//! Loading always rebuilds the document from scratch. Saving truncates the
//! file and rewrites it; a failure part-way through leaves a truncated file.

use crate::config::{CodecConfig, DBC_EXTENSION};
use crate::dbc::{self, DbcDocument};
use crate::types::{CodecError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Read a file as text, falling back to Latin-1 when it is not UTF-8
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).unwrap_or_else(|e| {
        log::warn!("{:?} is not UTF-8, reading as Latin-1", path);
        e.into_bytes().iter().map(|&b| b as char).collect()
    });
    Ok(text)
}

/// Load a DBC file and sort its signals with the configured mode
pub fn load(path: &Path, config: &CodecConfig) -> Result<DbcDocument> {
    log::info!("Loading DBC file: {:?}", path);

    let text = read_text(path)?;
    let mut document = dbc::parse_document(&text, config.max_signals);
    document.store.sort(config.sort_mode);

    log::info!(
        "Loaded {} signals ({} header bytes) from {:?}",
        document.store.len(),
        document.header.len(),
        path
    );
    Ok(document)
}

/// Write a document to `path`, replacing any previous contents
pub fn save(path: &Path, document: &DbcDocument) -> Result<()> {
    log::info!("Saving {} signals to {:?}", document.store.len(), path);

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    dbc::write_document(&mut writer, document)?;
    writer.flush()?;
    Ok(())
}

/// Map a user-supplied name onto `[A-Za-z0-9_]`, using `vehicle` when blank
pub fn sanitize_file_name(name: &str) -> String {
    if name.is_empty() {
        return "vehicle".to_string();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Path a file created under `name` would get
pub fn dbc_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(sanitize_file_name(name))
        .with_extension(DBC_EXTENSION)
}

/// Create a new DBC file in the configured data directory
///
/// Fails with [`CodecError::FileExists`] instead of overwriting.
pub fn create(config: &CodecConfig, name: &str, vehicle_info: &str) -> Result<PathBuf> {
    fs::create_dir_all(&config.data_dir)?;
    let path = dbc_path(&config.data_dir, name);

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => CodecError::FileExists(path.clone()),
            _ => CodecError::IoError(e),
        })?;

    let document = DbcDocument::new(config.max_signals)
        .with_header(config.default_header.as_str())
        .with_vehicle_info(vehicle_info);

    let mut writer = BufWriter::new(file);
    dbc::write_document(&mut writer, &document)?;
    writer.flush()?;

    log::info!("Created DBC file: {:?}", path);
    Ok(path)
}

/// Vehicle comment of a file, without parsing its signals
pub fn read_vehicle_info(path: &Path) -> Result<Option<String>> {
    let text = read_text(path)?;
    Ok(text
        .lines()
        .find_map(|line| dbc::parse_vehicle_comment(line.trim()))
        .map(str::to_string))
}
