//! CAN Tools signal codec
//!
//! Library behind the CAN Tools signal editor: a bit-level codec for CAN
//! signals and a round-trip reader/writer for the DBC text format.
//!
//! # Architecture
//!
//! - [`signals`]: the signal model and per-field validation of drafts
//! - [`codec`]: raw bit extraction/insertion and physical value conversion
//! - [`store`]: bounded ordered signal collection
//! - [`dbc`]: `BO_`/`SG_` serializer, line parser and `can-dbc` import
//! - [`persist`]: DBC files on disk
//! - [`session`]: validate, commit, save and reload over an owned context
//!
//! Everything runs synchronously on the caller's thread. There is no global
//! state; a front-end owns one [`Session`] per active file.
//!
//! # Example Usage
//!
//! ```no_run
//! use cantools_codec::{CodecConfig, Session, SignalField};
//!
//! let mut session = Session::new(CodecConfig::new());
//! session.create_file("model3", "Tesla Model 3 2021").unwrap();
//!
//! session.reset_defaults();
//! session.validate_field(SignalField::Unit, "km/h").unwrap();
//! session.commit_signal().unwrap();
//!
//! for (name, value) in session.decode_frame(0x257, &[0x00, 0x30, 0x12, 0, 0, 0, 0, 0]) {
//!     match value {
//!         Ok(v) => println!("{}: {:.3}", name, v),
//!         Err(e) => eprintln!("{}: decode error ({})", name, e),
//!     }
//! }
//! ```

// Public modules
pub mod codec;
pub mod config;
pub mod dbc;
pub mod persist;
pub mod session;
pub mod signals;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use codec::{decode_frame, decode_signal_value, encode_signal_value, extract_raw, insert_raw};
pub use config::CodecConfig;
pub use dbc::DbcDocument;
pub use session::Session;
pub use signals::{ByteOrder, Signal, SignalDraft, SignalField, ValueType};
pub use store::{SignalStore, SortMode, StoreStats, MAX_SIGNALS};
pub use types::{
    CodecError, DecodeError, DecodedFrame, DecodedSignal, EncodeError, ParseError, Result,
    Timestamp, ValidationError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a fresh session has nothing loaded
        let session = Session::new(CodecConfig::new());
        let stats = session.store().stats();
        assert_eq!(stats.num_signals, 0);
        assert_eq!(stats.capacity, MAX_SIGNALS);
        assert!(session.path().is_none());
    }
}
