//! Storage layer
//!
//! Crash-safe JSON file persistence on the flash filesystem.
//!
//! ## Write path
//!
//! - serialize to `<file>.tmp`, sync, close
//! - delete `<file>`
//! - rename `<file>.tmp` to `<file>`
//!
//! A crash at any point leaves either the old or the new document readable;
//! [`recover_temp`] settles whatever temp file a crash left behind.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{
    atomic_write, backup_corrupt, corrupt_backup_path, load_document, recover_temp,
    save_document, temp_path, TempRecovery,
};
