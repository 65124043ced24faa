// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for keyshelf.
//!
//! Holds the pieces shared by every keyshelf crate: the error type, the
//! dict-like store traits, the value codec seam, and key normalization.

pub mod error;
pub mod key;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::KeyshelfError;
pub use key::StoreKey;
pub use traits::{AsyncKvStore, Codec, KvStore};
pub use types::{JournalMode, OpenMode, Origin, SynchronousMode, TempStore, WorkerState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let denied = KeyshelfError::AccessDenied { operation: "write to" };
        assert_eq!(denied.to_string(), "refusing to write to read-only store");

        let missing = KeyshelfError::KeyNotFound { key: "a".into() };
        assert_eq!(missing.to_string(), "key not found: a");

        let mode = KeyshelfError::InvalidMode("z".into());
        assert_eq!(mode.to_string(), "unrecognized open flag: \"z\"");

        let dir = KeyshelfError::MissingDirectory {
            path: "/nope/here".into(),
        };
        assert_eq!(dir.to_string(), "directory /nope/here does not exist");
    }

    #[test]
    fn statement_error_carries_origin() {
        let err = KeyshelfError::Statement {
            message: "no such table: t".into(),
            statement: "SELECT 1 FROM t".into(),
            origin: Origin::capture(),
        };
        assert!(err.is_statement());
        let rendered = err.to_string();
        assert!(rendered.contains("no such table: t"));
        assert!(rendered.contains(file!()));
    }

    #[test]
    fn store_traits_are_exported() {
        fn _assert_kv_store<T: KvStore<u32>>() {}
        fn _assert_async_kv_store<T: AsyncKvStore<u32>>() {}
        fn _assert_codec<T: Codec<u32>>() {}
    }
}
