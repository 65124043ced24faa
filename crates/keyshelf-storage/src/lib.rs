// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed key-value store for keyshelf.
//!
//! Each open [`Store`] owns one dedicated worker thread, which owns the only
//! SQLite connection for that store. Callers on any thread submit commands to
//! a FIFO queue and, where they need an answer, wait on a private result
//! channel. Statement failures are deferred: the worker records them and the
//! next call on the store reports them.
//!
//! ```no_run
//! use keyshelf_storage::StoreOptions;
//!
//! let store = StoreOptions::new("books.sqlite")
//!     .table("fiction")
//!     .autocommit(true)
//!     .open::<String>()?;
//! store.set("dune", &"Frank Herbert".to_string())?;
//! assert_eq!(store.get("dune")?.as_deref(), Some("Frank Herbert"));
//! store.close()?;
//! # Ok::<(), keyshelf_core::KeyshelfError>(())
//! ```

pub mod asynchronous;
pub mod codec;
pub mod command;
pub mod connection;
pub mod store;
pub mod tables;
mod worker;

pub use asynchronous::AsyncStore;
pub use codec::{JsonCodec, RawCodec};
pub use command::{Row, Rows};
pub use connection::Connection;
pub use store::{Items, Keys, Store, StoreOptions, Values};
pub use tables::list_tables;
pub use worker::MEMORY_PATH;
