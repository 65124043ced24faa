// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for keyshelf integration tests.
//!
//! [`TestStore`] opens a store on a throwaway database file, optionally
//! seeded with entries, and can write a matching `keyshelf.toml` for tests
//! that drive the `keyshelf` binary.

pub mod harness;

pub use harness::{TestStore, TestStoreBuilder};
