// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the store facade and its pluggable parts.

pub mod codec;
pub mod store;

pub use codec::Codec;
pub use store::{AsyncKvStore, KvStore};
