// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value serialization trait.

use crate::error::KeyshelfError;

/// Converts values to and from the opaque blob stored in the `value` column.
///
/// Implementations must satisfy `decode(encode(v)) == v`.
pub trait Codec<V>: Send + Sync + 'static {
    /// Serializes a value into a blob.
    fn encode(&self, value: &V) -> Result<Vec<u8>, KeyshelfError>;

    /// Deserializes a blob produced by [`Codec::encode`].
    fn decode(&self, bytes: &[u8]) -> Result<V, KeyshelfError>;
}
