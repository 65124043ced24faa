// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in value codecs.

use keyshelf_core::{Codec, KeyshelfError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON codec for any serde type. The default for [`crate::Store`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, KeyshelfError> {
        serde_json::to_vec(value).map_err(KeyshelfError::codec)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, KeyshelfError> {
        serde_json::from_slice(bytes).map_err(KeyshelfError::codec)
    }
}

/// Stores byte vectors unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Vec<u8>> for RawCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, KeyshelfError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, KeyshelfError> {
        Ok(bytes.to_vec())
    }
}
