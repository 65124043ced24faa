// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key normalization.
//!
//! Every key is stored as TEXT. Scalar keys are stored as their plain string
//! form; composite keys (sequences, sets, maps) are stored as compact JSON.
//! Sets are sorted and maps are keyed in sorted order, so two equal composite
//! keys always produce the same stored string regardless of hashing order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde_json::Value;

/// A type usable as a store key.
pub trait StoreKey {
    /// JSON form of the key, used when it is nested inside a composite key.
    fn to_json(&self) -> Value;

    /// Canonical string written to the `key` column.
    fn normalize(&self) -> String {
        match self.to_json() {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl<T: StoreKey + ?Sized> StoreKey for &T {
    fn to_json(&self) -> Value {
        (**self).to_json()
    }

    fn normalize(&self) -> String {
        (**self).normalize()
    }
}

impl StoreKey for str {
    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }

    fn normalize(&self) -> String {
        self.to_string()
    }
}

impl StoreKey for String {
    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn normalize(&self) -> String {
        self.clone()
    }
}

impl StoreKey for char {
    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl StoreKey for bool {
    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! integer_keys {
    ($($ty:ty),*) => {
        $(
            impl StoreKey for $ty {
                fn to_json(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

integer_keys!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn sequence<'a, T: StoreKey + 'a>(items: impl IntoIterator<Item = &'a T>) -> Value {
    Value::Array(items.into_iter().map(StoreKey::to_json).collect())
}

impl<T: StoreKey> StoreKey for [T] {
    fn to_json(&self) -> Value {
        sequence(self)
    }
}

impl<T: StoreKey, const N: usize> StoreKey for [T; N] {
    fn to_json(&self) -> Value {
        sequence(self)
    }
}

impl<T: StoreKey> StoreKey for Vec<T> {
    fn to_json(&self) -> Value {
        sequence(self)
    }
}

impl<T: StoreKey> StoreKey for VecDeque<T> {
    fn to_json(&self) -> Value {
        sequence(self)
    }
}

macro_rules! tuple_keys {
    ($(($($name:ident),+)),*) => {
        $(
            impl<$($name: StoreKey),+> StoreKey for ($($name,)+) {
                #[allow(non_snake_case)]
                fn to_json(&self) -> Value {
                    let ($($name,)+) = self;
                    Value::Array(vec![$($name.to_json()),+])
                }
            }
        )*
    };
}

tuple_keys!((A), (A, B), (A, B, C), (A, B, C, D), (A, B, C, D, E));

impl<T: StoreKey> StoreKey for BTreeSet<T> {
    fn to_json(&self) -> Value {
        sequence(self)
    }
}

impl<T: StoreKey + Ord, S> StoreKey for HashSet<T, S> {
    fn to_json(&self) -> Value {
        let mut items: Vec<&T> = self.iter().collect();
        items.sort();
        sequence(items)
    }
}

fn mapping<'a, K, V>(entries: impl IntoIterator<Item = (&'a K, &'a V)>) -> Value
where
    K: StoreKey + 'a,
    V: StoreKey + 'a,
{
    let sorted: BTreeMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.normalize(), v.to_json()))
        .collect();
    Value::Object(sorted.into_iter().collect())
}

impl<K: StoreKey, V: StoreKey> StoreKey for BTreeMap<K, V> {
    fn to_json(&self) -> Value {
        mapping(self)
    }
}

impl<K: StoreKey, V: StoreKey, S> StoreKey for HashMap<K, V, S> {
    fn to_json(&self) -> Value {
        mapping(self)
    }
}
