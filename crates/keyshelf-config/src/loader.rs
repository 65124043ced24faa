// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./keyshelf.toml` > `~/.config/keyshelf/keyshelf.toml` >
//! `/etc/keyshelf/keyshelf.toml` with environment variable overrides via `KEYSHELF_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KeyshelfConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/keyshelf/keyshelf.toml";
pub(crate) const LOCAL_CONFIG: &str = "keyshelf.toml";

/// Path of the per-user config file, if the platform has a config directory.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keyshelf/keyshelf.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/keyshelf/keyshelf.toml` (system-wide)
/// 3. `~/.config/keyshelf/keyshelf.toml` (user XDG config)
/// 4. `./keyshelf.toml` (local directory)
/// 5. `KEYSHELF_*` environment variables
pub fn load_config() -> Result<KeyshelfConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KeyshelfConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeyshelfConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeyshelfConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeyshelfConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KeyshelfConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `KEYSHELF_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys such as
/// `journal_mode` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("KEYSHELF_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("store_", "store.", 1)
            .replacen("tuning_", "tuning.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshelf_core::JournalMode;

    #[test]
    fn env_overrides_nested_keys_with_underscores() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("KEYSHELF_STORE_PATH", "/tmp/env.db");
            jail.set_env("KEYSHELF_TUNING_JOURNAL_MODE", "wal");
            jail.set_env("KEYSHELF_STORE_AUTOCOMMIT", "true");
            let config = load_config()?;
            assert_eq!(config.store.path, "/tmp/env.db");
            assert_eq!(config.tuning.journal_mode, JournalMode::Wal);
            assert!(config.store.autocommit);
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "keyshelf.toml",
                r#"
                [store]
                table = "books"
                flag = "w"
                "#,
            )?;
            let config = load_config()?;
            assert_eq!(config.store.table, "books");
            assert_eq!(config.store.flag, "w");
            assert_eq!(config.store.path, "keyshelf.db");
            Ok(())
        });
    }
}
