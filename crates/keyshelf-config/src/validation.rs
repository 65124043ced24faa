// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: known open flags, a usable table
//! name, a recognised log level.

use keyshelf_core::OpenMode;

use crate::diagnostic::ConfigError;
use crate::model::KeyshelfConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &KeyshelfConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if OpenMode::parse(&config.store.flag).is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "store.flag must be one of c, w, r, n, got `{}`",
                config.store.flag
            ),
        });
    }

    if config.store.table.is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.table must not be empty".to_string(),
        });
    }

    if config.store.table.contains('\0') {
        errors.push(ConfigError::Validation {
            message: "store.table must not contain NUL characters".to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.logging.level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
