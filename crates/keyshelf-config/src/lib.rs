// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for keyshelf.
//!
//! TOML configuration with strict key checking (`deny_unknown_fields`), XDG
//! file hierarchy lookup, `KEYSHELF_*` environment overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use keyshelf_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("table: {}", config.store.table);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{KeyshelfConfig, LoggingConfig, StoreConfig, TuningConfig};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<KeyshelfConfig, Vec<ConfigError>> {
    validated(loader::load_config(), collect_toml_sources)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<KeyshelfConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Load configuration from an explicit file and validate it.
pub fn load_and_validate_path(
    path: &std::path::Path,
) -> Result<KeyshelfConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Run validation on success; on a Figment error, read the TOML sources
/// (only then) and build diagnostics from them.
fn validated(
    loaded: Result<KeyshelfConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<KeyshelfConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            tracing::debug!(
                path = %config.store.path,
                table = %config.store.table,
                flag = %config.store.flag,
                "configuration loaded"
            );
            Ok(config)
        }
        Err(err) => {
            let errors = diagnostic::figment_to_config_errors(err, &sources());
            tracing::debug!(count = errors.len(), "configuration rejected");
            Err(errors)
        }
    }
}

/// Contents of whichever hierarchy files exist, for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());

    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
