// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! keyshelf - command-line access to SQLite-backed key-value stores.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use keyshelf_config::KeyshelfConfig;

/// keyshelf - a persistent dictionary in a SQLite file.
#[derive(Parser, Debug)]
#[command(name = "keyshelf", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides `store.path`).
    #[arg(long, global = true)]
    path: Option<String>,

    /// Table name (overrides `store.table`).
    #[arg(long, global = true)]
    table: Option<String>,

    /// Open flag: c, w, r or n (overrides `store.flag`).
    #[arg(long, global = true)]
    flag: Option<String>,

    /// Commit after every write (overrides `store.autocommit`).
    #[arg(long, global = true)]
    autocommit: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the value stored under KEY as JSON.
    Get { key: String },
    /// Store VALUE under KEY. VALUE is parsed as JSON, falling back to a string.
    Set { key: String, value: String },
    /// Remove KEY.
    Delete { key: String },
    /// List keys in insertion order.
    Keys,
    /// List `key<TAB>value` pairs in insertion order.
    Items,
    /// Print the number of entries.
    Len,
    /// Remove every entry from the table.
    Clear,
    /// List the tables in the database file.
    Tables,
    /// Delete the database file, including every table in it.
    Terminate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => keyshelf_config::load_and_validate_path(path),
        None => keyshelf_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            keyshelf_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&mut config, &cli);
    init_tracing(&config.logging.level);

    let mut stdout = std::io::stdout().lock();
    match commands::run(&cli.command, &config, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("keyshelf: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Command-line options win over every config layer.
fn apply_overrides(config: &mut KeyshelfConfig, cli: &Cli) {
    if let Some(path) = &cli.path {
        config.store.path = path.clone();
    }
    if let Some(table) = &cli.table {
        config.store.table = table.clone();
    }
    if let Some(flag) = &cli.flag {
        config.store.flag = flag.clone();
    }
    if cli.autocommit {
        config.store.autocommit = true;
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "keyshelf={log_level},keyshelf_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "keyshelf",
            "--path",
            "/tmp/x.sqlite",
            "--table",
            "books",
            "--flag",
            "r",
            "--autocommit",
            "len",
        ]);
        let mut config = KeyshelfConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.store.path, "/tmp/x.sqlite");
        assert_eq!(config.store.table, "books");
        assert_eq!(config.store.flag, "r");
        assert!(config.store.autocommit);
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::parse_from(["keyshelf", "get", "k", "--table", "t"]);
        assert_eq!(cli.table.as_deref(), Some("t"));
        assert!(matches!(cli.command, Commands::Get { ref key } if key == "k"));
    }
}
