// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Abel assistant.
//!
//! Layered TOML files and `ABEL_*` environment variables are merged with
//! Figment, checked strictly (`deny_unknown_fields`, then [`validation`]),
//! and failures are reported as miette diagnostics with key suggestions.
//!
//! ```no_run
//! let config = match abel_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         abel_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AbelConfig;

/// Loads from the standard search path and validates.
pub fn load_and_validate() -> Result<AbelConfig, Vec<ConfigError>> {
    let config = finish(loader::load_config(), || {
        loader::search_paths().iter().filter_map(|p| read_source(p)).collect()
    })?;
    tracing::debug!(
        database = %config.storage.database_path,
        chat_model = %config.gemini.chat_model,
        "configuration loaded"
    );
    Ok(config)
}

/// Loads from `path` (plus environment overrides) and validates.
pub fn load_and_validate_path(path: &Path) -> Result<AbelConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Loads from an in-memory TOML document and validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<AbelConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a loaded config, or turns the Figment error into diagnostics
/// against the TOML `sources` it may point into.
fn finish(
    loaded: Result<AbelConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<AbelConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), content))
}
