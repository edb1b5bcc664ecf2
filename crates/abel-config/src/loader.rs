// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./abel.toml` > `~/.config/abel/abel.toml` > `/etc/abel/abel.toml`
//! with environment variable overrides via `ABEL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AbelConfig;

const SECTIONS: [&str; 4] = ["assistant", "gemini", "storage", "memory"];

/// Config files in merge order; later files override earlier ones.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/abel/abel.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("abel").join("abel.toml"));
    }
    paths.push(PathBuf::from("abel.toml"));
    paths
}

/// Compiled defaults, then every file of [`search_paths`], then `ABEL_*`
/// environment variables.
pub fn load_config() -> Result<AbelConfig, figment::Error> {
    build_figment().extract()
}

/// Compiled defaults and `toml_content` only; no files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<AbelConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Compiled defaults, the file at `path`, then environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<AbelConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(AbelConfig::default()))
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config key.
///
/// Only the underscore after the section name becomes a dot, so
/// `gemini_api_key` maps to `gemini.api_key`, not `gemini.api.key`.
pub fn map_env_key(key: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}

fn env_provider() -> Env {
    Env::prefixed("ABEL_").map(|key| map_env_key(key.as_str()).into())
}
