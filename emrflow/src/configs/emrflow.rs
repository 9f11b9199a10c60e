// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Configuration settings that affect all crates in current system.

use crate::error::{FlowError, Result};
use ini::Ini;
use lazy_static::lazy_static;
use std::path::Path;
use std::time::Duration;

lazy_static! {
    /// Global settings.
    pub static ref EMRFLOW_CONF: Ini = Ini::load_from_str(include_str!("./config.toml")).unwrap();
}

/// Loads an INI file that overrides the bundled settings.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Ini> {
    Ini::load_from_file(path.as_ref()).map_err(|e| {
        FlowError::Config(format!(
            "failed to load {}: {}",
            path.as_ref().display(),
            e
        ))
    })
}

/// Returns the value of `key` in `section`.
pub fn setting<'a>(conf: &'a Ini, section: &str, key: &str) -> Result<&'a str> {
    conf.get_from(Some(section), key)
        .ok_or_else(|| FlowError::Config(format!("missing setting [{}] {}", section, key)))
}

/// Parses a setting into any [`FromStr`](std::str::FromStr) type.
pub fn parse_setting<T>(conf: &Ini, section: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = setting(conf, section, key)?;
    raw.trim().parse::<T>().map_err(|e| {
        FlowError::Config(format!(
            "invalid setting [{}] {} = {:?}: {}",
            section, key, raw, e
        ))
    })
}

/// Parses a human-readable duration setting, e.g. `60s` or `10min`.
pub fn duration_setting(conf: &Ini, section: &str, key: &str) -> Result<Duration> {
    Ok(humantime::parse_duration(setting(conf, section, key)?.trim())?)
}

/// Splits a comma separated setting. Empty items are dropped, so an empty
/// value yields an empty list.
pub fn list_setting(conf: &Ini, section: &str, key: &str) -> Result<Vec<String>> {
    Ok(setting(conf, section, key)?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect())
}
