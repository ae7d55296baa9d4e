// escat - CLI for the Elasticsearch cat and cluster monitoring APIs
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_USER: &str = "elastic";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a config directory for the current user")]
    MissingConfigDir,
    #[error(
        "host URL should be specified; use --host, set ES_HOST, or add `host:` to .escat.yaml"
    )]
    MissingHost,
    #[error("reading {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub insecure: bool,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".escat.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("ESCAT_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("escat").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

/// Layers `overrides` (flags and environment, as parsed by clap) over the
/// config files and fills in defaults.
pub fn resolve(cwd: &Path, overrides: Config) -> Result<EffectiveConfig> {
    let merged = merge(load(cwd)?, overrides);

    let host = merged
        .host
        .map(|h| h.trim().to_string())
        .ok_or(ConfigError::MissingHost)?;

    Ok(EffectiveConfig {
        host,
        user: merged.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
        password: merged.password,
        insecure: merged.insecure,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

/// Values in `upper` win; blank strings count as unset.
fn merge(lower: Config, upper: Config) -> Config {
    Config {
        host: non_blank(upper.host).or(non_blank(lower.host)),
        user: non_blank(upper.user).or(non_blank(lower.user)),
        password: non_blank(upper.password).or(non_blank(lower.password)),
        insecure: upper.insecure || lower.insecure,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
