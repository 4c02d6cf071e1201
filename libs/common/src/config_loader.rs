//! Configuration loading helper functions
//!
//! Priority (highest to lowest):
//! 1. Explicit overrides (command line)
//! 2. Environment variables (prefixed)
//! 3. Config file (YAML, TOML or JSON, chosen by extension)
//! 4. Serde defaults of the target type

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Build the layered figment for an optional file and an env prefix
pub fn build_figment(path: Option<&Path>, env_prefix: &str) -> Result<Figment> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        figment = match extension.as_deref() {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("toml") => figment.merge(Toml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported config format: {}",
                    path.display()
                )))
            },
        };
        info!("Using config file: {}", path.display());
    }

    debug!("Environment overrides: {}*", env_prefix);
    Ok(figment.merge(Env::prefixed(env_prefix)))
}

/// Load `T` from an optional file plus prefixed environment variables
pub fn load_config<T>(path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    Ok(build_figment(path, env_prefix)?.extract()?)
}

/// Same as [`load_config`], with `overrides` merged on top of every other source
///
/// Fields the overrides skip while serializing keep their lower-priority value.
pub fn load_config_with<T, O>(path: Option<&Path>, env_prefix: &str, overrides: &O) -> Result<T>
where
    T: DeserializeOwned,
    O: Serialize,
{
    Ok(build_figment(path, env_prefix)?
        .merge(Serialized::defaults(overrides))
        .extract()?)
}
