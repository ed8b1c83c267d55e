use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, schema::CrosspostConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["crosspost.toml", "crosspost.json"];

/// Load config from the given path (format chosen by extension).
pub fn load_config(path: &Path) -> Result<CrosspostConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load the explicit `path` if given, otherwise discover one.
///
/// Search order without an explicit path:
/// 1. `./crosspost.{toml,json}`
/// 2. `<user config dir>/crosspost.{toml,json}`
///
/// An explicit path must load; a discovered file that fails to load is
/// logged and replaced by defaults.
pub fn discover_and_load(path: Option<&Path>) -> Result<CrosspostConfig> {
    if let Some(path) = path {
        debug!(path = %path.display(), "loading config");
        return load_config(path);
    }
    let Some(path) = find_config_file(Path::new("."), config_dir().as_deref()) else {
        debug!("no config file found, using defaults");
        return Ok(CrosspostConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            Ok(CrosspostConfig::default())
        },
    }
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "crosspost").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file(local: &Path, global: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(local)
        .chain(global)
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<CrosspostConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
