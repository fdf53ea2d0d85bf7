use crate::error::{PkgScoreError, Result};
use crate::types::config::ScorerConfig;
use std::path::{Path, PathBuf};
use toml::map::Map;
use toml::Value;

pub const DEFAULT_CONFIG_FILE: &str = "pkgscore.toml";
pub const DEFAULT_GLOBAL_CONFIG_FILE: &str = ".config/pkgscore/config.toml";

/// Loads built-in defaults, then the global file, then either `explicit` or
/// `./pkgscore.toml`. Later layers win key by key.
pub fn load_config(explicit: Option<&Path>) -> Result<ScorerConfig> {
    let global = std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(DEFAULT_GLOBAL_CONFIG_FILE));
    let cwd = std::env::current_dir()?;
    load_config_with_global(&cwd, explicit, global.as_deref())
}

pub(crate) fn load_config_with_global(
    cwd: &Path,
    explicit: Option<&Path>,
    global_path: Option<&Path>,
) -> Result<ScorerConfig> {
    let mut merged = Value::Table(Map::new());
    if let Some(path) = global_path {
        merge_file_if_exists(&mut merged, path)?;
    }

    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(PkgScoreError::ConfigNotFound(path.display().to_string()));
            }
            merge_file_if_exists(&mut merged, path)?;
        }
        None => merge_file_if_exists(&mut merged, &cwd.join(DEFAULT_CONFIG_FILE))?,
    }

    let cfg: ScorerConfig = merged
        .try_into()
        .map_err(|e: toml::de::Error| PkgScoreError::ConfigParse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn merge_file_if_exists(merged: &mut Value, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let value = read_toml_value(path)?;
    merge_toml(merged, value);
    Ok(())
}

fn read_toml_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| PkgScoreError::ConfigParse(format!("{}: {}", path.display(), e)))
}

fn merge_toml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value;
        }
    }
}
