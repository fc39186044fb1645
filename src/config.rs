use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use toml::{Table, Value};

/// Setting keys understood by the bundled analyzers and the engine.
pub mod keys {
    /// Whether the manual (`.dependencyproperties`) analyzer runs.
    pub const ANALYZER_MANUAL_ENABLED: &str = "analyzer.manual.enabled";
    /// Whether analyzers flagged as experimental may run.
    pub const ANALYZER_EXPERIMENTAL_ENABLED: &str = "analyzer.experimental.enabled";
}

const CONFIG_DIR: &str = ".evidence-checkr";
const CONFIG_FILE: &str = "config.toml";

/// Settings store, deserialized from `.evidence-checkr/config.toml`.
///
/// Keys are dotted paths resolved through nested tables, so
///
/// ```toml
/// analyzer.manual.enabled = false
/// ```
///
/// and
///
/// ```toml
/// [analyzer.manual]
/// enabled = false
/// ```
///
/// are the same setting.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    table: Table,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: Table = toml::from_str(content)?;
        Ok(Self { table })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.table.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Boolean setting, or `default` when the key is missing or not a boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Set a boolean, creating intermediate tables as needed. An intermediate
    /// non-table value is replaced.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };

        let mut table = &mut self.table;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                return;
            };
            table = next;
        }
        table.insert(last.to_string(), Value::Boolean(value));
    }
}

/// Load settings, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.evidence-checkr/config.toml`
/// 3. `~/.config/evidence-checkr/config.toml`
/// 4. Built-in [`Settings::default`] (every key at its default)
pub fn load_settings(project_path: &Path, config_override: Option<&Path>) -> Result<Settings> {
    if let Some(path) = config_override {
        return read_settings(path);
    }

    let project_config = project_path.join(CONFIG_DIR).join(CONFIG_FILE);
    if project_config.exists() {
        return read_settings(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("evidence-checkr")
            .join(CONFIG_FILE);
        if home_config.exists() {
            return read_settings(&home_config);
        }
    }

    debug!("No settings file found, using defaults");
    Ok(Settings::default())
}

fn read_settings(path: &Path) -> Result<Settings> {
    debug!("Loading settings from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    Settings::from_toml(&content)
        .with_context(|| format!("invalid settings file {}", path.display()))
}
