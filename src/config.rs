use crate::filter::{ColumnOption, FilterStrategy, OptionFilter};
use crate::table::{Column, FilterMeta};
use crate::ui::components::SelectorDelays;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Header title (defaults to the data file name)
  pub title: Option<String>,
  /// JSON data file, relative to the config file
  pub data: Option<PathBuf>,
  /// Column definitions; inferred from the data when empty
  #[serde(default)]
  pub columns: Vec<ColumnConfig>,
  #[serde(default)]
  pub ui: UiConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Directory of the loaded config file
  #[serde(skip)]
  base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
  /// Object key in each row
  pub key: String,
  pub header: Option<String>,
  #[serde(default = "default_true")]
  pub filterable: bool,
  pub filter: Option<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
  pub label: String,
  pub icon: Option<String>,
  #[serde(rename = "type", default = "default_filter_type")]
  pub filter_type: String,
  pub options: Option<Vec<ColumnOption>>,
  /// Raw value -> label, applied to options derived from the data
  #[serde(default)]
  pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
  pub tick_rate_ms: u64,
  /// Delay before the selector's search text is cleared after closing
  pub search_reset_ms: u64,
  /// Delay before the selector forgets the chosen filter after closing
  pub selection_reset_ms: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: 100,
      search_reset_ms: 150,
      selection_reset_ms: 100,
    }
  }
}

impl UiConfig {
  pub fn tick_rate(&self) -> Duration {
    Duration::from_millis(self.tick_rate_ms)
  }

  pub fn delays(&self) -> SelectorDelays {
    SelectorDelays {
      search_reset: Duration::from_millis(self.search_reset_ms),
      selection_reset: Duration::from_millis(self.selection_reset_ms),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
  /// EnvFilter directive; RUST_LOG takes precedence
  pub filter: String,
  pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      filter: "info".to_string(),
      dir: None,
    }
  }
}

impl LoggingConfig {
  /// Log directory, defaulting to <data_local_dir>/tabfilter/logs
  pub fn log_dir(&self) -> PathBuf {
    self.dir.clone().unwrap_or_else(|| {
      dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabfilter")
        .join("logs")
    })
  }
}

fn default_true() -> bool {
  true
}

fn default_filter_type() -> String {
  OptionFilter::TAG.to_string()
}

impl ColumnConfig {
  pub fn to_column(&self) -> Column {
    let mut column = Column::new(self.key.clone()).can_filter(self.filterable);
    if let Some(header) = &self.header {
      column = column.header(header.clone());
    }
    if let Some(filter) = &self.filter {
      column = column.filter(filter.to_meta());
    }
    column
  }
}

impl FilterConfig {
  pub fn to_meta(&self) -> FilterMeta {
    let mut meta = FilterMeta::new(self.label.clone(), self.filter_type.clone());
    if let Some(icon) = &self.icon {
      meta = meta.icon(icon.clone());
    }
    if let Some(options) = &self.options {
      meta = meta.options(options.clone());
    }
    if !self.labels.is_empty() {
      let labels = self.labels.clone();
      meta = meta.transform(move |raw: &str| {
        let label = labels.get(raw).cloned().unwrap_or_else(|| raw.to_string());
        ColumnOption::new(raw, label)
      });
    }
    meta
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tabfilter.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tabfilter/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create ./tabfilter.yaml or \
                 ~/.config/tabfilter/config.yaml\n\
                 See demos/tabfilter.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("tabfilter.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tabfilter").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let mut config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(config)
  }

  /// Data file to load: `explicit` wins, otherwise `data` resolved against
  /// the config file's directory
  pub fn data_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
      return Ok(p.to_path_buf());
    }
    match &self.data {
      Some(p) if p.is_absolute() => Ok(p.clone()),
      Some(p) => Ok(self.base_dir.join(p)),
      None => Err(eyre!(
        "No data file given. Set `data` in the config or pass --data."
      )),
    }
  }

  /// Column definitions from the config
  pub fn table_columns(&self) -> Vec<Column> {
    self.columns.iter().map(ColumnConfig::to_column).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::derive_options;

  fn write_temp(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("tabfilter-config-tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn test_load_full_config() {
    let path = write_temp(
      "full.yaml",
      r#"
title: People
data: people.json
columns:
  - key: name
    header: Full Name
    filter:
      label: Name
      icon: "@"
  - key: team
    filter:
      label: Team
      type: option
      options:
        - { value: core, label: Core }
  - key: email
    filterable: false
ui:
  search_reset_ms: 300
logging:
  filter: debug
  dir: /tmp/tabfilter-logs
"#,
    );
    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.title.as_deref(), Some("People"));
    assert_eq!(
      config.data_path(None).unwrap(),
      path.parent().unwrap().join("people.json")
    );
    assert_eq!(config.ui.search_reset_ms, 300);
    assert_eq!(config.ui.selection_reset_ms, 100);
    assert_eq!(config.logging.filter, "debug");
    assert_eq!(config.logging.log_dir(), PathBuf::from("/tmp/tabfilter-logs"));

    let columns = config.table_columns();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].header, "Full Name");
    let name = columns[0].filter.as_ref().unwrap();
    assert_eq!(name.filter_type, "option");
    assert_eq!(name.icon.as_deref(), Some("@"));
    assert!(name.options.is_none());
    assert_eq!(
      columns[1].filter.as_ref().unwrap().options,
      Some(vec![ColumnOption::new("core", "Core")])
    );
    assert_eq!(columns[2].header, "email");
    assert!(!columns[2].can_filter);
  }

  #[test]
  fn test_defaults() {
    let path = write_temp("minimal.yaml", "data: /srv/rows.json\n");
    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.ui, UiConfig::default());
    assert_eq!(config.ui.delays(), SelectorDelays::default());
    assert_eq!(config.logging.filter, "info");
    assert!(config.columns.is_empty());
    assert_eq!(config.data_path(None).unwrap(), PathBuf::from("/srv/rows.json"));
  }

  #[test]
  fn test_explicit_data_path_wins() {
    let path = write_temp("override.yaml", "data: rows.json\n");
    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(
      config.data_path(Some(Path::new("other.json"))).unwrap(),
      PathBuf::from("other.json")
    );
  }

  #[test]
  fn test_missing_data_is_an_error() {
    let path = write_temp("nodata.yaml", "title: Empty\n");
    let config = Config::load(Some(&path)).unwrap();
    assert!(config.data_path(None).is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/tabfilter.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_parse_error_names_file() {
    let path = write_temp("broken.yaml", "columns: [unclosed\n");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));
  }

  #[test]
  fn test_labels_become_option_transform() {
    let path = write_temp(
      "labels.yaml",
      r#"
columns:
  - key: active
    filter:
      label: Active
      labels:
        "true": "Yes"
"#,
    );
    let config = Config::load(Some(&path)).unwrap();
    let columns = config.table_columns();
    let meta = columns[0].filter.as_ref().unwrap();

    let values = vec!["true".to_string(), "false".to_string()];
    let options = derive_options(values.iter(), meta.transform.as_ref());
    assert_eq!(
      options,
      vec![
        ColumnOption::new("false", "false"),
        ColumnOption::new("true", "Yes"),
      ]
    );
  }
}
