use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tabfilter::app::{self, App};
use tabfilter::config::Config;
use tabfilter::filter::default_registry;
use tabfilter::logging;
use tabfilter::table::{Column, FilterMeta, MemoryTable};

#[derive(Parser, Debug)]
#[command(name = "tabfilter")]
#[command(about = "Browse a JSON table and filter it from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./tabfilter.yaml, then $XDG_CONFIG_HOME/tabfilter/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// JSON data file, overrides `data` in the config
  #[arg(short, long)]
  data: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let (_guard, log_dir) = logging::init(&config.logging)?;

  let data_path = config.data_path(args.data.as_deref())?;
  let table = load_table(&data_path, config.table_columns())?;
  app::log_startup(&table, &log_dir);

  let title = config.title.clone().unwrap_or_else(|| {
    data_path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "tabfilter".to_string())
  });

  // Initialize and run the app
  let mut app = App::new(title, table, default_registry(), &config.ui);
  app.run().await?;

  Ok(())
}

/// Read a JSON array of objects into a table. Without configured columns,
/// every key of the first row becomes a filterable column.
fn load_table(path: &Path, columns: Vec<Column>) -> Result<MemoryTable> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read data file {}: {}", path.display(), e))?;
  let values: Vec<Value> = serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse data file {}: {}", path.display(), e))?;

  let columns = if columns.is_empty() {
    infer_columns(&values)
  } else {
    columns
  };
  Ok(MemoryTable::from_json(columns, &values))
}

fn infer_columns(values: &[Value]) -> Vec<Column> {
  values
    .iter()
    .find_map(Value::as_object)
    .map(|object| {
      object
        .keys()
        .map(|key| Column::new(key.clone()).filter(FilterMeta::new(key.clone(), "option")))
        .collect()
    })
    .unwrap_or_default()
}
