use super::{Column, TableEngine};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::{debug, warn};

/// One row: column id -> cell text. Missing keys are empty cells.
pub type Row = BTreeMap<String, String>;

/// In-memory table engine.
///
/// A row passes a column filter when its cell equals the filter value.
/// Faceted values for a column are computed over the rows that pass every
/// *other* column's filter, and cached until the next filter write.
#[derive(Debug, Default)]
pub struct MemoryTable {
  columns: Vec<Column>,
  rows: Vec<Row>,
  filters: BTreeMap<String, String>,
  facets: RefCell<HashMap<String, Rc<BTreeMap<String, usize>>>>,
}

impl MemoryTable {
  pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
    Self {
      columns,
      rows,
      ..Self::default()
    }
  }

  /// Build rows from JSON objects.
  ///
  /// Strings are taken as-is, numbers and booleans are stringified, nulls
  /// leave the cell empty. Entries that are not objects are skipped.
  pub fn from_json(columns: Vec<Column>, values: &[Value]) -> Self {
    let mut rows = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
      let Some(object) = value.as_object() else {
        warn!(index = idx, "skipping data row that is not an object");
        continue;
      };
      let row: Row = object
        .iter()
        .filter_map(|(k, v)| cell_text(v).map(|text| (k.clone(), text)))
        .collect();
      rows.push(row);
    }
    Self::new(columns, rows)
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  /// Rows passing every active filter, in table order
  pub fn filtered_rows(&self) -> Vec<&Row> {
    self
      .rows
      .iter()
      .filter(|row| self.passes(row, None))
      .collect()
  }

  /// Clear every column filter
  pub fn clear_filters(&mut self) {
    if !self.filters.is_empty() {
      debug!(count = self.filters.len(), "clearing all filters");
      self.filters.clear();
      self.facets.borrow_mut().clear();
    }
  }

  pub fn active_filter_count(&self) -> usize {
    self.filters.len()
  }

  fn passes(&self, row: &Row, except: Option<&str>) -> bool {
    self
      .filters
      .iter()
      .filter(|(column, _)| Some(column.as_str()) != except)
      .all(|(column, value)| row.get(column) == Some(value))
  }

  fn has_column(&self, column_id: &str) -> bool {
    self.columns.iter().any(|c| c.id == column_id)
  }
}

fn cell_text(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

impl TableEngine for MemoryTable {
  fn columns(&self) -> &[Column] {
    &self.columns
  }

  fn filter_value(&self, column_id: &str) -> Option<String> {
    self.filters.get(column_id).cloned()
  }

  fn set_filter_value(&mut self, column_id: &str, value: Option<String>) {
    if !self.has_column(column_id) {
      warn!(column = column_id, "ignoring filter write for unknown column");
      return;
    }
    match value {
      Some(value) => {
        debug!(column = column_id, value = %value, "filter value set");
        self.filters.insert(column_id.to_string(), value);
      }
      None => {
        debug!(column = column_id, "filter value cleared");
        self.filters.remove(column_id);
      }
    }
    self.facets.borrow_mut().clear();
  }

  fn faceted_unique_values(&self, column_id: &str) -> Rc<BTreeMap<String, usize>> {
    if let Some(cached) = self.facets.borrow().get(column_id) {
      return cached.clone();
    }

    let mut counts = BTreeMap::new();
    for row in self.rows.iter().filter(|row| self.passes(row, Some(column_id))) {
      if let Some(value) = row.get(column_id) {
        *counts.entry(value.clone()).or_insert(0) += 1;
      }
    }

    let counts = Rc::new(counts);
    self
      .facets
      .borrow_mut()
      .insert(column_id.to_string(), counts.clone());
    counts
  }
}
