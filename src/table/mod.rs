//! The tabular engine the filter widget sits on, and the adapter that turns
//! its column state into filter items.

mod adapter;
mod memory;

pub use adapter::{derive_options, filter_items, MAX_DERIVED_OPTIONS};
pub use memory::{MemoryTable, Row};

use crate::filter::ColumnOption;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Maps a raw column value to the option shown for it
pub type OptionTransform = Rc<dyn Fn(&str) -> ColumnOption>;

/// Filter metadata attached to a column
#[derive(Clone)]
pub struct FilterMeta {
  pub label: String,
  pub icon: Option<String>,
  /// Filter type tag, looked up in the registry
  pub filter_type: String,
  /// Options known ahead of time; derived from the data when absent
  pub options: Option<Vec<ColumnOption>>,
  pub transform: Option<OptionTransform>,
}

impl FilterMeta {
  pub fn new(label: impl Into<String>, filter_type: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      icon: None,
      filter_type: filter_type.into(),
      options: None,
      transform: None,
    }
  }

  pub fn icon(mut self, icon: impl Into<String>) -> Self {
    self.icon = Some(icon.into());
    self
  }

  pub fn options(mut self, options: Vec<ColumnOption>) -> Self {
    self.options = Some(options);
    self
  }

  pub fn transform(mut self, f: impl Fn(&str) -> ColumnOption + 'static) -> Self {
    self.transform = Some(Rc::new(f));
    self
  }
}

impl fmt::Debug for FilterMeta {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilterMeta")
      .field("label", &self.label)
      .field("icon", &self.icon)
      .field("filter_type", &self.filter_type)
      .field("options", &self.options)
      .field("transform", &self.transform.is_some())
      .finish()
  }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
  /// Key of the column's value in each row
  pub id: String,
  pub header: String,
  pub can_filter: bool,
  pub filter: Option<FilterMeta>,
}

impl Column {
  pub fn new(id: impl Into<String>) -> Self {
    let id = id.into();
    Self {
      header: id.clone(),
      id,
      can_filter: true,
      filter: None,
    }
  }

  pub fn header(mut self, header: impl Into<String>) -> Self {
    self.header = header.into();
    self
  }

  pub fn can_filter(mut self, can_filter: bool) -> Self {
    self.can_filter = can_filter;
    self
  }

  pub fn filter(mut self, meta: FilterMeta) -> Self {
    self.filter = Some(meta);
    self
  }
}

/// Tabular engine holding rows, column definitions and per-column filter
/// values. It is the single source of truth for filter values; the widget
/// only ever writes through `set_filter_value`.
pub trait TableEngine {
  fn columns(&self) -> &[Column];

  /// Current filter value of a column, `None` when unset
  fn filter_value(&self, column_id: &str) -> Option<String>;

  /// Set or clear (`None`) a column's filter value
  fn set_filter_value(&mut self, column_id: &str, value: Option<String>);

  /// Distinct values of a column with their counts
  fn faceted_unique_values(&self, column_id: &str) -> Rc<BTreeMap<String, usize>>;
}
