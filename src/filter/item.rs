use super::registry::FilterStrategy;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// What the remove control of a chip does
#[derive(Clone)]
pub enum Removal {
  /// Invoked once per remove activation
  Action(Rc<dyn Fn()>),
  /// No remove control is rendered
  Disabled,
}

impl Removal {
  pub fn action(f: impl Fn() + 'static) -> Self {
    Removal::Action(Rc::new(f))
  }

  pub fn is_disabled(&self) -> bool {
    matches!(self, Removal::Disabled)
  }

  /// Run the action, returning whether there was one
  pub fn invoke(&self) -> bool {
    match self {
      Removal::Action(f) => {
        f();
        true
      }
      Removal::Disabled => false,
    }
  }
}

impl fmt::Debug for Removal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Removal::Action(_) => f.write_str("Removal::Action(..)"),
      Removal::Disabled => f.write_str("Removal::Disabled"),
    }
  }
}

/// The UI-facing state of one filterable attribute.
///
/// Items are rebuilt from the table on every pass and are never mutated once
/// handed to the widget. `label` doubles as the identity key, so callers are
/// expected to keep labels unique within one item list.
#[derive(Clone)]
pub struct FilterItem {
  pub label: String,
  pub icon: Option<String>,
  pub is_enabled: bool,
  pub is_set: bool,
  pub remove: Removal,
  filter_type: String,
  config: Rc<dyn Any>,
}

impl FilterItem {
  /// Create an item whose tag and payload are tied to strategy `S`
  pub fn new<S: FilterStrategy>(label: impl Into<String>, config: S::Config) -> Self {
    Self::with_tag(label, S::TAG, config)
  }

  /// Create an item from a runtime tag.
  ///
  /// Nothing checks that `config` is the payload the tag's strategy expects;
  /// a mismatch simply renders nothing.
  pub fn with_tag(label: impl Into<String>, tag: impl Into<String>, config: impl Any) -> Self {
    Self {
      label: label.into(),
      icon: None,
      is_enabled: true,
      is_set: false,
      remove: Removal::Disabled,
      filter_type: tag.into(),
      config: Rc::new(config),
    }
  }

  pub fn icon(mut self, icon: Option<String>) -> Self {
    self.icon = icon;
    self
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.is_enabled = enabled;
    self
  }

  pub fn set(mut self, is_set: bool) -> Self {
    self.is_set = is_set;
    self
  }

  pub fn removal(mut self, remove: Removal) -> Self {
    self.remove = remove;
    self
  }

  /// The filter type tag
  pub fn filter_type(&self) -> &str {
    &self.filter_type
  }

  /// The payload, if it is a `T`
  pub fn config<T: 'static>(&self) -> Option<&T> {
    self.config.downcast_ref::<T>()
  }

  pub(crate) fn raw_config(&self) -> &dyn Any {
    &*self.config
  }
}

impl fmt::Debug for FilterItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilterItem")
      .field("label", &self.label)
      .field("icon", &self.icon)
      .field("is_enabled", &self.is_enabled)
      .field("is_set", &self.is_set)
      .field("remove", &self.remove)
      .field("filter_type", &self.filter_type)
      .finish_non_exhaustive()
  }
}

/// Find the item with `label`; the first one wins on duplicates
pub fn find_by_label<'a>(items: &'a [FilterItem], label: &str) -> Option<&'a FilterItem> {
  items.iter().find(|item| item.label == label)
}
