use super::registry::{EditorEvent, FilterStrategy};
use crate::ui::components::{KeyResult, SearchEntry, SearchList, SearchListEvent};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// One choice of an option filter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnOption {
  /// Internal value written to the table
  pub value: String,
  /// Text shown to the user
  pub label: String,
  #[serde(default)]
  pub icon: Option<String>,
}

impl ColumnOption {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
      icon: None,
    }
  }

  pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
    self.icon = Some(icon.into());
    self
  }
}

/// Callback receiving the new filter value
pub type ValueChange = Rc<dyn Fn(Option<String>)>;

/// Payload of an `option` filter item
#[derive(Clone)]
pub struct OptionFilterConfig {
  pub options: Vec<ColumnOption>,
  pub value: Option<String>,
  pub on_value_change: ValueChange,
}

impl OptionFilterConfig {
  /// The option matching the current value
  pub fn selected(&self) -> Option<&ColumnOption> {
    let value = self.value.as_deref()?;
    self.options.iter().find(|o| o.value == value)
  }
}

impl fmt::Debug for OptionFilterConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OptionFilterConfig")
      .field("options", &self.options.len())
      .field("value", &self.value)
      .finish_non_exhaustive()
  }
}

/// Single-select filter over a fixed list of options
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFilter;

impl OptionFilter {
  fn entries(config: &OptionFilterConfig) -> Vec<SearchEntry> {
    config
      .options
      .iter()
      .map(|o| {
        SearchEntry::new(o.label.clone())
          .icon(o.icon.clone())
          .checked(config.value.as_deref() == Some(o.value.as_str()))
      })
      .collect()
  }

  fn apply(config: &OptionFilterConfig, result: KeyResult<SearchListEvent>) -> KeyResult<EditorEvent> {
    match result {
      KeyResult::Event(SearchListEvent::Selected(idx)) => {
        let Some(option) = config.options.get(idx) else {
          return KeyResult::Handled;
        };
        // Re-selecting the current value still writes it; clearing is the
        // remove control's job
        debug!(value = %option.value, "option filter value selected");
        (config.on_value_change)(Some(option.value.clone()));
        KeyResult::Event(EditorEvent::ValueChanged)
      }
      KeyResult::Event(SearchListEvent::Cancelled) => KeyResult::Event(EditorEvent::Dismissed),
      KeyResult::Handled => KeyResult::Handled,
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }
}

impl FilterStrategy for OptionFilter {
  const TAG: &'static str = "option";
  type Config = OptionFilterConfig;
  type EditState = SearchList;

  fn display(&self, config: &OptionFilterConfig) -> Option<Line<'static>> {
    config.selected().map(|o| Line::from(o.label.clone()))
  }

  fn init_edit_state(&self, _config: &OptionFilterConfig) -> SearchList {
    SearchList::new()
  }

  fn handle_edit_key(
    &self,
    config: &OptionFilterConfig,
    list: &mut SearchList,
    key: KeyEvent,
  ) -> KeyResult<EditorEvent> {
    let entries = Self::entries(config);
    Self::apply(config, list.handle_key(key, &entries))
  }

  fn handle_edit_click(
    &self,
    config: &OptionFilterConfig,
    list: &mut SearchList,
    column: u16,
    row: u16,
  ) -> KeyResult<EditorEvent> {
    let entries = Self::entries(config);
    Self::apply(config, list.handle_click(column, row, &entries))
  }

  fn render_edit(
    &self,
    config: &OptionFilterConfig,
    list: &mut SearchList,
    frame: &mut Frame,
    area: Rect,
  ) {
    list.render(frame, area, &Self::entries(config));
  }

  fn edit_size(&self, config: &OptionFilterConfig, list: &SearchList) -> (u16, u16) {
    list.preferred_size(&Self::entries(config))
  }
}
