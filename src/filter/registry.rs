//! Filter strategies and the registry that maps type tags to them.
//!
//! A strategy is a pair of renderers over one payload type: a compact
//! `display` line for chips and an interactive editor hosted in a popover.
//! Strategies are written against their concrete `Config` type; the registry
//! erases that type so strategies of different kinds can live in one map,
//! and downcasts again at render time. Any mismatch between an item's tag,
//! its payload and the editor state degrades to "nothing rendered".

use super::item::FilterItem;
use crate::ui::components::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Events emitted by a filter editor that the hosting popover handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
  /// The filter value was written through the item's callback
  ValueChanged,
  /// The editor asked to be closed
  Dismissed,
}

/// A kind of filter, identified by its tag.
pub trait FilterStrategy: 'static {
  /// Tag items carry to select this strategy
  const TAG: &'static str;

  /// Payload each item of this kind carries
  type Config: 'static;

  /// Transient editor state, alive while the editor is open
  type EditState: 'static;

  /// Compact rendering of the current value; `None` shows nothing
  fn display(&self, config: &Self::Config) -> Option<Line<'static>>;

  fn init_edit_state(&self, config: &Self::Config) -> Self::EditState;

  fn handle_edit_key(
    &self,
    config: &Self::Config,
    state: &mut Self::EditState,
    key: KeyEvent,
  ) -> KeyResult<EditorEvent>;

  /// Left click at a screen position inside the editor popover. Positions
  /// refer to the last `render_edit`.
  fn handle_edit_click(
    &self,
    _config: &Self::Config,
    _state: &mut Self::EditState,
    _column: u16,
    _row: u16,
  ) -> KeyResult<EditorEvent> {
    KeyResult::NotHandled
  }

  fn render_edit(
    &self,
    config: &Self::Config,
    state: &mut Self::EditState,
    frame: &mut Frame,
    area: Rect,
  );

  /// Preferred inner size of the editor popover
  fn edit_size(&self, _config: &Self::Config, _state: &Self::EditState) -> (u16, u16) {
    (24, 8)
  }
}

/// Object-safe view of a strategy with its payload type erased
trait ErasedStrategy {
  fn display(&self, config: &dyn Any) -> Option<Line<'static>>;
  fn init_edit_state(&self, config: &dyn Any) -> Option<Box<dyn Any>>;
  fn handle_edit_key(
    &self,
    config: &dyn Any,
    state: &mut dyn Any,
    key: KeyEvent,
  ) -> KeyResult<EditorEvent>;
  fn handle_edit_click(
    &self,
    config: &dyn Any,
    state: &mut dyn Any,
    column: u16,
    row: u16,
  ) -> KeyResult<EditorEvent>;
  fn render_edit(&self, config: &dyn Any, state: &mut dyn Any, frame: &mut Frame, area: Rect)
    -> bool;
  fn edit_size(&self, config: &dyn Any, state: &dyn Any) -> Option<(u16, u16)>;
}

impl<S: FilterStrategy> ErasedStrategy for S {
  fn display(&self, config: &dyn Any) -> Option<Line<'static>> {
    FilterStrategy::display(self, config.downcast_ref::<S::Config>()?)
  }

  fn init_edit_state(&self, config: &dyn Any) -> Option<Box<dyn Any>> {
    let config = config.downcast_ref::<S::Config>()?;
    Some(Box::new(FilterStrategy::init_edit_state(self, config)))
  }

  fn handle_edit_key(
    &self,
    config: &dyn Any,
    state: &mut dyn Any,
    key: KeyEvent,
  ) -> KeyResult<EditorEvent> {
    match (
      config.downcast_ref::<S::Config>(),
      state.downcast_mut::<S::EditState>(),
    ) {
      (Some(config), Some(state)) => FilterStrategy::handle_edit_key(self, config, state, key),
      _ => KeyResult::NotHandled,
    }
  }

  fn handle_edit_click(
    &self,
    config: &dyn Any,
    state: &mut dyn Any,
    column: u16,
    row: u16,
  ) -> KeyResult<EditorEvent> {
    match (
      config.downcast_ref::<S::Config>(),
      state.downcast_mut::<S::EditState>(),
    ) {
      (Some(config), Some(state)) => {
        FilterStrategy::handle_edit_click(self, config, state, column, row)
      }
      _ => KeyResult::NotHandled,
    }
  }

  fn render_edit(
    &self,
    config: &dyn Any,
    state: &mut dyn Any,
    frame: &mut Frame,
    area: Rect,
  ) -> bool {
    match (
      config.downcast_ref::<S::Config>(),
      state.downcast_mut::<S::EditState>(),
    ) {
      (Some(config), Some(state)) => {
        FilterStrategy::render_edit(self, config, state, frame, area);
        true
      }
      _ => false,
    }
  }

  fn edit_size(&self, config: &dyn Any, state: &dyn Any) -> Option<(u16, u16)> {
    Some(FilterStrategy::edit_size(
      self,
      config.downcast_ref::<S::Config>()?,
      state.downcast_ref::<S::EditState>()?,
    ))
  }
}

/// Open editor for one item, created by [`FilterRegistry::open_editor`]
pub struct EditorState {
  tag: String,
  state: Box<dyn Any>,
}

impl EditorState {
  /// Tag of the strategy that created this state
  pub fn tag(&self) -> &str {
    &self.tag
  }
}

impl fmt::Debug for EditorState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EditorState")
      .field("tag", &self.tag)
      .finish_non_exhaustive()
  }
}

/// Immutable map from filter type tag to strategy.
///
/// Built once with [`FilterRegistry::builder`]; there is no way to add or
/// remove strategies afterwards.
#[derive(Default)]
pub struct FilterRegistry {
  strategies: HashMap<&'static str, Box<dyn ErasedStrategy>>,
}

impl FilterRegistry {
  pub fn builder() -> FilterRegistryBuilder {
    FilterRegistryBuilder::default()
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.strategies.contains_key(tag)
  }

  /// Registered tags, sorted
  pub fn tags(&self) -> Vec<&'static str> {
    let mut tags: Vec<_> = self.strategies.keys().copied().collect();
    tags.sort_unstable();
    tags
  }

  fn strategy(&self, item: &FilterItem) -> Option<&dyn ErasedStrategy> {
    self.strategies.get(item.filter_type()).map(|s| s.as_ref())
  }

  /// Compact value rendering for `item`, if its strategy resolves
  pub fn display(&self, item: &FilterItem) -> Option<Line<'static>> {
    self.strategy(item)?.display(item.raw_config())
  }

  /// Start editing `item`; `None` when its tag or payload does not resolve
  pub fn open_editor(&self, item: &FilterItem) -> Option<EditorState> {
    let state = self.strategy(item)?.init_edit_state(item.raw_config())?;
    Some(EditorState {
      tag: item.filter_type().to_string(),
      state,
    })
  }

  pub fn handle_editor_key(
    &self,
    item: &FilterItem,
    editor: &mut EditorState,
    key: KeyEvent,
  ) -> KeyResult<EditorEvent> {
    if editor.tag != item.filter_type() {
      return KeyResult::NotHandled;
    }
    match self.strategy(item) {
      Some(strategy) => strategy.handle_edit_key(item.raw_config(), &mut *editor.state, key),
      None => KeyResult::NotHandled,
    }
  }

  pub fn handle_editor_click(
    &self,
    item: &FilterItem,
    editor: &mut EditorState,
    column: u16,
    row: u16,
  ) -> KeyResult<EditorEvent> {
    if editor.tag != item.filter_type() {
      return KeyResult::NotHandled;
    }
    match self.strategy(item) {
      Some(strategy) => {
        strategy.handle_edit_click(item.raw_config(), &mut *editor.state, column, row)
      }
      None => KeyResult::NotHandled,
    }
  }

  /// Render the editor into `area`, returning whether anything was drawn
  pub fn render_editor(
    &self,
    item: &FilterItem,
    editor: &mut EditorState,
    frame: &mut Frame,
    area: Rect,
  ) -> bool {
    if editor.tag != item.filter_type() {
      return false;
    }
    match self.strategy(item) {
      Some(strategy) => strategy.render_edit(item.raw_config(), &mut *editor.state, frame, area),
      None => false,
    }
  }

  pub fn editor_size(&self, item: &FilterItem, editor: &EditorState) -> Option<(u16, u16)> {
    if editor.tag != item.filter_type() {
      return None;
    }
    self
      .strategy(item)?
      .edit_size(item.raw_config(), &*editor.state)
  }
}

impl fmt::Debug for FilterRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilterRegistry")
      .field("tags", &self.tags())
      .finish()
  }
}

#[derive(Default)]
pub struct FilterRegistryBuilder {
  strategies: HashMap<&'static str, Box<dyn ErasedStrategy>>,
}

impl FilterRegistryBuilder {
  /// Register `strategy` under its tag, replacing an earlier registration
  pub fn register<S: FilterStrategy>(mut self, strategy: S) -> Self {
    if self.strategies.insert(S::TAG, Box::new(strategy)).is_some() {
      warn!(tag = S::TAG, "filter strategy registered twice, keeping the last one");
    }
    self
  }

  pub fn build(self) -> FilterRegistry {
    FilterRegistry {
      strategies: self.strategies,
    }
  }
}
