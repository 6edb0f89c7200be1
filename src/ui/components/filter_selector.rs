use super::popover;
use super::{KeyResult, SearchEntry, SearchList, SearchListEvent};
use crate::filter::{find_by_label, EditorEvent, EditorState, FilterItem, FilterRegistry};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::time::{Duration, Instant};
use tracing::debug;

pub const FILTER_ICON: &str = "≡";

/// Delays applied after the selector closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorDelays {
  /// Until the search text is cleared
  pub search_reset: Duration,
  /// Until the chosen item is forgotten
  pub selection_reset: Duration,
}

impl Default for SelectorDelays {
  fn default() -> Self {
    Self {
      search_reset: Duration::from_millis(150),
      selection_reset: Duration::from_millis(100),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
  Closed,
  /// Searchable list of filter items
  Browsing,
  /// The chosen item's editor is shown
  Editing,
}

/// Events emitted by the selector that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorEvent {
  Opened,
  Closed,
  /// An item was chosen and its editor is now shown
  Editing(String),
  /// The editor wrote a new value for the item with this label
  ValueChanged(String),
}

/// Filter trigger with a popover that lists the filter items and, once one
/// is chosen, hosts that item's editor.
///
/// The chosen item is remembered by label and resolved against the items
/// passed in on every call, so the selector never holds a stale item.
#[derive(Debug, Default)]
pub struct FilterSelector {
  open: bool,
  browse: SearchList,
  selected_label: Option<String>,
  editor: Option<EditorState>,
  delays: SelectorDelays,
  search_reset_at: Option<Instant>,
  selection_reset_at: Option<Instant>,
  trigger_area: Rect,
  popover_area: Option<Rect>,
}

impl FilterSelector {
  pub fn new(delays: SelectorDelays) -> Self {
    Self {
      delays,
      ..Self::default()
    }
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  /// Current search text of the browse list
  pub fn query(&self) -> &str {
    self.browse.query()
  }

  pub fn mode(&self, items: &[FilterItem]) -> SelectorMode {
    if !self.open {
      SelectorMode::Closed
    } else if self.editing(items).is_some() {
      SelectorMode::Editing
    } else {
      SelectorMode::Browsing
    }
  }

  /// The item whose editor is shown, if any
  pub fn editing<'a>(&self, items: &'a [FilterItem]) -> Option<&'a FilterItem> {
    if !self.open {
      return None;
    }
    find_by_label(items, self.selected_label.as_deref()?)
  }

  /// Open the popover on the browse list
  pub fn open(&mut self) {
    if self.open {
      return;
    }
    // Resets still pending from the last close apply right away
    self.flush_resets();
    self.open = true;
    debug!("filter selector opened");
  }

  /// Close the popover; search text and chosen item are cleared later
  pub fn dismiss(&mut self, now: Instant) {
    if !self.open {
      return;
    }
    self.open = false;
    self.popover_area = None;
    self.search_reset_at = Some(now + self.delays.search_reset);
    self.selection_reset_at = Some(now + self.delays.selection_reset);
    debug!("filter selector closed");
  }

  /// Apply deferred resets that are due
  pub fn tick(&mut self, now: Instant) {
    if self.search_reset_at.is_some_and(|at| now >= at) {
      self.search_reset_at = None;
      self.browse.reset();
    }
    if self.selection_reset_at.is_some_and(|at| now >= at) {
      self.selection_reset_at = None;
      self.clear_selection();
    }
  }

  fn flush_resets(&mut self) {
    if self.search_reset_at.take().is_some() {
      self.browse.reset();
    }
    if self.selection_reset_at.take().is_some() {
      self.clear_selection();
    }
  }

  fn clear_selection(&mut self) {
    self.selected_label = None;
    self.editor = None;
  }

  fn choose(&mut self, item: &FilterItem, registry: &FilterRegistry) -> bool {
    if !item.is_enabled {
      return false;
    }
    debug!(label = %item.label, filter_type = item.filter_type(), "editing filter");
    self.selected_label = Some(item.label.clone());
    self.editor = registry.open_editor(item);
    self.browse.reset();
    true
  }

  fn entries(items: &[FilterItem]) -> Vec<SearchEntry> {
    items
      .iter()
      .map(|item| {
        SearchEntry::new(item.label.clone())
          .icon(item.icon.clone())
          .disabled(!item.is_enabled)
          .hint("→")
      })
      .collect()
  }

  /// Handle a key event
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) -> KeyResult<SelectorEvent> {
    match self.mode(items) {
      SelectorMode::Closed => match key.code {
        KeyCode::Enter | KeyCode::Char('f') => {
          self.open();
          KeyResult::Event(SelectorEvent::Opened)
        }
        _ => KeyResult::NotHandled,
      },
      SelectorMode::Browsing => {
        let entries = Self::entries(items);
        match self.browse.handle_key(key, &entries) {
          KeyResult::Event(SearchListEvent::Selected(idx)) => {
            let item = &items[idx];
            if self.choose(item, registry) {
              KeyResult::Event(SelectorEvent::Editing(item.label.clone()))
            } else {
              KeyResult::Handled
            }
          }
          KeyResult::Event(SearchListEvent::Cancelled) => {
            self.dismiss(now);
            KeyResult::Event(SelectorEvent::Closed)
          }
          KeyResult::Handled => KeyResult::Handled,
          KeyResult::NotHandled => KeyResult::NotHandled,
        }
      }
      SelectorMode::Editing => {
        let Some(item) = self.editing(items) else {
          return KeyResult::NotHandled;
        };
        let result = match self.editor.as_mut() {
          Some(editor) => registry.handle_editor_key(item, editor, key),
          None => KeyResult::NotHandled,
        };
        match result {
          KeyResult::Event(EditorEvent::ValueChanged) => {
            KeyResult::Event(SelectorEvent::ValueChanged(item.label.clone()))
          }
          KeyResult::Event(EditorEvent::Dismissed) => {
            self.dismiss(now);
            KeyResult::Event(SelectorEvent::Closed)
          }
          KeyResult::NotHandled if key.code == KeyCode::Esc => {
            self.dismiss(now);
            KeyResult::Event(SelectorEvent::Closed)
          }
          KeyResult::Handled => KeyResult::Handled,
          KeyResult::NotHandled => KeyResult::NotHandled,
        }
      }
    }
  }

  /// Whether a screen position lies on the trigger or the open popover
  pub fn contains(&self, column: u16, row: u16) -> bool {
    let pos = Position::new(column, row);
    self.trigger_area.contains(pos) || self.popover_area.is_some_and(|a| a.contains(pos))
  }

  /// Handle a mouse event. A click outside an open popover closes it, a
  /// click inside goes to the browse list or the editor.
  pub fn handle_mouse(
    &mut self,
    mouse: MouseEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) -> KeyResult<SelectorEvent> {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
      return KeyResult::NotHandled;
    }
    let pos = Position::new(mouse.column, mouse.row);
    if self.trigger_area.contains(pos) {
      if self.open {
        self.dismiss(now);
        return KeyResult::Event(SelectorEvent::Closed);
      }
      self.open();
      return KeyResult::Event(SelectorEvent::Opened);
    }
    if self.popover_area.is_some_and(|a| a.contains(pos)) {
      return self.click_popover(mouse.column, mouse.row, items, registry, now);
    }
    if self.open {
      self.dismiss(now);
      return KeyResult::Event(SelectorEvent::Closed);
    }
    KeyResult::NotHandled
  }

  fn click_popover(
    &mut self,
    column: u16,
    row: u16,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) -> KeyResult<SelectorEvent> {
    if let Some(item) = self.editing(items) {
      let result = match self.editor.as_mut() {
        Some(editor) => registry.handle_editor_click(item, editor, column, row),
        None => KeyResult::NotHandled,
      };
      return match result {
        KeyResult::Event(EditorEvent::ValueChanged) => {
          KeyResult::Event(SelectorEvent::ValueChanged(item.label.clone()))
        }
        KeyResult::Event(EditorEvent::Dismissed) => {
          self.dismiss(now);
          KeyResult::Event(SelectorEvent::Closed)
        }
        KeyResult::Handled | KeyResult::NotHandled => KeyResult::Handled,
      };
    }

    let entries = Self::entries(items);
    match self.browse.handle_click(column, row, &entries) {
      KeyResult::Event(SearchListEvent::Selected(idx)) => {
        let item = &items[idx];
        if self.choose(item, registry) {
          KeyResult::Event(SelectorEvent::Editing(item.label.clone()))
        } else {
          KeyResult::Handled
        }
      }
      _ => KeyResult::Handled,
    }
  }

  /// Trigger content: the icon, plus "Filter" while no filter is set
  pub fn trigger_line(items: &[FilterItem]) -> Line<'static> {
    if items.iter().any(|item| item.is_set) {
      Line::from(format!("[{}]", FILTER_ICON))
    } else {
      Line::from(format!("[{} Filter]", FILTER_ICON))
    }
  }

  pub fn render_trigger(
    &mut self,
    frame: &mut Frame,
    area: Rect,
    items: &[FilterItem],
    focused: bool,
  ) {
    let line = Self::trigger_line(items);
    let width = (line.width() as u16).min(area.width);
    self.trigger_area = Rect::new(area.x, area.y, width, area.height.min(1));

    let style = if self.open || focused {
      Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
      Style::default().fg(Color::Cyan)
    };
    frame.render_widget(Paragraph::new(line).style(style), self.trigger_area);
  }

  /// Render the popover if open, anchored under the trigger
  pub fn render_popover(
    &mut self,
    frame: &mut Frame,
    bounds: Rect,
    items: &[FilterItem],
    registry: &FilterRegistry,
  ) {
    if !self.open {
      self.popover_area = None;
      return;
    }

    match self.editing(items) {
      None => {
        let entries = Self::entries(items);
        let size = self.browse.preferred_size(&entries);
        let area = popover::anchored_area(self.trigger_area, size, bounds);
        let inner = popover::render_frame(frame, area, Some("Filter"));
        self.browse.render(frame, inner, &entries);
        self.popover_area = Some(area);
      }
      Some(item) => {
        let size = self
          .editor
          .as_ref()
          .and_then(|editor| registry.editor_size(item, editor))
          .unwrap_or((item.label.chars().count() as u16 + 4, 1));
        let area = popover::anchored_area(self.trigger_area, size, bounds);
        let inner = popover::render_frame(frame, area, Some(item.label.as_str()));
        if let Some(editor) = self.editor.as_mut() {
          registry.render_editor(item, editor, frame, inner);
        }
        self.popover_area = Some(area);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::{default_registry, ColumnOption, OptionFilter, OptionFilterConfig};
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use std::cell::RefCell;
  use std::rc::Rc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn option_item(label: &str, log: &Rc<RefCell<Vec<String>>>) -> FilterItem {
    let log = log.clone();
    let tag = label.to_string();
    FilterItem::new::<OptionFilter>(
      label,
      OptionFilterConfig {
        options: vec![
          ColumnOption::new("a", "Apple"),
          ColumnOption::new("b", "Banana"),
        ],
        value: None,
        on_value_change: Rc::new(move |v: Option<String>| {
          log
            .borrow_mut()
            .push(format!("{}={}", tag, v.unwrap_or_default()))
        }),
      },
    )
  }

  fn items(log: &Rc<RefCell<Vec<String>>>) -> Vec<FilterItem> {
    vec![
      option_item("Fruit", log),
      option_item("Colour", log).enabled(false),
      option_item("Shape", log),
    ]
  }

  fn type_str(
    selector: &mut FilterSelector,
    s: &str,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) {
    for c in s.chars() {
      selector.handle_key(key(KeyCode::Char(c)), items, registry, now);
    }
  }

  #[test]
  fn test_open_browse_and_dismiss() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();

    assert_eq!(selector.mode(&items), SelectorMode::Closed);
    assert_eq!(
      selector.handle_key(key(KeyCode::Enter), &items, &registry, now),
      KeyResult::Event(SelectorEvent::Opened)
    );
    assert_eq!(selector.mode(&items), SelectorMode::Browsing);

    assert_eq!(
      selector.handle_key(key(KeyCode::Esc), &items, &registry, now),
      KeyResult::Event(SelectorEvent::Closed)
    );
    assert_eq!(selector.mode(&items), SelectorMode::Closed);
  }

  #[test]
  fn test_choosing_item_enters_editing_and_clears_search() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();

    type_str(&mut selector, "sha", &items, &registry, now);
    assert_eq!(selector.query(), "sha");

    assert_eq!(
      selector.handle_key(key(KeyCode::Enter), &items, &registry, now),
      KeyResult::Event(SelectorEvent::Editing("Shape".to_string()))
    );
    assert_eq!(selector.mode(&items), SelectorMode::Editing);
    assert_eq!(selector.query(), "");
  }

  #[test]
  fn test_disabled_item_is_not_activatable() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();

    type_str(&mut selector, "col", &items, &registry, now);
    assert_eq!(
      selector.handle_key(key(KeyCode::Enter), &items, &registry, now),
      KeyResult::Handled
    );
    assert_eq!(selector.mode(&items), SelectorMode::Browsing);
  }

  #[test]
  fn test_navigation_skips_disabled_item() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();

    selector.handle_key(key(KeyCode::Down), &items, &registry, now);
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);
    assert_eq!(selector.editing(&items).map(|i| i.label.as_str()), Some("Shape"));
  }

  #[test]
  fn test_editor_writes_value() {
    let registry = default_registry();
    let log = Rc::new(RefCell::new(Vec::new()));
    let items = items(&log);
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);

    selector.handle_key(key(KeyCode::Down), &items, &registry, now);
    assert_eq!(
      selector.handle_key(key(KeyCode::Enter), &items, &registry, now),
      KeyResult::Event(SelectorEvent::ValueChanged("Fruit".to_string()))
    );
    assert_eq!(*log.borrow(), vec!["Fruit=b".to_string()]);
    assert_eq!(selector.mode(&items), SelectorMode::Editing);
  }

  #[test]
  fn test_resets_are_deferred_after_close() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    type_str(&mut selector, "fr", &items, &registry, now);
    selector.dismiss(now);

    selector.tick(now + Duration::from_millis(100));
    assert_eq!(selector.query(), "fr");

    selector.tick(now + Duration::from_millis(150));
    assert_eq!(selector.query(), "");
  }

  #[test]
  fn test_selection_cleared_after_delay() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);
    selector.handle_key(key(KeyCode::Esc), &items, &registry, now);

    selector.tick(now + Duration::from_millis(100));
    selector.open();
    assert_eq!(selector.mode(&items), SelectorMode::Browsing);
  }

  #[test]
  fn test_reopen_before_delay_starts_fresh() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    type_str(&mut selector, "sh", &items, &registry, now);
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);
    selector.dismiss(now);

    selector.open();
    assert_eq!(selector.mode(&items), SelectorMode::Browsing);
    assert_eq!(selector.query(), "");
  }

  #[test]
  fn test_unregistered_tag_shows_empty_editor() {
    let registry = default_registry();
    let items = vec![FilterItem::with_tag("Age", "range", ())];
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);

    assert_eq!(selector.mode(&items), SelectorMode::Editing);
    assert_eq!(
      selector.handle_key(key(KeyCode::Char('x')), &items, &registry, now),
      KeyResult::NotHandled
    );
    assert_eq!(
      selector.handle_key(key(KeyCode::Esc), &items, &registry, now),
      KeyResult::Event(SelectorEvent::Closed)
    );
  }

  #[test]
  fn test_chosen_item_disappearing_falls_back_to_browsing() {
    let registry = default_registry();
    let all = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    selector.handle_key(key(KeyCode::Enter), &all, &registry, now);

    let remaining = all[1..].to_vec();
    assert_eq!(selector.mode(&remaining), SelectorMode::Browsing);
  }

  #[test]
  fn test_duplicate_label_resolves_to_first() {
    let registry = default_registry();
    let log = Rc::default();
    let items = vec![
      option_item("Name", &log),
      option_item("Name", &log).icon(Some("#".to_string())),
    ];
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    selector.handle_key(key(KeyCode::Down), &items, &registry, now);
    selector.handle_key(key(KeyCode::Enter), &items, &registry, now);

    assert!(selector.editing(&items).unwrap().icon.is_none());
  }

  #[test]
  fn test_trigger_label_hidden_once_a_filter_is_set() {
    let log = Rc::default();
    let unset = vec![option_item("Fruit", &log)];
    let set = vec![option_item("Fruit", &log).set(true)];

    assert_eq!(FilterSelector::trigger_line(&unset).to_string(), "[≡ Filter]");
    assert_eq!(FilterSelector::trigger_line(&set).to_string(), "[≡]");
  }

  #[test]
  fn test_click_toggles_trigger() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();

    let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
    terminal
      .draw(|frame| selector.render_trigger(frame, Rect::new(0, 0, 20, 1), &items, false))
      .unwrap();

    let click = MouseEvent {
      kind: MouseEventKind::Down(MouseButton::Left),
      column: 1,
      row: 0,
      modifiers: KeyModifiers::NONE,
    };
    assert_eq!(
      selector.handle_mouse(click, &items, &registry, now),
      KeyResult::Event(SelectorEvent::Opened)
    );

    terminal
      .draw(|frame| selector.render_popover(frame, frame.area(), &items, &registry))
      .unwrap();
    let buffer = terminal.backend().buffer();
    let text: String = (0..12u16)
      .flat_map(|y| (0..40u16).map(move |x| (x, y)))
      .map(|(x, y)| buffer[(x, y)].symbol().to_string())
      .collect();
    assert!(text.contains("Fruit"));
    assert!(text.contains("Shape"));

    assert_eq!(
      selector.handle_mouse(click, &items, &registry, now),
      KeyResult::Event(SelectorEvent::Closed)
    );
  }

  #[test]
  fn test_click_outside_dismisses() {
    let registry = default_registry();
    let items = items(&Rc::default());
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();

    let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
    terminal
      .draw(|frame| {
        selector.render_trigger(frame, Rect::new(0, 0, 20, 1), &items, false);
        selector.render_popover(frame, frame.area(), &items, &registry);
      })
      .unwrap();

    let outside = MouseEvent {
      kind: MouseEventKind::Down(MouseButton::Left),
      column: 39,
      row: 11,
      modifiers: KeyModifiers::NONE,
    };
    assert!(!selector.contains(39, 11));
    assert_eq!(
      selector.handle_mouse(outside, &items, &registry, now),
      KeyResult::Event(SelectorEvent::Closed)
    );
    assert!(!selector.is_open());
  }

  fn click(column: u16, row: u16) -> MouseEvent {
    MouseEvent {
      kind: MouseEventKind::Down(MouseButton::Left),
      column,
      row,
      modifiers: KeyModifiers::NONE,
    }
  }

  fn draw(selector: &mut FilterSelector, items: &[FilterItem], registry: &FilterRegistry) {
    let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
    terminal
      .draw(|frame| {
        selector.render_trigger(frame, Rect::new(0, 0, 20, 1), items, false);
        selector.render_popover(frame, frame.area(), items, registry);
      })
      .unwrap();
  }

  #[test]
  fn test_click_chooses_item_then_option() {
    let registry = default_registry();
    let log = Rc::new(RefCell::new(Vec::new()));
    let items = items(&log);
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    draw(&mut selector, &items, &registry);

    // Popover border on row 1, search line on row 2, Fruit on row 3
    assert_eq!(
      selector.handle_mouse(click(3, 3), &items, &registry, now),
      KeyResult::Event(SelectorEvent::Editing("Fruit".to_string()))
    );
    assert_eq!(selector.mode(&items), SelectorMode::Editing);

    draw(&mut selector, &items, &registry);
    // Apple on row 3, Banana on row 4
    assert_eq!(
      selector.handle_mouse(click(3, 4), &items, &registry, now),
      KeyResult::Event(SelectorEvent::ValueChanged("Fruit".to_string()))
    );
    assert_eq!(*log.borrow(), vec!["Fruit=b".to_string()]);
    assert!(selector.is_open());
  }

  #[test]
  fn test_click_on_disabled_item_does_nothing() {
    let registry = default_registry();
    let log = Rc::new(RefCell::new(Vec::new()));
    let items = items(&log);
    let now = Instant::now();
    let mut selector = FilterSelector::default();
    selector.open();
    draw(&mut selector, &items, &registry);

    // Colour is disabled, on row 4
    assert_eq!(
      selector.handle_mouse(click(3, 4), &items, &registry, now),
      KeyResult::Handled
    );
    assert_eq!(selector.mode(&items), SelectorMode::Browsing);
    // The search line is inside the popover too
    assert_eq!(
      selector.handle_mouse(click(3, 2), &items, &registry, now),
      KeyResult::Handled
    );
    assert!(selector.is_open());
    assert!(log.borrow().is_empty());
  }
}
