use super::popover;
use super::KeyResult;
use crate::filter::{EditorEvent, EditorState, FilterItem, FilterRegistry};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use ratatui::prelude::*;
use tracing::debug;

const SEPARATOR: &str = "│";
const REMOVE_GLYPH: &str = "✕";

/// Events emitted by the chip list that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChipEvent {
  /// The remove action of the chip with this label ran
  Removed(String),
  PopoverOpened(String),
  PopoverClosed(String),
  /// The editor in the open popover wrote a new value
  ValueChanged(String),
}

/// Part of a chip under a screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSegment {
  Label,
  Value,
  Remove,
}

/// Items that get a chip: the set ones, in list order
pub fn active_chips(items: &[FilterItem]) -> Vec<&FilterItem> {
  items.iter().filter(|item| item.is_set).collect()
}

#[derive(Debug, Clone)]
struct ChipRegions {
  label: String,
  label_area: Rect,
  value_area: Option<Rect>,
  remove_area: Option<Rect>,
}

#[derive(Debug)]
struct OpenChip {
  label: String,
  editor: EditorState,
}

/// One chip per active filter: `icon label │ value │ ✕`.
///
/// The value segment only exists when the item's type is registered, and
/// opens a popover hosting the strategy's editor. The separator after the
/// label is always drawn. The remove segment only
/// exists when the item carries a remove action.
#[derive(Debug, Default)]
pub struct FilterChips {
  focused: usize,
  open: Option<OpenChip>,
  regions: Vec<ChipRegions>,
  popover_area: Option<Rect>,
}

impl FilterChips {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_popover_open(&self) -> bool {
    self.open.is_some()
  }

  /// Label of the chip whose popover is open
  pub fn open_label(&self) -> Option<&str> {
    self.open.as_ref().map(|o| o.label.as_str())
  }

  /// Label of the focused chip
  pub fn focused_label<'a>(&self, items: &'a [FilterItem]) -> Option<&'a str> {
    let chips = active_chips(items);
    chips
      .get(self.focused.min(chips.len().saturating_sub(1)))
      .map(|item| item.label.as_str())
  }

  pub fn focus_first(&mut self) {
    self.focused = 0;
  }

  /// Focus the previous chip, returning false when already on the first
  pub fn focus_prev(&mut self) -> bool {
    if self.focused == 0 {
      return false;
    }
    self.focused -= 1;
    true
  }

  pub fn focus_next(&mut self, items: &[FilterItem]) {
    let count = active_chips(items).len();
    if self.focused + 1 < count {
      self.focused += 1;
    }
  }

  /// Drop state referring to chips that no longer exist
  fn sync(&mut self, items: &[FilterItem]) {
    let chips = active_chips(items);
    if let Some(open) = &self.open {
      if !chips.iter().any(|item| item.label == open.label) {
        debug!(label = %open.label, "chip popover closed, filter no longer set");
        self.open = None;
        self.popover_area = None;
      }
    }
    self.focused = self.focused.min(chips.len().saturating_sub(1));
  }

  /// Close the value popover, returning the label it belonged to
  pub fn close_popover(&mut self) -> Option<String> {
    self.popover_area = None;
    let open = self.open.take()?;
    debug!(label = %open.label, "chip popover closed");
    Some(open.label)
  }

  /// Open or close the value popover of `item`
  fn toggle_popover(&mut self, item: &FilterItem, registry: &FilterRegistry) -> KeyResult<ChipEvent> {
    if self.open_label() == Some(item.label.as_str()) {
      return match self.close_popover() {
        Some(label) => KeyResult::Event(ChipEvent::PopoverClosed(label)),
        None => KeyResult::Handled,
      };
    }
    match registry.open_editor(item) {
      Some(editor) => {
        debug!(label = %item.label, "chip popover opened");
        self.popover_area = None;
        self.open = Some(OpenChip {
          label: item.label.clone(),
          editor,
        });
        KeyResult::Event(ChipEvent::PopoverOpened(item.label.clone()))
      }
      None => KeyResult::Handled,
    }
  }

  /// Run the remove action of `item`. The popover is left alone.
  fn remove(item: &FilterItem) -> KeyResult<ChipEvent> {
    if item.remove.invoke() {
      debug!(label = %item.label, "filter removed from chip");
      KeyResult::Event(ChipEvent::Removed(item.label.clone()))
    } else {
      KeyResult::Handled
    }
  }

  /// Handle a key event
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
  ) -> KeyResult<ChipEvent> {
    self.sync(items);
    let chips = active_chips(items);

    if let Some(open) = self.open.as_mut() {
      let Some(item) = chips.iter().find(|item| item.label == open.label) else {
        return KeyResult::NotHandled;
      };
      return match registry.handle_editor_key(item, &mut open.editor, key) {
        KeyResult::Event(EditorEvent::ValueChanged) => {
          KeyResult::Event(ChipEvent::ValueChanged(item.label.clone()))
        }
        KeyResult::Event(EditorEvent::Dismissed) => self.dismiss_popover(),
        KeyResult::NotHandled if key.code == KeyCode::Esc => self.dismiss_popover(),
        KeyResult::NotHandled => KeyResult::NotHandled,
        KeyResult::Handled => KeyResult::Handled,
      };
    }

    let Some(item) = chips.get(self.focused) else {
      return KeyResult::NotHandled;
    };
    match key.code {
      KeyCode::Left | KeyCode::Char('h') => {
        if self.focus_prev() {
          KeyResult::Handled
        } else {
          KeyResult::NotHandled
        }
      }
      KeyCode::Right | KeyCode::Char('l') => {
        self.focus_next(items);
        KeyResult::Handled
      }
      KeyCode::Enter | KeyCode::Char(' ') => self.toggle_popover(item, registry),
      KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => Self::remove(item),
      _ => KeyResult::NotHandled,
    }
  }

  fn dismiss_popover(&mut self) -> KeyResult<ChipEvent> {
    match self.close_popover() {
      Some(label) => KeyResult::Event(ChipEvent::PopoverClosed(label)),
      None => KeyResult::Handled,
    }
  }

  /// Which chip segment lies under a screen position
  pub fn segment_at(&self, column: u16, row: u16) -> Option<(&str, ChipSegment)> {
    let pos = Position::new(column, row);
    self.regions.iter().find_map(|r| {
      if r.remove_area.is_some_and(|a| a.contains(pos)) {
        Some((r.label.as_str(), ChipSegment::Remove))
      } else if r.value_area.is_some_and(|a| a.contains(pos)) {
        Some((r.label.as_str(), ChipSegment::Value))
      } else if r.label_area.contains(pos) {
        Some((r.label.as_str(), ChipSegment::Label))
      } else {
        None
      }
    })
  }

  /// Screen area of one segment of a rendered chip
  pub fn segment_area(&self, label: &str, segment: ChipSegment) -> Option<Rect> {
    let r = self.regions.iter().find(|r| r.label == label)?;
    match segment {
      ChipSegment::Label => Some(r.label_area),
      ChipSegment::Value => r.value_area,
      ChipSegment::Remove => r.remove_area,
    }
  }

  /// Handle a mouse event; positions come from the last render
  pub fn handle_mouse(
    &mut self,
    mouse: MouseEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
  ) -> KeyResult<ChipEvent> {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
      return KeyResult::NotHandled;
    }
    self.sync(items);
    let pos = Position::new(mouse.column, mouse.row);
    let chips = active_chips(items);
    if self.popover_area.is_some_and(|a| a.contains(pos)) {
      return self.click_popover(mouse.column, mouse.row, &chips, registry);
    }

    let hit = self
      .segment_at(mouse.column, mouse.row)
      .map(|(label, segment)| (label.to_string(), segment));
    let target = hit.and_then(|(label, segment)| {
      chips
        .iter()
        .position(|item| item.label == label)
        .map(|idx| (idx, segment))
    });

    match target {
      Some((idx, ChipSegment::Remove)) => Self::remove(chips[idx]),
      Some((idx, ChipSegment::Value)) => {
        self.focused = idx;
        self.toggle_popover(chips[idx], registry)
      }
      Some((idx, ChipSegment::Label)) => {
        self.focused = idx;
        KeyResult::Handled
      }
      // Click outside dismisses an open popover
      None => match self.close_popover() {
        Some(label) => KeyResult::Event(ChipEvent::PopoverClosed(label)),
        None => KeyResult::NotHandled,
      },
    }
  }

  fn click_popover(
    &mut self,
    column: u16,
    row: u16,
    chips: &[&FilterItem],
    registry: &FilterRegistry,
  ) -> KeyResult<ChipEvent> {
    let Some(open) = self.open.as_mut() else {
      return KeyResult::Handled;
    };
    let Some(item) = chips.iter().find(|item| item.label == open.label) else {
      return KeyResult::Handled;
    };
    match registry.handle_editor_click(item, &mut open.editor, column, row) {
      KeyResult::Event(EditorEvent::ValueChanged) => {
        KeyResult::Event(ChipEvent::ValueChanged(item.label.clone()))
      }
      KeyResult::Event(EditorEvent::Dismissed) => self.dismiss_popover(),
      KeyResult::Handled | KeyResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the chips left to right, wrapping onto further rows of `area`
  pub fn render(
    &mut self,
    frame: &mut Frame,
    area: Rect,
    items: &[FilterItem],
    registry: &FilterRegistry,
    focused: bool,
  ) {
    self.sync(items);
    self.regions.clear();

    let mut x = area.x;
    let mut y = area.y;
    for (idx, item) in active_chips(items).into_iter().enumerate() {
      let highlight = focused && idx == self.focused;
      let popover_open = self.open_label() == Some(item.label.as_str());
      let chip = chip_segments(item, registry, highlight, popover_open);
      let width: u16 = chip.iter().map(|(_, line)| line.width() as u16).sum();

      if x > area.x && x + width > area.right() {
        x = area.x;
        y += 1;
      }
      if y >= area.bottom() {
        break;
      }

      let mut regions = ChipRegions {
        label: item.label.clone(),
        label_area: Rect::default(),
        value_area: None,
        remove_area: None,
      };
      for (segment, line) in chip {
        let seg_width = (line.width() as u16).min(area.right().saturating_sub(x));
        let seg_area = Rect::new(x, y, seg_width, 1);
        frame.render_widget(line, seg_area);
        match segment {
          Some(ChipSegment::Label) => regions.label_area = seg_area,
          Some(ChipSegment::Value) => regions.value_area = Some(seg_area),
          Some(ChipSegment::Remove) => regions.remove_area = Some(seg_area),
          None => {}
        }
        x += seg_width;
      }
      self.regions.push(regions);
      x = x.saturating_add(1).min(area.right());
    }
  }

  /// Render the open popover under its chip's value segment
  pub fn render_popover(
    &mut self,
    frame: &mut Frame,
    bounds: Rect,
    items: &[FilterItem],
    registry: &FilterRegistry,
  ) {
    self.sync(items);
    let Some(label) = self.open_label().map(str::to_string) else {
      self.popover_area = None;
      return;
    };
    let Some(item) = active_chips(items).into_iter().find(|item| item.label == label) else {
      return;
    };
    let anchor = self
      .segment_area(&label, ChipSegment::Value)
      .unwrap_or(Rect::new(bounds.x, bounds.y, 1, 1));
    let Some(open) = self.open.as_mut() else {
      return;
    };

    let size = registry.editor_size(item, &open.editor).unwrap_or((24, 8));
    let area = popover::anchored_area(anchor, size, bounds);
    let inner = popover::render_frame(frame, area, Some(label.as_str()));
    registry.render_editor(item, &mut open.editor, frame, inner);
    self.popover_area = Some(area);
  }
}

/// Styled segments of one chip; `None` marks separators
fn chip_segments(
  item: &FilterItem,
  registry: &FilterRegistry,
  highlight: bool,
  popover_open: bool,
) -> Vec<(Option<ChipSegment>, Line<'static>)> {
  let bg = if highlight { Color::Blue } else { Color::DarkGray };
  let base = Style::default().fg(Color::White).bg(bg);
  let sep = Style::default().fg(Color::Gray).bg(bg);

  let label = match &item.icon {
    Some(icon) => format!(" {} {} ", icon, item.label),
    None => format!(" {} ", item.label),
  };
  let mut segments = vec![(
    Some(ChipSegment::Label),
    Line::styled(label, base.add_modifier(Modifier::BOLD)),
  )];

  segments.push((None, Line::styled(SEPARATOR, sep)));
  if registry.contains(item.filter_type()) {
    let value_style = if popover_open {
      base.add_modifier(Modifier::UNDERLINED)
    } else {
      base
    };
    let mut value = Line::styled(" ", value_style);
    if let Some(display) = registry.display(item) {
      for span in display.spans {
        value.push_span(span.patch_style(value_style));
      }
    }
    value.push_span(Span::styled(" ", value_style));
    segments.push((Some(ChipSegment::Value), value));
  } else {
    segments.push((None, Line::styled(" ", base)));
  }

  if !item.remove.is_disabled() {
    segments.push((None, Line::styled(SEPARATOR, sep)));
    segments.push((
      Some(ChipSegment::Remove),
      Line::styled(format!(" {} ", REMOVE_GLYPH), base),
    ));
  }
  segments
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::{
    default_registry, ColumnOption, OptionFilter, OptionFilterConfig, Removal,
  };
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use std::cell::{Cell, RefCell};
  use std::rc::Rc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn click(column: u16, row: u16) -> MouseEvent {
    MouseEvent {
      kind: MouseEventKind::Down(MouseButton::Left),
      column,
      row,
      modifiers: KeyModifiers::NONE,
    }
  }

  fn fruit(label: &str, value: Option<&str>, removed: &Rc<Cell<u32>>) -> FilterItem {
    let removed = removed.clone();
    FilterItem::new::<OptionFilter>(
      label,
      OptionFilterConfig {
        options: vec![
          ColumnOption::new("a", "Apple"),
          ColumnOption::new("b", "Banana"),
        ],
        value: value.map(str::to_string),
        on_value_change: Rc::new(|_: Option<String>| {}),
      },
    )
    .set(value.is_some())
    .removal(Removal::action(move || removed.set(removed.get() + 1)))
  }

  fn render(chips: &mut FilterChips, items: &[FilterItem], registry: &FilterRegistry) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
    terminal
      .draw(|frame| {
        chips.render(frame, Rect::new(0, 0, 60, 1), items, registry, true);
        chips.render_popover(frame, frame.area(), items, registry);
      })
      .unwrap();
    let buffer = terminal.backend().buffer();
    (0..60u16).map(|x| buffer[(x, 0u16)].symbol()).collect()
  }

  #[test]
  fn test_only_set_items_get_chips_in_order() {
    let removed = Rc::default();
    let items = vec![
      fruit("One", Some("a"), &removed),
      fruit("Two", None, &removed),
      fruit("Three", Some("b"), &removed),
    ];
    let labels: Vec<_> = active_chips(&items).iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["One", "Three"]);
  }

  #[test]
  fn test_unset_item_with_value_gets_no_chip() {
    let removed = Rc::default();
    let items = vec![fruit("One", Some("a"), &removed).set(false)];
    assert!(active_chips(&items).is_empty());
  }

  #[test]
  fn test_chip_layout() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![
      fruit("One", Some("b"), &removed).icon(Some("@".to_string())),
      fruit("Two", None, &removed),
    ];
    let mut chips = FilterChips::new();
    let row = render(&mut chips, &items, &registry);

    assert!(row.starts_with(" @ One │ Banana │ ✕ "));
    assert!(!row.contains("Two"));
  }

  #[test]
  fn test_disabled_removal_has_no_remove_segment() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![fruit("One", Some("a"), &removed).removal(Removal::Disabled)];
    let mut chips = FilterChips::new();
    let row = render(&mut chips, &items, &registry);

    assert!(!row.contains(REMOVE_GLYPH));
    assert!(chips.segment_area("One", ChipSegment::Remove).is_none());
    assert_eq!(
      chips.handle_key(key(KeyCode::Char('x')), &items, &registry),
      KeyResult::Handled
    );
  }

  #[test]
  fn test_unregistered_type_has_no_value_segment() {
    let registry = default_registry();
    let removed = Rc::new(Cell::new(0));
    let counter = removed.clone();
    let items = vec![FilterItem::with_tag("Age", "range", ())
      .set(true)
      .removal(Removal::action(move || counter.set(counter.get() + 1)))];
    let mut chips = FilterChips::new();
    let row = render(&mut chips, &items, &registry);

    assert!(row.starts_with(" Age │ │ ✕ "));
    assert!(chips.segment_area("Age", ChipSegment::Value).is_none());
    assert_eq!(
      chips.handle_key(key(KeyCode::Enter), &items, &registry),
      KeyResult::Handled
    );
    assert!(!chips.is_popover_open());
  }

  #[test]
  fn test_unknown_value_renders_empty_value_segment() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![fruit("One", Some("zzz"), &removed)];
    let mut chips = FilterChips::new();
    let row = render(&mut chips, &items, &registry);

    assert!(row.starts_with(" One │  │ ✕ "));
  }

  #[test]
  fn test_remove_by_key_runs_once_without_touching_popover() {
    let registry = default_registry();
    let removed = Rc::new(Cell::new(0));
    let items = vec![fruit("One", Some("a"), &removed)];
    let mut chips = FilterChips::new();

    assert_eq!(
      chips.handle_key(key(KeyCode::Char('x')), &items, &registry),
      KeyResult::Event(ChipEvent::Removed("One".to_string()))
    );
    assert_eq!(removed.get(), 1);
    assert!(!chips.is_popover_open());
  }

  #[test]
  fn test_remove_click_does_not_toggle_popover() {
    let registry = default_registry();
    let removed = Rc::new(Cell::new(0));
    let items = vec![
      fruit("One", Some("a"), &removed),
      fruit("Two", Some("b"), &removed),
    ];
    let mut chips = FilterChips::new();
    render(&mut chips, &items, &registry);

    let remove_one = chips.segment_area("One", ChipSegment::Remove).unwrap();
    assert_eq!(
      chips.handle_mouse(click(remove_one.x + 1, remove_one.y), &items, &registry),
      KeyResult::Event(ChipEvent::Removed("One".to_string()))
    );
    assert_eq!(removed.get(), 1);
    assert!(!chips.is_popover_open());

    let value_two = chips.segment_area("Two", ChipSegment::Value).unwrap();
    chips.handle_mouse(click(value_two.x, value_two.y), &items, &registry);
    assert_eq!(chips.open_label(), Some("Two"));

    let remove_two = chips.segment_area("Two", ChipSegment::Remove).unwrap();
    chips.handle_mouse(click(remove_two.x, remove_two.y), &items, &registry);
    assert_eq!(removed.get(), 2);
    assert_eq!(chips.open_label(), Some("Two"));
  }

  #[test]
  fn test_value_popover_hosts_editor() {
    let registry = default_registry();
    let written = Rc::new(RefCell::new(Vec::new()));
    let sink = written.clone();
    let items = vec![FilterItem::new::<OptionFilter>(
      "Fruit",
      OptionFilterConfig {
        options: vec![ColumnOption::new("a", "Apple")],
        value: Some("a".to_string()),
        on_value_change: Rc::new(move |v: Option<String>| sink.borrow_mut().push(v)),
      },
    )
    .set(true)];
    let mut chips = FilterChips::new();

    assert_eq!(
      chips.handle_key(key(KeyCode::Enter), &items, &registry),
      KeyResult::Event(ChipEvent::PopoverOpened("Fruit".to_string()))
    );
    assert_eq!(
      chips.handle_key(key(KeyCode::Enter), &items, &registry),
      KeyResult::Event(ChipEvent::ValueChanged("Fruit".to_string()))
    );
    assert_eq!(*written.borrow(), vec![Some("a".to_string())]);

    assert_eq!(
      chips.handle_key(key(KeyCode::Esc), &items, &registry),
      KeyResult::Event(ChipEvent::PopoverClosed("Fruit".to_string()))
    );
  }

  #[test]
  fn test_click_on_option_in_popover_writes_value() {
    let registry = default_registry();
    let written = Rc::new(RefCell::new(Vec::new()));
    let sink = written.clone();
    let items = vec![FilterItem::new::<OptionFilter>(
      "Fruit",
      OptionFilterConfig {
        options: vec![
          ColumnOption::new("a", "Apple"),
          ColumnOption::new("b", "Banana"),
        ],
        value: Some("a".to_string()),
        on_value_change: Rc::new(move |v: Option<String>| sink.borrow_mut().push(v)),
      },
    )
    .set(true)];
    let mut chips = FilterChips::new();
    render(&mut chips, &items, &registry);

    let value = chips.segment_area("Fruit", ChipSegment::Value).unwrap();
    chips.handle_mouse(click(value.x, value.y), &items, &registry);
    assert_eq!(chips.open_label(), Some("Fruit"));
    render(&mut chips, &items, &registry);

    // Border, search line, Apple, then Banana under the value segment
    assert_eq!(
      chips.handle_mouse(click(value.x + 3, value.y + 4), &items, &registry),
      KeyResult::Event(ChipEvent::ValueChanged("Fruit".to_string()))
    );
    assert_eq!(*written.borrow(), vec![Some("b".to_string())]);
    assert_eq!(chips.open_label(), Some("Fruit"));

    // The search line selects nothing and keeps the popover open
    assert_eq!(
      chips.handle_mouse(click(value.x + 3, value.y + 2), &items, &registry),
      KeyResult::Handled
    );
    assert_eq!(written.borrow().len(), 1);
    assert!(chips.is_popover_open());
  }

  #[test]
  fn test_click_outside_closes_popover() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![fruit("One", Some("a"), &removed)];
    let mut chips = FilterChips::new();
    chips.handle_key(key(KeyCode::Enter), &items, &registry);
    render(&mut chips, &items, &registry);

    assert_eq!(
      chips.handle_mouse(click(59, 9), &items, &registry),
      KeyResult::Event(ChipEvent::PopoverClosed("One".to_string()))
    );
  }

  #[test]
  fn test_popover_closes_when_filter_unset() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![fruit("One", Some("a"), &removed)];
    let mut chips = FilterChips::new();
    chips.handle_key(key(KeyCode::Enter), &items, &registry);
    assert!(chips.is_popover_open());

    let items = vec![fruit("One", None, &removed)];
    render(&mut chips, &items, &registry);
    assert!(!chips.is_popover_open());
  }

  #[test]
  fn test_focus_moves_between_chips() {
    let registry = default_registry();
    let removed = Rc::default();
    let items = vec![
      fruit("One", Some("a"), &removed),
      fruit("Two", Some("b"), &removed),
    ];
    let mut chips = FilterChips::new();

    chips.handle_key(key(KeyCode::Right), &items, &registry);
    assert_eq!(chips.focused_label(&items), Some("Two"));
    chips.handle_key(key(KeyCode::Right), &items, &registry);
    assert_eq!(chips.focused_label(&items), Some("Two"));
    chips.handle_key(key(KeyCode::Left), &items, &registry);
    assert_eq!(
      chips.handle_key(key(KeyCode::Left), &items, &registry),
      KeyResult::NotHandled
    );
    assert_eq!(chips.focused_label(&items), Some("One"));
  }
}
