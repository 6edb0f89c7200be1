use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph};

/// Rows shown before the list starts scrolling
const MAX_VISIBLE_ROWS: usize = 10;
const MIN_WIDTH: u16 = 24;

/// One row of a search list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchEntry {
  pub label: String,
  pub icon: Option<String>,
  /// Some(_) renders a checkbox in front of the label
  pub checked: Option<bool>,
  pub disabled: bool,
  /// Shown after the label on the highlighted row only
  pub hint: Option<&'static str>,
}

impl SearchEntry {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      ..Self::default()
    }
  }

  pub fn icon(mut self, icon: Option<String>) -> Self {
    self.icon = icon;
    self
  }

  pub fn checked(mut self, checked: bool) -> Self {
    self.checked = Some(checked);
    self
  }

  pub fn disabled(mut self, disabled: bool) -> Self {
    self.disabled = disabled;
    self
  }

  pub fn hint(mut self, hint: &'static str) -> Self {
    self.hint = Some(hint);
    self
  }

  fn is_match(&self, query: &str) -> bool {
    query.is_empty() || self.label.to_lowercase().contains(&query.to_lowercase())
  }
}

/// Events emitted by a search list that the host needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchListEvent {
  /// An enabled entry was chosen (index into the entries slice)
  Selected(usize),
  /// Escape pressed
  Cancelled,
}

/// Searchable, keyboard-navigable list.
///
/// The list does not own its entries: hosts rebuild them every pass and
/// hand them in, the list only keeps the query and the highlight.
/// Navigation wraps and skips disabled entries.
#[derive(Debug, Clone, Default)]
pub struct SearchList {
  input: TextInput,
  highlighted: Option<usize>,
  /// Entry index and screen row of each line drawn by the last render
  rows: Vec<(usize, Rect)>,
}

impl SearchList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current search text
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Clear the search text and highlight
  pub fn reset(&mut self) {
    self.input.clear();
    self.highlighted = None;
  }

  /// Indices of entries matching the current query, in order
  pub fn visible(&self, entries: &[SearchEntry]) -> Vec<usize> {
    entries
      .iter()
      .enumerate()
      .filter(|(_, e)| e.is_match(self.query()))
      .map(|(i, _)| i)
      .collect()
  }

  fn navigable(&self, entries: &[SearchEntry]) -> Vec<usize> {
    self
      .visible(entries)
      .into_iter()
      .filter(|&i| !entries[i].disabled)
      .collect()
  }

  /// The highlighted entry, falling back to the first enabled match
  pub fn highlighted(&self, entries: &[SearchEntry]) -> Option<usize> {
    let nav = self.navigable(entries);
    match self.highlighted {
      Some(h) if nav.contains(&h) => Some(h),
      _ => nav.first().copied(),
    }
  }

  fn step(&mut self, entries: &[SearchEntry], delta: isize) {
    let nav = self.navigable(entries);
    if nav.is_empty() {
      self.highlighted = None;
      return;
    }
    let pos = self
      .highlighted(entries)
      .and_then(|h| nav.iter().position(|&i| i == h))
      .unwrap_or(0) as isize;
    let len = nav.len() as isize;
    let next = (pos + delta).rem_euclid(len) as usize;
    self.highlighted = Some(nav[next]);
  }

  /// Handle a key event against the given entries
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    entries: &[SearchEntry],
  ) -> KeyResult<SearchListEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Down | KeyCode::Tab => {
        self.step(entries, 1);
        return KeyResult::Handled;
      }
      KeyCode::Up | KeyCode::BackTab => {
        self.step(entries, -1);
        return KeyResult::Handled;
      }
      KeyCode::Char('n') if ctrl => {
        self.step(entries, 1);
        return KeyResult::Handled;
      }
      KeyCode::Char('p') if ctrl => {
        self.step(entries, -1);
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => match self.highlighted(entries) {
        Some(idx) => KeyResult::Event(SearchListEvent::Selected(idx)),
        None => KeyResult::Handled,
      },
      InputResult::Cancelled => KeyResult::Event(SearchListEvent::Cancelled),
      InputResult::Consumed => {
        // Query changed, highlight snaps back to the first match
        self.highlighted = None;
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Handle a click at a screen position; rows come from the last render.
  /// Disabled entries absorb the click without selecting.
  pub fn handle_click(
    &mut self,
    column: u16,
    row: u16,
    entries: &[SearchEntry],
  ) -> KeyResult<SearchListEvent> {
    let pos = Position::new(column, row);
    let Some(&(idx, _)) = self.rows.iter().find(|(_, area)| area.contains(pos)) else {
      return KeyResult::NotHandled;
    };
    match entries.get(idx) {
      Some(entry) if !entry.disabled => {
        self.highlighted = Some(idx);
        KeyResult::Event(SearchListEvent::Selected(idx))
      }
      _ => KeyResult::Handled,
    }
  }

  /// Width and height (without borders) this list would like
  pub fn preferred_size(&self, entries: &[SearchEntry]) -> (u16, u16) {
    let visible = self.visible(entries);
    let width = visible
      .iter()
      .map(|&i| entry_line(&entries[i], true).width() as u16)
      .max()
      .unwrap_or(0)
      .max(MIN_WIDTH);
    let rows = visible.len().clamp(1, MAX_VISIBLE_ROWS) as u16;
    (width, rows + 1)
  }

  /// Render the search line and the matching entries
  pub fn render(&mut self, frame: &mut Frame, area: Rect, entries: &[SearchEntry]) {
    self.rows.clear();
    if area.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Search line
        Constraint::Min(0),    // Entries
      ])
      .split(area);

    let input_line = if self.input.is_empty() {
      Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Yellow)),
        Span::styled("Search...", Style::default().fg(Color::DarkGray)),
      ])
    } else {
      Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Yellow)),
        Span::raw(self.input.value()),
        Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
      ])
    };
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if chunks[1].height == 0 {
      return;
    }

    let visible = self.visible(entries);
    if visible.is_empty() {
      let empty = Paragraph::new("No results.")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(empty, chunks[1]);
      return;
    }

    let highlighted = self.highlighted(entries);
    let items: Vec<ListItem> = visible
      .iter()
      .map(|&i| ListItem::new(entry_line(&entries[i], highlighted == Some(i))))
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(highlighted.and_then(|h| visible.iter().position(|&i| i == h)));

    frame.render_stateful_widget(list, chunks[1], &mut state);

    let rows_area = chunks[1];
    self.rows = visible
      .iter()
      .skip(state.offset())
      .take(rows_area.height as usize)
      .enumerate()
      .map(|(n, &idx)| {
        let row = Rect::new(rows_area.x, rows_area.y + n as u16, rows_area.width, 1);
        (idx, row)
      })
      .collect();
  }
}

fn entry_line(entry: &SearchEntry, highlighted: bool) -> Line<'static> {
  let base = if entry.disabled {
    Style::default().fg(Color::DarkGray)
  } else {
    Style::default().fg(Color::Cyan)
  };

  let mut spans = Vec::new();
  if let Some(checked) = entry.checked {
    spans.push(Span::styled(
      if checked { "[x] " } else { "[ ] " },
      base,
    ));
  }
  if let Some(icon) = &entry.icon {
    spans.push(Span::styled(format!("{} ", icon), base));
  }
  spans.push(Span::styled(entry.label.clone(), base));
  if let (Some(hint), true) = (entry.hint, highlighted) {
    spans.push(Span::styled(
      format!(" {}", hint),
      Style::default().fg(Color::Yellow),
    ));
  }
  Line::from(spans)
}
