use super::{ChipEvent, FilterChips, FilterSelector, KeyResult, SelectorDelays, SelectorEvent};
use crate::filter::{FilterItem, FilterRegistry};
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use ratatui::prelude::*;
use std::time::Instant;

/// Which half of the panel has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelFocus {
  #[default]
  Trigger,
  Chips,
}

/// Events emitted by the panel that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
  Selector(SelectorEvent),
  Chip(ChipEvent),
}

impl PanelEvent {
  /// Whether the event wrote to or cleared a filter value
  pub fn changes_filters(&self) -> bool {
    matches!(
      self,
      PanelEvent::Selector(SelectorEvent::ValueChanged(_))
        | PanelEvent::Chip(ChipEvent::ValueChanged(_) | ChipEvent::Removed(_))
    )
  }
}

/// Filter selector followed by the chip list, on one row
#[derive(Debug, Default)]
pub struct FilterPanel {
  selector: FilterSelector,
  chips: FilterChips,
  focus: PanelFocus,
}

impl FilterPanel {
  pub fn new(delays: SelectorDelays) -> Self {
    Self {
      selector: FilterSelector::new(delays),
      ..Self::default()
    }
  }

  pub fn selector(&self) -> &FilterSelector {
    &self.selector
  }

  pub fn chips(&self) -> &FilterChips {
    &self.chips
  }

  pub fn focus(&self) -> PanelFocus {
    self.focus
  }

  /// True while a popover is open and should receive every key
  pub fn is_capturing(&self) -> bool {
    self.selector.is_open() || self.chips.is_popover_open()
  }

  /// Open the selector; an open chip popover closes first
  pub fn open_selector(&mut self) {
    self.focus = PanelFocus::Trigger;
    self.chips.close_popover();
    self.selector.open();
  }

  pub fn tick(&mut self, now: Instant) {
    self.selector.tick(now);
  }

  /// Handle a key event
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) -> KeyResult<PanelEvent> {
    if self.selector.is_open() {
      return self
        .selector
        .handle_key(key, items, registry, now)
        .map(PanelEvent::Selector);
    }
    if self.chips.is_popover_open() {
      return self.chips.handle_key(key, items, registry).map(PanelEvent::Chip);
    }

    let has_chips = items.iter().any(|item| item.is_set);
    match self.focus {
      PanelFocus::Trigger => match key.code {
        KeyCode::Right | KeyCode::Char('l') if has_chips => {
          self.focus = PanelFocus::Chips;
          self.chips.focus_first();
          KeyResult::Handled
        }
        _ => self
          .selector
          .handle_key(key, items, registry, now)
          .map(PanelEvent::Selector),
      },
      PanelFocus::Chips if !has_chips => {
        self.focus = PanelFocus::Trigger;
        self
          .selector
          .handle_key(key, items, registry, now)
          .map(PanelEvent::Selector)
      }
      PanelFocus::Chips => match self.chips.handle_key(key, items, registry) {
        KeyResult::NotHandled if matches!(key.code, KeyCode::Left | KeyCode::Char('h')) => {
          self.focus = PanelFocus::Trigger;
          KeyResult::Handled
        }
        other => other.map(PanelEvent::Chip),
      },
    }
  }

  /// Handle a mouse event. A click outside an open selector closes it and
  /// still reaches the chips. Opening the selector closes a chip popover.
  pub fn handle_mouse(
    &mut self,
    mouse: MouseEvent,
    items: &[FilterItem],
    registry: &FilterRegistry,
    now: Instant,
  ) -> KeyResult<PanelEvent> {
    let outside = !self.selector.contains(mouse.column, mouse.row);
    let closed_selector = self.selector.is_open() && outside;
    if closed_selector {
      self.selector.dismiss(now);
    }

    if !closed_selector {
      let result = self.selector.handle_mouse(mouse, items, registry, now);
      if result == KeyResult::Event(SelectorEvent::Opened) {
        self.chips.close_popover();
      }
      if result.is_handled() {
        self.focus = PanelFocus::Trigger;
        return result.map(PanelEvent::Selector);
      }
    }

    match self.chips.handle_mouse(mouse, items, registry) {
      KeyResult::NotHandled if closed_selector => {
        KeyResult::Event(PanelEvent::Selector(SelectorEvent::Closed))
      }
      KeyResult::NotHandled => KeyResult::NotHandled,
      other => {
        self.focus = PanelFocus::Chips;
        other.map(PanelEvent::Chip)
      }
    }
  }

  /// Render the trigger and chips into `area`
  pub fn render(
    &mut self,
    frame: &mut Frame,
    area: Rect,
    items: &[FilterItem],
    registry: &FilterRegistry,
    focused: bool,
  ) {
    let trigger_width = (FilterSelector::trigger_line(items).width() as u16).min(area.width);
    self.selector.render_trigger(
      frame,
      area,
      items,
      focused && self.focus == PanelFocus::Trigger,
    );

    let offset = trigger_width.saturating_add(1).min(area.width);
    let chips_area = Rect::new(area.x + offset, area.y, area.width - offset, area.height);
    self.chips.render(
      frame,
      chips_area,
      items,
      registry,
      focused && self.focus == PanelFocus::Chips,
    );
  }

  /// Render open popovers; call after everything else so they sit on top
  pub fn render_overlays(
    &mut self,
    frame: &mut Frame,
    bounds: Rect,
    items: &[FilterItem],
    registry: &FilterRegistry,
  ) {
    self.selector.render_popover(frame, bounds, items, registry);
    self.chips.render_popover(frame, bounds, items, registry);
  }
}

impl ShortcutProvider for FilterPanel {
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.selector.is_open() || self.chips.is_popover_open() {
      return vec![
        ShortcutInfo::new("↑↓", "move").with_priority(10),
        ShortcutInfo::new("enter", "choose").with_priority(20),
        ShortcutInfo::new("esc", "close").with_priority(30),
      ];
    }
    match self.focus {
      PanelFocus::Trigger => vec![
        ShortcutInfo::new("enter", "filter").with_priority(10),
        ShortcutInfo::new("→", "chips").with_priority(20),
      ],
      PanelFocus::Chips => vec![
        ShortcutInfo::new("←→", "move").with_priority(10),
        ShortcutInfo::new("enter", "edit").with_priority(20),
        ShortcutInfo::new("x", "remove").with_priority(30),
      ],
    }
  }
}
