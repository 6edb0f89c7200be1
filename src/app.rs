use crate::config::UiConfig;
use crate::event::{Event, EventHandler};
use crate::filter::{FilterItem, FilterRegistry};
use crate::table::{filter_items, MemoryTable, TableEngine};
use crate::ui::components::{FilterPanel, KeyResult, PanelEvent};
use crate::ui::renderfns::{draw_footer, draw_header, truncate};
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use color_eyre::Result;
use crossterm::event::{
  DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseEvent,
};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use std::cell::RefCell;
use std::io::stdout;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const MAX_CELL_WIDTH: usize = 32;

/// Which part of the screen receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Grid,
  Panel,
}

/// Main application state
pub struct App {
  title: String,
  table: Rc<RefCell<MemoryTable>>,
  registry: FilterRegistry,
  panel: FilterPanel,
  focus: Focus,
  grid_state: TableState,
  tick_rate: Duration,
  should_quit: bool,
}

impl App {
  pub fn new(title: String, table: MemoryTable, registry: FilterRegistry, ui: &UiConfig) -> Self {
    let mut grid_state = TableState::default();
    if !table.rows().is_empty() {
      grid_state.select(Some(0));
    }
    Self {
      title,
      table: Rc::new(RefCell::new(table)),
      registry,
      panel: FilterPanel::new(ui.delays()),
      focus: Focus::Grid,
      grid_state,
      tick_rate: ui.tick_rate(),
      should_quit: false,
    }
  }

  pub fn focus(&self) -> Focus {
    self.focus
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }

  pub fn table(&self) -> &Rc<RefCell<MemoryTable>> {
    &self.table
  }

  /// Filter items for the current table state
  pub fn items(&self) -> Vec<FilterItem> {
    filter_items(&self.table)
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal, also when the loop failed
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(self.tick_rate);

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(event) => self.handle_event(event, Instant::now()),
        None => break,
      }
    }
    Ok(())
  }

  pub fn handle_event(&mut self, event: Event, now: Instant) {
    match event {
      Event::Key(key) => self.handle_key(key, now),
      Event::Mouse(mouse) => self.handle_mouse(mouse, now),
      Event::Tick => self.panel.tick(now),
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let items = self.items();
    // An open popover gets every key, so typing a search never quits
    if self.panel.is_capturing() {
      let result = self.panel.handle_key(key, &items, &self.registry, now);
      self.after_panel(result);
      return;
    }

    match key.code {
      KeyCode::Char('q') => {
        self.should_quit = true;
        return;
      }
      KeyCode::Char('f') => {
        self.focus = Focus::Panel;
        self.panel.open_selector();
        return;
      }
      KeyCode::Char('c') => {
        self.table.borrow_mut().clear_filters();
        self.clamp_selection();
        return;
      }
      KeyCode::Tab => {
        self.focus = match self.focus {
          Focus::Grid => Focus::Panel,
          Focus::Panel => Focus::Grid,
        };
        return;
      }
      _ => {}
    }

    match self.focus {
      Focus::Panel => {
        let result = self.panel.handle_key(key, &items, &self.registry, now);
        if result == KeyResult::NotHandled && key.code == KeyCode::Esc {
          self.focus = Focus::Grid;
        }
        self.after_panel(result);
      }
      Focus::Grid => match key.code {
        KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
        _ => {}
      },
    }
  }

  pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
    let items = self.items();
    let result = self.panel.handle_mouse(mouse, &items, &self.registry, now);
    if result.is_handled() {
      self.focus = Focus::Panel;
    }
    self.after_panel(result);
  }

  fn after_panel(&mut self, result: KeyResult<PanelEvent>) {
    if let KeyResult::Event(event) = result {
      debug!(?event, "filter panel event");
      if event.changes_filters() {
        self.clamp_selection();
      }
    }
  }

  fn row_count(&self) -> usize {
    self.table.borrow().filtered_rows().len()
  }

  fn move_selection(&mut self, delta: i32) {
    let count = self.row_count();
    if count == 0 {
      self.grid_state.select(None);
      return;
    }
    let current = self.grid_state.selected().unwrap_or(0) as i32;
    let next = (current + delta).clamp(0, count as i32 - 1);
    self.grid_state.select(Some(next as usize));
  }

  fn clamp_selection(&mut self) {
    let count = self.row_count();
    let selected = match (count, self.grid_state.selected()) {
      (0, _) => None,
      (_, Some(idx)) => Some(idx.min(count - 1)),
      (_, None) => Some(0),
    };
    self.grid_state.select(selected);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = if self.focus == Focus::Panel || self.panel.is_capturing() {
      self.panel.shortcuts()
    } else {
      vec![ShortcutInfo::new("j/k", "move").with_priority(10)]
    };
    if !self.panel.is_capturing() {
      shortcuts.extend([
        ShortcutInfo::new("f", "filter").with_priority(40),
        ShortcutInfo::new("tab", "focus").with_priority(50),
        ShortcutInfo::new("c", "clear").with_priority(60),
        ShortcutInfo::new("q", "quit").with_priority(90),
      ]);
    }
    shortcuts
  }

  pub fn draw(&mut self, frame: &mut Frame) {
    let items = self.items();
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Length(2), // Filter panel
        Constraint::Min(1),    // Grid
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    {
      let table = self.table.borrow();
      draw_header(
        frame,
        chunks[0],
        &self.title,
        table.filtered_rows().len(),
        table.rows().len(),
        table.active_filter_count(),
      );
    }

    let panel_area = chunks[1].inner(Margin::new(1, 0));
    self
      .panel
      .render(frame, panel_area, &items, &self.registry, self.focus == Focus::Panel);

    self.draw_grid(frame, chunks[2]);
    draw_footer(frame, chunks[3], &self.shortcuts());

    // Popovers last so they sit on top of the grid
    self
      .panel
      .render_overlays(frame, frame.area(), &items, &self.registry);
  }

  fn draw_grid(&mut self, frame: &mut Frame, area: Rect) {
    let table = self.table.borrow();
    let border_style = if self.focus == Focus::Grid {
      Style::default().fg(Color::Cyan)
    } else {
      Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(border_style)
      .title(" Rows ");

    let rows = table.filtered_rows();
    if rows.is_empty() {
      let paragraph = Paragraph::new("No rows match the active filters.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = table.columns();
    let header = Row::new(
      columns
        .iter()
        .map(|column| column.header.clone())
        .collect::<Vec<_>>(),
    )
    .style(Style::default().fg(Color::Yellow).bold());

    let body = rows.iter().map(|row| {
      Row::new(
        columns
          .iter()
          .map(|column| {
            let cell = row.get(&column.id).map(String::as_str).unwrap_or("");
            truncate(cell, MAX_CELL_WIDTH)
          })
          .collect::<Vec<_>>(),
      )
    });

    let widths = vec![Constraint::Fill(1); columns.len()];
    let grid = Table::new(body, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(grid, area, &mut self.grid_state);
  }
}

/// Log the loaded table's shape
pub fn log_startup(table: &MemoryTable, log_dir: &std::path::Path) {
  info!(
    rows = table.rows().len(),
    columns = table.columns().len(),
    log_dir = %log_dir.display(),
    "tabfilter starting"
  );
}
