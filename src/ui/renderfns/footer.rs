use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Footer content: shortcuts ordered by priority, keys highlighted and
/// descriptions dimmed
pub fn footer_line(shortcuts: &[ShortcutInfo]) -> Line<'static> {
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);

  let mut spans = vec![Span::raw(" ")];
  for (i, shortcut) in sorted.into_iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }
  Line::from(spans)
}

/// Draw the footer bar with shortcut hints
pub fn draw_footer(frame: &mut Frame, area: Rect, shortcuts: &[ShortcutInfo]) {
  let paragraph = Paragraph::new(footer_line(shortcuts)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
