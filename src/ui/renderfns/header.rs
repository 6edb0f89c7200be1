use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Header content: title, then visible and total row counts
pub fn header_line(title: &str, visible: usize, total: usize, active_filters: usize) -> Line<'static> {
  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {}/{} rows ", visible, total),
      Style::default().fg(Color::White),
    ),
  ];
  if active_filters > 0 {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    let noun = if active_filters == 1 { "filter" } else { "filters" };
    spans.push(Span::styled(
      format!(" {} {} ", active_filters, noun),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }
  Line::from(spans)
}

/// Draw the header bar
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, visible: usize, total: usize, active_filters: usize) {
  let paragraph = Paragraph::new(header_line(title, visible, total, active_filters))
    .style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
