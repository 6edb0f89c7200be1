use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear};

/// Place a popover of `size` (inner width/height, borders excluded) under
/// `anchor`, aligned to its left edge and kept inside `bounds`.
///
/// When there is not enough room below the anchor the popover opens above
/// it instead; if neither side fits it is clipped to whichever is larger.
pub fn anchored_area(anchor: Rect, size: (u16, u16), bounds: Rect) -> Rect {
  let width = size.0.saturating_add(2).min(bounds.width);
  let wanted = size.1.saturating_add(2);

  let below_top = anchor.bottom().min(bounds.bottom());
  let room_below = bounds.bottom().saturating_sub(below_top);
  let room_above = anchor.y.saturating_sub(bounds.y);

  let (y, height) = if wanted <= room_below || room_below >= room_above {
    (below_top, wanted.min(room_below))
  } else {
    let height = wanted.min(room_above);
    (anchor.y - height, height)
  };

  let max_x = bounds.right().saturating_sub(width);
  let x = anchor.x.clamp(bounds.x, max_x.max(bounds.x));

  Rect::new(x, y, width, height)
}

/// Clear `area` and draw the popover frame, returning the inner area
pub fn render_frame(frame: &mut Frame, area: Rect, title: Option<&str>) -> Rect {
  frame.render_widget(Clear, area);

  let mut block = Block::default()
    .borders(Borders::ALL)
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(Color::Yellow));
  if let Some(title) = title {
    block = block.title(format!(" {} ", title));
  }

  let inner = block.inner(area);
  frame.render_widget(block, area);
  inner
}
