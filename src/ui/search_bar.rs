use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    if !app.search_active {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Filter members (enter keeps, esc clears) ");

    let paragraph = Paragraph::new(Line::from(Span::raw(app.search.clone()))).block(block);
    f.render_widget(paragraph, area);

    // Cursor sits after the typed text
    let x = area.x + 1 + Span::raw(app.search.as_str()).width() as u16;
    let y = area.y + 1;
    f.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), y));
}
