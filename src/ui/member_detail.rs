use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::theme::{delay_color, priority_color};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some((name, entry)) = app.selected_member_entry() else {
        f.render_widget(block.title(" Member "), area);
        return;
    };

    let visible_height = area.height.saturating_sub(2) as usize;
    let max_scroll = entry.items.len().saturating_sub(visible_height);
    let scroll = app.detail_scroll.min(max_scroll);

    let lines: Vec<Line> = entry
        .items
        .iter()
        .skip(scroll)
        .take(visible_height)
        .map(|item| {
            let priority = item
                .priority
                .map(|p| format!("P{p}"))
                .unwrap_or_else(|| "-".into());
            Line::from(vec![
                Span::styled(
                    format!("{:<8} ", item.delay_status.as_str()),
                    Style::default().fg(delay_color(item.delay_status)),
                ),
                Span::styled(
                    format!("#{:<7} ", item.id),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{priority:<3} "),
                    Style::default().fg(priority_color(item.priority)),
                ),
                Span::raw(format!("{} ", item.state)),
                Span::styled(
                    format!("{} ", item.target_date),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(item.title.clone()),
            ])
        })
        .collect();

    let title = format!(" {name}: {} items ", entry.total);
    f.render_widget(Paragraph::new(lines).block(block.title(title)), area);
}
