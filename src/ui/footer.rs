use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, ViewMode};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    match &app.view_mode {
        ViewMode::Projects => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("enter", "select"));
            spans.push(hint("r", "reload"));
            spans.push(hint("q", "quit"));
        }
        ViewMode::Teams => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("enter", "load workload"));
            spans.push(hint("←", "projects"));
            spans.push(hint("q", "quit"));
        }
        ViewMode::Chart => {
            spans.push(hint("↑↓", "member"));
            spans.push(hint("→", "items"));
            spans.push(hint("←", "teams"));
            spans.push(hint("/", "filter"));
            spans.push(hint("f", "date filter"));
            spans.push(hint("r", "refresh"));
            spans.push(hint("q", "quit"));
        }
        ViewMode::MemberDetail => {
            spans.push(hint("↑↓", "scroll"));
            spans.push(hint("←", "chart"));
            spans.push(hint("q", "quit"));
        }
    }

    // Date filter indicator
    spans.push(Span::raw("  "));
    if app.date_filter {
        spans.push(Span::styled(
            " DATED ONLY ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ));
    } else {
        spans.push(Span::styled(
            " ALL ITEMS ",
            Style::default().fg(Color::Black).bg(Color::DarkGray),
        ));
    }

    if app.loading {
        spans.push(Span::styled(" loading… ", Style::default().fg(Color::Cyan)));
    }

    if !app.search.is_empty() {
        spans.push(Span::styled(
            format!("  filter: {}", app.search),
            Style::default().fg(Color::Cyan),
        ));
    }

    if let Some(err) = &app.error {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    } else if let Some((msg, _)) = &app.flash_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(msg.clone(), Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans));
    f.render_widget(paragraph, area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(
        format!(" {key}:{desc} "),
        Style::default().fg(Color::DarkGray),
    )
}
