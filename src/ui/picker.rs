use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::app::App;

fn row(label: String, detail: Option<String>, selected: bool) -> ListItem<'static> {
    let style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw(if selected { "▶ " } else { "  " }),
        Span::styled(label, style),
    ];
    if let Some(detail) = detail {
        spans.push(Span::styled(
            format!("  [{detail}]"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn render_list(f: &mut Frame, area: Rect, title: &str, rows: Vec<ListItem<'static>>, selected: usize) {
    let list = List::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title.to_string()),
    );
    let mut state = ListState::default().with_selected(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}

pub fn render_projects(f: &mut Frame, area: Rect, app: &App) {
    let mut rows = vec![row("All projects".into(), None, app.selected_project == 0)];
    rows.extend(app.projects.iter().enumerate().map(|(i, p)| {
        row(
            p.name.clone(),
            Some(p.collection.clone()),
            app.selected_project == i + 1,
        )
    }));

    let title = if app.loading {
        " Projects (loading...) "
    } else if !app.has_collections() {
        " Projects (no collections configured) "
    } else {
        " Projects "
    };
    render_list(f, area, title, rows, app.selected_project);
}

pub fn render_teams(f: &mut Frame, area: Rect, app: &App) {
    let mut rows = vec![row("All teams".into(), None, app.selected_team == 0)];
    rows.extend(
        app.teams
            .iter()
            .enumerate()
            .map(|(i, t)| row(t.name.clone(), None, app.selected_team == i + 1)),
    );

    let title = if app.loading {
        " Teams (loading...) ".to_string()
    } else {
        format!(" Teams: {} ", app.picker_label())
    };
    render_list(f, area, &title, rows, app.selected_team);
}
