pub mod chart;
pub mod footer;
pub mod member_detail;
pub mod picker;
pub mod search_bar;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::{App, ViewMode};

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();

    // Search bar (3) while typing a filter, else footer (1)
    let bottom_height = if app.search_active { 3 } else { 1 };

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(bottom_height)])
        .split(size);

    let main_area = vertical[0];
    let bottom_area = vertical[1];

    match &app.view_mode {
        ViewMode::Projects => picker::render_projects(f, main_area, app),
        ViewMode::Teams => picker::render_teams(f, main_area, app),
        ViewMode::Chart => chart::render(f, main_area, app),
        ViewMode::MemberDetail => {
            // Chart (40%) + member items (60%)
            let horizontal = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(main_area);

            chart::render(f, horizontal[0], app);
            member_detail::render(f, horizontal[1], app);
        }
    }

    if app.search_active {
        search_bar::render(f, bottom_area, app);
    } else {
        footer::render(f, bottom_area, app);
    }
}
