use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::theme::series_color;
use crate::workload::chart::ChartData;

const MAX_LABEL_WIDTH: usize = 20;
const BAR: &str = "█";

/// Pad or cut `text` to exactly `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = Span::raw(ch.to_string()).width();
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

/// Columns given to one stacked segment; a non-zero count always gets one.
fn segment_len(value: usize, max_total: usize, bar_width: usize) -> usize {
    if value == 0 || max_total == 0 {
        return 0;
    }
    ((value * bar_width + max_total / 2) / max_total).max(1)
}

fn legend(chart: &ChartData) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, series) in chart.series.iter().enumerate() {
        spans.push(Span::styled("■ ", Style::default().fg(series_color(i))));
        spans.push(Span::raw(format!("{}   ", series.label)));
    }
    Line::from(spans)
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let chart = app.chart();
    let report_items = app.report.as_ref().map(|r| r.total_items()).unwrap_or(0);

    let title = if app.loading {
        format!(" Workload: {} (loading...) ", app.scope_label())
    } else {
        format!(
            " Workload: {} ({} members, {} items) ",
            app.scope_label(),
            chart.categories.len(),
            report_items
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let mut lines = vec![legend(&chart), Line::raw("")];

    if chart.categories.is_empty() {
        let msg = if app.loading {
            "Loading work items..."
        } else if app.report.is_some() {
            "No assigned work items match."
        } else {
            "No data."
        };
        lines.push(Line::styled(msg, Style::default().fg(Color::DarkGray)));
        f.render_widget(Paragraph::new(lines).block(block), area);
        return;
    }

    let label_width = chart
        .categories
        .iter()
        .map(|c| Span::raw(c.as_str()).width())
        .max()
        .unwrap_or(0)
        .min(MAX_LABEL_WIDTH);
    let max_total = chart.max_stack_total();
    let total_width = max_total.to_string().len() + 1;
    let bar_width = inner_width.saturating_sub(label_width + total_width + 3).max(1);

    let visible = inner_height.saturating_sub(lines.len()).max(1);
    let offset = (app.selected_member + 1).saturating_sub(visible);

    for (m, member) in chart
        .categories
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
    {
        let selected = m == app.selected_member;
        let label_style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut spans = vec![
            Span::raw(if selected { "▶" } else { " " }),
            Span::styled(fit(member, label_width), label_style),
            Span::raw(" "),
        ];
        for (s, series) in chart.series.iter().enumerate() {
            let value = series.values.get(m).copied().unwrap_or(0);
            let len = segment_len(value, max_total, bar_width);
            if len > 0 {
                spans.push(Span::styled(
                    BAR.repeat(len),
                    Style::default().fg(series_color(s)),
                ));
            }
        }
        spans.push(Span::styled(
            format!(" {}", chart.stack_total(m)),
            Style::default().fg(Color::Gray),
        ));
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_pads_and_truncates_by_display_width() {
        assert_eq!(fit("Li", 4), "Li  ");
        assert_eq!(fit("Alexander", 4), "Alex");
        // CJK characters are two columns wide
        assert_eq!(fit("韩梅梅", 5), "韩梅 ");
    }

    #[test]
    fn segments_scale_to_bar_width() {
        assert_eq!(segment_len(10, 10, 40), 40);
        assert_eq!(segment_len(5, 10, 40), 20);
        assert_eq!(segment_len(0, 10, 40), 0);
        assert_eq!(segment_len(1, 1000, 40), 1);
    }
}
