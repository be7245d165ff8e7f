use ratatui::style::Color;

use crate::model::work_item::DelayStatus;

const SERIES_COLORS: [Color; 6] = [
    Color::Rgb(0x3B, 0x82, 0xF6),
    Color::Rgb(0x10, 0xB9, 0x81),
    Color::Rgb(0xF5, 0x9E, 0x0B),
    Color::Rgb(0x6B, 0x72, 0x80),
    Color::Rgb(0xA8, 0x55, 0xF7),
    Color::Rgb(0xEC, 0x48, 0x99),
];

/// Colour of the n-th state series in the chart.
pub fn series_color(index: usize) -> Color {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

pub fn delay_color(status: DelayStatus) -> Color {
    match status {
        DelayStatus::Delayed => Color::Red,
        DelayStatus::Warning => Color::Yellow,
        DelayStatus::Normal => Color::Green,
        DelayStatus::Unknown => Color::Gray,
    }
}

pub fn priority_color(priority: Option<i64>) -> Color {
    match priority {
        Some(1) => Color::Red,
        Some(2) => Color::Yellow,
        Some(3) => Color::Blue,
        _ => Color::Gray,
    }
}
