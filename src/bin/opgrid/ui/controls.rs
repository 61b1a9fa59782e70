//! Control values applied to the next activated cell

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Selected};

pub fn render_controls(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Controls ").borders(Borders::ALL);

    let rows = [
        (Selected::Frequency, "Frequency", format!("{:.1} Hz", app.controls.frequency)),
        (Selected::Volume, "Volume", format!("{:.2}", app.controls.volume)),
        (Selected::Shape, "Shape", app.controls.shape.name().to_string()),
        (Selected::ModulationIndex, "Mod index", format!("{:.1}", app.controls.modulation_index)),
        (Selected::MasterVolume, "Master", format!("{:.2}", app.master_volume)),
    ];

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(which, label, value)| {
            let marker = if which == app.selected { ">" } else { " " };
            let style = if which == app.selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {marker} {label:<10}"), style),
                Span::styled(value, Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
