//! Operator grid widget - one row per voice, carrier in the first column

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_grid(frame: &mut Frame, area: Rect, cells: &[Vec<bool>], cursor: (usize, usize)) {
    let block = Block::default().title(" Operators ").borders(Borders::ALL);

    let lines: Vec<Line> = cells
        .iter()
        .enumerate()
        .map(|(row, cols)| {
            let mut spans = vec![Span::styled(
                format!(" v{row} "),
                Style::default().fg(Color::DarkGray),
            )];
            for (col, &active) in cols.iter().enumerate() {
                let (glyph, color) = match (active, col) {
                    (true, 0) => ("[#]", Color::Green),
                    (true, _) => ("[*]", Color::Cyan),
                    (false, _) => ("[ ]", Color::DarkGray),
                };
                let mut style = Style::default().fg(color);
                if cursor == (row, col) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(glyph, style));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
