//! TUI rendering for opgrid

mod controls;
mod grid;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use opgrid::{config::MixMode, io::PlayerState};

use super::app::App;

use controls::render_controls;
use grid::render_grid;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                          // Status bar
            Constraint::Length(app.config.rows as u16 + 2), // Grid
            Constraint::Length(7),                          // Controls
            Constraint::Min(0),
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_status(frame, chunks[0], app);
    render_grid(frame, chunks[1], &app.cells, app.cursor);
    render_controls(frame, chunks[2], app);

    let help = Paragraph::new(
        " [Arrows] Move  [Enter] On  [Bksp] Off  [Tab] Select  [,/.] Adjust  [a-;] Play  [Space] Stop  [Q] Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);
}

fn render_status(frame: &mut Frame, area: ratatui::layout::Rect, app: &App) {
    let block = Block::default().title(" opgrid ").borders(Borders::ALL);

    let (state, color) = match app.player_state() {
        PlayerState::Stopped => ("Stopped", Color::Yellow),
        PlayerState::Starting => ("Starting", Color::Cyan),
        PlayerState::Running => ("Playing", Color::Green),
        PlayerState::StoppingRequested => ("Stopping", Color::Magenta),
    };
    let mode = match app.config.mode {
        MixMode::Grid => String::from("grid"),
        MixMode::Additive { base_frequency } => format!("additive {base_frequency:.1}Hz"),
    };
    let note = app.note.map_or("-", |n| n.name);

    let line = Line::from(vec![
        Span::styled(format!(" {state}  "), Style::default().fg(color)),
        Span::styled(format!("Note: {note}  "), Style::default().fg(Color::Cyan)),
        Span::styled(format!("Mode: {mode}  "), Style::default().fg(Color::White)),
        Span::styled(
            format!(
                "{:.1}kHz / {} samples  ",
                app.config.sample_rate as f32 / 1000.0,
                app.config.block_size
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Magenta)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
