//! Control side: key handling, grid mirror, player lifecycle

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::Duration;

use opgrid::{
    dsp::Shape,
    graph::ControlValues,
    io::{keyboard, Player, PlayerState},
    synth::{ControlHandle, ControlMessage, EngineEvent},
    EngineConfig,
};

use super::ui;

const FREQUENCY_STEP: f32 = 1.0;
/// Step used at or below 1 Hz, where whole-hertz steps are too coarse.
const FINE_FREQUENCY_STEP: f32 = 0.1;
const MIN_CONTROL_FREQUENCY: f32 = 0.1;
const MAX_CONTROL_FREQUENCY: f32 = 150.0;
const VOLUME_STEP: f32 = 0.05;
const INDEX_STEP: f32 = 0.5;

/// The control value `,` and `.` adjust.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selected {
    Frequency,
    Volume,
    Shape,
    ModulationIndex,
    MasterVolume,
}

impl Selected {
    fn next(self) -> Self {
        match self {
            Selected::Frequency => Selected::Volume,
            Selected::Volume => Selected::Shape,
            Selected::Shape => Selected::ModulationIndex,
            Selected::ModulationIndex => Selected::MasterVolume,
            Selected::MasterVolume => Selected::Frequency,
        }
    }
}

pub struct App {
    pub config: EngineConfig,
    player: Player,
    handle: ControlHandle,
    /// Cell states as last reported by the engine.
    pub cells: Vec<Vec<bool>>,
    pub cursor: (usize, usize),
    pub controls: ControlValues,
    pub master_volume: f32,
    pub selected: Selected,
    pub note: Option<&'static keyboard::Note>,
    pub status: String,
    should_quit: bool,
}

impl App {
    pub fn new(config: EngineConfig, player: Player, handle: ControlHandle) -> Self {
        Self {
            cells: vec![vec![false; config.cols]; config.rows],
            master_volume: config.master_volume,
            config,
            player,
            handle,
            cursor: (0, 0),
            controls: ControlValues::default(),
            selected: Selected::Frequency,
            note: None,
            status: String::from("ready"),
            should_quit: false,
        }
    }

    pub fn player_state(&self) -> PlayerState {
        self.player.state()
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.tick();

            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.player.stop()?;
        Ok(())
    }

    /// Reap a finished worker, keep the idle engine in step, mirror events.
    fn tick(&mut self) {
        match self.player.poll() {
            Ok(true) => self.status = String::from("playback finished"),
            Ok(false) => {}
            Err(err) => self.status = format!("playback error: {err}"),
        }
        self.player.sync();

        while let Some(event) = self.handle.poll_event() {
            match event {
                EngineEvent::CellChanged { row, col, active } => {
                    if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
                        *cell = active;
                    }
                }
                EngineEvent::VoiceStopped { row } => {
                    log::debug!("voice {row} stopped");
                }
                EngineEvent::Finished => self.status = String::from("voice 0 stopped"),
            }
        }
    }

    fn send(&mut self, msg: ControlMessage) {
        if let Err(err) = self.handle.send(msg) {
            self.status = err.to_string();
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let (row, col) = self.cursor;
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up => self.cursor.0 = row.saturating_sub(1),
            KeyCode::Down => self.cursor.0 = (row + 1).min(self.config.rows - 1),
            KeyCode::Left => self.cursor.1 = col.saturating_sub(1),
            KeyCode::Right => self.cursor.1 = (col + 1).min(self.config.cols - 1),
            KeyCode::Enter => self.send(ControlMessage::Activate { row, col }),
            KeyCode::Backspace | KeyCode::Delete => {
                self.send(ControlMessage::Deactivate { row, col })
            }
            KeyCode::Tab => self.selected = self.selected.next(),
            KeyCode::Char(',') => self.adjust(-1.0),
            KeyCode::Char('.') => self.adjust(1.0),
            KeyCode::Char(' ') => {
                self.player.request_stop();
                self.status = String::from("stopping");
            }
            KeyCode::Char(c) => self.play(c),
            _ => {}
        }
    }

    fn play(&mut self, key: char) {
        let (Some(note), Some(msg)) = (keyboard::note_for_key(key), keyboard::key_to_message(key))
        else {
            return;
        };
        self.note = Some(note);
        self.send(msg);
        if self.player.state() != PlayerState::Stopped {
            return;
        }
        // Apply the note before the device starts pulling blocks
        self.player.sync();
        match self.player.start() {
            Ok(()) => self.status = format!("playing {}", note.name),
            Err(err) => {
                log::error!("failed to start playback: {err}");
                self.status = format!("audio error: {err}");
            }
        }
    }

    fn adjust(&mut self, direction: f32) {
        let msg = match self.selected {
            Selected::Frequency => {
                self.controls.frequency = step_frequency(self.controls.frequency, direction);
                ControlMessage::SetFrequency(self.controls.frequency)
            }
            Selected::Volume => {
                self.controls.volume =
                    (self.controls.volume + direction * VOLUME_STEP).clamp(0.0, 1.0);
                ControlMessage::SetVolume(self.controls.volume)
            }
            Selected::Shape => {
                self.controls.shape = if direction > 0.0 {
                    self.controls.shape.next()
                } else {
                    previous_shape(self.controls.shape)
                };
                ControlMessage::SetShape(self.controls.shape)
            }
            Selected::ModulationIndex => {
                self.controls.modulation_index =
                    (self.controls.modulation_index + direction * INDEX_STEP).max(0.0);
                ControlMessage::SetModulationIndex(self.controls.modulation_index)
            }
            Selected::MasterVolume => {
                self.master_volume = (self.master_volume + direction * VOLUME_STEP).clamp(0.0, 1.0);
                ControlMessage::SetMasterVolume(self.master_volume)
            }
        };
        self.send(msg);
    }
}

/// Move the frequency control one step. Steps are 1 Hz above 1 Hz and
/// 0.1 Hz below it, within the 0.1 to 150 Hz control range.
fn step_frequency(current: f32, direction: f32) -> f32 {
    let fine = current < 1.0 || (current <= 1.0 && direction < 0.0);
    let step = if fine { FINE_FREQUENCY_STEP } else { FREQUENCY_STEP };
    let next = current + direction.signum() * step;
    // Snap to the step grid so repeated fine steps do not drift
    let next = if fine { (next * 10.0).round() / 10.0 } else { next };
    next.clamp(MIN_CONTROL_FREQUENCY, MAX_CONTROL_FREQUENCY)
}

fn previous_shape(shape: Shape) -> Shape {
    let shapes = Shape::SELECTABLE;
    let pos = shapes.iter().position(|&s| s == shape).unwrap_or(0);
    shapes[(pos + shapes.len() - 1) % shapes.len()]
}
