use rtrb::{Consumer, Producer};

use crate::{
    config::{EngineConfig, PlaybackMode},
    error::Error,
    graph::{
        operator::{sanitize_frequency, sanitize_index, sanitize_volume},
        CellChange,
    },
    synth::{
        message::{channels, ControlHandle, ControlMessage, EngineEvent, EventSender, MessageReceiver},
        mixer::Mixer,
    },
};

/// Capacity of the control ring created by `SynthEngine::with_channels`.
pub const CONTROL_QUEUE_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Continue,
    /// Playback ended. The block was filled with silence and no further
    /// audio will be produced until the engine is rearmed.
    Finished,
}

/// The realtime producer: drains pending control messages at each buffer
/// boundary, then renders exactly one buffer.
pub struct SynthEngine {
    mixer: Mixer,
    rx: Consumer<ControlMessage>,
    events: Producer<EngineEvent>,
    playback: PlaybackMode,
    block_size: usize,
    finished: bool,
    blocks_rendered: u64,
    dropped_events: u64,
}

impl SynthEngine {
    /// Build an engine for `config`. Fails if the config does not validate,
    /// e.g. a block size the operator buffers cannot hold.
    pub fn new(
        config: &EngineConfig,
        rx: Consumer<ControlMessage>,
        events: Producer<EngineEvent>,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            mixer: Mixer::new(config),
            rx,
            events,
            playback: config.playback,
            block_size: config.block_size,
            finished: false,
            blocks_rendered: 0,
            dropped_events: 0,
        })
    }

    /// Build an engine together with the control-side handle for it.
    pub fn with_channels(config: &EngineConfig) -> Result<(Self, ControlHandle), Error> {
        let (handle, chans) = channels(CONTROL_QUEUE_LEN);
        Ok((Self::new(config, chans.rx, chans.events)?, handle))
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered
    }

    /// Events that could not be reported because the event ring was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Clear a previous `Finished` so the engine renders again.
    pub fn rearm(&mut self) {
        self.finished = false;
    }

    /// Apply every queued control message.
    pub fn drain_messages(&mut self) {
        while let Some(msg) = MessageReceiver::pop(&mut self.rx) {
            self.apply(msg);
        }
    }

    /// Apply one control message immediately.
    pub fn apply(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::SetFrequency(hz) => {
                self.mixer.controls_mut().frequency = sanitize_frequency(hz);
            }
            ControlMessage::SetVolume(volume) => {
                self.mixer.controls_mut().volume = sanitize_volume(volume);
            }
            ControlMessage::SetShape(shape) => {
                self.mixer.controls_mut().shape = shape;
            }
            ControlMessage::SetModulationIndex(index) => {
                self.mixer.controls_mut().modulation_index = sanitize_index(index);
            }
            ControlMessage::SetMasterVolume(volume) => self.mixer.set_master_volume(volume),
            ControlMessage::Activate { row, col } => {
                if self.mixer.activate(row, col) == CellChange::Activated {
                    self.report(EngineEvent::CellChanged {
                        row,
                        col,
                        active: true,
                    });
                }
            }
            ControlMessage::Deactivate { row, col } => {
                let before = self.mixer.matrix().chain_len(row);
                if let CellChange::Deactivated { voice_stopped } = self.mixer.deactivate(row, col) {
                    for k in col..before {
                        self.report(EngineEvent::CellChanged {
                            row,
                            col: k,
                            active: false,
                        });
                    }
                    if voice_stopped {
                        self.report(EngineEvent::VoiceStopped { row });
                        if row == 0 && self.playback == PlaybackMode::SingleVoice && !self.finished {
                            self.finished = true;
                            self.report(EngineEvent::Finished);
                        }
                    }
                }
            }
            ControlMessage::NoteOn { frequency } => self.mixer.note_on(frequency),
            ControlMessage::SetVoiceFrequency { row, frequency } => {
                self.mixer.set_voice_frequency(row, frequency);
            }
        }
    }

    fn report(&mut self, event: EngineEvent) {
        if !EventSender::push(&mut self.events, event) {
            self.dropped_events += 1;
        }
    }

    /// Drain control messages, then render one buffer into `out`.
    pub fn render_block(&mut self, out: &mut [f32]) -> BlockStatus {
        debug_assert_eq!(out.len(), self.block_size);

        self.drain_messages();

        if self.finished {
            out.fill(0.0);
            return BlockStatus::Finished;
        }

        self.mixer.output(out);
        self.blocks_rendered += 1;
        BlockStatus::Continue
    }
}
