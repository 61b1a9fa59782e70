use rtrb::{Consumer, Producer, RingBuffer};

use crate::{dsp::Shape, error::Error};

/// Control mutations, applied by the engine at the next buffer boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    /// Control frequency snapshotted by later activations.
    SetFrequency(f32),
    /// Control volume snapshotted by later activations.
    SetVolume(f32),
    /// Control shape snapshotted by later activations.
    SetShape(Shape),
    /// Depth applied to the predecessor by later activations.
    SetModulationIndex(f32),
    /// Live mix gain.
    SetMasterVolume(f32),
    Activate { row: usize, col: usize },
    Deactivate { row: usize, col: usize },
    /// Keyboard note: retunes the carriers (grid) or the harmonic base
    /// (additive).
    NoteOn { frequency: f32 },
    /// Retune one voice's carrier.
    SetVoiceFrequency { row: usize, frequency: f32 },
}

/// State changes reported back from the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    CellChanged { row: usize, col: usize, active: bool },
    VoiceStopped { row: usize },
    /// Single-voice playback ended because voice 0 stopped.
    Finished,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

pub trait EventSender {
    /// Push an event. Returns false if the event had to be dropped.
    fn push(&mut self, event: EngineEvent) -> bool;
}

impl EventSender for Producer<EngineEvent> {
    fn push(&mut self, event: EngineEvent) -> bool {
        Producer::push(self, event).is_ok()
    }
}

/// Control-thread end of the engine's rings.
pub struct ControlHandle {
    tx: Producer<ControlMessage>,
    events: Consumer<EngineEvent>,
}

impl ControlHandle {
    /// Queue a message for the engine.
    pub fn send(&mut self, msg: ControlMessage) -> Result<(), Error> {
        self.tx.push(msg).map_err(|_| {
            log::warn!("control queue full, dropping {msg:?}");
            Error::ControlQueueFull
        })
    }

    /// Next event reported by the engine, if any.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop().ok()
    }

    /// Number of messages the engine has not drained yet.
    pub fn pending(&self) -> usize {
        self.tx.buffer().capacity() - self.tx.slots()
    }
}

/// Engine end of the rings.
pub struct EngineChannels {
    pub rx: Consumer<ControlMessage>,
    pub events: Producer<EngineEvent>,
}

/// Create the control and event rings, each holding `capacity` entries.
pub fn channels(capacity: usize) -> (ControlHandle, EngineChannels) {
    let (tx, rx) = RingBuffer::<ControlMessage>::new(capacity);
    // Cascades report one event per cell, so leave room for a full row
    let (events_tx, events_rx) = RingBuffer::<EngineEvent>::new(capacity * 4);
    (
        ControlHandle {
            tx,
            events: events_rx,
        },
        EngineChannels {
            rx,
            events: events_tx,
        },
    )
}
