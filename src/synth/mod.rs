// Purpose: Mixing, control messages, and the realtime producer
// This layer sits above the operator grid and owns it during playback

pub mod engine;
pub mod message;
pub mod mixer;

pub use engine::{BlockStatus, SynthEngine};
pub use message::{ControlHandle, ControlMessage, EngineEvent};
pub use mixer::Mixer;
