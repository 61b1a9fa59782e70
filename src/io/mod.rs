// Purpose - external interfaces: audio output, computer keyboard

pub mod keyboard;
pub mod player;
pub mod sink;

pub use keyboard::{note_for_key, Note, KEYBOARD};
pub use player::{list_output_devices, Player, PlayerState};
pub use sink::{render_to_sink, AudioSink, BlockAdapter, BufferSink};
