use crate::synth::message::ControlMessage;

/// A playable key on the computer keyboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub key: char,
    pub name: &'static str,
    pub frequency: f32,
}

/// Piano-style layout: the home row plays naturals, the row above plays
/// sharps. C4 to E5.
pub const KEYBOARD: [Note; 17] = [
    Note { key: 'a', name: "C4", frequency: 261.6 },
    Note { key: 'w', name: "C#4", frequency: 277.0 },
    Note { key: 's', name: "D4", frequency: 293.66 },
    Note { key: 'e', name: "D#4", frequency: 311.0 },
    Note { key: 'd', name: "E4", frequency: 329.63 },
    Note { key: 'f', name: "F4", frequency: 349.23 },
    Note { key: 't', name: "F#4", frequency: 370.0 },
    Note { key: 'g', name: "G4", frequency: 392.0 },
    Note { key: 'y', name: "G#4", frequency: 415.0 },
    Note { key: 'h', name: "A4", frequency: 440.0 },
    Note { key: 'u', name: "A#4", frequency: 466.0 },
    Note { key: 'j', name: "B4", frequency: 493.88 },
    Note { key: 'k', name: "C5", frequency: 523.85 },
    Note { key: 'o', name: "C#5", frequency: 554.0 },
    Note { key: 'l', name: "D5", frequency: 587.33 },
    Note { key: 'p', name: "D#5", frequency: 622.0 },
    Note { key: ';', name: "E5", frequency: 659.26 },
];

/// Look up the note for a key press. Case-insensitive.
pub fn note_for_key(key: char) -> Option<&'static Note> {
    let key = key.to_ascii_lowercase();
    KEYBOARD.iter().find(|note| note.key == key)
}

/// The `NoteOn` message a key press sends, if the key plays a note.
pub fn key_to_message(key: char) -> Option<ControlMessage> {
    note_for_key(key).map(|note| ControlMessage::NoteOn {
        frequency: note.frequency,
    })
}
