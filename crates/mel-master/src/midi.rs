//! MIDI keyboard input forwarded into the looper's live queue.

use mel_engine::LiveInput;
use mel_ir::NoteEvent;
use midir::{Ignore, MidiInput, MidiInputConnection};

use crate::ControllerError;

const CLIENT_NAME: &str = "melodious";

/// An open MIDI input. Dropping it closes the port.
pub struct MidiConnection {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiConnection {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Names of the available MIDI input ports.
pub fn list_midi_ports() -> Result<Vec<String>, ControllerError> {
    let input = MidiInput::new(CLIENT_NAME).map_err(|e| ControllerError::Midi(e.to_string()))?;
    Ok(input
        .ports()
        .iter()
        .filter_map(|port| input.port_name(port).ok())
        .collect())
}

/// Open the first MIDI input whose name contains `filter` (or the first
/// one at all) and forward its notes to `live`.
pub fn connect_midi(filter: Option<&str>, mut live: LiveInput) -> Result<MidiConnection, ControllerError> {
    let mut input = MidiInput::new(CLIENT_NAME).map_err(|e| ControllerError::Midi(e.to_string()))?;
    input.ignore(Ignore::All);

    let ports = input.ports();
    let (port, port_name) = ports
        .iter()
        .filter_map(|port| input.port_name(port).ok().map(|name| (port, name)))
        .find(|(_, name)| filter.map_or(true, |f| name.contains(f)))
        .ok_or_else(|| match filter {
            Some(f) => ControllerError::Midi(format!("no MIDI input matching {f:?}")),
            None => ControllerError::Midi("no MIDI input available".into()),
        })?;

    let connection = input
        .connect(
            port,
            "melodious-in",
            move |_stamp, bytes, _| {
                let Some((channel, event)) = decode(bytes) else {
                    return;
                };
                if !live.push_now(channel, event) {
                    tracing::warn!(channel, note = event.note(), "live queue full, MIDI note dropped");
                }
            },
            (),
        )
        .map_err(|e| ControllerError::Midi(e.to_string()))?;

    tracing::info!(port = %port_name, "MIDI input connected");
    Ok(MidiConnection {
        _connection: connection,
        port_name,
    })
}

/// Parse a channel voice message into an engine channel and note event.
///
/// MIDI channel `n` becomes engine channel `n + 1`. A NoteOn with zero
/// velocity is a NoteOff.
fn decode(bytes: &[u8]) -> Option<(u8, NoteEvent)> {
    let &[status, note, velocity, ..] = bytes else {
        return None;
    };
    let channel = (status & 0x0F) + 1;
    let note = note & 0x7F;
    let velocity = velocity & 0x7F;
    let event = match status & 0xF0 {
        0x90 if velocity > 0 => NoteEvent::NoteOn {
            note,
            velocity: f32::from(velocity) / 127.0,
        },
        0x90 | 0x80 => NoteEvent::NoteOff { note },
        _ => return None,
    };
    Some((channel, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on() {
        assert_eq!(
            decode(&[0x90, 60, 127]),
            Some((1, NoteEvent::NoteOn { note: 60, velocity: 1.0 }))
        );
    }

    #[test]
    fn channel_is_offset_by_one() {
        let (channel, _) = decode(&[0x9F, 60, 64]).unwrap();
        assert_eq!(channel, 16);
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        assert_eq!(decode(&[0x92, 64, 0]), Some((3, NoteEvent::NoteOff { note: 64 })));
        assert_eq!(decode(&[0x82, 64, 40]), Some((3, NoteEvent::NoteOff { note: 64 })));
    }

    #[test]
    fn other_messages_are_ignored() {
        assert_eq!(decode(&[0xB0, 7, 100]), None);
        assert_eq!(decode(&[0xE0, 0, 64]), None);
        assert_eq!(decode(&[0x90, 60]), None);
        assert_eq!(decode(&[]), None);
    }
}
