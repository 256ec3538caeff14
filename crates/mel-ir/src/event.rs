//! Timestamped note events.

/// Sample offset inside a timing window (a loop, or a block).
pub type SampleTime = u32;

/// A note event at a sample offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedEvent {
    /// Samples from the start of the owning window
    pub time: SampleTime,
    /// MIDI-style channel; scripted tracks and live input use distinct ones
    pub channel: u8,
    /// What the event does
    pub event: NoteEvent,
}

impl TimedEvent {
    /// Create a new event.
    pub const fn new(time: SampleTime, channel: u8, event: NoteEvent) -> Self {
        Self {
            time,
            channel,
            event,
        }
    }

    /// Note-on at `time`.
    pub const fn note_on(time: SampleTime, channel: u8, note: u8, velocity: f32) -> Self {
        Self::new(time, channel, NoteEvent::NoteOn { note, velocity })
    }

    /// Note-off at `time`.
    pub const fn note_off(time: SampleTime, channel: u8, note: u8) -> Self {
        Self::new(time, channel, NoteEvent::NoteOff { note })
    }

    /// The note number, regardless of kind.
    pub const fn note(&self) -> u8 {
        self.event.note()
    }

    pub const fn is_note_on(&self) -> bool {
        matches!(self.event, NoteEvent::NoteOn { .. })
    }

    pub const fn is_note_off(&self) -> bool {
        matches!(self.event, NoteEvent::NoteOff { .. })
    }

    /// Same event moved to another time.
    pub const fn at(self, time: SampleTime) -> Self {
        Self { time, ..self }
    }
}

/// What a note event does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoteEvent {
    /// Start a note. `velocity` is 0.0..=1.0.
    NoteOn { note: u8, velocity: f32 },
    /// Release a note.
    NoteOff { note: u8 },
}

impl NoteEvent {
    pub const fn note(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note } => note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        let on = TimedEvent::note_on(10, 1, 60, 0.5);
        let off = TimedEvent::note_off(20, 1, 60);
        assert!(on.is_note_on());
        assert!(!on.is_note_off());
        assert!(off.is_note_off());
        assert_eq!(on.note(), 60);
        assert_eq!(off.note(), 60);
    }

    #[test]
    fn at_keeps_payload() {
        let ev = TimedEvent::note_on(10, 3, 64, 1.0).at(99);
        assert_eq!(ev.time, 99);
        assert_eq!(ev.channel, 3);
        assert_eq!(ev.event, NoteEvent::NoteOn { note: 64, velocity: 1.0 });
    }
}
