//! MIDI transport message parsing
//!
//! Only the three channel-voice messages the bridge cares about are decoded:
//! Note On, Note Off and Control Change. Everything else (SysEx, clock,
//! pitch bend, pressure, running status) is ignored.

use std::fmt;

/// Decoded channel-voice message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127)
    NoteOff { channel: u8, note: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let status = data[0];
        if !(0x80..0xF0).contains(&status) {
            return None;
        }

        let channel = status & 0x0F;
        // Data bytes carry 7 bits; a set high bit means a malformed packet.
        let (data1, data2) = (data[1], data[2]);
        if data1 > 0x7F || data2 > 0x7F {
            return None;
        }

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff { channel, note: data1 }),
            0x90 => {
                // Note On with velocity 0 = Note Off
                if data2 == 0 {
                    Some(MidiMessage::NoteOff { channel, note: data1 })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: data1,
                        velocity: data2,
                    })
                }
            }
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: data1,
                value: data2,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOff { channel, note } => [0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange { channel, cc, value } => {
                [0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
        }
    }

    /// MIDI channel (0-15)
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::ControlChange { channel, .. } => channel,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note } => {
                write!(f, "NoteOff ch:{} n:{}", channel + 1, note)
            }
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
        }
    }
}

/// Which MIDI channels a driver forwards to its bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFilter {
    /// Accept every channel
    #[default]
    Omni,
    /// Accept a single channel (0-15)
    Only(u8),
}

impl ChannelFilter {
    /// Build from a 1-based channel number as written in config files
    pub fn from_config(channel: Option<u8>) -> Self {
        match channel {
            Some(ch) if (1..=16).contains(&ch) => ChannelFilter::Only(ch - 1),
            _ => ChannelFilter::Omni,
        }
    }

    pub fn accepts(&self, message: &MidiMessage) -> bool {
        match *self {
            ChannelFilter::Omni => true,
            ChannelFilter::Only(ch) => message.channel() == ch,
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let data = vec![0x90, 60, 100]; // Note On, ch 1, Middle C, velocity 100
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero() {
        let data = vec![0x90, 60, 0];
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(msg, MidiMessage::NoteOff { channel: 0, note: 60 });
    }

    #[test]
    fn test_note_off_ignores_release_velocity() {
        let msg = MidiMessage::parse(&[0x83, 64, 90]).unwrap();
        assert_eq!(msg, MidiMessage::NoteOff { channel: 3, note: 64 });
    }

    #[test]
    fn test_control_change() {
        let data = vec![0xB2, 7, 100]; // CC ch 3, volume, value 100
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(
            msg,
            MidiMessage::ControlChange {
                channel: 2,
                cc: 7,
                value: 100,
            }
        );
    }

    #[test]
    fn test_ignored_messages() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0xF8]), None); // clock
        assert_eq!(MidiMessage::parse(&[0xF0, 0x00, 0xF7]), None); // sysex
        assert_eq!(MidiMessage::parse(&[0xE0, 0x00, 0x40]), None); // pitch bend
        assert_eq!(MidiMessage::parse(&[0x3C, 0x40, 0x00]), None); // running status
        assert_eq!(MidiMessage::parse(&[0x90, 0x80, 0x40]), None); // bad data byte
        assert_eq!(MidiMessage::parse(&[0xB0, 7]), None); // truncated
    }

    #[test]
    fn test_encode_note_on() {
        let msg = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        };

        assert_eq!(msg.encode(), [0x90, 60, 100]);
        assert_eq!(MidiMessage::parse(&msg.encode()), Some(msg));
    }

    #[test]
    fn test_channel_filter() {
        let on_ch2 = MidiMessage::NoteOn {
            channel: 1,
            note: 60,
            velocity: 1,
        };

        assert!(ChannelFilter::Omni.accepts(&on_ch2));
        assert!(ChannelFilter::from_config(Some(2)).accepts(&on_ch2));
        assert!(!ChannelFilter::from_config(Some(1)).accepts(&on_ch2));
        assert_eq!(ChannelFilter::from_config(Some(0)), ChannelFilter::Omni);
        assert_eq!(ChannelFilter::from_config(None), ChannelFilter::Omni);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x90, 0x3C, 0x7F]), "90 3C 7F");
    }
}
