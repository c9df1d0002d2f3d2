//! Meta events, the non-MIDI events that only live inside Standard Midi Files.

use crate::{
    prelude::*,
    primitive::{write_varlen_slice, SmpteTime},
};

/// A meta-event carrying song information, timing and track layout.
///
/// Text-like events hold raw bytes, since the MIDI standard does not pin down an encoding.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MetaMessage<'a> {
    /// For `Format::Sequential` MIDI file types, `TrackNumber` can be empty, and defaults to
    /// the track index.
    TrackNumber(Option<u16>),
    Text(&'a [u8]),
    Copyright(&'a [u8]),
    TrackName(&'a [u8]),
    InstrumentName(&'a [u8]),
    Lyric(&'a [u8]),
    Marker(&'a [u8]),
    CuePoint(&'a [u8]),
    ProgramName(&'a [u8]),
    DeviceName(&'a [u8]),
    MidiChannel(u4),
    MidiPort(u7),
    /// Obligatory at track end.
    EndOfTrack,
    /// Amount of microseconds per beat (quarter note).
    ///
    /// Usually appears at the beginning of a track, before any midi events are sent, but there
    /// are no guarantees.
    Tempo(u24),
    SmpteOffset(SmpteTime),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    SequencerSpecific(&'a [u8]),
    /// An unknown or malformed meta-message.
    ///
    /// The first `u8` is the raw meta-message identifier byte.
    /// The slice is the actual payload of the meta-message.
    Unknown(u8, &'a [u8]),
}
impl<'a> MetaMessage<'a> {
    /// Interpret the payload of a meta event with the given type byte.
    ///
    /// Payloads too short for their type are reported as `Unknown` rather than failing, so that a
    /// single odd event does not take down a whole file.
    pub fn read(type_byte: u8, data: &'a [u8]) -> MetaMessage<'a> {
        match type_byte {
            0x00 if data.len() >= 2 => {
                MetaMessage::TrackNumber(Some(u16::from_be_bytes([data[0], data[1]])))
            }
            0x00 => MetaMessage::TrackNumber(None),
            0x01 => MetaMessage::Text(data),
            0x02 => MetaMessage::Copyright(data),
            0x03 => MetaMessage::TrackName(data),
            0x04 => MetaMessage::InstrumentName(data),
            0x05 => MetaMessage::Lyric(data),
            0x06 => MetaMessage::Marker(data),
            0x07 => MetaMessage::CuePoint(data),
            0x08 => MetaMessage::ProgramName(data),
            0x09 => MetaMessage::DeviceName(data),
            0x20 if !data.is_empty() => MetaMessage::MidiChannel(u4::new(data[0])),
            0x21 if !data.is_empty() => MetaMessage::MidiPort(u7::new(data[0])),
            0x2F => MetaMessage::EndOfTrack,
            0x51 if data.len() >= 3 => {
                let mut raw = data;
                match u24::read(&mut raw) {
                    Ok(tempo) => MetaMessage::Tempo(tempo),
                    Err(_) => MetaMessage::Unknown(type_byte, data),
                }
            }
            0x54 => {
                let mut raw = data;
                match SmpteTime::read(&mut raw) {
                    Ok(time) => MetaMessage::SmpteOffset(time),
                    Err(_) => MetaMessage::Unknown(type_byte, data),
                }
            }
            0x58 if data.len() >= 4 => MetaMessage::TimeSignature(TimeSignature {
                numerator: data[0],
                denominator_pow2: data[1],
                clocks_per_click: data[2],
                thirty_seconds_per_quarter: data[3],
            }),
            0x59 if data.len() >= 2 => MetaMessage::KeySignature(KeySignature {
                sharps: data[0] as i8,
                minor: data[1] != 0,
            }),
            0x7F => MetaMessage::SequencerSpecific(data),
            _ => MetaMessage::Unknown(type_byte, data),
        }
    }

    /// The meta type byte of this event.
    pub fn type_byte(&self) -> u8 {
        use MetaMessage::*;
        match self {
            TrackNumber(_) => 0x00,
            Text(_) => 0x01,
            Copyright(_) => 0x02,
            TrackName(_) => 0x03,
            InstrumentName(_) => 0x04,
            Lyric(_) => 0x05,
            Marker(_) => 0x06,
            CuePoint(_) => 0x07,
            ProgramName(_) => 0x08,
            DeviceName(_) => 0x09,
            MidiChannel(_) => 0x20,
            MidiPort(_) => 0x21,
            EndOfTrack => 0x2F,
            Tempo(_) => 0x51,
            SmpteOffset(_) => 0x54,
            TimeSignature(_) => 0x58,
            KeySignature(_) => 0x59,
            SequencerSpecific(_) => 0x7F,
            Unknown(type_byte, _) => *type_byte,
        }
    }

    /// Write the whole meta event, from the `0xFF` status byte to the end of its payload.
    pub fn write<W: Write>(&self, out: &mut W) -> IoResult<W> {
        let mut buf = [0; 5];
        let payload: &[u8] = match *self {
            MetaMessage::TrackNumber(None) | MetaMessage::EndOfTrack => &[],
            MetaMessage::TrackNumber(Some(num)) => {
                buf[..2].copy_from_slice(&num.to_be_bytes());
                &buf[..2]
            }
            MetaMessage::Text(data)
            | MetaMessage::Copyright(data)
            | MetaMessage::TrackName(data)
            | MetaMessage::InstrumentName(data)
            | MetaMessage::Lyric(data)
            | MetaMessage::Marker(data)
            | MetaMessage::CuePoint(data)
            | MetaMessage::ProgramName(data)
            | MetaMessage::DeviceName(data)
            | MetaMessage::SequencerSpecific(data)
            | MetaMessage::Unknown(_, data) => data,
            MetaMessage::MidiChannel(chan) => {
                buf[0] = chan.as_int();
                &buf[..1]
            }
            MetaMessage::MidiPort(port) => {
                buf[0] = port.as_int();
                &buf[..1]
            }
            MetaMessage::Tempo(tempo) => {
                buf[..3].copy_from_slice(&tempo.as_int().to_be_bytes()[1..]);
                &buf[..3]
            }
            MetaMessage::SmpteOffset(time) => {
                buf = time.encode();
                &buf[..]
            }
            MetaMessage::TimeSignature(sig) => {
                buf[..4].copy_from_slice(&[
                    sig.numerator,
                    sig.denominator_pow2,
                    sig.clocks_per_click,
                    sig.thirty_seconds_per_quarter,
                ]);
                &buf[..4]
            }
            MetaMessage::KeySignature(key) => {
                buf[..2].copy_from_slice(&[key.sharps as u8, key.minor as u8]);
                &buf[..2]
            }
        };
        out.write_all(&[0xFF, self.type_byte()])?;
        write_varlen_slice(payload, out)
    }
}

/// A time signature, as carried by the `0x58` meta event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TimeSignature {
    /// Beats per measure.
    pub numerator: u8,
    /// The beat unit, as a power of two (`2` means a quarter note).
    pub denominator_pow2: u8,
    /// MIDI clocks per metronome click.
    pub clocks_per_click: u8,
    /// Notated 32nd notes in a MIDI quarter note (24 MIDI clocks).
    pub thirty_seconds_per_quarter: u8,
}
impl TimeSignature {
    /// Common time, 4/4.
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator_pow2: 2,
        clocks_per_click: 24,
        thirty_seconds_per_quarter: 8,
    };

    /// The beat unit as a plain note value (4 for quarter notes, 8 for eighths...).
    ///
    /// Saturates for absurd exponents.
    #[inline]
    pub fn denominator(&self) -> u32 {
        1u32.checked_shl(self.denominator_pow2 as u32)
            .unwrap_or(u32::MAX)
    }

    /// Length of one beat in ticks, given the file's ticks per quarter note.
    pub fn ticks_per_beat(&self, ppqn: u16) -> u64 {
        //A quarter note is 4 / denominator beats long
        (ppqn as u64 * 4 / self.denominator() as u64).max(1)
    }
}
impl Default for TimeSignature {
    fn default() -> TimeSignature {
        TimeSignature::COMMON
    }
}

/// A key signature, as carried by the `0x59` meta event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct KeySignature {
    /// Amount of sharps if positive, amount of flats if negative.
    pub sharps: i8,
    pub minor: bool,
}
impl KeySignature {
    /// The name of the major key with this many accidentals, such as `"Eb"` or `"F#"`.
    ///
    /// Returns `None` for more than 7 sharps or flats.
    pub fn name(&self) -> Option<&'static str> {
        crate::gm::key_signature_name(self.sharps)
    }
}
