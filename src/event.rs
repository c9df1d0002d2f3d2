//! The realtime event type and the typed view of channel voice messages.

use crate::{live::LiveEvent, prelude::*};

/// Maximum amount of data bytes a `RawMidiEvent` can carry.
///
/// System Exclusive messages with a longer payload are rejected by the decoder.
pub const MIDI_DATA_SIZE: usize = 256;

/// Where an event came from.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Source {
    /// Received from a MIDI input port.
    Input,
    /// Produced by the host, headed to the synth or a MIDI output port.
    Output,
}
impl Source {
    /// The numeric code used by the host's event log (`1` for input, `2` for output).
    #[inline]
    pub fn as_code(self) -> u8 {
        match self {
            Source::Input => 1,
            Source::Output => 2,
        }
    }
}

/// A complete MIDI message as it travels across the realtime boundary.
///
/// This is a plain value type: the data bytes are stored inline, so it can be copied into and out
/// of a ring buffer without allocating.
/// For System Exclusive messages the status is `0xF0` and the data holds the payload, without the
/// leading `0xF0` and the closing `0xF7`.
///
/// Use [`message`](#method.message) or [`kind`](#method.kind) to get a typed view.
#[derive(Copy, Clone)]
pub struct RawMidiEvent {
    timestamp: u64,
    source: Source,
    status: u8,
    len: u16,
    data: [u8; MIDI_DATA_SIZE],
}
impl RawMidiEvent {
    /// Build an event from its status byte and data bytes.
    ///
    /// Returns `None` if `status` is not a status byte (top bit clear) or if there are more than
    /// `MIDI_DATA_SIZE` data bytes.
    pub fn new(timestamp: u64, source: Source, status: u8, data: &[u8]) -> Option<RawMidiEvent> {
        if status < 0x80 || data.len() > MIDI_DATA_SIZE {
            return None;
        }
        let mut ev = RawMidiEvent::status_only(timestamp, source, status);
        ev.data[..data.len()].copy_from_slice(data);
        ev.len = data.len() as u16;
        Some(ev)
    }

    /// Build a channel voice message event.
    pub fn channel_message(
        timestamp: u64,
        source: Source,
        channel: u4,
        message: MidiMessage,
    ) -> RawMidiEvent {
        let mut ev = RawMidiEvent::status_only(
            timestamp,
            source,
            message.status_nibble() << 4 | channel.as_int(),
        );
        let (data, len) = message.encode_data();
        ev.data[..len].copy_from_slice(&data[..len]);
        ev.len = len as u16;
        ev
    }

    #[inline]
    pub(crate) fn status_only(timestamp: u64, source: Source, status: u8) -> RawMidiEvent {
        RawMidiEvent {
            timestamp,
            source,
            status,
            len: 0,
            data: [0; MIDI_DATA_SIZE],
        }
    }

    /// Append a data byte, failing if the event is full.
    #[inline]
    pub(crate) fn push_data(&mut self, byte: u8) -> bool {
        match self.data.get_mut(self.len as usize) {
            Some(slot) => {
                *slot = byte;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub(crate) fn clear_data(&mut self) {
        self.len = 0;
    }

    /// The time at which this event happened or should happen.
    ///
    /// Units are up to the producer: host time for live input, microseconds since playback start
    /// for scheduled output.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    pub fn source(&self) -> Source {
        self.source
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    /// The data bytes following the status byte.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// A copy of this event with a different timestamp.
    #[inline]
    pub fn with_timestamp(mut self, timestamp: u64) -> RawMidiEvent {
        self.timestamp = timestamp;
        self
    }

    /// A copy of this event with a different source.
    #[inline]
    pub fn with_source(mut self, source: Source) -> RawMidiEvent {
        self.source = source;
        self
    }

    /// The channel of a channel voice message.
    #[inline]
    pub fn channel(&self) -> Option<u4> {
        if self.is_channel() {
            Some(u4::new(self.status))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_channel(&self) -> bool {
        (0x80..=0xEF).contains(&self.status)
    }

    #[inline]
    pub fn is_sysex(&self) -> bool {
        self.status == 0xF0
    }

    /// Single-byte System Realtime messages (`0xF8 ..= 0xFF`).
    #[inline]
    pub fn is_realtime(&self) -> bool {
        self.status >= 0xF8
    }

    /// Typed view of a channel voice message.
    ///
    /// Returns `None` for any other kind of message, or if the data bytes are incomplete.
    pub fn message(&self) -> Option<(u4, MidiMessage)> {
        if !self.is_channel() {
            return None;
        }
        let data = MidiMessage::get_data_u7(self.status, self.data()).ok()?;
        Some(MidiMessage::read(self.status, data))
    }

    /// Typed view of any message.
    pub fn kind(&self) -> StdResult<LiveEvent<'_>, &'static ErrorKind> {
        LiveEvent::read(self.status, self.data())
    }

    /// Number of bytes this event takes on the wire without running status.
    pub fn wire_len(&self) -> usize {
        match self.status {
            0xF0 => self.len as usize + 2,
            _ => self.len as usize + 1,
        }
    }

    /// Write this event as raw MIDI bytes.
    pub fn write<W: Write>(&self, out: &mut W) -> IoResult<W> {
        self.write_with_running_status(&mut None, out)
    }

    /// Write this event as raw MIDI bytes, omitting the status byte if it matches the running
    /// status of the previous message.
    ///
    /// `running_status` should be shared between consecutive calls on the same output, and start
    /// as `None`.
    /// Realtime messages leave it untouched, other system messages clear it.
    pub fn write_with_running_status<W: Write>(
        &self,
        running_status: &mut Option<u8>,
        out: &mut W,
    ) -> IoResult<W> {
        match self.status {
            0x80..=0xEF => {
                if Some(self.status) != *running_status {
                    out.write_all(&[self.status])?;
                    *running_status = Some(self.status);
                }
                out.write_all(self.data())
            }
            0xF0 => {
                *running_status = None;
                out.write_all(&[0xF0])?;
                out.write_all(self.data())?;
                out.write_all(&[0xF7])
            }
            0xF8..=0xFF => out.write_all(&[self.status]),
            _ => {
                *running_status = None;
                out.write_all(&[self.status])?;
                out.write_all(self.data())
            }
        }
    }
}
impl PartialEq for RawMidiEvent {
    fn eq(&self, rhs: &RawMidiEvent) -> bool {
        self.timestamp == rhs.timestamp
            && self.source == rhs.source
            && self.status == rhs.status
            && self.data() == rhs.data()
    }
}
impl Eq for RawMidiEvent {}
impl core::hash::Hash for RawMidiEvent {
    fn hash<H: core::hash::Hasher>(&self, h: &mut H) {
        self.timestamp.hash(h);
        self.source.hash(h);
        self.status.hash(h);
        self.data().hash(h);
    }
}
impl fmt::Debug for RawMidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RawMidiEvent[{} {:?} {:02X}",
            self.timestamp, self.source, self.status
        )?;
        for byte in self.data() {
            write!(f, " {:02X}", byte)?;
        }
        write!(f, "]")
    }
}

/// How many data bytes follow a status byte, for fixed-length messages.
///
/// System Exclusive (`0xF0`) is variable-length and reports 0 here, as do bytes that are not a
/// status byte.
#[inline]
pub(crate) fn data_len(status: u8) -> usize {
    const CHANNEL_LEN: [u8; 8] = [2, 2, 2, 2, 1, 1, 2, 0];
    const SYSTEM_LEN: [u8; 16] = [0, 1, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    match status {
        0x00..=0x7F => 0,
        0x80..=0xEF => CHANNEL_LEN[(status >> 4 & 0x7) as usize] as usize,
        _ => SYSTEM_LEN[(status & 0xF) as usize] as usize,
    }
}

/// Represents a MIDI channel voice message, not including its channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MidiMessage {
    /// Stop playing a note.
    NoteOff {
        /// The MIDI key to stop playing.
        key: u7,
        /// The velocity with which to stop playing it.
        vel: u7,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to start playing.
        key: u7,
        /// The velocity (strength) with which to press it.
        ///
        /// Note that by convention a `NoteOn` message with a velocity of 0 is equivalent to a
        /// `NoteOff`.
        vel: u7,
    },
    /// Modify the velocity of a note after it has been played.
    Aftertouch { key: u7, vel: u7 },
    /// Modify the value of a MIDI controller.
    ///
    /// See [`gm::controller_name`](gm/fn.controller_name.html) for the meaning of each index.
    Controller { controller: u7, value: u7 },
    /// Change the program (also known as instrument) for a channel.
    ProgramChange { program: u7 },
    /// Change the pressure of a whole channel at once, without starting new notes.
    ChannelAftertouch { vel: u7 },
    /// Set the pitch bend value for the entire channel.
    PitchBend { bend: PitchBend },
}
impl MidiMessage {
    /// Get the data bytes out of a data slice, checking that they are all present.
    pub(crate) fn get_data_u7(status: u8, data: &[u8]) -> StdResult<[u7; 2], &'static ErrorKind> {
        let len = data_len(status);
        ensure!(data.len() >= len, err_malformed!("truncated channel message"));
        Ok(match len {
            1 => [u7::check_int(data[0])?, u7::new(0)],
            2 => [u7::check_int(data[0])?, u7::check_int(data[1])?],
            _ => [u7::new(0), u7::new(0)],
        })
    }

    /// Receives status byte and data bytes separately.
    ///
    /// `status` must be a channel voice status (`0x80 ..= 0xEF`).
    pub(crate) fn read(status: u8, data: [u7; 2]) -> (u4, MidiMessage) {
        let channel = u4::new(status);
        let msg = match status >> 4 {
            0x8 => MidiMessage::NoteOff {
                key: data[0],
                vel: data[1],
            },
            0x9 => MidiMessage::NoteOn {
                key: data[0],
                vel: data[1],
            },
            0xA => MidiMessage::Aftertouch {
                key: data[0],
                vel: data[1],
            },
            0xB => MidiMessage::Controller {
                controller: data[0],
                value: data[1],
            },
            0xC => MidiMessage::ProgramChange { program: data[0] },
            0xD => MidiMessage::ChannelAftertouch { vel: data[0] },
            _ => {
                //Little-endian, unlike the rest of SMF
                let lsb = data[0].as_int() as u16;
                let msb = data[1].as_int() as u16;
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::new(msb << 7 | lsb)),
                }
            }
        };
        (channel, msg)
    }

    /// Get the raw status nibble for this MIDI message type.
    pub(crate) fn status_nibble(&self) -> u8 {
        match self {
            MidiMessage::NoteOff { .. } => 0x8,
            MidiMessage::NoteOn { .. } => 0x9,
            MidiMessage::Aftertouch { .. } => 0xA,
            MidiMessage::Controller { .. } => 0xB,
            MidiMessage::ProgramChange { .. } => 0xC,
            MidiMessage::ChannelAftertouch { .. } => 0xD,
            MidiMessage::PitchBend { .. } => 0xE,
        }
    }

    /// The data bytes of this message, and how many of them are used.
    pub(crate) fn encode_data(&self) -> ([u8; 2], usize) {
        match *self {
            MidiMessage::NoteOff { key, vel }
            | MidiMessage::NoteOn { key, vel }
            | MidiMessage::Aftertouch { key, vel } => ([key.as_int(), vel.as_int()], 2),
            MidiMessage::Controller { controller, value } => {
                ([controller.as_int(), value.as_int()], 2)
            }
            MidiMessage::ProgramChange { program } => ([program.as_int(), 0], 1),
            MidiMessage::ChannelAftertouch { vel } => ([vel.as_int(), 0], 1),
            MidiMessage::PitchBend { bend } => {
                let raw = bend.0.as_int();
                ([(raw & 0x7F) as u8, (raw >> 7) as u8], 2)
            }
        }
    }

    /// The key of note-related messages (note on, note off, polyphonic aftertouch).
    #[inline]
    pub fn key(&self) -> Option<u7> {
        match *self {
            MidiMessage::NoteOff { key, .. }
            | MidiMessage::NoteOn { key, .. }
            | MidiMessage::Aftertouch { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Replace the key of a note-related message; other messages are returned unchanged.
    pub fn with_key(self, new_key: u7) -> MidiMessage {
        match self {
            MidiMessage::NoteOff { vel, .. } => MidiMessage::NoteOff { key: new_key, vel },
            MidiMessage::NoteOn { vel, .. } => MidiMessage::NoteOn { key: new_key, vel },
            MidiMessage::Aftertouch { vel, .. } => MidiMessage::Aftertouch { key: new_key, vel },
            other => other,
        }
    }

    /// Whether this message releases a note, including a zero-velocity `NoteOn`.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        match *self {
            MidiMessage::NoteOff { .. } => true,
            MidiMessage::NoteOn { vel, .. } => vel.as_int() == 0,
            _ => false,
        }
    }
}

/// The value of a pitch bend, represented as 14 bits.
///
/// A value of `0x0000` indicates full bend downwards.
/// A value of `0x2000` indicates no bend.
/// A value of `0x3FFF` indicates full bend upwards.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PitchBend(pub u14);
impl PitchBend {
    /// The middle value of `0x2000`, indicating no bend.
    #[inline]
    pub const fn mid_raw_value() -> PitchBend {
        PitchBend(u14::new(0x2000))
    }

    /// Create a `PitchBend` value from an int in the range `[-0x2000, 0x1FFF]`.
    ///
    /// Integers outside this range will be clamped.
    #[inline]
    pub fn from_int(int: i16) -> PitchBend {
        PitchBend(u14::new((int.max(-0x2000).min(0x1FFF) + 0x2000) as u16))
    }

    /// Returns an int in the range `[-0x2000, 0x1FFF]`.
    #[inline]
    pub fn as_int(self) -> i16 {
        self.0.as_int() as i16 - 0x2000
    }

    /// Returns an `f32` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f32(self) -> f32 {
        self.as_int() as f32 * (1.0 / 0x2000 as f32)
    }
}
