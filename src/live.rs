//! Typed view of "live" MIDI messages, as they travel over a MIDI cable or through an OS MIDI
//! API, in contrast with the events stored in a `.mid` file.
//!
//! [`LiveEvent`](enum.LiveEvent.html) differs from
//! [`TrackEventKind`](../enum.TrackEventKind.html) in subtle ways: System Realtime and System
//! Common messages only exist on the wire, while meta events and escapes only exist in files.

use crate::{event::MidiMessage, prelude::*};

/// A decoded live message, borrowing its variable-length data from a
/// [`RawMidiEvent`](struct.RawMidiEvent.html).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum LiveEvent<'a> {
    /// A MIDI message associated with a channel, carrying musical data.
    ///
    /// Status byte in the range `0x80 ..= 0xEF`.
    Midi {
        /// The MIDI channel that this message is associated with.
        channel: u4,
        /// The MIDI message type and associated data.
        message: MidiMessage,
    },
    /// A System Common message, including System Exclusive.
    ///
    /// Status byte in the range `0xF0 ..= 0xF7`.
    Common(SystemCommon<'a>),
    /// A one-byte System Realtime message.
    ///
    /// Status byte in the range `0xF8 ..= 0xFF`.
    Realtime(SystemRealtime),
}
impl<'a> LiveEvent<'a> {
    pub(crate) fn read(status: u8, data: &'a [u8]) -> StdResult<LiveEvent<'a>, &'static ErrorKind> {
        match status {
            0x80..=0xEF => {
                let data = MidiMessage::get_data_u7(status, data)?;
                let (channel, message) = MidiMessage::read(status, data);
                Ok(LiveEvent::Midi { channel, message })
            }
            0xF8..=0xFF => Ok(LiveEvent::Realtime(SystemRealtime::new(status))),
            0xF0..=0xF7 => Ok(LiveEvent::Common(SystemCommon::read(status, data)?)),
            _ => Err(err_malformed!("expected a status byte")),
        }
    }
}

/// Messages that only occur in live MIDI connections, and can occur at ANY time, even in between
/// the data bytes of other messages.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum SystemRealtime {
    /// Sent 24 times per quarter note when synchronizing to a clock.
    TimingClock,
    Start,
    Continue,
    Stop,
    /// Once one of these messages is transmitted, a message should arrive every 300ms or else the
    /// connection is considered broken.
    ActiveSensing,
    Reset,
    Undefined(u8),
}
impl SystemRealtime {
    pub fn new(status: u8) -> SystemRealtime {
        use SystemRealtime::*;
        match status {
            0xF8 => TimingClock,
            0xFA => Start,
            0xFB => Continue,
            0xFC => Stop,
            0xFE => ActiveSensing,
            0xFF => Reset,
            _ => Undefined(status),
        }
    }

    pub fn encode(self) -> u8 {
        use SystemRealtime::*;
        match self {
            TimingClock => 0xF8,
            Start => 0xFA,
            Continue => 0xFB,
            Stop => 0xFC,
            ActiveSensing => 0xFE,
            Reset => 0xFF,
            Undefined(byte) => byte,
        }
    }
}

/// A "system common" message, as defined by the MIDI standard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum SystemCommon<'a> {
    /// A System Exclusive message.
    /// The data does not include the leading `F0` or the closing `F7`.
    SysEx(&'a [u8]),
    MidiTimeCodeQuarterFrame(MtcQuarterFrameMessage, u4),
    /// The number of MIDI beats (6 x MIDI clocks) that have elapsed since the start of the
    /// sequence.
    SongPosition(u14),
    SongSelect(u7),
    TuneRequest,
    /// An undefined System Common message (`0xF4`, `0xF5`), with arbitrary data bytes.
    Undefined(u8, &'a [u8]),
}
impl<'a> SystemCommon<'a> {
    fn read(status: u8, data: &'a [u8]) -> StdResult<SystemCommon<'a>, &'static ErrorKind> {
        let ev = match status {
            0xF0 => SystemCommon::SysEx(data),
            0xF1 if !data.is_empty() => SystemCommon::MidiTimeCodeQuarterFrame(
                MtcQuarterFrameMessage::from_code(data[0] >> 4 & 0x7),
                u4::new(data[0]),
            ),
            0xF2 if data.len() >= 2 => SystemCommon::SongPosition(u14::new(
                (data[0] as u16 & 0x7F) | ((data[1] as u16 & 0x7F) << 7),
            )),
            0xF3 if !data.is_empty() => SystemCommon::SongSelect(u7::new(data[0])),
            0xF6 => SystemCommon::TuneRequest,
            0xF4 | 0xF5 => SystemCommon::Undefined(status, data),
            0xF1..=0xF3 => bail!(err_malformed!("truncated system common message")),
            //Including a stray F7 end-of-exclusive
            _ => bail!(err_malformed!("invalid system common status")),
        };
        Ok(ev)
    }
}

/// The piece of timecode carried by an MTC quarter frame message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MtcQuarterFrameMessage {
    FramesLow,
    FramesHigh,
    SecondsLow,
    SecondsHigh,
    MinutesLow,
    MinutesHigh,
    HoursLow,
    HoursHigh,
}
impl MtcQuarterFrameMessage {
    fn from_code(code: u8) -> MtcQuarterFrameMessage {
        use MtcQuarterFrameMessage::*;
        match code {
            0 => FramesLow,
            1 => FramesHigh,
            2 => SecondsLow,
            3 => SecondsHigh,
            4 => MinutesLow,
            5 => MinutesHigh,
            6 => HoursLow,
            _ => HoursHigh,
        }
    }
}
