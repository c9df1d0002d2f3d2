//! The live input path: decoding, filtering and queueing for the recorder.
//!
//! Everything here runs inside the MIDI input callback, so it never allocates, locks or logs.

use crate::{
    event::{MidiMessage, RawMidiEvent, Source},
    prelude::*,
    ring::Producer,
    stream::MidiDecoder,
};

/// Rewrites or drops incoming channel messages according to the host settings.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct InputFilter {
    /// Force every channel message onto this channel. `None` leaves channels untouched.
    pub channel: Option<u4>,
    /// Lowest key that gets through, before transposing.
    pub low: u7,
    /// Highest key that gets through, before transposing.
    pub high: u7,
    /// Semitones added to every key.
    pub transpose: i8,
}
impl Default for InputFilter {
    fn default() -> InputFilter {
        InputFilter {
            channel: None,
            low: u7::new(0),
            high: u7::max_value(),
            transpose: 0,
        }
    }
}
impl InputFilter {
    /// Filter a single event.
    ///
    /// Returns `None` if the event is a note outside the key range, or a note that would be
    /// transposed out of the MIDI key range.
    /// Messages other than channel messages pass through untouched.
    pub fn apply(&self, ev: RawMidiEvent) -> Option<RawMidiEvent> {
        let (channel, message) = match ev.message() {
            Some(msg) => msg,
            None => return Some(ev),
        };
        let channel = self.channel.unwrap_or(channel);
        let message = match message.key() {
            Some(key) => {
                if key < self.low || key > self.high {
                    return None;
                }
                let moved = key.as_int() as i16 + self.transpose as i16;
                let moved = u7::try_from(u8::try_from(moved).ok()?)?;
                message.with_key(moved)
            }
            None => message,
        };
        Some(RawMidiEvent::channel_message(
            ev.timestamp(),
            ev.source(),
            channel,
            message,
        ))
    }

    /// Filter a typed channel message.
    pub fn apply_message(&self, channel: u4, message: MidiMessage) -> Option<(u4, MidiMessage)> {
        let ev = RawMidiEvent::channel_message(0, Source::Input, channel, message);
        self.apply(ev).and_then(|ev| ev.message())
    }

    /// Whether this filter lets every event through unchanged.
    pub fn is_identity(&self) -> bool {
        *self == InputFilter::default()
    }
}

/// Counters kept by [`LiveInput`](struct.LiveInput.html), since the input callback cannot log.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct LiveInputStats {
    /// Complete messages decoded.
    pub received: u64,
    /// Messages rejected by the filter.
    pub filtered: u64,
    /// Malformed byte sequences found by the decoder.
    pub malformed: u64,
    /// Messages lost because the record queue was full.
    pub dropped: u64,
}

/// The body of the MIDI input callback: raw bytes in, filtered events into the record queue.
#[derive(Debug)]
pub struct LiveInput {
    decoder: MidiDecoder,
    filter: InputFilter,
    producer: Producer<RawMidiEvent>,
    recording: bool,
    stats: LiveInputStats,
}
impl LiveInput {
    pub fn new(decoder: MidiDecoder, filter: InputFilter, producer: Producer<RawMidiEvent>) -> LiveInput {
        LiveInput {
            decoder,
            filter,
            producer,
            recording: false,
            stats: LiveInputStats::default(),
        }
    }

    #[inline]
    pub fn filter(&self) -> &InputFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: InputFilter) {
        self.filter = filter;
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether filtered events go into the record queue.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    #[inline]
    pub fn stats(&self) -> LiveInputStats {
        self.stats
    }

    /// Decode a packet of raw input and queue the filtered events for recording.
    pub fn receive(&mut self, timestamp: u64, bytes: &[u8]) {
        self.receive_with(timestamp, bytes, |_| {})
    }

    /// Like `receive`, also handing every filtered event to `thru`, usually to play it on the
    /// synth right away.
    pub fn receive_with(
        &mut self,
        timestamp: u64,
        bytes: &[u8],
        mut thru: impl FnMut(&RawMidiEvent),
    ) {
        let LiveInput {
            decoder,
            filter,
            producer,
            recording,
            stats,
        } = self;
        decoder.feed(timestamp, bytes, |ev| match ev {
            Ok(ev) => {
                stats.received += 1;
                match filter.apply(ev) {
                    Some(ev) => {
                        thru(&ev);
                        if *recording && !producer.try_push(ev) {
                            stats.dropped += 1;
                        }
                    }
                    None => stats.filtered += 1,
                }
            }
            Err(_) => stats.malformed += 1,
        });
    }
}
