//! Decoding of raw, undelimited MIDI byte streams, as received from a MIDI input port.
//!
//! OS APIs hand over incoming MIDI in packets that are not guaranteed to align with message
//! boundaries, so the [`MidiDecoder`](struct.MidiDecoder.html) keeps its state between calls to
//! `feed`: a message split across two packets is emitted once the second packet arrives.
//!
//! Handles all of the quirks specific to MIDI streams, including running status and System
//! Realtime messages embedded in the middle of another message.

use crate::{
    event::{data_len, RawMidiEvent, Source},
    prelude::*,
};

/// Where the decoder is in the middle of a message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum DecoderState {
    /// No message in progress and no running status: only a status byte is acceptable.
    AwaitingStatus,
    /// A status byte was read, waiting for the first data byte.
    CollectingData1,
    /// Waiting for the second data byte.
    CollectingData2,
    /// Inside a System Exclusive message, waiting for `0xF7`.
    CollectingVariableLength,
    /// No message in progress, but a data byte will start a new message with the cached
    /// running status.
    AwaitingRunningStatus,
}

/// A streaming raw MIDI decoder.
///
/// This decoder takes raw MIDI bytes, *not* `.mid` files.
/// It never allocates and does a bounded amount of work per byte, so it can be fed from a
/// realtime MIDI callback.
#[derive(Clone, Debug)]
pub struct MidiDecoder {
    state: DecoderState,
    running_status: Option<u8>,
    /// The message being assembled. Its status is the status of the message in progress.
    pending: RawMidiEvent,
    /// Set while skipping the rest of an oversized System Exclusive message.
    discarding: bool,
}
impl MidiDecoder {
    /// Create a fresh decoder, tagging decoded events with the given source.
    pub fn new(source: Source) -> MidiDecoder {
        MidiDecoder {
            state: DecoderState::AwaitingStatus,
            running_status: None,
            pending: RawMidiEvent::status_only(0, source, 0x80),
            discarding: false,
        }
    }

    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// The cached status that a data byte would reuse, if any.
    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Forget any partial message and the running status, for example after reconnecting the
    /// input port.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingStatus;
        self.running_status = None;
        self.discarding = false;
        self.pending.clear_data();
    }

    /// Feeds a chunk of bytes to the decoder, calling `handle_ev` for every complete message and
    /// for every malformed sequence found.
    ///
    /// All events are stamped with `timestamp`, the arrival time of the chunk.
    ///
    /// Calling `feed` with many small slices is equivalent to calling `feed` with one large
    /// concatenation of them all.
    /// Reaching the end of a chunk in the middle of a message is not an error: the message is
    /// completed by the next chunk.
    pub fn feed(
        &mut self,
        timestamp: u64,
        bytes: &[u8],
        mut handle_ev: impl FnMut(StdResult<RawMidiEvent, &'static ErrorKind>),
    ) {
        for &byte in bytes {
            self.feed_byte(timestamp, byte, &mut handle_ev);
        }
    }

    #[inline]
    fn feed_byte(
        &mut self,
        timestamp: u64,
        byte: u8,
        handle_ev: &mut impl FnMut(StdResult<RawMidiEvent, &'static ErrorKind>),
    ) {
        match byte {
            0xF8..=0xFF => {
                // System Realtime
                // These single-byte messages are invisible to everything else: they don't alter
                // any decoder state and can appear even in between the data bytes of other
                // messages.
                let source = self.pending.source();
                handle_ev(Ok(RawMidiEvent::status_only(timestamp, source, byte)));
            }
            0xF7 => {
                // End of exclusive
                self.running_status = None;
                if self.state == DecoderState::CollectingVariableLength {
                    if !self.discarding {
                        handle_ev(Ok(self.pending.with_timestamp(timestamp)));
                    }
                    self.discarding = false;
                } else {
                    handle_ev(Err(err_malformed!("end of exclusive without a start")));
                }
                self.state = DecoderState::AwaitingStatus;
            }
            0x80..=0xF6 => {
                // Channel/System Common
                self.interrupt(handle_ev);
                self.running_status = if byte < 0xF0 { Some(byte) } else { None };
                self.start(timestamp, byte, handle_ev);
            }
            _ => self.data_byte(timestamp, byte, handle_ev),
        }
    }

    /// Starts a new message with the given status.
    fn start(
        &mut self,
        timestamp: u64,
        status: u8,
        handle_ev: &mut impl FnMut(StdResult<RawMidiEvent, &'static ErrorKind>),
    ) {
        self.pending = RawMidiEvent::status_only(timestamp, self.pending.source(), status);
        if status == 0xF0 {
            self.state = DecoderState::CollectingVariableLength;
            self.discarding = false;
        } else if data_len(status) == 0 {
            //Tune request and undefined system common messages are complete right away
            handle_ev(Ok(self.pending));
            self.state = self.idle_state();
        } else {
            self.state = DecoderState::CollectingData1;
        }
    }

    fn data_byte(
        &mut self,
        timestamp: u64,
        byte: u8,
        handle_ev: &mut impl FnMut(StdResult<RawMidiEvent, &'static ErrorKind>),
    ) {
        match self.state {
            DecoderState::AwaitingStatus => {
                handle_ev(Err(err_malformed!("data byte without a status")));
            }
            DecoderState::AwaitingRunningStatus => {
                // Running status: reuse the cached status for a new message
                if let Some(status) = self.running_status {
                    self.start(timestamp, status, handle_ev);
                    self.data_byte(timestamp, byte, handle_ev);
                } else {
                    self.state = DecoderState::AwaitingStatus;
                    handle_ev(Err(err_malformed!("data byte without a status")));
                }
            }
            DecoderState::CollectingData1 | DecoderState::CollectingData2 => {
                self.pending.push_data(byte);
                if self.pending.data().len() >= data_len(self.pending.status()) {
                    // Messages are emitted as soon as their data quota is fulfilled
                    handle_ev(Ok(self.pending.with_timestamp(timestamp)));
                    self.state = self.idle_state();
                } else {
                    self.state = DecoderState::CollectingData2;
                }
            }
            DecoderState::CollectingVariableLength => {
                if !self.discarding && !self.pending.push_data(byte) {
                    //Oversized exclusive, drop it entirely
                    self.discarding = true;
                    handle_ev(Err(err_malformed!("system exclusive message too long")));
                }
            }
        }
    }

    /// A status byte arrived: report the message in progress, if any, as cut short.
    fn interrupt(&mut self, handle_ev: &mut impl FnMut(StdResult<RawMidiEvent, &'static ErrorKind>)) {
        match self.state {
            DecoderState::CollectingData1 | DecoderState::CollectingData2 => {
                handle_ev(Err(err_malformed!("message interrupted by a status byte")));
            }
            DecoderState::CollectingVariableLength => {
                self.discarding = false;
                handle_ev(Err(err_malformed!("unterminated system exclusive message")));
            }
            DecoderState::AwaitingStatus | DecoderState::AwaitingRunningStatus => {}
        }
        self.state = DecoderState::AwaitingStatus;
    }

    #[inline]
    fn idle_state(&self) -> DecoderState {
        if self.running_status.is_some() {
            DecoderState::AwaitingRunningStatus
        } else {
            DecoderState::AwaitingStatus
        }
    }
}

/// Decode a self-contained buffer of raw MIDI bytes into events.
///
/// Events are tagged as [`Source::Input`](enum.Source.html) with a timestamp of zero.
/// Fails on the first malformed message.
/// A message cut short by the end of the buffer is malformed.
/// This allocates, so it is meant for application-side use; realtime code should keep a
/// [`MidiDecoder`](struct.MidiDecoder.html) around instead.
pub fn decode(bytes: &[u8]) -> Result<Vec<RawMidiEvent>> {
    let mut decoder = MidiDecoder::new(Source::Input);
    let mut events = Vec::new();
    let mut first_err = None;
    decoder.feed(0, bytes, |ev| match ev {
        Ok(ev) if first_err.is_none() => events.push(ev),
        Ok(_) => {}
        Err(err) => {
            first_err.get_or_insert(err);
        }
    });
    if first_err.is_none()
        && matches!(
            decoder.state(),
            DecoderState::CollectingData1
                | DecoderState::CollectingData2
                | DecoderState::CollectingVariableLength
        )
    {
        first_err = Some(err_malformed!("truncated message"));
    }
    match first_err {
        Some(err) => Err(err.into()),
        None => Ok(events),
    }
}
