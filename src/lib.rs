//! # Overview
//!
//! `synthhost-midi` is the MIDI core of a software synthesizer host.
//! It covers the three places where raw MIDI bytes meet the host:
//!
//! - Live input: a realtime-safe byte-stream decoder that turns arbitrarily chunked MIDI bytes
//!   into [`RawMidiEvent`](struct.RawMidiEvent.html)s, honoring running status and System
//!   Realtime messages interleaved anywhere in the stream.
//! - Standard Midi Files: a zero-copy reader for `.mid` files, with a lazy, restartable
//!   [`TrackReader`](struct.TrackReader.html) and a tempo map for converting ticks to wall-clock
//!   time.
//! - The realtime boundary: fixed-capacity single-producer/single-consumer ring buffers carrying
//!   events from the input callback to the application (recording) and from the application to
//!   the output callback (playback).
//!
//! Decoding a live stream looks like this:
//!
//! ```rust
//! use synthhost_midi::{MidiDecoder, Source};
//!
//! let mut decoder = MidiDecoder::new(Source::Input);
//! let mut notes = 0;
//! // Note On, then a second Note On using running status
//! decoder.feed(0, &[0x90, 0x40, 0x7F, 0x41, 0x7F], |ev| {
//!     if let Ok(ev) = ev {
//!         assert_eq!(ev.status(), 0x90);
//!         notes += 1;
//!     }
//! });
//! assert_eq!(notes, 2);
//! ```
//!
//! Reading a file is done in a separate step from loading its bytes, since parsed events borrow
//! from the raw buffer:
//!
//! ```rust,no_run
//! # #[cfg(feature = "std")] {
//! use std::fs;
//! use synthhost_midi::Smf;
//!
//! let bytes = fs::read("song.mid").unwrap();
//! let smf = Smf::parse(&bytes).unwrap();
//! for (i, track) in smf.tracks.iter().enumerate() {
//!     println!("track {} has {} events", i, track.len());
//! }
//! # }
//! ```
//!
//! # Realtime rules
//!
//! Everything that may run inside an audio or MIDI callback ([`MidiDecoder::feed`],
//! [`InputFilter::apply`], [`LiveInput::receive`], [`Producer::try_push`],
//! [`Consumer::pop_due`]) is bounded, never allocates, never locks and never logs.
//! Errors on these paths are `&'static ErrorKind` values rather than [`Error`]s, since the latter
//! may box a context chain in debug builds.
//!
//! # About features
//!
//! - `std` (default): writing SMF files to `std::io` sinks, `Smf::save`, and the
//!   `std::error::Error` implementation. Without it the crate is `no_std + alloc`.
//! - `parallel` (default): parse the tracks of large files on the `rayon` thread pool.
//! - `serde`: serialization for [`HostSettings`](struct.HostSettings.html).
//!
//! [`MidiDecoder::feed`]: struct.MidiDecoder.html#method.feed
//! [`InputFilter::apply`]: struct.InputFilter.html#method.apply
//! [`LiveInput::receive`]: struct.LiveInput.html#method.receive
//! [`Producer::try_push`]: struct.Producer.html#method.try_push
//! [`Consumer::pop_due`]: struct.Consumer.html#method.pop_due
//! [`Error`]: struct.Error.html

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// All of the errors this crate produces.
#[macro_use]
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{ErrorKind, Result, ResultExt, StdResult},
        io::{IoResult, Write},
        primitive::{u14, u24, u28, u4, u7, IntRead, SplitChecked},
    };
    pub(crate) use alloc::{boxed::Box, vec, vec::Vec};
    pub(crate) use core::{cmp, convert::TryFrom, fmt, mem, ops};
    #[cfg(feature = "std")]
    pub(crate) use std::{fs::File, io, path::Path};

    pub(crate) fn bit_range<T>(val: T, range: ops::Range<u32>) -> T
    where
        T: From<u8>
            + ops::Shr<u32, Output = T>
            + ops::Shl<u32, Output = T>
            + ops::Not<Output = T>
            + ops::BitAnd<Output = T>,
    {
        let mask = !((!T::from(0)) << (range.end - range.start));
        (val >> range.start) & mask
    }
}

mod event;
mod filter;
pub mod gm;
pub mod io;
mod live;
mod meta;
mod playback;
mod primitive;
mod record;
mod riff;
mod ring;
mod settings;
mod smf;
mod stream;
mod tempo;

pub use crate::{
    error::{Error, ErrorKind, Result},
    event::{MidiMessage, PitchBend, RawMidiEvent, Source, MIDI_DATA_SIZE},
    filter::{InputFilter, LiveInput, LiveInputStats},
    live::{LiveEvent, MtcQuarterFrameMessage, SystemCommon, SystemRealtime},
    meta::{KeySignature, MetaMessage, TimeSignature},
    playback::{all_notes_off, Sequencer, TransportState},
    primitive::{read_vlq, write_vlq, Format, Fps, SmpteTime},
    record::Recorder,
    ring::{
        play_buffer, record_buffer, Consumer, Producer, RingBuffer, PLAY_CAPACITY,
        RECORD_CAPACITY,
    },
    settings::HostSettings,
    smf::{parse, read_track, ChunkIter, Header, Smf, SmfEvent, Track, TrackEventKind, TrackIter, TrackReader},
    stream::{decode, DecoderState, MidiDecoder},
    tempo::{TempoEntry, TempoMap, TimeSignatureMap, DEFAULT_TEMPO},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u14, u15, u24, u28, u4, u7};
}

#[cfg(test)]
mod test;
