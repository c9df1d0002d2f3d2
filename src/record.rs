//! Capturing live input into a Standard Midi File.

use crate::{
    event::RawMidiEvent,
    gm::{DEFAULT_BPM, DEFAULT_PPQN},
    meta::MetaMessage,
    prelude::*,
    primitive::{write_vlq, Format},
    ring::Consumer,
};
use log::{debug, warn};

/// Collects events from the record queue, in the application context.
///
/// Event timestamps are taken to be microseconds.
#[derive(Debug)]
pub struct Recorder {
    consumer: Consumer<RawMidiEvent>,
    events: Vec<RawMidiEvent>,
    /// Time of tick zero. Defaults to the first recorded event.
    origin: Option<u64>,
    seen_overflow: u64,
    ppqn: u16,
    bpm: u16,
}
impl Recorder {
    pub fn new(consumer: Consumer<RawMidiEvent>) -> Recorder {
        let seen_overflow = consumer.overflow_count();
        Recorder {
            consumer,
            events: Vec::new(),
            origin: None,
            seen_overflow,
            ppqn: DEFAULT_PPQN,
            bpm: DEFAULT_BPM,
        }
    }

    /// Set the timing used by `write_smf`.
    pub fn set_timing(&mut self, ppqn: u16, bpm: u16) {
        self.ppqn = ppqn.max(1);
        self.bpm = bpm.max(1);
    }

    /// Start counting time from `now` instead of from the first event.
    pub fn start(&mut self, now: u64) {
        self.origin = Some(now);
    }

    /// Move every queued event into the recording.
    ///
    /// Returns how many events were taken.
    pub fn poll(&mut self) -> usize {
        let before = self.events.len();
        while let Some(ev) = self.consumer.try_pop() {
            self.events.push(ev);
        }
        let overflow = self.consumer.overflow_count();
        if overflow > self.seen_overflow {
            warn!(
                "record buffer full, {} events lost",
                overflow - self.seen_overflow
            );
            self.seen_overflow = overflow;
        }
        self.events.len() - before
    }

    #[inline]
    pub fn events(&self) -> &[RawMidiEvent] {
        &self.events
    }

    /// Forget everything recorded so far, including any queued events.
    pub fn clear(&mut self) {
        self.consumer.clear();
        self.events.clear();
        self.origin = None;
        self.seen_overflow = self.consumer.overflow_count();
        debug!("recording cleared");
    }

    /// Encode the recording as the payload of an `MTrk` chunk.
    ///
    /// The track starts with a tempo event for `bpm` and ends with End-of-Track.
    /// Channel messages and System Exclusive messages are kept; other system messages have no
    /// place in a file and are skipped.
    pub fn to_track(&self, ppqn: u16, bpm: u16) -> StdResult<Vec<u8>, &'static str> {
        let mut out = Vec::with_capacity(self.events.len() * 4 + 16);
        self.encode_track(ppqn, bpm, &mut out)?;
        Ok(out)
    }

    fn encode_track<W: Write>(&self, ppqn: u16, bpm: u16, out: &mut W) -> IoResult<W> {
        let micros_per_quarter = 60_000_000 / bpm.max(1) as u64;
        let origin = self
            .origin
            .or_else(|| self.events.first().map(|ev| ev.timestamp()))
            .unwrap_or(0);
        let to_tick = |timestamp: u64| {
            let elapsed = timestamp.saturating_sub(origin) as u128;
            (elapsed * ppqn.max(1) as u128 / micros_per_quarter as u128) as u64
        };

        let tempo = u24::try_from(micros_per_quarter as u32)
            .ok_or_else(|| W::invalid_input("tempo too slow"))?;
        write_vlq(0, out)?;
        MetaMessage::Tempo(tempo).write(out)?;
        let mut last_tick = 0;
        let mut running_status = None;
        for ev in &self.events {
            if !ev.is_channel() && !ev.is_sysex() {
                continue;
            }
            //Timestamps should never go backwards, but if they do keep the events in order
            let tick = to_tick(ev.timestamp()).max(last_tick);
            let delta = u32::try_from(tick - last_tick)
                .map_err(|_| W::invalid_input("gap between events too long"))?;
            write_vlq(delta, out)?;
            last_tick = tick;
            if ev.is_sysex() {
                running_status = None;
                out.write_all(&[0xF0])?;
                write_vlq(ev.data().len() as u32 + 1, out)?;
                out.write_all(ev.data())?;
                out.write_all(&[0xF7])?;
            } else {
                ev.write_with_running_status(&mut running_status, out)?;
            }
        }
        write_vlq(0, out)?;
        MetaMessage::EndOfTrack.write(out)
    }

    /// Write the recording as a single-track (format 0) Standard Midi File.
    pub fn write_smf<W: Write>(&self, out: &mut W) -> IoResult<W> {
        let track = self.to_track(self.ppqn, self.bpm).map_err(W::invalid_input)?;
        let len =
            u32::try_from(track.len()).map_err(|_| W::invalid_input("midi chunk size exceeds 32 bit range"))?;
        out.write_all(b"MThd")?;
        out.write_all(&6u32.to_be_bytes())?;
        out.write_all(&Format::SingleTrack.encode())?;
        out.write_all(&1u16.to_be_bytes())?;
        out.write_all(&self.ppqn.to_be_bytes())?;
        out.write_all(b"MTrk")?;
        out.write_all(&len.to_be_bytes())?;
        out.write_all(&track)
    }

    /// Save the recording to a `.mid` file.
    #[cfg(feature = "std")]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = crate::io::IoWrap(io::BufWriter::new(File::create(path.as_ref())?));
        self.write_smf(&mut out)?;
        io::Write::flush(&mut out.0)?;
        debug!("saved {} recorded events", self.events.len());
        Ok(())
    }
}
