//! Playing back a Standard Midi File through the play queue.

use crate::{
    event::{MidiMessage, RawMidiEvent, Source},
    prelude::*,
    ring::Producer,
    smf::{Smf, SmfEvent},
    tempo::{track_offsets, TempoMap, TimeSignatureMap},
};
use alloc::collections::BinaryHeap;
use core::cmp::Reverse;
use log::{debug, info};

/// What the transport is doing.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Copy, Clone, Debug)]
struct Scheduled<'a> {
    /// Microseconds from the start of the song.
    micros: u64,
    event: SmfEvent<'a>,
}

/// Merge the tracks of a file into a single list in playback order, with absolute ticks.
///
/// Events at the same tick keep their track order.
fn merge_tracks<'a>(smf: &Smf<'a>) -> Vec<(u64, SmfEvent<'a>)> {
    let offsets = track_offsets(smf);
    let total = smf.tracks.iter().map(|track| track.len()).sum();
    let mut merged = Vec::with_capacity(total);
    let mut cursors = vec![0; smf.tracks.len()];
    let mut heap = BinaryHeap::with_capacity(smf.tracks.len());
    for (idx, track) in smf.tracks.iter().enumerate() {
        if let Some(ev) = track.events().first() {
            heap.push(Reverse((offsets[idx] + ev.time(), idx)));
        }
    }
    while let Some(Reverse((time, idx))) = heap.pop() {
        let events = smf.tracks[idx].events();
        merged.push((time, events[cursors[idx]]));
        cursors[idx] += 1;
        if let Some(next) = events.get(cursors[idx]) {
            heap.push(Reverse((offsets[idx] + next.time(), idx)));
        }
    }
    merged
}

/// Schedules the events of a file into the play queue, following the file's tempo map.
///
/// All times handed to the sequencer (`now`) are host microseconds, and the events it produces
/// are stamped with the host time at which they are due.
/// Parallel and single-track files play all tracks at once; sequential files play their tracks
/// one after the other.
#[derive(Clone, Debug)]
pub struct Sequencer<'a> {
    events: Vec<Scheduled<'a>>,
    tempo: TempoMap,
    signatures: TimeSignatureMap,
    state: TransportState,
    /// Index of the next event to schedule.
    cursor: usize,
    /// Host time at which the song started, as if it had never been paused.
    origin: u64,
    /// Song position while not playing.
    held: u64,
}
impl<'a> Sequencer<'a> {
    pub fn new(smf: &Smf<'a>) -> Sequencer<'a> {
        let tempo = TempoMap::from_smf(smf);
        let signatures = TimeSignatureMap::from_smf(smf);
        let events = merge_tracks(smf)
            .into_iter()
            .map(|(tick, event)| Scheduled {
                micros: tempo.ticks_to_micros(tick),
                event,
            })
            .collect::<Vec<_>>();
        info!(
            "sequencer ready: {} events, {:.1} bpm",
            events.len(),
            tempo.bpm_at(0)
        );
        Sequencer {
            events,
            tempo,
            signatures,
            state: TransportState::Stopped,
            cursor: 0,
            origin: 0,
            held: 0,
        }
    }

    /// Start or resume playback.
    pub fn play(&mut self, now: u64) {
        if self.state == TransportState::Playing {
            return;
        }
        self.origin = now.saturating_sub(self.held);
        self.state = TransportState::Playing;
        debug!("play from {}us", self.held);
    }

    /// Hold the song position.
    ///
    /// Events already handed to the play queue are not recalled. The output side must drop them
    /// with [`Consumer::clear`](struct.Consumer.html#method.clear) on the play queue and then send
    /// [`all_notes_off`](fn.all_notes_off.html), or they will still sound.
    pub fn pause(&mut self, now: u64) {
        if self.state != TransportState::Playing {
            return;
        }
        self.held = now.saturating_sub(self.origin);
        self.state = TransportState::Paused;
        //Reschedule anything queued past the pause point once playback resumes
        let held = self.held;
        self.cursor = self.events.partition_point(|ev| ev.micros < held);
        debug!("pause at {}us", held);
    }

    /// Stop and rewind to the start of the song.
    ///
    /// As with [`pause`](#method.pause), events already in the play queue stay there. The output
    /// side must call [`Consumer::clear`](struct.Consumer.html#method.clear) on the play queue
    /// and send [`all_notes_off`](fn.all_notes_off.html).
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.held = 0;
        self.cursor = 0;
        debug!("stop");
    }

    #[inline]
    pub fn state(&self) -> TransportState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Whether every event has been scheduled.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }

    /// Microseconds into the song.
    pub fn position_micros(&self, now: u64) -> u64 {
        match self.state {
            TransportState::Playing => now.saturating_sub(self.origin),
            _ => self.held,
        }
    }

    /// Song length, up to the last event.
    pub fn length_micros(&self) -> u64 {
        self.events.last().map(|ev| ev.micros).unwrap_or(0)
    }

    /// Initial tempo in beats per minute.
    pub fn tempo(&self) -> f64 {
        self.tempo.bpm_at(0)
    }

    /// Initial beats per measure.
    pub fn time_signature(&self) -> u8 {
        self.signatures.at(0).numerator
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo
    }

    /// Current measure and beat, both counted from 1.
    pub fn beat(&self, now: u64) -> (u64, u32) {
        let tick = self.tempo.micros_to_ticks(self.position_micros(now));
        self.signatures.position(tick)
    }

    /// Push every playable event due before `now + lookahead` into the play queue.
    ///
    /// Stops early if the queue fills up and carries on from there on the next call, so no event
    /// is ever dropped.
    /// Returns how many events were pushed.
    pub fn fill(&mut self, out: &mut Producer<RawMidiEvent>, now: u64, lookahead: u64) -> usize {
        if self.state != TransportState::Playing {
            return 0;
        }
        let horizon = self.position_micros(now).saturating_add(lookahead);
        let mut pushed = 0;
        while let Some(next) = self.events.get(self.cursor) {
            if next.micros >= horizon || out.is_full() {
                break;
            }
            if let Some(ev) = next.event.to_raw(self.origin + next.micros) {
                out.try_push(ev);
                pushed += 1;
            }
            self.cursor += 1;
        }
        pushed
    }
}

/// An "All Notes Off" controller message for every channel.
pub fn all_notes_off(timestamp: u64) -> [RawMidiEvent; 16] {
    let mut events = [RawMidiEvent::status_only(timestamp, Source::Output, 0xB0); 16];
    for (channel, ev) in events.iter_mut().enumerate() {
        *ev = RawMidiEvent::channel_message(
            timestamp,
            Source::Output,
            u4::new(channel as u8),
            MidiMessage::Controller {
                controller: u7::new(123),
                value: u7::new(0),
            },
        );
    }
    events
}
