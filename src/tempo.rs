//! Conversion between MIDI ticks and wall-clock time.

use crate::{
    meta::{MetaMessage, TimeSignature},
    prelude::*,
    primitive::Format,
    smf::Smf,
};

/// Microseconds per quarter note before any tempo event, 120 BPM.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// A tempo change, in effect from `tick` until the next one.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TempoEntry {
    pub tick: u64,
    pub micros_per_quarter: u32,
    /// Microseconds from the start of the song to `tick`.
    micros: u64,
}
impl TempoEntry {
    /// Microseconds from the start of the song until this tempo change.
    #[inline]
    pub fn micros(&self) -> u64 {
        self.micros
    }

    #[inline]
    fn ticks_to_micros(&self, ticks: u64, ppqn: u16) -> u64 {
        (ticks as u128 * self.micros_per_quarter as u128 / ppqn as u128) as u64
    }

    #[inline]
    fn micros_to_ticks(&self, micros: u64, ppqn: u16) -> u64 {
        (micros as u128 * ppqn as u128 / self.micros_per_quarter.max(1) as u128) as u64
    }
}

/// Offset in ticks of the start of each track once tracks are laid out for playback.
///
/// Sequential files play one track after the other; every other format plays all tracks from
/// tick zero.
pub(crate) fn track_offsets(smf: &Smf<'_>) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(smf.tracks.len());
    let mut next = 0;
    for track in &smf.tracks {
        offsets.push(next);
        if smf.header.format == Format::Sequential {
            next += track.events().last().map(|ev| ev.time()).unwrap_or(0);
        }
    }
    offsets
}

/// The tempo changes of a song, ordered by tick.
///
/// Always holds at least one entry at tick zero.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TempoMap {
    ppqn: u16,
    entries: Vec<TempoEntry>,
}
impl TempoMap {
    /// Collect the tempo events of every track in the file.
    pub fn from_smf(smf: &Smf<'_>) -> TempoMap {
        let offsets = track_offsets(smf);
        let changes = smf
            .tracks
            .iter()
            .zip(offsets)
            .flat_map(|(track, offset)| {
                track.iter().filter_map(move |ev| match ev.meta() {
                    Some(MetaMessage::Tempo(tempo)) => Some((offset + ev.time(), tempo.as_int())),
                    _ => None,
                })
            })
            .collect::<Vec<_>>();
        TempoMap::from_events(smf.header.ppqn, changes)
    }

    /// Build a tempo map out of `(tick, micros_per_quarter)` pairs, in any order.
    ///
    /// Changes at the same tick are applied in iteration order, so the last one wins.
    pub fn from_events(ppqn: u16, changes: impl IntoIterator<Item = (u64, u32)>) -> TempoMap {
        let ppqn = ppqn.max(1);
        let mut changes = changes.into_iter().collect::<Vec<_>>();
        changes.sort_by_key(|&(tick, _)| tick);
        let mut entries = vec![TempoEntry {
            tick: 0,
            micros_per_quarter: DEFAULT_TEMPO,
            micros: 0,
        }];
        for (tick, tempo) in changes {
            let tempo = tempo.max(1);
            let last = entries.len() - 1;
            let prev = entries[last];
            if tick == prev.tick {
                entries[last].micros_per_quarter = tempo;
            } else {
                entries.push(TempoEntry {
                    tick,
                    micros_per_quarter: tempo,
                    micros: prev.micros + prev.ticks_to_micros(tick - prev.tick, ppqn),
                });
            }
        }
        TempoMap { ppqn, entries }
    }

    #[inline]
    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    #[inline]
    pub fn entries(&self) -> &[TempoEntry] {
        &self.entries
    }

    fn entry_at_tick(&self, tick: u64) -> &TempoEntry {
        let idx = self.entries.partition_point(|e| e.tick <= tick);
        //The first entry is at tick 0, so `idx >= 1`
        &self.entries[idx.saturating_sub(1)]
    }

    /// Microseconds per quarter note in effect at the given tick.
    pub fn tempo_at(&self, tick: u64) -> u32 {
        self.entry_at_tick(tick).micros_per_quarter
    }

    /// Beats per minute in effect at the given tick.
    pub fn bpm_at(&self, tick: u64) -> f64 {
        60_000_000.0 / self.tempo_at(tick) as f64
    }

    /// Microseconds from the start of the song to the given tick.
    pub fn ticks_to_micros(&self, tick: u64) -> u64 {
        let entry = self.entry_at_tick(tick);
        entry.micros + entry.ticks_to_micros(tick - entry.tick, self.ppqn)
    }

    /// The last tick at or before the given time from the start of the song.
    pub fn micros_to_ticks(&self, micros: u64) -> u64 {
        let idx = self.entries.partition_point(|e| e.micros <= micros);
        let entry = &self.entries[idx.saturating_sub(1)];
        entry.tick + entry.micros_to_ticks(micros - entry.micros, self.ppqn)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
struct SignatureEntry {
    tick: u64,
    /// Zero-based measure starting at `tick`.
    measure: u64,
    sig: TimeSignature,
}

/// The time signature changes of a song, used to count measures and beats.
///
/// Defaults to 4/4 before the first time signature event.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TimeSignatureMap {
    ppqn: u16,
    entries: Vec<SignatureEntry>,
}
impl TimeSignatureMap {
    /// Collect the time signature events of every track in the file.
    pub fn from_smf(smf: &Smf<'_>) -> TimeSignatureMap {
        let offsets = track_offsets(smf);
        let changes = smf
            .tracks
            .iter()
            .zip(offsets)
            .flat_map(|(track, offset)| {
                track.iter().filter_map(move |ev| match ev.meta() {
                    Some(MetaMessage::TimeSignature(sig)) => Some((offset + ev.time(), sig)),
                    _ => None,
                })
            })
            .collect::<Vec<_>>();
        TimeSignatureMap::from_events(smf.header.ppqn, changes)
    }

    /// Build a map out of `(tick, signature)` pairs, in any order.
    ///
    /// A change that does not fall on a bar line starts a new measure.
    pub fn from_events(
        ppqn: u16,
        changes: impl IntoIterator<Item = (u64, TimeSignature)>,
    ) -> TimeSignatureMap {
        let ppqn = ppqn.max(1);
        let mut changes = changes.into_iter().collect::<Vec<_>>();
        changes.sort_by_key(|&(tick, _)| tick);
        let mut entries = vec![SignatureEntry {
            tick: 0,
            measure: 0,
            sig: TimeSignature::COMMON,
        }];
        for (tick, sig) in changes {
            let last = entries.len() - 1;
            let prev = entries[last];
            if tick == prev.tick {
                entries[last].sig = sig;
            } else {
                let measure_len = measure_ticks(&prev.sig, ppqn);
                let elapsed = tick - prev.tick;
                entries.push(SignatureEntry {
                    tick,
                    measure: prev.measure + (elapsed + measure_len - 1) / measure_len,
                    sig,
                });
            }
        }
        TimeSignatureMap { ppqn, entries }
    }

    fn entry_at(&self, tick: u64) -> &SignatureEntry {
        let idx = self.entries.partition_point(|e| e.tick <= tick);
        &self.entries[idx.saturating_sub(1)]
    }

    /// The time signature in effect at the given tick.
    pub fn at(&self, tick: u64) -> TimeSignature {
        self.entry_at(tick).sig
    }

    /// Measure and beat at the given tick, both counted from 1.
    pub fn position(&self, tick: u64) -> (u64, u32) {
        let entry = self.entry_at(tick);
        let beat_len = entry.sig.ticks_per_beat(self.ppqn);
        let measure_len = measure_ticks(&entry.sig, self.ppqn);
        let elapsed = tick - entry.tick;
        let measure = entry.measure + elapsed / measure_len;
        let beat = (elapsed % measure_len) / beat_len;
        (measure + 1, beat as u32 + 1)
    }
}

fn measure_ticks(sig: &TimeSignature, ppqn: u16) -> u64 {
    (sig.ticks_per_beat(ppqn) * sig.numerator.max(1) as u64).max(1)
}
