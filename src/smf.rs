//! Specific to the SMF packaging of MIDI streams.

use crate::{
    event::{data_len, MidiMessage, RawMidiEvent, Source},
    meta::MetaMessage,
    prelude::*,
    primitive::{read_division, read_varlen_slice, write_varlen_slice, Format},
    riff,
};
use log::{debug, info};

/// How many bytes must a MIDI body have in order to enable multithreading.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// A Standard Midi File, with every track parsed into events.
///
/// Events borrow their data from the raw file bytes, which must outlive the `Smf`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Smf<'a> {
    pub header: Header,
    pub tracks: Vec<Track<'a>>,
}
impl<'a> Smf<'a> {
    pub fn new(header: Header, tracks: Vec<Track<'a>>) -> Smf<'a> {
        Smf { header, tracks }
    }

    /// Parse a whole `.mid` (or RMID) file.
    ///
    /// Any track failing to parse aborts the load with that track's error; no partial file is
    /// ever returned.
    pub fn parse(raw: &'a [u8]) -> Result<Smf<'a>> {
        let (header, tracks) = parse(raw)?;
        let tracks = tracks.collect_tracks()?;
        if tracks.len() != header.track_count as usize {
            debug!(
                "header declares {} tracks, found {}",
                header.track_count,
                tracks.len()
            );
        }
        for (idx, track) in tracks.iter().enumerate() {
            debug!("track {}: {} events", idx, track.len());
        }
        info!(
            "loaded {:?} midi file: {} tracks, {} ppqn",
            header.format,
            tracks.len(),
            header.ppqn
        );
        Ok(Smf { header, tracks })
    }

    /// Encode and write the file into the given generic writer, using running status.
    pub fn write<W: Write>(&self, out: &mut W) -> IoResult<W> {
        write(&self.header, &self.tracks, out)
    }

    /// Encode and write the file into an `std::io::Write` sink.
    #[cfg(feature = "std")]
    pub fn write_std<W: io::Write>(&self, out: W) -> io::Result<()> {
        let mut out = crate::io::IoWrap(out);
        self.write(&mut out)?;
        io::Write::flush(&mut out.0)
    }

    /// Save the file to the given path.
    #[cfg(feature = "std")]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fn save_impl(smf: &Smf<'_>, path: &Path) -> io::Result<()> {
            smf.write_std(io::BufWriter::new(File::create(path)?))
        }
        save_impl(self, path.as_ref())
    }
}

/// Parse the header of a Standard Midi File, leaving the tracks for later.
///
/// The returned `TrackIter` yields one lazy `TrackReader` per `MTrk` chunk.
pub fn parse(raw: &[u8]) -> Result<(Header, TrackIter<'_>)> {
    let raw = match riff::unwrap_rmid(raw) {
        Some(smf) => smf?,
        None => raw,
    };
    let mut chunks = ChunkIter::new(raw);
    let header = match chunks.next() {
        Some(chunk) => {
            let (id, data) = chunk.context(err_invalid!("invalid midi header"))?;
            ensure!(&id == b"MThd", err_invalid!("expected header chunk"));
            Header::read(data)?
        }
        None => bail!(err_invalid!("no header chunk")),
    };
    Ok((header, TrackIter::new(chunks, header.ppqn)))
}

/// Encode a whole file: the header chunk followed by one `MTrk` chunk per track.
pub(crate) fn write<'a, W: Write>(header: &Header, tracks: &[Track<'a>], out: &mut W) -> IoResult<W> {
    let track_count =
        u16::try_from(tracks.len()).map_err(|_| W::invalid_input("track count exceeds 16 bit range"))?;
    out.write_all(b"MThd")?;
    out.write_all(&6u32.to_be_bytes())?;
    out.write_all(&header.encode(track_count))?;

    //Write the tracks in parallel if there is enough data
    #[cfg(feature = "parallel")]
    {
        let event_count = tracks.iter().map(Track::len).sum::<usize>();
        if event_count * 3 > PARALLEL_ENABLE_THRESHOLD {
            use rayon::prelude::*;

            let chunks = tracks
                .par_iter()
                .map(|track| {
                    let mut chunk = Vec::with_capacity(track.len() * 4 + 8);
                    write_track_chunk(track.events(), &mut chunk).map(|()| chunk)
                })
                .collect::<Vec<_>>();
            //Write down the tracks sequentially and in order
            for chunk in chunks {
                out.write_all(&chunk.map_err(W::invalid_input)?)?;
            }
            return Ok(());
        }
    }

    let mut chunk = Vec::with_capacity(8 * 1024);
    for track in tracks {
        write_track_chunk(track.events(), &mut chunk).map_err(W::invalid_input)?;
        out.write_all(&chunk)?;
        chunk.clear();
    }
    Ok(())
}

/// Write a track chunk, header included, into an empty `Vec`.
pub(crate) fn write_track_chunk(
    events: &[SmfEvent<'_>],
    out: &mut Vec<u8>,
) -> StdResult<(), &'static str> {
    out.extend_from_slice(b"MTrk\0\0\0\0");
    let mut running_status = None;
    for ev in events {
        ev.write(&mut running_status, out)?;
    }
    let len = u32::try_from(out.len() - 8).map_err(|_| "midi chunk size exceeds 32 bit range")?;
    out[4..8].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Iterates over the raw chunks of a file, as `(id, payload)` pairs.
///
/// A last chunk that is cut short by the end of the file yields whatever data is left.
#[derive(Copy, Clone, Debug)]
pub struct ChunkIter<'a> {
    /// Starts at the current index, ends at EOF.
    raw: &'a [u8],
}
impl<'a> ChunkIter<'a> {
    pub fn new(raw: &'a [u8]) -> ChunkIter<'a> {
        ChunkIter { raw }
    }

    /// Get the remaining unread bytes.
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }

    fn read(&mut self) -> StdResult<([u8; 4], &'a [u8]), &'static ErrorKind> {
        let id = self
            .raw
            .split_checked(4)
            .ok_or(err_invalid!("failed to read chunk id"))?;
        let len = u32::read(&mut self.raw).map_err(|_| err_invalid!("failed to read chunk length"))?;
        let data = match self.raw.split_checked(len as usize) {
            Some(data) => data,
            None => mem::replace(&mut self.raw, &[]),
        };
        let mut chunk_id = [0; 4];
        chunk_id.copy_from_slice(id);
        Ok((chunk_id, data))
    }
}
impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<([u8; 4], &'a [u8])>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.raw.is_empty() {
            return None;
        }
        match self.read() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(err) => {
                //Never read a chunk from the middle of a broken one
                self.raw = &[];
                Some(Err(err.into()))
            }
        }
    }
}

/// A MIDI file header.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    pub format: Format,
    /// Ticks per quarter note.
    pub ppqn: u16,
    /// Amount of tracks as declared by the header. The file may actually contain a different
    /// amount of track chunks.
    pub track_count: u16,
}
impl Header {
    pub fn new(format: Format, ppqn: u16, track_count: u16) -> Header {
        Header {
            format,
            ppqn,
            track_count,
        }
    }

    fn read(mut raw: &[u8]) -> Result<Header> {
        let format = Format::read(&mut raw)?;
        let track_count = u16::read(&mut raw).context(err_invalid!("failed to read track count"))?;
        let ppqn = read_division(&mut raw)?.as_int();
        Ok(Header::new(format, ppqn, track_count))
    }

    fn encode(&self, track_count: u16) -> [u8; 6] {
        let mut bytes = [0; 6];
        bytes[0..2].copy_from_slice(&self.format.encode());
        bytes[2..4].copy_from_slice(&track_count.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.ppqn.to_be_bytes());
        bytes
    }
}

/// An iterator over the tracks of a Standard Midi File, yielding a lazy reader for each one.
///
/// Chunks other than `MTrk` are skipped.
#[derive(Clone, Debug)]
pub struct TrackIter<'a> {
    chunks: ChunkIter<'a>,
    ppqn: u16,
    track: u16,
}
impl<'a> TrackIter<'a> {
    fn new(chunks: ChunkIter<'a>, ppqn: u16) -> TrackIter<'a> {
        TrackIter {
            chunks,
            ppqn,
            track: 0,
        }
    }

    /// Get the remaining unread bytes.
    pub fn unread(&self) -> &'a [u8] {
        self.chunks.unread()
    }

    /// Parse and collect all remaining tracks.
    pub fn collect_tracks(self) -> Result<Vec<Track<'a>>> {
        //Attempt to use multiple threads if possible and advantageous
        #[cfg(feature = "parallel")]
        {
            if self.unread().len() >= PARALLEL_ENABLE_THRESHOLD {
                use rayon::prelude::*;

                let readers = self.collect::<Result<Vec<_>>>()?;
                return readers
                    .into_par_iter()
                    .map(TrackReader::into_track)
                    .collect::<Result<Vec<Track>>>();
            }
        }
        //Fall back to single-threaded
        self.map(|r| r.and_then(TrackReader::into_track))
            .collect::<Result<Vec<Track>>>()
    }
}
impl<'a> Iterator for TrackIter<'a> {
    type Item = Result<TrackReader<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.chunks.next()? {
                Ok((id, data)) if &id == b"MTrk" => {
                    let reader = TrackReader::new(data, self.track, self.ppqn);
                    self.track = self.track.saturating_add(1);
                    break Some(Ok(reader));
                }
                //Unknown chunk, just ignore and read the next one
                Ok(_) => {}
                Err(err) => break Some(Err(err)),
            }
        }
    }
}

/// A lazy reader of the events of a single track.
///
/// Events are parsed on demand, straight from the raw bytes of the `MTrk` chunk.
/// The reader stops after the End-of-Track meta event or after the first error.
/// It is very light, so it can be cloned freely, and `restart` rewinds it to the start of the
/// track.
#[derive(Clone, Debug)]
pub struct TrackReader<'a> {
    start: &'a [u8],
    raw: &'a [u8],
    track: u16,
    ppqn: u16,
    running_status: Option<u8>,
    time: u64,
    done: bool,
}
impl<'a> TrackReader<'a> {
    /// Read the payload of an `MTrk` chunk, tagging events with the given track index and
    /// ticks-per-quarter.
    pub fn new(raw: &'a [u8], track: u16, ppqn: u16) -> TrackReader<'a> {
        TrackReader {
            start: raw,
            raw,
            track,
            ppqn,
            running_status: None,
            time: 0,
            done: false,
        }
    }

    /// Rewind to the first event of the track.
    pub fn restart(&mut self) {
        self.raw = self.start;
        self.running_status = None;
        self.time = 0;
        self.done = false;
    }

    /// Get the remaining unread bytes.
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }

    /// Get the current running status of the track.
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Absolute time in ticks of the last event read.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn track(&self) -> u16 {
        self.track
    }

    /// Read every remaining event.
    pub fn into_track(self) -> Result<Track<'a>> {
        let events = self.collect::<Result<Vec<_>>>()?;
        Ok(Track { events })
    }

    fn read_event(&mut self) -> Result<SmfEvent<'a>> {
        let delta = u28::read_vlq(&mut self.raw, err_delta!())?.as_int();
        let mut status = *self.raw.first().ok_or(err_eot!())?;
        if status < 0x80 {
            //Running status!
            status = self
                .running_status
                .ok_or(err_malformed!("event missing status with no running status active"))?;
        } else {
            self.raw = &self.raw[1..];
        }
        let (data, meta_type) = match status {
            0x80..=0xEF => {
                self.running_status = Some(status);
                let data = self.raw.split_checked(data_len(status)).ok_or(err_eot!())?;
                MidiMessage::get_data_u7(status, data)?;
                (data, None)
            }
            0xF0 | 0xF7 => {
                self.running_status = None;
                (read_varlen_slice(&mut self.raw)?, None)
            }
            0xFF => {
                self.running_status = None;
                let type_byte = u8::read(&mut self.raw).map_err(|_| err_eot!())?;
                (read_varlen_slice(&mut self.raw)?, Some(type_byte))
            }
            _ => bail!(err_malformed!("system common or realtime status inside a track")),
        };
        self.time += delta as u64;
        Ok(SmfEvent {
            track: self.track,
            delta,
            time: self.time,
            ppqn: self.ppqn,
            status,
            data,
            meta_type,
        })
    }
}
impl<'a> Iterator for TrackReader<'a> {
    type Item = Result<SmfEvent<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.raw.is_empty() {
            self.done = true;
            return Some(Err(err_eot!().into()));
        }
        let result = self.read_event();
        match &result {
            Ok(ev) => self.done = ev.is_end_of_track(),
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

/// Read a whole track chunk payload into a list of events.
///
/// Fails without partial results if the track is malformed or lacks an End-of-Track event.
pub fn read_track(raw: &[u8], track: u16, ppqn: u16) -> Result<Vec<SmfEvent<'_>>> {
    TrackReader::new(raw, track, ppqn).collect()
}

/// A single event within a track, borrowing its data from the file bytes.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SmfEvent<'a> {
    track: u16,
    delta: u32,
    time: u64,
    ppqn: u16,
    status: u8,
    data: &'a [u8],
    meta_type: Option<u8>,
}
impl<'a> SmfEvent<'a> {
    /// Index of the track this event belongs to.
    #[inline]
    pub fn track(&self) -> u16 {
        self.track
    }

    /// Ticks since the previous event in the same track.
    #[inline]
    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// Ticks since the start of the track.
    #[inline]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Ticks per quarter note of the file this event comes from.
    #[inline]
    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// The status byte, with running status resolved. `0xFF` for meta events.
    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    /// The data bytes, not including the status or any length prefix.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The meta type byte, for meta events.
    #[inline]
    pub fn meta_type(&self) -> Option<u8> {
        self.meta_type
    }

    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        self.meta_type == Some(0x2F)
    }

    /// Typed view of this event.
    pub fn kind(&self) -> TrackEventKind<'a> {
        match (self.status, self.meta_type) {
            (0xFF, Some(type_byte)) => TrackEventKind::Meta(MetaMessage::read(type_byte, self.data)),
            (0xF0, _) => TrackEventKind::SysEx(self.data),
            (0xF7, _) => TrackEventKind::Escape(self.data),
            (status, _) => {
                //Data bytes were checked when reading the event
                let data = [u7::new(self.data[0]), u7::new(*self.data.get(1).unwrap_or(&0))];
                let (channel, message) = MidiMessage::read(status, data);
                TrackEventKind::Midi { channel, message }
            }
        }
    }

    /// Typed view of a meta event.
    pub fn meta(&self) -> Option<MetaMessage<'a>> {
        self.meta_type
            .map(|type_byte| MetaMessage::read(type_byte, self.data))
    }

    /// Convert into a realtime event to be sent to the synth.
    ///
    /// Only channel messages and System Exclusive messages are playable; meta events and
    /// escapes yield `None`, as do exclusives longer than `MIDI_DATA_SIZE`.
    pub fn to_raw(&self, timestamp: u64) -> Option<RawMidiEvent> {
        match self.status {
            0x80..=0xEF => RawMidiEvent::new(timestamp, Source::Output, self.status, self.data),
            0xF0 => {
                let payload = match self.data.split_last() {
                    Some((0xF7, payload)) => payload,
                    _ => self.data,
                };
                RawMidiEvent::new(timestamp, Source::Output, 0xF0, payload)
            }
            _ => None,
        }
    }

    /// Encode the event, delta time included.
    pub(crate) fn write<W: Write>(&self, running_status: &mut Option<u8>, out: &mut W) -> IoResult<W> {
        u28::try_from(self.delta)
            .ok_or_else(|| W::invalid_input("delta time exceeds 28 bits"))?
            .write_vlq(out)?;
        match self.status {
            0x80..=0xEF => {
                if Some(self.status) != *running_status {
                    out.write_all(&[self.status])?;
                }
                *running_status = Some(self.status);
                out.write_all(self.data)
            }
            _ => {
                *running_status = None;
                out.write_all(&[self.status])?;
                if let Some(type_byte) = self.meta_type {
                    out.write_all(&[type_byte])?;
                }
                write_varlen_slice(self.data, out)
            }
        }
    }
}

/// The kind of an event stored in a track.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TrackEventKind<'a> {
    /// A channel voice message.
    Midi { channel: u4, message: MidiMessage },
    /// A System Exclusive message, carrying the bytes after the `0xF0` status (usually ending in
    /// `0xF7`).
    SysEx(&'a [u8]),
    /// An escape sequence, raw bytes to be sent as-is.
    Escape(&'a [u8]),
    /// A meta event, which never reaches the synth.
    Meta(MetaMessage<'a>),
}

/// A single track: simply a list of track events.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct Track<'a> {
    events: Vec<SmfEvent<'a>>,
}
impl<'a> Track<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn events(&self) -> &[SmfEvent<'a>] {
        &self.events
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, SmfEvent<'a>> {
        self.events.iter()
    }
}
impl<'a, 'b> IntoIterator for &'b Track<'a> {
    type Item = &'b SmfEvent<'a>;
    type IntoIter = core::slice::Iter<'b, SmfEvent<'a>>;
    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
