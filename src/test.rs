use crate::{
    decode,
    gm,
    io::{Cursor, CursorError},
    num::{u14, u24, u4, u7},
    read_track, read_vlq, write_vlq, all_notes_off, DecoderState, ErrorKind, Format, HostSettings,
    InputFilter, KeySignature, LiveEvent, LiveInput, MetaMessage, MidiDecoder, MidiMessage,
    RawMidiEvent, Recorder, RingBuffer, Sequencer, Smf, Source, SystemCommon, TempoMap,
    TimeSignature, TimeSignatureMap, TrackEventKind, TrackReader, TransportState, PLAY_CAPACITY,
    RECORD_CAPACITY,
};

/// Build a complete SMF out of raw track payloads.
fn smf_bytes(format: u16, ppqn: u16, tracks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&ppqn.to_be_bytes());
    for track in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend_from_slice(track);
    }
    out
}

/// Feed several chunks into a decoder, collecting events and errors.
fn feed_all(decoder: &mut MidiDecoder, chunks: &[&[u8]]) -> (Vec<RawMidiEvent>, Vec<ErrorKind>) {
    let mut events = Vec::new();
    let mut errors = Vec::new();
    for (ts, chunk) in chunks.iter().enumerate() {
        decoder.feed(ts as u64, chunk, |ev| match ev {
            Ok(ev) => events.push(ev),
            Err(err) => errors.push(*err),
        });
    }
    (events, errors)
}

fn note_on(ts: u64, key: u8, vel: u8) -> RawMidiEvent {
    RawMidiEvent::channel_message(
        ts,
        Source::Input,
        u4::new(0),
        MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(vel),
        },
    )
}

/// Tempo 120 BPM, a note on at tick 0 and its note off (through running status) at tick 96.
const SIMPLE_TRACK: &[u8] = &[
    0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
    0x00, 0x90, 0x3C, 0x64, //
    0x60, 0x3C, 0x00, //
    0x00, 0xFF, 0x2F, 0x00,
];

/// Tempo of 960000us per quarter (10ms per tick at 96 ppqn) and a 3/4 time signature.
const CONDUCTOR_TRACK: &[u8] = &[
    0x00, 0xFF, 0x51, 0x03, 0x0E, 0xA6, 0x00, //
    0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08, //
    0x00, 0xFF, 0x2F, 0x00,
];

/// A note on at tick 0 and a note off at tick 96.
const NOTE_TRACK: &[u8] = &[
    0x00, 0x90, 0x3C, 0x64, //
    0x60, 0x80, 0x3C, 0x40, //
    0x00, 0xFF, 0x2F, 0x00,
];

#[test]
fn decode_split_across_chunks() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90]]);
    assert!(events.is_empty() && errors.is_empty());
    assert_eq!(decoder.state(), DecoderState::CollectingData1);
    let (events, _) = feed_all(&mut decoder, &[&[0x3C]]);
    assert!(events.is_empty());
    assert_eq!(decoder.state(), DecoderState::CollectingData2);
    let mut out = Vec::new();
    decoder.feed(2, &[0x64], |ev| out.push(ev.unwrap()));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].timestamp(), 2);
    assert_eq!(out[0].status(), 0x90);
    assert_eq!(out[0].data(), &[0x3C, 0x64]);
    assert_eq!(decoder.state(), DecoderState::AwaitingRunningStatus);
    assert_eq!(decoder.running_status(), Some(0x90));
}

#[test]
fn decode_running_status() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x3C, 0x64, 0x3E, 0x64]]);
    assert!(errors.is_empty());
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].status(), 0x90);
    assert_eq!(events[1].data(), &[0x3E, 0x64]);

    //Single data byte messages
    let (events, errors) = feed_all(&mut decoder, &[&[0xC0, 0x05, 0x06]]);
    assert!(errors.is_empty());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data(), &[0x05]);
    assert_eq!(events[1].data(), &[0x06]);
    assert_eq!(
        events[1].message(),
        Some((
            u4::new(0),
            MidiMessage::ProgramChange {
                program: u7::new(6)
            }
        ))
    );
}

#[test]
fn decode_realtime_interleaved() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x3C, 0xF8, 0x64]]);
    assert!(errors.is_empty());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].status(), 0xF8);
    assert!(events[0].data().is_empty());
    assert!(events[0].is_realtime());
    assert_eq!(events[1].status(), 0x90);
    assert_eq!(events[1].data(), &[0x3C, 0x64]);
    assert_eq!(decoder.running_status(), Some(0x90));
}

#[test]
fn decode_system_common() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x3C, 0x64, 0xF6, 0x3C]]);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].status(), 0xF6);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ErrorKind::MalformedMessage(_)));
    assert_eq!(decoder.running_status(), None);
    assert_eq!(decoder.state(), DecoderState::AwaitingStatus);

    let events = decode(&[0xF2, 0x10, 0x20]).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].kind(),
        Ok(LiveEvent::Common(SystemCommon::SongPosition(u14::new(
            0x10 | 0x20 << 7
        ))))
    );
}

#[test]
fn decode_sysex() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0xF0, 0x01, 0x02], &[0x03, 0xF7]]);
    assert!(errors.is_empty());
    assert_eq!(events.len(), 1);
    assert!(events[0].is_sysex());
    assert_eq!(events[0].data(), &[0x01, 0x02, 0x03]);
    assert_eq!(events[0].timestamp(), 1);

    //Exactly as large as an event can hold
    let mut bytes = vec![0xF0];
    bytes.extend(std::iter::repeat(0x01).take(256));
    bytes.push(0xF7);
    let events = decode(&bytes).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data().len(), 256);
}

#[test]
fn decode_sysex_too_long() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let mut bytes = vec![0xF0];
    bytes.extend(std::iter::repeat(0x01).take(300));
    bytes.extend_from_slice(&[0xF7, 0x90, 0x3C, 0x64]);
    let (events, errors) = feed_all(&mut decoder, &[&bytes[..]]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ErrorKind::MalformedMessage(_)));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status(), 0x90);
}

#[test]
fn decode_malformed() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x3C]]);
    assert!(events.is_empty());
    assert_eq!(errors.len(), 1);

    //Status interrupting an incomplete message
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x3C, 0x80, 0x3C, 0x00]]);
    assert_eq!(errors.len(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status(), 0x80);
    assert_eq!(events[0].data(), &[0x3C, 0x00]);

    //End of exclusive without a start
    decoder.reset();
    let (events, errors) = feed_all(&mut decoder, &[&[0xF7]]);
    assert!(events.is_empty());
    assert_eq!(errors.len(), 1);

    //Status interrupting an exclusive
    let (events, errors) = feed_all(&mut decoder, &[&[0xF0, 0x01, 0x90, 0x3C, 0x64]]);
    assert_eq!(errors.len(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status(), 0x90);

    let err = decode(&[0x3C]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MalformedMessage(_)));
}

#[test]
fn decode_truncated() {
    for bytes in &[&[0x90, 0x40][..], &[0xC0][..], &[0xF0, 0x01][..]] {
        let err = decode(bytes).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedMessage(_)));
    }
    assert_eq!(decode(&[0x90, 0x40, 0x7F]).unwrap().len(), 1);

    //A chunked stream keeps the partial message instead
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x40]]);
    assert!(events.is_empty());
    assert!(errors.is_empty());
    assert_eq!(decoder.state(), DecoderState::CollectingData2);
}

#[test]
fn decode_stray_end_of_exclusive() {
    let mut decoder = MidiDecoder::new(Source::Input);
    let (events, errors) = feed_all(&mut decoder, &[&[0x90, 0x40, 0xF7]]);
    assert!(events.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(decoder.state(), DecoderState::AwaitingStatus);
    assert_eq!(decoder.running_status(), None);
}

#[test]
fn write_running_status() {
    let events = [
        RawMidiEvent::new(0, Source::Output, 0x90, &[0x3C, 0x64]).unwrap(),
        RawMidiEvent::new(0, Source::Output, 0x90, &[0x3E, 0x64]).unwrap(),
        RawMidiEvent::new(0, Source::Output, 0xF8, &[]).unwrap(),
        RawMidiEvent::new(0, Source::Output, 0x80, &[0x3C, 0x00]).unwrap(),
    ];
    let mut running_status = None;
    let mut out = Vec::new();
    for ev in events.iter() {
        ev.write_with_running_status(&mut running_status, &mut out)
            .unwrap();
    }
    assert_eq!(
        out,
        vec![0x90, 0x3C, 0x64, 0x3E, 0x64, 0xF8, 0x80, 0x3C, 0x00]
    );
    let decoded = decode(&out).unwrap();
    assert_eq!(decoded.len(), 4);
    for (ev, orig) in decoded.iter().zip(events.iter()) {
        assert_eq!(ev.status(), orig.status());
        assert_eq!(ev.data(), orig.data());
    }

    let mut buf = [0; 2];
    let mut cursor = Cursor::new(&mut buf);
    assert_eq!(events[0].write(&mut cursor), Err(CursorError::OutOfSpace));
    assert!(RawMidiEvent::new(0, Source::Output, 0x3C, &[]).is_none());
}

#[test]
fn vlq_values() {
    let cases: &[(u32, &[u8])] = &[
        (0, &[0x00]),
        (0x40, &[0x40]),
        (0x7F, &[0x7F]),
        (0x80, &[0x81, 0x00]),
        (0x2000, &[0xC0, 0x00]),
        (0x3FFF, &[0xFF, 0x7F]),
        (0x4000, &[0x81, 0x80, 0x00]),
        (0x1F_FFFF, &[0xFF, 0xFF, 0x7F]),
        (0x20_0000, &[0x81, 0x80, 0x80, 0x00]),
        (0x0FFF_FFFF, &[0xFF, 0xFF, 0xFF, 0x7F]),
    ];
    for &(value, bytes) in cases {
        let mut out = Vec::new();
        write_vlq(value, &mut out).unwrap();
        assert_eq!(&out[..], bytes, "encoding {:#x}", value);
        let mut raw = bytes;
        assert_eq!(read_vlq(&mut raw).unwrap(), value);
        assert!(raw.is_empty());
    }
    assert!(write_vlq(0x1000_0000, &mut Vec::new()).is_err());

    let mut raw: &[u8] = &[0x81, 0x80, 0x80, 0x80, 0x00];
    assert_eq!(read_vlq(&mut raw).unwrap_err().kind(), ErrorKind::InvalidDeltaTime);
    let mut raw: &[u8] = &[0x81];
    assert_eq!(
        read_vlq(&mut raw).unwrap_err().kind(),
        ErrorKind::UnexpectedEndOfTrack
    );
}

#[test]
fn track_reader() {
    let events = read_track(SIMPLE_TRACK, 3, 96).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0].meta(),
        Some(MetaMessage::Tempo(u24::new(500_000)))
    );
    assert_eq!(events[1].status(), 0x90);
    assert_eq!(events[1].time(), 0);
    assert_eq!(events[1].track(), 3);
    assert_eq!(
        events[1].kind(),
        TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(0x3C),
                vel: u7::new(0x64)
            }
        }
    );
    //Running status
    assert_eq!(events[2].status(), 0x90);
    assert_eq!(events[2].data(), &[0x3C, 0x00]);
    assert_eq!(events[2].delta(), 96);
    assert_eq!(events[2].time(), 96);
    assert!(events[3].is_end_of_track());
    assert_eq!(events[3].time(), 96);
}

#[test]
fn track_reader_restart() {
    let mut reader = TrackReader::new(SIMPLE_TRACK, 0, 96);
    let first = reader.next().unwrap().unwrap();
    let mut fork = reader.clone();
    let rest = reader.by_ref().collect::<crate::Result<Vec<_>>>().unwrap();
    assert_eq!(rest.len(), 3);
    //Stays finished after the end of track
    assert!(reader.next().is_none());
    assert_eq!(fork.next().unwrap().unwrap(), rest[0]);
    reader.restart();
    assert_eq!(reader.next().unwrap().unwrap(), first);
    assert_eq!(reader.count(), 3);
}

#[test]
fn track_errors() {
    //No end of track
    let err = read_track(&[0x00, 0x90, 0x3C, 0x64], 0, 96).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfTrack);
    //Cut in the middle of an event
    let err = read_track(&[0x00, 0x90, 0x3C], 0, 96).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfTrack);
    //Delta time over 4 bytes
    let err = read_track(&[0x81, 0x80, 0x80, 0x80, 0x00, 0x90, 0x3C, 0x64], 0, 96).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDeltaTime);
    //Data byte without running status
    let err = read_track(&[0x00, 0x3C, 0x64, 0x00, 0xFF, 0x2F, 0x00], 0, 96).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MalformedMessage(_)));

    //The reader stops after an error
    let mut reader = TrackReader::new(&[0x00, 0x90, 0x3C, 0x64], 0, 96);
    assert!(reader.next().unwrap().is_ok());
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}

#[test]
fn track_sysex() {
    let track = [0x00, 0xF0, 0x03, 0x01, 0x02, 0xF7, 0x00, 0xFF, 0x2F, 0x00];
    let events = read_track(&track, 0, 96).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), TrackEventKind::SysEx(&[0x01, 0x02, 0xF7]));
    let raw = events[0].to_raw(5).unwrap();
    assert_eq!(raw.status(), 0xF0);
    assert_eq!(raw.data(), &[0x01, 0x02]);
    assert_eq!(raw.timestamp(), 5);
    assert!(events[1].to_raw(5).is_none());
}

#[test]
fn parse_smf() {
    let bytes = smf_bytes(1, 96, &[CONDUCTOR_TRACK, NOTE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.header.format, Format::Parallel);
    assert_eq!(smf.header.ppqn, 96);
    assert_eq!(smf.tracks.len(), 2);
    assert_eq!(smf.tracks[0].len(), 3);
    assert_eq!(smf.tracks[1].len(), 3);
    assert_eq!(smf.tracks[1].events()[0].track(), 1);
    assert_eq!(
        smf.tracks[0].events()[1].kind(),
        TrackEventKind::Meta(MetaMessage::TimeSignature(TimeSignature {
            numerator: 3,
            denominator_pow2: 2,
            clocks_per_click: 24,
            thirty_seconds_per_quarter: 8,
        }))
    );

    //Unknown chunks are skipped
    let mut with_junk = bytes[..14].to_vec();
    with_junk.extend_from_slice(b"XTRA\0\0\0\x02ab");
    with_junk.extend_from_slice(&bytes[14..]);
    assert_eq!(Smf::parse(&with_junk).unwrap(), smf);
}

#[test]
fn parse_smf_errors() {
    let err = Smf::parse(&[]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Invalid(_)));

    let mut smpte = smf_bytes(0, 96, &[SIMPLE_TRACK]);
    smpte[12] = 0xE7;
    smpte[13] = 0x28;
    let err = Smf::parse(&smpte).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedDivisionFormat);

    let zero = smf_bytes(0, 0, &[SIMPLE_TRACK]);
    assert!(matches!(
        Smf::parse(&zero).unwrap_err().kind(),
        ErrorKind::Invalid(_)
    ));

    //A single broken track fails the whole file
    let broken = smf_bytes(1, 96, &[SIMPLE_TRACK, &[0x00u8, 0x90, 0x3C, 0x64][..]]);
    assert_eq!(
        Smf::parse(&broken).unwrap_err().kind(),
        ErrorKind::UnexpectedEndOfTrack
    );
}

#[test]
fn parse_rmid() {
    let smf = smf_bytes(0, 96, &[SIMPLE_TRACK]);
    let mut data_chunk = b"data".to_vec();
    data_chunk.extend_from_slice(&(smf.len() as u32).to_le_bytes());
    data_chunk.extend_from_slice(&smf);
    if smf.len() % 2 == 1 {
        data_chunk.push(0);
    }
    let mut rmid = b"RIFF".to_vec();
    rmid.extend_from_slice(&(data_chunk.len() as u32 + 4).to_le_bytes());
    rmid.extend_from_slice(b"RMID");
    rmid.extend_from_slice(&data_chunk);
    assert_eq!(Smf::parse(&rmid).unwrap(), Smf::parse(&smf).unwrap());
}

#[test]
fn rewrite_smf() {
    let bytes = smf_bytes(1, 96, &[CONDUCTOR_TRACK, NOTE_TRACK, SIMPLE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut out = Vec::new();
    smf.write(&mut out).unwrap();
    let reparsed = Smf::parse(&out).unwrap();
    assert_eq!(smf, reparsed, "reparsed midi file is not identical to the original");
}

#[test]
fn parse_large_smf() {
    //Large enough to be parsed and written in parallel
    let mut track: Vec<u8> = vec![0x00, 0x90, 0x3C, 0x64];
    for _ in 0..1500 {
        track.extend_from_slice(&[0x01, 0x3C, 0x64]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let bytes = smf_bytes(1, 96, &[&track[..], &track[..]]);
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 2);
    assert_eq!(smf.tracks[1].len(), 1502);
    assert_eq!(smf.tracks[1].events()[1500].time(), 1500);
    let mut out = Vec::new();
    smf.write(&mut out).unwrap();
    assert_eq!(Smf::parse(&out).unwrap(), smf);
}

#[test]
fn tempo_default() {
    let map = TempoMap::from_events(96, Vec::new());
    assert_eq!(map.tempo_at(0), 500_000);
    assert_eq!(map.bpm_at(1000), 120.0);
    assert_eq!(map.ticks_to_micros(96), 500_000);

    let bytes = smf_bytes(0, 96, &[SIMPLE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks[0].iter().count(), 4);
    let map = TempoMap::from_smf(&smf);
    assert_eq!(map.bpm_at(0), 120.0);
    assert_eq!(map.ticks_to_micros(192), 1_000_000);
}

#[test]
fn tempo_map_order() {
    let map = TempoMap::from_events(100, vec![(200, 250_000), (0, 1_000_000), (100, 500_000)]);
    assert_eq!(map.entries().len(), 3);
    assert_eq!(map.tempo_at(99), 1_000_000);
    assert_eq!(map.tempo_at(150), 500_000);
    assert_eq!(map.tempo_at(5000), 250_000);
    assert_eq!(map.ticks_to_micros(100), 1_000_000);
    assert_eq!(map.ticks_to_micros(200), 1_500_000);
    assert_eq!(map.ticks_to_micros(300), 1_750_000);
    assert_eq!(map.micros_to_ticks(1_750_000), 300);
    assert_eq!(map.micros_to_ticks(1_250_000), 150);

    //Later changes at the same tick win
    let map = TempoMap::from_events(100, vec![(0, 400_000), (0, 600_000)]);
    assert_eq!(map.tempo_at(0), 600_000);
}

#[test]
fn time_signature_position() {
    let map = TimeSignatureMap::from_events(96, Vec::new());
    assert_eq!(map.at(0), TimeSignature::COMMON);
    assert_eq!(map.position(0), (1, 1));
    assert_eq!(map.position(96 * 3), (1, 4));
    assert_eq!(map.position(96 * 4), (2, 1));

    let three_four = TimeSignature {
        numerator: 3,
        ..TimeSignature::COMMON
    };
    let map = TimeSignatureMap::from_events(
        96,
        vec![(576, TimeSignature::COMMON), (0, three_four)],
    );
    assert_eq!(map.at(100).numerator, 3);
    assert_eq!(map.position(288), (2, 1));
    assert_eq!(map.position(576), (3, 1));
    assert_eq!(map.position(576 + 96 * 5), (4, 2));
}

#[test]
fn sequencer_schedule() {
    let bytes = smf_bytes(1, 96, &[CONDUCTOR_TRACK, NOTE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut seq = Sequencer::new(&smf);
    assert_eq!(seq.tempo(), 62.5);
    assert_eq!(seq.time_signature(), 3);
    assert_eq!(seq.state(), TransportState::Stopped);
    assert_eq!(seq.length_micros(), 960_000);

    let (mut prod, mut cons) = RingBuffer::new(PLAY_CAPACITY);
    //Nothing happens while stopped
    assert_eq!(seq.fill(&mut prod, 0, 1_000_000), 0);

    seq.play(1_000);
    assert!(seq.is_playing());
    assert_eq!(seq.fill(&mut prod, 1_000, 500_000), 1);
    let ev = cons.try_pop().unwrap();
    assert_eq!(ev.timestamp(), 1_000);
    assert_eq!(ev.status(), 0x90);
    assert_eq!(ev.source(), Source::Output);
    assert!(cons.pop_due(1_000_000).is_none());

    assert_eq!(seq.beat(1_000 + 480_000), (1, 1));
    assert_eq!(seq.beat(1_000 + 960_000), (1, 2));

    assert_eq!(seq.fill(&mut prod, 1_000_000, 0), 1);
    assert!(cons.pop_due(960_999).is_none());
    let ev = cons.pop_due(961_000).unwrap();
    assert_eq!(ev.status(), 0x80);
    assert!(seq.is_finished());

    seq.stop();
    assert!(!seq.is_playing());
    assert_eq!(seq.position_micros(5_000_000), 0);
    assert!(!seq.is_finished());
}

#[test]
fn sequencer_pause() {
    let bytes = smf_bytes(1, 96, &[CONDUCTOR_TRACK, NOTE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut seq = Sequencer::new(&smf);
    let (mut prod, mut cons) = RingBuffer::new(PLAY_CAPACITY);
    seq.play(1_000);
    //Schedules both the note on and the note off
    assert_eq!(seq.fill(&mut prod, 1_000, 2_000_000), 2);
    seq.pause(501_000);
    assert_eq!(seq.state(), TransportState::Paused);
    assert_eq!(seq.position_micros(9_000_000), 500_000);
    cons.clear();

    //The note off past the pause point is scheduled again on resume
    seq.play(2_000_000);
    assert_eq!(seq.position_micros(2_000_000), 500_000);
    assert_eq!(seq.fill(&mut prod, 2_000_000, 1_000_000), 1);
    let ev = cons.try_pop().unwrap();
    assert_eq!(ev.status(), 0x80);
    assert_eq!(ev.timestamp(), 2_460_000);
}

#[test]
fn sequencer_stop_and_replay() {
    let bytes = smf_bytes(1, 96, &[CONDUCTOR_TRACK, NOTE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut seq = Sequencer::new(&smf);
    let (mut prod, mut cons) = RingBuffer::new(PLAY_CAPACITY);
    seq.play(0);
    assert_eq!(seq.fill(&mut prod, 0, 2_000_000), 2);
    seq.stop();
    //Stopping leaves the queue alone
    assert_eq!(cons.count(), 2);
    cons.clear();
    assert!(cons.is_empty());

    seq.play(3_000_000);
    assert_eq!(seq.fill(&mut prod, 3_000_000, 500_000), 1);
    let ev = cons.try_pop().unwrap();
    assert_eq!(ev.status(), 0x90);
    assert_eq!(ev.timestamp(), 3_000_000);
}

#[test]
fn sequencer_never_overruns() {
    let mut track: Vec<u8> = Vec::new();
    for key in 0..5 {
        track.extend_from_slice(&[0x00, 0x90, 0x30 + key, 0x64]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let bytes = smf_bytes(0, 96, &[&track[..]]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut seq = Sequencer::new(&smf);
    let (mut prod, mut cons) = RingBuffer::new(2);
    seq.play(0);
    assert_eq!(seq.fill(&mut prod, 0, 1_000), 2);
    assert_eq!(prod.overflow_count(), 0);
    assert_eq!(cons.try_pop().unwrap().data()[0], 0x30);
    assert_eq!(cons.try_pop().unwrap().data()[0], 0x31);
    assert_eq!(seq.fill(&mut prod, 0, 1_000), 2);
    assert_eq!(cons.try_pop().unwrap().data()[0], 0x32);
}

#[test]
fn sequencer_sequential_format() {
    let bytes = smf_bytes(2, 96, &[NOTE_TRACK, NOTE_TRACK]);
    let smf = Smf::parse(&bytes).unwrap();
    let mut seq = Sequencer::new(&smf);
    let (mut prod, mut cons) = RingBuffer::new(PLAY_CAPACITY);
    seq.play(0);
    //First track's note on only
    assert_eq!(seq.fill(&mut prod, 0, 400_000), 1);
    //First track's note off and second track's note on, both at 500ms
    assert_eq!(seq.fill(&mut prod, 0, 600_000), 2);
    cons.try_pop().unwrap();
    let off = cons.try_pop().unwrap();
    let on = cons.try_pop().unwrap();
    assert_eq!((off.status(), off.timestamp()), (0x80, 500_000));
    assert_eq!((on.status(), on.timestamp()), (0x90, 500_000));
}

#[test]
fn notes_off() {
    let events = all_notes_off(42);
    for (channel, ev) in events.iter().enumerate() {
        assert_eq!(ev.status(), 0xB0 | channel as u8);
        assert_eq!(ev.data(), &[123, 0]);
        assert_eq!(ev.timestamp(), 42);
    }
}

#[test]
fn ring_overflow() {
    let (mut prod, mut cons) = RingBuffer::<u32>::new(3);
    assert_eq!(prod.capacity(), 3);
    assert!(prod.try_push(1));
    assert!(prod.try_push(2));
    assert!(prod.try_push(3));
    assert!(prod.is_full());
    assert!(!prod.try_push(4));
    assert_eq!(prod.overflow_count(), 1);
    assert_eq!(cons.overflow_count(), 1);
    assert_eq!(cons.count(), 3);
    //The newest item was dropped
    assert_eq!(cons.peek(), Some(&1));
    assert_eq!(cons.try_pop(), Some(1));
    assert_eq!(cons.try_pop(), Some(2));
    assert_eq!(cons.try_pop(), Some(3));
    assert_eq!(cons.try_pop(), None);
    assert!(cons.is_empty());

    assert_eq!(crate::play_buffer().0.capacity(), PLAY_CAPACITY);
    assert_eq!(crate::record_buffer().1.capacity(), RECORD_CAPACITY);
}

#[test]
fn ring_pop_due() {
    let (mut prod, mut cons) = crate::play_buffer();
    assert!(prod.try_push(note_on(10, 60, 100)));
    assert!(prod.try_push(note_on(20, 62, 100)));
    assert!(cons.pop_due(5).is_none());
    assert_eq!(cons.pop_due(10).unwrap().timestamp(), 10);
    assert!(cons.pop_due(15).is_none());
    assert_eq!(cons.pop_due(25).unwrap().timestamp(), 20);
    assert!(cons.pop_due(100).is_none());
}

#[test]
fn input_filter() {
    let filter = InputFilter {
        channel: Some(u4::new(2)),
        low: u7::new(40),
        high: u7::new(80),
        transpose: 12,
    };
    let ev = filter.apply(note_on(7, 60, 100)).unwrap();
    assert_eq!(ev.status(), 0x92);
    assert_eq!(ev.data(), &[72, 100]);
    assert_eq!(ev.timestamp(), 7);
    assert!(filter.apply(note_on(0, 30, 100)).is_none());
    assert!(filter.apply(note_on(0, 81, 100)).is_none());
    assert_eq!(filter.apply(note_on(0, 80, 100)).unwrap().data(), &[92, 100]);

    let out_of_range = InputFilter {
        transpose: 60,
        ..InputFilter::default()
    };
    assert!(out_of_range.apply(note_on(0, 80, 100)).is_none());
    assert_eq!(
        out_of_range.apply_message(
            u4::new(1),
            MidiMessage::Controller {
                controller: u7::new(7),
                value: u7::new(90)
            }
        ),
        Some((
            u4::new(1),
            MidiMessage::Controller {
                controller: u7::new(7),
                value: u7::new(90)
            }
        ))
    );

    let clock = RawMidiEvent::new(0, Source::Input, 0xF8, &[]).unwrap();
    assert_eq!(filter.apply(clock), Some(clock));
    assert!(InputFilter::default().is_identity());
}

#[test]
fn live_input() {
    let (prod, mut cons) = RingBuffer::new(2);
    let filter = InputFilter {
        low: u7::new(0x30),
        ..InputFilter::default()
    };
    let mut input = LiveInput::new(MidiDecoder::new(Source::Input), filter, prod);
    let mut thru = 0;
    //Not recording yet
    input.receive_with(100, &[0x90, 0x3C, 0x64], |_| thru += 1);
    assert_eq!(thru, 1);
    assert!(cons.try_pop().is_none());

    input.set_recording(true);
    input.receive(200, &[0x3E]);
    input.receive(300, &[0x64, 0x20, 0x64]);
    let ev = cons.try_pop().unwrap();
    assert_eq!(ev.timestamp(), 300);
    assert_eq!(ev.data(), &[0x3E, 0x64]);
    assert!(cons.try_pop().is_none());

    //End of exclusive without a start also clears the running status
    input.receive(400, &[0xF7]);
    assert_eq!(input.stats().malformed, 1);

    //Only room for two
    input.receive(500, &[0x90, 0x40, 0x64, 0x41, 0x64, 0x42, 0x64]);
    let stats = input.stats();
    assert_eq!(stats.received, 6);
    assert_eq!(stats.filtered, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(cons.count(), 2);
    assert_eq!(cons.overflow_count(), 1);
}

#[test]
fn recorder_roundtrip() {
    let (mut prod, cons) = RingBuffer::new(16);
    assert!(prod.try_push(note_on(1_000_000, 0x3C, 0x64)));
    assert!(prod.try_push(RawMidiEvent::new(1_200_000, Source::Input, 0xF8, &[]).unwrap()));
    assert!(prod.try_push(note_on(1_500_000, 0x3C, 0x00)));
    let mut recorder = Recorder::new(cons);
    assert_eq!(recorder.poll(), 3);
    assert_eq!(recorder.events().len(), 3);
    recorder.set_timing(24, 120);

    let mut file = Vec::new();
    recorder.write_smf(&mut file).unwrap();
    let smf = Smf::parse(&file).unwrap();
    assert_eq!(smf.header.format, Format::SingleTrack);
    assert_eq!(smf.header.ppqn, 24);
    assert_eq!(smf.tracks.len(), 1);
    let events = smf.tracks[0].events();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].meta(), Some(MetaMessage::Tempo(u24::new(500_000))));
    assert_eq!(events[1].status(), 0x90);
    assert_eq!(events[1].data(), &[0x3C, 0x64]);
    assert_eq!(events[1].time(), 0);
    assert_eq!(events[2].status(), 0x90);
    assert_eq!(events[2].data(), &[0x3C, 0x00]);
    assert_eq!(events[2].time(), 24);
    assert!(events[3].is_end_of_track());
    assert_eq!(TempoMap::from_smf(&smf).ticks_to_micros(24), 500_000);

    recorder.clear();
    assert!(recorder.events().is_empty());
    let empty = recorder.to_track(24, 120).unwrap();
    assert_eq!(read_track(&empty, 0, 24).unwrap().len(), 2);
}

#[test]
fn recorder_overflow() {
    let (mut prod, cons) = RingBuffer::new(1);
    let mut recorder = Recorder::new(cons);
    assert!(prod.try_push(note_on(0, 60, 100)));
    assert!(!prod.try_push(note_on(1, 61, 100)));
    assert_eq!(recorder.poll(), 1);
    assert_eq!(recorder.events()[0].data(), &[60, 100]);
}

#[test]
fn recorder_tempo_limits() {
    let (_prod, cons) = RingBuffer::new(4);
    let recorder = Recorder::new(cons);
    assert!(recorder.to_track(96, 3).is_err());
    assert!(recorder.to_track(96, 2).is_err());

    let track = recorder.to_track(96, 4).unwrap();
    let events = read_track(&track, 0, 96).unwrap();
    assert_eq!(events[0].meta(), Some(MetaMessage::Tempo(u24::new(15_000_000))));

    let slow = HostSettings {
        tempo_bpm: 3,
        ..HostSettings::default()
    };
    assert!(slow.validate().is_err());
    let slow = HostSettings {
        tempo_bpm: 4,
        ..HostSettings::default()
    };
    assert!(slow.validate().is_ok());
}

#[test]
fn host_settings() {
    let settings = HostSettings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.tempo_bpm, 120);
    assert!(!settings.record_enabled);
    assert!(settings.input_filter().is_identity());

    let bad = HostSettings {
        low_key: u7::new(80),
        high_key: u7::new(40),
        ..HostSettings::default()
    };
    assert!(bad.validate().is_err());
    let bad = HostSettings {
        tempo_bpm: 0,
        ..HostSettings::default()
    };
    assert!(bad.validate().is_err());

    let custom = HostSettings {
        channel: Some(u4::new(9)),
        transpose: -12,
        ..HostSettings::default()
    };
    let filter = custom.input_filter();
    assert_eq!(filter.channel, Some(u4::new(9)));
    assert_eq!(filter.transpose, -12);
}

#[test]
fn gm_names() {
    assert_eq!(gm::patch_name(u7::new(0)), "Acoustic Grand Piano");
    assert_eq!(gm::patch_name(u7::new(127)), "Gunshot");
    assert_eq!(gm::patch_category(u7::new(33)), "Bass");
    assert_eq!(gm::patch_category(u7::new(127)), "Sound Effects");
    assert_eq!(gm::drum_kit_name(4), Some("TR-808"));
    assert_eq!(gm::drum_kit_name(9), None);
    assert_eq!(gm::drum_name(u7::new(26)), None);
    assert_eq!(gm::drum_name(u7::new(27)), Some("High Q"));
    assert_eq!(gm::drum_name(u7::new(35)), Some("Acoustic Bass Drum"));
    assert_eq!(gm::drum_name(u7::new(36)), Some("Bass Drum"));
    assert_eq!(gm::drum_name(u7::new(87)), Some("Open Surdo"));
    assert_eq!(gm::drum_name(u7::new(88)), None);
    assert_eq!(gm::controller_name(u7::new(7)), "Volume");
    assert_eq!(gm::controller_name(u7::new(64)), "Sustain Pedal");
    assert_eq!(gm::controller_name(u7::new(91)), "Reverb Depth");
    assert_eq!(gm::controller_name(u7::new(123)), "All Notes Off");
    assert_eq!(gm::note_name(u7::new(61), true), "C#");
    assert_eq!(gm::note_name(u7::new(61), false), "Db");
    assert_eq!(gm::note_octave(u7::new(36)), 3);
    assert_eq!(gm::key_signature_name(0), Some("C"));
    assert_eq!(gm::key_signature_name(-7), Some("Cb"));
    assert_eq!(gm::key_signature_name(7), Some("C#"));
    assert_eq!(gm::key_signature_name(8), None);
    assert_eq!(gm::key_signature_name(-8), None);
    assert_eq!(
        KeySignature {
            sharps: -3,
            minor: false
        }
        .name(),
        Some("Eb")
    );
}
