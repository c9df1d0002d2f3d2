//! General MIDI names and host defaults.
//!
//! All tables are immutable statics; lookups never allocate.

use crate::primitive::u7;

/// Default tempo in beats per minute.
pub const DEFAULT_BPM: u16 = 120;

/// Default ticks per quarter note for recordings.
pub const DEFAULT_PPQN: u16 = 24;

/// Default beats per measure.
pub const DEFAULT_BEATS_PER_MEASURE: u8 = 4;

/// Default beat unit (a quarter note).
pub const DEFAULT_BEAT_UNIT: u8 = 4;

/// Number of MIDI channels.
pub const NUM_CHANNELS: usize = 16;

static PATCHES: [&str; 128] = [
    // Piano
    "Acoustic Grand Piano",
    "Bright Acoustic Piano",
    "Electric Grand Piano",
    "Honky-Tonk Piano",
    "Electric Piano 1",
    "Electric Piano 2",
    "Harpsichord",
    "Clavinet",
    // Chromatic percussion
    "Celesta",
    "Glockenspiel",
    "Music Box",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "Tubular Bells",
    "Dulcimer",
    // Organ
    "Drawbar Organ",
    "Percussive Organ",
    "Rock Organ",
    "Church Organ",
    "Reed Organ",
    "Accordion",
    "Harmonica",
    "Tango Accordion",
    // Guitar
    "Acoustic Guitar (Nylon)",
    "Acoustic Guitar (Steel)",
    "Electric Guitar (Jazz)",
    "Electric Guitar (Clean)",
    "Electric Guitar (Muted)",
    "Overdriven Guitar",
    "Distortion Guitar",
    "Guitar Harmonics",
    // Bass
    "Acoustic Bass",
    "Electric Bass (Finger)",
    "Electric Bass (Picked)",
    "Fretless Bass",
    "Slap Bass 1",
    "Slap Bass 2",
    "Synth Bass 1",
    "Synth Bass 2",
    // Strings
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "Tremolo Strings",
    "Pizzicato Strings",
    "Orchestral Harp",
    "Timpani",
    // Ensemble
    "String Ensemble 1",
    "String Ensemble 2",
    "Synth Strings 1",
    "Synth Strings 2",
    "Choir Aahs",
    "Voice Oohs",
    "Synth Voice",
    "Orchestra Hit",
    // Brass
    "Trumpet",
    "Trombone",
    "Tuba",
    "Muted Trumpet",
    "French Horn",
    "Brass Section",
    "Synth Brass 1",
    "Synth Brass 2",
    // Reed
    "Soprano Sax",
    "Alto Sax",
    "Tenor Sax",
    "Baritone Sax",
    "Oboe",
    "English Horn",
    "Bassoon",
    "Clarinet",
    // Pipe
    "Piccolo",
    "Flute",
    "Recorder",
    "Pan Flute",
    "Blown Bottle",
    "Shakuhachi",
    "Whistle",
    "Ocarina",
    // Synth lead
    "Lead 1 (Square)",
    "Lead 2 (Sawtooth)",
    "Lead 3 (Calliope)",
    "Lead 4 (Chiff)",
    "Lead 5 (Charang)",
    "Lead 6 (Voice)",
    "Lead 7 (Fifths)",
    "Lead 8 (Bass+Lead)",
    // Synth pad
    "Pad 1 (New Age)",
    "Pad 2 (Warm)",
    "Pad 3 (Polysynth)",
    "Pad 4 (Choir)",
    "Pad 5 (Bowed)",
    "Pad 6 (Metallic)",
    "Pad 7 (Halo)",
    "Pad 8 (Sweep)",
    // Synth effects
    "FX 1 (Rain)",
    "FX 2 (Soundtrack)",
    "FX 3 (Crystal)",
    "FX 4 (Atmosphere)",
    "FX 5 (Brightness)",
    "FX 6 (Goblins)",
    "FX 7 (Echoes)",
    "FX 8 (Sci-fi)",
    // Ethnic
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bagpipe",
    "Fiddle",
    "Shanai",
    // Percussive
    "Tinkle Bell",
    "Agogo",
    "Steel Drums",
    "Woodblock",
    "Taiko Drum",
    "Melodic Tom",
    "Synth Drum",
    "Reverse Cymbal",
    // Sound effects
    "Guitar Fret Noise",
    "Breath Noise",
    "Seashore",
    "Bird Tweet",
    "Telephone Ring",
    "Helicopter",
    "Applause",
    "Gunshot",
];

static CATEGORIES: [&str; 16] = [
    "Piano",
    "Chromatic Percussion",
    "Organ",
    "Guitar",
    "Bass",
    "Strings",
    "Ensemble",
    "Brass",
    "Reed",
    "Pipe",
    "Synth Lead",
    "Synth Pad",
    "Synth Effects",
    "Ethnic",
    "Percussive",
    "Sound Effects",
];

static DRUM_KITS: [&str; 9] = [
    "Standard",
    "Room",
    "Power",
    "Electronic",
    "TR-808",
    "Jazz",
    "Brush",
    "Orchestra",
    "SFX",
];

/// Key of the first named percussion sound.
const FIRST_DRUM: u8 = 27;

static DRUMS: [&str; 61] = [
    "High Q",
    "Slap",
    "Scratch Push",
    "Scratch Pull",
    "Sticks",
    "Square Click",
    "Metronome Click",
    "Metronome Bell",
    "Acoustic Bass Drum",
    "Bass Drum",
    "Side Stick",
    "Acoustic Snare",
    "Hand Clap",
    "Electric Snare",
    "Low Floor Tom",
    "Closed Hi-Hat",
    "High Floor Tom",
    "Pedal Hi-Hat",
    "Low Tom",
    "Open Hi-Hat",
    "Low-Mid Tom",
    "High-Mid Tom",
    "Crash Cymbal 1",
    "High Tom",
    "Ride Cymbal 1",
    "Chinese Cymbal",
    "Ride Bell",
    "Tambourine",
    "Splash Cymbal",
    "Cowbell",
    "Crash Cymbal 2",
    "Vibra Slap",
    "Ride Cymbal 2",
    "Hi Bongo",
    "Lo Bongo",
    "Mute High Conga",
    "Open High Conga",
    "Low Conga",
    "High Timbale",
    "Low Timbale",
    "High Agogo",
    "Low Agogo",
    "Cabasa",
    "Maracas",
    "Short Whistle",
    "Long Whistle",
    "Short Guiro",
    "Long Guiro",
    "Claves",
    "High Wood Block",
    "Low Wood Block",
    "Mute Cuica",
    "Open Cuica",
    "Mute Triangle",
    "Open Triangle",
    "Shaker",
    "Jingle Bell",
    "Bell Tree",
    "Castanets",
    "Mute Surdo",
    "Open Surdo",
];

const UNDEF: &str = "Undefined";

static CONTROLLERS: [&str; 128] = [
    "Bank Select",
    "Modulation Depth",
    "Breath Controller",
    UNDEF,
    "Foot Controller",
    "Portamento Time",
    "Data Entry",
    "Volume",
    "Balance",
    UNDEF,
    "Pan",
    "Expression",
    UNDEF,
    UNDEF,
    UNDEF,
    UNDEF,
    "General Purpose 1",
    "General Purpose 2",
    "General Purpose 3",
    "General Purpose 4",
    // 20 ..= 31
    UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF,
    // Least significant bytes of 0 ..= 31
    "LSB 32", "LSB 33", "LSB 34", "LSB 35", "LSB 36", "LSB 37", "LSB 38", "LSB 39",
    "LSB 40", "LSB 41", "LSB 42", "LSB 43", "LSB 44", "LSB 45", "LSB 46", "LSB 47",
    "LSB 48", "LSB 49", "LSB 50", "LSB 51", "LSB 52", "LSB 53", "LSB 54", "LSB 55",
    "LSB 56", "LSB 57", "LSB 58", "LSB 59", "LSB 60", "LSB 61", "LSB 62", "LSB 63",
    "Sustain Pedal",
    "Portamento",
    "Sostenuto Pedal",
    "Soft Pedal",
    "Legato Switch",
    "Hold 2",
    "Sound Variation",
    "Harmonic Content",
    "Release Time",
    "Attack Time",
    "Brightness",
    "Reverb",
    "Delay",
    "Pitch Transpose",
    "Flange",
    "Special FX",
    "General Purpose 5",
    "General Purpose 6",
    "General Purpose 7",
    "General Purpose 8",
    "Portamento Control",
    // 85 ..= 90
    UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF,
    "Reverb Depth",
    "Tremolo Depth",
    "Chorus Depth",
    "Celeste Depth",
    "Phaser Depth",
    "Data Increment",
    "Data Decrement",
    "Non Reg Param LSB",
    "Non Reg Param MSB",
    "Reg Param LSB",
    "Reg Param MSB",
    // 102 ..= 119
    UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF,
    UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF, UNDEF,
    "All Sound Off",
    "Reset All Controllers",
    "Local Control",
    "All Notes Off",
    "Omni Mode Off",
    "Omni Mode On",
    "Mono Mode On",
    "Poly Mode On",
];

static NOTES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

static NOTES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Major keys from 7 flats to 7 sharps.
static KEY_SIGNATURES: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];

/// The General MIDI instrument for a program number.
#[inline]
pub fn patch_name(program: u7) -> &'static str {
    PATCHES[program.as_int() as usize]
}

/// The instrument family a program number belongs to.
#[inline]
pub fn patch_category(program: u7) -> &'static str {
    CATEGORIES[program.as_int() as usize / 8]
}

/// Names of the common drum kits, by index.
#[inline]
pub fn drum_kit_name(kit: usize) -> Option<&'static str> {
    DRUM_KITS.get(kit).copied()
}

/// The percussion sound mapped to a key on the drum channel, if any.
pub fn drum_name(key: u7) -> Option<&'static str> {
    let idx = key.as_int().checked_sub(FIRST_DRUM)?;
    DRUMS.get(idx as usize).copied()
}

#[inline]
pub fn controller_name(controller: u7) -> &'static str {
    CONTROLLERS[controller.as_int() as usize]
}

/// The pitch class of a key, spelled with sharps or flats.
#[inline]
pub fn note_name(key: u7, sharps: bool) -> &'static str {
    let table = if sharps { &NOTES_SHARP } else { &NOTES_FLAT };
    table[key.as_int() as usize % 12]
}

/// The octave of a key, counting key 0 as octave 0.
#[inline]
pub fn note_octave(key: u7) -> u8 {
    key.as_int() / 12
}

/// The major key with the given amount of sharps (positive) or flats (negative).
pub fn key_signature_name(sharps: i8) -> Option<&'static str> {
    let idx = sharps.checked_add(7)?;
    if idx < 0 {
        return None;
    }
    KEY_SIGNATURES.get(idx as usize).copied()
}
