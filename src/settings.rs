//! User-facing settings of the host: input channel, key range, transposition, tempo and record
//! switch.

use crate::{filter::InputFilter, gm::DEFAULT_BPM, prelude::*};

/// Lowest tempo whose quarter note length fits in a tempo meta event.
const MIN_BPM: u16 = 4;

/// Highest tempo accepted by the settings.
const MAX_BPM: u16 = 999;

/// The host settings, as edited in the settings window and persisted between runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HostSettings {
    /// Channel that all input is moved to. `None` keeps every channel as received.
    pub channel: Option<u4>,
    /// Lowest key let through.
    pub low_key: u7,
    /// Highest key let through.
    pub high_key: u7,
    /// Semitones added to every input note.
    pub transpose: i8,
    /// Tempo for recordings, in beats per minute.
    pub tempo_bpm: u16,
    /// Whether live input is recorded.
    pub record_enabled: bool,
}
impl Default for HostSettings {
    fn default() -> HostSettings {
        HostSettings {
            channel: None,
            low_key: u7::new(0),
            high_key: u7::max_value(),
            transpose: 0,
            tempo_bpm: DEFAULT_BPM,
            record_enabled: false,
        }
    }
}
impl HostSettings {
    /// Check that the settings make sense together.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.low_key <= self.high_key,
            err_invalid!("low key is above high key")
        );
        ensure!(
            self.transpose != i8::MIN,
            err_invalid!("transpose out of range")
        );
        ensure!(
            self.tempo_bpm >= MIN_BPM && self.tempo_bpm <= MAX_BPM,
            err_invalid!("tempo out of range")
        );
        Ok(())
    }

    /// The input filter described by these settings.
    pub fn input_filter(&self) -> InputFilter {
        InputFilter {
            channel: self.channel,
            low: self.low_key,
            high: self.high_key,
            transpose: self.transpose,
        }
    }
}
