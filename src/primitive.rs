//! Simple building-block data that can be read in one go.
//! Primitives advance the read slice when read.

use crate::prelude::*;

pub(crate) trait SplitChecked: Sized {
    fn split_checked(&mut self, at: usize) -> Option<Self>;
}
impl<'a> SplitChecked for &'a [u8] {
    #[inline]
    fn split_checked(&mut self, at: usize) -> Option<&'a [u8]> {
        if at > self.len() {
            None
        } else {
            let (extracted, remainder) = self.split_at(at);
            *self = remainder;
            Some(extracted)
        }
    }
}

/// Implemented on integer types for reading as big-endian.
pub(crate) trait IntRead: Sized {
    /// Reads a big-endian integer.
    fn read(data: &mut &[u8]) -> StdResult<Self, &'static ErrorKind>;
}

/// Implement simple big endian integer reads.
macro_rules! impl_read_int {
    {$( $int:ty ),*} => {
        $(
            impl IntRead for $int {
                #[inline]
                fn read(raw: &mut &[u8]) -> StdResult<$int, &'static ErrorKind> {
                    let bytes = raw.split_checked(mem::size_of::<$int>())
                        .ok_or(err_invalid!("failed to read the expected integer"))?;
                    Ok(bytes.iter().fold(0, |acc: $int, byte| {
                        acc.checked_shl(8).unwrap_or(0) | *byte as $int
                    }))
                }
            }
        )*
    }
}
impl_read_int! {u8,u16,u32}

/// Slightly restricted integers.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl From<$inner> for $name {
            /// Lossy conversion, loses the top bits.
            #[inline]
            fn from(raw: $inner) -> $name {
                $name::new(raw)
            }
        }
        impl From<$name> for $inner {
            #[inline]
            fn from(restricted: $name) -> $inner {restricted.0}
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl $name {
            const MASK: $inner = (1 << $bits) - 1;

            /// The maximum value that this restricted integer can hold.
            #[inline]
            pub const fn max_value() -> $name {
                $name(Self::MASK)
            }

            /// Creates a restricted int from its non-restricted counterpart by masking off the
            /// extra bits.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                $name(raw & Self::MASK)
            }

            /// Returns `Some` if the raw integer is within range of the restricted integer, and
            /// `None` otherwise.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw <= Self::MASK {
                    Some($name(raw))
                } else {
                    None
                }
            }

            /// Get the inner integer out of the wrapper.
            /// The inner integer is guaranteed to be in range of the restricted wrapper.
            #[inline]
            pub const fn as_int(self) -> $inner {
                self.0
            }

            #[allow(dead_code)]
            #[inline]
            pub(crate) fn check_int(raw: $inner) -> StdResult<$name, &'static ErrorKind> {
                Self::try_from(raw).ok_or_else(
                    || err_malformed!("data byte with top bit set")
                )
            }
        }
        impl PartialEq<$inner> for $name {
            fn eq(&self, rhs: &$inner) -> bool {
                self.as_int() == *rhs
            }
        }
        impl PartialOrd<$inner> for $name {
            fn partial_cmp(&self, rhs: &$inner) -> Option<cmp::Ordering> {
                Some(self.as_int().cmp(rhs))
            }
        }
    };
}
restricted_int! {
    /// A 15-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top bit is always zero.
    u15: u16 => 15
}
restricted_int! {
    /// A 14-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top two bits are always zero.
    u14: u16 => 14
}
restricted_int! {
    /// A 7-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top bit is always zero.
    u7: u8 => 7
}
restricted_int! {
    /// A 4-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top 4 bits are always zero.
    u4: u8 => 4
}
restricted_int! {
    /// A 24-bit integer type.
    ///
    /// Wraps the `u32` type and ensures that the top 8 bits are always zero.
    u24: u32 => 24
}
restricted_int! {
    /// Referred to in the MIDI standard as "variable length quantity".
    u28: u32 => 28
}

impl IntRead for u24 {
    fn read(raw: &mut &[u8]) -> StdResult<u24, &'static ErrorKind> {
        let bytes = raw
            .split_checked(3)
            .ok_or(err_invalid!("failed to read u24 bytes"))?;
        //Using lossy `new` because value is guaranteed to be 24 bits (3 bytes)
        Ok(u24::new(
            bytes.iter().fold(0, |acc, byte| (acc << 8) | *byte as u32),
        ))
    }
}

impl u28 {
    /// Read a variable-length quantity.
    ///
    /// Running out of bytes is reported as `UnexpectedEndOfTrack`, since VLQs only occur inside
    /// track chunks.
    /// More than 4 bytes yields `too_long`.
    pub(crate) fn read_vlq(
        raw: &mut &[u8],
        too_long: &'static ErrorKind,
    ) -> StdResult<u28, &'static ErrorKind> {
        let mut int: u32 = 0;
        for _ in 0..4 {
            let byte = raw.split_checked(1).ok_or(err_eot!())?[0];
            int = (int << 7) | bit_range(byte, 0..7) as u32;
            if bit_range(byte, 7..8) == 0 {
                //At most 4 reads of 7 bits each, so the int fits in 28 bits
                return Ok(u28::new(int));
            }
        }
        Err(too_long)
    }

    pub(crate) fn write_vlq<W: Write>(&self, out: &mut W) -> IoResult<W> {
        let int = self.as_int();
        let mut buf = [0; 4];
        let mut len = 0;
        for i in (0..4).rev() {
            let byte = ((int >> (i * 7)) & 0x7F) as u8;
            if len == 0 && byte == 0 && i != 0 {
                //Skip leading zeros
                continue;
            }
            buf[len] = if i == 0 { byte } else { byte | 0x80 };
            len += 1;
        }
        out.write_all(&buf[..len])
    }
}

/// Read a variable-length quantity (as used by SMF delta times) from the start of `raw`,
/// advancing the slice past it.
///
/// Fails with `InvalidDeltaTime` if the quantity spans more than 4 bytes, and with
/// `UnexpectedEndOfTrack` if `raw` ends in the middle of it.
pub fn read_vlq(raw: &mut &[u8]) -> Result<u32> {
    Ok(u28::read_vlq(raw, err_delta!())?.as_int())
}

/// Write a variable-length quantity.
///
/// Values over `2^28 - 1` cannot be represented and produce an `invalid_input` error from the
/// writer.
pub fn write_vlq<W: Write>(value: u32, out: &mut W) -> IoResult<W> {
    let value = u28::try_from(value).ok_or_else(|| W::invalid_input("vlq exceeds 28 bits"))?;
    value.write_vlq(out)
}

/// Reads a slice represented in the input as a VLQ `len` followed by `len` bytes.
pub(crate) fn read_varlen_slice<'a>(raw: &mut &'a [u8]) -> StdResult<&'a [u8], &'static ErrorKind> {
    let len = u28::read_vlq(raw, err_malformed!("varlen length longer than 4 bytes"))?.as_int();
    raw.split_checked(len as usize).ok_or(err_eot!())
}

/// Write a slice represented as a VLQ length and then the raw bytes.
pub(crate) fn write_varlen_slice<W: Write>(slice: &[u8], out: &mut W) -> IoResult<W> {
    let len = u32::try_from(slice.len())
        .ok()
        .and_then(u28::try_from)
        .ok_or_else(|| W::invalid_input("varlen slice exceeds 28 bits"))?;
    len.write_vlq(out)?;
    out.write_all(slice)
}

/// The order in which tracks should be laid out when playing back an SMF file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// A single track holding every channel.
    SingleTrack,
    /// Several tracks that should be played simultaneously.
    ///
    /// Usually the first track carries tempo and other song metadata.
    Parallel,
    /// Several independent songs, played one after the other.
    Sequential,
}
impl Format {
    pub(crate) fn read(raw: &mut &[u8]) -> Result<Format> {
        let format = u16::read(raw)?;
        Ok(match format {
            0 => Format::SingleTrack,
            1 => Format::Parallel,
            2 => Format::Sequential,
            _ => bail!(err_invalid!("invalid smf format")),
        })
    }

    pub(crate) fn encode(&self) -> [u8; 2] {
        let code: u16 = match self {
            Format::SingleTrack => 0,
            Format::Parallel => 1,
            Format::Sequential => 2,
        };
        code.to_be_bytes()
    }
}

/// Read the division field of an SMF header.
///
/// Only metrical divisions (pulses per quarter note) are supported.
pub(crate) fn read_division(raw: &mut &[u8]) -> Result<u15> {
    let raw = u16::read(raw).context(err_invalid!("unexpected eof when reading midi division"))?;
    ensure!(bit_range(raw, 15..16) == 0, err_division!());
    let ppqn = u15::new(raw);
    ensure!(ppqn.as_int() > 0, err_invalid!("zero pulses per quarter note"));
    Ok(ppqn)
}

/// A timestamp encoding an SMPTE time of the day, as carried by the SMPTE Offset meta event.
///
/// Enforces several guarantees:
///
/// - `hour` is inside [0, 23]
/// - `minute` is inside [0, 59]
/// - `second` is inside [0, 59]
/// - `frame` is inside [0, fps - 1]
/// - `subframe` is inside [0, 99]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SmpteTime {
    hour: u8,
    minute: u8,
    second: u8,
    frame: u8,
    subframe: u8,
    fps: Fps,
}
impl SmpteTime {
    /// Create a new SMPTE timestamp with the given information.
    #[inline]
    pub fn new(
        hour: u8,
        minute: u8,
        second: u8,
        frame: u8,
        subframe: u8,
        fps: Fps,
    ) -> Option<SmpteTime> {
        let valid = hour < 24
            && minute < 60
            && second < 60
            && frame < fps.as_int()
            && subframe < 100;
        if valid {
            Some(SmpteTime {
                hour,
                minute,
                second,
                frame,
                subframe,
                fps,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[inline]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    #[inline]
    pub fn second(&self) -> u8 {
        self.second
    }

    #[inline]
    pub fn frame(&self) -> u8 {
        self.frame
    }

    /// Hundredths of a frame.
    #[inline]
    pub fn subframe(&self) -> u8 {
        self.subframe
    }

    #[inline]
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Convert the whole timestamp into microseconds since midnight.
    pub fn as_micros(&self) -> u64 {
        let secs = (self.hour as u64 * 60 + self.minute as u64) * 60 + self.second as u64;
        let frame_us = 1_000_000.0 / self.fps.as_f64();
        secs * 1_000_000
            + ((self.frame as f64 + self.subframe as f64 / 100.0) * frame_us) as u64
    }

    pub(crate) fn read(raw: &mut &[u8]) -> StdResult<SmpteTime, &'static ErrorKind> {
        let data = raw
            .split_checked(5)
            .ok_or(err_malformed!("failed to read smpte time data"))?;
        let hour_fps = data[0];
        let (hour, fps) = (bit_range(hour_fps, 0..5), bit_range(hour_fps, 5..7));
        SmpteTime::new(hour, data[1], data[2], data[3], data[4], Fps::from_code(fps))
            .ok_or(err_malformed!("invalid smpte time"))
    }

    pub(crate) fn encode(&self) -> [u8; 5] {
        [
            self.hour | self.fps.as_code() << 5,
            self.minute,
            self.second,
            self.frame,
            self.subframe,
        ]
    }
}

/// One of the four FPS values available for SMPTE times, as defined by the MIDI standard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Fps {
    Fps24,
    Fps25,
    /// Actually `29.97 = 30 / 1.001` frames per second.
    Fps29,
    Fps30,
}
impl Fps {
    /// Does the conversion from a 2-bit fps code to an `Fps` value.
    fn from_code(code: u8) -> Fps {
        match code & 0b11 {
            0 => Fps::Fps24,
            1 => Fps::Fps25,
            2 => Fps::Fps29,
            _ => Fps::Fps30,
        }
    }

    fn as_code(self) -> u8 {
        match self {
            Fps::Fps24 => 0,
            Fps::Fps25 => 1,
            Fps::Fps29 => 2,
            Fps::Fps30 => 3,
        }
    }

    /// Get the integral approximate fps out.
    #[inline]
    pub fn as_int(self) -> u8 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps29 => 29,
            Fps::Fps30 => 30,
        }
    }

    /// Get the actual fps out.
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Fps::Fps29 => 30.0 / 1.001,
            other => other.as_int() as f64,
        }
    }
}
