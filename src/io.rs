//! Byte sinks for the MIDI encoders.
//!
//! Encoding goes through the crate's own [`Write`](trait.Write.html) trait instead of
//! `std::io::Write`, so that the realtime output path can encode into a fixed stack buffer
//! ([`Cursor`](struct.Cursor.html)) without `std` and without allocating.

use crate::prelude::*;

pub type IoResult<W> = StdResult<(), <W as Write>::Error>;

/// A destination for encoded MIDI bytes.
pub trait Write {
    type Error;
    fn write_all(&mut self, buf: &[u8]) -> IoResult<Self>;
    fn invalid_input(msg: &'static str) -> Self::Error;
}

impl Write for Vec<u8> {
    type Error = &'static str;
    fn write_all(&mut self, buf: &[u8]) -> IoResult<Self> {
        self.extend_from_slice(buf);
        Ok(())
    }
    fn invalid_input(msg: &'static str) -> &'static str {
        msg
    }
}

/// Writes into a fixed slice, failing once it is full.
///
/// Used by the output callback to turn queued events back into wire bytes.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a mut [u8],
    cur: usize,
}
impl<'a> Cursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Cursor<'a> {
        Cursor { buf, cur: 0 }
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.cur]
    }

    pub fn cursor(&self) -> usize {
        self.cur
    }

    /// Forget everything written so far, keeping the buffer.
    pub fn reset(&mut self) {
        self.cur = 0;
    }
}
impl<'a> Write for Cursor<'a> {
    type Error = CursorError;
    fn write_all(&mut self, buf: &[u8]) -> IoResult<Self> {
        //Cannot overflow because `cur <= buf.len()` always holds
        let up_to = self.cur + buf.len();
        if up_to > self.buf.len() {
            //Write nothing, so that a message is never sent half-way
            Err(CursorError::OutOfSpace)
        } else {
            self.buf[self.cur..up_to].copy_from_slice(buf);
            self.cur = up_to;
            Ok(())
        }
    }
    fn invalid_input(msg: &'static str) -> CursorError {
        CursorError::InvalidInput(msg)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CursorError {
    OutOfSpace,
    InvalidInput(&'static str),
}

/// Adapts any `std::io::Write` into a MIDI byte sink.
#[cfg(feature = "std")]
pub struct IoWrap<T>(pub T);
#[cfg(feature = "std")]
impl<T: io::Write> Write for IoWrap<T> {
    type Error = io::Error;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.0, buf)
    }
    fn invalid_input(msg: &'static str) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidInput, msg)
    }
}
