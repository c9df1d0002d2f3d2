//! RMID files are Standard Midi Files wrapped in a RIFF container.
//!
//! They are supported by locating the `data` chunk of the `RMID` form and parsing it as a plain
//! SMF.

use crate::prelude::*;

/// Walks little-endian RIFF chunks, tolerating a truncated last chunk.
struct RiffChunks<'a> {
    raw: &'a [u8],
}
impl<'a> Iterator for RiffChunks<'a> {
    type Item = ([u8; 4], &'a [u8]);
    fn next(&mut self) -> Option<([u8; 4], &'a [u8])> {
        let head = self.raw.split_checked(8)?;
        let mut id = [0; 4];
        id.copy_from_slice(&head[..4]);
        let len = u32::from_le_bytes([head[4], head[5], head[6], head[7]]) as usize;
        let data = match self.raw.split_checked(len) {
            Some(data) => data,
            None => mem::replace(&mut self.raw, &[]),
        };
        //Chunks are padded to an even length
        if len % 2 == 1 {
            let _pad = self.raw.split_checked(1);
        }
        Some((id, data))
    }
}

/// Get the embedded SMF out of an RMID file.
///
/// Returns `None` if `raw` is not an RMID file at all, so that the caller can fall back to reading
/// it as a bare SMF.
/// An RMID file without a `data` chunk is an error.
pub(crate) fn unwrap_rmid(raw: &[u8]) -> Option<Result<&[u8]>> {
    let (id, mut form) = RiffChunks { raw }.next()?;
    if &id != b"RIFF" || form.split_checked(4)? != b"RMID" {
        return None;
    }
    let data = RiffChunks { raw: form }
        .find(|(id, _)| id == b"data")
        .map(|(_, data)| data)
        .ok_or_else(|| err_invalid!("rmid file without a data chunk").into());
    Some(data)
}
