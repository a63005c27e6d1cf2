//! The read buffer: a single growable byte region, owned by the parser,
//! tracking `len` and `pos`.

use std::io;

use crate::io::{Append, Source};

/// Pre-allocated size, and the size of each fill call.
pub const INITIAL_BUFFER_SIZE: usize = 4096;

const TRIM_MIN_LEN: usize = 4096;
const TRIM_MIN_POS: usize = 2048;

/// `0 <= pos <= len <= capacity(buffer)` is maintained at every public
/// boundary; bytes `[pos, len)` are unconsumed input from the source.
#[derive(Debug, Default)]
pub struct ReadBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl ReadBuffer {
    pub fn new() -> Self {
        ReadBuffer {
            data: Vec::with_capacity(INITIAL_BUFFER_SIZE),
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Unconsumed byte count, `[pos, len)`.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn current(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn at(&self, index: usize) -> u8 {
        self.data[index]
    }

    pub fn slice(&self, start: usize, len: usize) -> &[u8] {
        &self.data[start..start + len]
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn advance_by(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Returns up to `max` bytes of the unconsumed prefix, as a
    /// `(start, len)` span, and advances `pos` past it. Does not touch
    /// the source — this is the "buffered-only" read.
    pub fn take_buffered(&mut self, max: usize) -> (usize, usize) {
        let available = self.remaining();
        let take = available.min(max);
        let start = self.pos;
        self.pos += take;
        (start, take)
    }

    /// Appends up to `max` new bytes from `source`. Returns the number of
    /// bytes appended; zero means EOF.
    pub fn fill<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        max: usize,
    ) -> io::Result<usize> {
        let before = self.data.len();
        let added = source.fill(&mut self.data, max, Append::End)?;
        debug_assert_eq!(self.data.len(), before + added);
        Ok(added)
    }

    /// Ensures at least one unconsumed byte is available, filling from
    /// `source` (in [`INITIAL_BUFFER_SIZE`]-byte steps) if necessary.
    /// Returns `false` at EOF.
    pub fn ensure_byte<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> io::Result<bool> {
        if !self.is_exhausted() {
            return Ok(true);
        }
        loop {
            let added = self.fill(source, INITIAL_BUFFER_SIZE)?;
            if added == 0 {
                return Ok(false);
            }
            if !self.is_exhausted() {
                return Ok(true);
            }
        }
    }

    /// Advances past the current byte, refilling if that was the last
    /// buffered byte. Returns `false` at EOF.
    pub fn advance_and_ensure<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> io::Result<bool> {
        self.pos += 1;
        self.ensure_byte(source)
    }

    /// Rewinds the unconsumed tail to offset zero when the consumed
    /// prefix dominates the buffer. Called before each new header parse
    /// and before each chunked body parse.
    pub fn trim(&mut self) {
        let len = self.data.len();
        let pos = self.pos;
        let left = len - pos;

        if len < TRIM_MIN_LEN || pos < TRIM_MIN_POS || left >= pos {
            return;
        }

        self.data.copy_within(pos..len, 0);
        self.data.truncate(left);
        self.pos = 0;
    }
}
