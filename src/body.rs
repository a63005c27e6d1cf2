//! Body-framing: which of the two strategies governs the current
//! message, and the chunked-transfer phase machine.
//!
//! A direct descendant of `tk-http`'s `chunked::State` /
//! `body_parser::BodyProgress`, adapted from passive buffer-inspection
//! (`check_buf`/`parse`/`consume` against a shared `tk_bufstream::Buf`) to
//! this crate's pull model: the state machine here also drives reads from
//! the source itself once the buffered prefix runs dry, and is walked by
//! `Parser` rather than by the connection's read-buf owner.

use std::io;

use crate::io::{Append, ReadMethod, Source};

/// How body framing was resolved for the current message, set by
/// `Parser::detect_body_read_mode` on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Unknown,
    ContentLength,
    Chunked,
    None,
}

/// Where a chunked body stands: waiting on a size line, partway through a
/// chunk's data, waiting on the postfix line after a chunk (`final_chunk`
/// marks the postfix after the zero-size terminator), or fully consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPhase {
    Size,
    Data(u64),
    Postfix { final_chunk: bool },
    Done,
}

impl Default for ChunkPhase {
    fn default() -> Self {
        ChunkPhase::Size
    }
}

/// A source that always reports EOF without touching any real transport.
///
/// Passing this in place of the parser's real source to a tokenizer call
/// turns that call into a pure buffer inspection: any token not already
/// fully resident in the buffer comes back `Ok(None)` (insufficient data)
/// rather than blocking or erroring, which is exactly what a
/// `buffered_only` body read needs without duplicating tokenizer logic.
pub struct NullSource;

impl Source for NullSource {
    fn read_method(&self) -> ReadMethod {
        ReadMethod::Call
    }

    fn fill(&mut self, _buf: &mut Vec<u8>, _max: usize, _append: Append) -> io::Result<usize> {
        Ok(0)
    }
}
