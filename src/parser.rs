//! The message parser and body reader.
//!
//! `Parser<S>` owns one [`ReadBuffer`] and one `S: Source`, is bound to a
//! [`Mode`] at construction, and is reused across successive messages on
//! the same connection: `parse_headers` trims the buffer, drives the
//! tokenizer, and hands back the headers mapping for one message, after
//! which pipelined bytes of the next message (if any) stay buffered.

use log::{debug, trace};

use crate::body::{ChunkPhase, Framing, NullSource};
use crate::buffer::ReadBuffer;
use crate::error::{Error, ParseError, Result};
use crate::headers::{self, Headers};
use crate::io::{Sink, Source, Splice};
use crate::limits::{Limits, MAX_BODY_READ_LENGTH};
use crate::tokenizer;

/// Which side of the conversation this parser reads: a server reads
/// requests, a client reads responses. Fixed for the parser's lifetime —
/// there is no runtime "invalid mode" failure because the type can only
/// ever name one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Client,
}

pub struct Parser<S> {
    source: S,
    mode: Mode,
    limits: Limits,
    buf: ReadBuffer,
    headers: Option<Headers>,
    framing: Framing,
    body_left: u64,
    chunk_phase: ChunkPhase,
    request_completed: bool,
}

impl<S: Source> Parser<S> {
    pub fn new(source: S, mode: Mode) -> Self {
        Parser::with_limits(source, mode, Limits::default())
    }

    pub fn with_limits(source: S, mode: Mode, limits: Limits) -> Self {
        Parser {
            source,
            mode,
            limits,
            buf: ReadBuffer::new(),
            headers: None,
            framing: Framing::Unknown,
            body_left: 0,
            chunk_phase: ChunkPhase::Size,
            request_completed: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    /// Parses one request (server mode) or response (client mode) header
    /// block. `Ok(None)` means the source hit EOF before any byte of a new
    /// message arrived — not an error. A malformed byte raises
    /// immediately and clears the stored headers.
    pub fn parse_headers(&mut self) -> Result<Option<&Headers>> {
        self.buf.trim();
        let initial_pos = self.buf.pos();

        if !self.buf.ensure_byte(&mut self.source)? {
            trace!("eof before any byte of a new message");
            self.headers = None;
            return Ok(None);
        }

        match self.parse_headers_inner() {
            Ok(Some(mut headers)) => {
                let rx = (self.buf.pos() - initial_pos) as i64;
                headers.set(crate::headers::RX, rx);
                debug!("parsed headers, rx={}", rx);
                self.framing = Framing::Unknown;
                self.request_completed = false;
                self.headers = Some(headers);
                Ok(self.headers.as_ref())
            }
            Ok(None) => {
                trace!("eof mid-message during header parse");
                self.headers = None;
                Ok(None)
            }
            Err(e) => {
                self.headers = None;
                Err(e)
            }
        }
    }

    fn parse_headers_inner(&mut self) -> Result<Option<Headers>> {
        let mut headers = Headers::new();
        match self.mode {
            Mode::Server => {
                let method = match tokenizer::parse_method(&mut self.buf, &mut self.source, &self.limits)? {
                    Some(m) => m,
                    None => return Ok(None),
                };
                let target = match tokenizer::parse_request_target(&mut self.buf, &mut self.source, &self.limits)? {
                    Some(t) => t,
                    None => return Ok(None),
                };
                let protocol = match tokenizer::parse_request_protocol(&mut self.buf, &mut self.source, &self.limits)? {
                    Some(p) => p,
                    None => return Ok(None),
                };
                headers.set(crate::headers::METHOD, method);
                headers.set(crate::headers::PATH, target);
                headers.set(crate::headers::PROTOCOL, protocol);
            }
            Mode::Client => {
                let protocol = match tokenizer::parse_status_protocol(&mut self.buf, &mut self.source)? {
                    Some(p) => p,
                    None => return Ok(None),
                };
                let status = match tokenizer::parse_status_code(&mut self.buf, &mut self.source)? {
                    Some(s) => s,
                    None => return Ok(None),
                };
                let message = match tokenizer::parse_status_message(&mut self.buf, &mut self.source, &self.limits)? {
                    Some(m) => m,
                    None => return Ok(None),
                };
                headers.set(crate::headers::PROTOCOL, protocol);
                headers.set(crate::headers::STATUS, status);
                headers.set(crate::headers::STATUS_MESSAGE, message);
            }
        }

        let mut count = 0usize;
        loop {
            let key = match tokenizer::parse_header_key(&mut self.buf, &mut self.source, &self.limits)? {
                Some(k) => k,
                None => return Ok(None),
            };
            let key = match key {
                Some(k) => k,
                None => break, // empty line: end of headers
            };
            count += 1;
            if count > self.limits.max_header_count {
                return Err(ParseError::TooManyHeaders.into());
            }
            let value = match tokenizer::parse_header_value(&mut self.buf, &mut self.source, &self.limits)? {
                Some(v) => v,
                None => return Ok(None),
            };
            headers.push_header(key, value);
        }
        Ok(Some(headers))
    }

    /// Resolves body framing for the current message from its headers.
    /// Called lazily by `is_complete` and every body-reading entry point.
    fn detect_body_read_mode(&mut self) -> Result<()> {
        let headers = self
            .headers
            .as_ref()
            .expect("detect_body_read_mode called with no parsed headers");
        if let Some(raw) = headers.get_str(headers::content_length_key()) {
            let n = headers::parse_content_length(raw)
                .ok_or(ParseError::InvalidBodyContentLength)?;
            self.framing = Framing::ContentLength;
            self.body_left = n;
            self.request_completed = n == 0;
        } else if headers
            .get_str(headers::transfer_encoding_key())
            .map(headers::is_chunked)
            .unwrap_or(false)
        {
            self.framing = Framing::Chunked;
            self.chunk_phase = ChunkPhase::Size;
            self.request_completed = false;
        } else {
            self.framing = Framing::None;
            self.request_completed = true;
        }
        Ok(())
    }

    fn ensure_framing(&mut self) -> Result<()> {
        if self.framing == Framing::Unknown && self.headers.is_some() {
            self.detect_body_read_mode()?;
        }
        Ok(())
    }

    /// Preserves the original's lazy detection: the first call after
    /// headers parse resolves framing, which may flip this from an
    /// implicit "unknown" to true (no body) on the spot.
    pub fn is_complete(&mut self) -> Result<bool> {
        self.ensure_framing()?;
        Ok(self.request_completed)
    }

    fn add_rx(&mut self, n: u64) {
        if let Some(headers) = self.headers.as_mut() {
            let prior = headers.rx().unwrap_or(0);
            headers.set(crate::headers::RX, prior + n as i64);
        }
    }

    fn chunk_size(&mut self, buffered_only: bool) -> Result<Option<u64>> {
        if buffered_only {
            tokenizer::parse_chunk_size(&mut self.buf, &mut NullSource, &self.limits)
        } else {
            tokenizer::parse_chunk_size(&mut self.buf, &mut self.source, &self.limits)
        }
    }

    fn chunk_postfix(&mut self, buffered_only: bool) -> Result<Option<()>> {
        if buffered_only {
            tokenizer::parse_chunk_postfix(&mut self.buf, &mut NullSource)
        } else {
            tokenizer::parse_chunk_postfix(&mut self.buf, &mut self.source)
        }
    }

    /// Reads the entire body (content-length or chunked) as one byte
    /// string, blocking on the source as needed. `:rx` is updated on
    /// completion.
    pub fn read_body(&mut self) -> Result<Vec<u8>> {
        self.ensure_framing()?;
        match self.framing {
            Framing::None => Ok(Vec::new()),
            Framing::ContentLength => self.read_cl_all(),
            Framing::Chunked => self.read_chunked_all(),
            Framing::Unknown => Ok(Vec::new()),
        }
    }

    /// Returns the next available body slice. With `buffered_only`,
    /// returns only bytes already resident in the buffer (possibly none)
    /// without invoking the source.
    pub fn read_body_chunk(&mut self, buffered_only: bool) -> Result<Vec<u8>> {
        self.ensure_framing()?;
        match self.framing {
            Framing::None => Ok(Vec::new()),
            Framing::ContentLength => self.read_cl_chunk(buffered_only),
            Framing::Chunked => self.read_chunked_chunk(buffered_only),
            Framing::Unknown => Ok(Vec::new()),
        }
    }

    /// Transfers body bytes directly to `sink` via the adapter's splice
    /// capability, consuming the buffered prefix through the sink's write
    /// method first.
    pub fn splice_body_to(&mut self, sink: &mut dyn Sink) -> Result<u64>
    where
        S: Splice,
    {
        self.ensure_framing()?;
        match self.framing {
            Framing::None => Ok(0),
            Framing::ContentLength => self.splice_cl(sink),
            Framing::Chunked => self.splice_chunked(sink),
            Framing::Unknown => Ok(0),
        }
    }

    // -- content-length -------------------------------------------------

    fn cl_remaining_usize(&self) -> usize {
        self.body_left.min(usize::MAX as u64) as usize
    }

    fn read_cl_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while self.body_left > 0 {
            let (start, len) = self.buf.take_buffered(self.cl_remaining_usize());
            if len > 0 {
                out.extend_from_slice(self.buf.slice(start, len));
                self.body_left -= len as u64;
                continue;
            }
            let want = self.cl_remaining_usize().min(MAX_BODY_READ_LENGTH);
            let n = self.buf.fill(&mut self.source, want)?;
            if n == 0 {
                return Err(ParseError::IncompleteBody.into());
            }
        }
        self.request_completed = true;
        self.add_rx(out.len() as u64);
        Ok(out)
    }

    fn read_cl_chunk(&mut self, buffered_only: bool) -> Result<Vec<u8>> {
        if self.body_left == 0 {
            self.request_completed = true;
            return Ok(Vec::new());
        }
        let (start, len) = self.buf.take_buffered(self.cl_remaining_usize());
        let mut out = self.buf.slice(start, len).to_vec();
        self.body_left -= len as u64;
        // Taking the buffered prefix never satisfies the whole read on its
        // own unless it happened to cover all of `body_left`: whatever is
        // left over always gets exactly one source fill, buffered or not.
        if !buffered_only && self.body_left > 0 {
            let want = self.cl_remaining_usize().min(MAX_BODY_READ_LENGTH);
            let n = self.buf.fill(&mut self.source, want)?;
            if n == 0 {
                return Err(ParseError::IncompleteBody.into());
            }
            let (start2, len2) = self.buf.take_buffered(self.cl_remaining_usize());
            out.extend_from_slice(self.buf.slice(start2, len2));
            self.body_left -= len2 as u64;
        }
        if self.body_left == 0 {
            self.request_completed = true;
        }
        self.add_rx(out.len() as u64);
        Ok(out)
    }

    fn splice_cl(&mut self, sink: &mut dyn Sink) -> Result<u64>
    where
        S: Splice,
    {
        let mut total = 0u64;
        let (start, len) = self.buf.take_buffered(self.cl_remaining_usize());
        if len > 0 {
            let bytes = self.buf.slice(start, len).to_vec();
            sink.write_chunks(&[bytes.as_slice()])?;
            self.body_left -= len as u64;
            total += len as u64;
        }
        while self.body_left > 0 {
            let want = self.cl_remaining_usize().min(MAX_BODY_READ_LENGTH);
            let n = self.source.splice(sink, want)?;
            if n == 0 {
                return Err(ParseError::IncompleteBody.into());
            }
            self.body_left -= n as u64;
            total += n as u64;
        }
        self.request_completed = true;
        self.add_rx(total);
        Ok(total)
    }

    // -- chunked ----------------------------------------------------------

    /// Drives the chunk-size/data/postfix state machine, appending data
    /// bytes to `out`. Returns once a full message has been consumed
    /// (`stop_after_chunk = false`, used by `read_body`) or once the
    /// current chunk's postfix has been consumed — whether that chunk
    /// carried data or was the terminating zero chunk
    /// (`stop_after_chunk = true`, used by `read_body_chunk`). A chunk's
    /// data is always drained in full once started, regardless of
    /// `stop_after_chunk`; only `buffered_only` short-circuits a partial
    /// read without touching the source.
    fn drive_chunked(
        &mut self,
        out: &mut Vec<u8>,
        buffered_only: bool,
        stop_after_chunk: bool,
    ) -> Result<()> {
        loop {
            match self.chunk_phase {
                ChunkPhase::Size => {
                    self.buf.trim();
                    match self.chunk_size(buffered_only)? {
                        None => {
                            if buffered_only {
                                return Ok(());
                            }
                            return Err(ParseError::IncompleteRequestBody.into());
                        }
                        Some(0) => {
                            self.chunk_phase = ChunkPhase::Postfix { final_chunk: true };
                        }
                        Some(n) => {
                            self.chunk_phase = ChunkPhase::Data(n);
                        }
                    }
                }
                ChunkPhase::Data(remaining) => {
                    if remaining == 0 {
                        self.chunk_phase = ChunkPhase::Postfix { final_chunk: false };
                        continue;
                    }
                    let cap = remaining.min(usize::MAX as u64) as usize;
                    let (start, len) = self.buf.take_buffered(cap);
                    if len > 0 {
                        out.extend_from_slice(self.buf.slice(start, len));
                        self.add_rx(len as u64);
                        self.chunk_phase = ChunkPhase::Data(remaining - len as u64);
                        if buffered_only {
                            return Ok(());
                        }
                        continue;
                    }
                    if buffered_only {
                        return Ok(());
                    }
                    let want = cap.min(MAX_BODY_READ_LENGTH);
                    let n = self.buf.fill(&mut self.source, want)?;
                    if n == 0 {
                        return Err(ParseError::MalformedRequestBody.into());
                    }
                }
                ChunkPhase::Postfix { final_chunk } => {
                    match self.chunk_postfix(buffered_only)? {
                        None => {
                            if buffered_only {
                                return Ok(());
                            }
                            return Err(ParseError::MalformedRequestBody.into());
                        }
                        Some(()) => {
                            if final_chunk {
                                self.chunk_phase = ChunkPhase::Done;
                                self.request_completed = true;
                                return Ok(());
                            }
                            self.chunk_phase = ChunkPhase::Size;
                            if stop_after_chunk {
                                return Ok(());
                            }
                        }
                    }
                }
                ChunkPhase::Done => return Ok(()),
            }
        }
    }

    fn read_chunked_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.drive_chunked(&mut out, false, false)?;
        Ok(out)
    }

    fn read_chunked_chunk(&mut self, buffered_only: bool) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.drive_chunked(&mut out, buffered_only, true)?;
        Ok(out)
    }

    fn splice_chunked(&mut self, sink: &mut dyn Sink) -> Result<u64>
    where
        S: Splice,
    {
        let mut total = 0u64;
        loop {
            match self.chunk_phase {
                ChunkPhase::Size => {
                    self.buf.trim();
                    match tokenizer::parse_chunk_size(&mut self.buf, &mut self.source, &self.limits)? {
                        None => return Err(ParseError::IncompleteRequestBody.into()),
                        Some(0) => self.chunk_phase = ChunkPhase::Postfix { final_chunk: true },
                        Some(n) => self.chunk_phase = ChunkPhase::Data(n),
                    }
                }
                ChunkPhase::Data(remaining) => {
                    if remaining == 0 {
                        self.chunk_phase = ChunkPhase::Postfix { final_chunk: false };
                        continue;
                    }
                    let cap = remaining.min(usize::MAX as u64) as usize;
                    let (start, len) = self.buf.take_buffered(cap);
                    if len > 0 {
                        let bytes = self.buf.slice(start, len).to_vec();
                        sink.write_chunks(&[bytes.as_slice()])?;
                        total += len as u64;
                        self.chunk_phase = ChunkPhase::Data(remaining - len as u64);
                        continue;
                    }
                    let want = cap.min(MAX_BODY_READ_LENGTH);
                    let n = self.source.splice(sink, want)?;
                    if n == 0 {
                        return Err(ParseError::MalformedRequestBody.into());
                    }
                    self.chunk_phase = ChunkPhase::Data(remaining - n as u64);
                    total += n as u64;
                }
                ChunkPhase::Postfix { final_chunk } => {
                    match tokenizer::parse_chunk_postfix(&mut self.buf, &mut self.source)? {
                        None => return Err(ParseError::MalformedRequestBody.into()),
                        Some(()) => {
                            if final_chunk {
                                self.chunk_phase = ChunkPhase::Done;
                                self.request_completed = true;
                                self.add_rx(total);
                                return Ok(total);
                            }
                            self.chunk_phase = ChunkPhase::Size;
                        }
                    }
                }
                ChunkPhase::Done => {
                    self.add_rx(total);
                    return Ok(total);
                }
            }
        }
    }
}
