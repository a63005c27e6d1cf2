//! Pluggable byte I/O.
//!
//! The parser never talks to a socket directly. It talks to a `Source`,
//! and a response emitter talks to a `Sink`. Five concrete read shapes and
//! two concrete write shapes are recognized by the spec; here each is a
//! distinct adapter type rather than a runtime-tagged enum, so the choice
//! of adapter is resolved once, at the call site that builds the
//! `Parser`, and never costs a virtual call per byte afterwards.

use std::io;

/// Whether a fill call should overwrite the destination buffer from the
/// start, or append to whatever is already there.
///
/// Corresponds to the `0` / `-1` offset token in the external read
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    Start,
    End,
}

/// Which of the five read shapes an adapter implements.
///
/// Purely informational (useful for logging); it plays no role in
/// dispatch, which happens through the type system instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMethod {
    StockReadPartial,
    ReadPartial,
    BackendRead,
    BackendRecv,
    Call,
}

/// Which of the two write shapes a sink implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    BackendWrite,
    BackendSend,
}

/// A byte source the parser fills its read buffer from.
///
/// `fill` places up to `max` new bytes into `buf` according to `append`,
/// returning the number of bytes actually placed. Zero means EOF.
pub trait Source {
    fn read_method(&self) -> ReadMethod;
    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>;
}

/// A sink the response emitter and the body splice path write to.
pub trait Sink {
    fn write_method(&self) -> WriteMethod;

    /// Write each chunk, in order, as a single logical write. Returns the
    /// total number of bytes written.
    fn write_chunks(&mut self, chunks: &[&[u8]]) -> io::Result<usize>;
}

/// Every `Source` can be spliced from, by default via a buffered
/// read-then-write — not zero-copy, but always correct. An adapter backed
/// by a raw file descriptor may override `splice` for a true zero-copy
/// transfer; that specialization is a host concern and out of scope here.
pub trait Splice: Source {
    fn splice(&mut self, sink: &mut dyn Sink, max: usize) -> io::Result<usize> {
        let mut tmp = Vec::new();
        let n = self.fill(&mut tmp, max, Append::Start)?;
        if n == 0 {
            return Ok(0);
        }
        sink.write_chunks(&[&tmp[..n]])?;
        Ok(n)
    }
}

impl<T: Source + ?Sized> Splice for T {}

// ---------------------------------------------------------------------
// stock_readpartial
// ---------------------------------------------------------------------

/// The narrow contract `stock_readpartial` wraps: probe EOF, then read up
/// to `max` bytes in one partial read.
pub trait BlockingRead {
    fn is_eof(&mut self) -> io::Result<bool>;
    fn read_partial(&mut self, max: usize) -> io::Result<Option<Vec<u8>>>;
}

/// Adapts any [`BlockingRead`] (e.g. a plain blocking socket wrapper that
/// knows how to answer `eof?`) into a [`Source`].
pub struct StockReadPartial<S>(pub S);

impl<S: BlockingRead> Source for StockReadPartial<S> {
    fn read_method(&self) -> ReadMethod {
        ReadMethod::StockReadPartial
    }

    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>
    {
        if self.0.is_eof()? {
            return Ok(0);
        }
        match self.0.read_partial(max)? {
            None => Ok(0),
            Some(bytes) => {
                if append == Append::Start {
                    buf.clear();
                }
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }
}

/// Wraps any `std::io::Read` as a `BlockingRead` that treats a zero-length
/// read as EOF (the common case for files and blocking sockets).
pub struct StdReader<R>(pub R);

impl<R: io::Read> BlockingRead for StdReader<R> {
    fn is_eof(&mut self) -> io::Result<bool> {
        // std::io::Read has no side-effect-free EOF probe; a zero-length
        // `read_partial` result below plays that role instead.
        Ok(false)
    }

    fn read_partial(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        let mut tmp = vec![0u8; max];
        let n = self.0.read(&mut tmp)?;
        if n == 0 {
            return Ok(None);
        }
        tmp.truncate(n);
        Ok(Some(tmp))
    }
}

// ---------------------------------------------------------------------
// readpartial
// ---------------------------------------------------------------------

/// The richer `readpartial` contract: caller supplies the destination
/// buffer and an append offset, and may suppress the EOF exception.
pub trait ReadPartial {
    fn read_partial(
        &mut self,
        buf: &mut Vec<u8>,
        max: usize,
        append: Append,
        eof_raise: bool,
    ) -> io::Result<Option<usize>>;
}

pub struct ReadPartialAdapter<S>(pub S);

impl<S: ReadPartial> Source for ReadPartialAdapter<S> {
    fn read_method(&self) -> ReadMethod {
        ReadMethod::ReadPartial
    }

    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>
    {
        match self.0.read_partial(buf, max, append, false)? {
            None => Ok(0),
            Some(n) => Ok(n),
        }
    }
}

// ---------------------------------------------------------------------
// backend_read / backend_recv
// ---------------------------------------------------------------------

/// Event-loop-backed read: `read(source, buffer, maxlen, eof_raise, offset)`.
pub trait EventLoopRead {
    fn backend_read(
        &mut self,
        buf: &mut Vec<u8>,
        max: usize,
        eof_raise: bool,
        append: Append,
    ) -> io::Result<Option<usize>>;
}

pub struct BackendRead<S>(pub S);

impl<S: EventLoopRead> Source for BackendRead<S> {
    fn read_method(&self) -> ReadMethod {
        ReadMethod::BackendRead
    }

    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>
    {
        match self.0.backend_read(buf, max, false, append)? {
            None => Ok(0),
            Some(n) => Ok(n),
        }
    }
}

/// Event-loop-backed socket receive: same shape as `backend_read` minus
/// the EOF-exception flag.
pub trait EventLoopRecv {
    fn backend_recv(
        &mut self,
        buf: &mut Vec<u8>,
        max: usize,
        append: Append,
    ) -> io::Result<Option<usize>>;
}

pub struct BackendRecv<S>(pub S);

impl<S: EventLoopRecv> Source for BackendRecv<S> {
    fn read_method(&self) -> ReadMethod {
        ReadMethod::BackendRecv
    }

    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>
    {
        match self.0.backend_recv(buf, max, append)? {
            None => Ok(0),
            Some(n) => Ok(n),
        }
    }
}

// ---------------------------------------------------------------------
// call
// ---------------------------------------------------------------------

/// The source is itself a callable returning up to `max` bytes per call;
/// EOF is a `None` result.
pub struct Call<F>(pub F);

impl<F> Source for Call<F>
where
    F: FnMut(usize) -> io::Result<Option<Vec<u8>>>,
{
    fn read_method(&self) -> ReadMethod {
        ReadMethod::Call
    }

    fn fill(&mut self, buf: &mut Vec<u8>, max: usize, append: Append)
        -> io::Result<usize>
    {
        match (self.0)(max)? {
            None => Ok(0),
            Some(bytes) => {
                if append == Append::Start {
                    buf.clear();
                }
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }
}

// ---------------------------------------------------------------------
// sinks
// ---------------------------------------------------------------------

pub struct BackendWrite<W>(pub W);

impl<W: io::Write> Sink for BackendWrite<W> {
    fn write_method(&self) -> WriteMethod {
        WriteMethod::BackendWrite
    }

    fn write_chunks(&mut self, chunks: &[&[u8]]) -> io::Result<usize> {
        let mut total = 0;
        for chunk in chunks {
            self.0.write_all(chunk)?;
            total += chunk.len();
        }
        Ok(total)
    }
}

pub struct BackendSend<W>(pub W);

impl<W: io::Write> Sink for BackendSend<W> {
    fn write_method(&self) -> WriteMethod {
        WriteMethod::BackendSend
    }

    fn write_chunks(&mut self, chunks: &[&[u8]]) -> io::Result<usize> {
        let mut total = 0;
        for chunk in chunks {
            self.0.write_all(chunk)?;
            total += chunk.len();
        }
        Ok(total)
    }
}
