//! The response emitter: writes well-formed HTTP/1 responses to an
//! arbitrary [`Sink`], independent of `Parser`.
//!
//! A direct descendant of `tk-http`'s `base_serializer::MessageState`
//! accumulator-and-flush pattern, narrowed to response-only emission (no
//! request-line / client-side `MessageState` variants, since this codec
//! never emits requests) and rebuilt around the headers mapping rather
//! than a typed state machine of header-writing calls: the emitter always
//! knows the full header set up front, so there is no `add_header`/
//! `done_headers` sequencing to enforce.

use std::io;

use crate::headers::{Headers, DEFAULT_PROTOCOL, DEFAULT_STATUS, PROTOCOL, STATUS};
use crate::io::Sink;

/// Matches the original's `MAX_RESPONSE_BUFFER_SIZE`: header bytes batch
/// into this accumulator and flush to the sink whenever the next header
/// would overflow it, or at the end of the status+headers block.
const MAX_RESPONSE_BUFFER_SIZE: usize = 64 * 1024;

const CRLF: &[u8] = b"\r\n";
const EMPTY_CHUNK: &[u8] = b"0\r\n\r\n";

fn is_pseudo(key: &str) -> bool {
    key.starts_with(':')
}

struct Accumulator<'a, S: Sink + ?Sized> {
    sink: &'a mut S,
    buf: Vec<u8>,
    total_written: u64,
}

impl<'a, S: Sink + ?Sized> Accumulator<'a, S> {
    fn new(sink: &'a mut S) -> Self {
        Accumulator {
            sink,
            buf: Vec::with_capacity(MAX_RESPONSE_BUFFER_SIZE),
            total_written: 0,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.sink.write_chunks(&[&self.buf])?;
        self.total_written += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }

    /// Flushes first if appending `extra` bytes would overflow the
    /// accumulator (mirrors `send_response_write_header`'s pre-flush
    /// check against `MAX_RESPONSE_BUFFER_SIZE - 8`).
    fn reserve(&mut self, extra: usize) -> io::Result<()> {
        if self.buf.len() + extra > MAX_RESPONSE_BUFFER_SIZE.saturating_sub(8) {
            self.flush()?;
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn write_status_line(&mut self, protocol: &str, status: &str) {
        self.put(protocol.as_bytes());
        self.put(b" ");
        self.put(status.as_bytes());
        self.put(CRLF);
    }

    fn write_header(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.reserve(key.len() + value.len())?;
        self.put(key.as_bytes());
        self.put(b": ");
        self.put(value.as_bytes());
        self.put(CRLF);
        Ok(())
    }
}

fn protocol_and_status(headers: &Headers) -> (String, String) {
    let protocol = headers
        .get_str(PROTOCOL)
        .map(str::to_owned)
        .unwrap_or_else(|| DEFAULT_PROTOCOL.to_owned());
    let status = headers
        .get_str(STATUS)
        .map(str::to_owned)
        .unwrap_or_else(|| DEFAULT_STATUS.to_owned());
    (protocol, status)
}

/// User-supplied headers iterated in an emitter call always skip the
/// parser's own pseudo-keys, whether or not the caller recycled a parsed
/// `Headers` value as the basis for a response (a common proxy pattern).
fn non_pseudo_headers(headers: &Headers) -> Vec<(&str, String)> {
    headers
        .iter()
        .filter(|(k, _)| !is_pseudo(k.as_str()))
        .map(|(k, v)| (k.as_str(), v.to_wire_string()))
        .collect()
}

/// Writes `PROTOCOL SP STATUS CRLF`, every non-pseudo header, an
/// authoritative `Content-Length` computed from `body`'s actual length,
/// CRLF, then the body. Returns the total bytes written.
///
/// `Content-Length` is always the emitter's own computation — any
/// caller-supplied `content-length` entry in `headers` is silently
/// shadowed (chunked framing requires [`send_chunked_response`]
/// instead).
pub fn send_response<S: Sink + ?Sized>(
    sink: &mut S,
    headers: &Headers,
    body: Option<&[u8]>,
) -> io::Result<u64> {
    let (protocol, status) = protocol_and_status(headers);
    let body = body.unwrap_or(&[]);

    let mut acc = Accumulator::new(sink);
    acc.write_status_line(&protocol, &status);
    for (key, value) in non_pseudo_headers(headers) {
        acc.write_header(key, &value)?;
    }
    acc.write_header("Content-Length", &body.len().to_string())?;
    acc.put(CRLF);

    let mut remaining = body;
    while !remaining.is_empty() {
        let take = remaining.len().min(MAX_RESPONSE_BUFFER_SIZE);
        acc.reserve(take)?;
        acc.put(&remaining[..take]);
        remaining = &remaining[take..];
    }

    acc.flush()?;
    Ok(acc.total_written)
}

/// Writes one chunked-transfer-encoding chunk: `<hexlen>\r\n<chunk>\r\n`
/// in a single combined write, or the literal final chunk `0\r\n\r\n` when
/// `chunk` is `None`.
pub fn send_body_chunk<S: Sink + ?Sized>(
    sink: &mut S,
    chunk: Option<&[u8]>,
) -> io::Result<u64> {
    match chunk {
        None => sink.write_chunks(&[EMPTY_CHUNK]).map(|n| n as u64),
        Some(chunk) => {
            let header = format!("{:x}\r\n", chunk.len());
            sink.write_chunks(&[header.as_bytes(), chunk, CRLF])
                .map(|n| n as u64)
        }
    }
}

/// Writes the status line, every non-pseudo header, an injected
/// `Transfer-Encoding: chunked`, then drives `chunks` — an iterator
/// standing in for the original's block-yielding generator — writing
/// each `Some` item as a chunk and terminating with the final chunk once
/// the iterator is exhausted. Returns the total bytes written.
pub fn send_chunked_response<S, I, B>(
    sink: &mut S,
    headers: &Headers,
    chunks: I,
) -> io::Result<u64>
where
    S: Sink + ?Sized,
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let (protocol, status) = protocol_and_status(headers);

    let mut acc = Accumulator::new(sink);
    acc.write_status_line(&protocol, &status);
    for (key, value) in non_pseudo_headers(headers) {
        acc.write_header(key, &value)?;
    }
    acc.write_header("Transfer-Encoding", "chunked")?;
    acc.put(CRLF);
    acc.flush()?;

    let mut total = acc.total_written;
    for chunk in chunks {
        total += send_body_chunk(sink, Some(chunk.as_ref()))?;
    }
    total += send_body_chunk(sink, None)?;
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::headers::{Headers, METHOD};
    use crate::io::{Sink, WriteMethod};

    struct VecSink(Vec<u8>);

    impl Sink for VecSink {
        fn write_method(&self) -> WriteMethod {
            WriteMethod::BackendWrite
        }

        fn write_chunks(&mut self, chunks: &[&[u8]]) -> io::Result<usize> {
            let mut n = 0;
            for c in chunks {
                self.0.extend_from_slice(c);
                n += c.len();
            }
            Ok(n)
        }
    }

    #[test]
    fn send_response_writes_status_headers_and_authoritative_length() {
        let mut h = Headers::new();
        h.set(STATUS, "201 Created");
        h.set("X-A", "v");
        let mut sink = VecSink(Vec::new());
        let n = send_response(&mut sink, &h, Some(b"hi")).unwrap();
        assert_eq!(
            sink.0,
            b"HTTP/1.1 201 Created\r\nX-A: v\r\nContent-Length: 2\r\n\r\nhi".to_vec()
        );
        assert_eq!(n as usize, sink.0.len());
    }

    #[test]
    fn send_response_defaults_protocol_and_status() {
        let h = Headers::new();
        let mut sink = VecSink(Vec::new());
        send_response(&mut sink, &h, None).unwrap();
        assert_eq!(sink.0, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n".to_vec());
    }

    #[test]
    fn send_response_skips_pseudo_keys_and_joins_sequences() {
        let mut h = Headers::new();
        h.set(METHOD, "GET");
        h.push_header("x".into(), "a".into());
        h.push_header("x".into(), "b".into());
        let mut sink = VecSink(Vec::new());
        send_response(&mut sink, &h, None).unwrap();
        let text = String::from_utf8(sink.0).unwrap();
        assert!(!text.contains(":method"));
        assert!(text.contains("x: a, b\r\n"));
    }

    #[test]
    fn send_body_chunk_writes_hex_len_and_terminator() {
        let mut sink = VecSink(Vec::new());
        send_body_chunk(&mut sink, Some(b"Wiki")).unwrap();
        send_body_chunk(&mut sink, Some(b"pedia")).unwrap();
        send_body_chunk(&mut sink, None).unwrap();
        assert_eq!(sink.0, b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec());
    }

    #[test]
    fn send_chunked_response_injects_transfer_encoding_and_drains_generator() {
        let h = Headers::new();
        let mut sink = VecSink(Vec::new());
        send_chunked_response(&mut sink, &h, vec![b"Wiki".to_vec(), b"pedia".to_vec()]).unwrap();
        assert_eq!(
            sink.0,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn send_chunked_response_with_no_chunks_still_terminates() {
        let h = Headers::new();
        let mut sink = VecSink(Vec::new());
        let n = send_chunked_response(&mut sink, &h, Vec::<Vec<u8>>::new()).unwrap();
        assert_eq!(
            sink.0,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n".to_vec()
        );
        assert_eq!(n as usize, sink.0.len());
    }
}
