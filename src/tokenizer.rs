//! Byte-level scanners for the request line, status line, header lines,
//! and chunk framing. Every scanner consumes from the live
//! [`ReadBuffer`], filling from the [`Source`] as its cursor runs off the
//! buffered tail, and enforces its own length limit byte-by-byte.
//!
//! None of these materialize a string until a token is fully scanned:
//! `start`/`len` index into the buffer's backing `Vec<u8>`, which stays
//! valid across any intervening reallocation because the indices are
//! positional, not pointers — each token is materialized once, rather
//! than sliced zero-copy out of a buffer whose storage might move.

use crate::buffer::ReadBuffer;
use crate::error::{Error, ParseError};
use crate::io::Source;
use crate::limits::Limits;

/// `Ok(None)` means EOF with no bytes of this token consumed yet beyond
/// what's reported — the caller (ultimately `parse_headers`) turns that
/// into a clean "no message available" result, never an error.
pub type TokenResult<T> = Result<Option<T>, Error>;

fn cur<S: Source + ?Sized>(buf: &mut ReadBuffer, source: &mut S) -> TokenResult<u8> {
    if buf.ensure_byte(source)? {
        Ok(buf.current())
    } else {
        Ok(None)
    }
}

fn text_of(buf: &ReadBuffer, start: usize, len: usize) -> &[u8] {
    buf.slice(start, len)
}

/// Uppercases ASCII bytes; raises `InvalidCharacterSequence` if the
/// bytes aren't valid UTF-8 (mirrors the original's encoding-aware
/// upcase, which can fail on malformed input).
fn to_upper_string(bytes: &[u8]) -> Result<String, ParseError> {
    String::from_utf8(bytes.to_vec())
        .map(|s| s.to_uppercase())
        .map_err(|_| ParseError::InvalidCharacterSequence)
}

fn to_lower_string(bytes: &[u8]) -> Result<String, ParseError> {
    String::from_utf8(bytes.to_vec())
        .map(|s| s.to_lowercase())
        .map_err(|_| ParseError::InvalidCharacterSequence)
}

/// Header values and the request target/status message are stored
/// verbatim; malformed UTF-8 there never raises.
fn verbatim_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Consumes a single CRLF or bare-LF line terminator. The cursor must
/// already be positioned on `\r` or `\n`.
fn consume_terminator<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    on_bad: ParseError,
) -> TokenResult<()> {
    let c = buf.current().expect("caller ensures a byte is buffered");
    if c == b'\r' {
        buf.advance();
        let next = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        if next != b'\n' {
            return Err(on_bad.into());
        }
        buf.advance();
    } else {
        debug_assert_eq!(c, b'\n');
        buf.advance();
    }
    Ok(Some(()))
}

fn skip_spaces<S: Source + ?Sized>(buf: &mut ReadBuffer, source: &mut S) -> TokenResult<()> {
    loop {
        match cur(buf, source)? {
            Some(b' ') => buf.advance(),
            Some(_) => return Ok(Some(())),
            None => return Ok(None),
        }
    }
}

// ---------------------------------------------------------------------
// Request line
// ---------------------------------------------------------------------

pub fn parse_method<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<String> {
    let start = buf.pos();
    let mut len = 0usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b' ' => {
                if len < 1 || len > limits.max_method_length {
                    return Err(ParseError::InvalidMethod.into());
                }
                buf.advance();
                break;
            }
            b'\r' | b'\n' => return Err(ParseError::InvalidMethod.into()),
            _ => {
                buf.advance();
                len += 1;
                if len > limits.max_method_length {
                    return Err(ParseError::InvalidMethod.into());
                }
            }
        }
    }
    match to_upper_string(text_of(buf, start, len)) {
        Ok(s) => Ok(Some(s)),
        Err(e) => Err(e.into()),
    }
}

pub fn parse_request_target<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<String> {
    if skip_spaces(buf, source)?.is_none() {
        return Ok(None);
    }
    let start = buf.pos();
    let mut len = 0usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b' ' => {
                if len < 1 || len > limits.max_path_length {
                    return Err(ParseError::InvalidRequestTarget.into());
                }
                buf.advance();
                break;
            }
            b'\r' | b'\n' => return Err(ParseError::InvalidRequestTarget.into()),
            _ => {
                buf.advance();
                len += 1;
                if len > limits.max_path_length {
                    return Err(ParseError::InvalidRequestTarget.into());
                }
            }
        }
    }
    Ok(Some(verbatim_string(text_of(buf, start, len))))
}

fn expect_ci<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    lower: u8,
    upper: u8,
    on_bad: ParseError,
) -> TokenResult<()> {
    let c = match cur(buf, source)? {
        Some(c) => c,
        None => return Ok(None),
    };
    if c == lower || c == upper {
        buf.advance();
        Ok(Some(()))
    } else {
        Err(on_bad.into())
    }
}

/// Shared by the request line's and status line's protocol token:
/// `HTTP/1`, optionally followed by `.0` or `.1`.
fn parse_protocol_token<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    on_bad: ParseError,
) -> TokenResult<(usize, usize)> {
    let start = buf.pos();
    macro_rules! expect {
        ($lower:expr, $upper:expr) => {
            match expect_ci(buf, source, $lower, $upper, on_bad.clone())? {
                Some(()) => {}
                None => return Ok(None),
            }
        };
    }
    expect!(b'h', b'H');
    expect!(b't', b'T');
    expect!(b't', b'T');
    expect!(b'p', b'P');
    match cur(buf, source)? {
        Some(b'/') => buf.advance(),
        Some(_) => return Err(on_bad.into()),
        None => return Ok(None),
    }
    match cur(buf, source)? {
        Some(b'1') => buf.advance(),
        Some(_) => return Err(on_bad.into()),
        None => return Ok(None),
    }
    let mut len = 6usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b'.' => {
                buf.advance();
                let minor = match cur(buf, source)? {
                    Some(c) => c,
                    None => return Ok(None),
                };
                if minor != b'0' && minor != b'1' {
                    return Err(on_bad.into());
                }
                buf.advance();
                len += 2;
            }
            _ => break,
        }
    }
    if len < 6 || len > 8 {
        return Err(on_bad.into());
    }
    let start_pos = start;
    Ok(Some((start_pos, len)))
}

pub fn parse_request_protocol<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<String> {
    let _ = limits;
    if skip_spaces(buf, source)?.is_none() {
        return Ok(None);
    }
    let (start, len) = match parse_protocol_token(buf, source, ParseError::InvalidProtocol)? {
        Some(v) => v,
        None => return Ok(None),
    };
    // request-line protocol is followed by CRLF or LF
    let c = match cur(buf, source)? {
        Some(c) => c,
        None => return Ok(None),
    };
    match c {
        b'\r' | b'\n' => {
            if consume_terminator(buf, source, ParseError::InvalidProtocol)?.is_none() {
                return Ok(None);
            }
        }
        _ => return Err(ParseError::InvalidProtocol.into()),
    }
    match to_lower_string(text_of(buf, start, len)) {
        Ok(s) => Ok(Some(s)),
        Err(e) => Err(e.into()),
    }
}

pub fn parse_status_protocol<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
) -> TokenResult<String> {
    let (start, len) = match parse_protocol_token(buf, source, ParseError::InvalidProtocol)? {
        Some(v) => v,
        None => return Ok(None),
    };
    // status-line protocol is followed by a single space
    let c = match cur(buf, source)? {
        Some(c) => c,
        None => return Ok(None),
    };
    if c != b' ' {
        return Err(ParseError::InvalidProtocol.into());
    }
    buf.advance();
    match to_lower_string(text_of(buf, start, len)) {
        Ok(s) => Ok(Some(s)),
        Err(e) => Err(e.into()),
    }
}

pub fn parse_status_code<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
) -> TokenResult<i64> {
    if skip_spaces(buf, source)?.is_none() {
        return Ok(None);
    }
    let mut len = 0usize;
    let mut value: i64 = 0;
    loop {
        if len > 4 {
            return Err(ParseError::InvalidResponseStatus.into());
        }
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        if c.is_ascii_digit() {
            value = value * 10 + (c - b'0') as i64;
            len += 1;
            buf.advance();
            continue;
        }
        match c {
            b' ' => {
                buf.advance();
                break;
            }
            b'\r' | b'\n' => break,
            _ => return Err(ParseError::InvalidResponseStatus.into()),
        }
    }
    Ok(Some(value))
}

pub fn parse_status_message<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<String> {
    if skip_spaces(buf, source)?.is_none() {
        return Ok(None);
    }
    let start = buf.pos();
    let mut len = 0usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b'\r' | b'\n' => {
                if consume_terminator(buf, source, ParseError::InvalidRequestTarget)?.is_none() {
                    return Ok(None);
                }
                break;
            }
            _ => {
                buf.advance();
                len += 1;
                if len > limits.max_status_message_length {
                    return Err(ParseError::InvalidRequestTarget.into());
                }
            }
        }
    }
    Ok(Some(verbatim_string(text_of(buf, start, len))))
}

// ---------------------------------------------------------------------
// Header lines
// ---------------------------------------------------------------------

/// `Ok(Some(None))` signals the empty line terminating the header block.
pub fn parse_header_key<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<Option<String>> {
    let start = buf.pos();
    let mut len = 0usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b' ' => return Err(ParseError::InvalidHeaderKey.into()),
            b':' => {
                if len < 1 || len > limits.max_header_key_length {
                    return Err(ParseError::InvalidHeaderKey.into());
                }
                buf.advance();
                break;
            }
            b'\r' => {
                if buf.pos() > start {
                    return Err(ParseError::InvalidHeaderKey.into());
                }
                if consume_terminator(buf, source, ParseError::InvalidHeaderKey)?.is_none() {
                    return Ok(None);
                }
                return Ok(Some(None));
            }
            b'\n' => {
                if buf.pos() > start {
                    return Err(ParseError::InvalidHeaderKey.into());
                }
                buf.advance();
                return Ok(Some(None));
            }
            _ => {
                buf.advance();
                len += 1;
                if len > limits.max_header_key_length {
                    return Err(ParseError::InvalidHeaderKey.into());
                }
            }
        }
    }
    match to_lower_string(text_of(buf, start, len)) {
        Ok(s) => Ok(Some(Some(s))),
        Err(e) => Err(e.into()),
    }
}

/// Returns the UTF-8 sequence length (1, 2, 3 or 4) of the byte at the
/// cursor, per the leading-byte bit pattern — width is counted, not
/// validated.
fn utf8_seq_len(lead: u8) -> usize {
    if lead & 0xf0 == 0xf0 {
        4
    } else if lead & 0xe0 == 0xe0 {
        3
    } else if lead & 0xc0 == 0xc0 {
        2
    } else {
        1
    }
}

pub fn parse_header_value<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<String> {
    if skip_spaces(buf, source)?.is_none() {
        return Ok(None);
    }
    let start = buf.pos();
    let mut len = 0usize;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            b'\r' | b'\n' => {
                if consume_terminator(buf, source, ParseError::InvalidHeaderValue)?.is_none() {
                    return Ok(None);
                }
                break;
            }
            _ => {
                let seq_len = utf8_seq_len(c);
                for _ in 0..seq_len {
                    buf.advance();
                    if !buf.ensure_byte(source)? {
                        return Ok(None);
                    }
                }
                len += seq_len;
                if len > limits.max_header_value_length {
                    return Err(ParseError::InvalidHeaderValue.into());
                }
            }
        }
    }
    if len < 1 || len > limits.max_header_value_length {
        return Err(ParseError::InvalidHeaderValue.into());
    }
    Ok(Some(verbatim_string(text_of(buf, start, len))))
}

// ---------------------------------------------------------------------
// Chunked framing
// ---------------------------------------------------------------------

pub fn parse_chunk_size<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
    limits: &Limits,
) -> TokenResult<u64> {
    let mut len = 0usize;
    let mut value: u64 = 0;
    loop {
        let c = match cur(buf, source)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            b'\r' | b'\n' => {
                if len == 0 {
                    return Err(ParseError::InvalidChunkSize.into());
                }
                if consume_terminator(buf, source, ParseError::InvalidChunkSize)?.is_none() {
                    return Ok(None);
                }
                return Ok(Some(value));
            }
            _ => return Err(ParseError::InvalidChunkSize.into()),
        };
        value = (value << 4) + digit as u64;
        buf.advance();
        len += 1;
        if len >= limits.max_chunked_encoding_chunk_size_length {
            return Err(ParseError::InvalidChunkSize.into());
        }
    }
}

pub fn parse_chunk_postfix<S: Source + ?Sized>(
    buf: &mut ReadBuffer,
    source: &mut S,
) -> TokenResult<()> {
    let c = match cur(buf, source)? {
        Some(c) => c,
        None => return Ok(None),
    };
    match c {
        b'\r' | b'\n' => consume_terminator(buf, source, ParseError::InvalidChunk),
        _ => Err(ParseError::InvalidChunk.into()),
    }
}
