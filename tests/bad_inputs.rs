//! Malformed inputs must raise, never loop or panic.

use h1wire::error::{Error, ParseError};
use h1wire::io::Call;
use h1wire::{Mode, Parser};

fn once(data: &'static [u8]) -> Call<impl FnMut(usize) -> std::io::Result<Option<Vec<u8>>>> {
    let mut sent = false;
    Call(move |_max: usize| {
        if sent {
            Ok(None)
        } else {
            sent = true;
            Ok(Some(data.to_vec()))
        }
    })
}

fn assert_parse_error(data: &'static [u8], expected: ParseError) {
    let src = once(data);
    let mut parser = Parser::new(src, Mode::Server);
    match parser.parse_headers() {
        Err(Error::Parse(e)) => assert_eq!(e, expected),
        other => panic!("expected Parse({:?}), got {:?}", expected, other),
    }
}

#[test]
fn method_of_all_spaces_is_rejected() {
    assert_parse_error(b"   / HTTP/1.1\r\n\r\n", ParseError::InvalidMethod);
}

#[test]
fn header_key_with_space_before_colon_is_rejected() {
    assert_parse_error(
        b"GET / HTTP/1.1\r\nX Y: v\r\n\r\n",
        ParseError::InvalidHeaderKey,
    );
}

#[test]
fn non_numeric_content_length_is_rejected() {
    let src = once(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
    let mut parser = Parser::new(src, Mode::Server);
    parser.parse_headers().unwrap().unwrap();
    match parser.read_body() {
        Err(Error::Parse(ParseError::InvalidBodyContentLength)) => {}
        other => panic!("expected InvalidBodyContentLength, got {:?}", other),
    }
}

#[test]
fn chunk_size_exceeding_its_length_limit_is_rejected() {
    let src = once(
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffffff\r\n",
    );
    let mut parser = Parser::new(src, Mode::Server);
    parser.parse_headers().unwrap().unwrap();
    match parser.read_body() {
        Err(Error::Parse(ParseError::InvalidChunkSize)) => {}
        other => panic!("expected InvalidChunkSize, got {:?}", other),
    }
}

#[test]
fn final_chunk_missing_postfix_crlf_is_rejected() {
    let src = once(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\nX");
    let mut parser = Parser::new(src, Mode::Server);
    parser.parse_headers().unwrap().unwrap();
    match parser.read_body() {
        Err(Error::Parse(ParseError::InvalidChunk)) => {}
        other => panic!("expected InvalidChunk, got {:?}", other),
    }
}

#[test]
fn chunked_eof_before_any_chunk_byte_is_incomplete() {
    let src = once(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
    let mut parser = Parser::new(src, Mode::Server);
    parser.parse_headers().unwrap().unwrap();
    match parser.read_body() {
        Err(Error::Parse(ParseError::IncompleteRequestBody)) => {}
        other => panic!("expected IncompleteRequestBody, got {:?}", other),
    }
}

#[test]
fn chunked_eof_mid_chunk_data_is_malformed() {
    let src = once(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHel");
    let mut parser = Parser::new(src, Mode::Server);
    parser.parse_headers().unwrap().unwrap();
    match parser.read_body() {
        Err(Error::Parse(ParseError::MalformedRequestBody)) => {}
        other => panic!("expected MalformedRequestBody, got {:?}", other),
    }
}

#[test]
fn too_many_headers_is_rejected() {
    let mut data = String::from("GET / HTTP/1.1\r\n");
    for i in 0..200 {
        data.push_str(&format!("X-{}: v\r\n", i));
    }
    data.push_str("\r\n");
    let leaked: &'static [u8] = Box::leak(data.into_bytes().into_boxed_slice());
    assert_parse_error(leaked, ParseError::TooManyHeaders);
}

#[test]
fn method_over_limit_is_rejected_method_at_limit_succeeds() {
    let at_limit = "A".repeat(32);
    let data = format!("{} / HTTP/1.1\r\nHost: x\r\n\r\n", at_limit);
    let leaked: &'static str = Box::leak(data.into_boxed_str());
    let src = once(leaked.as_bytes());
    let mut parser = Parser::new(src, Mode::Server);
    let headers = parser.parse_headers().unwrap().unwrap();
    assert_eq!(headers.method(), Some(at_limit.as_str()));

    let over_limit = "A".repeat(33);
    let data2 = format!("{} / HTTP/1.1\r\nHost: x\r\n\r\n", over_limit);
    let leaked2: &'static str = Box::leak(data2.into_boxed_str());
    assert_parse_error(leaked2.as_bytes(), ParseError::InvalidMethod);
}
