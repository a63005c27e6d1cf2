use std::io;

quick_error! {
    /// All the ways a single token of a request/status line, a header, or a
    /// chunk boundary can be malformed.
    ///
    /// This is the one error kind the codec needs: every variant carries
    /// exactly the message text a caller should show a user.
    #[derive(Debug, PartialEq, Eq, Clone)]
    pub enum ParseError {
        InvalidMethod {
            display("Invalid method")
        }
        InvalidRequestTarget {
            display("Invalid request target")
        }
        InvalidProtocol {
            display("Invalid protocol")
        }
        InvalidResponseStatus {
            display("Invalid response status")
        }
        InvalidHeaderKey {
            display("Invalid header key")
        }
        InvalidHeaderValue {
            display("Invalid header value")
        }
        TooManyHeaders {
            display("Too many headers")
        }
        InvalidCharacterSequence {
            display("Invalid character sequences in method or header name")
        }
        InvalidChunkSize {
            display("Invalid chunk size")
        }
        InvalidChunk {
            display("Invalid chunk")
        }
        MalformedRequestBody {
            display("Malformed request body")
        }
        IncompleteRequestBody {
            display("Incomplete request body")
        }
        IncompleteBody {
            display("Incomplete body")
        }
        InvalidBodyContentLength {
            display("Invalid body content length")
        }
    }
}

quick_error! {
    /// The error type returned by every fallible operation on `Parser` and
    /// the response emitter.
    ///
    /// Transport failures (`Io`) and protocol failures (`Parse`) are kept
    /// distinct so a caller can decide whether a retry even makes sense
    /// (it never does for `Parse`).
    #[derive(Debug)]
    pub enum Error {
        Io(err: io::Error) {
            display("I/O error: {}", err)
            from()
        }
        Parse(err: ParseError) {
            display("{}", err)
            from()
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
