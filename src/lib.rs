//! An incremental HTTP/1.x message codec.
//!
//! [`Parser`] reads request or response messages from an arbitrary byte
//! [`Source`](io::Source), one header block and body at a time; the
//! [`emitter`] module writes well-formed HTTP/1 responses to an arbitrary
//! byte [`Sink`](io::Sink). Both sides of the codec are generic over the
//! I/O adapter, so the same `Parser` type serves a blocking socket
//! wrapper, an event-loop-backed reactor, or a plain callable, with the
//! adapter resolved once at construction rather than dispatched per
//! byte.
//!
//! ```no_run
//! use h1wire::{Mode, Parser};
//! use h1wire::io::{StockReadPartial, StdReader};
//!
//! let source = StockReadPartial(StdReader(std::io::stdin()));
//! let mut parser = Parser::new(source, Mode::Server);
//! if let Some(headers) = parser.parse_headers().unwrap() {
//!     println!("{} {}", headers.method().unwrap_or(""), headers.path().unwrap_or(""));
//!     let body = parser.read_body().unwrap();
//!     println!("body: {} bytes", body.len());
//! }
//! ```

#[macro_use(quick_error)]
extern crate quick_error;

pub mod body;
pub mod buffer;
pub mod emitter;
pub mod error;
pub mod headers;
pub mod io;
pub mod limits;
pub mod parser;
pub mod tokenizer;

pub use error::{Error, ParseError, Result};
pub use headers::{Headers, Value};
pub use limits::Limits;
pub use parser::{Mode, Parser};
