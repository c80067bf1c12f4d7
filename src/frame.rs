// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::str;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

/// How many levels aggregates may nest by default. Deeper frames are rejected.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid frame data type: {0:#04x}")]
    InvalidDataType(u8),
    #[error("protocol error; {0}")]
    Protocol(String),
    /// The frame is a simple error (`-`). Carries the decoded error text.
    #[error("{0}")]
    Server(String),
}

/// The verbatim wire bytes of exactly one complete top-level RESP value, nested children
/// included. A `Frame` is only ever built from bytes that passed [`Frame::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Checks that one complete frame is available starting at the cursor position, and advances
    /// the cursor past it. Nested aggregates are checked recursively, up to
    /// [`DEFAULT_MAX_DEPTH`] levels.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), Error> {
        Self::check_depth(src, DEFAULT_MAX_DEPTH)
    }

    /// Like [`Frame::check`], allowing aggregates to nest at most `max_depth` levels.
    pub fn check_depth(src: &mut Cursor<&[u8]>, max_depth: usize) -> Result<(), Error> {
        let line = get_line(src)?;
        let (&tag, rest) = line
            .split_first()
            .ok_or_else(|| Error::Protocol("line is shorter than a minimal frame".into()))?;

        match DataType::try_from(tag)? {
            // The line itself is the whole frame.
            DataType::SimpleString
            | DataType::SimpleError
            | DataType::Integer
            | DataType::Double => Ok(()),
            DataType::Null => check_null(rest),
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                if let Some(length) = parse_length(rest)? {
                    get_bulk(src, length)?;
                }
                Ok(())
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array | DataType::Push | DataType::Set => {
                let count = parse_length(rest)?.unwrap_or(0);
                let depth = nested(max_depth)?;
                for _ in 0..count {
                    Self::check_depth(src, depth)?;
                }
                Ok(())
            }
            // %<number-of-entries>\r\n<key-1><value-1>...<key-n><value-n>
            DataType::Map => {
                let count = parse_length(rest)?.unwrap_or(0);
                let depth = nested(max_depth)?;
                for _ in 0..count * 2 {
                    Self::check_depth(src, depth)?;
                }
                Ok(())
            }
        }
    }

    /// Reads the next complete frame from the cursor, returning its bytes untouched.
    pub fn read(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
        let start = src.position() as usize;
        Self::check(src)?;
        let end = src.position() as usize;

        Ok(Frame(Bytes::copy_from_slice(&src.get_ref()[start..end])))
    }

    /// Wraps bytes already validated by [`Frame::check`].
    pub(crate) fn from_checked(bytes: Bytes) -> Frame {
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Splits an array, push, set or map frame into its immediate child frames, without parsing
    /// them. A map yields its keys and values interleaved. Null aggregates have no children.
    pub fn children(&self) -> Result<Vec<Frame>, Error> {
        let mut src = Cursor::new(&self.0[..]);
        let line = get_line(&mut src)?;
        let (&tag, rest) = line
            .split_first()
            .ok_or_else(|| Error::Protocol("line is shorter than a minimal frame".into()))?;

        let count = match DataType::try_from(tag)? {
            DataType::Array | DataType::Push | DataType::Set => parse_length(rest)?.unwrap_or(0),
            DataType::Map => parse_length(rest)?.unwrap_or(0) * 2,
            data_type => {
                return Err(Error::Protocol(format!(
                    "expected an aggregate frame, got {:?}",
                    data_type
                )))
            }
        };

        let mut children = Vec::with_capacity(count.min(src.remaining()));
        for _ in 0..count {
            let start = src.position() as usize;
            // Depth was bounded when the frame was built.
            Self::check_depth(&mut src, usize::MAX)?;
            let end = src.position() as usize;
            children.push(Frame(self.0.slice(start..end)));
        }

        Ok(children)
    }

    /// Returns the payload of a bulk string frame, `None` for the null bulk string.
    pub fn bulk_string(&self) -> Result<Option<Bytes>, Error> {
        let mut src = Cursor::new(&self.0[..]);
        let line = get_line(&mut src)?;

        match line.split_first() {
            Some((b'$', rest)) => match parse_length(rest)? {
                None => Ok(None),
                Some(length) => {
                    let start = src.position() as usize;
                    get_bulk(&mut src, length)?;
                    Ok(Some(self.0.slice(start..start + length)))
                }
            },
            _ => Err(Error::Protocol("expected a bulk string frame".into())),
        }
    }

    /// Returns the payloads of an aggregate frame whose children are all bulk strings.
    pub fn bulk_strings(&self) -> Result<Vec<Option<Bytes>>, Error> {
        self.children()?.iter().map(Frame::bulk_string).collect()
    }
}

impl TryFrom<Bytes> for Frame {
    type Error = Error;

    /// The bytes must hold exactly one complete frame.
    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let mut src = Cursor::new(&bytes[..]);
        Frame::check(&mut src)?;

        if src.has_remaining() {
            return Err(Error::Protocol(format!(
                "{} trailing bytes after frame",
                src.remaining()
            )));
        }

        Ok(Frame(bytes))
    }
}

impl TryFrom<&str> for Frame {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Frame::try_from(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl TryFrom<String> for Frame {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Frame::try_from(Bytes::from(s))
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

// Frames are logged escaped, so `\r\n` terminators stay on a single line.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

/// Returns the bytes of the next line without its CRLF terminator, advancing the cursor past it.
pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf
        .get(start..)
        .unwrap_or_default()
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

/// Returns exactly `length` payload bytes, then consumes the CRLF that must follow them.
pub(crate) fn get_bulk<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    if src.remaining() < length + CRLF.len() {
        return Err(Error::Incomplete);
    }

    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let data = &buf[start..start + length];

    if &buf[start + length..start + length + CRLF.len()] != CRLF {
        return Err(Error::Protocol(format!(
            "bulk string of {} bytes is not terminated by CRLF",
            length
        )));
    }

    src.advance(length + CRLF.len());

    Ok(data)
}

/// Returns the depth budget left for the children of an aggregate.
pub(crate) fn nested(max_depth: usize) -> Result<usize, Error> {
    max_depth
        .checked_sub(1)
        .ok_or_else(|| Error::Protocol("nesting too deep".into()))
}

/// The RESP3 null is a bare `_` line.
pub(crate) fn check_null(rest: &[u8]) -> Result<(), Error> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "unexpected null payload {}",
            rest.escape_ascii()
        )))
    }
}

/// Parses the declared length of a bulk string or aggregate. `-1` is the null variant.
pub(crate) fn parse_length(src: &[u8]) -> Result<Option<usize>, Error> {
    let length = parse_text(src)?
        .parse::<i64>()
        .map_err(|_| Error::Protocol(format!("invalid length {}", src.escape_ascii())))?;

    match length {
        -1 => Ok(None),
        length if length < 0 => Err(Error::Protocol(format!("invalid length {}", length))),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| Error::Protocol(format!("length {} is too large", length))),
    }
}

pub(crate) fn parse_text(src: &[u8]) -> Result<&str, Error> {
    str::from_utf8(src).map_err(|_| Error::Protocol("invalid UTF-8 text".into()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    Double,       // ','
    BulkString,   // '$'
    Array,        // '*'
    Push,         // '>'
    Set,          // '~'
    Map,          // '%'
    // Due to historical reasons, RESP2 features two specially crafted values for representing null
    // values of bulk strings and arrays. The null type, introduced in RESP3, aims to fix this
    // wrong. All three spellings are kept apart.
    Null, // '_'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b',' => Ok(Self::Double),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            b'>' => Ok(Self::Push),
            b'~' => Ok(Self::Set),
            b'%' => Ok(Self::Map),
            b'_' => Ok(Self::Null),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::Double => b',',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
            DataType::Push => b'>',
            DataType::Set => b'~',
            DataType::Map => b'%',
            DataType::Null => b'_',
        }
    }
}

impl From<DataType> for char {
    fn from(value: DataType) -> Self {
        char::from(u8::from(value))
    }
}
