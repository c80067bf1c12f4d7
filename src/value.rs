use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::io::Cursor;

use bytes::{Buf, Bytes};

use crate::builder;
use crate::frame::{
    check_null, get_bulk, get_line, nested, parse_length, parse_text, DataType, Error, CRLF,
    DEFAULT_MAX_DEPTH,
};

/// A typed RESP2/RESP3 value. `None` payloads are the `-1` null spelling of a bulk string or an
/// aggregate, kept apart from the RESP3 [`Value::Null`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Simple(String),
    Error(String),
    Integer(i64),
    Double(f64),
    Bulk(Option<Bytes>),
    Null,
    Array(Option<Vec<Value>>),
    Push(Option<Vec<Value>>),
    /// Entries in insertion order. A later duplicate key replaces the earlier value in place;
    /// keys are compared by their canonical encoding.
    Map(Option<Vec<(Value, Value)>>),
    Set(Option<Vec<Value>>),
}

impl Value {
    /// Parses exactly one frame into a typed value. Bytes following the first complete frame are
    /// ignored.
    ///
    /// A top-level simple error is not returned as a value, it fails with [`Error::Server`]
    /// carrying the error text. Errors nested in aggregates are kept as [`Value::Error`].
    /// Aggregates nested deeper than [`DEFAULT_MAX_DEPTH`] levels are rejected.
    pub fn parse(src: &[u8]) -> Result<Value, Error> {
        Self::parse_with_max_depth(src, DEFAULT_MAX_DEPTH)
    }

    /// Like [`Value::parse`], allowing aggregates to nest at most `max_depth` levels.
    pub fn parse_with_max_depth(src: &[u8], max_depth: usize) -> Result<Value, Error> {
        let mut cursor = Cursor::new(src);

        match Self::parse_next(&mut cursor, max_depth)? {
            Value::Error(msg) => Err(Error::Server(msg)),
            value => Ok(value),
        }
    }

    fn parse_next(src: &mut Cursor<&[u8]>, max_depth: usize) -> Result<Value, Error> {
        let line = get_line(src)?;
        let (&tag, rest) = line
            .split_first()
            .ok_or_else(|| Error::Protocol("line is shorter than a minimal frame".into()))?;

        match DataType::try_from(tag)? {
            DataType::SimpleString => Ok(Value::Simple(parse_text(rest)?.to_string())),
            DataType::SimpleError => Ok(Value::Error(parse_text(rest)?.to_string())),
            DataType::Integer => {
                let text = parse_text(rest)?;
                text.parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| Error::Protocol(format!("invalid integer {:?}", text)))
            }
            // `inf`, `-inf` and `nan` are accepted by `f64::from_str`.
            DataType::Double => {
                let text = parse_text(rest)?;
                text.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| Error::Protocol(format!("invalid double {:?}", text)))
            }
            DataType::Null => check_null(rest).map(|_| Value::Null),
            DataType::BulkString => match parse_length(rest)? {
                None => Ok(Value::Bulk(None)),
                Some(length) => {
                    let data = get_bulk(src, length)?;
                    Ok(Value::Bulk(Some(Bytes::copy_from_slice(data))))
                }
            },
            DataType::Array => Self::parse_elements(src, rest, max_depth).map(Value::Array),
            DataType::Push => Self::parse_elements(src, rest, max_depth).map(Value::Push),
            DataType::Set => Self::parse_elements(src, rest, max_depth).map(Value::Set),
            DataType::Map => {
                let count = parse_length(rest)?;
                let depth = nested(max_depth)?;
                let count = match count {
                    Some(count) => count,
                    None => return Ok(Value::Map(None)),
                };

                let capacity = count.min(src.remaining());
                let mut entries: Vec<(Value, Value)> = Vec::with_capacity(capacity);
                // Encoded key to its position in `entries`.
                let mut positions: HashMap<Vec<u8>, usize> = HashMap::with_capacity(capacity);
                for _ in 0..count {
                    let key = Self::parse_next(src, depth)?;
                    let value = Self::parse_next(src, depth)?;

                    match positions.entry(key.serialize()) {
                        Entry::Occupied(position) => entries[*position.get()].1 = value,
                        Entry::Vacant(slot) => {
                            slot.insert(entries.len());
                            entries.push((key, value));
                        }
                    }
                }

                Ok(Value::Map(Some(entries)))
            }
        }
    }

    fn parse_elements(
        src: &mut Cursor<&[u8]>,
        length: &[u8],
        max_depth: usize,
    ) -> Result<Option<Vec<Value>>, Error> {
        let count = parse_length(length)?;
        let depth = nested(max_depth)?;
        let count = match count {
            Some(count) => count,
            None => return Ok(None),
        };

        let mut values = Vec::with_capacity(count.min(src.remaining()));
        for _ in 0..count {
            values.push(Self::parse_next(src, depth)?);
        }

        Ok(Some(values))
    }

    /// Returns the text of a simple string, an error, or a UTF-8 bulk string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Simple(s) | Value::Error(s) => Some(s),
            Value::Bulk(Some(bytes)) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// True for every null spelling: `_`, `$-1`, `*-1`, `>-1`, `%-1` and `~-1`.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bulk(None)
                | Value::Array(None)
                | Value::Push(None)
                | Value::Map(None)
                | Value::Set(None)
        )
    }

    /// Serializes the value back into its canonical wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, bytes: &mut Vec<u8>) {
        match self {
            Value::Simple(s) => write_line(bytes, DataType::SimpleString, s.as_bytes()),
            Value::Error(s) => write_line(bytes, DataType::SimpleError, s.as_bytes()),
            Value::Integer(i) => write_line(bytes, DataType::Integer, i.to_string().as_bytes()),
            Value::Double(d) => bytes.extend_from_slice(builder::float(*d).as_bytes()),
            Value::Null => write_line(bytes, DataType::Null, b""),
            Value::Bulk(None) => write_line(bytes, DataType::BulkString, b"-1"),
            Value::Bulk(Some(data)) => {
                write_line(bytes, DataType::BulkString, data.len().to_string().as_bytes());
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
            }
            Value::Array(values) => write_elements(bytes, DataType::Array, values.as_deref()),
            Value::Push(values) => write_elements(bytes, DataType::Push, values.as_deref()),
            Value::Set(values) => write_elements(bytes, DataType::Set, values.as_deref()),
            Value::Map(None) => write_line(bytes, DataType::Map, b"-1"),
            Value::Map(Some(entries)) => {
                write_line(bytes, DataType::Map, entries.len().to_string().as_bytes());
                for (key, value) in entries {
                    key.write_to(bytes);
                    value.write_to(bytes);
                }
            }
        }
    }
}

fn write_line(bytes: &mut Vec<u8>, data_type: DataType, line: &[u8]) {
    bytes.push(u8::from(data_type));
    bytes.extend_from_slice(line);
    bytes.extend_from_slice(CRLF);
}

fn write_elements(bytes: &mut Vec<u8>, data_type: DataType, values: Option<&[Value]>) {
    match values {
        None => write_line(bytes, data_type, b"-1"),
        Some(values) => {
            write_line(bytes, data_type, values.len().to_string().as_bytes());
            for value in values {
                value.write_to(bytes);
            }
        }
    }
}

impl From<Value> for Vec<u8> {
    fn from(value: Value) -> Self {
        value.serialize()
    }
}

/// Readable rendering used in logs: strings are quoted with backticks, aggregates are rendered
/// as `[a, b]` and maps as `{k:v}`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Simple(s) => write!(f, "`{}`", s),
            Value::Error(s) => write!(f, "(error) {}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Bulk(Some(bytes)) => write!(f, "`{}`", String::from_utf8_lossy(bytes)),
            Value::Array(Some(values)) | Value::Push(Some(values)) | Value::Set(Some(values)) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Map(Some(entries)) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Null
            | Value::Bulk(None)
            | Value::Array(None)
            | Value::Push(None)
            | Value::Map(None)
            | Value::Set(None) => write!(f, "null"),
        }
    }
}
