//! Functions producing canonical wire frames. Aggregate constructors take already built child
//! frames and concatenate them verbatim.
//!
//! ```
//! use fakedis::builder::{array, inline, strings};
//!
//! assert_eq!(array(&[inline("hi"), inline("ho")]), "*2\r\n+hi\r\n+ho\r\n");
//! assert_eq!(strings(&["hi", "ho"]), "*2\r\n$2\r\nhi\r\n$2\r\nho\r\n");
//! ```

use crate::frame::DataType;

/// A bulk string. `None` and the empty string both produce the empty bulk string `$0\r\n\r\n`;
/// use [`nil`] or [`nil_resp3`] to reply with a null.
pub fn string(s: Option<&str>) -> String {
    let s = s.unwrap_or_default();
    // Bulk lengths count bytes, not characters.
    format!("${}\r\n{}\r\n", s.len(), s)
}

/// A simple string.
pub fn inline(s: &str) -> String {
    line(DataType::SimpleString, s)
}

/// A simple error, e.g. `error("ERR wrong")`.
pub fn error(err: &str) -> String {
    line(DataType::SimpleError, err)
}

pub fn int(n: i64) -> String {
    line(DataType::Integer, &n.to_string())
}

/// A RESP3 double. Infinities are written as `inf` and `-inf`, NaN as `nan`.
pub fn float(n: f64) -> String {
    if n.is_nan() {
        return line(DataType::Double, "nan");
    }
    line(DataType::Double, &n.to_string())
}

/// The RESP2 null bulk string.
pub fn nil() -> String {
    line(DataType::BulkString, "-1")
}

/// The RESP3 null.
pub fn nil_resp3() -> String {
    line(DataType::Null, "")
}

/// The RESP2 null array.
pub fn nil_list() -> String {
    line(DataType::Array, "-1")
}

pub fn array<S: AsRef<str>>(items: &[S]) -> String {
    aggregate(DataType::Array, items.len(), items)
}

pub fn push<S: AsRef<str>>(items: &[S]) -> String {
    aggregate(DataType::Push, items.len(), items)
}

/// A map from interleaved key and value frames. The emitted count is the number of pairs.
pub fn map<S: AsRef<str>>(items: &[S]) -> String {
    aggregate(DataType::Map, items.len() / 2, items)
}

pub fn set<S: AsRef<str>>(items: &[S]) -> String {
    aggregate(DataType::Set, items.len(), items)
}

/// An array of bulk strings.
pub fn strings<S: AsRef<str>>(items: &[S]) -> String {
    array(&bulk_strings(items))
}

/// An array of integers.
pub fn ints(items: &[i64]) -> String {
    array(&items.iter().map(|&n| int(n)).collect::<Vec<_>>())
}

/// A map whose keys and values are all bulk strings.
pub fn string_map<S: AsRef<str>>(items: &[S]) -> String {
    map(&bulk_strings(items))
}

/// A set of bulk strings.
pub fn string_set<S: AsRef<str>>(items: &[S]) -> String {
    set(&bulk_strings(items))
}

/// A client request: the command name and its arguments as an array of bulk strings.
pub fn command<S: AsRef<str>>(args: &[S]) -> String {
    strings(args)
}

fn line(data_type: DataType, s: &str) -> String {
    format!("{}{}\r\n", char::from(data_type), s)
}

fn aggregate<S: AsRef<str>>(data_type: DataType, count: usize, items: &[S]) -> String {
    let mut frame = line(data_type, &count.to_string());
    for item in items {
        frame.push_str(item.as_ref());
    }
    frame
}

fn bulk_strings<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| string(Some(s.as_ref()))).collect()
}
