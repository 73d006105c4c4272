// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payloads for the `DATA` and splunk entry points.
//!
//! A [`Block`] is the body of a multi-line `DATA:` dump.  It is a tagged union
//! rather than "anything": plain text, a value serialized to indented JSON, or
//! a custom [`Formatter`].
//!
//! ```
//! use linewise::Block;
//! use std::collections::BTreeMap;
//!
//! let mut totals = BTreeMap::new();
//! totals.insert("apples", 3);
//! assert_eq!(Block::json(&totals).render(), "{\n    \"apples\": 3\n}");
//! assert_eq!(Block::from("as is").render(), "as is");
//! ```
//!
//! [`SplunkPair`]s make up the compact `key=value` lines written by
//! [`Uplevel::splunk`](crate::Uplevel::splunk).

use serde::Serialize;
use serde::ser;
use serde_json::ser::PrettyFormatter;
use std::fmt::{Debug, Display, Write};

/// Something that renders itself as (possibly multi-line) text.
pub trait Formatter {
    fn format(&self) -> String;
}

impl Formatter for &str {
    fn format(&self) -> String {
        self.to_string()
    }
}

impl Formatter for String {
    fn format(&self) -> String {
        self.clone()
    }
}

/// The body of a `DATA:` block.
pub enum Block {
    /// Rendered line by line as given.
    Text(String),
    /// The outcome of serializing a value with four-space indentation.
    Json(Result<String, serde_json::Error>),
    /// Rendered by calling the formatter.
    Custom(Box<dyn Formatter + Send>),
}

impl Block {
    /// Serializes `value` as pretty JSON.  A serialization failure is kept and
    /// rendered as its error text.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Block::Json(to_indented_json(value))
    }

    pub fn custom(formatter: impl Formatter + Send + 'static) -> Self {
        Block::Custom(Box::new(formatter))
    }

    pub fn render(&self) -> String {
        match self {
            Block::Text(text) => text.clone(),
            Block::Json(Ok(json)) => json.clone(),
            Block::Json(Err(err)) => err.to_string(),
            Block::Custom(formatter) => formatter.format(),
        }
    }
}

fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    // serde_json writes non-finite floats as `null`; refuse them instead
    value.serialize(FiniteFloats)?;
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// A serializer that writes nothing and fails on NaN or infinite floats.
#[derive(Clone, Copy)]
struct FiniteFloats;

fn check_float(value: f64) -> Result<(), serde_json::Error> {
    if value.is_finite() {
        return Ok(());
    }
    let shown = if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "+Inf"
    } else {
        "-Inf"
    };
    Err(ser::Error::custom(format_args!("unsupported value: {shown}")))
}

macro_rules! accept {
    ($($method:ident: $ty:ty),+ $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<(), serde_json::Error> {
                Ok(())
            }
        )+
    };
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept!(
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
        serialize_unit_struct: &'static str,
    );

    fn serialize_f32(self, value: f32) -> Result<(), serde_json::Error> {
        check_float(f64::from(value))
    }

    fn serialize_f64(self, value: f64) -> Result<(), serde_json::Error> {
        check_float(value)
    }

    fn serialize_none(self) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
}

macro_rules! compound {
    ($($trait:ident::$method:ident),+ $(,)?) => {
        $(
            impl ser::$trait for FiniteFloats {
                type Ok = ();
                type Error = serde_json::Error;

                fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
                    value.serialize(*self)
                }

                fn end(self) -> Result<(), serde_json::Error> {
                    Ok(())
                }
            }
        )+
    };
}

compound!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field,
);

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), serde_json::Error> {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result<(), serde_json::Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

impl From<&str> for Block {
    fn from(text: &str) -> Self {
        Block::Text(text.to_string())
    }
}

impl From<String> for Block {
    fn from(text: String) -> Self {
        Block::Text(text)
    }
}

impl From<&String> for Block {
    fn from(text: &String) -> Self {
        Block::Text(text.clone())
    }
}

impl From<serde_json::Value> for Block {
    fn from(value: serde_json::Value) -> Self {
        Block::json(&value)
    }
}

impl Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Block::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Block::Json(result) => f.debug_tuple("Json").field(result).finish(),
            Block::Custom(_) => f.debug_tuple("Custom").finish_non_exhaustive(),
        }
    }
}

/// Writes the `"\t<line>\n"` body of a `DATA:` block, skipping blank lines.
pub(crate) fn write_block_lines(out: &mut String, text: &str) {
    for line in text.split('\n').filter(|line| !line.is_empty()) {
        out.push('\t');
        out.push_str(line);
        out.push('\n');
    }
}

/// A value on a splunk line.
#[derive(Debug, Clone, PartialEq)]
pub enum SplunkValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    List(Vec<SplunkValue>),
    Null,
}

impl Display for SplunkValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplunkValue::Str(s) => write_token(f, s),
            SplunkValue::Int(i) => write!(f, "{i}"),
            SplunkValue::UInt(u) => write!(f, "{u}"),
            SplunkValue::Float(x) => write!(f, "{x}"),
            SplunkValue::Bool(b) => write!(f, "{b}"),
            SplunkValue::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            SplunkValue::Null => f.write_str("null"),
        }
    }
}

/// Quotes `token` when it contains a space.
fn write_token(f: &mut std::fmt::Formatter<'_>, token: &str) -> std::fmt::Result {
    if token.contains(' ') {
        write!(f, "{token:?}")
    } else {
        f.write_str(token)
    }
}

macro_rules! splunk_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for SplunkValue {
                fn from(value: $ty) -> Self {
                    SplunkValue::$variant(value.into())
                }
            }
        )+
    };
}

splunk_from!(Int: i8, i16, i32, i64);
splunk_from!(UInt: u8, u16, u32, u64);
splunk_from!(Float: f32, f64);
splunk_from!(Bool: bool);
splunk_from!(Str: String, &str);

impl From<usize> for SplunkValue {
    fn from(value: usize) -> Self {
        SplunkValue::UInt(u64::try_from(value).unwrap_or(u64::MAX))
    }
}

impl From<isize> for SplunkValue {
    fn from(value: isize) -> Self {
        SplunkValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl<T: Into<SplunkValue>> From<Vec<T>> for SplunkValue {
    fn from(values: Vec<T>) -> Self {
        SplunkValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SplunkValue>> From<Option<T>> for SplunkValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SplunkValue::Null, Into::into)
    }
}

/// One `key=value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SplunkPair {
    pub key: String,
    pub value: SplunkValue,
}

impl SplunkPair {
    pub fn new(key: impl Into<String>, value: impl Into<SplunkValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Display for SplunkPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_token(f, &self.key)?;
        write!(f, "={}", self.value)
    }
}

impl<K: Into<String>, V: Into<SplunkValue>> From<(K, V)> for SplunkPair {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Reading {
        sensor: &'static str,
        values: Vec<u32>,
    }

    #[test]
    fn json_uses_four_space_indent() {
        let reading = Reading {
            sensor: "north",
            values: vec![1, 2],
        };
        assert_eq!(
            Block::json(&reading).render(),
            "{\n    \"sensor\": \"north\",\n    \"values\": [\n        1,\n        2\n    ]\n}"
        );
    }

    #[test]
    fn unserializable_value_renders_error_text() {
        let mut map = BTreeMap::new();
        map.insert((1u8, 2u8), "pair key");
        let block = Block::json(&map);
        assert!(matches!(block, Block::Json(Err(_))));
        assert_eq!(block.render(), "key must be a string");
    }

    #[derive(Serialize)]
    struct Ratio {
        name: &'static str,
        samples: Vec<Option<f32>>,
    }

    #[test]
    fn non_finite_floats_are_unsupported() {
        assert_eq!(Block::json(&f64::NAN).render(), "unsupported value: NaN");
        assert_eq!(Block::json(&[1.0, f64::INFINITY]).render(), "unsupported value: +Inf");
        let ratio = Ratio {
            name: "hit",
            samples: vec![Some(0.5), None, Some(f32::NEG_INFINITY)],
        };
        assert_eq!(Block::json(&ratio).render(), "unsupported value: -Inf");

        let finite = Ratio {
            name: "hit",
            samples: vec![Some(0.5), None],
        };
        assert_eq!(
            Block::json(&finite).render(),
            "{\n    \"name\": \"hit\",\n    \"samples\": [\n        0.5,\n        null\n    ]\n}"
        );
    }

    struct Lines;

    impl Formatter for Lines {
        fn format(&self) -> String {
            "a\n\nb".to_string()
        }
    }

    #[test]
    fn custom_formatter_is_called() {
        assert_eq!(Block::custom(Lines).render(), "a\n\nb");
    }

    #[test]
    fn block_lines_skip_blanks() {
        let mut out = String::new();
        write_block_lines(&mut out, "\nfirst\n\n\nsecond\n");
        assert_eq!(out, "\tfirst\n\tsecond\n");

        let mut out = String::new();
        write_block_lines(&mut out, "\n\n\n\n");
        assert_eq!(out, "");
    }

    #[test]
    fn splunk_quoting() {
        assert_eq!(SplunkPair::new("user", "bob").to_string(), "user=bob");
        assert_eq!(
            SplunkPair::new("full name", "Bob Smith").to_string(),
            "\"full name\"=\"Bob Smith\""
        );
        assert_eq!(SplunkPair::new("n", 42).to_string(), "n=42");
        assert_eq!(SplunkPair::new("ok", true).to_string(), "ok=true");
        assert_eq!(SplunkPair::new("ids", vec![1, 2, 3]).to_string(), "ids=[1, 2, 3]");
        assert_eq!(
            SplunkPair::new("tags", vec!["a b", "c"]).to_string(),
            "tags=[\"a b\", c]"
        );
        assert_eq!(SplunkPair::new("gone", None::<i32>).to_string(), "gone=null");
        assert_eq!(SplunkPair::from(("ratio", 0.5)).to_string(), "ratio=0.5");
    }
}
