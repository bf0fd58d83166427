use crate::error::CodecError;
use indexmap::IndexMap;
use std::fmt::{self, Display, Write};

/// Insertion-ordered JSON object. Equality ignores key order.
pub type JsonMap = IndexMap<String, JsonValue>;

/// An in-memory JSON tree.
///
/// Numbers keep the integer/floating-point distinction of the text they came
/// from, so an integer-valued field never picks up a fractional rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Double(f64),
    String(String),
    Array(Vec<JsonValue>),
    Object(JsonMap),
}

impl JsonValue {
    pub fn array() -> Self {
        JsonValue::Array(Vec::new())
    }

    pub fn object() -> Self {
        JsonValue::Object(JsonMap::new())
    }

    /// Name of the stored variant, used in mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Boolean(_) => "boolean",
            JsonValue::Int64(_) => "int64",
            JsonValue::Double(_) => "double",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn as_bool(&self) -> Result<bool, CodecError> {
        match self {
            JsonValue::Boolean(b) => Ok(*b),
            other => Err(CodecError::mismatch("boolean", other.kind_name())),
        }
    }

    pub fn as_i64(&self) -> Result<i64, CodecError> {
        match self {
            JsonValue::Int64(n) => Ok(*n),
            other => Err(CodecError::mismatch("int64", other.kind_name())),
        }
    }

    pub fn as_f64(&self) -> Result<f64, CodecError> {
        match self {
            JsonValue::Double(n) => Ok(*n),
            other => Err(CodecError::mismatch("double", other.kind_name())),
        }
    }

    /// Reads either number variant as a float.
    pub fn as_number(&self) -> Result<f64, CodecError> {
        match self {
            JsonValue::Double(n) => Ok(*n),
            JsonValue::Int64(n) => Ok(*n as f64),
            other => Err(CodecError::mismatch("number", other.kind_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str, CodecError> {
        match self {
            JsonValue::String(s) => Ok(s),
            other => Err(CodecError::mismatch("string", other.kind_name())),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<JsonValue>, CodecError> {
        match self {
            JsonValue::Array(items) => Ok(items),
            other => Err(CodecError::mismatch("array", other.kind_name())),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<JsonValue>, CodecError> {
        match self {
            JsonValue::Array(items) => Ok(items),
            other => Err(CodecError::mismatch("array", other.kind_name())),
        }
    }

    pub fn as_object(&self) -> Result<&JsonMap, CodecError> {
        match self {
            JsonValue::Object(map) => Ok(map),
            other => Err(CodecError::mismatch("object", other.kind_name())),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut JsonMap, CodecError> {
        match self {
            JsonValue::Object(map) => Ok(map),
            other => Err(CodecError::mismatch("object", other.kind_name())),
        }
    }

    /// Looks up `key` when this is an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Appends to an array.
    ///
    /// # Errors
    /// Returns `TypeMismatch` when this is not an array.
    pub fn push(&mut self, value: impl Into<JsonValue>) -> Result<(), CodecError> {
        self.as_array_mut()?.push(value.into());
        Ok(())
    }

    /// Inserts into an object, keeping the first position of a repeated key.
    ///
    /// # Errors
    /// Returns `TypeMismatch` when this is not an object.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Result<(), CodecError> {
        self.as_object_mut()?.insert(key.into(), value.into());
        Ok(())
    }

    #[must_use]
    pub fn to_compact_string(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        format!("{self:#}")
    }

    /// Renders with `indent` spaces per level; zero gives the compact form.
    #[must_use]
    pub fn render(&self, indent: usize) -> String {
        Indented { value: self, indent }.to_string()
    }
}

pub const PRETTY_INDENT: usize = 2;

/// Marks an object as a back-reference to an earlier `$id`.
pub const REF_KEY: &str = "$ref";
/// Numbers an object so later `$ref`s can point at it.
pub const ID_KEY: &str = "$id";
/// Names the runtime type when it differs from the declared one.
pub const TYPE_KEY: &str = "$type";
/// Holds a non-object payload wrapped together with `$type` or `$id`.
pub const CONTENT_KEY: &str = "$content";

pub const RESERVED_KEYS: [&str; 4] = [REF_KEY, ID_KEY, TYPE_KEY, CONTENT_KEY];

impl Display for JsonValue {
    /// `{}` renders compact text, `{:#}` renders pretty text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = if f.alternate() { PRETTY_INDENT } else { 0 };
        write_value(f, self, indent, 0)
    }
}

struct Indented<'a> {
    value: &'a JsonValue,
    indent: usize,
}

impl Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.value, self.indent, 0)
    }
}

fn write_value<W: Write>(out: &mut W, value: &JsonValue, indent: usize, level: usize) -> fmt::Result {
    match value {
        JsonValue::Null => out.write_str("null"),
        JsonValue::Boolean(b) => out.write_str(if *b { "true" } else { "false" }),
        JsonValue::Int64(n) => write!(out, "{n}"),
        JsonValue::Double(n) => write_double(out, *n),
        JsonValue::String(s) => write_string(out, s),
        JsonValue::Array(items) => {
            if items.is_empty() {
                return out.write_str("[]");
            }
            out.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_newline(out, indent, level + 1)?;
                write_value(out, item, indent, level + 1)?;
            }
            write_newline(out, indent, level)?;
            out.write_char(']')
        }
        JsonValue::Object(map) => {
            if map.is_empty() {
                return out.write_str("{}");
            }
            out.write_char('{')?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write_newline(out, indent, level + 1)?;
                write_string(out, key)?;
                out.write_str(if indent > 0 { ": " } else { ":" })?;
                write_value(out, item, indent, level + 1)?;
            }
            write_newline(out, indent, level)?;
            out.write_char('}')
        }
    }
}

fn write_newline<W: Write>(out: &mut W, indent: usize, level: usize) -> fmt::Result {
    if indent == 0 {
        return Ok(());
    }
    out.write_char('\n')?;
    for _ in 0..indent * level {
        out.write_char(' ')?;
    }
    Ok(())
}

fn write_double<W: Write>(out: &mut W, n: f64) -> fmt::Result {
    if !n.is_finite() {
        return out.write_str("null");
    }
    let text = n.to_string();
    out.write_str(&text)?;
    // Keep a fraction so the text reads back as a double.
    if !text.contains(['.', 'e', 'E']) {
        out.write_str(".0")?;
    }
    Ok(())
}

fn write_string<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\u{08}' => out.write_str("\\b")?,
            '\u{0C}' => out.write_str("\\f")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::Boolean(b)
    }
}

impl From<i64> for JsonValue {
    fn from(n: i64) -> Self {
        JsonValue::Int64(n)
    }
}

impl From<i32> for JsonValue {
    fn from(n: i32) -> Self {
        JsonValue::Int64(i64::from(n))
    }
}

impl From<u32> for JsonValue {
    fn from(n: u32) -> Self {
        JsonValue::Int64(i64::from(n))
    }
}

impl From<f64> for JsonValue {
    fn from(n: f64) -> Self {
        JsonValue::Double(n)
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::String(s.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        JsonValue::String(s)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(items: Vec<JsonValue>) -> Self {
        JsonValue::Array(items)
    }
}

impl From<JsonMap> for JsonValue {
    fn from(map: JsonMap) -> Self {
        JsonValue::Object(map)
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for JsonValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        JsonValue::Object(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
