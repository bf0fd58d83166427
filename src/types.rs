use crate::error::{CodecError, ParserError};
use crate::parser::MAX_DEPTH;
use crate::registry::{EnumDef, StructDef};
use crate::value::Value;
use chrono::{DateTime, TimeDelta};
use miette::NamedSource;
use std::fmt::{self, Display};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Float64,
    Char,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 12] = [
        Primitive::Bool,
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::UInt8,
        Primitive::UInt16,
        Primitive::UInt32,
        Primitive::Float32,
        Primitive::Float64,
        Primitive::Char,
        Primitive::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt8 => "uint8",
            Primitive::UInt16 => "uint16",
            Primitive::UInt32 => "uint32",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::Char => "char",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Inclusive value range of the integer kinds.
    pub fn int_range(self) -> Option<(i64, i64)> {
        match self {
            Primitive::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            Primitive::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            Primitive::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            Primitive::Int64 => Some((i64::MIN, i64::MAX)),
            Primitive::UInt8 => Some((0, u8::MAX.into())),
            Primitive::UInt16 => Some((0, u16::MAX.into())),
            Primitive::UInt32 => Some((0, u32::MAX.into())),
            _ => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::Float32 | Primitive::Float64)
    }
}

const DATETIME: &str = "datetime";
const DURATION: &str = "duration";
const TYPE_REF: &str = "type";
const ANY: &str = "any";
const GENERICS: [&str; 3] = ["list", "set", "map"];

/// Names that user types cannot take.
pub fn is_builtin_name(name: &str) -> bool {
    Primitive::from_name(name).is_some()
        || [DATETIME, DURATION, TYPE_REF, ANY].contains(&name)
        || GENERICS.contains(&name)
}

/// A resolved storage type.
#[derive(Clone)]
pub enum Ty {
    Primitive(Primitive),
    Enum(Arc<EnumDef>),
    DateTime,
    Duration,
    /// A value that names a type.
    TypeRef,
    /// Any value; the runtime type decides the shape.
    Any,
    /// `T[]`: always replaced on read.
    Array(Box<Ty>),
    List(Box<Ty>),
    Set(Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Struct(Arc<StructDef>),
    Opaque(Arc<str>),
}

impl Ty {
    pub fn list_of(element: Ty) -> Self {
        Ty::List(Box::new(element))
    }

    pub fn map_of(key: Ty, value: Ty) -> Self {
        Ty::Map(Box::new(key), Box::new(value))
    }

    /// Canonical name, the same text `TypeCache` resolves back to this type.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Ty::Any)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Ty::Struct(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Ty::Array(_) | Ty::List(_) | Ty::Set(_) | Ty::Map(..))
    }

    /// Whether `null` is a legal value of this type.
    pub fn is_nullable(&self) -> bool {
        match self {
            Ty::Primitive(p) => *p == Primitive::String,
            Ty::Enum(_) | Ty::DateTime | Ty::Duration => false,
            _ => true,
        }
    }

    pub fn struct_def(&self) -> Option<&Arc<StructDef>> {
        match self {
            Ty::Struct(def) => Some(def),
            _ => None,
        }
    }

    /// The value a member of this type holds before anything is assigned.
    pub fn default_value(&self) -> Value {
        match self {
            Ty::Primitive(Primitive::Bool) => Value::Bool(false),
            Ty::Primitive(Primitive::Float32 | Primitive::Float64) => Value::Float(0.0),
            Ty::Primitive(Primitive::Char) => Value::Char('\0'),
            Ty::Primitive(Primitive::String) => Value::Null,
            Ty::Primitive(_) => Value::Int(0),
            Ty::Enum(def) => def
                .variants
                .first()
                .map(|v| Value::enumeration(def.name.as_str(), v.as_str()))
                .unwrap_or(Value::Null),
            Ty::DateTime => DateTime::from_timestamp(0, 0)
                .map(|epoch| Value::DateTime(epoch.fixed_offset()))
                .unwrap_or(Value::Null),
            Ty::Duration => Value::Duration(TimeDelta::zero()),
            _ => Value::Null,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(p) => f.write_str(p.name()),
            Ty::Enum(def) => f.write_str(&def.name),
            Ty::DateTime => f.write_str(DATETIME),
            Ty::Duration => f.write_str(DURATION),
            Ty::TypeRef => f.write_str(TYPE_REF),
            Ty::Any => f.write_str(ANY),
            Ty::Array(element) => write!(f, "{element}[]"),
            Ty::List(element) => write!(f, "list<{element}>"),
            Ty::Set(element) => write!(f, "set<{element}>"),
            Ty::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Ty::Struct(def) => f.write_str(&def.name),
            Ty::Opaque(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({self})")
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Primitive(a), Ty::Primitive(b)) => a == b,
            (Ty::Enum(a), Ty::Enum(b)) => a.name == b.name,
            (Ty::Struct(a), Ty::Struct(b)) => a.name == b.name,
            (Ty::Opaque(a), Ty::Opaque(b)) => a == b,
            (Ty::Array(a), Ty::Array(b))
            | (Ty::List(a), Ty::List(b))
            | (Ty::Set(a), Ty::Set(b)) => a == b,
            (Ty::Map(ka, va), Ty::Map(kb, vb)) => ka == kb && va == vb,
            (Ty::DateTime, Ty::DateTime)
            | (Ty::Duration, Ty::Duration)
            | (Ty::TypeRef, Ty::TypeRef)
            | (Ty::Any, Ty::Any) => true,
            _ => false,
        }
    }
}

impl Eq for Ty {}

/// A parsed type name with user type names still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeExpr {
    Named(String),
    Array(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

///    TypeExpr ::= Base { "[]" }
///    Base     ::= Ident [ "<" TypeExpr { "," TypeExpr } ">" ]
pub(crate) fn parse_type_name(text: &str) -> Result<TypeExpr, CodecError> {
    let mut cursor = TypeNameCursor {
        text,
        pos: 0,
        depth: 0,
    };
    let expr = cursor.parse_expr()?;
    cursor.skip_whitespace();
    if cursor.pos != text.len() {
        return Err(cursor.unknown());
    }
    Ok(expr)
}

struct TypeNameCursor<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl TypeNameCursor<'_> {
    fn parse_expr(&mut self) -> Result<TypeExpr, CodecError> {
        let mut expr = self.parse_base()?;
        let mut arrays = 0;
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("[]") {
                self.pos += 2;
                arrays += 1;
                if self.depth + arrays > MAX_DEPTH {
                    return Err(self.too_deep());
                }
                expr = TypeExpr::Array(Box::new(expr));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_base(&mut self) -> Result<TypeExpr, CodecError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if c == '<' || c == '>' || c == '[' || c == ']' || c == ',' || c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        let ident = &self.text[start..self.pos];
        if ident.is_empty() {
            return Err(self.unknown());
        }
        self.skip_whitespace();
        if !self.rest().starts_with('<') {
            if GENERICS.contains(&ident) {
                return Err(self.unknown());
            }
            return Ok(TypeExpr::Named(ident.to_string()));
        }
        self.pos += 1;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        let mut args = vec![self.parse_expr()?];
        self.skip_whitespace();
        while self.rest().starts_with(',') {
            self.pos += 1;
            args.push(self.parse_expr()?);
            self.skip_whitespace();
        }
        if !self.rest().starts_with('>') {
            return Err(self.unknown());
        }
        self.pos += 1;
        self.depth -= 1;
        let mut args = args.into_iter();
        match (ident, args.next(), args.next(), args.next()) {
            ("list", Some(element), None, None) => Ok(TypeExpr::List(Box::new(element))),
            ("set", Some(element), None, None) => Ok(TypeExpr::Set(Box::new(element))),
            ("map", Some(key), Some(value), None) => {
                Ok(TypeExpr::Map(Box::new(key), Box::new(value)))
            }
            _ => Err(self.unknown()),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn too_deep(&self) -> CodecError {
        CodecError::MalformedInput(ParserError::NestingTooDeep {
            src: NamedSource::new("type name", self.text.to_string()),
            span: (self.pos.saturating_sub(1), 1).into(),
            limit: MAX_DEPTH,
        })
    }

    fn unknown(&self) -> CodecError {
        CodecError::UnknownType {
            name: self.text.to_string(),
        }
    }
}

/// Resolves a single name without generic syntax to a non-user type.
pub(crate) fn builtin(name: &str) -> Option<Ty> {
    if let Some(p) = Primitive::from_name(name) {
        return Some(Ty::Primitive(p));
    }
    match name {
        DATETIME => Some(Ty::DateTime),
        DURATION => Some(Ty::Duration),
        TYPE_REF => Some(Ty::TypeRef),
        ANY => Some(Ty::Any),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(s: &str) -> Box<TypeExpr> {
        Box::new(TypeExpr::Named(s.to_string()))
    }

    #[test]
    fn test_parse_generic_names() {
        assert_eq!(
            parse_type_name("map<string, list<Person>>").unwrap(),
            TypeExpr::Map(named("string"), Box::new(TypeExpr::List(named("Person"))))
        );
        assert_eq!(
            parse_type_name(" int64 [] []").unwrap(),
            TypeExpr::Array(Box::new(TypeExpr::Array(named("int64"))))
        );
        assert_eq!(
            parse_type_name("set<int32>[]").unwrap(),
            TypeExpr::Array(Box::new(TypeExpr::Set(named("int32"))))
        );
    }

    #[test]
    fn test_parse_limits_nesting() {
        let nested = |n: usize| "list<".repeat(n) + "int32" + &">".repeat(n);
        assert!(parse_type_name(&nested(MAX_DEPTH)).is_ok());
        assert!(matches!(
            parse_type_name(&nested(MAX_DEPTH + 1)),
            Err(CodecError::MalformedInput(ParserError::NestingTooDeep { .. }))
        ));
        assert!(parse_type_name(&"list<".repeat(200_000)).is_err());
        assert!(parse_type_name(&("int32".to_string() + &"[]".repeat(MAX_DEPTH + 1))).is_err());
        // Siblings do not add up.
        let wide = format!("map<{}, {}>", nested(MAX_DEPTH - 1), nested(MAX_DEPTH - 1));
        assert!(parse_type_name(&wide).is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for text in ["", "list", "map<string>", "list<a, b>", "list<int64", "a b", "x<y>", "[]"] {
            assert!(
                matches!(parse_type_name(text), Err(CodecError::UnknownType { .. })),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_canonical_names() {
        let ty = Ty::map_of(
            Ty::Primitive(Primitive::String),
            Ty::Array(Box::new(Ty::Primitive(Primitive::Int64))),
        );
        assert_eq!(ty.name(), "map<string, int64[]>");
        assert_eq!(format!("{ty:?}"), "Ty(map<string, int64[]>)");
    }

    #[test]
    fn test_nullability_and_defaults() {
        assert!(!Ty::Primitive(Primitive::Int32).is_nullable());
        assert!(Ty::Primitive(Primitive::String).is_nullable());
        assert!(Ty::list_of(Ty::Any).is_nullable());
        assert!(!Ty::Duration.is_nullable());

        assert_eq!(Ty::Primitive(Primitive::UInt8).default_value(), Value::Int(0));
        assert_eq!(Ty::Primitive(Primitive::String).default_value(), Value::Null);
        let color = Ty::Enum(Arc::new(EnumDef::new("Color", ["Red", "Blue"])));
        assert_eq!(color.default_value(), Value::enumeration("Color", "Red"));
        match Ty::DateTime.default_value() {
            Value::DateTime(dt) => assert_eq!(dt.timestamp(), 0),
            other => panic!("Expected epoch, got {other:?}"),
        }
    }

    #[test]
    fn test_int_ranges() {
        assert_eq!(Primitive::UInt8.int_range(), Some((0, 255)));
        assert_eq!(Primitive::Int16.int_range(), Some((-32768, 32767)));
        assert_eq!(Primitive::Float32.int_range(), None);
        assert!(is_builtin_name("any"));
        assert!(is_builtin_name("map"));
        assert!(!is_builtin_name("Person"));
    }
}
