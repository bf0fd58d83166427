use chrono::{DateTime, FixedOffset, TimeDelta};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// A value in an object graph.
///
/// Everything except [`Value::Object`] is plain data. Objects are shared,
/// mutable and compared by identity, which is what lets a graph contain
/// cycles and shared sub-objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(String),
    Enum(EnumValue),
    DateTime(DateTime<FixedOffset>),
    Duration(TimeDelta),
    /// A reference to a type, by canonical name.
    Type(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_name: String,
    pub variant: String,
}

impl Value {
    pub fn enumeration(enum_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Value::Enum(EnumValue {
            enum_name: enum_name.into(),
            variant: variant.into(),
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Type(_) => "type",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Structural equality that follows objects by content instead of identity.
    ///
    /// Cycles are handled by assuming a pair of objects already under
    /// comparison is equal, so two isomorphic cyclic graphs compare equal.
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut visiting = HashSet::new();
        deep_eq_inner(self, other, &mut visiting)
    }
}

fn deep_eq_inner(a: &Value, b: &Value, visiting: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| deep_eq_inner(x, y, visiting))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs.iter().zip(ys).all(|((kx, vx), (ky, vy))| {
                    deep_eq_inner(kx, ky, visiting) && deep_eq_inner(vx, vy, visiting)
                })
        }
        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) || !visiting.insert((x.identity(), y.identity())) {
                return true;
            }
            if x.type_name() != y.type_name() {
                return false;
            }
            let x_fields = x.fields();
            let y_fields = y.fields();
            x_fields.len() == y_fields.len()
                && x_fields.iter().all(|(name, xv)| {
                    y_fields
                        .get(name)
                        .is_some_and(|yv| deep_eq_inner(xv, yv, visiting))
                })
        }
        _ => a == b,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<TimeDelta> for Value {
    fn from(d: TimeDelta) -> Self {
        Value::Duration(d)
    }
}

/// An instance of a struct type: its runtime type name and field values.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub type_name: String,
    pub fields: IndexMap<String, Value>,
}

/// A shared handle to an [`Object`]. Equality is identity.
///
/// Graphs with cycles are `Rc` cycles and are not freed when dropped.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(type_name: impl Into<String>) -> Self {
        ObjectRef(Rc::new(RefCell::new(Object {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        })))
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name.clone()
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.borrow().fields.get(field).cloned()
    }

    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().fields.insert(field.into(), value.into());
    }

    pub fn field_names(&self) -> Vec<String> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    /// Snapshot of the fields; nested objects are shared, not copied.
    pub fn fields(&self) -> IndexMap<String, Value> {
        self.0.borrow().fields.clone()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-based identity, stable while any handle is alive.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    // Fields are left out: following them would not terminate on cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(obj) => write!(f, "{}@{:#x}", obj.type_name, self.identity()),
            Err(_) => write!(f, "<borrowed>@{:#x}", self.identity()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_equality_is_identity() {
        let a = ObjectRef::new("Point").with("x", 1);
        let b = ObjectRef::new("Point").with("x", 1);
        assert_ne!(Value::Object(a.clone()), Value::Object(b.clone()));
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert!(Value::Object(a).deep_eq(&Value::Object(b)));
    }

    #[test]
    fn test_deep_eq_on_cycles() {
        let a = ObjectRef::new("Node").with("id", 1);
        a.set("next", a.clone());
        let b = ObjectRef::new("Node").with("id", 1);
        b.set("next", b.clone());
        assert!(Value::Object(a.clone()).deep_eq(&Value::Object(b.clone())));

        b.set("id", 2);
        assert!(!Value::Object(a).deep_eq(&Value::Object(b)));
    }

    #[test]
    fn test_deep_eq_field_order_irrelevant() {
        let a = ObjectRef::new("P").with("x", 1).with("y", 2);
        let b = ObjectRef::new("P").with("y", 2).with("x", 1);
        assert!(Value::Object(a).deep_eq(&Value::Object(b)));
    }

    #[test]
    fn test_debug_does_not_follow_cycles() {
        let a = ObjectRef::new("Node");
        a.set("next", a.clone());
        let text = format!("{:?}", Value::Object(a));
        assert!(text.contains("Node@0x"));
    }

    #[test]
    fn test_missing_field_is_none() {
        let obj = ObjectRef::new("Empty");
        assert!(obj.get("nothing").is_none());
        assert!(obj.field_names().is_empty());
    }
}
