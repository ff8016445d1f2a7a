use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Payload carried through every cache tier: query rows, bound parameters,
/// output parameters and cache key elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Weak handle parked in a delegate by reference-based eviction.
    /// Exists only at runtime and can never be serialized.
    #[serde(skip)]
    Ref(ValueRef),
}

impl Value {
    /// Create an empty map value
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a property of a map value
    pub fn get(&self, property: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) => fields.get(property),
            _ => None,
        }
    }

    /// Set a property on a map value. Returns false when `self` is not a map.
    pub fn set_property(&mut self, property: &str, value: Value) -> bool {
        match self {
            Value::Map(fields) => {
                fields.insert(property.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Builder-style variant of [`Value::set_property`]
    pub fn with(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.set_property(property, value.into());
        self
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(fields) => fields.hash(state),
            Value::Ref(r) => r.addr().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Ref(r) => write!(f, "{:?}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Weak pointer to a cached value. Only reference-based eviction creates these.
#[derive(Clone)]
pub struct ValueRef(Weak<Value>);

impl ValueRef {
    pub(crate) fn new(value: &Arc<Value>) -> Self {
        Self(Arc::downgrade(value))
    }

    /// Strong handle to the referent, if it has not been reclaimed
    pub fn upgrade(&self) -> Option<Arc<Value>> {
        self.0.upgrade()
    }

    /// True once every strong holder has dropped the referent
    pub fn is_collected(&self) -> bool {
        self.0.strong_count() == 0
    }

    fn ptr_eq(&self, other: &ValueRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_collected() {
            write!(f, "Ref(<collected>)")
        } else {
            write!(f, "Ref(<live>)")
        }
    }
}

/// Pagination window applied by the external executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    pub const NO_ROW_OFFSET: usize = 0;
    pub const NO_ROW_LIMIT: usize = i32::MAX as usize;
    pub const DEFAULT: RowBounds = RowBounds {
        offset: Self::NO_ROW_OFFSET,
        limit: Self::NO_ROW_LIMIT,
    };

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_float_equality_uses_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(hash_of(&Value::Float(1.5)), hash_of(&Value::Float(1.5)));
    }

    #[test]
    fn test_variants_never_cross_compare() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Text("1".into()), Value::Int(1));
        assert_ne!(Value::Null, Value::List(vec![]));
    }

    #[test]
    fn test_set_property_on_map_only() {
        let mut row = Value::map();
        assert!(row.set_property("id", Value::Int(7)));
        assert_eq!(row.get("id"), Some(&Value::Int(7)));

        let mut scalar = Value::Int(1);
        assert!(!scalar.set_property("id", Value::Int(7)));
    }

    #[test]
    fn test_value_ref_tracks_collection() {
        let strong = Arc::new(Value::from("payload"));
        let weak = ValueRef::new(&strong);
        assert!(!weak.is_collected());
        assert_eq!(weak.upgrade().as_deref(), Some(&Value::from("payload")));

        drop(strong);
        assert!(weak.is_collected());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_from_json() {
        let v = Value::from(serde_json::json!({"id": 1, "tags": ["a", null]}));
        assert_eq!(v.get("id"), Some(&Value::Int(1)));
        assert_eq!(
            v.get("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::Null]))
        );
    }
}
