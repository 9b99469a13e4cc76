use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::callable::Callable;
use crate::runtime::env::Environment;

/// A runtime value. Arrays and dictionaries are reference types: cloning a
/// `Value` clones the handle, so aliases observe each other's mutations.
#[derive(Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    Array(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered key/value pairs. Lookup is a linear scan with
    /// structural key comparison; inserting an existing key is a no-op.
    Dict(Rc<RefCell<Vec<(Value, Value)>>>),
    Callable(Callable),
    Object(Rc<Instance>),
}

/// A record instance. Fields live in a parentless environment, so a field
/// lookup never falls through to an enclosing scope.
pub struct Instance {
    pub type_name: String,
    pub fields: Rc<Environment>,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: Vec<(Value, Value)>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Callable(_) => "callable",
            Value::Object(_) => "object",
        }
    }

    /// Equality for `==`/`!=`. `None` means the variants differ, which the
    /// evaluator surfaces as a type error rather than `false`.
    pub fn try_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a == b),
            (Value::Str(a), Value::Str(b)) => Some(a == b),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            (Value::Nil, Value::Nil) => Some(true),
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                Some(a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y)))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                Some(a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                        ka.loose_eq(kb) && va.loose_eq(vb)
                    }))
            }
            (Value::Callable(a), Value::Callable(b)) => Some(a.identical(b)),
            (Value::Object(a), Value::Object(b)) => Some(Rc::ptr_eq(a, b)),
            _ => None,
        }
    }

    /// Structural equality where a variant mismatch is simply `false`.
    /// Used for dictionary key lookup and nested collection comparison.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

// Canonical stringification, shared by `print`, `str()`, and interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                let entries = entries.borrow();
                if entries.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 { write!(f, ",\n ")?; }
                    write!(f, "{k} : {v}")?;
                }
                write!(f, "}}")
            }
            Value::Callable(c) => write!(f, "{c}"),
            Value::Object(obj) => write!(f, "<{} instance>", obj.type_name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_stringify_shortest_round_trip() {
        assert_eq!(Value::Number(123.0).to_string(), "123");
        assert_eq!(Value::Number(123.45).to_string(), "123.45");
        assert_eq!(Value::Number(0.1).to_string(), "0.1");
        assert_eq!(Value::Number(-2.0).to_string(), "-2");
    }

    #[test]
    fn collections_stringify() {
        assert_eq!(Value::array(vec![]).to_string(), "[]");
        assert_eq!(
            Value::array(vec![Value::Number(1.0), Value::Str("x".into())]).to_string(),
            "[1, x]"
        );
        assert_eq!(Value::dict(vec![]).to_string(), "{}");
        assert_eq!(
            Value::dict(vec![
                (Value::Str("a".into()), Value::Number(1.0)),
                (Value::Str("b".into()), Value::Number(2.0)),
            ])
            .to_string(),
            "{a : 1,\n b : 2}"
        );
    }

    #[test]
    fn equality_is_same_variant_only() {
        assert_eq!(Value::Number(1.0).try_eq(&Value::Number(1.0)), Some(true));
        assert_eq!(Value::Nil.try_eq(&Value::Nil), Some(true));
        assert_eq!(Value::Number(1.0).try_eq(&Value::Str("1".into())), None);
        assert_eq!(Value::Nil.try_eq(&Value::Number(0.0)), None);
    }

    #[test]
    fn arrays_compare_structurally() {
        let a = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let c = Value::array(vec![Value::Number(1.0)]);
        assert_eq!(a.try_eq(&b), Some(true));
        assert_eq!(a.try_eq(&c), Some(false));
    }
}
