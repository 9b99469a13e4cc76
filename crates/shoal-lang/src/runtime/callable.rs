use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::runtime::env::Environment;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;
use crate::syntax::ast::Stmt;

/// Everything invokable through call syntax. Cloning is cheap: user-defined
/// kinds hold their definition behind an `Rc`.
#[derive(Clone)]
pub enum Callable {
    /// `fn name(…) { … }`
    Function(Rc<FunctionDef>),
    /// `fn (…) { … }`
    Lambda(Rc<FunctionDef>),
    /// Registered by a `data` declaration; arity equals the field count.
    Constructor(Rc<RecordType>),
    Builtin(&'static Builtin),
}

pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub closure: Rc<Environment>,
}

pub struct RecordType {
    pub name: String,
    pub fields: Vec<String>,
}

pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub run: fn(&mut Interpreter, Vec<Value>, usize) -> Result<Value, RuntimeError>,
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(def) | Callable::Lambda(def) => def.params.len(),
            Callable::Constructor(rec) => rec.fields.len(),
            Callable::Builtin(b) => b.arity,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Callable::Function(def) => &def.name,
            Callable::Lambda(_) => "lambda",
            Callable::Constructor(rec) => &rec.name,
            Callable::Builtin(b) => b.name,
        }
    }

    /// Identity comparison for `==`: two callables are equal only when they
    /// are the same definition, not when they happen to look alike.
    pub fn identical(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b))
            | (Callable::Lambda(a), Callable::Lambda(b)) => Rc::ptr_eq(a, b),
            (Callable::Constructor(a), Callable::Constructor(b)) => Rc::ptr_eq(a, b),
            (Callable::Builtin(a), Callable::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(def) => write!(f, "<fn {}>", def.name),
            Callable::Lambda(_) => write!(f, "<lambda>"),
            Callable::Constructor(rec) => write!(f, "<data {}>", rec.name),
            Callable::Builtin(b) => write!(f, "<builtin {}>", b.name),
        }
    }
}
