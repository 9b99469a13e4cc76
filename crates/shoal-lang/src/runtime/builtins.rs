//! The builtin callables registered into the global scope when an
//! interpreter is constructed.

use crate::error::RuntimeError;
use crate::runtime::callable::{Builtin, Callable};
use crate::runtime::env::Environment;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;

pub(crate) fn install(globals: &Environment) {
    for builtin in BUILTINS {
        globals.declare(builtin.name, Value::Callable(Callable::Builtin(builtin)));
    }
}

static BUILTINS: &[Builtin] = &[
    Builtin { name: "print", arity: 1, run: builtin_print },
    Builtin { name: "exit", arity: 1, run: builtin_exit },
    Builtin { name: "length", arity: 1, run: builtin_length },
    Builtin { name: "int", arity: 1, run: builtin_int },
    Builtin { name: "str", arity: 1, run: builtin_str },
    Builtin { name: "append", arity: 2, run: builtin_append },
    Builtin { name: "keys", arity: 1, run: builtin_keys },
    Builtin { name: "export", arity: 2, run: builtin_export },
];

fn builtin_print(itp: &mut Interpreter, args: Vec<Value>, _line: usize) -> Result<Value, RuntimeError> {
    itp.write_out(args[0].to_string());
    Ok(Value::Nil)
}

fn builtin_exit(itp: &mut Interpreter, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    let Value::Number(code) = &args[0] else {
        return Err(RuntimeError::new(line,
            format!("exit() expects a number, got {}", args[0].type_name())));
    };
    itp.flush_output();
    std::process::exit(*code as i32);
}

fn builtin_length(_itp: &mut Interpreter, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    let len = match &args[0] {
        Value::Array(items) => items.borrow().len(),
        Value::Dict(entries) => entries.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(RuntimeError::new(line,
                format!("length() expects an array, dict, or string, got {}", other.type_name())));
        }
    };
    Ok(Value::Number(len as f64))
}

fn builtin_int(_itp: &mut Interpreter, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(n.trunc())),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(n) => Ok(Value::Number(n.trunc())),
            Err(_) => Err(RuntimeError::new(line,
                format!("int() cannot parse {s:?} as a number"))),
        },
        other => Err(RuntimeError::new(line,
            format!("int() expects a number or string, got {}", other.type_name()))),
    }
}

fn builtin_str(_itp: &mut Interpreter, args: Vec<Value>, _line: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Str(args[0].to_string()))
}

/// Pushes onto the array in place and hands the same array back, so calls
/// compose: `append(append(a, 1), 2)`.
fn builtin_append(_itp: &mut Interpreter, mut args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    let elem = args.pop().unwrap_or(Value::Nil);
    let array = args.pop().unwrap_or(Value::Nil);
    let Value::Array(items) = &array else {
        return Err(RuntimeError::new(line,
            format!("append() expects an array, got {}", array.type_name())));
    };
    items.borrow_mut().push(elem);
    Ok(array)
}

fn builtin_keys(_itp: &mut Interpreter, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    let Value::Dict(entries) = &args[0] else {
        return Err(RuntimeError::new(line,
            format!("keys() expects a dict, got {}", args[0].type_name())));
    };
    let keys = entries.borrow().iter().map(|(k, _)| k.clone()).collect();
    Ok(Value::array(keys))
}

fn builtin_export(_itp: &mut Interpreter, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
    let Value::Str(name) = &args[0] else {
        return Err(RuntimeError::new(line,
            format!("export() expects a string name, got {}", args[0].type_name())));
    };
    set_process_env(name, &args[1].to_string());
    Ok(Value::Nil)
}

pub(crate) fn set_process_env(name: &str, value: &str) {
    // SAFETY: execution is single-threaded; nothing reads the process
    // environment concurrently with this write.
    unsafe { std::env::set_var(name, value) };
}
