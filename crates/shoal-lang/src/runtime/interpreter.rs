use std::cell::RefCell;
use std::rc::Rc;

use crate::Program;
use crate::analysis::Locals;
use crate::error::RuntimeError;
use crate::runtime::builtins;
use crate::runtime::callable::{Callable, FunctionDef, RecordType};
use crate::runtime::env::Environment;
use crate::runtime::shell::{CommandRunner, SystemRunner};
use crate::runtime::value::{Instance, Value};
use crate::syntax::ast::*;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;

/// How a statement finished. `Break` and `Return` unwind to the innermost
/// loop and call boundary respectively; the resolver guarantees they cannot
/// escape past the top level.
enum Flow {
    Normal,
    Break,
    Return(Value),
}

pub struct Interpreter {
    /// Current scope. At the top level this is the persistent global
    /// environment, which is what makes declarations survive across the
    /// programs a REPL session feeds through `run`.
    env: Rc<Environment>,
    /// Hop table accumulated across runs. Node ids are globally unique, so
    /// entries from earlier REPL lines stay valid for closures they produced.
    locals: Locals,
    output: Rc<RefCell<Vec<String>>>,
    runner: Box<dyn CommandRunner>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemRunner))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        let globals = Environment::root();
        builtins::install(&globals);
        Self {
            env: globals,
            locals: Locals::new(),
            output: Rc::new(RefCell::new(Vec::new())),
            runner,
        }
    }

    /// Executes a compiled program against the interpreter's persistent
    /// global environment. On error the current run is abandoned; bindings
    /// made by statements that already completed are kept.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.locals.extend(program.locals.iter().map(|(id, hops)| (*id, *hops)));
        for stmt in &program.stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Drains the lines produced by `print` since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        self.output.borrow_mut().drain(..).collect()
    }

    /// Prints and clears the buffered output. `exit()` calls this before
    /// terminating the process.
    pub fn flush_output(&mut self) {
        for line in self.output.borrow_mut().drain(..) {
            println!("{line}");
        }
    }

    pub(crate) fn write_out(&mut self, line: String) {
        self.output.borrow_mut().push(line);
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
                Ok(Flow::Normal)
            }

            Stmt::VarDecl { name, storage, init, span } => {
                let value = self.eval_expr(init)?;
                if *storage == Storage::Exported {
                    // one-time snapshot: later plain assignments to this name
                    // do not touch the process environment again
                    builtins::set_process_env(name, &value.to_string());
                }
                if !self.env.declare(name, value) {
                    return Err(RuntimeError::new(span.line, format!(
                        "`{name}` is already declared in this scope (depth {})",
                        self.env.depth()
                    )));
                }
                Ok(Flow::Normal)
            }

            Stmt::Assign { target, op, value, span } => {
                let new = match op {
                    AssignOp::Set => self.eval_expr(value)?,
                    compound => {
                        let current = self.read_target(target, span.line)?;
                        let rhs = self.eval_expr(value)?;
                        let bin_op = match compound {
                            AssignOp::Add => BinOp::Add,
                            AssignOp::Sub => BinOp::Sub,
                            AssignOp::Mul => BinOp::Mul,
                            AssignOp::Div => BinOp::Div,
                            AssignOp::Set => unreachable!(),
                        };
                        self.binary(bin_op, current, rhs, span.line)?
                    }
                };
                self.write_target(target, new, span.line)?;
                Ok(Flow::Normal)
            }

            Stmt::IncDec { target, dec, span } => {
                let current = self.read_target(target, span.line)?;
                let op = if *dec { BinOp::Sub } else { BinOp::Add };
                let new = self.binary(op, current, Value::Number(1.0), span.line)?;
                self.write_target(target, new, span.line)?;
                Ok(Flow::Normal)
            }

            Stmt::Block(stmts, _) => self.exec_scoped(stmts),

            Stmt::If { cond, then_block, else_block, span } => {
                if self.eval_condition(cond, span.line)? {
                    self.exec_scoped(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_scoped(else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { cond, body, span } => {
                while self.eval_condition(cond, span.line)? {
                    match self.exec_scoped(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Return(value, _) => {
                let value = self.eval_expr(value)?;
                Ok(Flow::Return(value))
            }

            Stmt::FnDecl { name, params, body, span } => {
                let def = FunctionDef {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: Rc::clone(&self.env),
                };
                let value = Value::Callable(Callable::Function(Rc::new(def)));
                if !self.env.declare(name, value) {
                    return Err(RuntimeError::new(span.line,
                        format!("`{name}` is already declared in this scope")));
                }
                Ok(Flow::Normal)
            }

            Stmt::DataDecl { name, fields, span } => {
                let rec = RecordType { name: name.clone(), fields: fields.clone() };
                let value = Value::Callable(Callable::Constructor(Rc::new(rec)));
                if !self.env.declare(name, value) {
                    return Err(RuntimeError::new(span.line,
                        format!("`{name}` is already declared in this scope")));
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs statements in exactly one fresh child scope, restoring the
    /// previous environment on every exit path, errors included.
    fn exec_scoped(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        let prev = Rc::clone(&self.env);
        self.env = Environment::with_parent(Rc::clone(&prev));
        let result = self.exec_stmts(stmts);
        self.env = prev;
        result
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_condition(&mut self, cond: &Expr, line: usize) -> Result<bool, RuntimeError> {
        match self.eval_expr(cond)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::new(line,
                format!("condition must be a bool, got {}", other.type_name()))),
        }
    }

    // ─── Assignment targets ──────────────────────────────────────────────────

    fn read_target(&mut self, target: &AssignTarget, line: usize) -> Result<Value, RuntimeError> {
        match target {
            AssignTarget::Ident { name, id } => self.lookup_var(name, *id, line),
            AssignTarget::Field { target, field } => {
                let object = self.eval_expr(target)?;
                self.read_field(&object, field, line)
            }
        }
    }

    fn write_target(&mut self, target: &AssignTarget, value: Value, line: usize) -> Result<(), RuntimeError> {
        match target {
            AssignTarget::Ident { name, id } => {
                let ok = match self.locals.get(id) {
                    Some(&hops) => self.env.assign_at(hops, name, value),
                    None => self.env.assign(name, value),
                };
                if ok {
                    Ok(())
                } else {
                    Err(RuntimeError::new(line,
                        format!("assignment to undeclared name `{name}`")))
                }
            }
            AssignTarget::Field { target, field } => {
                let object = self.eval_expr(target)?;
                let Value::Object(instance) = &object else {
                    return Err(RuntimeError::new(line, format!(
                        "cannot assign field `{field}` on {}", object.type_name())));
                };
                if instance.fields.assign(field, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::new(line, format!(
                        "unknown field `{field}` on {}", instance.type_name)))
                }
            }
        }
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit, _) => Ok(match lit {
                Lit::Number(n) => Value::Number(*n),
                Lit::Str(s) => Value::Str(s.clone()),
                Lit::Bool(b) => Value::Bool(*b),
                Lit::Nil => Value::Nil,
            }),

            Expr::Interp(raw, span) => {
                let text = self.interpolate(raw, span.line)?;
                Ok(Value::Str(text))
            }

            Expr::Ident { name, id, span } => self.lookup_var(name, *id, span.line),

            Expr::Paren(inner, _) => self.eval_expr(inner),

            Expr::Unary { op, operand, span } => {
                let value = self.eval_expr(operand)?;
                match (op, &value) {
                    (UnOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::Neg, _) => Err(RuntimeError::new(span.line,
                        format!("cannot negate {}", value.type_name()))),
                    (UnOp::Not, _) => Err(RuntimeError::new(span.line,
                        format!("`!` expects a bool, got {}", value.type_name()))),
                }
            }

            Expr::Binary { left, op: BinOp::And, right, span } => {
                if !self.eval_bool_operand(left, "&&", span.line)? {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_bool_operand(right, "&&", span.line)?;
                Ok(Value::Bool(right))
            }

            Expr::Binary { left, op: BinOp::Or, right, span } => {
                if self.eval_bool_operand(left, "||", span.line)? {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_bool_operand(right, "||", span.line)?;
                Ok(Value::Bool(right))
            }

            Expr::Binary { left, op, right, span } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.binary(*op, left, right, span.line)
            }

            Expr::Call { callee, args, span } => {
                let callee = self.eval_expr(callee)?;
                let callable = match callee {
                    Value::Callable(c) => c,
                    other => {
                        return Err(RuntimeError::new(span.line,
                            format!("{} is not callable", other.type_name())));
                    }
                };
                // arity is checked before argument side effects can happen
                if args.len() != callable.arity() {
                    return Err(RuntimeError::new(span.line, format!(
                        "{}() expects {} arguments, got {}",
                        callable.name(), callable.arity(), args.len()
                    )));
                }
                let mut argv = Vec::with_capacity(args.len());
                for arg in args {
                    argv.push(self.eval_expr(arg)?);
                }
                self.invoke(&callable, argv, span.line)
            }

            Expr::Lambda { params, body, .. } => {
                let def = FunctionDef {
                    name: String::new(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: Rc::clone(&self.env),
                };
                Ok(Value::Callable(Callable::Lambda(Rc::new(def))))
            }

            // command text is passed through verbatim; braces in shell
            // syntax (awk, brace expansion) must not trigger interpolation
            Expr::Command(text, span) => {
                let captured = self.runner.run(text).map_err(|e| {
                    RuntimeError::new(span.line, format!("command failed to run: {e}"))
                })?;
                Ok(Value::Str(captured))
            }

            Expr::Array(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::array(values))
            }

            Expr::Index { target, index, span } => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                self.index_value(&target, &index, span.line)
            }

            Expr::Slice { target, start, end, span } => {
                let target = self.eval_expr(target)?;
                let start = self.eval_bound(start.as_deref(), span.line)?;
                let end = self.eval_bound(end.as_deref(), span.line)?;
                self.slice_value(&target, start, end, span.line)
            }

            Expr::Dict { entries, .. } => {
                let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key {
                        DictKey::Name(name) => Value::Str(name.clone()),
                        DictKey::Computed(expr) => self.eval_expr(expr)?,
                    };
                    let value = self.eval_expr(value)?;
                    // first value wins: inserting an existing key is a no-op
                    if !pairs.iter().any(|(k, _)| k.loose_eq(&key)) {
                        pairs.push((key, value));
                    }
                }
                Ok(Value::dict(pairs))
            }

            Expr::Field { target, field, span } => {
                let object = self.eval_expr(target)?;
                self.read_field(&object, field, span.line)
            }
        }
    }

    fn eval_bool_operand(&mut self, expr: &Expr, op: &str, line: usize) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::new(line,
                format!("operands of `{op}` must be bool, got {}", other.type_name()))),
        }
    }

    fn lookup_var(&self, name: &str, id: NodeId, line: usize) -> Result<Value, RuntimeError> {
        let found = match self.locals.get(&id) {
            Some(&hops) => self.env.get_at(hops, name),
            // not statically resolvable: dynamic chain walk, the path taken
            // by interpolated expressions and cross-line REPL references
            None => self.env.lookup(name),
        };
        found.ok_or_else(|| RuntimeError::new(line, format!("unbound identifier `{name}`")))
    }

    fn read_field(&self, object: &Value, field: &str, line: usize) -> Result<Value, RuntimeError> {
        let Value::Object(instance) = object else {
            return Err(RuntimeError::new(line,
                format!("cannot read field `{field}` of {}", object.type_name())));
        };
        instance.fields.lookup(field).ok_or_else(|| {
            RuntimeError::new(line,
                format!("unknown field `{field}` on {}", instance.type_name))
        })
    }

    // ─── Operators ───────────────────────────────────────────────────────────

    fn binary(&self, op: BinOp, left: Value, right: Value, line: usize) -> Result<Value, RuntimeError> {
        use BinOp::*;
        let result = match (op, &left, &right) {
            (Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Add, Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),

            (Sub, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
            (Mul, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
            // division by zero follows IEEE semantics, yielding infinity
            (Div, Value::Number(a), Value::Number(b)) => Value::Number(a / b),

            (Lt, Value::Number(a), Value::Number(b)) => Value::Bool(a < b),
            (LtEq, Value::Number(a), Value::Number(b)) => Value::Bool(a <= b),
            (Gt, Value::Number(a), Value::Number(b)) => Value::Bool(a > b),
            (GtEq, Value::Number(a), Value::Number(b)) => Value::Bool(a >= b),

            (Lt, Value::Str(a), Value::Str(b)) => Value::Bool(a < b),
            (LtEq, Value::Str(a), Value::Str(b)) => Value::Bool(a <= b),
            (Gt, Value::Str(a), Value::Str(b)) => Value::Bool(a > b),
            (GtEq, Value::Str(a), Value::Str(b)) => Value::Bool(a >= b),

            (Eq, _, _) | (NotEq, _, _) => {
                let eq = left.try_eq(&right).ok_or_else(|| {
                    RuntimeError::new(line, format!(
                        "cannot compare {} with {}",
                        left.type_name(), right.type_name()
                    ))
                })?;
                Value::Bool(if op == Eq { eq } else { !eq })
            }

            _ => {
                return Err(RuntimeError::new(line, format!(
                    "cannot apply `{}` to {} and {}",
                    op.symbol(), left.type_name(), right.type_name()
                )));
            }
        };
        Ok(result)
    }

    // ─── Indexing & slicing ──────────────────────────────────────────────────

    fn index_value(&self, target: &Value, index: &Value, line: usize) -> Result<Value, RuntimeError> {
        match target {
            Value::Array(items) => {
                let items = items.borrow();
                let i = as_index(index, line)?;
                items.get(i).cloned().ok_or_else(|| {
                    RuntimeError::new(line, format!(
                        "array index {i} out of range (length {})", items.len()))
                })
            }
            Value::Str(s) => {
                let i = as_index(index, line)?;
                s.chars().nth(i).map(|c| Value::Str(c.to_string())).ok_or_else(|| {
                    RuntimeError::new(line, format!(
                        "string index {i} out of range (length {})", s.chars().count()))
                })
            }
            Value::Dict(entries) => entries
                .borrow()
                .iter()
                .find(|(k, _)| k.loose_eq(index))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    RuntimeError::new(line, format!("missing dictionary key {index}"))
                }),
            other => Err(RuntimeError::new(line,
                format!("cannot index {}", other.type_name()))),
        }
    }

    fn eval_bound(&mut self, bound: Option<&Expr>, line: usize) -> Result<Option<usize>, RuntimeError> {
        match bound {
            None => Ok(None),
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                Ok(Some(as_index(&value, line)?))
            }
        }
    }

    /// Slice bounds are clamped: a missing start is 0, a missing end is the
    /// length, and an inverted range is empty.
    fn slice_value(&self, target: &Value, start: Option<usize>, end: Option<usize>, line: usize) -> Result<Value, RuntimeError> {
        match target {
            Value::Array(items) => {
                let items = items.borrow();
                let (s, e) = clamp_range(start, end, items.len());
                Ok(Value::array(items[s..e].to_vec()))
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let (s, e) = clamp_range(start, end, chars.len());
                Ok(Value::Str(chars[s..e].iter().collect()))
            }
            other => Err(RuntimeError::new(line,
                format!("cannot slice {}", other.type_name()))),
        }
    }

    // ─── Invocation ──────────────────────────────────────────────────────────

    fn invoke(&mut self, callable: &Callable, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
        match callable {
            Callable::Function(def) | Callable::Lambda(def) => {
                let call_env = Environment::with_parent(Rc::clone(&def.closure));
                for (param, arg) in def.params.iter().zip(args) {
                    call_env.declare(param, arg);
                }
                // the body runs directly in the call environment; an extra
                // block scope here would desynchronize the hop table
                let prev = Rc::clone(&self.env);
                self.env = call_env;
                let result = self.exec_stmts(&def.body);
                self.env = prev;
                match result? {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Nil),
                }
            }

            Callable::Constructor(rec) => {
                let fields = Environment::root();
                for (field, arg) in rec.fields.iter().zip(args) {
                    fields.declare(field, arg);
                }
                Ok(Value::Object(Rc::new(Instance {
                    type_name: rec.name.clone(),
                    fields,
                })))
            }

            Callable::Builtin(builtin) => (builtin.run)(self, args, line),
        }
    }

    // ─── String interpolation ────────────────────────────────────────────────

    /// Splits a raw literal into text spans and `{expr}` segments; each
    /// segment is lexed, parsed, and evaluated independently against the
    /// current environment, then stringified into place. `\{` and `\}`
    /// produce literal braces.
    fn interpolate(&mut self, raw: &str, line: usize) -> Result<String, RuntimeError> {
        let mut out = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.peek() {
                    Some('{') => { chars.next(); out.push('{'); }
                    Some('}') => { chars.next(); out.push('}'); }
                    _ => out.push('\\'),
                },
                '{' => {
                    if chars.peek() == Some(&'{') {
                        return Err(RuntimeError::new(line,
                            "nested `{{` is not allowed in string interpolation"));
                    }
                    let mut src = String::new();
                    let mut closed = false;
                    while let Some(c) = chars.next() {
                        match c {
                            '}' => { closed = true; break; }
                            '{' => {
                                return Err(RuntimeError::new(line,
                                    "nested `{` is not allowed in string interpolation"));
                            }
                            _ => src.push(c),
                        }
                    }
                    if !closed {
                        return Err(RuntimeError::new(line,
                            "unmatched `{` in string interpolation"));
                    }
                    let value = self.eval_embedded(&src, line)?;
                    out.push_str(&value.to_string());
                }
                '}' => {
                    return Err(RuntimeError::new(line,
                        "unmatched `}` in string interpolation"));
                }
                _ => out.push(c),
            }
        }

        Ok(out)
    }

    fn eval_embedded(&mut self, src: &str, line: usize) -> Result<Value, RuntimeError> {
        let tokens = Lexer::new(src).tokenize().map_err(|e| {
            RuntimeError::new(line, format!("in interpolated expression: {e}"))
        })?;
        let expr = Parser::parse_single_expr(tokens).map_err(|e| {
            RuntimeError::new(line, format!("in interpolated expression: {e}"))
        })?;
        // fresh node ids are absent from the hop table, so embedded
        // identifiers resolve through the dynamic lookup path
        self.eval_expr(&expr)
    }
}

fn as_index(value: &Value, line: usize) -> Result<usize, RuntimeError> {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        Value::Number(n) => Err(RuntimeError::new(line,
            format!("index must be a non-negative integer, got {n}"))),
        other => Err(RuntimeError::new(line,
            format!("index must be a number, got {}", other.type_name()))),
    }
}

fn clamp_range(start: Option<usize>, end: Option<usize>, len: usize) -> (usize, usize) {
    let s = start.unwrap_or(0).min(len);
    let e = end.unwrap_or(len).min(len).max(s);
    (s, e)
}
