//! Static resolution pass. Walks the tree between parsing and evaluation,
//! computing for each identifier use the number of environment hops to the
//! scope that declares it, and rejecting structurally invalid programs
//! (`break` outside a loop, `return` outside a function, a variable read in
//! its own initializer).
//!
//! Names that resolve to no lexical scope are left out of the hop table; the
//! evaluator falls back to a dynamic environment-chain walk for those, which
//! is what lets a REPL line refer to bindings made by earlier lines.


use std::collections::HashMap;

use crate::error::{Error, ErrorCode};
use crate::syntax::ast::{AssignTarget, DictKey, Expr, NodeId, Span, Stmt};

/// Hop table: identifier node → scope distance from the use site.
pub type Locals = HashMap<NodeId, usize>;

pub fn resolve(stmts: &[Stmt]) -> Result<Locals, Error> {
    let mut r = Resolver::new();
    r.resolve_stmts(stmts)?;
    Ok(r.locals)
}

struct Resolver {
    /// Innermost scope last. A binding maps to `false` between declaration
    /// and the end of its initializer, `true` once usable.
    scopes: Vec<HashMap<String, bool>>,
    locals: Locals,
    loop_depth: usize,
    in_function: bool,
}

impl Resolver {
    fn new() -> Self {
        Self {
            // the global scope mirrors the interpreter's global environment
            scopes: vec![HashMap::new()],
            locals: Locals::new(),
            loop_depth: 0,
            in_function: false,
        }
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) -> Result<(), Error> {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        match stmt {
            Stmt::Expr(e) => self.resolve_expr(e),

            Stmt::VarDecl { name, init, .. } => {
                self.declare(name);
                self.resolve_expr(init)?;
                self.define(name);
                Ok(())
            }

            Stmt::Assign { target, value, .. } => {
                self.resolve_target(target)?;
                self.resolve_expr(value)
            }

            Stmt::IncDec { target, .. } => self.resolve_target(target),

            Stmt::Block(stmts, _) => {
                self.push_scope();
                let result = self.resolve_stmts(stmts);
                self.pop_scope();
                result
            }

            Stmt::If { cond, then_block, else_block, .. } => {
                self.resolve_expr(cond)?;
                self.push_scope();
                let result = self.resolve_stmts(then_block);
                self.pop_scope();
                result?;
                if let Some(else_block) = else_block {
                    self.push_scope();
                    let result = self.resolve_stmts(else_block);
                    self.pop_scope();
                    result?;
                }
                Ok(())
            }

            Stmt::While { cond, body, .. } => {
                self.resolve_expr(cond)?;
                self.loop_depth += 1;
                self.push_scope();
                let result = self.resolve_stmts(body);
                self.pop_scope();
                self.loop_depth -= 1;
                result
            }

            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    return Err(Error::new(ErrorCode::R002, span.line, span.column,
                        "`break` outside of a loop"));
                }
                Ok(())
            }

            Stmt::FnDecl { name, params, body, .. } => {
                // declared and defined before the body so recursion resolves
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body)
            }

            Stmt::Return(value, span) => {
                if !self.in_function {
                    return Err(Error::new(ErrorCode::R003, span.line, span.column,
                        "`return` outside of a function"));
                }
                self.resolve_expr(value)
            }

            Stmt::DataDecl { name, .. } => {
                self.declare(name);
                self.define(name);
                Ok(())
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Literal(..) => Ok(()),

            // embedded expressions are parsed and looked up dynamically at
            // evaluation time, so there is nothing to resolve here
            Expr::Interp(..) => Ok(()),
            Expr::Command(..) => Ok(()),

            Expr::Ident { name, id, span } => self.resolve_ident(name, *id, *span),

            Expr::Paren(inner, _) => self.resolve_expr(inner),
            Expr::Unary { operand, .. } => self.resolve_expr(operand),

            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }

            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee)?;
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }

            Expr::Lambda { params, body, .. } => self.resolve_function(params, body),

            Expr::Array(items, _) => {
                for item in items {
                    self.resolve_expr(item)?;
                }
                Ok(())
            }

            Expr::Index { target, index, .. } => {
                self.resolve_expr(target)?;
                self.resolve_expr(index)
            }

            Expr::Slice { target, start, end, .. } => {
                self.resolve_expr(target)?;
                if let Some(start) = start {
                    self.resolve_expr(start)?;
                }
                if let Some(end) = end {
                    self.resolve_expr(end)?;
                }
                Ok(())
            }

            Expr::Dict { entries, .. } => {
                for (key, value) in entries {
                    if let DictKey::Computed(k) = key {
                        self.resolve_expr(k)?;
                    }
                    self.resolve_expr(value)?;
                }
                Ok(())
            }

            Expr::Field { target, .. } => self.resolve_expr(target),
        }
    }

    fn resolve_target(&mut self, target: &AssignTarget) -> Result<(), Error> {
        match target {
            AssignTarget::Ident { name, id } => {
                // a write target cannot appear inside its own initializer,
                // so the declared-but-undefined check does not apply
                self.record_hops(name, *id);
                Ok(())
            }
            AssignTarget::Field { target, .. } => self.resolve_expr(target),
        }
    }

    /// Params and body share one scope, matching the single call environment
    /// the evaluator creates per invocation.
    fn resolve_function(&mut self, params: &[String], body: &[Stmt]) -> Result<(), Error> {
        let was_in_function = self.in_function;
        let outer_loop_depth = self.loop_depth;
        self.in_function = true;
        self.loop_depth = 0;

        self.push_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        let result = self.resolve_stmts(body);
        self.pop_scope();

        self.in_function = was_in_function;
        self.loop_depth = outer_loop_depth;
        result
    }

    fn resolve_ident(&mut self, name: &str, id: NodeId, span: Span) -> Result<(), Error> {
        if let Some(scope) = self.scopes.last()
            && scope.get(name) == Some(&false)
        {
            return Err(Error::new(ErrorCode::R001, span.line, span.column,
                format!("`{name}` is read in its own initializer")));
        }
        self.record_hops(name, id);
        Ok(())
    }

    fn record_hops(&mut self, name: &str, id: NodeId) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, hops);
                return;
            }
        }
        // unresolved: evaluated with a dynamic environment-chain lookup
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), false);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}
