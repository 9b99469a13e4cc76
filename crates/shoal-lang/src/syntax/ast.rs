use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Stable identity for AST nodes that the resolver records hop counts for.
/// Allocated from a process-wide counter so ids stay unique across the many
/// programs a single REPL session compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);

impl NodeId {
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Lit, Span),

    /// A string literal containing `{expr}` sequences, kept raw.
    /// Splitting and evaluation of the embedded expressions happens at run time.
    Interp(String, Span),

    Ident {
        name: String,
        id: NodeId,
        span: Span,
    },

    Paren(Box<Expr>, Span),

    /// `!x`, `-x`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `a + b`, `a == b`, `a && b`, …
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `fn (a, b) { … }`
    Lambda {
        params: Vec<String>,
        body: Vec<Stmt>,
        span: Span,
    },

    /// `$( … )` — the raw captured command text.
    Command(String, Span),

    /// `[1, 2, 3]`
    Array(Vec<Expr>, Span),

    /// `expr[index]`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// `expr[a:b]`, either bound optional
    Slice {
        target: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        span: Span,
    },

    /// `{a: 1, [k]: 2}`
    Dict {
        entries: Vec<(DictKey, Expr)>,
        span: Span,
    },

    /// `expr.field`
    Field {
        target: Box<Expr>,
        field: String,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum DictKey {
    /// Bare identifier or string literal, used structurally as a string key.
    Name(String),
    /// `[expr]: value` — key computed at evaluation time.
    Computed(Expr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, s)      => *s,
            Expr::Interp(_, s)       => *s,
            Expr::Ident { span, .. } => *span,
            Expr::Paren(_, s)        => *s,
            Expr::Unary { span, .. }   => *span,
            Expr::Binary { span, .. }  => *span,
            Expr::Call { span, .. }    => *span,
            Expr::Lambda { span, .. }  => *span,
            Expr::Command(_, s)      => *s,
            Expr::Array(_, s)        => *s,
            Expr::Index { span, .. }   => *span,
            Expr::Slice { span, .. }   => *span,
            Expr::Dict { span, .. }    => *span,
            Expr::Field { span, .. }   => *span,
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, Sub, Mul, Div,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",  BinOp::Sub => "-",
            BinOp::Mul => "*",  BinOp::Div => "/",
            BinOp::Eq => "==",  BinOp::NotEq => "!=",
            BinOp::Lt => "<",   BinOp::LtEq => "<=",
            BinOp::Gt => ">",   BinOp::GtEq => ">=",
            BinOp::And => "&&", BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Local,
    /// `export NAME = expr` — also snapshots the stringified value into the
    /// process environment table.
    Exported,
}

/// Assignment-family statements target either a plain identifier or a field
/// reached through a chain of `.field` accesses.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Ident { name: String, id: NodeId },
    Field { target: Box<Expr>, field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),

    /// `let x = expr` or `export X = expr`
    VarDecl {
        name: String,
        storage: Storage,
        init: Expr,
        span: Span,
    },

    /// `x = e`, `x += e`, `p.x = e`, `p.x *= e`, …
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
        span: Span,
    },

    /// `x++`, `--p.count`, …
    IncDec {
        target: AssignTarget,
        dec: bool,
        span: Span,
    },

    Block(Vec<Stmt>, Span),

    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
        span: Span,
    },

    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: Span,
    },

    Break(Span),

    FnDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        span: Span,
    },

    Return(Expr, Span),

    /// `data Point { x y }`
    DataDecl {
        name: String,
        fields: Vec<String>,
        span: Span,
    },
}

// ─── Canonical printer ───────────────────────────────────────────────────────
//
// Lisp-style rendering that ignores spans and node ids. Two programs with the
// same shape print identically, which is what the structural parser tests
// (for-loop desugaring, synthetic returns) compare.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit, _) => write!(f, "{lit}"),
            Expr::Interp(raw, _) => write!(f, "(interp {raw:?})"),
            Expr::Ident { name, .. } => write!(f, "{name}"),
            Expr::Paren(inner, _) => write!(f, "(paren {inner})"),
            Expr::Unary { op, operand, .. } => {
                let sym = match op { UnOp::Neg => "-", UnOp::Not => "!" };
                write!(f, "({sym} {operand})")
            }
            Expr::Binary { left, op, right, .. } => {
                write!(f, "({} {left} {right})", op.symbol())
            }
            Expr::Call { callee, args, .. } => {
                write!(f, "(call {callee}")?;
                for a in args { write!(f, " {a}")?; }
                write!(f, ")")
            }
            Expr::Lambda { params, body, .. } => {
                write!(f, "(lambda ({})", params.join(" "))?;
                for s in body { write!(f, " {s}")?; }
                write!(f, ")")
            }
            Expr::Command(raw, _) => write!(f, "(cmd {raw:?})"),
            Expr::Array(items, _) => {
                write!(f, "(array")?;
                for i in items { write!(f, " {i}")?; }
                write!(f, ")")
            }
            Expr::Index { target, index, .. } => write!(f, "(index {target} {index})"),
            Expr::Slice { target, start, end, .. } => {
                write!(f, "(slice {target} ")?;
                match start { Some(s) => write!(f, "{s}")?, None => write!(f, "_")? }
                write!(f, " ")?;
                match end { Some(e) => write!(f, "{e}")?, None => write!(f, "_")? }
                write!(f, ")")
            }
            Expr::Dict { entries, .. } => {
                write!(f, "(dict")?;
                for (k, v) in entries {
                    match k {
                        DictKey::Name(n) => write!(f, " ({n:?} {v})")?,
                        DictKey::Computed(e) => write!(f, " ([{e}] {v})")?,
                    }
                }
                write!(f, ")")
            }
            Expr::Field { target, field, .. } => write!(f, "(field {target} {field})"),
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Number(n) => write!(f, "{n}"),
            Lit::Str(s) => write!(f, "{s:?}"),
            Lit::Bool(b) => write!(f, "{b}"),
            Lit::Nil => write!(f, "nil"),
        }
    }
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignTarget::Ident { name, .. } => write!(f, "{name}"),
            AssignTarget::Field { target, field } => write!(f, "(field {target} {field})"),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expr(e) => write!(f, "(expr {e})"),
            Stmt::VarDecl { name, storage, init, .. } => {
                let kw = match storage { Storage::Local => "let", Storage::Exported => "export" };
                write!(f, "({kw} {name} {init})")
            }
            Stmt::Assign { target, op, value, .. } => {
                write!(f, "({} {target} {value})", op.symbol())
            }
            Stmt::IncDec { target, dec, .. } => {
                write!(f, "({} {target})", if *dec { "--" } else { "++" })
            }
            Stmt::Block(stmts, _) => {
                write!(f, "(block")?;
                for s in stmts { write!(f, " {s}")?; }
                write!(f, ")")
            }
            Stmt::If { cond, then_block, else_block, .. } => {
                write!(f, "(if {cond} (do")?;
                for s in then_block { write!(f, " {s}")?; }
                write!(f, ")")?;
                if let Some(else_block) = else_block {
                    write!(f, " (do")?;
                    for s in else_block { write!(f, " {s}")?; }
                    write!(f, ")")?;
                }
                write!(f, ")")
            }
            Stmt::While { cond, body, .. } => {
                write!(f, "(while {cond} (do")?;
                for s in body { write!(f, " {s}")?; }
                write!(f, "))")
            }
            Stmt::Break(_) => write!(f, "(break)"),
            Stmt::FnDecl { name, params, body, .. } => {
                write!(f, "(fn {name} ({})", params.join(" "))?;
                for s in body { write!(f, " {s}")?; }
                write!(f, ")")
            }
            Stmt::Return(e, _) => write!(f, "(return {e})"),
            Stmt::DataDecl { name, fields, .. } => {
                write!(f, "(data {name} ({}))", fields.join(" "))
            }
        }
    }
}
