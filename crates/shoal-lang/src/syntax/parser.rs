use crate::error::{Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses statements until EOF. Errors are collected, not thrown: after a
    /// failed statement the parser resynchronizes at the next statement
    /// boundary so one pass can report several independent errors.
    pub fn parse(mut self) -> Result<Vec<Stmt>, Vec<Error>> {
        let mut stmts = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            self.skip_separators();
            if self.is_at_end() { break; }

            let pos_before = self.pos;
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => { errors.push(e); self.recover(); }
            }

            // guarantee progress — if nothing was consumed, force-advance
            // to prevent an infinite loop on unrecognised tokens
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() { Ok(stmts) } else { Err(errors) }
    }

    /// Entry point for a single embedded expression (string interpolation).
    pub(crate) fn parse_single_expr(tokens: Vec<Token>) -> Result<Expr, Error> {
        let mut p = Parser::new(tokens);
        let expr = p.parse_expr()?;
        p.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Let    => self.parse_var_decl(Storage::Local),
            TokenKind::Export => self.parse_var_decl(Storage::Exported),
            TokenKind::Data   => self.parse_data_decl(),
            TokenKind::If     => self.parse_if(),
            TokenKind::While  => self.parse_while(),
            TokenKind::For    => self.parse_for(),
            TokenKind::Break  => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Break(span))
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => {
                let span = self.span();
                let stmts = self.parse_block()?;
                Ok(Stmt::Block(stmts, span))
            }

            // `fn name(…)` declares; `fn (…)` is a lambda expression
            TokenKind::Fn if self.peek_next_is(TokenKind::Ident) => self.parse_fn_decl(),

            // prefix increment/decrement: `++x`, `--p.count`
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let span = self.span();
                let dec = self.advance().kind == TokenKind::MinusMinus;
                let target = self.parse_assign_target()?;
                Ok(Stmt::IncDec { target, dec, span })
            }

            // ident (`.ident`)* followed by an assignment operator or `++`/`--`
            TokenKind::Ident if self.is_assign_family() => self.parse_assign(),

            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_var_decl(&mut self, storage: Storage) -> Result<Stmt, Error> {
        let span = self.span();
        self.advance(); // consume `let` or `export`
        let name = self.expect_ident()?;
        if !self.check(TokenKind::Eq) {
            let tok = self.peek();
            return Err(Error::new(ErrorCode::P003, tok.line, tok.column,
                format!("`{name}` is declared without an initializer")));
        }
        self.advance();
        let init = self.parse_expr()?;
        Ok(Stmt::VarDecl { name, storage, init, span })
    }

    fn parse_data_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Data)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            fields.push(self.expect_ident()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::DataDecl { name, fields, span })
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If { cond, then_block, else_block, span })
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, span })
    }

    /// `for init; cond; step { body }` desugars here, at parse time, into
    /// `{ init ; while cond { { body } ; step } }`. A missing condition
    /// defaults to literal `true`.
    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;

        let init = self.parse_simple_stmt()?;
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.check(TokenKind::Semicolon) {
            Expr::Literal(Lit::Bool(true), self.span())
        } else {
            self.parse_expr()?
        };
        self.expect(TokenKind::Semicolon)?;

        let step = self.parse_simple_stmt()?;
        let body_span = self.span();
        let body = self.parse_block()?;

        let desugared = Stmt::While {
            cond,
            body: vec![Stmt::Block(body, body_span), step],
            span,
        };
        Ok(Stmt::Block(vec![init, desugared], span))
    }

    /// Restricted statement form used for the init/step slots of a `for` head.
    fn parse_simple_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Let    => self.parse_var_decl(Storage::Local),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let span = self.span();
                let dec = self.advance().kind == TokenKind::MinusMinus;
                let target = self.parse_assign_target()?;
                Ok(Stmt::IncDec { target, dec, span })
            }
            TokenKind::Ident if self.is_assign_family() => self.parse_assign(),
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let value = if self.check(TokenKind::RBrace)
            || self.check(TokenKind::Semicolon)
            || self.is_at_end()
        {
            Expr::Literal(Lit::Nil, span)
        } else {
            self.parse_expr()?
        };
        Ok(Stmt::Return(value, span))
    }

    fn parse_fn_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        let params = self.parse_param_list()?;
        let body = self.parse_fn_body()?;
        Ok(Stmt::FnDecl { name, params, body, span })
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>, Error> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            params.push(self.expect_ident()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    /// A function or lambda body. A body whose last statement is not a
    /// `return` gets a synthetic `return nil` appended, so every body ends
    /// with an explicit return by the time evaluation sees it.
    fn parse_fn_body(&mut self) -> Result<Vec<Stmt>, Error> {
        let span = self.span();
        let mut body = self.parse_block()?;
        if !matches!(body.last(), Some(Stmt::Return(..))) {
            body.push(Stmt::Return(Expr::Literal(Lit::Nil, span), span));
        }
        Ok(body)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::RBrace) || self.is_at_end() { break; }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    // ─── Assignment family ───────────────────────────────────────────────────

    fn parse_assign(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let target = self.parse_assign_target()?;

        let op = match self.peek_kind() {
            TokenKind::Eq      => AssignOp::Set,
            TokenKind::PlusEq  => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq  => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PlusPlus => {
                self.advance();
                return Ok(Stmt::IncDec { target, dec: false, span });
            }
            TokenKind::MinusMinus => {
                self.advance();
                return Ok(Stmt::IncDec { target, dec: true, span });
            }
            _ => return Err(self.unexpected("assignment operator")),
        };
        self.advance();
        let value = self.parse_expr()?;
        Ok(Stmt::Assign { target, op, value, span })
    }

    /// `ident (.ident)*` — the chain up to the last segment becomes the
    /// object expression, the last segment the assigned field.
    fn parse_assign_target(&mut self) -> Result<AssignTarget, Error> {
        let span = self.span();
        let name = self.expect_ident()?;

        let mut fields = Vec::new();
        while self.matches(TokenKind::Dot) {
            fields.push(self.expect_ident()?);
        }

        if fields.is_empty() {
            return Ok(AssignTarget::Ident { name, id: NodeId::fresh() });
        }

        let mut target = Expr::Ident { name, id: NodeId::fresh(), span };
        let last = fields.pop().unwrap_or_default();
        for field in fields {
            target = Expr::Field { target: Box::new(target), field, span };
        }
        Ok(AssignTarget::Field { target: Box::new(target), field: last })
    }

    /// Returns true when the current position starts an assignment-family
    /// statement: `ident (.ident)*` followed by `=`, a compound-assignment
    /// operator, or `++`/`--`.
    fn is_assign_family(&self) -> bool {
        let mut i = self.pos;
        if self.tokens[i].kind != TokenKind::Ident { return false; }
        i += 1;
        while i + 1 < self.tokens.len()
            && self.tokens[i].kind == TokenKind::Dot
            && self.tokens[i + 1].kind == TokenKind::Ident
        {
            i += 2;
        }
        i < self.tokens.len()
            && matches!(
                self.tokens[i].kind,
                TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq
                | TokenKind::StarEq | TokenKind::SlashEq
                | TokenKind::PlusPlus | TokenKind::MinusMinus
            )
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::OrOr) {
            let span = left.span();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::AndAnd) {
            let span = left.span();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_addition()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star  => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Not, operand: Box::new(operand), span });
        }
        if self.matches(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                // call: expr(args)
                TokenKind::LParen => {
                    let span = expr.span();
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(TokenKind::RParen) && !self.is_at_end() {
                        args.push(self.parse_expr()?);
                        if !self.matches(TokenKind::Comma) { break; }
                    }
                    self.expect(TokenKind::RParen)?;
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }

                // index or slice: expr[i], expr[a:b], expr[:b], expr[a:], expr[:]
                TokenKind::LBracket => {
                    let span = expr.span();
                    self.advance();
                    expr = self.parse_index_or_slice(expr, span)?;
                }

                // field access: expr.name
                TokenKind::Dot => {
                    let span = expr.span();
                    self.advance();
                    let field = self.expect_ident()?;
                    expr = Expr::Field { target: Box::new(expr), field, span };
                }

                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, target: Expr, span: Span) -> Result<Expr, Error> {
        let target = Box::new(target);

        if self.matches(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::Slice { target, start: None, end, span });
        }

        let first = self.parse_expr()?;
        if self.matches(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::Slice { target, start: Some(Box::new(first)), end, span });
        }

        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Index { target, index: Box::new(first), span })
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = tok.lexeme.parse().map_err(|_| {
                    Error::new(ErrorCode::P001, tok.line, tok.column,
                        format!("malformed number literal `{}`", tok.lexeme))
                })?;
                Ok(Expr::Literal(Lit::Number(value), span))
            }
            TokenKind::Str => {
                self.advance();
                // braces mean the literal may interpolate; split at run time
                if tok.lexeme.contains(['{', '}']) {
                    Ok(Expr::Interp(tok.lexeme, span))
                } else {
                    Ok(Expr::Literal(Lit::Str(tok.lexeme), span))
                }
            }
            TokenKind::Command => {
                self.advance();
                Ok(Expr::Command(tok.lexeme, span))
            }
            TokenKind::True  => { self.advance(); Ok(Expr::Literal(Lit::Bool(true), span)) }
            TokenKind::False => { self.advance(); Ok(Expr::Literal(Lit::Bool(false), span)) }
            TokenKind::Nil   => { self.advance(); Ok(Expr::Literal(Lit::Nil, span)) }

            TokenKind::Ident => {
                self.advance();
                Ok(Expr::Ident { name: tok.lexeme, id: NodeId::fresh(), span })
            }

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(inner), span))
            }

            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenKind::RBracket) && !self.is_at_end() {
                    items.push(self.parse_expr()?);
                    if !self.matches(TokenKind::Comma) { break; }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::Array(items, span))
            }

            TokenKind::LBrace => self.parse_dict(span),

            TokenKind::Fn => {
                self.advance();
                let params = self.parse_param_list()?;
                let body = self.parse_fn_body()?;
                Ok(Expr::Lambda { params, body, span })
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// `{key: value, "key": value, [expr]: value}` — entries must be comma
    /// separated; an entry not followed by `,` or `}` is a parse error.
    fn parse_dict(&mut self, span: Span) -> Result<Expr, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut entries = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let key = match self.peek_kind() {
                TokenKind::Ident | TokenKind::Str => DictKey::Name(self.advance().lexeme),
                TokenKind::LBracket => {
                    self.advance();
                    let expr = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    DictKey::Computed(expr)
                }
                _ => return Err(self.unexpected("dictionary key")),
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));

            if !self.matches(TokenKind::Comma) && !self.check(TokenKind::RBrace) {
                return Err(self.unexpected("`,` between dictionary entries"));
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Dict { entries, span })
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_next_is(&self, kind: TokenKind) -> bool {
        self.pos + 1 < self.tokens.len() && self.tokens[self.pos + 1].kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {:?}, found {:?}", kind, tok.kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident => Ok(tok.lexeme),
            _ => Err(Error::new(ErrorCode::P001, tok.line, tok.column,
                format!("expected identifier, found {:?}", tok.kind))),
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {:?}", expected, tok.kind),
        )
    }

    fn skip_separators(&mut self) {
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Skip tokens until something that looks like a new statement.
    /// Used after a parse error to attempt recovery.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof
                | TokenKind::Let
                | TokenKind::Export
                | TokenKind::Fn
                | TokenKind::Data
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Break
                | TokenKind::Return
                | TokenKind::RBrace => break,
                TokenKind::Semicolon => { self.advance(); break; }
                _ => { self.advance(); }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
