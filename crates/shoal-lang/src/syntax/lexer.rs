use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

/// Single-pass scanner with one character of lookahead.
/// The first malformed token aborts the whole scan.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self { source: source.chars().collect(), pos: 0, line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
                return Ok(tokens);
            }

            tokens.push(self.next_token()?);
        }
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let tok = |kind: TokenKind, lexeme: &str| Token::new(kind, lexeme, line, col);

        let token = match ch {
            '+' => {
                if self.matches('+') { tok(TokenKind::PlusPlus, "++") }
                else if self.matches('=') { tok(TokenKind::PlusEq, "+=") }
                else { tok(TokenKind::Plus, "+") }
            }
            '-' => {
                if self.matches('-') { tok(TokenKind::MinusMinus, "--") }
                else if self.matches('=') { tok(TokenKind::MinusEq, "-=") }
                else { tok(TokenKind::Minus, "-") }
            }
            '*' => {
                if self.matches('=') { tok(TokenKind::StarEq, "*=") }
                else { tok(TokenKind::Star, "*") }
            }
            '/' => {
                if self.matches('=') { tok(TokenKind::SlashEq, "/=") }
                else { tok(TokenKind::Slash, "/") }
            }
            '=' => {
                if self.matches('=') { tok(TokenKind::EqEq, "==") }
                else { tok(TokenKind::Eq, "=") }
            }
            '!' => {
                if self.matches('=') { tok(TokenKind::BangEq, "!=") }
                else { tok(TokenKind::Bang, "!") }
            }
            '<' => {
                if self.matches('=') { tok(TokenKind::LtEq, "<=") }
                else { tok(TokenKind::Lt, "<") }
            }
            '>' => {
                if self.matches('=') { tok(TokenKind::GtEq, ">=") }
                else { tok(TokenKind::Gt, ">") }
            }
            ':' => {
                if self.matches('=') { tok(TokenKind::ColonEq, ":=") }
                else { tok(TokenKind::Colon, ":") }
            }
            '&' => {
                if self.matches('&') { tok(TokenKind::AndAnd, "&&") }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `&&`, bare `&` is not valid"));
                }
            }
            '|' => {
                if self.matches('|') { tok(TokenKind::OrOr, "||") }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `||`, bare `|` is not valid"));
                }
            }

            ',' => tok(TokenKind::Comma, ","),
            ';' => tok(TokenKind::Semicolon, ";"),
            '.' => tok(TokenKind::Dot, "."),
            '(' => tok(TokenKind::LParen, "("),
            ')' => tok(TokenKind::RParen, ")"),
            '{' => tok(TokenKind::LBrace, "{"),
            '}' => tok(TokenKind::RBrace, "}"),
            '[' => tok(TokenKind::LBracket, "["),
            ']' => tok(TokenKind::RBracket, "]"),

            '$' => {
                if self.matches('(') {
                    let body = self.read_command(line, col)?;
                    Token::new(TokenKind::Command, body, line, col)
                } else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `$(` to open a command substitution"));
                }
            }
            '"' => {
                let body = self.read_string(line, col)?;
                Token::new(TokenKind::Str, body, line, col)
            }
            '0'..='9' => {
                let lexeme = self.read_number(ch)?;
                Token::new(TokenKind::Number, lexeme, line, col)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let lexeme = self.read_ident(c);
                Token::new(keyword_or_ident(&lexeme), lexeme, line, col)
            }

            other => {
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{other}`")));
            }
        };

        Ok(token)
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> char {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == '\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> char {
        if self.is_at_end() { '\0' } else { self.source[self.pos] }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == expected { self.advance(); true } else { false }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => { self.advance(); }
                '#' => {
                    while !self.is_at_end() && self.peek() != '\n' { self.advance(); }
                }
                _ => break,
            }
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Only `\"` is a real escape; a backslash before any other character is
    /// preserved literally so the token round-trips through stringify.
    fn read_string(&mut self, start_line: usize, start_col: usize) -> Result<String, Error> {
        let mut s = String::new();
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
            }
            let ch = self.advance();
            if ch == '"' { break; }
            if ch == '\\' {
                if self.peek() == '"' {
                    self.advance();
                    s.push('"');
                } else {
                    s.push('\\');
                }
            } else {
                s.push(ch);
            }
        }
        Ok(s)
    }

    /// Raw, unparsed text up to the first `)`. No nested-paren awareness.
    fn read_command(&mut self, start_line: usize, start_col: usize) -> Result<String, Error> {
        let mut s = String::new();
        loop {
            if self.is_at_end() {
                return Err(Error::new(ErrorCode::L004, start_line, start_col,
                    "unterminated command substitution"));
            }
            let ch = self.advance();
            if ch == ')' { break; }
            s.push(ch);
        }
        Ok(s)
    }

    fn read_number(&mut self, first: char) -> Result<String, Error> {
        let mut s = String::new();
        s.push(first);
        while self.peek().is_ascii_digit() {
            s.push(self.advance());
        }
        if self.peek() == '.' {
            // a trailing `.` with no digits is still a valid number (`123.`)
            s.push(self.advance());
            while self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }
        if self.peek() == '.' {
            return Err(Error::new(ErrorCode::L003, self.line, self.column,
                format!("number `{s}` has a second decimal point")));
        }
        Ok(s)
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut s = String::new();
        s.push(first);
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            s.push(self.advance());
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().expect("scan failed")
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> Error {
        Lexer::new(src).tokenize().expect_err("expected scan error")
    }

    #[test]
    fn empty() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn compound_operators_round_trip() {
        let cases = [
            ("+", TokenKind::Plus), ("+=", TokenKind::PlusEq), ("++", TokenKind::PlusPlus),
            ("-", TokenKind::Minus), ("-=", TokenKind::MinusEq), ("--", TokenKind::MinusMinus),
            ("*", TokenKind::Star), ("*=", TokenKind::StarEq),
            ("/", TokenKind::Slash), ("/=", TokenKind::SlashEq),
            ("=", TokenKind::Eq), ("==", TokenKind::EqEq),
            ("!", TokenKind::Bang), ("!=", TokenKind::BangEq),
            ("<", TokenKind::Lt), ("<=", TokenKind::LtEq),
            (">", TokenKind::Gt), (">=", TokenKind::GtEq),
            (":", TokenKind::Colon), (":=", TokenKind::ColonEq),
            ("&&", TokenKind::AndAnd), ("||", TokenKind::OrOr),
        ];
        for (src, kind) in cases {
            let toks = lex(src);
            assert_eq!(toks.len(), 2, "source `{src}`");
            assert_eq!(toks[0], Token::new(kind, src, 1, 1), "source `{src}`");
            assert_eq!(toks[1].kind, TokenKind::Eof);
        }
    }

    #[test]
    fn keywords() {
        for (src, kind) in [
            ("true", TokenKind::True), ("false", TokenKind::False), ("nil", TokenKind::Nil),
            ("if", TokenKind::If), ("else", TokenKind::Else), ("while", TokenKind::While),
            ("for", TokenKind::For), ("fn", TokenKind::Fn), ("return", TokenKind::Return),
            ("let", TokenKind::Let), ("export", TokenKind::Export), ("data", TokenKind::Data),
            ("break", TokenKind::Break),
        ] {
            assert_eq!(kinds(src), vec![kind, TokenKind::Eof], "source `{src}`");
        }
    }

    #[test]
    fn keyword_prefix_is_ident() {
        let toks = lex("lettuce iffy");
        assert_eq!(toks[0].kind, TokenKind::Ident);
        assert_eq!(toks[0].lexeme, "lettuce");
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[1].lexeme, "iffy");
    }

    #[test]
    fn number_literals() {
        for src in ["123", "123.45", "123.", "0.1"] {
            let toks = lex(src);
            assert_eq!(toks[0].kind, TokenKind::Number, "source `{src}`");
            assert_eq!(toks[0].lexeme, src, "source `{src}`");
        }
    }

    #[test]
    fn second_decimal_point_is_error() {
        assert_eq!(lex_err("1.2.3").code, ErrorCode::L003);
        assert_eq!(lex_err("1..").code, ErrorCode::L003);
    }

    #[test]
    fn string_quote_escape() {
        let toks = lex(r#""say \"hi\"""#);
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].lexeme, r#"say "hi""#);
    }

    #[test]
    fn string_other_backslashes_preserved() {
        let toks = lex(r#""a\nb\{c""#);
        assert_eq!(toks[0].lexeme, r"a\nb\{c");
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(lex_err(r#""oops"#).code, ErrorCode::L002);
        assert_eq!(lex_err("\"oops\nmore").code, ErrorCode::L002);
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(kinds("# a comment\n42"), vec![TokenKind::Number, TokenKind::Eof]);
        assert_eq!(kinds("1 # trailing"), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn command_substitution() {
        let toks = lex("$(ls -la)");
        assert_eq!(toks[0].kind, TokenKind::Command);
        assert_eq!(toks[0].lexeme, "ls -la");
    }

    #[test]
    fn empty_command_substitution() {
        let toks = lex("$()");
        assert_eq!(toks[0].kind, TokenKind::Command);
        assert_eq!(toks[0].lexeme, "");
    }

    #[test]
    fn unterminated_command_substitution() {
        assert_eq!(lex_err("$(ls").code, ErrorCode::L004);
    }

    #[test]
    fn bare_ampersand_and_pipe_are_errors() {
        assert_eq!(lex_err("&").code, ErrorCode::L001);
        assert_eq!(lex_err("|").code, ErrorCode::L001);
    }

    #[test]
    fn line_and_column_tracking() {
        let toks = lex("a\n  b");
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
        assert_eq!((toks[1].line, toks[1].column), (2, 3));
    }

    #[test]
    fn no_trailing_newline_required() {
        assert_eq!(kinds("let x = 1"), vec![
            TokenKind::Let, TokenKind::Ident, TokenKind::Eq, TokenKind::Number, TokenKind::Eof,
        ]);
    }
}
