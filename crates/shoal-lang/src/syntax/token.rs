#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals — the payload lives in the token's lexeme
    Number,
    Str,
    Command,
    Ident,

    // Keywords
    True,
    False,
    Nil,
    If,
    Else,
    While,
    For,
    Fn,
    Return,
    Let,
    Export,
    Data,
    Break,

    // Operators
    Plus,       // +
    PlusPlus,   // ++
    PlusEq,     // +=
    Minus,      // -
    MinusMinus, // --
    MinusEq,    // -=
    Star,       // *
    StarEq,     // *=
    Slash,      // /
    SlashEq,    // /=
    Eq,         // =
    EqEq,       // ==
    Bang,       // !
    BangEq,     // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    Colon,      // :
    ColonEq,    // :=

    // Punctuation
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]

    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number | Self::Str | Self::Command | Self::True | Self::False | Self::Nil)
    }

    pub fn is_compound_assign(&self) -> bool {
        matches!(self, Self::PlusEq | Self::MinusEq | Self::StarEq | Self::SlashEq)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::EqEq | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::True | Self::False | Self::Nil | Self::If | Self::Else | Self::While
            | Self::For | Self::Fn | Self::Return | Self::Let | Self::Export | Self::Data
            | Self::Break
        )
    }
}

/// Maps a fully-scanned identifier to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: &str) -> TokenKind {
    match s {
        "true"   => TokenKind::True,
        "false"  => TokenKind::False,
        "nil"    => TokenKind::Nil,
        "if"     => TokenKind::If,
        "else"   => TokenKind::Else,
        "while"  => TokenKind::While,
        "for"    => TokenKind::For,
        "fn"     => TokenKind::Fn,
        "return" => TokenKind::Return,
        "let"    => TokenKind::Let,
        "export" => TokenKind::Export,
        "data"   => TokenKind::Data,
        "break"  => TokenKind::Break,
        _        => TokenKind::Ident,
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// For `Str` and `Command` the lexeme is the processed body without delimiters;
/// for everything else it is the exact source text of the token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, lexeme: lexeme.into(), line, column }
    }
}
