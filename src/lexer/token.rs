use std::fmt;

use phf::phf_map;

pub(super) static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "var" => TokenKind::Var,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "for" => TokenKind::For,
    "func" => TokenKind::Func,
    "print" => TokenKind::Print,
    "return" => TokenKind::Return,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "num" => TokenKind::NumType,
    "str" => TokenKind::StrType,
    "log" => TokenKind::LogType,
};

pub(super) static TWO_SYMBOLS_TOKENS: phf::Map<&str, TokenKind> = phf_map! {
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "&&" => TokenKind::AndAnd,
    "||" => TokenKind::OrOr,
};

pub(super) static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '^' => TokenKind::Caret,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '=' => TokenKind::Equal,
    ';' => TokenKind::SemiColon,
    ',' => TokenKind::Comma,
    ':' => TokenKind::Colon,
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '{' => TokenKind::OpenCurlyBrace,
    '}' => TokenKind::CloseCurlyBrace,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Num(i64),
    Ident(String),
    Str(String),
    True,
    False,

    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    DoubleEqual,
    NotEqual,

    AndAnd,
    OrOr,

    Equal,
    SemiColon,
    Comma,
    Colon,
    OpenParen,
    CloseParen,
    OpenCurlyBrace,
    CloseCurlyBrace,

    Var,
    If,
    Else,
    While,
    Do,
    For,
    Func,
    Print,
    Return,

    NumType,
    StrType,
    LogType,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Num(n) => return write!(f, "number {}", n),
            TokenKind::Ident(name) => return write!(f, "identifier '{}'", name),
            TokenKind::Str(s) => return write!(f, "string \"{}\"", s.escape_debug()),
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Caret => "'^'",
            TokenKind::LessThan => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::GreaterThan => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::DoubleEqual => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Equal => "'='",
            TokenKind::SemiColon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenCurlyBrace => "'{'",
            TokenKind::CloseCurlyBrace => "'}'",
            TokenKind::Var => "'var'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::For => "'for'",
            TokenKind::Func => "'func'",
            TokenKind::Print => "'print'",
            TokenKind::Return => "'return'",
            TokenKind::NumType => "'num'",
            TokenKind::StrType => "'str'",
            TokenKind::LogType => "'log'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}
