use log::trace;

use crate::error::{CompileError, CompileResult};

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    TokenKind,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
    line: usize,
}

impl Lexer {
    fn new() -> Self {
        Self {
            tokens: vec![],
            index: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Lex {
            line: self.line,
            message: message.into(),
        }
    }

    fn new_token(&mut self, kind: TokenKind, len: usize) {
        trace!("token {:?} at line {}", kind, self.line);
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
        self.index += len;
    }

    fn parse_number(&mut self, chars: &[char]) -> CompileResult<()> {
        let s: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();
        let value = s
            .parse()
            .map_err(|_| self.error(format!("number literal {} is out of range", s)))?;
        self.new_token(TokenKind::Num(value), s.len());
        Ok(())
    }

    fn parse_identifier(&mut self, chars: &[char]) {
        let s: String = chars
            .iter()
            .take_while(|&&c| c.is_ascii_alphanumeric() || c == '_')
            .collect();
        let len = s.len();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), len);
        } else {
            self.new_token(TokenKind::Ident(s), len);
        }
    }

    /// string = '"' (char | '\' escape)* '"'
    fn parse_string(&mut self, chars: &[char]) -> CompileResult<()> {
        let mut value = String::new();
        let mut i = 1;
        loop {
            match chars.get(i) {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match chars.get(i + 1) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(c) => return Err(self.error(format!("unknown escape '\\{}'", c))),
                        None => return Err(self.error("unterminated string literal")),
                    };
                    value.push(escaped);
                    i += 2;
                }
                Some(&c) => {
                    value.push(c);
                    i += 1;
                }
            }
        }
        self.new_token(TokenKind::Str(value), i + 1);
        Ok(())
    }

    fn skip_line_comment(&mut self, chars: &[char]) {
        self.index += chars.iter().take_while(|&&c| c != '\n').count();
    }

    fn _tokenize(&mut self, s: &str) -> CompileResult<()> {
        let chars: Vec<_> = s.chars().collect();

        while self.index < chars.len() {
            let c = chars[self.index];
            let c2 = chars[self.index..].iter().take(2).collect::<String>();

            if c == '\n' {
                self.line += 1;
                self.index += 1;
            } else if c.is_whitespace() {
                self.index += 1;
            } else if c2 == "//" {
                self.skip_line_comment(&chars[self.index..]);
            } else if c.is_ascii_digit() {
                self.parse_number(&chars[self.index..])?;
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.parse_identifier(&chars[self.index..]);
            } else if c == '"' {
                self.parse_string(&chars[self.index..])?;
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.new_token(kind.clone(), 2);
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                self.new_token(kind.clone(), 1);
            } else {
                return Err(self.error(format!("can't tokenize '{}'", c)));
            }
        }

        let line = self.line;
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line,
        });
        Ok(())
    }

    pub fn tokenize(s: &str) -> CompileResult<Vec<Token>> {
        let mut lexer = Lexer::new();
        lexer._tokenize(s)?;

        Ok(lexer.tokens)
    }
}
