use std::{iter::Peekable, str::CharIndices};

use crate::diagnostics::{Diagnostic, SourcePos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    While,
    For,
    In,
    Fn,
    Import,
    From,
    Mutate,
    Undefine,
    Try,
    Catch,
    Finally,
    Throw,
    True,
    False,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Int,
    Float,
    String,
    Keyword(Keyword),
    Newline,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Assign,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    Eof,
}

/// Numeric payload of `Int` and `Float` tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: SourcePos,
    /// Identifier/keyword text, literal digits, or the unescaped string body.
    pub lexeme: Option<String>,
    pub number: Option<Number>,
}

impl Token {
    fn simple(kind: TokenKind, pos: SourcePos) -> Self {
        Self {
            kind,
            pos,
            lexeme: None,
            number: None,
        }
    }

    pub fn text(&self) -> &str {
        self.lexeme.as_deref().unwrap_or("")
    }
}

/// Converts source text into tokens, always ending with `Eof`.
pub fn lex(source: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    col: u32,
    paren_depth: i32,
    bracket_depth: i32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            line: 1,
            col: 1,
            paren_depth: 0,
            bracket_depth: 0,
        }
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.col)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn collect_while<F>(&mut self, buf: &mut String, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            buf.push(ch);
            self.bump();
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn identifier_or_keyword(&mut self, pos: SourcePos) -> Token {
        let mut ident = String::new();
        self.collect_while(&mut ident, |ch| ch.is_ascii_alphanumeric() || ch == '_');
        let kind = keyword_for(&ident).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            pos,
            lexeme: Some(ident),
            number: None,
        }
    }

    fn number_literal(&mut self, pos: SourcePos) -> Result<Token, Diagnostic> {
        if self.peek() == Some('0') {
            let radix = match self.peek_second() {
                Some('x' | 'X') => Some((16, "hex")),
                Some('b' | 'B') => Some((2, "binary")),
                Some('o' | 'O') => Some((8, "octal")),
                _ => None,
            };
            if let Some((radix, name)) = radix {
                self.bump();
                self.bump();
                return self.radix_literal(pos, radix, name);
            }
        }

        let mut text = String::new();
        let mut is_float = false;
        self.collect_while(&mut text, |ch| ch.is_ascii_digit());
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            self.collect_while(&mut text, |ch| ch.is_ascii_digit());
        }
        if let Some(marker @ ('e' | 'E')) = self.peek() {
            is_float = true;
            text.push(marker);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            if !self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                return Err(Diagnostic::lexer("invalid float literal", pos));
            }
            self.collect_while(&mut text, |ch| ch.is_ascii_digit());
        }

        let number = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| Diagnostic::lexer("invalid float literal", pos))?;
            Number::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| Diagnostic::lexer("int literal overflow", pos))?;
            Number::Int(value)
        };
        Ok(Token {
            kind: if is_float {
                TokenKind::Float
            } else {
                TokenKind::Int
            },
            pos,
            lexeme: Some(text),
            number: Some(number),
        })
    }

    fn radix_literal(
        &mut self,
        pos: SourcePos,
        radix: u32,
        name: &str,
    ) -> Result<Token, Diagnostic> {
        let mut digits = String::new();
        self.collect_while(&mut digits, |ch| ch.is_digit(radix));
        if digits.is_empty() {
            return Err(Diagnostic::lexer(format!("invalid {name} literal"), pos));
        }
        let value = i64::from_str_radix(&digits, radix)
            .map_err(|_| Diagnostic::lexer(format!("{name} literal overflow"), pos))?;
        Ok(Token {
            kind: TokenKind::Int,
            pos,
            lexeme: Some(digits),
            number: Some(Number::Int(value)),
        })
    }

    /// Reads a string body after the opening quote. Reaching end of input
    /// closes the literal implicitly.
    fn string_literal(&mut self, pos: SourcePos) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => break,
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => match self.peek_second() {
                    Some(esc) => {
                        let escape_pos = self.pos();
                        let ch = match esc {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '"' => '"',
                            '\\' => '\\',
                            _ => {
                                return Err(Diagnostic::lexer(
                                    "invalid escape in string literal",
                                    escape_pos,
                                ));
                            }
                        };
                        self.bump();
                        self.bump();
                        value.push(ch);
                    }
                    None => {
                        self.bump();
                        value.push('\\');
                    }
                },
                Some(ch) => {
                    self.bump();
                    value.push(ch);
                }
            }
        }
        Ok(Token {
            kind: TokenKind::String,
            pos,
            lexeme: Some(value),
            number: None,
        })
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            let pos = self.pos();
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                    continue;
                }
                '\n' => {
                    self.bump();
                    if self.paren_depth == 0 && self.bracket_depth == 0 {
                        tokens.push(Token::simple(TokenKind::Newline, pos));
                    }
                    continue;
                }
                '#' => {
                    self.skip_comment();
                    continue;
                }
                'a'..='z' | 'A'..='Z' | '_' => {
                    tokens.push(self.identifier_or_keyword(pos));
                    continue;
                }
                '0'..='9' => {
                    tokens.push(self.number_literal(pos)?);
                    continue;
                }
                '.' if self.peek_second().is_some_and(|next| next.is_ascii_digit()) => {
                    tokens.push(self.number_literal(pos)?);
                    continue;
                }
                '"' => {
                    self.bump();
                    tokens.push(self.string_literal(pos)?);
                    continue;
                }
                _ => {}
            }

            self.bump();
            let kind = match ch {
                '(' => {
                    self.paren_depth += 1;
                    TokenKind::LParen
                }
                ')' => {
                    self.paren_depth -= 1;
                    TokenKind::RParen
                }
                '[' => {
                    self.bracket_depth += 1;
                    TokenKind::LBracket
                }
                ']' => {
                    self.bracket_depth -= 1;
                    TokenKind::RBracket
                }
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                ';' => TokenKind::Newline,
                '!' => {
                    if self.match_next('=') {
                        TokenKind::BangEqual
                    } else {
                        TokenKind::Bang
                    }
                }
                '=' => {
                    if self.match_next('=') {
                        TokenKind::EqualEqual
                    } else {
                        TokenKind::Assign
                    }
                }
                '<' => {
                    if self.match_next('=') {
                        TokenKind::LessEqual
                    } else {
                        TokenKind::Less
                    }
                }
                '>' => {
                    if self.match_next('=') {
                        TokenKind::GreaterEqual
                    } else {
                        TokenKind::Greater
                    }
                }
                '&' => {
                    if !self.match_next('&') {
                        return Err(Diagnostic::lexer("unexpected '&'", pos));
                    }
                    TokenKind::DoubleAmpersand
                }
                '|' => {
                    if !self.match_next('|') {
                        return Err(Diagnostic::lexer("unexpected '|'", pos));
                    }
                    TokenKind::DoublePipe
                }
                other => {
                    return Err(Diagnostic::lexer(
                        format!("unexpected character '{other}'"),
                        pos,
                    ));
                }
            };
            tokens.push(Token::simple(kind, pos));
        }
        tokens.push(Token::simple(TokenKind::Eof, self.pos()));
        Ok(tokens)
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "if" => Kw::If,
        "else" => Kw::Else,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "fn" => Kw::Fn,
        "import" => Kw::Import,
        "from" => Kw::From,
        "mutate" => Kw::Mutate,
        "undefine" => Kw::Undefine,
        "try" => Kw::Try,
        "catch" => Kw::Catch,
        "finally" => Kw::Finally,
        "throw" => Kw::Throw,
        "true" => Kw::True,
        "false" => Kw::False,
        "null" => Kw::Null,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
