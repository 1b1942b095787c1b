use crate::error::LangError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Nil,
    Del,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Newline,
}

impl Token {
    /// Short description used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("`{}`", name),
            Token::Int(n) => format!("`{}`", n),
            Token::Float(x) => format!("`{}`", x),
            Token::Str(_) => "string literal".to_string(),
            Token::True => "`true`".to_string(),
            Token::False => "`false`".to_string(),
            Token::Nil => "`nil`".to_string(),
            Token::Del => "`del`".to_string(),
            Token::Assign => "`=`".to_string(),
            Token::Eq => "`==`".to_string(),
            Token::Ne => "`!=`".to_string(),
            Token::Lt => "`<`".to_string(),
            Token::Le => "`<=`".to_string(),
            Token::Gt => "`>`".to_string(),
            Token::Ge => "`>=`".to_string(),
            Token::Plus => "`+`".to_string(),
            Token::Minus => "`-`".to_string(),
            Token::Star => "`*`".to_string(),
            Token::Slash => "`/`".to_string(),
            Token::Percent => "`%`".to_string(),
            Token::AndAnd => "`&&`".to_string(),
            Token::OrOr => "`||`".to_string(),
            Token::Bang => "`!`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::Newline => "end of line".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    /// Newlines inside brackets are not statement separators.
    depth: u32,
    out: Vec<Spanned>,
}

/// Tokenize one payload. Statement separators are newlines (outside
/// brackets) and `;`; `#` starts a comment running to end of line.
pub fn lex(source: &str) -> Result<Vec<Spanned>, LangError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        depth: 0,
        out: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.out)
}

impl Lexer<'_> {
    fn push(&mut self, token: Token) {
        self.out.push(Spanned {
            token,
            line: self.line,
        });
    }

    fn err(&self, msg: impl Into<String>) -> LangError {
        LangError::parse(self.line, msg)
    }

    fn run(&mut self) -> Result<(), LangError> {
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.chars.next();
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '\n' => {
                    self.chars.next();
                    if self.depth == 0 {
                        self.push(Token::Newline);
                    }
                    self.line += 1;
                }
                ';' => {
                    self.chars.next();
                    self.push(Token::Newline);
                }
                '"' => self.string()?,
                c if c.is_ascii_digit() => self.number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.ident(),
                _ => self.operator()?,
            }
        }
        Ok(())
    }

    fn string(&mut self) -> Result<(), LangError> {
        self.chars.next();
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None | Some('\n') => return Err(self.err("unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some(other) => {
                        return Err(self.err(format!("unknown escape `\\{}`", other)))
                    }
                    None => return Err(self.err("unterminated string literal")),
                },
                Some(c) => text.push(c),
            }
        }
        self.push(Token::Str(text));
        Ok(())
    }

    fn number(&mut self) -> Result<(), LangError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.chars.peek() == Some(&'.') {
            let mut ahead = self.chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('.');
                self.chars.next();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            let x: f64 = text
                .parse()
                .map_err(|_| self.err(format!("bad float literal `{}`", text)))?;
            self.push(Token::Float(x));
        } else {
            let n: i64 = text
                .parse()
                .map_err(|_| self.err(format!("integer literal `{}` out of range", text)))?;
            self.push(Token::Int(n));
        }
        Ok(())
    }

    fn ident(&mut self) {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let token = match name.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "nil" => Token::Nil,
            "del" => Token::Del,
            _ => Token::Ident(name),
        };
        self.push(token);
    }

    fn operator(&mut self) -> Result<(), LangError> {
        let c = self.chars.next().unwrap_or('\0');
        let token = match c {
            '=' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Token::Eq
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '<' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.chars.peek() == Some(&'&') {
                    self.chars.next();
                    Token::AndAnd
                } else {
                    return Err(self.err("expected `&&`"));
                }
            }
            '|' => {
                if self.chars.peek() == Some(&'|') {
                    self.chars.next();
                    Token::OrOr
                } else {
                    return Err(self.err("expected `||`"));
                }
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => {
                self.depth += 1;
                Token::LParen
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RParen
            }
            '[' => {
                self.depth += 1;
                Token::LBracket
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RBracket
            }
            '{' => {
                self.depth += 1;
                Token::LBrace
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                Token::RBrace
            }
            ',' => Token::Comma,
            ':' => Token::Colon,
            other => return Err(self.err(format!("unexpected character `{}`", other))),
        };
        self.push(token);
        Ok(())
    }
}
