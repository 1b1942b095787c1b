use crate::ast::{BinOp, Expr, Stmt, UnOp};
use crate::error::LangError;
use crate::lexer::{lex, Spanned, Token};

/// Parse one payload into a statement list. The whole payload is parsed
/// before anything executes, so a parse error mutates nothing.
pub fn parse(source: &str) -> Result<Vec<Stmt>, LangError> {
    let tokens = lex(source)?;
    Parser { tokens, pos: 0 }.program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn err(&self, msg: impl Into<String>) -> LangError {
        LangError::parse(self.line(), msg)
    }

    fn err_expected(&self, what: &str) -> LangError {
        match self.peek() {
            Some(token) => self.err(format!("expected {}, found {}", what, token.describe())),
            None => self.err(format!("expected {}, found end of input", what)),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), LangError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.err_expected(what))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn program(mut self) -> Result<Vec<Stmt>, LangError> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while self.peek().is_some() {
            stmts.push(self.stmt()?);
            match self.peek() {
                None => break,
                Some(Token::Newline) => self.skip_newlines(),
                Some(token) => {
                    return Err(self.err(format!(
                        "expected end of statement, found {}",
                        token.describe()
                    )))
                }
            }
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, LangError> {
        match self.peek() {
            Some(Token::Del) => {
                self.pos += 1;
                match self.advance() {
                    Some(Token::Ident(name)) => Ok(Stmt::Delete { name }),
                    _ => Err(self.err("expected a name after `del`")),
                }
            }
            Some(Token::Ident(name)) if self.peek2() == Some(&Token::Assign) => {
                let name = name.clone();
                self.pos += 2;
                let expr = self.expr()?;
                Ok(Stmt::Assign { name, expr })
            }
            _ => Ok(Stmt::Expr(self.expr()?)),
        }
    }

    fn expr(&mut self) -> Result<Expr, LangError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.cmp_expr()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.cmp_expr()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Comparisons do not chain: `a < b < c` is a parse error at the
    /// statement boundary.
    fn cmp_expr(&mut self) -> Result<Expr, LangError> {
        let lhs = self.add_expr()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.add_expr()?;
        Ok(binary(op, lhs, rhs))
    }

    fn add_expr(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.mul_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.mul_expr()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn mul_expr(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary_expr()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, LangError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Bang) => UnOp::Not,
            _ => return self.postfix_expr(),
        };
        self.pos += 1;
        let operand = self.unary_expr()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix_expr(&mut self) -> Result<Expr, LangError> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.eat(&Token::LParen) {
                let args = self.expr_list(&Token::RParen)?;
                self.expect(Token::RParen, "`)`")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(Token::RBracket, "`]`")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary_expr(&mut self) -> Result<Expr, LangError> {
        match self.peek() {
            Some(Token::Int(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Expr::Int(n))
            }
            Some(Token::Float(x)) => {
                let x = *x;
                self.pos += 1;
                Ok(Expr::Float(x))
            }
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Some(Token::True) => {
                self.pos += 1;
                Ok(Expr::Bool(true))
            }
            Some(Token::False) => {
                self.pos += 1;
                Ok(Expr::Bool(false))
            }
            Some(Token::Nil) => {
                self.pos += 1;
                Ok(Expr::Nil)
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let items = self.expr_list(&Token::RBracket)?;
                self.expect(Token::RBracket, "`]`")?;
                Ok(Expr::List(items))
            }
            Some(Token::LBrace) => {
                self.pos += 1;
                let entries = self.map_entries()?;
                self.expect(Token::RBrace, "`}`")?;
                Ok(Expr::Map(entries))
            }
            _ => Err(self.err_expected("an expression")),
        }
    }

    /// Comma-separated expressions up to (not including) `closer`.
    /// A trailing comma is allowed.
    fn expr_list(&mut self, closer: &Token) -> Result<Vec<Expr>, LangError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(closer) {
                return Ok(items);
            }
            items.push(self.expr()?);
            if !self.eat(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    fn map_entries(&mut self) -> Result<Vec<(String, Expr)>, LangError> {
        let mut entries = Vec::new();
        loop {
            if self.peek() == Some(&Token::RBrace) {
                return Ok(entries);
            }
            let key = match self.advance() {
                Some(Token::Str(key)) => key,
                _ => return Err(self.err("map keys must be string literals")),
            };
            self.expect(Token::Colon, "`:`")?;
            entries.push((key, self.expr()?));
            if !self.eat(&Token::Comma) {
                return Ok(entries);
            }
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
