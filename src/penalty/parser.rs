//! Recursive descent parser for penalty formulas
//!
//! Produces a [`Program`]: a list of assignments and `if`/`else`
//! statements over the two bound variables. A branch is either a single
//! assignment on the `if` line or an indented block on the lines below
//! it. The grammar is closed so that a program which parses can always
//! be evaluated.

use super::error::{FormulaError, FormulaResult};
use super::lexer::{Lexer, Token, TokenKind};

/// One of the two names a formula can read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    Score,
    Overtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
}

impl BinOp {
    /// Apply to finite operands; the result saturates at `±f64::MAX`.
    ///
    /// Callers never pass a zero divisor.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        let value = match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::FloorDiv => (a / b).floor(),
        };
        value.clamp(-f64::MAX, f64::MAX)
    }

    fn divides(self) -> bool {
        matches!(self, BinOp::Div | BinOp::FloorDiv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
}

impl CmpOp {
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(Var),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c`: 1 when every adjacent pair holds, otherwise 0
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
}

impl Expr {
    /// Value of an expression that does not read any variable
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            Expr::Var(_) => None,
            Expr::Neg(inner) => inner.constant_value().map(|v| -v),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.constant_value()?, rhs.constant_value()?);
                if op.divides() && b == 0.0 {
                    return None;
                }
                Some(op.apply(a, b))
            }
            Expr::Compare(first, rest) => {
                let mut lhs = first.constant_value()?;
                let mut holds = true;
                for (op, operand) in rest {
                    let rhs = operand.constant_value()?;
                    holds &= op.holds(lhs, rhs);
                    lhs = rhs;
                }
                Some(if holds { 1.0 } else { 0.0 })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Var,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign(Assignment),
    /// The condition holds when it evaluates to anything but zero
    If {
        condition: Expr,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
}

/// A parsed formula
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Parser for the penalty language
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse formula text into a [`Program`]
    pub fn parse(input: &str) -> FormulaResult<Program> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        parser.parse_program()
    }

    fn parse_program(&mut self) -> FormulaResult<Program> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }

        Ok(Program { statements })
    }

    /// One statement, through the end of its last line
    fn parse_statement(&mut self) -> FormulaResult<Statement> {
        match self.peek().kind {
            TokenKind::Indent => {
                let token = self.peek();
                Err(FormulaError::semantic(token.line, token.col, "unexpected indent"))
            }
            TokenKind::If => self.parse_if(),
            _ => {
                let assignment = self.parse_assignment()?;
                self.expect(TokenKind::Newline)?;
                Ok(Statement::Assign(assignment))
            }
        }
    }

    fn parse_if(&mut self) -> FormulaResult<Statement> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let then_branch = self.parse_suite()?;

        // `else` starts a line at the same depth as its `if`
        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            self.expect(TokenKind::Colon)?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// Body of a branch: one assignment after the colon, or an indented block
    fn parse_suite(&mut self) -> FormulaResult<Vec<Statement>> {
        if !self.check(&TokenKind::Newline) {
            let assignment = self.parse_assignment()?;
            self.expect(TokenKind::Newline)?;
            return Ok(vec![Statement::Assign(assignment)]);
        }

        self.advance();
        if !self.check(&TokenKind::Indent) {
            let token = self.peek();
            return Err(FormulaError::semantic(
                token.line,
                token.col,
                "expected an indented block",
            ));
        }
        self.advance();

        let mut statements = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            statements.push(self.parse_statement()?);
        }
        self.advance();

        Ok(statements)
    }

    fn parse_assignment(&mut self) -> FormulaResult<Assignment> {
        let token = self.peek().clone();
        let target = match token.kind {
            TokenKind::Score => Var::Score,
            TokenKind::Overtime => Var::Overtime,
            other => {
                return Err(FormulaError::semantic(
                    token.line,
                    token.col,
                    format!("expected 'score' or 'overtime' to assign, found {}", other),
                ));
            }
        };
        self.advance();

        let op_token = self.advance().clone();
        let op = match op_token.kind {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::SlashSlashAssign => Some(BinOp::FloorDiv),
            other => {
                return Err(FormulaError::semantic(
                    op_token.line,
                    op_token.col,
                    format!("expected '=' or an augmented assignment, found {}", other),
                ));
            }
        };
        let rhs = self.parse_expr()?;

        // `score -= e` reads as `score = score - (e)`
        let value = match op {
            None => rhs,
            Some(op) => {
                if op.divides() {
                    Self::check_divisor(&op_token, &rhs)?;
                }
                Expr::Binary(op, Box::new(Expr::Var(target)), Box::new(rhs))
            }
        };

        Ok(Assignment { target, value })
    }

    /// Comparisons bind loosest and may be chained
    fn parse_expr(&mut self) -> FormulaResult<Expr> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::EqEq => CmpOp::Eq,
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_sum()?));
        }

        Ok(if rest.is_empty() {
            first
        } else {
            Expr::Compare(Box::new(first), rest)
        })
    }

    fn parse_sum(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                _ => return Ok(lhs),
            };
            let op_token = self.advance().clone();
            let rhs = self.parse_unary()?;
            if op.divides() {
                Self::check_divisor(&op_token, &rhs)?;
            }
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// Divisors must be non-zero constants, so evaluation can never divide by zero
    fn check_divisor(op_token: &Token, divisor: &Expr) -> FormulaResult<()> {
        match divisor.constant_value() {
            None => Err(FormulaError::semantic(
                op_token.line,
                op_token.col,
                "divisor must be a constant expression",
            )),
            Some(v) if v == 0.0 => Err(FormulaError::semantic(
                op_token.line,
                op_token.col,
                "division by zero",
            )),
            Some(_) => Ok(()),
        }
    }

    /// A run of signs folds to at most one negation
    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        let mut negate = false;
        loop {
            match self.peek().kind {
                TokenKind::Minus => negate = !negate,
                TokenKind::Plus => {}
                _ => break,
            }
            self.advance();
        }

        let operand = self.parse_primary()?;
        Ok(if negate {
            Expr::Neg(Box::new(operand))
        } else {
            operand
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Score => Ok(Expr::Var(Var::Score)),
            TokenKind::Overtime => Ok(Expr::Var(Var::Overtime)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(FormulaError::semantic(
                token.line,
                token.col,
                format!("expected a value, found {}", other),
            )),
        }
    }

    // Token helpers

    fn peek(&self) -> &Token {
        // the lexer always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn expect(&mut self, kind: TokenKind) -> FormulaResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(FormulaError::semantic(
                token.line,
                token.col,
                format!("expected {}, found {}", kind, token.kind),
            ))
        }
    }
}
