//! Lexer for penalty formulas
//!
//! Runs in two passes. [`check_vocabulary`] is the word whitelist every
//! formula editor relies on; [`Lexer`] then produces positioned tokens
//! for the parser.
//!
//! Line structure is significant: every logical line ends in
//! [`TokenKind::Newline`], and a change of indentation at the start of a
//! line produces [`TokenKind::Indent`] or [`TokenKind::Dedent`]. Blank
//! lines and line breaks inside parentheses carry no structure.

use std::cmp::Ordering;

use crate::constants::penalty::{KEYWORDS, MAX_NESTING, PUNCTUATION};

use super::error::{FormulaError, FormulaResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize, col: usize) -> Self {
        Self { kind, line, col }
    }
}

/// Token types
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    Score,
    Overtime,
    If,
    Else,

    Number(f64),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    SlashSlashAssign,
    EqEq,
    Gt,
    Lt,
    Ge,
    Le,

    // Structural
    LParen,
    RParen,
    Colon,
    Newline,
    Indent,
    Dedent,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Score => write!(f, "'score'"),
            Self::Overtime => write!(f, "'overtime'"),
            Self::If => write!(f, "'if'"),
            Self::Else => write!(f, "'else'"),
            Self::Number(n) => write!(f, "number {}", n),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Star => write!(f, "'*'"),
            Self::Slash => write!(f, "'/'"),
            Self::SlashSlash => write!(f, "'//'"),
            Self::Assign => write!(f, "'='"),
            Self::PlusAssign => write!(f, "'+='"),
            Self::MinusAssign => write!(f, "'-='"),
            Self::StarAssign => write!(f, "'*='"),
            Self::SlashAssign => write!(f, "'/='"),
            Self::SlashSlashAssign => write!(f, "'//='"),
            Self::EqEq => write!(f, "'=='"),
            Self::Gt => write!(f, "'>'"),
            Self::Lt => write!(f, "'<'"),
            Self::Ge => write!(f, "'>='"),
            Self::Le => write!(f, "'<='"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Colon => write!(f, "':'"),
            Self::Newline => write!(f, "end of line"),
            Self::Indent => write!(f, "indentation"),
            Self::Dedent => write!(f, "end of block"),
            Self::Eof => write!(f, "end of formula"),
        }
    }
}

/// Reject any word outside the formula vocabulary.
///
/// Every punctuation character acts as a separator; what remains must be
/// a keyword or a base-10 integer.
pub fn check_vocabulary(formula: &str) -> FormulaResult<()> {
    let separated: String = formula
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    for word in separated.split_whitespace() {
        let is_keyword = KEYWORDS.contains(&word);
        let is_integer = word.bytes().all(|b| b.is_ascii_digit());
        if !is_keyword && !is_integer {
            return Err(FormulaError::IllegalToken(word.to_string()));
        }
    }

    Ok(())
}

/// Leading whitespace of a logical line.
///
/// `width` expands tabs to the next multiple of eight and `alt` counts a
/// tab as one column. Two indents are comparable only when both measures
/// order them the same way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Indent {
    width: usize,
    alt: usize,
}

impl Indent {
    fn compare(&self, other: &Indent) -> Option<Ordering> {
        let ord = self.width.cmp(&other.width);
        (ord == self.alt.cmp(&other.alt)).then_some(ord)
    }
}

/// Lexer for the penalty language
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    /// Open parentheses; line breaks inside them are plain whitespace
    depth: usize,
    /// Indentation of each open block, outermost first
    indents: Vec<Indent>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            depth: 0,
            indents: Vec::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> FormulaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut line_start = true;

        loop {
            if line_start {
                let indent = self.measure_indent();
                match self.peek_at(0) {
                    None => break,
                    Some('\n') => {
                        self.advance();
                        continue;
                    }
                    Some(_) => {
                        self.open_line(indent, &mut tokens)?;
                        line_start = false;
                    }
                }
            }

            self.skip_blanks();

            match self.peek_at(0) {
                None => break,
                Some('\n') => {
                    tokens.push(Token::new(TokenKind::Newline, self.line, self.col));
                    self.advance();
                    line_start = true;
                }
                Some(_) => tokens.push(self.next_token()?),
            }
        }

        if !line_start {
            tokens.push(Token::new(TokenKind::Newline, self.line, self.col));
        }
        for _ in 0..self.indents.len() {
            tokens.push(Token::new(TokenKind::Dedent, self.line, self.col));
        }
        self.indents.clear();
        tokens.push(Token::new(TokenKind::Eof, self.line, self.col));

        Ok(tokens)
    }

    fn measure_indent(&mut self) -> Indent {
        let mut indent = Indent::default();
        while let Some(c) = self.peek_at(0) {
            match c {
                ' ' => {
                    indent.width += 1;
                    indent.alt += 1;
                }
                '\t' => {
                    indent.width = (indent.width / 8 + 1) * 8;
                    indent.alt += 1;
                }
                '\r' => {}
                _ => break,
            }
            self.advance();
        }
        indent
    }

    /// Compare a line's indentation with the enclosing blocks
    fn open_line(&mut self, indent: Indent, tokens: &mut Vec<Token>) -> FormulaResult<()> {
        let (line, col) = (self.line, self.col);
        let inconsistent = || {
            FormulaError::semantic(line, col, "inconsistent use of tabs and spaces in indentation")
        };

        let top = self.indents.last().copied().unwrap_or_default();
        match indent.compare(&top).ok_or_else(inconsistent)? {
            Ordering::Equal => {}
            Ordering::Greater => {
                if self.indents.len() >= MAX_NESTING {
                    return Err(FormulaError::semantic(line, col, "too many levels of indentation"));
                }
                self.indents.push(indent);
                tokens.push(Token::new(TokenKind::Indent, line, col));
            }
            Ordering::Less => {
                while self.indents.last().is_some_and(|open| indent.width < open.width) {
                    self.indents.pop();
                    tokens.push(Token::new(TokenKind::Dedent, line, col));
                }
                let top = self.indents.last().copied().unwrap_or_default();
                if indent.compare(&top).ok_or_else(inconsistent)? != Ordering::Equal {
                    return Err(FormulaError::semantic(
                        line,
                        col,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
        }

        Ok(())
    }

    fn next_token(&mut self) -> FormulaResult<Token> {
        let ch = self.input[self.pos];
        let line = self.line;
        let col = self.col;

        let kind = match ch {
            '+' => self.one_or_two(TokenKind::Plus, TokenKind::PlusAssign),
            '-' => self.one_or_two(TokenKind::Minus, TokenKind::MinusAssign),
            '*' if self.peek_at(1) == Some('*') => {
                return Err(FormulaError::semantic(line, col, "operator '**' is not supported"));
            }
            '*' => self.one_or_two(TokenKind::Star, TokenKind::StarAssign),
            '/' if self.peek_at(1) == Some('/') => {
                self.advance();
                self.one_or_two(TokenKind::SlashSlash, TokenKind::SlashSlashAssign)
            }
            '/' => self.one_or_two(TokenKind::Slash, TokenKind::SlashAssign),
            '(' => {
                if self.depth >= MAX_NESTING {
                    return Err(FormulaError::semantic(line, col, "too many nested parentheses"));
                }
                self.depth += 1;
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                self.advance();
                TokenKind::RParen
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '=' => self.one_or_two(TokenKind::Assign, TokenKind::EqEq),
            '>' => self.one_or_two(TokenKind::Gt, TokenKind::Ge),
            '<' => self.one_or_two(TokenKind::Lt, TokenKind::Le),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(line, col)?,
            c if c.is_ascii_digit() => self.read_number(line, col)?,
            c if c.is_ascii_alphabetic() => self.read_keyword(line, col)?,
            _ => {
                return Err(FormulaError::semantic(
                    line,
                    col,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(Token::new(kind, line, col))
    }

    /// An operator character, optionally followed by `=`
    fn one_or_two(&mut self, single: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_at(0) == Some('=') {
            self.advance();
            with_eq
        } else {
            single
        }
    }

    fn read_number(&mut self, line: usize, col: usize) -> FormulaResult<TokenKind> {
        let mut text = String::new();
        self.take_digits(&mut text);

        if self.peek_at(0) == Some('.') {
            text.push('.');
            self.advance();
            self.take_digits(&mut text);
        } else if text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
            return Err(FormulaError::semantic(
                line,
                col,
                "leading zeros in integer literals are not permitted",
            ));
        }

        if text.starts_with('.') {
            text.insert(0, '0');
        }

        let value: f64 = text
            .parse()
            .map_err(|_| FormulaError::semantic(line, col, format!("invalid number '{}'", text)))?;
        if !value.is_finite() {
            return Err(FormulaError::semantic(line, col, "numeric literal out of range"));
        }

        Ok(TokenKind::Number(value))
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek_at(0) {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }
    }

    fn read_keyword(&mut self, line: usize, col: usize) -> FormulaResult<TokenKind> {
        let mut word = String::new();
        while let Some(c) = self.peek_at(0) {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            word.push(c);
            self.advance();
        }

        match word.as_str() {
            "score" => Ok(TokenKind::Score),
            "overtime" => Ok(TokenKind::Overtime),
            "if" => Ok(TokenKind::If),
            "else" => Ok(TokenKind::Else),
            _ => Err(FormulaError::semantic(
                line,
                col,
                format!("unknown name '{}'", word),
            )),
        }
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.peek_at(0) {
            if !c.is_whitespace() || (c == '\n' && self.depth == 0) {
                break;
            }
            self.advance();
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&c) = self.input.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_vocabulary_accepts_keywords_and_integers() {
        assert!(check_vocabulary("").is_ok());
        assert!(check_vocabulary("if overtime>0:score=score-overtime*5").is_ok());
        assert!(check_vocabulary("score = score * 0.9").is_ok());
        assert!(check_vocabulary("if score >= 60:\n    score = 60\nelse:\n    score = score").is_ok());
    }

    #[test]
    fn test_vocabulary_rejects_foreign_words() {
        assert_eq!(
            check_vocabulary("score = os"),
            Err(FormulaError::IllegalToken("os".to_string()))
        );
        assert_eq!(
            check_vocabulary("score=__import__(1)"),
            Err(FormulaError::IllegalToken("__import__".to_string()))
        );
        // ';' is not a separator, so it sticks to the word around it
        assert_eq!(
            check_vocabulary("score=1;score=2"),
            Err(FormulaError::IllegalToken("1;score".to_string()))
        );
        assert!(matches!(
            check_vocabulary("score = 1_000"),
            Err(FormulaError::IllegalToken(_))
        ));
        assert!(matches!(
            check_vocabulary("scoreif = 1"),
            Err(FormulaError::IllegalToken(_))
        ));
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("score>=1<=2==3>4<5=6"),
            vec![
                TokenKind::Score,
                TokenKind::Ge,
                TokenKind::Number(1.0),
                TokenKind::Le,
                TokenKind::Number(2.0),
                TokenKind::EqEq,
                TokenKind::Number(3.0),
                TokenKind::Gt,
                TokenKind::Number(4.0),
                TokenKind::Lt,
                TokenKind::Number(5.0),
                TokenKind::Assign,
                TokenKind::Number(6.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_decimals() {
        assert_eq!(
            kinds("0.9 .5 3."),
            vec![
                TokenKind::Number(0.9),
                TokenKind::Number(0.5),
                TokenKind::Number(3.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let tokens = Lexer::new("score = 1\n  overtime").tokenize().unwrap();
        let overtime = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Overtime)
            .unwrap();
        assert_eq!((overtime.line, overtime.col), (2, 3));
    }

    #[test]
    fn test_lone_dot_is_rejected() {
        let err = Lexer::new("score = score . 1").tokenize().unwrap_err();
        assert!(matches!(err, FormulaError::SemanticError { col: 15, .. }));
    }

    #[test]
    fn test_augmented_assignment_operators() {
        assert_eq!(
            kinds("score+=1-=2*=3/=4//=5//6"),
            vec![
                TokenKind::Score,
                TokenKind::PlusAssign,
                TokenKind::Number(1.0),
                TokenKind::MinusAssign,
                TokenKind::Number(2.0),
                TokenKind::StarAssign,
                TokenKind::Number(3.0),
                TokenKind::SlashAssign,
                TokenKind::Number(4.0),
                TokenKind::SlashSlashAssign,
                TokenKind::Number(5.0),
                TokenKind::SlashSlash,
                TokenKind::Number(6.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_power_operator_is_rejected() {
        let err = Lexer::new("score = score ** 2").tokenize().unwrap_err();
        assert!(matches!(err, FormulaError::SemanticError { col: 15, .. }));
    }

    #[test]
    fn test_indented_block_tokens() {
        assert_eq!(
            kinds("if score:\n    score = 1\n\n    overtime = 2\nscore = 3"),
            vec![
                TokenKind::If,
                TokenKind::Score,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Score,
                TokenKind::Assign,
                TokenKind::Number(1.0),
                TokenKind::Newline,
                TokenKind::Overtime,
                TokenKind::Assign,
                TokenKind::Number(2.0),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Score,
                TokenKind::Assign,
                TokenKind::Number(3.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_open_blocks_close_at_end() {
        let tokens = kinds("if score:\n  if overtime:\n    score = 0");
        assert_eq!(
            &tokens[tokens.len() - 3..],
            &[TokenKind::Dedent, TokenKind::Dedent, TokenKind::Eof]
        );
    }

    #[test]
    fn test_line_breaks_inside_parentheses_are_blanks() {
        assert_eq!(
            kinds("score = (score\n    - 1)"),
            vec![
                TokenKind::Score,
                TokenKind::Assign,
                TokenKind::LParen,
                TokenKind::Score,
                TokenKind::Minus,
                TokenKind::Number(1.0),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tab_counts_to_next_multiple_of_eight() {
        // eight spaces and one tab agree on width but not on tab count
        let err = Lexer::new("if score:\n        score = 1\n\tscore = 2")
            .tokenize()
            .unwrap_err();
        assert!(matches!(
            err,
            FormulaError::SemanticError { line: 3, ref message, .. } if message.contains("inconsistent")
        ));

        assert!(Lexer::new("if score:\n\tscore = 1\n\tscore = 2").tokenize().is_ok());
    }

    #[test]
    fn test_unmatched_dedent_is_rejected() {
        let err = Lexer::new("if score:\n    score = 1\n  score = 2")
            .tokenize()
            .unwrap_err();
        assert!(matches!(
            err,
            FormulaError::SemanticError { line: 3, ref message, .. } if message.contains("unindent")
        ));
    }

    #[test]
    fn test_leading_zero_integers() {
        assert!(Lexer::new("score = 05").tokenize().is_err());
        assert_eq!(kinds("00 05.5")[..2], [TokenKind::Number(0.0), TokenKind::Number(5.5)]);
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deep = format!("score = {}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(Lexer::new(&deep).tokenize().is_err());
        let shallow = format!("score = {}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(Lexer::new(&shallow).tokenize().is_ok());
    }
}
