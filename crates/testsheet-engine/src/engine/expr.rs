//! Expression parser and evaluator for the residue of a formula.
//!
//! By the time text reaches this module, function calls and cell references
//! have been replaced with literals, so the grammar is small:
//!
//! ```text
//! comparison     := additive (( "=" | "==" | "<>" | "!=" | "<" | "<=" | ">" | ">=" ) additive)*
//! additive       := multiplicative (( "+" | "-" ) multiplicative)*
//! multiplicative := unary (( "*" | "/" ) unary)*
//! unary          := ( "+" | "-" ) unary | primary
//! primary        := number | string | TRUE | FALSE | "(" comparison ")"
//! ```
//!
//! `+` joins text when either side is text; the other arithmetic operators
//! coerce numeric text (an empty string counts as 0).
//!
//! Values are folded while parsing. Operator chains and unary signs are
//! loops; only parentheses recurse, and their nesting is capped at
//! [`MAX_NESTING`].

use std::cmp::Ordering;

use super::format::{format_number, parse_number};
use crate::error::{FormulaError, FormulaResult};

/// A value produced while evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    /// Text form used for concatenation and for storing into a cell.
    pub fn to_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    pub fn to_number(&self) -> FormulaResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) if s.trim().is_empty() => Ok(0.0),
            Value::Text(s) => parse_number(s)
                .ok_or_else(|| FormulaError::Type(format!("'{}' is not a number", s))),
        }
    }
}

/// Deepest parenthesis nesting accepted in one expression.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    LeftParen,
    RightParen,
    Eof,
}

/// Parse and evaluate an expression.
pub fn evaluate_expression(source: &str) -> FormulaResult<Value> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_comparison()?;
    if parser.current() != &Token::Eof {
        return Err(FormulaError::Parse(format!(
            "unexpected {:?} after expression",
            parser.current()
        )));
    }
    if let Value::Number(n) = value
        && !n.is_finite()
    {
        return Err(FormulaError::NotFinite);
    }
    Ok(value)
}

fn tokenize(source: &str) -> FormulaResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let two = chars.get(i + 1).copied();
        let (token, width) = match (c, two) {
            ('=', Some('=')) => (Token::Equal, 2),
            ('!', Some('=')) => (Token::NotEqual, 2),
            ('<', Some('>')) => (Token::NotEqual, 2),
            ('<', Some('=')) => (Token::LessEqual, 2),
            ('>', Some('=')) => (Token::GreaterEqual, 2),
            ('=', _) => (Token::Equal, 1),
            ('<', _) => (Token::LessThan, 1),
            ('>', _) => (Token::GreaterThan, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('(', _) => (Token::LeftParen, 1),
            (')', _) => (Token::RightParen, 1),
            ('"', _) => {
                let (text, end) = scan_string(&chars, i)?;
                tokens.push(Token::Text(text));
                i = end;
                continue;
            }
            (d, _) if d.is_ascii_digit() || d == '.' => {
                let (n, end) = scan_number(&chars, i)?;
                tokens.push(Token::Number(n));
                i = end;
                continue;
            }
            (a, _) if a.is_ascii_alphabetic() || a == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            (other, _) => {
                return Err(FormulaError::Parse(format!("unexpected character '{}'", other)));
            }
        };
        tokens.push(token);
        i += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Scan a double-quoted literal starting at `start`. Supports `\"` and `\\`.
fn scan_string(chars: &[char], start: usize) -> FormulaResult<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            '"' => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(FormulaError::Parse("unterminated string literal".into()))
}

fn scan_number(chars: &[char], start: usize) -> FormulaResult<(f64, usize)> {
    let mut i = start;
    let digits = |i: &mut usize| {
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            *i += 1;
        }
    };

    digits(&mut i);
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        digits(&mut i);
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = j;
            digits(&mut i);
        }
    }

    let text: String = chars[start..i].iter().collect();
    text.parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| FormulaError::Parse(format!("invalid number '{}'", text)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Tokens always end with `Eof`, which is returned once input runs out.
    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn consume(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn parse_comparison(&mut self) -> FormulaResult<Value> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                Token::Equal => BinaryOp::Equal,
                Token::NotEqual => BinaryOp::NotEqual,
                Token::LessThan => BinaryOp::LessThan,
                Token::LessEqual => BinaryOp::LessEqual,
                Token::GreaterThan => BinaryOp::GreaterThan,
                Token::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.consume();
            let right = self.parse_additive()?;
            left = apply_binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Value> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.consume();
            let right = self.parse_multiplicative()?;
            left = apply_binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Value> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = apply_binary(op, left, right)?;
        }
        Ok(left)
    }

    /// Any run of signs before a primary. A `-` anywhere in the run makes
    /// the result numeric.
    fn parse_unary(&mut self) -> FormulaResult<Value> {
        let mut minus_signs = 0usize;
        loop {
            match self.current() {
                Token::Minus => minus_signs += 1,
                Token::Plus => {}
                _ => break,
            }
            self.consume();
        }

        let value = self.parse_primary()?;
        if minus_signs == 0 {
            return Ok(value);
        }
        let n = value.to_number()?;
        Ok(Value::Number(if minus_signs % 2 == 1 { -n } else { n }))
    }

    fn parse_primary(&mut self) -> FormulaResult<Value> {
        match self.consume() {
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Text(s) => Ok(Value::Text(s)),
            Token::Ident(name) if name.eq_ignore_ascii_case("TRUE") => Ok(Value::Bool(true)),
            Token::Ident(name) if name.eq_ignore_ascii_case("FALSE") => Ok(Value::Bool(false)),
            Token::Ident(name) => Err(FormulaError::Parse(format!("unknown name '{}'", name))),
            Token::LeftParen => {
                if self.depth >= MAX_NESTING {
                    return Err(FormulaError::Parse(format!(
                        "parentheses nested deeper than {}",
                        MAX_NESTING
                    )));
                }
                self.depth += 1;
                let inner = self.parse_comparison();
                self.depth -= 1;
                let inner = inner?;
                match self.consume() {
                    Token::RightParen => Ok(inner),
                    other => Err(FormulaError::Parse(format!("expected ')', got {:?}", other))),
                }
            }
            Token::Eof => Err(FormulaError::Parse("unexpected end of formula".into())),
            other => Err(FormulaError::Parse(format!("unexpected {:?}", other))),
        }
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> FormulaResult<Value> {
    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::Text(_), _) | (_, Value::Text(_)) => {
                Ok(Value::Text(format!("{}{}", l.to_text(), r.to_text())))
            }
            _ => Ok(Value::Number(l.to_number()? + r.to_number()?)),
        },
        BinaryOp::Subtract => Ok(Value::Number(l.to_number()? - r.to_number()?)),
        BinaryOp::Multiply => Ok(Value::Number(l.to_number()? * r.to_number()?)),
        BinaryOp::Divide => {
            let divisor = r.to_number()?;
            if divisor == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            Ok(Value::Number(l.to_number()? / divisor))
        }
        BinaryOp::Equal => Ok(Value::Bool(compare(&l, &r) == Some(Ordering::Equal))),
        BinaryOp::NotEqual => Ok(Value::Bool(compare(&l, &r) != Some(Ordering::Equal))),
        BinaryOp::LessThan => Ok(Value::Bool(compare(&l, &r) == Some(Ordering::Less))),
        BinaryOp::LessEqual => Ok(Value::Bool(matches!(
            compare(&l, &r),
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::GreaterThan => Ok(Value::Bool(compare(&l, &r) == Some(Ordering::Greater))),
        BinaryOp::GreaterEqual => Ok(Value::Bool(matches!(
            compare(&l, &r),
            Some(Ordering::Greater | Ordering::Equal)
        ))),
    }
}

/// Text compares with text; anything else compares numerically when both
/// sides coerce. `None` means the values are incomparable.
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => {
            let a = l.to_number().ok()?;
            let b = r.to_number().ok()?;
            a.partial_cmp(&b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(src: &str) -> f64 {
        match evaluate_expression(src) {
            Ok(Value::Number(n)) => n,
            other => panic!("{} evaluated to {:?}", src, other),
        }
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(num("1 + 2 * 3"), 7.0);
        assert_eq!(num("(1 + 2) * 3"), 9.0);
        assert_eq!(num("10 - 4 - 3"), 3.0);
        assert_eq!(num("2 * -3"), -6.0);
        assert_eq!(num("2 - -3"), 5.0);
        assert_eq!(num(".5 + 1e2"), 100.5);
    }

    #[test]
    fn test_string_concatenation_with_plus() {
        assert_eq!(
            evaluate_expression(r#""Run " + 3 + "/" + 4"#),
            Ok(Value::Text("Run 3/4".into()))
        );
        assert_eq!(evaluate_expression(r#"10 + """#), Ok(Value::Text("10".into())));
        assert_eq!(
            evaluate_expression(r#""say \"hi\"""#),
            Ok(Value::Text("say \"hi\"".into()))
        );
    }

    #[test]
    fn test_numeric_coercion_of_text() {
        assert_eq!(num(r#""4" * 2"#), 8.0);
        assert_eq!(num(r#"10 * """#), 0.0);
        assert!(matches!(
            evaluate_expression(r#""abc" * 2"#),
            Err(FormulaError::Type(_))
        ));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(evaluate_expression("3 > 2"), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression("3 = 3"), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression("3 == 4"), Ok(Value::Bool(false)));
        assert_eq!(evaluate_expression("3 <> 4"), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression(r#""a" < "b""#), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression(r#""abc" > 5"#), Ok(Value::Bool(false)));
        assert_eq!(evaluate_expression(r#""abc" != 5"#), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression("true"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(evaluate_expression("1/"), Err(FormulaError::Parse(_))));
        assert_eq!(evaluate_expression("1/0"), Err(FormulaError::DivisionByZero));
        assert!(matches!(evaluate_expression("(1"), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate_expression("1 2"), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate_expression("\"open"), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate_expression("FOO(1)"), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate_expression(""), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate_expression("1,2"), Err(FormulaError::Parse(_))));
        assert_eq!(evaluate_expression("1e308 * 10"), Err(FormulaError::NotFinite));
    }

    #[test]
    fn test_long_sign_runs_and_chains() {
        assert_eq!(num(&format!("{}1", "-".repeat(20_000))), 1.0);
        assert_eq!(num(&format!("{}1", "-".repeat(20_001))), -1.0);
        assert_eq!(num(&format!("1{}", "+1".repeat(20_000))), 20_001.0);
        assert_eq!(
            evaluate_expression(r#"+"abc""#),
            Ok(Value::Text("abc".into()))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}7{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(num(&at_limit), 7.0);

        let too_deep = format!(
            "{}7{}",
            "(".repeat(MAX_NESTING + 1),
            ")".repeat(MAX_NESTING + 1)
        );
        assert!(matches!(evaluate_expression(&too_deep), Err(FormulaError::Parse(_))));
        assert!(matches!(
            evaluate_expression(&"(".repeat(100_000)),
            Err(FormulaError::Parse(_))
        ));
    }

    #[test]
    fn test_boolean_comparisons() {
        assert_eq!(evaluate_expression("FALSE=FALSE"), Ok(Value::Bool(true)));
        assert_eq!(evaluate_expression("TRUE=1"), Ok(Value::Bool(true)));
        assert!(!Value::Bool(false).is_truthy());
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(2.0).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
    }
}
