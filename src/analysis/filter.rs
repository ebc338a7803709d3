//! Row filtering by boolean expressions.
//!
//! Expressions such as `age > 30 and score <= 5` are tokenized and parsed
//! into an [`Expr`] tree, validated against the dataset's columns, then
//! evaluated row by row. Nothing is ever executed as code.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ( ("or" | "|") and )*
//! and     := not ( ("and" | "&") not )*
//! not     := ("not" | "~") not | compare
//! compare := operand ( ("==" | "!=" | "<" | "<=" | ">" | ">=") operand )?
//! operand := column | `quoted column` | number | 'string' | "string"
//!          | True | False | "-" number | "(" or ")"
//! ```

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::error::DataError;
use crate::models::{Dataset, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            CmpOp::Eq => ordering == Some(Ordering::Equal),
            CmpOp::Ne => ordering != Some(Ordering::Equal),
            CmpOp::Lt => ordering == Some(Ordering::Less),
            CmpOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            CmpOp::Gt => ordering == Some(Ordering::Greater),
            CmpOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<Expr, DataError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(invalid("expression is empty"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected {}", token)));
        }
        Ok(expr)
    }

    /// Names of every column the expression refers to.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Literal(_) => {}
            Expr::Compare { left, right, .. } | Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Whether row `position` of `ds` satisfies the expression.
    fn matches(&self, ds: &Dataset, position: usize) -> bool {
        match self {
            Expr::Column(_) | Expr::Literal(_) => truthy(&self.value(ds, position)),
            Expr::Compare { left, op, right } => {
                compare(&left.value(ds, position), *op, &right.value(ds, position))
            }
            Expr::And(a, b) => a.matches(ds, position) && b.matches(ds, position),
            Expr::Or(a, b) => a.matches(ds, position) || b.matches(ds, position),
            Expr::Not(inner) => !inner.matches(ds, position),
        }
    }

    fn value(&self, ds: &Dataset, position: usize) -> Value {
        match self {
            Expr::Column(name) => ds
                .column(name)
                .map_or(Value::Null, |c| c.values[position].clone()),
            Expr::Literal(v) => v.clone(),
            // Conditions only appear as operands after validation rejects them.
            _ => Value::Null,
        }
    }

    fn is_operand(&self) -> bool {
        matches!(self, Expr::Column(_) | Expr::Literal(_))
    }
}

/// Keep the rows of `ds` for which `expression` holds.
///
/// Fails with [`DataError::InvalidExpression`] for malformed input or a
/// reference to a column the dataset does not have.
pub fn filter_rows(ds: &Dataset, expression: &str) -> Result<Dataset, DataError> {
    let expr = Expr::parse(expression)?;

    if let Some(unknown) = expr.columns().into_iter().find(|c| !ds.has_column(c)) {
        return Err(invalid(format!("unknown column '{}'", unknown)));
    }

    let keep: Vec<usize> = (0..ds.height())
        .filter(|&row| expr.matches(ds, row))
        .collect();

    debug!(
        "Filter '{}' kept {} of {} rows",
        expression,
        keep.len(),
        ds.height()
    );
    Ok(ds.take_rows(&keep))
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => op.holds(a.partial_cmp(b)),
        (Value::Text(a), Value::Text(b)) => op.holds(Some(a.cmp(b))),
        // Missing values and mismatched kinds are never equal or ordered.
        _ => op == CmpOp::Ne,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Number(v) => *v != 0.0,
        Value::Text(s) => !s.is_empty(),
    }
}

fn invalid(message: impl Into<String>) -> DataError {
    DataError::InvalidExpression(message.into())
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Op(CmpOp),
    And,
    Or,
    Not,
    Minus,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "name '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Bool(b) => write!(f, "'{}'", if *b { "True" } else { "False" }),
            Token::Op(op) => write!(f, "'{}'", op),
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::Not => write!(f, "'not'"),
            Token::Minus => write!(f, "'-'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, DataError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            '~' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '=' | '!' | '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, len) = match (c, next) {
                    ('=', Some('=')) => (CmpOp::Eq, 2),
                    ('!', Some('=')) => (CmpOp::Ne, 2),
                    ('<', Some('=')) => (CmpOp::Le, 2),
                    ('>', Some('=')) => (CmpOp::Ge, 2),
                    ('<', _) => (CmpOp::Lt, 1),
                    ('>', _) => (CmpOp::Gt, 1),
                    _ => return Err(invalid(format!("unexpected '{}' at position {}", c, i))),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| invalid("unterminated string literal"))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '`')
                    .ok_or_else(|| invalid("unterminated `quoted` column name"))?;
                tokens.push(Token::Ident(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent: 1e5, 2.5E-3
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "True" | "true" => Token::Bool(true),
                    "False" | "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(invalid(format!(
                    "unexpected character '{}' at position {}",
                    other, i
                )))
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr, DataError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, DataError> {
        let mut expr = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_not()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, DataError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, DataError> {
        let left = self.parse_operand()?;
        let op = match self.peek() {
            Some(Token::Op(op)) => *op,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_operand()?;

        if !left.is_operand() || !right.is_operand() {
            return Err(invalid(format!(
                "'{}' must compare a column or a literal value",
                op
            )));
        }
        if let Some(Token::Op(_)) = self.peek() {
            return Err(invalid("chained comparisons are not supported"));
        }

        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_operand(&mut self) -> Result<Expr, DataError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Expr::Column(name)),
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Value::Number(if b { 1.0 } else { 0.0 }))),
            Some(Token::Minus) => match self.next() {
                Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(-n))),
                _ => Err(invalid("'-' must be followed by a number")),
            },
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(invalid("missing ')'")),
                }
            }
            Some(token) => Err(invalid(format!("unexpected {}", token))),
            None => Err(invalid("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn regions() -> Dataset {
        Dataset::new(vec![
            Column::new("region", vec![text("A"), text("A"), text("B")]),
            Column::new(
                "v",
                vec![Value::Number(10.0), Value::Number(20.0), Value::Number(5.0)],
            ),
            Column::new("unit price", vec![Value::Number(1.0), Value::Null, Value::Number(3.0)]),
        ])
    }

    #[test]
    fn test_filter_greater_than() {
        let filtered = filter_rows(&regions(), "v>15").unwrap();
        assert_eq!(filtered.height(), 1);
        assert_eq!(filtered.column("v").unwrap().values[0], Value::Number(20.0));
        assert_eq!(filtered.index(), &[1]);
    }

    #[test]
    fn test_filter_logical_operators() {
        let ds = regions();
        assert_eq!(filter_rows(&ds, "region == 'A' and v <= 10").unwrap().height(), 1);
        assert_eq!(filter_rows(&ds, "region == \"B\" or v >= 20").unwrap().height(), 2);
        assert_eq!(filter_rows(&ds, "not (region == 'A')").unwrap().height(), 1);
        assert_eq!(filter_rows(&ds, "(v > 1) & ~(v > 15)").unwrap().height(), 2);
        assert_eq!(filter_rows(&ds, "v > -1 | v < 0").unwrap().height(), 3);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = Expr::parse("a > 1 or b > 2 and c > 3").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref rhs) if matches!(**rhs, Expr::And(_, _))));
    }

    #[test]
    fn test_nulls_never_compare() {
        let ds = regions();
        assert_eq!(filter_rows(&ds, "`unit price` > 0").unwrap().height(), 2);
        assert_eq!(filter_rows(&ds, "`unit price` != 1").unwrap().height(), 2);
    }

    #[test]
    fn test_mixed_kinds_compare_unequal() {
        let ds = regions();
        assert_eq!(filter_rows(&ds, "region == 1").unwrap().height(), 0);
        assert_eq!(filter_rows(&ds, "region > 1").unwrap().height(), 0);
        assert_eq!(filter_rows(&ds, "region != 1").unwrap().height(), 3);
    }

    #[test]
    fn test_column_vs_column() {
        let ds = regions();
        assert_eq!(filter_rows(&ds, "v > `unit price`").unwrap().height(), 2);
    }

    #[test]
    fn test_unknown_column_is_invalid() {
        let err = filter_rows(&regions(), "age > 30").unwrap_err();
        assert_eq!(err, DataError::InvalidExpression("unknown column 'age'".to_string()));
    }

    #[test]
    fn test_malformed_expressions() {
        let ds = regions();
        for expr in [
            "",
            "v >",
            "v = 3",
            "(v > 3",
            "v > 3)",
            "'open",
            "v > 1 > 0",
            "(v > 1) == True",
            "v > 3 and",
            "v ; 3",
        ] {
            assert!(
                matches!(filter_rows(&ds, expr), Err(DataError::InvalidExpression(_))),
                "expected '{}' to be rejected",
                expr
            );
        }
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokenize("1.5e3 2").unwrap(),
            vec![Token::Number(1500.0), Token::Number(2.0)]
        );
    }
}
