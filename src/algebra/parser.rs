//! Text -> expression parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary | power)*      juxtaposition multiplies
//! unary   := ('-' | '+') unary | power
//! power   := primary (('**' | '^') unary)?           right associative
//! primary := number | name | '(' sum ')' | func primary | '√' primary
//! ```

use super::calculus::LimitPoint;
use super::expr::{Constant, Expr, Func};
use super::number::Number;
use super::ops::{add, func, mul, neg, pow};
use crate::error::{AlgebraError, AlgebraResult};

/// Deepest nesting of parentheses, signs, exponents and function
/// applications the parser accepts. Every later pass recurses over the
/// tree, so this also bounds their stack use.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
    Sqrt,
    Infinity,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn is_infinity_name(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "oo" | "inf" | "infinity")
}

fn tokenize(text: &str) -> AlgebraResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' => {
                if chars.peek().is_some_and(|(_, n)| *n == '*') {
                    chars.next();
                    Token::Power
                } else {
                    Token::Star
                }
            }
            '×' | '·' => Token::Star,
            '/' | '÷' => Token::Slash,
            '^' => Token::Power,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '√' => Token::Sqrt,
            '∞' => Token::Infinity,
            'π' => Token::Name("pi".to_string()),
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::from(c);
                while let Some((_, n)) = chars.peek() {
                    if n.is_ascii_digit() || *n == '.' {
                        literal.push(*n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = Number::parse_decimal(&literal).ok_or_else(|| {
                    AlgebraError::parse(pos, format!("invalid number '{literal}'"))
                })?;
                Token::Num(number)
            }
            c if c.is_ascii_alphabetic() => {
                let mut name = String::from(c);
                while let Some((_, n)) = chars.peek() {
                    if n.is_ascii_alphabetic() {
                        name.push(*n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if is_infinity_name(&name) {
                    Token::Infinity
                } else {
                    Token::Name(name)
                }
            }
            other => {
                return Err(AlgebraError::parse(
                    pos,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        tokens.push(Spanned { token, pos });
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> AlgebraResult<T>) -> AlgebraResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(AlgebraError::parse(
                self.pos(),
                format!("expression nested deeper than {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|s| &s.token)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.index).map_or(self.end, |s| s.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|s| s.token.clone());
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn sum(&mut self) -> AlgebraResult<Expr> {
        let mut terms = vec![self.product()?];
        loop {
            if self.eat(&Token::Plus) {
                terms.push(self.product()?);
            } else if self.eat(&Token::Minus) {
                terms.push(neg(self.product()?));
            } else {
                return Ok(add(terms));
            }
        }
    }

    fn starts_primary(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Num(_) | Token::Name(_) | Token::LParen | Token::Sqrt)
        )
    }

    fn product(&mut self) -> AlgebraResult<Expr> {
        let mut factors = vec![self.unary()?];
        loop {
            if self.eat(&Token::Star) {
                factors.push(self.unary()?);
            } else if self.eat(&Token::Slash) {
                let pos = self.pos();
                let divisor = self.unary()?;
                if divisor.is_zero() {
                    tracing::trace!(pos, "division by literal zero");
                    return Err(AlgebraError::DivisionByZero);
                }
                factors.push(pow(divisor, Expr::int(-1)));
            } else if self.starts_primary() {
                factors.push(self.power()?);
            } else {
                return Ok(mul(factors));
            }
        }
    }

    fn unary(&mut self) -> AlgebraResult<Expr> {
        self.nested(|p| {
            if p.eat(&Token::Minus) {
                return Ok(neg(p.unary()?));
            }
            if p.eat(&Token::Plus) {
                return p.unary();
            }
            p.power()
        })
    }

    fn power(&mut self) -> AlgebraResult<Expr> {
        let base = self.primary()?;
        if self.eat(&Token::Power) {
            let exp = self.unary()?;
            return Ok(pow(base, exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> AlgebraResult<Expr> {
        self.nested(Self::atom)
    }

    fn atom(&mut self) -> AlgebraResult<Expr> {
        let pos = self.pos();
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::LParen) => {
                let inner = self.sum()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(AlgebraError::parse(self.pos(), "expected ')'"))
                }
            }
            Some(Token::Sqrt) => Ok(pow(self.primary()?, Expr::rational(1, 2))),
            Some(Token::Name(name)) => self.name(&name, pos),
            Some(Token::Infinity) => Err(AlgebraError::parse(
                pos,
                "infinity is only valid as a limit point",
            )),
            Some(other) => Err(AlgebraError::parse(pos, format!("unexpected {other:?}"))),
            None => Err(AlgebraError::parse(pos, "unexpected end of input")),
        }
    }

    fn name(&mut self, name: &str, pos: usize) -> AlgebraResult<Expr> {
        let lowered = name.to_ascii_lowercase();
        if lowered == "sqrt" {
            return Ok(pow(self.primary()?, Expr::rational(1, 2)));
        }
        if let Some(f) = Func::from_name(&lowered) {
            return Ok(func(f, self.primary()?));
        }
        if lowered == "pi" {
            return Ok(Expr::Const(Constant::Pi));
        }
        match name {
            "e" | "E" => Ok(Expr::Const(Constant::E)),
            "I" => Ok(Expr::Const(Constant::I)),
            _ if name.chars().count() == 1 => Ok(Expr::sym(name)),
            _ => {
                tracing::trace!(pos, name, "unknown identifier");
                Err(AlgebraError::UnknownIdentifier(name.to_string()))
            }
        }
    }
}

/// Parses an expression.
pub fn parse_expression(text: &str) -> AlgebraResult<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(AlgebraError::parse(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        index: 0,
        end: text.len(),
        depth: 0,
    };
    let expr = parser.sum()?;
    if parser.index < parser.tokens.len() {
        let pos = parser.pos();
        let token = parser.peek().cloned();
        return Err(AlgebraError::parse(pos, format!("unexpected {token:?}")));
    }
    Ok(expr)
}

/// Parses the target of a limit: a finite expression or `±oo`/`±∞`.
pub fn parse_limit_point(text: &str) -> AlgebraResult<LimitPoint> {
    let trimmed = text.trim().trim_end_matches(&['.', ',', ';'][..]);
    let (negative, body) = match trimmed.strip_prefix(&['-', '−'][..]) {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start()),
    };
    if body == "∞" || is_infinity_name(body) {
        return Ok(if negative {
            LimitPoint::NegInfinity
        } else {
            LimitPoint::PosInfinity
        });
    }
    parse_expression(trimmed).map(LimitPoint::Finite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> String {
        parse_expression(text).unwrap().to_string()
    }

    #[test]
    fn test_operators_and_precedence() {
        assert_eq!(parse("2+3*4"), "14");
        assert_eq!(parse("(2+3)*4"), "20");
        assert_eq!(parse("2**3**2"), "512");
        assert_eq!(parse("-x**2"), "-x**2");
        assert_eq!(parse("2^-1"), "1/2");
        assert_eq!(parse("x/2"), "x/2");
    }

    #[test]
    fn test_juxtaposition() {
        assert_eq!(parse("2 x"), "2*x");
        assert_eq!(parse("x(x+1)"), "x*(x + 1)");
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(parse("sin(x)"), "sin(x)");
        assert_eq!(parse("ln(x)"), "log(x)");
        assert_eq!(parse("sqrt(x)"), "sqrt(x)");
        assert_eq!(parse("√4"), "2");
        assert_eq!(parse("e^x"), "exp(x)");
        assert_eq!(parse("2π"), "2*pi");
        assert_eq!(parse("cos(0)"), "1");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_expression(""), Err(AlgebraError::Parse { .. })));
        assert!(matches!(parse_expression("x +"), Err(AlgebraError::Parse { .. })));
        assert!(matches!(parse_expression("(x"), Err(AlgebraError::Parse { .. })));
        assert!(matches!(parse_expression("x $ 2"), Err(AlgebraError::Parse { position: 2, .. })));
        assert_eq!(
            parse_expression("weather"),
            Err(AlgebraError::UnknownIdentifier("weather".to_string()))
        );
        assert_eq!(parse_expression("1/0"), Err(AlgebraError::DivisionByZero));
        assert!(parse_expression("oo").is_err());
    }

    #[test]
    fn test_limit_points() {
        assert_eq!(parse_limit_point("oo").unwrap(), LimitPoint::PosInfinity);
        assert_eq!(parse_limit_point("∞").unwrap(), LimitPoint::PosInfinity);
        assert_eq!(parse_limit_point("-∞").unwrap(), LimitPoint::NegInfinity);
        assert_eq!(parse_limit_point("+infinity").unwrap(), LimitPoint::PosInfinity);
        assert_eq!(
            parse_limit_point("0.").unwrap(),
            LimitPoint::Finite(Expr::int(0))
        );
        assert_eq!(
            parse_limit_point("-2").unwrap(),
            LimitPoint::Finite(Expr::int(-2))
        );
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let text = format!("1+{}1{}", "(".repeat(5000), ")".repeat(5000));
        let err = parse_expression(&text).unwrap_err();
        assert!(matches!(err, AlgebraError::Parse { .. }));
        assert!(err.to_string().contains("nested"));

        for text in [
            "-".repeat(10_000) + "1",
            "sqrt ".repeat(10_000) + "x",
            vec!["2"; 10_000].join("**"),
        ] {
            assert!(parse_expression(&text).is_err());
        }
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let text = format!("{}x{}", "(".repeat(64), ")".repeat(64));
        assert_eq!(parse(&text), "x");
        assert_eq!(parse("--x"), "x");
    }
}
