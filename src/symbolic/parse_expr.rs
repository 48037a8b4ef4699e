//! a module turns a String expression into a symbolic expression
//!
//! The text is split into tokens by a small lexer, identifiers are classified through the
//! [`SymbolTable`], and a recursive-descent parser builds the [`Expr`] tree. A bare occurrence of the
//! dependent variable is the unknown function applied to the independent variable, so `y` and
//! `y(x)` parse to the same atom.
//!
//! Grammar (lowest binding first):
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary | power)*      implicit multiplication: 2x, 2(x+1), x y
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?                   right associative, tighter than unary minus
//! primary := number | ident | ident '(' args ')' | '(' expr ')'
//! ```
//!# Example
//! ```rust, ignore
//! use RustedODE::symbolic::symbolic_engine::Expr;
//! let parsed_expression = Expr::parse_expression("x^2*exp(-x) + 2y").unwrap();
//! println!(" parsed_expression {}", parsed_expression);
//! ```

use crate::ode::error::ParseError;
use crate::symbolic::symbol_table::{Binding, SymbolTable, VariableBinding};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::brackets_balanced;

const MAX_DEPTH: usize = 64;
/// Highest order accepted in `Derivative(expr, x, n)`.
pub const MAX_ORDER: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {}", v),
            Token::Ident(name) => format!("'{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Pow => "'**'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }

    /// Tokens that may start an implicitly multiplied factor.
    fn starts_factor(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Ident(_) | Token::LParen)
    }
}

/// Splits the text into tokens; square brackets become parentheses.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // scientific notation: 1e-3, 2.5E4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| ParseError::Syntax(format!("malformed number '{}'", text)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '+' | '-' | '/' | '(' | ')' | '[' | ']' | ',' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '(' | '[' => Token::LParen,
                    ')' | ']' => Token::RParen,
                    _ => Token::Comma,
                });
                i += 1;
            }
            other => {
                return Err(ParseError::Syntax(format!("unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    table: &'a SymbolTable,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, table: &'a SymbolTable) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            table,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(ParseError::Syntax(format!(
                "expected {} but found {}",
                expected.describe(),
                t.describe()
            ))),
            None => Err(ParseError::Syntax(format!(
                "expected {} but the expression ended",
                expected.describe()
            ))),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::Syntax(format!(
                "expression nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parses the whole token stream as one expression.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::Syntax("empty expression".to_string()));
        }
        let e = self.parse_expr()?;
        match self.peek() {
            None => Ok(e),
            Some(t) => Err(ParseError::Syntax(format!("unexpected {}", t.describe()))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    lhs = lhs + self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    lhs = lhs - self.parse_term()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    lhs = lhs * self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    lhs = lhs / self.parse_unary()?;
                }
                Some(t) if t.starts_factor() => {
                    lhs = lhs * self.parse_power()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(match operand {
                    Expr::Const(v) => Expr::Const(-v),
                    other => -other,
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(operand)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if let Some(Token::Pow) = self.peek() {
            self.pos += 1;
            self.enter()?;
            let exponent = self.parse_unary()?;
            self.leave();
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        self.enter()?;
        let e = self.parse_expr()?;
        self.leave();
        self.expect(Token::RParen)?;
        Ok(e)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Const(v)),
            Some(Token::LParen) => {
                self.pos -= 1;
                self.parse_parenthesized()
            }
            Some(Token::Ident(name)) => self.parse_identifier(name),
            Some(t) => Err(ParseError::Syntax(format!("unexpected {}", t.describe()))),
            None => Err(ParseError::Syntax("unexpected end of expression".to_string())),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, ParseError> {
        let binding = self
            .table
            .lookup(&name)
            .ok_or_else(|| ParseError::UnboundName(name.clone()))?;
        let indep = self.table.independent().to_string();
        match binding {
            Binding::Independent => Ok(Expr::Var(indep)),
            Binding::Dependent => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(arg)) if arg == indep => {}
                        _ => {
                            return Err(ParseError::Syntax(format!(
                                "{} must be applied to {}: write {}({})",
                                name, indep, name, indep
                            )));
                        }
                    }
                    self.expect(Token::RParen)?;
                }
                Ok(Expr::unknown(&name, &indep, 0))
            }
            Binding::Function(f) => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(ParseError::Syntax(format!("function '{}' must be followed by '('", name)));
                }
                Ok(Expr::func(f, self.parse_parenthesized()?))
            }
            Binding::Root => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(ParseError::Syntax("sqrt must be followed by '('".to_string()));
                }
                Ok(self.parse_parenthesized()?.sqrt())
            }
            Binding::Constant(c) => Ok(Expr::Sym(c)),
            Binding::Derivative => self.parse_derivative(&name),
        }
    }

    /// `Derivative(expr, x)`, `Derivative(expr, x, n)`, same for `diff`
    fn parse_derivative(&mut self, name: &str) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        self.enter()?;
        let target = self.parse_expr()?;
        self.leave();
        self.expect(Token::Comma)?;
        let indep = self.table.independent().to_string();
        match self.next() {
            Some(Token::Ident(var)) if var == indep => {}
            _ => {
                return Err(ParseError::Syntax(format!(
                    "{} can only differentiate with respect to {}",
                    name, indep
                )));
            }
        }
        let mut order = 1;
        if let Some(Token::Comma) = self.peek() {
            self.pos += 1;
            match self.next() {
                Some(Token::Number(n)) if n >= 1.0 && n.fract() == 0.0 && n <= MAX_ORDER as f64 => {
                    order = n as usize
                }
                _ => {
                    return Err(ParseError::Syntax(format!(
                        "the order in {}(...) must be an integer from 1 to {}",
                        name, MAX_ORDER
                    )));
                }
            }
        }
        self.expect(Token::RParen)?;
        let mut result = target.clone();
        for _ in 0..order {
            result = result.diff(&indep);
        }
        if matches!(target, Expr::Unknown { .. }) {
            Ok(result)
        } else {
            Ok(result.simplify())
        }
    }
}

/// Parses one side of an equation against the given symbol table.
pub fn parse_with_table(input: &str, table: &SymbolTable) -> Result<Expr, ParseError> {
    if !brackets_balanced(input) {
        return Err(ParseError::UnbalancedParentheses);
    }
    let tokens = tokenize(input)?;
    Parser::new(tokens, table).parse()
}

impl Expr {
    /// Parses an expression with the default variables `x` and `y(x)`.
    pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
        let table = SymbolTable::new(&VariableBinding::default());
        parse_with_table(input, &table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_engine::{Constant, Func};

    fn x() -> Expr {
        Expr::var("x")
    }
    fn y() -> Expr {
        Expr::unknown("y", "x", 0)
    }
    fn parse(s: &str) -> Result<Expr, ParseError> {
        Expr::parse_expression(s)
    }

    #[test]
    fn test_parse_constant_and_variable() {
        assert_eq!(parse("2.5").unwrap(), Expr::Const(2.5));
        assert_eq!(parse("x").unwrap(), x());
        assert_eq!(parse("1e-3").unwrap(), Expr::Const(0.001));
    }

    #[test]
    fn test_bare_dependent_is_function() {
        assert_eq!(parse("y").unwrap(), y());
        assert_eq!(parse("y(x)").unwrap(), y());
        assert_eq!(parse("exp(y)").unwrap(), y().exp());
        assert!(matches!(parse("y(t)"), Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse("x + 2*y").unwrap(), x() + Expr::Const(2.0) * y());
        assert_eq!(parse("-x**2").unwrap(), -(x().pow(Expr::Const(2.0))));
        assert_eq!(
            parse("2**3**2").unwrap(),
            Expr::Const(2.0).pow(Expr::Const(3.0).pow(Expr::Const(2.0)))
        );
        assert_eq!(parse("x^-1").unwrap(), x().pow(Expr::Const(-1.0)));
        assert_eq!(parse("x - y - 1").unwrap(), (x() - y()) - Expr::Const(1.0));
        assert_eq!(parse("x/2/y").unwrap(), (x() / Expr::Const(2.0)) / y());
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(parse("2x").unwrap(), Expr::Const(2.0) * x());
        assert_eq!(parse("2(x+1)").unwrap(), Expr::Const(2.0) * (x() + Expr::Const(1.0)));
        assert_eq!(parse("(x)(y)").unwrap(), x() * y());
        assert_eq!(parse("x y").unwrap(), x() * y());
        assert_eq!(parse("2x**2").unwrap(), Expr::Const(2.0) * x().pow(Expr::Const(2.0)));
    }

    #[test]
    fn test_functions_constants_brackets() {
        assert_eq!(parse("sin(x)").unwrap(), Expr::func(Func::sin, x()));
        assert_eq!(parse("ln[x]").unwrap(), x().ln());
        assert_eq!(parse("sqrt(x)").unwrap(), x().sqrt());
        assert_eq!(parse("pi").unwrap(), Expr::Sym(Constant::Pi));
        assert_eq!(parse("E**x").unwrap(), Expr::Sym(Constant::E).pow(x()));
        assert!(parse("sin x").is_err());
    }

    #[test]
    fn test_derivative_calls() {
        assert_eq!(parse("Derivative(y(x), x)").unwrap(), Expr::unknown("y", "x", 1));
        assert_eq!(parse("Derivative(y(x), x, 3)").unwrap(), Expr::unknown("y", "x", 3));
        assert_eq!(parse("diff(y, x, 2)").unwrap(), Expr::unknown("y", "x", 2));
        let product = parse("diff(x*y, x)").unwrap();
        assert!(product.contains_derivative("y"));
        assert!(parse("Derivative(y, z)").is_err());
        assert!(parse("Derivative(y, x, 0)").is_err());
        assert_eq!(parse("Derivative(y, x, 64)").unwrap(), Expr::unknown("y", "x", MAX_ORDER));
        assert!(matches!(parse("Derivative(y, x, 65)"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse("Derivative(y, x, 1e18)"), Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("z + 1"), Err(ParseError::UnboundName("z".to_string())));
        assert_eq!(parse("(x + 1"), Err(ParseError::UnbalancedParentheses));
        assert_eq!(parse("(x + 1]"), Err(ParseError::UnbalancedParentheses));
        assert!(matches!(parse("x +"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse("x $ 2"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse(""), Err(ParseError::Syntax(_))));
        assert!(matches!(parse("x,"), Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}x{}", "(".repeat(70), ")".repeat(70));
        assert!(matches!(parse(&deep), Err(ParseError::Syntax(_))));
        let fine = format!("{}x{}", "(".repeat(30), ")".repeat(30));
        assert_eq!(parse(&fine).unwrap(), x());
    }

    #[test]
    fn test_custom_bindings() {
        let table = SymbolTable::new(&VariableBinding::new("t", "u"));
        let e = parse_with_table("u + t*e", &table).unwrap();
        assert_eq!(
            e,
            Expr::unknown("u", "t", 0) + Expr::var("t") * Expr::Sym(Constant::E)
        );
        assert_eq!(parse_with_table("x", &table), Err(ParseError::UnboundName("x".to_string())));
    }
}
