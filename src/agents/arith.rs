//! Constrained arithmetic: numbers, `+ - * /`, unary minus, parentheses and
//! at most one single-letter variable. Parsed into a small AST by recursive
//! descent; nothing is ever handed to a general-purpose evaluator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("unbound variable '{0}'")]
    UnboundVariable(char),
    #[error("equation must contain exactly one '='")]
    MalformedEquation,
    #[error("only linear equations in '{0}' are supported")]
    NotLinear(char),
    #[error("equation has no solution")]
    NoSolution,
    #[error("every value of '{0}' solves the equation")]
    InfiniteSolutions(char),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Var(char),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(self) -> String {
        match self {
            Token::Num(n) => format!("number {}", n),
            Token::Var(c) => format!("variable '{}'", c),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }

    /// Can end an operand (`2`, `x`, `)`).
    fn closes_operand(self) -> bool {
        matches!(self, Token::Num(_) | Token::Var(_) | Token::RParen)
    }
}

/// `variable` is the only letter accepted; `2x`, `x2` and `2(x)` read as products.
fn tokenize(input: &str, variable: Option<char>) -> Result<Vec<Token>, CalcError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                Token::Num(value)
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if Some(c) == variable => Token::Var(c),
            other => return Err(CalcError::UnexpectedChar(other)),
        };
        if !matches!(token, Token::Num(_)) {
            chars.next();
        }

        let implicit_product = match (tokens.last(), token) {
            (Some(prev), Token::Var(_) | Token::LParen) => prev.closes_operand(),
            (Some(Token::Var(_)), Token::Num(_)) => true,
            _ => false,
        };
        if implicit_product {
            tokens.push(Token::Star);
        }
        tokens.push(token);
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var(char),
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
}

/// Deepest nesting the parser accepts. Parentheses, unary signs and chained
/// operators each count one level, which also bounds the height of the AST.
pub const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Node, CalcError> {
        let base = self.depth;
        let mut node = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.bump();
            self.descend()?;
            let rhs = self.term()?;
            let op = if op == Token::Plus { BinOp::Add } else { BinOp::Sub };
            node = Node::Bin(op, Box::new(node), Box::new(rhs));
        }
        self.depth = base;
        Ok(node)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Node, CalcError> {
        let base = self.depth;
        let mut node = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.bump();
            self.descend()?;
            let rhs = self.factor()?;
            let op = if op == Token::Star { BinOp::Mul } else { BinOp::Div };
            node = Node::Bin(op, Box::new(node), Box::new(rhs));
        }
        self.depth = base;
        Ok(node)
    }

    // factor := ('+' | '-') factor | primary
    fn factor(&mut self) -> Result<Node, CalcError> {
        match self.peek() {
            Some(sign @ (Token::Minus | Token::Plus)) => {
                self.bump();
                self.descend()?;
                let inner = self.factor()?;
                self.depth -= 1;
                Ok(if sign == Token::Minus {
                    Node::Neg(Box::new(inner))
                } else {
                    inner
                })
            }
            _ => self.primary(),
        }
    }

    // primary := number | variable | '(' expr ')'
    fn primary(&mut self) -> Result<Node, CalcError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Node::Num(n)),
            Some(Token::Var(c)) => Ok(Node::Var(c)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(other) => Err(CalcError::UnexpectedToken(other.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// A parsed arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    root: Node,
}

impl Expr {
    /// Parse an expression with no variables.
    pub fn parse(input: &str) -> Result<Self, CalcError> {
        Self::parse_in(input, None)
    }

    /// Parse an expression that may mention `variable`.
    pub fn parse_in(input: &str, variable: Option<char>) -> Result<Self, CalcError> {
        let tokens = tokenize(input, variable)?;
        if tokens.is_empty() {
            return Err(CalcError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expr()?;
        if let Some(extra) = parser.peek() {
            return Err(CalcError::UnexpectedToken(extra.describe()));
        }
        Ok(Self { root })
    }

    /// Evaluate with an optional `(variable, value)` binding.
    pub fn eval(&self, binding: Option<(char, f64)>) -> Result<f64, CalcError> {
        let value = eval_node(&self.root, binding)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CalcError::NotFinite)
        }
    }
}

fn eval_node(node: &Node, binding: Option<(char, f64)>) -> Result<f64, CalcError> {
    Ok(match node {
        Node::Num(n) => *n,
        Node::Var(c) => match binding {
            Some((name, value)) if name == *c => value,
            _ => return Err(CalcError::UnboundVariable(*c)),
        },
        Node::Neg(inner) => -eval_node(inner, binding)?,
        Node::Bin(op, lhs, rhs) => {
            let l = eval_node(lhs, binding)?;
            let r = eval_node(rhs, binding)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    l / r
                }
            }
        }
    })
}

/// Evaluate a variable-free expression.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    Expr::parse(input)?.eval(None)
}

/// Solve `lhs = rhs` for `variable`, where both sides are linear in it.
pub fn solve_linear(equation: &str, variable: char) -> Result<f64, CalcError> {
    let (lhs, rhs) = match equation.split('=').collect::<Vec<_>>().as_slice() {
        [lhs, rhs] => (
            Expr::parse_in(lhs, Some(variable))?,
            Expr::parse_in(rhs, Some(variable))?,
        ),
        _ => return Err(CalcError::MalformedEquation),
    };

    // g(v) = lhs(v) - rhs(v) = a*v + b
    let g = |v: f64| -> Result<f64, CalcError> {
        Ok(lhs.eval(Some((variable, v)))? - rhs.eval(Some((variable, v)))?)
    };
    let b = g(0.0)?;
    let a = g(1.0)? - b;
    let at_two = g(2.0)?;
    if (at_two - (2.0 * a + b)).abs() > 1e-9 * (1.0 + at_two.abs()) {
        return Err(CalcError::NotLinear(variable));
    }

    if a.abs() < 1e-12 {
        return Err(if b.abs() < 1e-12 {
            CalcError::InfiniteSolutions(variable)
        } else {
            CalcError::NoSolution
        });
    }
    Ok(-b / a)
}

/// Render a value: integral results without a fractional part.
pub fn format_number(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-9 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5 + 3", 8.0)]
    #[case("7 * 6", 42.0)]
    #[case("(10 + 5) * 2", 30.0)]
    #[case("10 - 2 - 3", 5.0)]
    #[case("2 + 3 * 4", 14.0)]
    #[case("-3 + 5", 2.0)]
    #[case("-(2 + 3)", -5.0)]
    #[case("5 / 2", 2.5)]
    #[case(".5 * 4", 2.0)]
    fn test_evaluate(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(evaluate(input).expect("evaluate"), expected);
    }

    #[rstest]
    #[case("", CalcError::Empty)]
    #[case("1 / 0", CalcError::DivisionByZero)]
    #[case("1 / (2 - 2)", CalcError::DivisionByZero)]
    #[case("2 +", CalcError::UnexpectedEnd)]
    #[case("(1 + 2", CalcError::UnexpectedEnd)]
    #[case("1.2.3", CalcError::InvalidNumber("1.2.3".to_string()))]
    #[case("2 ** 3", CalcError::UnexpectedToken("'*'".to_string()))]
    #[case("x + 1", CalcError::UnexpectedChar('x'))]
    #[case("__import__", CalcError::UnexpectedChar('_'))]
    fn test_evaluate_rejects(#[case] input: &str, #[case] expected: CalcError) {
        assert_eq!(evaluate(input), Err(expected));
    }

    #[rstest]
    #[case("x + 5 = 10", 'x', 5.0)]
    #[case("2x + 5 = 15", 'x', 5.0)]
    #[case("3y - 4 = 2y + 1", 'y', 5.0)]
    #[case("10 = 2(z + 1)", 'z', 4.0)]
    #[case("x / 4 = 2.5", 'x', 10.0)]
    fn test_solve_linear(#[case] equation: &str, #[case] var: char, #[case] expected: f64) {
        let solution = solve_linear(equation, var).expect("solve");
        assert!((solution - expected).abs() < 1e-9, "{solution} != {expected}");
    }

    #[test]
    fn test_solve_rejects_bad_equations() {
        assert_eq!(solve_linear("x * x = 4", 'x'), Err(CalcError::NotLinear('x')));
        assert_eq!(solve_linear("x = x + 1", 'x'), Err(CalcError::NoSolution));
        assert_eq!(
            solve_linear("2x = x + x", 'x'),
            Err(CalcError::InfiniteSolutions('x'))
        );
        assert_eq!(solve_linear("x = 1 = 2", 'x'), Err(CalcError::MalformedEquation));
    }

    #[rstest]
    #[case::nested_parens(format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000)))]
    #[case::leading_minus(format!("{}1", "-".repeat(100_000)))]
    #[case::leading_plus(format!("{}1", "+".repeat(100_000)))]
    #[case::long_chain(format!("1{}", " + 1".repeat(100_000)))]
    #[case::unclosed(format!("{}1", "(".repeat(100_000)))]
    fn test_deep_input_is_rejected(#[case] input: String) {
        assert_eq!(evaluate(&input), Err(CalcError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_nesting_within_limit_is_fine() {
        let input = format!("{}2{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&input), Ok(2.0));
        assert_eq!(evaluate("- - - 4"), Ok(-4.0));
    }

    #[test]
    fn test_deep_equation_is_rejected() {
        let equation = format!("{}x{} = 1", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            solve_linear(&equation, 'x'),
            Err(CalcError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(4.999_999_999_999), "5");
    }
}
