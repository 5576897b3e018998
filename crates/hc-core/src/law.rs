//! Laws: the scalar functions sampled onto the grid.
//!
//! A law is either a numeric closure or an arithmetic expression over named
//! variables. Expressions are lexed with logos, parsed by precedence climbing
//! and compiled into an evaluation tree whose variable slots are bound to
//! axis positions. Nothing is ever evaluated as code beyond that tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use logos::Logos;

use crate::error::{HypercubeError, Result};
use crate::grid::GridSpace;

/// Numeric law body. Receives one argument per variable.
pub type LawFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

#[derive(Clone)]
pub enum Law {
    /// Closure taking arguments in axis order.
    Numeric(Arc<LawFn>),
    /// Closure taking arguments in the order of `variables`.
    Named {
        variables: Vec<String>,
        function: Arc<LawFn>,
    },
    /// Arithmetic expression compiled against the grid at build time.
    Expression(String),
}

impl Law {
    pub fn numeric<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Law::Numeric(Arc::new(f))
    }

    pub fn named<F>(variables: &[&str], f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Law::Named {
            variables: variables.iter().map(|v| v.to_string()).collect(),
            function: Arc::new(f),
        }
    }

    pub fn expression(source: &str) -> Self {
        Law::Expression(source.to_string())
    }

    /// Bind the law to `grid`. Identifiers that are not axes resolve against
    /// `constants`, then the built-ins `pi` and `e`.
    pub fn compile(
        &self,
        grid: &GridSpace,
        constants: &BTreeMap<String, f64>,
    ) -> Result<CompiledLaw> {
        match self {
            Law::Numeric(function) => Ok(CompiledLaw::Closure(Arc::clone(function))),
            Law::Named {
                variables,
                function,
            } => {
                let mut order = Vec::with_capacity(variables.len());
                for (i, var) in variables.iter().enumerate() {
                    if variables[..i].contains(var) {
                        return Err(HypercubeError::LawCompilation {
                            symbol: var.clone(),
                            reason: "variable listed twice".to_string(),
                        });
                    }
                    let idx = grid
                        .axis_index(var)
                        .map_err(|_| HypercubeError::UnboundVariable(var.clone()))?;
                    order.push(idx);
                }
                Ok(CompiledLaw::Permuted {
                    function: Arc::clone(function),
                    order,
                })
            }
            Law::Expression(source) => {
                let expr = parse(source)?;
                let node = bind(&expr, grid, constants)?;
                Ok(CompiledLaw::Tree(node))
            }
        }
    }
}

impl fmt::Debug for Law {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Law::Numeric(_) => f.write_str("Law::Numeric(<closure>)"),
            Law::Named { variables, .. } => write!(f, "Law::Named({variables:?})"),
            Law::Expression(source) => write!(f, "Law::Expression({source:?})"),
        }
    }
}

/// A law bound to a specific axis order.
#[derive(Clone)]
pub enum CompiledLaw {
    Closure(Arc<LawFn>),
    Permuted { function: Arc<LawFn>, order: Vec<usize> },
    Tree(Node),
}

impl CompiledLaw {
    /// Evaluate at one mesh point given in axis order.
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        match self {
            CompiledLaw::Closure(function) => function(point),
            CompiledLaw::Permuted { function, order } => {
                let args: Vec<f64> = order.iter().map(|&i| point[i]).collect();
                function(&args)
            }
            CompiledLaw::Tree(node) => node.eval(point),
        }
    }
}

impl fmt::Debug for CompiledLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledLaw::Closure(_) => f.write_str("CompiledLaw::Closure"),
            CompiledLaw::Permuted { order, .. } => write!(f, "CompiledLaw::Permuted({order:?})"),
            CompiledLaw::Tree(node) => write!(f, "CompiledLaw::Tree({node:?})"),
        }
    }
}

// --- Lexer ---

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    #[token("**")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

struct Lexeme {
    token: Token,
    text: String,
}

fn lex(source: &str) -> Result<Vec<Lexeme>> {
    let mut lexer = Token::lexer(source);
    let mut out = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => out.push(Lexeme {
                token,
                text: lexer.slice().to_string(),
            }),
            Err(()) => {
                return Err(HypercubeError::LawCompilation {
                    symbol: lexer.slice().to_string(),
                    reason: "unrecognized input".to_string(),
                });
            }
        }
    }
    Ok(out)
}

// --- Parser ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// Unary minus binds tighter than `*` and looser than `^`, so `-x^2 = -(x^2)`.
const NEG_PREC: u8 = 25;

fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinaryOp)> {
    match token {
        Token::Plus => Some((10, Assoc::Left, BinaryOp::Add)),
        Token::Minus => Some((10, Assoc::Left, BinaryOp::Sub)),
        Token::Star => Some((20, Assoc::Left, BinaryOp::Mul)),
        Token::Slash => Some((20, Assoc::Left, BinaryOp::Div)),
        Token::Caret => Some((30, Assoc::Right, BinaryOp::Pow)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

/// Deepest nesting accepted, both as parser recursion and as tree height.
/// Binding and evaluation recurse over the tree, so this also bounds their
/// stack use.
const MAX_NESTING: usize = 256;

struct Parser {
    lexemes: Vec<Lexeme>,
    pos: usize,
    depth: usize,
}

/// A parsed subtree and its height.
type Parsed = (Expr, usize);

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.lexemes.get(self.pos).map(|l| &l.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.lexemes.get(self.pos).map(|l| l.token.clone());
        self.pos += 1;
        token
    }

    fn error_here(&self, reason: &str) -> HypercubeError {
        let symbol = self
            .lexemes
            .get(self.pos)
            .map(|l| l.text.clone())
            .unwrap_or_else(|| "<end of input>".to_string());
        HypercubeError::LawCompilation {
            symbol,
            reason: reason.to_string(),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {what}")))
        }
    }

    fn node(&self, expr: Expr, height: usize) -> Result<Parsed> {
        if height > MAX_NESTING {
            return Err(self.error_here("nesting too deep"));
        }
        Ok((expr, height))
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<Parsed> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("nesting too deep"));
        }
        self.depth += 1;
        let (mut left, mut height) = self.parse_prefix()?;

        while let Some(token) = self.peek() {
            let Some((prec, assoc, op)) = binary_op_info(token) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
            let (right, right_height) = self.parse_expr(next_prec)?;
            (left, height) = self.node(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                1 + height.max(right_height),
            )?;
        }

        self.depth -= 1;
        Ok((left, height))
    }

    fn parse_prefix(&mut self) -> Result<Parsed> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let (operand, height) = self.parse_expr(NEG_PREC)?;
                self.node(Expr::Neg(Box::new(operand)), height + 1)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_expr(NEG_PREC)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Parsed> {
        let Some(token) = self.advance() else {
            return Err(self.error_here("unexpected end of expression"));
        };
        match token {
            Token::Number(value) => Ok((Expr::Number(value), 1)),
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let (args, height) = self.parse_args()?;
                    self.node(Expr::Call { name, args }, height + 1)
                } else {
                    Ok((Expr::Ident(name), 1))
                }
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => {
                self.pos -= 1;
                Err(self.error_here("expected a number, name or '('"))
            }
        }
    }

    /// Arguments up to the closing parenthesis, with the tallest height.
    fn parse_args(&mut self) -> Result<(Vec<Expr>, usize)> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok((args, height));
        }
        loop {
            let (arg, h) = self.parse_expr(0)?;
            args.push(arg);
            height = height.max(h);
            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok((args, height));
                }
                _ => return Err(self.error_here("expected ',' or ')'")),
            }
        }
    }
}

fn parse(source: &str) -> Result<Expr> {
    let lexemes = lex(source)?;
    if lexemes.is_empty() {
        return Err(HypercubeError::LawCompilation {
            symbol: "<empty>".to_string(),
            reason: "empty expression".to_string(),
        });
    }
    let mut parser = Parser {
        lexemes,
        pos: 0,
        depth: 0,
    };
    let (expr, _) = parser.parse_expr(0)?;
    if parser.pos < parser.lexemes.len() {
        return Err(parser.error_here("unexpected trailing input"));
    }
    Ok(expr)
}

// --- Binding ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func1 {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Log2,
    Sqrt,
    Abs,
    Floor,
    Ceil,
}

impl Func1 {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func1::Sin,
            "cos" => Func1::Cos,
            "tan" => Func1::Tan,
            "asin" => Func1::Asin,
            "acos" => Func1::Acos,
            "atan" => Func1::Atan,
            "sinh" => Func1::Sinh,
            "cosh" => Func1::Cosh,
            "tanh" => Func1::Tanh,
            "exp" => Func1::Exp,
            "ln" | "log" => Func1::Ln,
            "log10" => Func1::Log10,
            "log2" => Func1::Log2,
            "sqrt" => Func1::Sqrt,
            "abs" => Func1::Abs,
            "floor" => Func1::Floor,
            "ceil" => Func1::Ceil,
            _ => return None,
        })
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Func1::Sin => x.sin(),
            Func1::Cos => x.cos(),
            Func1::Tan => x.tan(),
            Func1::Asin => x.asin(),
            Func1::Acos => x.acos(),
            Func1::Atan => x.atan(),
            Func1::Sinh => x.sinh(),
            Func1::Cosh => x.cosh(),
            Func1::Tanh => x.tanh(),
            Func1::Exp => x.exp(),
            Func1::Ln => x.ln(),
            Func1::Log10 => x.log10(),
            Func1::Log2 => x.log2(),
            Func1::Sqrt => x.sqrt(),
            Func1::Abs => x.abs(),
            Func1::Floor => x.floor(),
            Func1::Ceil => x.ceil(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func2 {
    Pow,
    Min,
    Max,
    Atan2,
    Hypot,
}

impl Func2 {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "pow" => Func2::Pow,
            "min" => Func2::Min,
            "max" => Func2::Max,
            "atan2" => Func2::Atan2,
            "hypot" => Func2::Hypot,
            _ => return None,
        })
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Func2::Pow => a.powf(b),
            Func2::Min => a.min(b),
            Func2::Max => a.max(b),
            Func2::Atan2 => a.atan2(b),
            Func2::Hypot => a.hypot(b),
        }
    }
}

/// Evaluation tree with variables resolved to axis slots.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Const(f64),
    Arg(usize),
    Neg(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call1(Func1, Box<Node>),
    Call2(Func2, Box<Node>, Box<Node>),
}

impl Node {
    pub fn eval(&self, point: &[f64]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Arg(i) => point[*i],
            Node::Neg(inner) => -inner.eval(point),
            Node::Binary(op, a, b) => op.apply(a.eval(point), b.eval(point)),
            Node::Call1(func, a) => func.apply(a.eval(point)),
            Node::Call2(func, a, b) => func.apply(a.eval(point), b.eval(point)),
        }
    }

    fn as_const(&self) -> Option<f64> {
        match self {
            Node::Const(v) => Some(*v),
            _ => None,
        }
    }
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn bind(expr: &Expr, grid: &GridSpace, constants: &BTreeMap<String, f64>) -> Result<Node> {
    let node = match expr {
        Expr::Number(v) => Node::Const(*v),
        Expr::Ident(name) => {
            if let Ok(idx) = grid.axis_index(name) {
                Node::Arg(idx)
            } else if let Some(&v) = constants.get(name) {
                Node::Const(v)
            } else if let Some(v) = builtin_constant(name) {
                Node::Const(v)
            } else {
                return Err(HypercubeError::UnboundVariable(name.clone()));
            }
        }
        Expr::Neg(inner) => Node::Neg(Box::new(bind(inner, grid, constants)?)),
        Expr::Binary { op, left, right } => Node::Binary(
            *op,
            Box::new(bind(left, grid, constants)?),
            Box::new(bind(right, grid, constants)?),
        ),
        Expr::Call { name, args } => {
            let arity_error = |expected: usize| HypercubeError::LawCompilation {
                symbol: name.clone(),
                reason: format!("expects {expected} argument(s), got {}", args.len()),
            };
            if let Some(func) = Func1::lookup(name) {
                let [a] = args.as_slice() else {
                    return Err(arity_error(1));
                };
                Node::Call1(func, Box::new(bind(a, grid, constants)?))
            } else if let Some(func) = Func2::lookup(name) {
                let [a, b] = args.as_slice() else {
                    return Err(arity_error(2));
                };
                Node::Call2(
                    func,
                    Box::new(bind(a, grid, constants)?),
                    Box::new(bind(b, grid, constants)?),
                )
            } else {
                return Err(HypercubeError::LawCompilation {
                    symbol: name.clone(),
                    reason: "unknown function".to_string(),
                });
            }
        }
    };
    Ok(fold(node))
}

/// Collapse subtrees with no variable slots into a constant.
fn fold(node: Node) -> Node {
    let all_const = match &node {
        Node::Neg(a) | Node::Call1(_, a) => a.as_const().is_some(),
        Node::Binary(_, a, b) | Node::Call2(_, a, b) => {
            a.as_const().is_some() && b.as_const().is_some()
        }
        Node::Const(_) | Node::Arg(_) => false,
    };
    if all_const {
        Node::Const(node.eval(&[]))
    } else {
        node
    }
}
