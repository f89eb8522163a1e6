pub mod evaluator;
pub mod parser;

/// Half-open character range into the input as the user typed it, before
/// any glyph or range-syntax substitution. Error highlights are built
/// from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Parsed expression tree. Operators are carried by symbol, not resolved
/// to implementations; the evaluator looks them up in the registry so the
/// tree stays independent of any particular operator table.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number {
        value: crate::value::Value,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Unary {
        op: String,
        postfix: bool,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Comparison {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        span: Span,
    },
    /// Parenthesized, comma-separated group with two or more elements,
    /// e.g. a plot range `(0,2)`. Single-element groups collapse to the
    /// inner expression.
    Tuple {
        elements: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Comparison { span, .. }
            | Expr::FunctionCall { span, .. }
            | Expr::Tuple { span, .. } => *span,
        }
    }
}
