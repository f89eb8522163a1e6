use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Expr, Span};
use crate::error::{ParseError, ParseErrorKind};
use crate::mathlib::MathContext;
use crate::registry::{OpKind, Registry};

const MAX_PARSE_DEPTH: usize = 200;

/// `a..b` with numeric endpoints, rewritten to `(a,b)` before parsing.
const RANGE_PATTERN: &str = r"([+-]?[0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)\.\.([+-]?[0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)";

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RANGE_PATTERN).expect("range pattern is a valid regex"))
}

/// Cursor over the preprocessed character stream. `map[i]` is the offset
/// of `chars[i]` in the input as the user typed it, so every span and
/// error range survives the substitutions.
struct State<'a> {
    chars: &'a [char],
    map: &'a [usize],
    ofs: usize,
    level: u32,
    depth: usize,
}

impl State<'_> {
    fn here(&self) -> (usize, usize) {
        if self.ofs < self.map.len() {
            (self.map[self.ofs], self.map[self.ofs] + 1)
        } else {
            // At end of input there is no character to cover; an empty
            // range at the end keeps slicing by the range in bounds.
            let end = self.map.last().map(|m| m + 1).unwrap_or(0);
            (end, end)
        }
    }
}

/// Substitution pass: multiplication and division glyphs become `*` and
/// `/`, and range syntax `a..b` becomes `(a,b)`. Alongside the rewritten
/// characters an offset map back to the original text is produced.
fn preprocess(input: &str) -> (Vec<char>, Vec<usize>) {
    let mut chars = Vec::with_capacity(input.len());
    let mut map = Vec::with_capacity(input.len());
    for (i, c) in input.chars().enumerate() {
        let c = match c {
            '⨯' | '×' => '*',
            '÷' => '/',
            _ => c,
        };
        chars.push(c);
        map.push(i);
    }

    let text: String = chars.iter().collect();
    if !range_regex().is_match(&text) {
        return (chars, map);
    }

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (ci, (bi, _)) in text.char_indices().enumerate() {
        byte_to_char[bi] = ci;
    }
    byte_to_char[text.len()] = chars.len();

    let mut out_chars = Vec::with_capacity(chars.len() + 2);
    let mut out_map = Vec::with_capacity(chars.len() + 2);
    let mut last = 0usize;
    for caps in range_regex().captures_iter(&text) {
        let (Some(m), Some(a), Some(b)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let m_start = byte_to_char[m.start()];
        let m_end = byte_to_char[m.end()];
        let a_end = byte_to_char[a.end()];
        let b_start = byte_to_char[b.start()];
        for i in last..m_start {
            out_chars.push(chars[i]);
            out_map.push(map[i]);
        }
        out_chars.push('(');
        out_map.push(map[m_start]);
        for i in m_start..a_end {
            out_chars.push(chars[i]);
            out_map.push(map[i]);
        }
        out_chars.push(',');
        out_map.push(map[a_end]);
        for i in b_start..m_end {
            out_chars.push(chars[i]);
            out_map.push(map[i]);
        }
        out_chars.push(')');
        out_map.push(map[m_end - 1]);
        last = m_end;
    }
    for i in last..chars.len() {
        out_chars.push(chars[i]);
        out_map.push(map[i]);
    }
    (out_chars, out_map)
}

/// Precedence-climbing parser driven entirely by the registry: which
/// character sequences are operators, and in which positions they are
/// legal, is decided by lookup rather than by the grammar.
pub struct Parser<'a> {
    registry: &'a Registry,
    math: &'a MathContext,
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a Registry, math: &'a MathContext) -> Self {
        Self { registry, math }
    }

    pub fn parse(&self, input: &str) -> Result<Expr, ParseError> {
        let (chars, map) = preprocess(input);
        let mut st = State {
            chars: &chars,
            map: &map,
            ofs: 0,
            level: 0,
            depth: 0,
        };
        let expr = self.parse_expr(&mut st, None)?;
        while st.ofs < st.chars.len() && st.chars[st.ofs] == ' ' {
            st.ofs += 1;
        }
        if st.ofs < st.chars.len() {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected character '{}'", st.chars[st.ofs]),
                st.here(),
            ));
        }
        Ok(expr)
    }

    fn parse_expr(&self, st: &mut State<'_>, min_prec: Option<u32>) -> Result<Expr, ParseError> {
        if st.depth >= MAX_PARSE_DEPTH {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                "expression too deeply nested",
                st.here(),
            ));
        }
        st.depth += 1;
        let result = self.parse_expr_inner(st, min_prec);
        st.depth -= 1;
        result
    }

    fn parse_expr_inner(
        &self,
        st: &mut State<'_>,
        min_prec: Option<u32>,
    ) -> Result<Expr, ParseError> {
        let mut left: Option<Expr> = None;
        while st.ofs < st.chars.len() {
            let c = st.chars[st.ofs];
            if c == ' ' {
                st.ofs += 1;
                continue;
            }
            if c == '(' {
                if left.is_some() {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "left parenthesis unexpected",
                        st.here(),
                    ));
                }
                left = Some(self.parse_group(st)?);
                continue;
            }
            if c == ')' || c == ',' {
                // Sub-expressions and parenthesized groups stop here
                // without consuming; the group parser owns the close.
                if min_prec.is_some() || st.level > 0 {
                    return left.ok_or_else(|| {
                        ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            format!("expression expected before '{}'", c),
                            st.here(),
                        )
                    });
                }
                let (kind, msg) = if c == ')' {
                    (
                        ParseErrorKind::UnmatchedParenthesis,
                        "right parenthesis unexpected",
                    )
                } else {
                    (ParseErrorKind::UnexpectedToken, "comma unexpected")
                };
                return Err(ParseError::new(kind, msg, st.here()));
            }
            if c.is_ascii_digit() || c == '.' || c == self.math.fraction_sep() {
                if left.is_some() {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "operator expected",
                        st.here(),
                    ));
                }
                left = Some(self.parse_number(st)?);
                continue;
            }
            if self.registry.is_op_start_char(c) {
                let op_start = st.ofs;
                let has_left = left.is_some();
                let Some((sym, kind, prec)) = self.scan_operator(st, has_left) else {
                    let mut end = st.ofs + 1;
                    while end < st.chars.len() && self.registry.is_op_char(st.chars[end]) {
                        end += 1;
                    }
                    let text: String = st.chars[st.ofs..end].iter().collect();
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidOperator,
                        format!("'{}' is not a valid operator here", text),
                        (st.map[st.ofs], st.map[end - 1] + 1),
                    ));
                };
                match (kind, left.take()) {
                    (OpKind::Prefix, _) => {
                        let operand = self.parse_expr(st, Some(prec))?;
                        let span = Span::new(st.map[op_start], operand.span().end);
                        left = Some(Expr::Unary {
                            op: sym,
                            postfix: false,
                            operand: Box::new(operand),
                            span,
                        });
                    }
                    (OpKind::Postfix, Some(lhs)) => {
                        let span = Span::new(lhs.span().start, st.map[st.ofs - 1] + 1);
                        left = Some(Expr::Unary {
                            op: sym,
                            postfix: true,
                            operand: Box::new(lhs),
                            span,
                        });
                    }
                    (OpKind::Infix | OpKind::Compare, Some(lhs)) => {
                        // Equal precedence stops the climb, so chains of
                        // one level associate to the left.
                        if let Some(mp) = min_prec {
                            if prec <= mp {
                                st.ofs = op_start;
                                return Ok(lhs);
                            }
                        }
                        let rhs = self.parse_expr(st, Some(prec))?;
                        let span = Span::new(lhs.span().start, rhs.span().end);
                        left = Some(if kind == OpKind::Compare {
                            Expr::Comparison {
                                op: sym,
                                left: Box::new(lhs),
                                right: Box::new(rhs),
                                span,
                            }
                        } else {
                            Expr::Binary {
                                op: sym,
                                left: Box::new(lhs),
                                right: Box::new(rhs),
                                span,
                            }
                        });
                    }
                    (_, None) => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            format!("operator '{}' not expected here", sym),
                            (st.map[op_start], st.map[st.ofs - 1] + 1),
                        ));
                    }
                }
                continue;
            }
            if c.is_ascii_alphabetic() || c == '_' {
                if left.is_some() {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "operator expected",
                        st.here(),
                    ));
                }
                left = Some(self.parse_var_func(st)?);
                continue;
            }
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected character '{}'", c),
                st.here(),
            ));
        }
        left.ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnexpectedToken,
                "number or variable expected",
                st.here(),
            )
        })
    }

    /// Greedy operator scan with shrink-back: accumulate operator
    /// characters, then drop characters from the right until the symbol
    /// is registered and legal in the current position.
    fn scan_operator(&self, st: &mut State<'_>, has_left: bool) -> Option<(String, OpKind, u32)> {
        let mut end = st.ofs;
        while end < st.chars.len() && self.registry.is_op_char(st.chars[end]) {
            end += 1;
        }
        while end > st.ofs {
            let sym: String = st.chars[st.ofs..end].iter().collect();
            if let Some(op) = self.registry.find_operator(&sym, has_left) {
                let found = (sym, op.kind, op.precedence);
                st.ofs = end;
                return Some(found);
            }
            end -= 1;
        }
        None
    }

    fn parse_number(&self, st: &mut State<'_>) -> Result<Expr, ParseError> {
        let start = st.ofs;
        let sep = self.math.fraction_sep();
        let mut seen_digit = false;
        let mut seen_sep = false;
        let mut seen_exp = false;
        while st.ofs < st.chars.len() {
            let c = st.chars[st.ofs];
            if c.is_ascii_digit() {
                seen_digit = true;
                st.ofs += 1;
            } else if (c == '.' || c == sep) && !seen_sep && !seen_exp {
                seen_sep = true;
                st.ofs += 1;
            } else if (c == 'e' || c == 'E') && seen_digit && !seen_exp {
                // Only an exponent when digits follow; a bare trailing
                // 'e' belongs to whatever comes next.
                let mut k = st.ofs + 1;
                if k < st.chars.len() && (st.chars[k] == '+' || st.chars[k] == '-') {
                    k += 1;
                }
                if k < st.chars.len() && st.chars[k].is_ascii_digit() {
                    seen_exp = true;
                    st.ofs = k + 1;
                    while st.ofs < st.chars.len() && st.chars[st.ofs].is_ascii_digit() {
                        st.ofs += 1;
                    }
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        let text: String = st.chars[start..st.ofs].iter().collect();
        let span = Span::new(st.map[start], st.map[st.ofs - 1] + 1);
        match self.math.parse_number(&text) {
            Some(value) => Ok(Expr::Number { value, span }),
            None => Err(ParseError::new(
                ParseErrorKind::InvalidNumber,
                format!("'{}' is not a valid number", text),
                span.range(),
            )),
        }
    }

    /// Parenthesized group. One element collapses to the inner
    /// expression; two or more become a tuple.
    fn parse_group(&self, st: &mut State<'_>) -> Result<Expr, ParseError> {
        let open = st.ofs;
        st.ofs += 1;
        st.level += 1;
        let mut elements = vec![self.parse_expr(st, None)?];
        loop {
            if st.ofs >= st.chars.len() {
                return Err(ParseError::new(
                    ParseErrorKind::UnmatchedParenthesis,
                    "right parenthesis expected",
                    (st.map[open], st.map[open] + 1),
                ));
            }
            match st.chars[st.ofs] {
                ',' => {
                    st.ofs += 1;
                    elements.push(self.parse_expr(st, None)?);
                }
                ')' => {
                    st.ofs += 1;
                    st.level -= 1;
                    break;
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        "right parenthesis expected",
                        st.here(),
                    ));
                }
            }
        }
        if elements.len() == 1 {
            if let Some(e) = elements.pop() {
                return Ok(e);
            }
        }
        let span = Span::new(st.map[open], st.map[st.ofs - 1] + 1);
        Ok(Expr::Tuple { elements, span })
    }

    /// An identifier, or a function call when a `(` follows. Identifier
    /// characters are letters, digits, underscore and space; trailing
    /// spaces are given back to the stream.
    fn parse_var_func(&self, st: &mut State<'_>) -> Result<Expr, ParseError> {
        let start = st.ofs;
        while st.ofs < st.chars.len() {
            let c = st.chars[st.ofs];
            if c.is_ascii_alphanumeric() || c == '_' || c == ' ' {
                st.ofs += 1;
            } else {
                break;
            }
        }
        let mut name_end = st.ofs;
        while name_end > start && st.chars[name_end - 1] == ' ' {
            name_end -= 1;
        }
        let name: String = st.chars[start..name_end].iter().collect();

        if st.ofs < st.chars.len() && st.chars[st.ofs] == '(' {
            return self.parse_call(st, name, start);
        }

        st.ofs = name_end;
        Ok(Expr::Identifier {
            name,
            span: Span::new(st.map[start], st.map[name_end - 1] + 1),
        })
    }

    fn parse_call(
        &self,
        st: &mut State<'_>,
        name: String,
        name_start: usize,
    ) -> Result<Expr, ParseError> {
        let open = st.ofs;
        st.ofs += 1;
        let body_start = st.ofs;
        let mut pcount = 1u32;
        let mut commas = Vec::new();
        while st.ofs < st.chars.len() && pcount > 0 {
            match st.chars[st.ofs] {
                '(' => pcount += 1,
                ')' => pcount -= 1,
                ',' if pcount == 1 => commas.push(st.ofs),
                _ => {}
            }
            st.ofs += 1;
        }
        if pcount > 0 {
            return Err(ParseError::new(
                ParseErrorKind::UnmatchedParenthesis,
                "right parenthesis expected",
                (st.map[open], st.map[open] + 1),
            ));
        }
        let close = st.ofs - 1;

        let mut pieces = Vec::new();
        let mut piece_start = body_start;
        for &comma in &commas {
            pieces.push((piece_start, comma));
            piece_start = comma + 1;
        }
        pieces.push((piece_start, close));

        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        for (raw_a, raw_b) in pieces {
            let mut a = raw_a;
            let mut b = raw_b;
            while a < b && st.chars[a] == ' ' {
                a += 1;
            }
            while b > a && st.chars[b - 1] == ' ' {
                b -= 1;
            }
            if a == b {
                if commas.is_empty() {
                    // `f()` has no arguments at all.
                    break;
                }
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedToken,
                    "argument expected",
                    (st.map[raw_a.min(st.map.len() - 1)], st.map[raw_a.min(st.map.len() - 1)] + 1),
                ));
            }
            match self.keyword_split(st, a, b) {
                Some((key, value_start)) => {
                    let value = self.parse_slice(st, value_start, b)?;
                    kwargs.push((key, value));
                }
                None => args.push(self.parse_slice(st, a, b)?),
            }
        }

        Ok(Expr::FunctionCall {
            name,
            args,
            kwargs,
            span: Span::new(st.map[name_start], st.map[close] + 1),
        })
    }

    /// Detect `name=expr` inside a call argument: a top-level `=` whose
    /// left side is a bare identifier. `!=` never splits.
    fn keyword_split(&self, st: &State<'_>, a: usize, b: usize) -> Option<(String, usize)> {
        let mut pcount = 0u32;
        for i in a..b {
            match st.chars[i] {
                '(' => pcount += 1,
                ')' => pcount = pcount.saturating_sub(1),
                '=' if pcount == 0 => {
                    if i > a && st.chars[i - 1] == '!' {
                        return None;
                    }
                    let lhs: String = st.chars[a..i].iter().collect();
                    let lhs = lhs.trim();
                    if !lhs.is_empty()
                        && lhs
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_')
                        && lhs.chars().next().is_some_and(|c| !c.is_ascii_digit())
                    {
                        return Some((lhs.to_string(), i + 1));
                    }
                    return None;
                }
                _ => {}
            }
        }
        None
    }

    /// Parse a sub-range of the stream in isolation; spans still map to
    /// the original input.
    fn parse_slice(&self, st: &State<'_>, a: usize, b: usize) -> Result<Expr, ParseError> {
        let mut sub = State {
            chars: &st.chars[a..b],
            map: &st.map[a..b],
            ofs: 0,
            level: 0,
            depth: st.depth,
        };
        self.parse_expr(&mut sub, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OpKind, Registry};
    use crate::value::{self, Value};
    use std::sync::Arc;

    fn test_registry() -> Registry {
        let mut reg = Registry::new();
        let binary_ops: &[(&str, u32)] = &[
            ("+", 0),
            ("-", 0),
            ("*", 1),
            ("/", 1),
            ("^", 2),
            ("**", 2),
            ("%", 2),
        ];
        for &(sym, prec) in binary_ops {
            reg.register_operator(
                sym,
                OpKind::Infix,
                prec,
                Arc::new(|_, args| Ok(args[0].clone())),
            );
        }
        reg.register_operator(
            "-",
            OpKind::Prefix,
            2,
            Arc::new(|_, args| value::negate(&args[0])),
        );
        reg.register_operator(
            "!",
            OpKind::Postfix,
            0,
            Arc::new(|_, args| value::factorial(&args[0])),
        );
        for sym in ["=", "!=", "<", ">"] {
            reg.register_operator(
                sym,
                OpKind::Compare,
                0,
                Arc::new(|_, args| value::loose_eq(&args[0], &args[1]).map(Value::Boolean)),
            );
        }
        reg
    }

    fn parse(input: &str) -> Result<Expr, ParseError> {
        let reg = test_registry();
        let math = MathContext::default();
        Parser::new(&reg, &math).parse(input)
    }

    fn binary_op(e: &Expr) -> &str {
        match e {
            Expr::Binary { op, .. } => op,
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = parse("2+3*4").unwrap();
        let Expr::Binary { op, right, .. } = &e else {
            panic!("expected binary: {:?}", e);
        };
        assert_eq!(op, "+");
        assert_eq!(binary_op(right), "*");
    }

    #[test]
    fn parentheses_override_precedence() {
        let e = parse("(2+3)*4").unwrap();
        let Expr::Binary { op, left, .. } = &e else {
            panic!("expected binary: {:?}", e);
        };
        assert_eq!(op, "*");
        assert_eq!(binary_op(left), "+");
    }

    #[test]
    fn equal_precedence_chains_associate_left() {
        let e = parse("2^3^2").unwrap();
        let Expr::Binary { left, right, .. } = &e else {
            panic!("expected binary: {:?}", e);
        };
        assert_eq!(binary_op(left), "^");
        assert!(matches!(**right, Expr::Number { .. }));
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        let e = parse("-2^2").unwrap();
        let Expr::Binary { op, left, .. } = &e else {
            panic!("expected binary: {:?}", e);
        };
        assert_eq!(op, "^");
        assert!(matches!(**left, Expr::Unary { postfix: false, .. }));
    }

    #[test]
    fn postfix_factorial() {
        let e = parse("5!").unwrap();
        assert!(matches!(e, Expr::Unary { postfix: true, .. }));
        assert_eq!(e.span().range(), (0, 2));
    }

    #[test]
    fn multiplication_glyphs_keep_original_offsets() {
        let e = parse("5×3").unwrap();
        let Expr::Binary { op, .. } = &e else {
            panic!("expected binary: {:?}", e);
        };
        assert_eq!(op, "*");
        assert_eq!(e.span().range(), (0, 3));
    }

    #[test]
    fn range_syntax_becomes_a_tuple_with_original_span() {
        let e = parse("0..2").unwrap();
        let Expr::Tuple { elements, span } = &e else {
            panic!("expected tuple: {:?}", e);
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(span.range(), (0, 4));
    }

    #[test]
    fn identifiers_may_contain_spaces() {
        let e = parse("my value").unwrap();
        let Expr::Identifier { name, span } = &e else {
            panic!("expected identifier: {:?}", e);
        };
        assert_eq!(name, "my value");
        assert_eq!(span.range(), (0, 8));
    }

    #[test]
    fn function_call_with_keyword_arguments() {
        let e = parse("plot(x^2, x=0..2)").unwrap();
        let Expr::FunctionCall {
            name, args, kwargs, ..
        } = &e
        else {
            panic!("expected call: {:?}", e);
        };
        assert_eq!(name, "plot");
        assert_eq!(args.len(), 1);
        assert_eq!(kwargs.len(), 1);
        assert_eq!(kwargs[0].0, "x");
        assert!(matches!(kwargs[0].1, Expr::Tuple { .. }));
    }

    #[test]
    fn nested_calls_split_arguments_at_the_right_level() {
        let e = parse("gcd(mod(10, 4), 6)").unwrap();
        let Expr::FunctionCall { name, args, .. } = &e else {
            panic!("expected call: {:?}", e);
        };
        assert_eq!(name, "gcd");
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0], Expr::FunctionCall { .. }));
    }

    #[test]
    fn unmatched_parenthesis_points_at_the_opener() {
        let err = parse("sin(1+2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnmatchedParenthesis);
        assert_eq!(err.range, (3, 4));

        let err = parse("(1+2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnmatchedParenthesis);
        assert_eq!(err.range, (0, 1));
    }

    #[test]
    fn trailing_operand_after_operand_is_rejected() {
        let err = parse("1+2 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
        assert_eq!(err.range, (4, 5));
    }

    #[test]
    fn dangling_operator_is_rejected() {
        let err = parse("1+*2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidOperator);
        assert_eq!(err.range, (2, 3));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn end_of_input_errors_stay_within_bounds() {
        let input = "1+";
        let err = parse(input).unwrap_err();
        assert_eq!(err.range, (2, 2));
        assert!(err.range.1 <= input.chars().count());
        assert_eq!(parse("").unwrap_err().range, (0, 0));
    }

    #[test]
    fn comparison_nodes() {
        let e = parse("1+1=2").unwrap();
        assert!(matches!(e, Expr::Comparison { .. }));
        let e = parse("3!=4").unwrap();
        let Expr::Comparison { op, .. } = &e else {
            panic!("expected comparison: {:?}", e);
        };
        assert_eq!(op, "!=");
    }

    #[test]
    fn scientific_literals_and_bare_e_suffix() {
        let e = parse("1.5e3").unwrap();
        assert!(matches!(e, Expr::Number { .. }));
        // A trailing 'e' with no digits starts an identifier instead.
        let err = parse("2e").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
    }
}
