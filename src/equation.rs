use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use crate::value::Value;

/// One entry of a calculation history: an optional label, the expression
/// text as typed, and the value it produced. Round-trips through a single
/// semicolon-delimited line.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub label: String,
    pub text: String,
    pub result: Value,
}

impl Equation {
    pub fn new(label: impl Into<String>, text: impl Into<String>, result: Value) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            result,
        }
    }

    /// Serialize as `label;text;result`. Semicolons, backslashes and
    /// newlines inside the fields are escaped so embedded delimiters
    /// cannot break the framing.
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{}",
            escape(&self.label),
            escape(&self.text),
            escape(&self.result.to_string())
        )
    }

    /// Parse one line produced by [`to_line`](Self::to_line). Results that
    /// read back as numerals (including `n/d` rationals) become numbers
    /// again; `true`, `false` and `undefined` keep their kinds; anything
    /// else is text.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields = split_fields(line);
        let [label, text, result] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            label: label.clone(),
            text: text.clone(),
            result: parse_result(result),
        })
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => push_last(&mut fields, '\n'),
                Some(other) => push_last(&mut fields, other),
                None => {}
            },
            ';' => fields.push(String::new()),
            _ => push_last(&mut fields, c),
        }
    }
    fields
}

fn push_last(fields: &mut [String], c: char) {
    if let Some(last) = fields.last_mut() {
        last.push(c);
    }
}

fn parse_result(text: &str) -> Value {
    match text {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "undefined" => return Value::Undefined,
        _ => {}
    }
    if let Some((numer, denom)) = text.split_once('/') {
        if let (Ok(n), Ok(d)) = (numer.parse::<BigInt>(), denom.parse::<BigInt>()) {
            if !d.is_zero() {
                return Value::Rational(BigRational::new(n, d));
            }
        }
    }
    if let Ok(d) = text.parse::<BigDecimal>() {
        let v = Value::Decimal(d);
        return match v.to_bigint() {
            Some(n) => Value::Integer(n),
            None => v,
        };
    }
    Value::Text(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_kinds() {
        for result in [
            Value::integer(42),
            Value::Boolean(true),
            Value::Undefined,
            Value::Text("2 * 2 * 3".to_string()),
        ] {
            let eqn = Equation::new("ans", "6+6", result);
            assert_eq!(Equation::from_line(&eqn.to_line()), Some(eqn));
        }
    }

    #[test]
    fn rational_results_survive() {
        let eqn = Equation::new("half", "1/2", Value::Rational(BigRational::new(1.into(), 2.into())));
        assert_eq!(Equation::from_line(&eqn.to_line()), Some(eqn));
    }

    #[test]
    fn semicolon_in_the_label_does_not_break_framing() {
        let eqn = Equation::new("a;b", "1+1", Value::integer(2));
        let line = eqn.to_line();
        assert_eq!(Equation::from_line(&line), Some(eqn));
    }

    #[test]
    fn backslashes_and_newlines_are_escaped() {
        let eqn = Equation::new("x\\y", "line\nbreak", Value::integer(0));
        let line = eqn.to_line();
        assert!(!line.contains('\n'));
        assert_eq!(Equation::from_line(&line), Some(eqn));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(Equation::from_line("only;two"), None);
        assert_eq!(Equation::from_line(""), None);
    }
}
