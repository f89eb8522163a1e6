use std::cmp::Ordering;
use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

/// A single value in the numeric tower.
///
/// Arithmetic keeps exact representations for as long as possible: integers
/// stay integers, an integer quotient becomes a `Rational`, and only results
/// that cannot be represented exactly (or that started from a decimal
/// literal) become `Decimal`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(BigInt),
    Rational(BigRational),
    Decimal(BigDecimal),
    Text(String),
    Undefined,
    Symbolic,
}

/// A pair of operands brought to their least specific common representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Integers(BigInt, BigInt),
    Rationals(BigRational, BigRational),
    Decimals(BigDecimal, BigDecimal),
}

impl Value {
    pub fn integer(n: i64) -> Self {
        Value::Integer(BigInt::from(n))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether the value denotes an integral number. A `Decimal` with a
    /// non-negative normalized exponent and a `Rational` with denominator 1
    /// both count.
    pub fn is_integer(&self) -> bool {
        match self {
            Value::Integer(_) => true,
            Value::Rational(r) => r.is_integer(),
            Value::Decimal(d) => decimal_is_integer(d),
            _ => false,
        }
    }

    /// The value as a `BigInt`, when it is integral.
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Integer(n) => Some(n.clone()),
            Value::Rational(r) if r.is_integer() => Some(r.to_integer()),
            Value::Decimal(d) if decimal_is_integer(d) => {
                Some(d.normalized().with_scale(0).as_bigint_and_exponent().0)
            }
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(n) => n.to_f64(),
            Value::Rational(r) => r.to_f64(),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Boolean(b) => Some(BigDecimal::from(u8::from(*b))),
            Value::Integer(n) => Some(BigDecimal::from(n.clone())),
            Value::Rational(r) => {
                Some(BigDecimal::from(r.numer().clone()) / BigDecimal::from(r.denom().clone()))
            }
            Value::Decimal(d) => Some(d.clone()),
            _ => None,
        }
    }

    /// Truthiness used by the logical operators: zero, `false` and empty
    /// text are false, everything defined is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(n) => !n.is_zero(),
            Value::Rational(r) => !r.is_zero(),
            Value::Decimal(d) => !d.is_zero(),
            Value::Text(s) => !s.is_empty(),
            Value::Undefined | Value::Symbolic => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Rational(r) if r.is_integer() => write!(f, "{}", r.to_integer()),
            Value::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Value::Decimal(d) => write!(f, "{}", d.normalized()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Undefined => write!(f, "undefined"),
            Value::Symbolic => write!(f, "symbolic"),
        }
    }
}

fn decimal_is_integer(d: &BigDecimal) -> bool {
    if d.is_zero() {
        return true;
    }
    let (_, scale) = d.normalized().as_bigint_and_exponent();
    scale <= 0
}

/// Turn an `f64` into a `Decimal` value, rejecting NaN and infinities.
pub fn decimal_from_f64(x: f64) -> Result<Value, String> {
    if !x.is_finite() {
        return Err("result undefined".to_string());
    }
    let d: BigDecimal = format!("{:e}", x)
        .parse()
        .map_err(|_| "result undefined".to_string())?;
    Ok(Value::Decimal(d.normalized()))
}

/// Reduce a rational back to an integer when the denominator is 1.
fn rational_or_integer(r: BigRational) -> Value {
    if r.is_integer() {
        Value::Integer(r.to_integer())
    } else {
        Value::Rational(r)
    }
}

/// Pick the least specific common representation for `a` and `b` so that no
/// precision is silently lost: any `Decimal` forces both to `Decimal`, any
/// `Rational` forces both to `Rational`, otherwise both stay `Integer`.
/// Booleans participate as 0/1.
pub fn coerce_pair(a: &Value, b: &Value) -> Result<Coerced, String> {
    fn as_int(v: &Value) -> Option<BigInt> {
        match v {
            Value::Boolean(x) => Some(BigInt::from(u8::from(*x))),
            Value::Integer(n) => Some(n.clone()),
            _ => None,
        }
    }

    let numeric = |v: &Value| {
        matches!(
            v,
            Value::Boolean(_) | Value::Integer(_) | Value::Rational(_) | Value::Decimal(_)
        )
    };
    if !numeric(a) || !numeric(b) {
        return Err("expected a number".to_string());
    }

    if matches!(a, Value::Decimal(_)) || matches!(b, Value::Decimal(_)) {
        let da = a.to_decimal().ok_or("expected a number")?;
        let db = b.to_decimal().ok_or("expected a number")?;
        return Ok(Coerced::Decimals(da, db));
    }

    if matches!(a, Value::Rational(_)) || matches!(b, Value::Rational(_)) {
        let to_rat = |v: &Value| match v {
            Value::Rational(r) => Some(r.clone()),
            _ => as_int(v).map(BigRational::from),
        };
        let ra = to_rat(a).ok_or("expected a number")?;
        let rb = to_rat(b).ok_or("expected a number")?;
        return Ok(Coerced::Rationals(ra, rb));
    }

    let ia = as_int(a).ok_or("expected a number")?;
    let ib = as_int(b).ok_or("expected a number")?;
    Ok(Coerced::Integers(ia, ib))
}

macro_rules! propagate_undefined {
    ($($v:expr),+) => {
        $(
            if $v.is_undefined() {
                return Ok(Value::Undefined);
            }
        )+
    };
}

pub fn add(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    match coerce_pair(a, b)? {
        Coerced::Integers(x, y) => Ok(Value::Integer(x + y)),
        Coerced::Rationals(x, y) => Ok(rational_or_integer(x + y)),
        Coerced::Decimals(x, y) => Ok(Value::Decimal(x + y)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    match coerce_pair(a, b)? {
        Coerced::Integers(x, y) => Ok(Value::Integer(x - y)),
        Coerced::Rationals(x, y) => Ok(rational_or_integer(x - y)),
        Coerced::Decimals(x, y) => Ok(Value::Decimal(x - y)),
    }
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    match coerce_pair(a, b)? {
        Coerced::Integers(x, y) => Ok(Value::Integer(x * y)),
        Coerced::Rationals(x, y) => Ok(rational_or_integer(x * y)),
        Coerced::Decimals(x, y) => Ok(Value::Decimal(x * y)),
    }
}

/// Division. Two exact integers produce an exact `Rational` (reduced to an
/// `Integer` when it divides evenly); a zero divisor is a domain error.
pub fn div(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    match coerce_pair(a, b)? {
        Coerced::Integers(x, y) => {
            if y.is_zero() {
                Err("can not divide by zero".to_string())
            } else {
                Ok(rational_or_integer(BigRational::new(x, y)))
            }
        }
        Coerced::Rationals(x, y) => {
            if y.is_zero() {
                Err("can not divide by zero".to_string())
            } else {
                Ok(rational_or_integer(x / y))
            }
        }
        Coerced::Decimals(x, y) => {
            if y.is_zero() {
                Err("can not divide by zero".to_string())
            } else {
                Ok(Value::Decimal(x / y))
            }
        }
    }
}

pub fn negate(a: &Value) -> Result<Value, String> {
    propagate_undefined!(a);
    match a {
        Value::Boolean(b) => Ok(Value::integer(-i64::from(*b))),
        Value::Integer(n) => Ok(Value::Integer(-n)),
        Value::Rational(r) => Ok(Value::Rational(-r)),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        _ => Err("expected a number".to_string()),
    }
}

const MAX_POW_EXPONENT: i64 = 100_000;

/// Exponentiation. Integral exponents stay exact (a negative exponent on an
/// integer base yields a `Rational`); fractional exponents go through `f64`
/// and come back as `Decimal`.
pub fn pow(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    if b.is_integer() {
        let e = b
            .to_bigint()
            .and_then(|n| n.to_i64())
            .filter(|e| e.abs() <= MAX_POW_EXPONENT)
            .ok_or("exponent too large")?;
        return pow_integral(a, e);
    }

    let x = a.to_f64().ok_or("expected a number")?;
    let y = b.to_f64().ok_or("expected a number")?;
    decimal_from_f64(x.powf(y))
}

fn pow_integral(a: &Value, e: i64) -> Result<Value, String> {
    match a {
        Value::Boolean(_) | Value::Integer(_) => {
            let base = match a {
                Value::Boolean(b) => BigInt::from(u8::from(*b)),
                Value::Integer(n) => n.clone(),
                _ => unreachable!(),
            };
            if e >= 0 {
                Ok(Value::Integer(Pow::pow(&base, e as u64)))
            } else if base.is_zero() {
                Err("can not divide by zero".to_string())
            } else {
                let mag = Pow::pow(&base, (-e) as u64);
                Ok(rational_or_integer(BigRational::new(BigInt::from(1), mag)))
            }
        }
        Value::Rational(r) => {
            if r.is_zero() && e < 0 {
                return Err("can not divide by zero".to_string());
            }
            let e = i32::try_from(e).map_err(|_| "exponent too large".to_string())?;
            Ok(rational_or_integer(Pow::pow(r.clone(), e)))
        }
        Value::Decimal(d) => {
            if d.is_zero() && e < 0 {
                return Err("can not divide by zero".to_string());
            }
            let mut acc = BigDecimal::from(1);
            let mut base = d.clone();
            let mut n = e.unsigned_abs();
            while n > 0 {
                if n & 1 == 1 {
                    acc = &acc * &base;
                }
                base = &base * &base;
                n >>= 1;
            }
            if e < 0 {
                acc = BigDecimal::from(1) / acc;
            }
            Ok(Value::Decimal(acc))
        }
        _ => Err("expected a number".to_string()),
    }
}

/// Floor modulus; the modulus must be integral.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    if !b.is_integer() {
        return Err("can only calculate x modulo <integer>".to_string());
    }
    let x = a
        .to_bigint()
        .ok_or("can only calculate <integer> modulo <integer>")?;
    let y = b.to_bigint().ok_or("expected a number")?;
    if y.is_zero() {
        return Err("can not divide by zero".to_string());
    }
    Ok(Value::Integer(((&x % &y) + &y) % &y))
}

const MAX_SHIFT: u64 = 1_000_000;

pub fn shift_left(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    let (x, y) = shift_operands(a, b)?;
    Ok(Value::Integer(x << y))
}

pub fn shift_right(a: &Value, b: &Value) -> Result<Value, String> {
    propagate_undefined!(a, b);
    let (x, y) = shift_operands(a, b)?;
    Ok(Value::Integer(x >> y))
}

fn shift_operands(a: &Value, b: &Value) -> Result<(BigInt, u64), String> {
    let msg = "bitwise operations only apply to integers";
    let x = a.to_bigint().ok_or(msg)?;
    let y = b
        .to_bigint()
        .and_then(|n| n.to_u64())
        .filter(|&n| n <= MAX_SHIFT)
        .ok_or("invalid shift amount")?;
    Ok((x, y))
}

const MAX_FACTORIAL: u64 = 100_000;

/// Factorial of a non-negative integer.
pub fn factorial(a: &Value) -> Result<Value, String> {
    propagate_undefined!(a);
    let n = a
        .to_bigint()
        .filter(|n| !n.is_negative())
        .ok_or("factorial only defined for integers >= 0")?;
    let n = n.to_u64().filter(|&n| n <= MAX_FACTORIAL).ok_or(
        "factorial argument too large",
    )?;
    let mut res = BigInt::from(1);
    for i in 2..=n {
        res *= i;
    }
    Ok(Value::Integer(res))
}

/// Numeric ordering after coercion.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, String> {
    match coerce_pair(a, b)? {
        Coerced::Integers(x, y) => Ok(x.cmp(&y)),
        Coerced::Rationals(x, y) => Ok(x.cmp(&y)),
        Coerced::Decimals(x, y) => x
            .partial_cmp(&y)
            .ok_or_else(|| "values are not comparable".to_string()),
    }
}

/// Equality across kinds: text compares as text, booleans as booleans,
/// numbers after coercion.
pub fn loose_eq(a: &Value, b: &Value) -> Result<bool, String> {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Ok(x == y),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x == y),
        (Value::Undefined, Value::Undefined) => Ok(true),
        _ => Ok(compare(a, b)? == Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn int(n: i64) -> Value {
        Value::integer(n)
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn integer_division_stays_exact() {
        let q = div(&int(7), &int(2)).unwrap();
        assert_eq!(
            q,
            Value::Rational(BigRational::new(BigInt::from(7), BigInt::from(2)))
        );
        // An even quotient reduces back to an integer.
        assert_eq!(div(&int(4), &int(2)).unwrap(), int(2));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(div(&int(1), &int(0)).is_err());
        assert!(div(&dec("1.5"), &dec("0.0")).is_err());
    }

    #[test]
    fn decimal_coercion_wins() {
        match coerce_pair(&int(3), &dec("0.5")).unwrap() {
            Coerced::Decimals(a, b) => {
                assert_eq!(a, BigDecimal::from(3));
                assert_eq!(b, BigDecimal::from_str("0.5").unwrap());
            }
            other => panic!("expected decimals, got {:?}", other),
        }
    }

    #[test]
    fn rational_arithmetic_reduces() {
        let half = div(&int(1), &int(2)).unwrap();
        let sum = add(&half, &half).unwrap();
        assert_eq!(sum, int(1));
    }

    #[test]
    fn integer_power_is_exact() {
        assert_eq!(pow(&int(2), &int(10)).unwrap(), int(1024));
        assert_eq!(
            pow(&int(2), &int(-2)).unwrap(),
            Value::Rational(BigRational::new(BigInt::from(1), BigInt::from(4)))
        );
    }

    #[test]
    fn fractional_power_goes_decimal() {
        let r = pow(&int(2), &dec("0.5")).unwrap();
        let x = r.to_f64().unwrap();
        assert!((x - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(matches!(r, Value::Decimal(_)));
    }

    #[test]
    fn undefined_propagates_through_arithmetic() {
        assert_eq!(add(&Value::Undefined, &int(1)).unwrap(), Value::Undefined);
        assert_eq!(mul(&int(3), &Value::Undefined).unwrap(), Value::Undefined);
    }

    #[test]
    fn is_integer_covers_the_tower() {
        assert!(int(5).is_integer());
        assert!(dec("1e3").is_integer());
        assert!(dec("10.0").is_integer());
        assert!(!dec("0.5").is_integer());
        assert!(Value::Rational(BigRational::new(BigInt::from(4), BigInt::from(2))).is_integer());
    }

    #[test]
    fn factorial_requires_non_negative_integers() {
        assert_eq!(factorial(&int(5)).unwrap(), int(120));
        assert_eq!(factorial(&int(0)).unwrap(), int(1));
        assert!(factorial(&int(-1)).is_err());
        assert!(factorial(&dec("1.5")).is_err());
    }

    #[test]
    fn comparison_coerces() {
        let half = div(&int(1), &int(2)).unwrap();
        assert!(loose_eq(&half, &dec("0.5")).unwrap());
        assert_eq!(compare(&int(2), &dec("1.5")).unwrap(), Ordering::Greater);
    }

    #[test]
    fn modulo_is_floor_style() {
        assert_eq!(modulo(&int(7), &int(3)).unwrap(), int(1));
        assert_eq!(modulo(&int(-7), &int(3)).unwrap(), int(2));
        assert!(modulo(&int(7), &dec("1.5")).is_err());
    }
}
