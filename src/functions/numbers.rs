use std::sync::Arc;

use bigdecimal::RoundingMode;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rand::Rng;

use crate::registry::Registry;
use crate::value::{self, decimal_from_f64, Value};

pub fn register(registry: &mut Registry) {
    registry.register_function("exp", 1, Arc::new(|ctx, a| ctx.math.exp(&a[0])));
    registry.register_function("ln", 1, Arc::new(|ctx, a| ctx.math.ln(&a[0])));
    registry.register_function("log10", 1, Arc::new(|ctx, a| ctx.math.log10(&a[0])));
    registry.register_function("log", 1, Arc::new(|ctx, a| ctx.math.log10(&a[0])));
    registry.register_function("sqrt", 1, Arc::new(|ctx, a| ctx.math.sqrt(&a[0])));
    registry.register_function("pow", 2, Arc::new(|_, a| value::pow(&a[0], &a[1])));

    registry.register_function("round", 1, Arc::new(|_, a| round(&a[0], RoundingMode::HalfUp)));
    registry.register_function("floor", 1, Arc::new(|_, a| round(&a[0], RoundingMode::Floor)));
    registry.register_function("ceil", 1, Arc::new(|_, a| round(&a[0], RoundingMode::Ceiling)));

    registry.register_function("abs", 1, Arc::new(|_, a| abs(&a[0])));
    registry.register_function("inv", 1, Arc::new(|_, a| value::div(&Value::integer(1), &a[0])));
    registry.register_function("square", 1, Arc::new(|_, a| value::mul(&a[0], &a[0])));

    registry.register_function("gcd", 2, Arc::new(|_, a| gcd(&a[0], &a[1])));
    registry.register_function("mod", 2, Arc::new(|_, a| value::modulo(&a[0], &a[1])));
    registry.register_function("factorial", 1, Arc::new(|_, a| value::factorial(&a[0])));
    registry.register_function("fac", 1, Arc::new(|_, a| value::factorial(&a[0])));
    registry.register_function("factorize", 1, Arc::new(|_, a| factorize(&a[0])));

    registry.register_function(
        "is_int",
        1,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_integer()))),
    );
    registry.register_function("b10bin", 1, Arc::new(|_, a| b10bin(&a[0])));

    registry.register_function("rand", 0, Arc::new(|_, _| decimal_from_f64(rand::random())));
    registry.register_function("randint", 1, Arc::new(|_, a| randint(&a[0])));
}

fn round(v: &Value, mode: RoundingMode) -> Result<Value, String> {
    let d = v.to_decimal().ok_or("expected a number")?;
    let rounded = Value::Decimal(d.with_scale_round(0, mode));
    rounded
        .to_bigint()
        .map(Value::Integer)
        .ok_or_else(|| "expected a number".to_string())
}

fn abs(v: &Value) -> Result<Value, String> {
    match v {
        Value::Boolean(b) => Ok(Value::integer(i64::from(*b))),
        Value::Integer(n) => Ok(Value::Integer(n.abs())),
        Value::Rational(r) => Ok(Value::Rational(r.abs())),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        _ => Err("expected a number".to_string()),
    }
}

fn gcd(a: &Value, b: &Value) -> Result<Value, String> {
    let msg = "gcd only defined for integers";
    let mut x = a.to_bigint().ok_or(msg)?.abs();
    let mut y = b.to_bigint().ok_or(msg)?.abs();
    while !y.is_zero() {
        let r = &x % &y;
        x = std::mem::replace(&mut y, r);
    }
    Ok(Value::Integer(x))
}

/// Prime factorization by trial division, rendered as text: `12` gives
/// `"2 * 2 * 3"`.
fn factorize(v: &Value) -> Result<Value, String> {
    let n = v
        .to_bigint()
        .filter(|n| n.is_positive())
        .ok_or("can only factorize positive integers")?;
    let mut n = n
        .to_u64()
        .ok_or("number too large to factorize")?;
    if n == 1 {
        return Ok(Value::Text("1".to_string()));
    }
    let mut factors = Vec::new();
    let mut p = 2u64;
    while p <= n / p {
        while n % p == 0 {
            factors.push(p.to_string());
            n /= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n.to_string());
    }
    Ok(Value::Text(factors.join(" * ")))
}

/// Reinterpret a numeral written with only the digits 0 and 1 as binary:
/// `b10bin(1101)` gives 13.
fn b10bin(v: &Value) -> Result<Value, String> {
    let msg = "expected a number consisting of the digits 0 and 1";
    let n = v.to_bigint().ok_or(msg)?;
    let digits = n.magnitude().to_str_radix(10);
    if !digits.chars().all(|c| c == '0' || c == '1') {
        return Err(msg.to_string());
    }
    let out = BigInt::parse_bytes(digits.as_bytes(), 2).ok_or(msg)?;
    Ok(Value::Integer(if n.is_negative() { -out } else { out }))
}

fn randint(max: &Value) -> Result<Value, String> {
    let n = max
        .to_bigint()
        .filter(|n| n.is_positive())
        .and_then(|n| n.to_u64())
        .ok_or("randint needs a positive integer bound")?;
    let x = rand::rng().random_range(0..n);
    Ok(Value::Integer(BigInt::from(x)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_family() {
        let half = value::div(&Value::integer(3), &Value::integer(2)).unwrap();
        assert_eq!(round(&half, RoundingMode::HalfUp).unwrap(), Value::integer(2));
        assert_eq!(round(&half, RoundingMode::Floor).unwrap(), Value::integer(1));
        assert_eq!(
            round(&half, RoundingMode::Ceiling).unwrap(),
            Value::integer(2)
        );
    }

    #[test]
    fn gcd_of_integers() {
        assert_eq!(
            gcd(&Value::integer(12), &Value::integer(18)).unwrap(),
            Value::integer(6)
        );
        assert_eq!(
            gcd(&Value::integer(-4), &Value::integer(6)).unwrap(),
            Value::integer(2)
        );
        assert!(gcd(&Value::Text("x".into()), &Value::integer(2)).is_err());
    }

    #[test]
    fn factorize_renders_text() {
        assert_eq!(
            factorize(&Value::integer(12)).unwrap(),
            Value::Text("2 * 2 * 3".to_string())
        );
        assert_eq!(
            factorize(&Value::integer(13)).unwrap(),
            Value::Text("13".to_string())
        );
        assert!(factorize(&Value::integer(0)).is_err());
    }

    #[test]
    fn binary_reinterpretation() {
        assert_eq!(b10bin(&Value::integer(1101)).unwrap(), Value::integer(13));
        assert_eq!(b10bin(&Value::integer(-10)).unwrap(), Value::integer(-2));
        assert!(b10bin(&Value::integer(12)).is_err());
    }
}
