use bigdecimal::BigDecimal;
use log::debug;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;

use crate::value::{decimal_from_f64, Value};

/// How a decimal with a large or small magnitude is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Never use an exponent.
    Plain,
    /// `1.23e17`
    Exponent,
    /// `1.23×10^17`
    Scientific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
    Gradians,
}

/// Display and angle configuration, threaded explicitly into every
/// formatting and trigonometry entry point. There is no global state: two
/// calculators with different settings cannot interfere.
#[derive(Debug, Clone)]
pub struct MathContext {
    format_type: FormatType,
    digit_limit: usize,
    chop_zeros: bool,
    integer_base: u32,
    angle: AngleUnit,
    fraction_sep: char,
}

impl Default for MathContext {
    fn default() -> Self {
        Self {
            format_type: FormatType::Scientific,
            digit_limit: 9,
            chop_zeros: true,
            integer_base: 10,
            angle: AngleUnit::Radians,
            fraction_sep: '.',
        }
    }
}

impl MathContext {
    pub fn format_type(&self) -> FormatType {
        self.format_type
    }

    pub fn set_format_type(&mut self, fmt: FormatType) {
        debug!("format type set to {:?}", fmt);
        self.format_type = fmt;
    }

    pub fn digit_limit(&self) -> usize {
        self.digit_limit
    }

    pub fn set_digit_limit(&mut self, digits: usize) {
        debug!("digit limit set to {}", digits);
        self.digit_limit = digits.max(1);
    }

    pub fn set_chop_zeros(&mut self, chop: bool) {
        debug!("chop zeros set to {}", chop);
        self.chop_zeros = chop;
    }

    pub fn integer_base(&self) -> u32 {
        self.integer_base
    }

    /// Only bases 2, 8, 10 and 16 are supported; anything else is refused.
    pub fn set_integer_base(&mut self, base: u32) -> bool {
        if !matches!(base, 2 | 8 | 10 | 16) {
            debug!("unsupported integer base {} requested", base);
            return false;
        }
        debug!("integer base set to {}", base);
        self.integer_base = base;
        true
    }

    pub fn angle_unit(&self) -> AngleUnit {
        self.angle
    }

    pub fn set_angle_unit(&mut self, unit: AngleUnit) {
        debug!("angle unit set to {:?}", unit);
        self.angle = unit;
    }

    pub fn fraction_sep(&self) -> char {
        self.fraction_sep
    }

    pub fn set_fraction_sep(&mut self, sep: char) {
        self.fraction_sep = sep;
    }

    fn angle_scale(&self) -> f64 {
        match self.angle {
            AngleUnit::Degrees => std::f64::consts::PI / 180.0,
            AngleUnit::Radians => 1.0,
            AngleUnit::Gradians => std::f64::consts::PI / 200.0,
        }
    }

    /// Parse a numeral: digits, an optional fractional part using the
    /// configured decimal separator, and an optional signed exponent.
    /// Integral results become `Integer`, everything else `Decimal`.
    pub fn parse_number(&self, text: &str) -> Option<Value> {
        let normalized: String = text
            .trim()
            .chars()
            .map(|c| if c == self.fraction_sep { '.' } else { c })
            .collect();
        let d: BigDecimal = normalized.parse().ok()?;
        let v = Value::Decimal(d);
        match v.to_bigint() {
            Some(n) => Some(Value::Integer(n)),
            None => Some(v),
        }
    }

    /// Render any value for display.
    pub fn format_number(&self, v: &Value) -> String {
        match v {
            Value::Boolean(b) => b.to_string(),
            Value::Text(s) => s.clone(),
            Value::Undefined => "undefined".to_string(),
            Value::Symbolic => "symbolic".to_string(),
            Value::Integer(_) | Value::Rational(_) | Value::Decimal(_) => {
                if self.integer_base != 10 {
                    if let Some(n) = v.to_bigint() {
                        return self.format_int(&n);
                    }
                }
                match v.to_decimal() {
                    Some(d) => self.format_decimal(&d),
                    None => v.to_string(),
                }
            }
        }
    }

    /// Render an integer in the configured base with a `0b`/`0o`/`0x`
    /// prefix.
    pub fn format_int(&self, n: &BigInt) -> String {
        let prefix = match self.integer_base {
            2 => "0b",
            8 => "0o",
            16 => "0x",
            _ => "",
        };
        let sign = if n.sign() == Sign::Minus { "-" } else { "" };
        format!(
            "{}{}{}",
            sign,
            prefix,
            n.magnitude().to_str_radix(self.integer_base)
        )
    }

    /// Render a decimal honoring the digit limit, the trailing-zero chop
    /// flag and the exponent style.
    pub fn format_decimal(&self, d: &BigDecimal) -> String {
        let mut d = if self.chop_zeros {
            d.normalized()
        } else {
            d.clone()
        };
        if d.digits() > self.digit_limit as u64 {
            d = d.with_prec(self.digit_limit as u64);
            if self.chop_zeros {
                d = d.normalized();
            }
        }
        if d.is_zero() {
            return "0".to_string();
        }

        let (unscaled, scale) = d.as_bigint_and_exponent();
        let neg = unscaled.sign() == Sign::Minus;
        let digits = unscaled.magnitude().to_str_radix(10);
        let exp = -scale;
        let len = digits.len() as i64;
        let dl = self.digit_limit as i64;

        // Position of the decimal point measured from the left edge of the
        // digit string; decides between plain and exponent rendering.
        let int_len = len + exp;
        let mut disp_exp = if int_len == 0 {
            if exp < -dl {
                exp + len
            } else {
                0
            }
        } else if -dl < int_len && int_len < dl {
            0
        } else {
            int_len - 1
        };
        if self.format_type == FormatType::Plain {
            disp_exp = 0;
        }
        let dot_pos = int_len - disp_exp;

        let mut res = String::new();
        if neg {
            res.push('-');
        }
        if dot_pos <= 0 {
            res.push('0');
            res.push(self.fraction_sep);
            for _ in dot_pos..0 {
                res.push('0');
            }
            res.push_str(&digits);
        } else if dot_pos >= len {
            res.push_str(&digits);
            for _ in len..dot_pos {
                res.push('0');
            }
        } else {
            let (head, tail) = digits.split_at(dot_pos as usize);
            res.push_str(head);
            res.push(self.fraction_sep);
            res.push_str(tail);
        }

        if disp_exp != 0 {
            match self.format_type {
                FormatType::Exponent => res.push_str(&format!("e{}", disp_exp)),
                FormatType::Scientific => res.push_str(&format!("×10^{}", disp_exp)),
                FormatType::Plain => {}
            }
        }
        res
    }

    /// Compact rendering, used for axis labels.
    pub fn short_format(&self, v: &Value) -> String {
        let ret = self.format_number(v);
        if ret.chars().count() > 7 {
            if let Some(x) = v.to_f64() {
                return format!("{:.1e}", x);
            }
        }
        ret
    }

    // Transcendental helpers. All go through f64 and come back as Decimal;
    // the angle unit scales trig inputs and inverse-trig outputs.

    pub fn sin(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64((num(x)? * self.angle_scale()).sin())
    }

    pub fn cos(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64((num(x)? * self.angle_scale()).cos())
    }

    pub fn tan(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64((num(x)? * self.angle_scale()).tan())
    }

    pub fn asin(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if !(-1.0..=1.0).contains(&x) {
            return Err("asin(x) only defined for -1 <= x <= 1".to_string());
        }
        decimal_from_f64(x.asin() / self.angle_scale())
    }

    pub fn acos(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if !(-1.0..=1.0).contains(&x) {
            return Err("acos(x) only defined for -1 <= x <= 1".to_string());
        }
        decimal_from_f64(x.acos() / self.angle_scale())
    }

    pub fn atan(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.atan() / self.angle_scale())
    }

    pub fn sinh(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.sinh())
    }

    pub fn cosh(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.cosh())
    }

    pub fn tanh(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.tanh())
    }

    pub fn asinh(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.asinh())
    }

    pub fn acosh(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if x < 1.0 {
            return Err("acosh(x) only defined for x >= 1".to_string());
        }
        decimal_from_f64(x.acosh())
    }

    pub fn atanh(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if x <= -1.0 || x >= 1.0 {
            return Err("atanh(x) only defined for -1 < x < 1".to_string());
        }
        decimal_from_f64(x.atanh())
    }

    pub fn exp(&self, x: &Value) -> Result<Value, String> {
        decimal_from_f64(num(x)?.exp())
    }

    pub fn ln(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if x <= 0.0 {
            return Err("logarithm(x) only defined for x > 0".to_string());
        }
        decimal_from_f64(x.ln())
    }

    pub fn log10(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if x <= 0.0 {
            return Err("logarithm(x) only defined for x > 0".to_string());
        }
        decimal_from_f64(x.log10())
    }

    pub fn sqrt(&self, x: &Value) -> Result<Value, String> {
        let x = num(x)?;
        if x < 0.0 {
            return Err("sqrt(x) only defined for x >= 0".to_string());
        }
        decimal_from_f64(x.sqrt())
    }
}

fn num(v: &Value) -> Result<f64, String> {
    v.to_f64().ok_or_else(|| "expected a number".to_string())
}
