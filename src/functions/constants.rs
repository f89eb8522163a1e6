//! Mathematical and physical constants, installed as immutable namespace
//! entries so user assignments can neither shadow nor remove them.

use bigdecimal::BigDecimal;

use crate::namespace::Namespace;
use crate::value::Value;

fn dec(text: &str) -> Value {
    match text.parse::<BigDecimal>() {
        Ok(d) => Value::Decimal(d),
        Err(_) => Value::Undefined,
    }
}

pub fn register(ns: &mut Namespace) {
    ns.set("true", Value::Boolean(true).into(), true);
    ns.set("false", Value::Boolean(false).into(), true);

    ns.set("pi", dec("3.14159265358979323846264338327950288").into(), true);
    ns.set("e", dec("2.71828182845904523536028747135266249").into(), true);
    ns.set(
        "golden_ratio",
        dec("1.61803398874989484820458683436563812").into(),
        true,
    );

    // CODATA 2018 values, SI units.
    ns.set("c", Value::integer(299_792_458).into(), true);
    ns.set("h", dec("6.62607015e-34").into(), true);
    ns.set("hbar", dec("1.054571817e-34").into(), true);
    ns.set("mu0", dec("1.25663706212e-6").into(), true);
    ns.set("e0", dec("8.8541878128e-12").into(), true);
    ns.set("Na", dec("6.02214076e23").into(), true);
    ns.set("kb", dec("1.380649e-23").into(), true);
    ns.set("R", dec("8.31446261815324").into(), true);
    ns.set("c_e", dec("1.602176634e-19").into(), true);
    ns.set("m_e", dec("9.1093837015e-31").into(), true);
    ns.set("m_p", dec("1.67262192369e-27").into(), true);
    ns.set("m_n", dec("1.67492749804e-27").into(), true);
}
