//! Builtin registration. Everything the evaluator can apply, operators
//! included, goes through the registry; nothing here is reachable by any
//! other path.

pub mod constants;
mod logic;
mod numbers;
mod trig;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::registry::{OpKind, Registry};
use crate::value::{self, Value};

pub fn register_all(registry: &mut Registry) {
    register_operators(registry);
    trig::register(registry);
    numbers::register(registry);
    logic::register(registry);
    register_introspection(registry);
    registry.register_raw_function("plot");
    registry.register_raw_function("help");
}

fn register_operators(registry: &mut Registry) {
    registry.register_operator("+", OpKind::Infix, 0, Arc::new(|_, a| value::add(&a[0], &a[1])));
    registry.register_operator("-", OpKind::Infix, 0, Arc::new(|_, a| value::sub(&a[0], &a[1])));
    registry.register_operator("-", OpKind::Prefix, 2, Arc::new(|_, a| value::negate(&a[0])));
    registry.register_operator("*", OpKind::Infix, 1, Arc::new(|_, a| value::mul(&a[0], &a[1])));
    registry.register_operator("/", OpKind::Infix, 1, Arc::new(|_, a| value::div(&a[0], &a[1])));
    registry.register_operator("^", OpKind::Infix, 2, Arc::new(|_, a| value::pow(&a[0], &a[1])));
    registry.register_operator("**", OpKind::Infix, 2, Arc::new(|_, a| value::pow(&a[0], &a[1])));
    registry.register_operator("%", OpKind::Infix, 2, Arc::new(|_, a| value::modulo(&a[0], &a[1])));
    registry.register_operator("!", OpKind::Postfix, 0, Arc::new(|_, a| value::factorial(&a[0])));
    registry.register_operator(
        "&",
        OpKind::Infix,
        0,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_truthy() && a[1].is_truthy()))),
    );
    registry.register_operator(
        "|",
        OpKind::Infix,
        0,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_truthy() || a[1].is_truthy()))),
    );
    registry.register_operator(
        "<<",
        OpKind::Infix,
        0,
        Arc::new(|_, a| value::shift_left(&a[0], &a[1])),
    );
    registry.register_operator(
        ">>",
        OpKind::Infix,
        0,
        Arc::new(|_, a| value::shift_right(&a[0], &a[1])),
    );
    registry.register_operator(
        "=",
        OpKind::Compare,
        0,
        Arc::new(|_, a| value::loose_eq(&a[0], &a[1]).map(Value::Boolean)),
    );
    registry.register_operator(
        "!=",
        OpKind::Compare,
        0,
        Arc::new(|_, a| value::loose_eq(&a[0], &a[1]).map(|eq| Value::Boolean(!eq))),
    );
    registry.register_operator(
        "<",
        OpKind::Compare,
        0,
        Arc::new(|_, a| {
            value::compare(&a[0], &a[1]).map(|o| Value::Boolean(o == Ordering::Less))
        }),
    );
    registry.register_operator(
        ">",
        OpKind::Compare,
        0,
        Arc::new(|_, a| {
            value::compare(&a[0], &a[1]).map(|o| Value::Boolean(o == Ordering::Greater))
        }),
    );
}

fn register_introspection(registry: &mut Registry) {
    registry.register_function(
        "functions",
        0,
        Arc::new(|ctx, _| Ok(Value::Text(ctx.registry.function_names("").join(", ")))),
    );
    registry.register_function(
        "variables",
        0,
        Arc::new(|ctx, _| Ok(Value::Text(ctx.namespace.names("").join(", ")))),
    );
    registry.register_function(
        "operators",
        0,
        Arc::new(|ctx, _| Ok(Value::Text(ctx.registry.operator_symbols().join(" ")))),
    );
}
