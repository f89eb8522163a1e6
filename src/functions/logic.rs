use std::sync::Arc;

use crate::registry::Registry;
use crate::value::Value;

pub fn register(registry: &mut Registry) {
    registry.register_function(
        "and",
        2,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_truthy() && a[1].is_truthy()))),
    );
    registry.register_function(
        "or",
        2,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_truthy() || a[1].is_truthy()))),
    );
    registry.register_function(
        "xor",
        2,
        Arc::new(|_, a| Ok(Value::Boolean(a[0].is_truthy() != a[1].is_truthy()))),
    );
    registry.register_function(
        "not",
        1,
        Arc::new(|_, a| Ok(Value::Boolean(!a[0].is_truthy()))),
    );
}
