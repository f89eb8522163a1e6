//! Trigonometric, inverse and hyperbolic functions. All of them defer to
//! the math context so the configured angle unit is honored.

use std::sync::Arc;

use crate::registry::Registry;
use crate::value::{self, Value};

pub fn register(registry: &mut Registry) {
    registry.register_function("sin", 1, Arc::new(|ctx, a| ctx.math.sin(&a[0])));
    registry.register_function("cos", 1, Arc::new(|ctx, a| ctx.math.cos(&a[0])));
    registry.register_function("tan", 1, Arc::new(|ctx, a| ctx.math.tan(&a[0])));
    registry.register_function("asin", 1, Arc::new(|ctx, a| ctx.math.asin(&a[0])));
    registry.register_function("acos", 1, Arc::new(|ctx, a| ctx.math.acos(&a[0])));
    registry.register_function("atan", 1, Arc::new(|ctx, a| ctx.math.atan(&a[0])));
    registry.register_function("sinh", 1, Arc::new(|ctx, a| ctx.math.sinh(&a[0])));
    registry.register_function("cosh", 1, Arc::new(|ctx, a| ctx.math.cosh(&a[0])));
    registry.register_function("tanh", 1, Arc::new(|ctx, a| ctx.math.tanh(&a[0])));
    registry.register_function("asinh", 1, Arc::new(|ctx, a| ctx.math.asinh(&a[0])));
    registry.register_function("acosh", 1, Arc::new(|ctx, a| ctx.math.acosh(&a[0])));
    registry.register_function("atanh", 1, Arc::new(|ctx, a| ctx.math.atanh(&a[0])));
    registry.register_function("sinc", 1, Arc::new(|ctx, a| {
        let x = a[0].to_f64().ok_or("expected a number")?;
        if x == 0.0 {
            return Ok(Value::integer(1));
        }
        let s = ctx.math.sin(&a[0])?;
        value::div(&s, &a[0])
    }));
}
