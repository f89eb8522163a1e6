use std::collections::HashSet;

use log::debug;
use num_traits::ToPrimitive;

use crate::ast::{Expr, Span};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::namespace::Binding;
use crate::value::Value;
use crate::Calculator;

const MAX_EVAL_DEPTH: usize = 256;

/// Per-evaluation bookkeeping. `branch_vars` holds the expression-bound
/// names currently being expanded on this branch; seeing one again means
/// the definition refers to itself.
#[derive(Debug, Clone, Default)]
pub(crate) struct EvalState {
    depth: usize,
    branch_vars: HashSet<String>,
}

impl Calculator {
    /// Evaluate a parsed tree against the current namespace and registry.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.var_used_ofs.clear();
        let result = self.eval_node(expr, &EvalState::default());
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.range),
        }
        result
    }

    pub(crate) fn eval_node(
        &mut self,
        expr: &Expr,
        st: &EvalState,
    ) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number { value, .. } => Ok(value.clone()),

            Expr::Identifier { name, span } => self.eval_identifier(name, *span, st),

            Expr::Unary {
                op,
                postfix,
                operand,
                span,
            } => {
                let v = self.eval_node(operand, st)?;
                if v.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let apply = match self.registry.find_operator(op, *postfix) {
                    Some(entry) => entry.apply.clone(),
                    None => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::UndefinedFunction,
                            format!("operator '{}' not registered", op),
                            span.range(),
                        ))
                    }
                };
                let ctx = self.fn_ctx();
                (apply)(&ctx, &[v]).map_err(|msg| {
                    RuntimeError::new(RuntimeErrorKind::Domain, msg, span.range())
                })
            }

            Expr::Binary {
                op,
                left,
                right,
                span,
            }
            | Expr::Comparison {
                op,
                left,
                right,
                span,
            } => {
                let a = self.eval_node(left, st)?;
                let b = self.eval_node(right, st)?;
                if a.is_undefined() || b.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let apply = match self.registry.find_operator(op, true) {
                    Some(entry) => entry.apply.clone(),
                    None => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::UndefinedFunction,
                            format!("operator '{}' not registered", op),
                            span.range(),
                        ))
                    }
                };
                let ctx = self.fn_ctx();
                (apply)(&ctx, &[a, b]).map_err(|msg| {
                    RuntimeError::new(RuntimeErrorKind::Domain, msg, span.range())
                })
            }

            Expr::FunctionCall {
                name,
                args,
                kwargs,
                span,
            } => self.eval_call(name, args, kwargs, *span, st),

            Expr::Tuple { span, .. } => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand,
                "tuple not expected here",
                span.range(),
            )),
        }
    }

    fn eval_identifier(
        &mut self,
        name: &str,
        span: Span,
        st: &EvalState,
    ) -> Result<Value, RuntimeError> {
        self.var_used_ofs
            .entry(name.to_string())
            .or_insert(span.start);
        let binding = match self.names.get(name) {
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedVariable,
                    format!("variable '{}' not defined", name),
                    span.range(),
                ))
            }
            Some(b) => b.clone(),
        };
        match binding {
            Binding::Value(v) => Ok(v),
            Binding::Expr(text) => {
                if st.branch_vars.contains(name) {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::Recursion,
                        format!("recursion detected through variable '{}'", name),
                        span.range(),
                    ));
                }
                if st.depth + 1 >= MAX_EVAL_DEPTH {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::Recursion,
                        "expression too deeply nested",
                        span.range(),
                    ));
                }
                debug!("expanding variable '{}' = {}", name, text);
                let parsed = self.parse_internal(&text).map_err(|e| {
                    RuntimeError::new(
                        RuntimeErrorKind::InvalidOperand,
                        format!("in variable '{}': {}", name, e.msg),
                        span.range(),
                    )
                })?;
                let mut sub = st.clone();
                sub.depth += 1;
                sub.branch_vars.insert(name.to_string());
                // Inner errors are re-ranged to this occurrence: offsets
                // inside the binding text mean nothing to the caller.
                self.eval_node(&parsed, &sub).map_err(|e| {
                    RuntimeError::new(
                        e.kind,
                        format!("in variable '{}': {}", name, e.msg),
                        span.range(),
                    )
                })
            }
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: Span,
        st: &EvalState,
    ) -> Result<Value, RuntimeError> {
        let (nargs, raw, apply) = match self.registry.get_function(name) {
            Some(f) => (f.nargs, f.raw_args, f.apply.clone()),
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedFunction,
                    format!("function '{}' not defined", name),
                    span.range(),
                ))
            }
        };

        if raw {
            return match name {
                "plot" => self.eval_plot(args, kwargs, span, st),
                "help" => self.eval_help(args, kwargs, span),
                _ => Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedFunction,
                    format!("special form '{}' has no evaluator", name),
                    span.range(),
                )),
            };
        }

        if !kwargs.is_empty() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::WrongArity,
                format!("function '{}' takes no keyword arguments", name),
                span.range(),
            ));
        }
        if args.len() != nargs {
            return Err(RuntimeError::new(
                RuntimeErrorKind::WrongArity,
                format!(
                    "function '{}' takes {} argument(s), got {}",
                    name,
                    nargs,
                    args.len()
                ),
                span.range(),
            ));
        }
        let apply = match apply {
            Some(f) => f,
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedFunction,
                    format!("function '{}' has no implementation", name),
                    span.range(),
                ))
            }
        };

        let mut vals = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.eval_node(arg, st)?;
            if v.is_undefined() {
                return Ok(Value::Undefined);
            }
            vals.push(v);
        }
        let ctx = self.fn_ctx();
        (apply)(&ctx, &vals)
            .map_err(|msg| RuntimeError::new(RuntimeErrorKind::Domain, msg, span.range()))
    }

    fn eval_tuple(&mut self, expr: &Expr, st: &EvalState) -> Result<Vec<Value>, RuntimeError> {
        match expr {
            Expr::Tuple { elements, .. } => {
                elements.iter().map(|e| self.eval_node(e, st)).collect()
            }
            other => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand,
                "range (lower,upper) expected",
                other.span().range(),
            )),
        }
    }

    /// `plot(expr, var=lo..hi [, points=n])`. The expression argument is
    /// kept unevaluated and sampled over the range.
    fn eval_plot(
        &mut self,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: Span,
        st: &EvalState,
    ) -> Result<Value, RuntimeError> {
        if args.len() != 1 {
            return Err(RuntimeError::new(
                RuntimeErrorKind::WrongArity,
                "plot takes one expression argument",
                span.range(),
            ));
        }
        let mut points = 100usize;
        let mut range_var: Option<(String, (f64, f64))> = None;
        for (key, value_expr) in kwargs {
            if key == "points" {
                let v = self.eval_node(value_expr, st)?;
                points = v
                    .to_bigint()
                    .as_ref()
                    .and_then(ToPrimitive::to_usize)
                    .ok_or_else(|| {
                        RuntimeError::new(
                            RuntimeErrorKind::InvalidOperand,
                            "points must be a non-negative integer",
                            value_expr.span().range(),
                        )
                    })?;
                continue;
            }
            if range_var.is_some() {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InvalidOperand,
                    "plot takes a single range variable",
                    span.range(),
                ));
            }
            let bounds = self.eval_tuple(value_expr, st)?;
            if bounds.len() != 2 {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::InvalidOperand,
                    "range (lower,upper) expected",
                    value_expr.span().range(),
                ));
            }
            let lo = bounds[0].to_f64().ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::InvalidOperand,
                    "range bounds must be numbers",
                    value_expr.span().range(),
                )
            })?;
            let hi = bounds[1].to_f64().ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::InvalidOperand,
                    "range bounds must be numbers",
                    value_expr.span().range(),
                )
            })?;
            range_var = Some((key.clone(), (lo, hi)));
        }
        let Some((var, range)) = range_var else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand,
                "plot needs a range variable, e.g. x=0..2",
                span.range(),
            ));
        };

        let samples = self.sample(&args[0], &var, range, points)?;
        let text = match &self.renderer {
            Some(r) => r.render(&samples, &var, ""),
            None => crate::plot::format_points(&samples),
        };
        Ok(Value::Text(text))
    }

    fn eval_help(
        &mut self,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if !kwargs.is_empty() || args.len() > 1 {
            return Err(RuntimeError::new(
                RuntimeErrorKind::WrongArity,
                "help takes at most one topic",
                span.range(),
            ));
        }
        match args.first() {
            None => Ok(Value::Text(crate::help::usage().to_string())),
            Some(Expr::Identifier { name, .. }) => {
                let ctx = self.fn_ctx();
                Ok(Value::Text(crate::help::lookup(name, &ctx)))
            }
            Some(other) => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand,
                "help topic must be a name",
                other.span().range(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;

    #[test]
    fn undefined_variable_reports_its_exact_range() {
        let mut calc = Calculator::new();
        let expr = calc.parse("2+undefinedName*3").unwrap();
        let err = calc.evaluate(&expr).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(err.range, (2, 15));
        assert_eq!(calc.get_error_range(), Some((2, 15)));
    }

    #[test]
    fn self_referential_binding_is_detected() {
        let mut calc = Calculator::new();
        assert!(calc.set_var("a", "a+1"));
        let expr = calc.parse("a").unwrap();
        let err = calc.evaluate(&expr).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Recursion);
    }

    #[test]
    fn mutual_recursion_is_detected() {
        let mut calc = Calculator::new();
        calc.set_var("a", "b+1");
        calc.set_var("b", "a+1");
        let expr = calc.parse("a").unwrap();
        let err = calc.evaluate(&expr).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Recursion);
    }

    #[test]
    fn diamond_reuse_is_not_recursion() {
        // The same binding used on two sibling branches is fine.
        let mut calc = Calculator::new();
        calc.set_var("a", "2+2");
        let expr = calc.parse("a*a").unwrap();
        assert_eq!(
            calc.evaluate(&expr).unwrap(),
            crate::value::Value::integer(16)
        );
    }

    #[test]
    fn undefined_propagates_without_applying_operators() {
        let mut calc = Calculator::new();
        calc.set_var("u", crate::value::Value::Undefined);
        let v = calc.parse_and_eval("u/0").unwrap();
        assert!(v.is_undefined());
    }

    #[test]
    fn wrong_arity_is_reported() {
        let mut calc = Calculator::new();
        let err = calc.parse_and_eval("sin(1,2)").unwrap_err();
        assert_eq!(err.msg(), "function 'sin' takes 1 argument(s), got 2");
    }

    #[test]
    fn unknown_function_is_reported_with_range() {
        let mut calc = Calculator::new();
        let expr = calc.parse("nosuch(1)").unwrap();
        let err = calc.evaluate(&expr).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedFunction);
        assert_eq!(err.range, (0, 9));
    }
}
