use log::debug;

use crate::ast::evaluator::EvalState;
use crate::ast::Expr;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::namespace::Binding;
use crate::value::decimal_from_f64;
use crate::Calculator;

/// Turns sampled points into something displayable. The library itself
/// only produces a plain-text table; a frontend installs its own renderer
/// to get SVG or a canvas drawing.
pub trait PlotRenderer {
    fn render(&self, points: &[(f64, f64)], xlabel: &str, ylabel: &str) -> String;
}

/// Fallback rendering: one tab-separated `x y` pair per line.
pub fn format_points(points: &[(f64, f64)]) -> String {
    let mut out = String::new();
    for (x, y) in points {
        out.push_str(&format!("{}\t{}\n", x, y));
    }
    out
}

impl Calculator {
    /// Evaluate `expr` at `n` evenly spaced values of `var` across
    /// `range`, inclusive of both endpoints. Points whose evaluation
    /// fails are recorded with y = 0.0. The variable's previous binding
    /// (or absence) is restored afterwards, also on error.
    pub fn sample(
        &mut self,
        expr: &Expr,
        var: &str,
        range: (f64, f64),
        n: usize,
    ) -> Result<Vec<(f64, f64)>, RuntimeError> {
        if n < 2 {
            return Err(RuntimeError::new(
                RuntimeErrorKind::Domain,
                "at least two sample points required",
                expr.span().range(),
            ));
        }
        if self.names.is_immutable(var) {
            return Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperand,
                format!("'{}' cannot be used as a plot variable", var),
                expr.span().range(),
            ));
        }
        debug!("sampling over {} in [{}, {}], {} points", var, range.0, range.1, n);
        let saved = self.names.get(var).cloned();
        let result = self.sample_loop(expr, var, range, n);
        match saved {
            Some(binding) => {
                self.names.set(var, binding, false);
            }
            None => {
                self.names.unset(var);
            }
        }
        result
    }

    fn sample_loop(
        &mut self,
        expr: &Expr,
        var: &str,
        (lo, hi): (f64, f64),
        n: usize,
    ) -> Result<Vec<(f64, f64)>, RuntimeError> {
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let x = lo + (hi - lo) * i as f64 / (n - 1) as f64;
            let xv = decimal_from_f64(x).map_err(|msg| {
                RuntimeError::new(RuntimeErrorKind::Domain, msg, expr.span().range())
            })?;
            self.names.set(var, Binding::Value(xv), false);
            // A point that fails to evaluate lands on the axis; one bad
            // sample must not abort the sweep.
            let y = match self.eval_node(expr, &EvalState::default()) {
                Ok(v) => v.to_f64().unwrap_or(0.0),
                Err(e) => {
                    debug!("sample at {}={} failed: {}", var, x, e.msg);
                    0.0
                }
            };
            out.push((x, y));
        }
        Ok(out)
    }
}
