pub mod ast;
pub mod equation;
pub mod error;
pub mod functions;
pub mod help;
pub mod mathlib;
pub mod namespace;
pub mod plot;
pub mod registry;
pub mod value;

use std::collections::HashMap;

use ast::parser::Parser;
use ast::Expr;
use error::{CalcError, ErrorRange, ParseError};
use mathlib::MathContext;
use namespace::{Binding, Namespace};
use plot::PlotRenderer;
use registry::{FnCtx, Registry};
use value::Value;

/// The calculator: a registry of operators and functions, a namespace of
/// variables and constants, and the display/angle configuration, bundled
/// with the parse and evaluate entry points.
pub struct Calculator {
    pub(crate) math: MathContext,
    pub(crate) registry: Registry,
    pub(crate) names: Namespace,
    pub(crate) var_used_ofs: HashMap<String, usize>,
    pub(crate) last_error: Option<ErrorRange>,
    pub(crate) renderer: Option<Box<dyn PlotRenderer>>,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::with_context(MathContext::default())
    }

    pub fn with_context(math: MathContext) -> Self {
        let mut registry = Registry::new();
        functions::register_all(&mut registry);
        let mut names = Namespace::new();
        functions::constants::register(&mut names);
        names.set("help", Value::Text(help::usage().to_string()).into(), true);
        let plot_usage = help::topic_text("plot").unwrap_or(help::usage());
        names.set("plot", Value::Text(plot_usage.to_string()).into(), true);
        Self {
            math,
            registry,
            names,
            var_used_ofs: HashMap::new(),
            last_error: None,
            renderer: None,
        }
    }

    /// Parse without touching calculator state; variable expansion during
    /// evaluation goes through here.
    pub(crate) fn parse_internal(&self, input: &str) -> Result<Expr, ParseError> {
        Parser::new(&self.registry, &self.math).parse(input)
    }

    pub fn parse(&mut self, input: &str) -> Result<Expr, ParseError> {
        let result = self.parse_internal(input);
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.range),
        }
        result
    }

    pub fn parse_and_eval(&mut self, input: &str) -> Result<Value, CalcError> {
        let expr = self.parse(input)?;
        Ok(self.evaluate(&expr)?)
    }

    /// Character range of the most recent parse or evaluation error, for
    /// highlighting in a frontend.
    pub fn get_error_range(&self) -> Option<ErrorRange> {
        self.last_error
    }

    /// Bind a variable to a value or an expression text. Returns `false`
    /// when the name is reserved.
    pub fn set_var(&mut self, name: &str, binding: impl Into<Binding>) -> bool {
        self.names.set(name, binding.into(), false)
    }

    pub fn get_var(&self, name: &str) -> Option<&Binding> {
        self.names.get(name)
    }

    pub fn unset_var(&mut self, name: &str) -> bool {
        self.names.unset(name)
    }

    pub fn get_variable_names(&self, prefix: &str) -> Vec<String> {
        self.names.names(prefix)
    }

    pub fn get_function_names(&self, prefix: &str) -> Vec<String> {
        self.registry.function_names(prefix)
    }

    /// Offset of the first use of `name` during the last evaluation, or
    /// `None` when the evaluation never touched it.
    pub fn get_var_used_ofs(&self, name: &str) -> Option<usize> {
        self.var_used_ofs.get(name).copied()
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn PlotRenderer>) {
        self.renderer = Some(renderer);
    }

    pub fn math(&self) -> &MathContext {
        &self.math
    }

    pub fn math_mut(&mut self) -> &mut MathContext {
        &mut self.math
    }

    /// Registry access for frontends that install their own builtins.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn format_number(&self, v: &Value) -> String {
        self.math.format_number(v)
    }

    pub(crate) fn fn_ctx(&self) -> FnCtx<'_> {
        FnCtx {
            math: &self.math,
            namespace: &self.names,
            registry: &self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::RuntimeErrorKind;

    fn eval(input: &str) -> Value {
        Calculator::new().parse_and_eval(input).unwrap()
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("2+3*4"), Value::integer(14));
        assert_eq!(eval("(2+3)*4"), Value::integer(20));
        assert_eq!(eval("2^3^2"), Value::integer(64));
    }

    #[test]
    fn exact_arithmetic_end_to_end() {
        assert_eq!(eval("2^10"), Value::integer(1024));
        assert_eq!(eval("4/2"), Value::integer(2));
        assert_eq!(eval("7/2").to_string(), "7/2");
        assert_eq!(eval("2^-2").to_string(), "1/4");
        assert_eq!(eval("1/2 = 0.5"), Value::Boolean(true));
    }

    #[test]
    fn fractional_power_is_approximate() {
        let x = eval("2^0.5").to_f64().unwrap();
        assert!((x - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn glyph_operators_evaluate() {
        assert_eq!(eval("5×3"), Value::integer(15));
        assert_eq!(eval("15÷3"), Value::integer(5));
    }

    #[test]
    fn constants_are_available_and_protected() {
        let mut calc = Calculator::new();
        let x = calc.parse_and_eval("sin(pi/2)").unwrap().to_f64().unwrap();
        assert!((x - 1.0).abs() < 1e-9);
        assert!(!calc.set_var("pi", Value::integer(3)));
        assert!(!calc.set_var("help", Value::integer(0)));
        assert!(!calc.set_var("plot", Value::integer(1)));
        assert!(!calc.unset_var("true"));
        assert!(!calc.unset_var("plot"));
    }

    #[test]
    fn division_by_zero_reports_the_expression_range() {
        let mut calc = Calculator::new();
        let err = calc.parse_and_eval("1/0").unwrap_err();
        let CalcError::Runtime(e) = err else {
            panic!("expected runtime error");
        };
        assert_eq!(e.kind, RuntimeErrorKind::Domain);
        assert_eq!(e.range, (0, 3));
        assert_eq!(calc.get_error_range(), Some((0, 3)));
    }

    #[test]
    fn parse_errors_set_the_error_range() {
        let mut calc = Calculator::new();
        assert!(calc.parse("(1+2").is_err());
        assert_eq!(calc.get_error_range(), Some((0, 1)));
        assert!(calc.parse("1+1").is_ok());
        assert_eq!(calc.get_error_range(), None);
    }

    #[test]
    fn first_use_offsets_are_recorded() {
        let mut calc = Calculator::new();
        calc.set_var("foo", Value::integer(1));
        calc.parse_and_eval("2+foo+foo").unwrap();
        assert_eq!(calc.get_var_used_ofs("foo"), Some(2));
        assert_eq!(calc.get_var_used_ofs("bar"), None);
    }

    #[test]
    fn error_offsets_survive_range_substitution() {
        // `0..2` is rewritten before parsing; the undefined variable after
        // it must still be reported at its position in the original text.
        let mut calc = Calculator::new();
        let input = "plot(bogus, x=0..2)";
        let err = calc.parse_and_eval(input).unwrap_err();
        let start = err.range().0;
        assert_eq!(&input[start..start + 5], "bogus");
    }

    #[test]
    fn expression_bindings_reevaluate_on_lookup() {
        let mut calc = Calculator::new();
        calc.set_var("f", "n^2");
        calc.set_var("n", Value::integer(3));
        assert_eq!(calc.parse_and_eval("f").unwrap(), Value::integer(9));
        calc.set_var("n", Value::integer(5));
        assert_eq!(calc.parse_and_eval("f").unwrap(), Value::integer(25));
    }

    #[test]
    fn introspection_builtins() {
        let mut calc = Calculator::new();
        let Value::Text(t) = calc.parse_and_eval("functions()").unwrap() else {
            panic!("expected text");
        };
        assert!(t.contains("sin"));
        let Value::Text(t) = calc.parse_and_eval("operators()").unwrap() else {
            panic!("expected text");
        };
        assert!(t.contains("**"));
    }

    #[test]
    fn formatting_follows_the_context() {
        let mut calc = Calculator::new();
        let v = calc.parse_and_eval("2^50").unwrap();
        assert_eq!(calc.format_number(&v), "1.12589991×10^15");
        calc.math_mut().set_integer_base(16);
        let v = calc.parse_and_eval("255").unwrap();
        assert_eq!(calc.format_number(&v), "0xff");
    }

    #[test]
    fn factorial_and_friends() {
        assert_eq!(eval("5!"), Value::integer(120));
        assert_eq!(eval("gcd(12, 18)"), Value::integer(6));
        assert_eq!(eval("mod(-7, 3)"), Value::integer(2));
        assert_eq!(eval("b10bin(1101)"), Value::integer(13));
    }
}
