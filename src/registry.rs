use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use crate::mathlib::MathContext;
use crate::namespace::Namespace;
use crate::value::Value;

/// Read-only evaluation context handed to every builtin, so that
/// implementations can honor the current angle unit, look at the
/// namespace, or enumerate registered names.
pub struct FnCtx<'a> {
    pub math: &'a MathContext,
    pub namespace: &'a Namespace,
    pub registry: &'a Registry,
}

/// Shared, thread-safe function implementation.
pub type FnImpl = Arc<dyn Fn(&FnCtx<'_>, &[Value]) -> Result<Value, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Unary, before the operand: `-x`, `!x`.
    Prefix,
    /// Unary, after the operand: `5!`.
    Postfix,
    /// Binary arithmetic.
    Infix,
    /// Binary, yields a boolean: `=`, `<`, `!=`.
    Compare,
}

pub struct OpEntry {
    pub symbol: String,
    pub kind: OpKind,
    pub precedence: u32,
    pub apply: FnImpl,
}

pub struct FuncEntry {
    pub name: String,
    pub nargs: usize,
    /// Special forms receive unevaluated argument expressions and are
    /// dispatched by the evaluator itself; they carry no `apply`.
    pub raw_args: bool,
    pub apply: Option<FnImpl>,
}

/// The operator and function tables. The parser consults this at every
/// step: which characters can start an operator, which symbol sequences
/// are valid, and whether a symbol is eligible in prefix or infix
/// position. Nothing about the operator set is hard-coded in the grammar.
#[derive(Default)]
pub struct Registry {
    ops: Vec<OpEntry>,
    funcs: HashMap<String, FuncEntry>,
    op_start_chars: HashSet<char>,
    op_chars: HashSet<char>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_operator(
        &mut self,
        symbol: &str,
        kind: OpKind,
        precedence: u32,
        apply: FnImpl,
    ) {
        debug!("registering operator '{}' ({:?})", symbol, kind);
        let mut chars = symbol.chars();
        if let Some(first) = chars.next() {
            self.op_start_chars.insert(first);
            self.op_chars.insert(first);
        }
        for c in chars {
            self.op_chars.insert(c);
        }
        self.ops.push(OpEntry {
            symbol: symbol.to_string(),
            kind,
            precedence,
            apply,
        });
    }

    pub fn register_function(&mut self, name: &str, nargs: usize, apply: FnImpl) {
        debug!("registering function '{}'/{}", name, nargs);
        self.funcs.insert(
            name.to_string(),
            FuncEntry {
                name: name.to_string(),
                nargs,
                raw_args: false,
                apply: Some(apply),
            },
        );
    }

    /// Register a special form: the evaluator recognizes it by name and
    /// handles its raw argument expressions itself.
    pub fn register_raw_function(&mut self, name: &str) {
        debug!("registering special form '{}'", name);
        self.funcs.insert(
            name.to_string(),
            FuncEntry {
                name: name.to_string(),
                nargs: 0,
                raw_args: true,
                apply: None,
            },
        );
    }

    /// Look up `symbol` in the position the parser is in. With an operand
    /// to the left only infix, comparison and postfix entries are
    /// eligible; without one only prefix entries are.
    pub fn find_operator(&self, symbol: &str, has_left: bool) -> Option<&OpEntry> {
        self.ops.iter().find(|op| {
            op.symbol == symbol
                && match op.kind {
                    OpKind::Prefix => !has_left,
                    OpKind::Postfix | OpKind::Infix | OpKind::Compare => has_left,
                }
        })
    }

    pub fn get_function(&self, name: &str) -> Option<&FuncEntry> {
        self.funcs.get(name)
    }

    pub fn is_op_start_char(&self, c: char) -> bool {
        self.op_start_chars.contains(&c)
    }

    pub fn is_op_char(&self, c: char) -> bool {
        self.op_chars.contains(&c)
    }

    /// Registered function names starting with `prefix`, sorted.
    pub fn function_names(&self, prefix: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .funcs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// All distinct operator symbols, sorted.
    pub fn operator_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self.ops.iter().map(|op| op.symbol.clone()).collect();
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn noop() -> FnImpl {
        Arc::new(|_, args| Ok(args[0].clone()))
    }

    #[test]
    fn position_decides_eligibility() {
        let mut reg = Registry::new();
        reg.register_operator(
            "-",
            OpKind::Prefix,
            2,
            Arc::new(|_, args| value::negate(&args[0])),
        );
        reg.register_operator(
            "-",
            OpKind::Infix,
            0,
            Arc::new(|_, args| value::sub(&args[0], &args[1])),
        );

        assert_eq!(reg.find_operator("-", false).map(|o| o.kind), Some(OpKind::Prefix));
        assert_eq!(reg.find_operator("-", true).map(|o| o.kind), Some(OpKind::Infix));
        assert!(reg.find_operator("+", true).is_none());
    }

    #[test]
    fn operator_chars_accumulate() {
        let mut reg = Registry::new();
        reg.register_operator("**", OpKind::Infix, 2, noop());
        reg.register_operator("!=", OpKind::Compare, 0, noop());
        assert!(reg.is_op_start_char('*'));
        assert!(reg.is_op_start_char('!'));
        assert!(reg.is_op_char('='));
        assert!(!reg.is_op_start_char('='));
    }

    #[test]
    fn function_listing_honors_prefix() {
        let mut reg = Registry::new();
        reg.register_function("sin", 1, noop());
        reg.register_function("sinh", 1, noop());
        reg.register_function("cos", 1, noop());
        reg.register_raw_function("plot");
        assert_eq!(reg.function_names("si"), vec!["sin", "sinh"]);
        assert!(reg.get_function("plot").is_some_and(|f| f.raw_args));
    }
}
