//! Built-in help texts, served by the `help(...)` special form.

use crate::registry::FnCtx;

const USAGE: &str = "Use help(index) to see a list of help topics, \
or help(name) for help about a function, operator or topic.";

static TOPICS: &[(&str, &str)] = &[
    (
        "acos",
        "acos(x), return the arc cosine of x. This is the angle for which the cosine is x.",
    ),
    (
        "asin",
        "asin(x), return the arc sine of x. This is the angle for which the sine is x.",
    ),
    (
        "atan",
        "atan(x), return the arc tangent of x. This is the angle for which the tangent is x.",
    ),
    ("cos", "cos(x), return the cosine of x, where x is an angle."),
    ("cosh", "cosh(x), return the hyperbolic cosine of x."),
    ("sin", "sin(x), return the sine of x, where x is an angle."),
    ("sinh", "sinh(x), return the hyperbolic sine of x."),
    ("tan", "tan(x), return the tangent of x, where x is an angle."),
    ("tanh", "tanh(x), return the hyperbolic tangent of x."),
    ("exp", "exp(x), return e raised to the power of x."),
    ("ln", "ln(x), return the natural logarithm of x, for x > 0."),
    ("log10", "log10(x), return the base-10 logarithm of x, for x > 0."),
    ("sqrt", "sqrt(x), return the square root of x, for x >= 0."),
    ("abs", "abs(x), return the absolute value of x."),
    ("floor", "floor(x), return the largest integer not greater than x."),
    ("ceil", "ceil(x), return the smallest integer not smaller than x."),
    ("round", "round(x), return x rounded to the nearest integer."),
    (
        "gcd",
        "gcd(a, b), return the greatest common divisor of the integers a and b.",
    ),
    (
        "mod",
        "mod(x, m), return x modulo m; m must be an integer. Also available as the % operator.",
    ),
    (
        "factorial",
        "factorial(n), return the product 1 * 2 * ... * n. Also available as the ! operator.",
    ),
    (
        "factorize",
        "factorize(n), return the prime factorization of the positive integer n as text.",
    ),
    (
        "plot",
        "plot(expression, variable=lower..upper), plot the expression over the given range, \
e.g. plot(sin(x), x=0..6). Use points=n to control the number of samples.",
    ),
    (
        "operators",
        "Operators work between or next to values, e.g. 2*3 or 5!. \
Use the operators() function to list the registered symbols.",
    ),
    (
        "test",
        "In development. Use help(index) for a list of topics that already have help.",
    ),
];

pub fn usage() -> &'static str {
    USAGE
}

/// The static text for one topic, when it has one.
pub fn topic_text(name: &str) -> Option<&'static str> {
    TOPICS
        .iter()
        .find(|(topic, _)| *topic == name)
        .map(|(_, text)| *text)
}

/// Resolve a help topic. The variable and function listings are generated
/// from the live tables; everything else comes from the static texts,
/// falling back to a substring match so `help(sine)` still finds `sin`.
pub fn lookup(topic: &str, ctx: &FnCtx<'_>) -> String {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() {
        return USAGE.to_string();
    }
    if topic == "index" || topic == "topics" {
        let mut names: Vec<&str> = TOPICS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        return format!("Topics: {}", names.join(", "));
    }
    if topic == "variables" {
        return format!("Variables: {}", ctx.namespace.names("").join(", "));
    }
    if topic == "functions" {
        return format!("Functions: {}", ctx.registry.function_names("").join(", "));
    }
    if let Some((_, text)) = TOPICS.iter().find(|(name, _)| *name == topic) {
        return (*text).to_string();
    }
    for (name, text) in TOPICS {
        if name.contains(&topic) || topic.contains(name) {
            return (*text).to_string();
        }
    }
    format!("No help about '{}' available, use help(index) for the index", topic)
}
