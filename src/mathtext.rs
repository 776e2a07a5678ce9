//! Mathtext markup translation
//!
//! Labels in the model layer are written in a small TeX-like markup
//! (`W_{phase}`, `\frac{1}{2}`, `\larger`, Greek letters). Two renderings are
//! derived from it:
//!
//! - [`plot_safe`] / [`handle_customs`] - markup for a mathtext-capable plot
//!   renderer, with Greek letters wrapped as `$\name$` and a font size hint
//! - [`string_safe`] - plain human-readable text for table headers and logs
//!
//! Both are driven by ordered [`RuleTable`]s. Rules run top to bottom, each on
//! the output of the previous one, so order matters: `\larger` must be
//! stripped before `\large`, and the single-character `\frac` rule must run
//! before the multi-character one.

use crate::error::{Result, XrdError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Font size hint when the text contains `\larger`
pub const FONT_SIZE_LARGER: u32 = 20;
/// Font size hint when the text contains `\large`
pub const FONT_SIZE_LARGE: u32 = 15;
/// Default font size hint
pub const FONT_SIZE_NORMAL: u32 = 10;

/// Largest denominator considered by [`mt_frac`]
pub const MAX_DENOMINATOR: u64 = 1_000_000;

/// One substitution step
#[derive(Debug, Clone)]
pub enum Rule {
    /// Replace every occurrence of a literal
    Literal {
        from: &'static str,
        to: &'static str,
    },
    /// Replace every match of a pattern (`${n}` refers to capture groups)
    Pattern {
        pattern: Regex,
        replacement: &'static str,
    },
}

impl Rule {
    pub const fn literal(from: &'static str, to: &'static str) -> Self {
        Rule::Literal { from, to }
    }

    /// Build a pattern rule; panics on an invalid pattern
    fn pattern(pattern: &str, replacement: &'static str) -> Self {
        Rule::Pattern {
            pattern: Regex::new(pattern).expect("invalid built-in markup pattern"),
            replacement,
        }
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match self {
            Rule::Literal { from, to } => {
                if text.contains(from) {
                    Cow::Owned(text.replace(from, to))
                } else {
                    Cow::Borrowed(text)
                }
            }
            Rule::Pattern {
                pattern,
                replacement,
            } => pattern.replace_all(text, *replacement),
        }
    }
}

/// Ordered list of [`Rule`]s
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every rule in order
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
    }
}

/// Symbols rewritten for the plot renderer
static PLOT_RULES: Lazy<RuleTable> = Lazy::new(|| {
    RuleTable::new(vec![
        Rule::literal("²", "$^{2}$"),
        Rule::literal("³", "$^{3}$"),
        Rule::literal("α", r"$\alpha$"),
        Rule::literal("β", r"$\beta$"),
        Rule::literal("γ", r"$\gamma$"),
        Rule::literal("δ", r"$\delta$"),
        Rule::literal("η", r"$\eta$"),
        Rule::literal("ι", r"$\iota$"),
        Rule::literal("κ", r"$\kappa$"),
        Rule::literal("λ", r"$\lambda$"),
        Rule::literal("μ", r"$\mu$"),
        Rule::literal("ω", r"$\omega$"),
        Rule::literal("φ", r"$\phi$"),
        Rule::literal("π", r"$\pi$"),
        Rule::literal("ψ", r"$\psi$"),
        Rule::literal("ρ", r"$\rho$"),
        Rule::literal("σ", r"$\sigma$"),
        Rule::literal("τ", r"$\tau$"),
        Rule::literal("θ", r"$\theta$"),
        Rule::literal("υ", r"$\upsilon$"),
        Rule::literal("ξ", r"$\xi$"),
        Rule::literal("ζ", r"$\zeta$"),
        Rule::literal(r"\larger", ""),
        Rule::literal(r"\large", ""),
    ])
});

/// Markup stripped or substituted for plain text
static STRING_LITERAL_RULES: Lazy<RuleTable> = Lazy::new(|| {
    RuleTable::new(vec![
        Rule::literal("$", ""),
        Rule::literal(r"\larger", ""),
        Rule::literal(r"\left", ""),
        Rule::literal(r"\right", ""),
        Rule::literal(r"\leq", "≤"),
        Rule::literal(r"\geq", "≥"),
        Rule::literal(r"\large", ""),
        Rule::literal(r"\newline", "\n"),
    ])
});

/// Structural markup rewritten for plain text
static STRING_PATTERN_RULES: Lazy<RuleTable> = Lazy::new(|| {
    RuleTable::new(vec![
        Rule::pattern(r"\\sum_\{(\S+)\}\^\{(\S+)\}", "Σ(${1}->${2})"),
        Rule::pattern(r"(\S+)_(?:\{(\S+)\})", "${1}${2}"),
        Rule::pattern(r"(\S+)_(\S+)", "${1}${2}"),
        // Single-character arguments first
        Rule::pattern(r"\\frac\{([^}])\}\{([^}])\}", r"${1}\${2}"),
        Rule::pattern(r"\\frac\{(.+)\}\{(.+)\}", r"(${1})\(${2})"),
        Rule::pattern(r"\(\{([^})]+)\}\)", "(${1})"),
    ])
});

/// Font size hint for a piece of markup
pub fn font_size(text: &str) -> u32 {
    if text.contains(r"\larger") {
        FONT_SIZE_LARGER
    } else if text.contains(r"\large") {
        FONT_SIZE_LARGE
    } else {
        FONT_SIZE_NORMAL
    }
}

/// Rewrite markup for the plot renderer
///
/// Returns the text split on `\newline` into independent fragments, each with
/// symbols substituted and empty `$$` pairs collapsed, together with the font
/// size hint. `"a\newlineb"` yields `["a", "b"]`.
pub fn handle_customs(text: &str) -> (Vec<String>, u32) {
    let size = font_size(text);
    let fragments = text
        .split(r"\newline")
        .map(|fragment| PLOT_RULES.apply(fragment).replace("$$", ""))
        .collect();
    (fragments, size)
}

/// [`handle_customs`] for raw bytes, which must be valid UTF-8
pub fn handle_customs_bytes(bytes: &[u8]) -> Result<(Vec<String>, u32)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| XrdError::Markup(format!("label is not valid UTF-8: {}", e)))?;
    Ok(handle_customs(text))
}

/// Plot-renderer markup as a single string
pub fn plot_safe(text: &str) -> String {
    handle_customs(text).0.concat()
}

/// Plain human-readable rendering of markup
pub fn string_safe(text: &str) -> String {
    let stripped = STRING_LITERAL_RULES.apply(text);
    STRING_PATTERN_RULES.apply(&stripped)
}

/// Markup for the closest fraction to `value`
///
/// Uses the best rational approximation with a denominator of at most
/// [`MAX_DENOMINATOR`]; whole numbers are written without `\frac`.
pub fn mt_frac(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 {
        // Whole numbers past the i64 range are written out in full
        return if value.abs() < i64::MAX as f64 {
            format!("{}", value as i64)
        } else {
            format!("{:.0}", value)
        };
    }
    let (numerator, denominator) = limit_denominator(value, MAX_DENOMINATOR);
    if denominator > 1 {
        format!(r"\frac{{{}}}{{{}}}", numerator, denominator)
    } else {
        format!("{}", numerator)
    }
}

/// Markup for `lower <= name <= upper`
pub fn mt_range(lower: f64, name: &str, upper: f64) -> String {
    format!(
        r"\left({{ {} \leq {} \leq {} }}\right)",
        mt_frac(lower),
        name,
        mt_frac(upper)
    )
}

/// Closest fraction `n/d` to `value` with `d <= max_denominator`
///
/// Walks the continued fraction expansion and, once the denominator limit is
/// hit, picks between the last convergent and the best semiconvergent.
fn limit_denominator(value: f64, max_denominator: u64) -> (i64, u64) {
    let negative = value < 0.0;
    let target = value.abs();

    let (mut p0, mut q0, mut p1, mut q1) = (0u64, 1u64, 1u64, 0u64);
    let mut x = target;
    loop {
        let a = x.floor();
        if a > u64::MAX as f64 / 2.0 {
            break;
        }
        let a = a as u64;
        let q2 = match a.checked_mul(q1).and_then(|v| v.checked_add(q0)) {
            Some(q2) if q2 <= max_denominator => q2,
            _ => {
                // Denominator limit reached: consider the semiconvergent
                let k = if q1 == 0 { 0 } else { (max_denominator - q0) / q1 };
                let (sp, sq) = (p0 + k * p1, q0 + k * q1);
                if q1 == 0 || sq == 0 {
                    break;
                }
                let semi = sp as f64 / sq as f64;
                let conv = p1 as f64 / q1 as f64;
                if (semi - target).abs() < (conv - target).abs() {
                    p1 = sp;
                    q1 = sq;
                }
                break;
            }
        };
        let p2 = a.saturating_mul(p1).saturating_add(p0);
        (p0, q0, p1, q1) = (p1, q1, p2, q2);

        let frac = x - x.floor();
        if frac <= f64::EPSILON * x.max(1.0) || (p1 as f64 / q1 as f64) == target {
            break;
        }
        x = 1.0 / frac;
    }

    if q1 == 0 {
        return (if negative { -(target.round() as i64) } else { target.round() as i64 }, 1);
    }
    let numerator = p1 as i64;
    (if negative { -numerator } else { numerator }, q1)
}
