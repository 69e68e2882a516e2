//! The built-in rule kinds.
//!
//! Each kind is a parameter struct (deserialized from the rule's params with
//! unknown names rejected) and an evaluator built from it. Evaluators only
//! see present, non-null values; absence and null are handled once by the
//! `Evaluator` trait.

use serde::{
    de::{DeserializeOwned, Error as _},
    Deserialize, Deserializer,
};
use serde_json::{Map, Number, Value};

use docqa_contracts::rule::{Evaluation, Verdict};
use docqa_core::traits::Evaluator;

/// Deserialize `params` into a kind's parameter struct.
pub(crate) fn parse_params<P: DeserializeOwned>(
    kind: &str,
    params: &Map<String, Value>,
) -> Result<P, String> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| format!("invalid parameters for '{kind}': {e}"))
}

/// Name of a JSON value's category, as used in diagnostics.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn default_true() -> bool {
    true
}

// ── exists / not_null ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

/// Passes any present, non-null value. Used for both `exists` and
/// `not_null`; they differ only in name.
pub struct Present;

impl Present {
    pub fn bind(kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let NoParams {} = parse_params(kind, params)?;
        Ok(Box::new(Present))
    }
}

impl Evaluator for Present {
    fn check(&self, _value: &Value) -> Evaluation {
        Evaluation::pass()
    }
}

// ── type ──────────────────────────────────────────────────────────────────────

/// Expected category of a `type` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[serde(alias = "str")]
    String,
    /// Any number, integral or not.
    Number,
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "dict")]
    Object,
    #[serde(alias = "list")]
    Array,
}

impl ValueType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Float => value.is_f64(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Object => value.is_object(),
            ValueType::Array => value.is_array(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeParams {
    expected: ValueType,
}

pub struct TypeCheck {
    expected: ValueType,
}

impl TypeCheck {
    pub fn new(expected: ValueType) -> Self {
        Self { expected }
    }

    pub fn bind(kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let p: TypeParams = parse_params(kind, params)?;
        Ok(Box::new(Self::new(p.expected)))
    }
}

impl Evaluator for TypeCheck {
    fn check(&self, value: &Value) -> Evaluation {
        if self.expected.matches(value) {
            Evaluation::pass()
        } else {
            Evaluation::fail(
                Verdict::FailType,
                format!("expected {}, found {}", self.expected.as_str(), json_kind(value)),
            )
        }
    }
}

// ── categorical ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoricalParams {
    allowed: Vec<Value>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

/// Membership in a fixed set of scalars.
pub struct Categorical {
    /// Allowed values, strings lowercased when matching is case-insensitive.
    folded: Vec<Value>,
    /// The set as configured, for diagnostics.
    display: String,
    case_sensitive: bool,
}

impl Categorical {
    pub fn new(allowed: Vec<Value>, case_sensitive: bool) -> Result<Self, String> {
        if allowed.is_empty() {
            return Err("'allowed' must list at least one value".to_string());
        }
        if let Some(bad) = allowed
            .iter()
            .find(|v| !(v.is_string() || v.is_number() || v.is_boolean()))
        {
            return Err(format!("'allowed' may only hold scalars, found {bad}"));
        }

        let display = Value::Array(allowed.clone()).to_string();
        let folded = allowed
            .into_iter()
            .map(|v| fold(v, case_sensitive))
            .collect();
        Ok(Self {
            folded,
            display,
            case_sensitive,
        })
    }

    pub fn bind(kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let p: CategoricalParams = parse_params(kind, params)?;
        Ok(Box::new(Self::new(p.allowed, p.case_sensitive)?))
    }

    fn contains(&self, value: &Value) -> bool {
        match value {
            Value::String(s) if !self.case_sensitive => {
                let s = s.to_lowercase();
                self.folded.iter().any(|a| a.as_str() == Some(s.as_str()))
            }
            Value::Number(n) => self
                .folded
                .iter()
                .any(|a| matches!(a, Value::Number(a) if numbers_equal(a, n))),
            other => self.folded.iter().any(|a| a == other),
        }
    }
}

/// Integers compare exactly; a float on either side compares as `f64`.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
    }
}

fn fold(value: Value, case_sensitive: bool) -> Value {
    match value {
        Value::String(s) if !case_sensitive => Value::String(s.to_lowercase()),
        other => other,
    }
}

impl Evaluator for Categorical {
    fn check(&self, value: &Value) -> Evaluation {
        if self.contains(value) {
            Evaluation::pass()
        } else {
            Evaluation::fail(
                Verdict::FailValue,
                format!("{value} is not one of {}", self.display),
            )
        }
    }
}

// ── range ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeParams {
    #[serde(default, deserialize_with = "finite_bound")]
    min: Option<f64>,
    #[serde(default, deserialize_with = "finite_bound")]
    max: Option<f64>,
    #[serde(default = "default_true")]
    min_inclusive: bool,
    #[serde(default = "default_true")]
    max_inclusive: bool,
}

/// A bound that is given must be a finite number. An omitted bound is open,
/// but an explicit `null` is not (TOML `nan` arrives as `null`).
fn finite_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
        Some(v) if v.is_finite() => Ok(Some(v)),
        Some(v) => Err(D::Error::custom(format!("bound {v} is not a finite number"))),
        None => Err(D::Error::custom("bound is null; omit it for an open side")),
    }
}

/// Numeric bounds; either side may be open.
#[derive(Debug)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl Range {
    /// Inclusive bounds.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, String> {
        Self::with_inclusivity(min, max, true, true)
    }

    pub fn with_inclusivity(
        min: Option<f64>,
        max: Option<f64>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Result<Self, String> {
        if let Some(bad) = min.into_iter().chain(max).find(|v| !v.is_finite()) {
            return Err(format!("bound {bad} is not a finite number"));
        }
        match (min, max) {
            (None, None) => {
                return Err("at least one of 'min' or 'max' is required".to_string())
            }
            (Some(lo), Some(hi)) if lo > hi => {
                return Err(format!("'min' ({lo}) is greater than 'max' ({hi})"))
            }
            _ => {}
        }
        Ok(Self {
            min,
            max,
            min_inclusive,
            max_inclusive,
        })
    }

    pub fn bind(kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let p: RangeParams = parse_params(kind, params)?;
        Ok(Box::new(Self::with_inclusivity(
            p.min,
            p.max,
            p.min_inclusive,
            p.max_inclusive,
        )?))
    }

    fn contains(&self, x: f64) -> bool {
        let above_min = match self.min {
            Some(lo) if self.min_inclusive => x >= lo,
            Some(lo) => x > lo,
            None => true,
        };
        let below_max = match self.max {
            Some(hi) if self.max_inclusive => x <= hi,
            Some(hi) => x < hi,
            None => true,
        };
        above_min && below_max
    }

    fn describe(&self) -> String {
        let lo = self.min.map_or("-inf".to_string(), |v| v.to_string());
        let hi = self.max.map_or("inf".to_string(), |v| v.to_string());
        let open = if self.min_inclusive && self.min.is_some() { '[' } else { '(' };
        let close = if self.max_inclusive && self.max.is_some() { ']' } else { ')' };
        format!("{open}{lo}, {hi}{close}")
    }
}

impl Evaluator for Range {
    fn check(&self, value: &Value) -> Evaluation {
        match value.as_f64() {
            None => Evaluation::fail(
                Verdict::FailType,
                format!("expected a number, found {}", json_kind(value)),
            ),
            Some(x) if self.contains(x) => Evaluation::pass(),
            Some(_) => Evaluation::fail(
                Verdict::FailRange,
                format!("{value} is outside {}", self.describe()),
            ),
        }
    }
}

// ── keywords ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeywordParams {
    required: Vec<String>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

/// Every marker must occur as a substring of the value.
pub struct Keywords {
    required: Vec<String>,
    folded: Vec<String>,
    case_sensitive: bool,
}

impl Keywords {
    pub fn new(required: Vec<String>, case_sensitive: bool) -> Result<Self, String> {
        if required.is_empty() {
            return Err("'required' must list at least one marker".to_string());
        }
        if required.iter().any(String::is_empty) {
            return Err("'required' markers must not be empty".to_string());
        }
        let folded = if case_sensitive {
            required.clone()
        } else {
            required.iter().map(|m| m.to_lowercase()).collect()
        };
        Ok(Self {
            required,
            folded,
            case_sensitive,
        })
    }

    pub fn bind(kind: &str, params: &Map<String, Value>) -> Result<Box<dyn Evaluator>, String> {
        let p: KeywordParams = parse_params(kind, params)?;
        Ok(Box::new(Self::new(p.required, p.case_sensitive)?))
    }
}

impl Evaluator for Keywords {
    fn check(&self, value: &Value) -> Evaluation {
        let Some(text) = value.as_str() else {
            return Evaluation::fail(
                Verdict::FailType,
                format!("expected a string, found {}", json_kind(value)),
            );
        };

        let haystack = if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };
        let missing: Vec<String> = self
            .required
            .iter()
            .zip(&self.folded)
            .filter(|(_, needle)| !haystack.contains(needle.as_str()))
            .map(|(marker, _)| format!("'{marker}'"))
            .collect();

        if missing.is_empty() {
            Evaluation::pass()
        } else {
            Evaluation::fail(
                Verdict::FailPattern,
                format!("missing {}", missing.join(", ")),
            )
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
