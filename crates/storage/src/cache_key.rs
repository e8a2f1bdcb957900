//! Deterministic cache keys.
//!
//! Request parameters are canonicalized (floats rounded to 6 decimals,
//! fields sorted by name), serialized to JSON and digested with MD5. Equal
//! requests up to rounding therefore map to the same key regardless of the
//! order the parameters were supplied in.
//!
//! The JSON layout uses `": "` and `", "` separators so keys match those
//! already written to a shared Redis by the Python service.

use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Decimal places kept when canonicalizing float parameters.
const FLOAT_DECIMALS: i32 = 6;

/// A parameter value contributing to a cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Float(f64),
    Text(String),
}

impl From<f64> for CacheValue {
    fn from(v: f64) -> Self {
        CacheValue::Float(v)
    }
}

impl From<&str> for CacheValue {
    fn from(v: &str) -> Self {
        CacheValue::Text(v.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(v: String) -> Self {
        CacheValue::Text(v)
    }
}

impl CacheValue {
    fn canonical(&self) -> Value {
        match self {
            CacheValue::Float(v) => {
                let rounded = round_to(*v, FLOAT_DECIMALS);
                // Collapse -0.0 onto 0.0; non-finite values serialize as null.
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                Number::from_f64(rounded).map_or(Value::Null, Value::Number)
            }
            CacheValue::Text(v) => Value::String(v.clone()),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Opaque cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns request parameters into [`CacheKey`]s.
pub struct CacheKeyCodec;

impl CacheKeyCodec {
    /// Canonical serialized form of a parameter set.
    ///
    /// Fields are sorted by name before serialization, so the output does not
    /// depend on insertion order. Later duplicates of a name replace earlier
    /// ones.
    pub fn canonical_form<'a, I>(params: I) -> String
    where
        I: IntoIterator<Item = (&'a str, CacheValue)>,
    {
        let sorted: BTreeMap<String, Value> = params
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.canonical()))
            .collect();

        let fields: Vec<String> = sorted
            .iter()
            .map(|(name, value)| format!("{}: {}", Value::from(name.as_str()), value))
            .collect();
        format!("{{{}}}", fields.join(", "))
    }

    /// Digest a parameter set into a key: the lowercase hex MD5 of its
    /// canonical form.
    pub fn encode<'a, I>(params: I) -> CacheKey
    where
        I: IntoIterator<Item = (&'a str, CacheValue)>,
    {
        let canonical = Self::canonical_form(params);
        let digest = md5::compute(canonical.as_bytes());
        CacheKey(format!("{:x}", digest))
    }
}
