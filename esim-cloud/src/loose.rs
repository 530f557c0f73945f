//! Loosely-typed JSON scalars
//!
//! Upstream providers return the same field as a number in one response and
//! a numeric string in the next (`"code": 0` vs `"code": "200"`). Adapters
//! decode such fields into [`Loose`] and normalize once at the boundary.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// A JSON scalar that is either a number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(serde_json::Number),
    Text(String),
}

impl Loose {
    /// Canonical text form: integers without a fraction, strings trimmed
    pub fn as_text(&self) -> String {
        match self {
            Loose::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i.to_string(),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
                _ => n.to_string(),
            },
            Loose::Text(s) => s.trim().to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Loose::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Loose::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| Decimal::from_str(s).ok().filter(|d| d.fract().is_zero())?.to_i64())
            }
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Loose::Number(n) => Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
            Loose::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }

    /// True when the value equals one of `codes` in canonical text form
    pub fn is_one_of(&self, codes: &[&str]) -> bool {
        let text = self.as_text();
        codes.iter().any(|c| *c == text)
    }
}

impl fmt::Display for Loose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Loose {
    fn from(s: &str) -> Self {
        Loose::Text(s.to_string())
    }
}

impl From<i64> for Loose {
    fn from(n: i64) -> Self {
        Loose::Number(n.into())
    }
}
