//! Logic levels and component values.
//!
//! [`LogicLevel`] is the four-valued domain carried by every terminal and
//! wire. [`Value`] is what a component caches between recalculations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── LogicLevel ────────────────────────────────────────────────────────

/// A four-valued logic level.
///
/// All four levels are distinct under `==`: `Unknown` is not equal to
/// `False`, and `HighImpedance` is not equal to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicLevel {
    #[default]
    False,
    True,
    Unknown,
    HighImpedance,
}

impl LogicLevel {
    #[inline]
    pub fn from_bool(b: bool) -> Self {
        if b {
            LogicLevel::True
        } else {
            LogicLevel::False
        }
    }

    /// `true` for `False` and `True`.
    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, LogicLevel::False | LogicLevel::True)
    }

    /// The boolean value, if the level is defined.
    #[inline]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            LogicLevel::False => Some(false),
            LogicLevel::True => Some(true),
            LogicLevel::Unknown | LogicLevel::HighImpedance => None,
        }
    }

    /// Logical negation. Undefined levels negate to `Unknown`.
    pub fn not(self) -> Self {
        match self.as_bool() {
            Some(b) => Self::from_bool(!b),
            None => LogicLevel::Unknown,
        }
    }

    /// Logical AND. A defined `False` dominates an undefined operand.
    pub fn and(self, other: Self) -> Self {
        match (self.as_bool(), other.as_bool()) {
            (Some(false), _) | (_, Some(false)) => LogicLevel::False,
            (Some(true), Some(true)) => LogicLevel::True,
            _ => LogicLevel::Unknown,
        }
    }

    /// Logical OR. A defined `True` dominates an undefined operand.
    pub fn or(self, other: Self) -> Self {
        match (self.as_bool(), other.as_bool()) {
            (Some(true), _) | (_, Some(true)) => LogicLevel::True,
            (Some(false), Some(false)) => LogicLevel::False,
            _ => LogicLevel::Unknown,
        }
    }
}

impl From<bool> for LogicLevel {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl std::fmt::Display for LogicLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogicLevel::False => "0",
            LogicLevel::True => "1",
            LogicLevel::Unknown => "?",
            LogicLevel::HighImpedance => "Z",
        };
        f.write_str(s)
    }
}

// Persisted as `false`, `true`, `"?"` and `"Z"`.
impl Serialize for LogicLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogicLevel::False => serializer.serialize_bool(false),
            LogicLevel::True => serializer.serialize_bool(true),
            LogicLevel::Unknown => serializer.serialize_str("?"),
            LogicLevel::HighImpedance => serializer.serialize_str("Z"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Bool(bool),
    Text(String),
}

impl<'de> Deserialize<'de> for LogicLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match LevelRepr::deserialize(deserializer)? {
            LevelRepr::Bool(b) => Ok(LogicLevel::from_bool(b)),
            LevelRepr::Text(s) => match s.as_str() {
                "?" => Ok(LogicLevel::Unknown),
                "Z" => Ok(LogicLevel::HighImpedance),
                other => Err(serde::de::Error::custom(format!(
                    "invalid logic level {:?}",
                    other
                ))),
            },
        }
    }
}

// ── Value ─────────────────────────────────────────────────────────────

/// The cached value of a component.
///
/// Compared with deep equality when deciding whether a recalculation
/// changed anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    /// A single level (one-output components).
    Level(LogicLevel),
    /// One level per output terminal, in flat output order.
    Bits(Vec<LogicLevel>),
    /// Heterogeneous parts, flattened in order.
    Tuple(Vec<Value>),
}

impl Value {
    /// A value with `width` `Unknown` levels.
    pub fn unknown(width: usize) -> Self {
        match width {
            1 => Value::Level(LogicLevel::Unknown),
            n => Value::Bits(vec![LogicLevel::Unknown; n]),
        }
    }

    /// Flatten into levels in output-terminal order.
    pub fn levels(&self) -> Vec<LogicLevel> {
        let mut out = Vec::new();
        self.collect_levels(&mut out);
        out
    }

    fn collect_levels(&self, out: &mut Vec<LogicLevel>) {
        match self {
            Value::Level(l) => out.push(*l),
            Value::Bits(bits) => out.extend_from_slice(bits),
            Value::Tuple(parts) => {
                for part in parts {
                    part.collect_levels(out);
                }
            }
        }
    }
}

impl From<LogicLevel> for Value {
    fn from(level: LogicLevel) -> Self {
        Value::Level(level)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Bits(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LogicLevel::*;

    #[test]
    fn test_levels_are_distinct() {
        assert_ne!(Unknown, HighImpedance);
        assert_ne!(Unknown, False);
        assert_ne!(HighImpedance, False);
    }

    #[test]
    fn test_truth_tables() {
        assert_eq!(True.not(), False);
        assert_eq!(HighImpedance.not(), Unknown);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(True.or(HighImpedance), True);
        assert_eq!(False.or(Unknown), Unknown);
    }

    #[test]
    fn test_persisted_form() {
        let json = serde_json::to_string(&vec![False, True, Unknown, HighImpedance]).unwrap();
        assert_eq!(json, r#"[false,true,"?","Z"]"#);
        let back: Vec<LogicLevel> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![False, True, Unknown, HighImpedance]);
        assert!(serde_json::from_str::<LogicLevel>(r#""X""#).is_err());
    }

    #[test]
    fn test_value_flattening() {
        let v = Value::Tuple(vec![Value::Level(True), Value::Bits(vec![False, Unknown])]);
        assert_eq!(v.levels(), vec![True, False, Unknown]);
        assert_eq!(Value::unknown(1), Value::Level(Unknown));
        assert_eq!(Value::unknown(2).levels(), vec![Unknown, Unknown]);
    }

    #[test]
    fn test_value_deep_equality() {
        assert_eq!(Value::Bits(vec![True, False]), Value::Bits(vec![True, False]));
        assert_ne!(Value::Bits(vec![True]), Value::Level(True));
    }
}
