//! Gateway payload normalization.
//!
//! Gateway flows are assembled per rig, so the live payload shape varies
//! between deployments: flat `{"angle": ..}` objects, nested sensor groups,
//! wrapper objects like `{"value": ..}`, and unit-suffixed strings such as
//! `"12.34 deg"` all occur in the field. This module is the single place
//! that understands those shapes — everything downstream sees only
//! [`Reading`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Fixed-shape result of normalizing one live payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Both channels resolved to finite numbers.
    Complete { angle: f64, torque: f64 },
    /// Exactly one channel resolved.
    Partial {
        angle: Option<f64>,
        torque: Option<f64>,
    },
    /// Nothing usable in the payload, or the gateway was unreachable.
    Empty,
}

impl Reading {
    /// Build a reading from independently-resolved channels.
    pub fn from_channels(angle: Option<f64>, torque: Option<f64>) -> Self {
        match (angle, torque) {
            (Some(angle), Some(torque)) => Self::Complete { angle, torque },
            (None, None) => Self::Empty,
            (angle, torque) => Self::Partial { angle, torque },
        }
    }

    pub fn angle(&self) -> Option<f64> {
        match self {
            Self::Complete { angle, .. } => Some(*angle),
            Self::Partial { angle, .. } => *angle,
            Self::Empty => None,
        }
    }

    pub fn torque(&self) -> Option<f64> {
        match self {
            Self::Complete { torque, .. } => Some(*torque),
            Self::Partial { torque, .. } => *torque,
            Self::Empty => None,
        }
    }
}

/// Keys that name the angle channel outright.
const ANGLE_ALIASES: &[&str] = &[
    "angle",
    "position_deg",
    "position",
    "theta",
    "angle_deg",
    "angular_position",
    "pos",
    "deg",
    "mechanical_angle",
    "encoder_position",
    "encoder_deg",
    "theta_deg",
];

/// Substrings that mark a key as angle-like during deep descent.
const ANGLE_HINTS: &[&str] = &["angle", "position", "theta", "pos", "deg", "encoder"];

const TORQUE_ALIASES: &[&str] = &[
    "torque",
    "torque_nm",
    "load_torque",
    "current_torque",
    "tq",
    "load_torque_nm",
    "motor_torque",
    "output_torque",
    "torque_value",
];

const TORQUE_HINTS: &[&str] = &["torque", "load", "nm", "tq"];

/// Wrapper-object keys that carry the actual reading.
const VALUE_KEYS: &[&str] = &["value", "val", "data", "v", "current"];

/// Normalize one raw live payload into a [`Reading`].
///
/// Fields that are absent or non-numeric resolve to `None`; they are never
/// defaulted to zero.
pub fn normalize(payload: &Value) -> Reading {
    let angle = find_numeric_deep(payload, ANGLE_ALIASES, ANGLE_HINTS);
    let torque = find_numeric_deep(payload, TORQUE_ALIASES, TORQUE_HINTS);
    Reading::from_channels(angle, torque)
}

fn numeric_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").ok()).as_ref()
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Strict numeric conversion: a JSON number, or a string that parses whole.
fn direct_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite),
        _ => None,
    }
}

/// Loose numeric extraction for a value sitting under a matched key.
///
/// Strings may carry unit suffixes ("12.34 deg"); wrapper objects expose the
/// reading under a well-known key or as their only convertible member.
fn extract_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => numeric_re()?
            .find(s)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .and_then(finite),
        Value::Object(map) => {
            for key in VALUE_KEYS {
                if let Some(v) = map.get(*key) {
                    if let Some(n) = direct_number(v) {
                        return Some(n);
                    }
                }
            }
            map.values().find_map(direct_number)
        }
        _ => None,
    }
}

/// Depth-first search for a numeric channel value.
///
/// Keys matching an alias or hint at the current level win before any
/// descent, so a flat payload is never shadowed by nested noise.
fn find_numeric_deep(value: &Value, aliases: &[&str], hints: &[&str]) -> Option<f64> {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let key_lower = key.to_lowercase();
                if aliases.contains(&key_lower.as_str())
                    || hints.iter().any(|h| key_lower.contains(h))
                {
                    if let Some(n) = extract_numeric(v) {
                        return Some(n);
                    }
                }
            }
            map.values()
                .find_map(|v| find_numeric_deep(v, aliases, hints))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|v| find_numeric_deep(v, aliases, hints)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_payload() {
        let reading = normalize(&json!({"angle": 1.5, "torque": -3.25}));
        assert_eq!(
            reading,
            Reading::Complete {
                angle: 1.5,
                torque: -3.25
            }
        );
    }

    #[test]
    fn test_alias_keys() {
        let reading = normalize(&json!({"position_deg": 12.0, "torque_nm": 4.5}));
        assert_eq!(reading.angle(), Some(12.0));
        assert_eq!(reading.torque(), Some(4.5));
    }

    #[test]
    fn test_unit_suffixed_string() {
        let reading = normalize(&json!({"theta": "12.34 deg", "torque": "-0.5 Nm"}));
        assert_eq!(reading.angle(), Some(12.34));
        assert_eq!(reading.torque(), Some(-0.5));
    }

    #[test]
    fn test_nested_groups_and_wrappers() {
        let payload = json!({
            "meta": {"rig": "HR-120"},
            "channels": {
                "encoder_position": {"value": 7.25, "unit": "deg"},
                "load": {"torque": 2.5}
            }
        });
        let reading = normalize(&payload);
        assert_eq!(reading.angle(), Some(7.25));
        assert_eq!(reading.torque(), Some(2.5));
    }

    #[test]
    fn test_missing_channel_is_partial_never_zero() {
        let reading = normalize(&json!({"torque": 5.0}));
        assert_eq!(
            reading,
            Reading::Partial {
                angle: None,
                torque: Some(5.0)
            }
        );
    }

    #[test]
    fn test_unusable_payload_is_empty() {
        assert_eq!(normalize(&json!({"status": "ok"})), Reading::Empty);
        assert_eq!(normalize(&json!(null)), Reading::Empty);
        assert_eq!(normalize(&json!([])), Reading::Empty);
    }

    #[test]
    fn test_non_finite_rejected() {
        // JSON cannot carry NaN, but strings can smuggle one in.
        let reading = normalize(&json!({"angle": "NaN", "torque": "inf"}));
        assert_eq!(reading, Reading::Empty);
    }

    #[test]
    fn test_array_of_channel_objects() {
        let payload = json!([
            {"name": "temp", "value": 40.0},
            {"angular_position": "3.5"},
            {"output_torque": 9.0}
        ]);
        let reading = normalize(&payload);
        assert_eq!(reading.angle(), Some(3.5));
        assert_eq!(reading.torque(), Some(9.0));
    }
}
