//! Recorded angle/torque samples

use serde::{Deserialize, Serialize};

/// One angle/torque reading captured during a recording session.
///
/// Immutable once created. Serializes with camelCase field names to match
/// the dashboard wire format and the persisted snapshot schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Angular displacement (deg)
    pub angle: f64,
    /// Output torque (N·m)
    pub torque: f64,
    /// Capture time, epoch milliseconds
    pub timestamp: u64,
    /// Milliseconds since the recording session started
    #[serde(default)]
    pub relative_time: u64,
}

impl Sample {
    /// Seconds elapsed from session start to this sample.
    pub fn elapsed_secs(&self) -> f64 {
        self.relative_time as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_wire_format() {
        let sample = Sample {
            angle: 1.5,
            torque: -2.25,
            timestamp: 1_700_000_000_000,
            relative_time: 1500,
        };

        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["angle"], 1.5);
        assert_eq!(json["torque"], -2.25);
        assert_eq!(json["relativeTime"], 1500);

        let back: Sample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_relative_time_defaults_to_zero() {
        // Points pushed by older gateway flows omit relativeTime.
        let raw = serde_json::json!({"angle": 0.5, "torque": 3.0, "timestamp": 42});
        let sample: Sample = serde_json::from_value(raw).unwrap();
        assert_eq!(sample.relative_time, 0);
    }
}
