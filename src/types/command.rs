//! Operator test commands forwarded to the rig gateway.

use serde::{Deserialize, Serialize};

/// A test-rig command as accepted from the dashboard and forwarded to the
/// gateway write endpoint.
///
/// The wire format is `{"command": "<name>", ...params}`, matching what the
/// gateway flows expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TestCommand {
    /// Trigger one static-performance sampling pass
    SampleStatic,
    /// Start a dynamic test run
    StartTest {
        test_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rpm: Option<f64>,
    },
    /// Stop the current test run
    StopTest,
    /// Emergency stop — cuts drive power at the rig
    EmergencyStop,
    /// Reset accumulated readings on the rig side
    Reset {
        #[serde(skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },
    /// Set the load level for the brake/load motor
    SetLoadLevel { level: f64 },
    /// Set the drive speed in RPM
    SetSpeedRpm { rpm: f64 },
}

impl TestCommand {
    /// Command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SampleStatic => "sample_static",
            Self::StartTest { .. } => "start_test",
            Self::StopTest => "stop_test",
            Self::EmergencyStop => "emergency_stop",
            Self::Reset { .. } => "reset",
            Self::SetLoadLevel { .. } => "set_load_level",
            Self::SetSpeedRpm { .. } => "set_speed_rpm",
        }
    }
}

/// Outcome of one forwarded command, kept for the dashboard history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub success: bool,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = TestCommand::SetLoadLevel { level: 3.0 };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "set_load_level");
        assert_eq!(json["level"], 3.0);
    }

    #[test]
    fn test_command_roundtrip_with_params() {
        let raw = serde_json::json!({
            "command": "start_test",
            "test_type": "start_torque",
            "level": 2.0,
            "rpm": 1500.0
        });
        let cmd: TestCommand = serde_json::from_value(raw).unwrap();
        assert_eq!(cmd.name(), "start_test");
        match cmd {
            TestCommand::StartTest { test_type, level, rpm } => {
                assert_eq!(test_type, "start_torque");
                assert_eq!(level, Some(2.0));
                assert_eq!(rpm, Some(1500.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bare_command_has_no_extra_fields() {
        let json = serde_json::to_value(TestCommand::EmergencyStop).unwrap();
        assert_eq!(json, serde_json::json!({"command": "emergency_stop"}));
    }
}
