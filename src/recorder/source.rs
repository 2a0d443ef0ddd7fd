//! Sample source abstraction for the hysteresis recorder.
//!
//! Provides a unified trait for reading one angle/torque pair per sampling
//! tick, with two implementations: the live DAQ gateway and a synthetic
//! generator for bench-less development.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rand::Rng;

use crate::gateway::{GatewayClient, Reading};

/// Trait abstracting where live angle/torque readings come from.
///
/// Each call is one independent read; implementations absorb their own
/// failures and surface them as [`Reading::Empty`]. No retry, no backoff —
/// the sampling timer provides the cadence.
#[async_trait]
pub trait SampleSource: Send + Sync + 'static {
    /// Read the current angle/torque channels.
    async fn fetch_sample(&self) -> Reading;

    /// Human-readable name for logging (e.g. "gateway", "synthetic").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Gateway Source
// ============================================================================

/// Reads live values from the DAQ gateway over HTTP.
pub struct GatewaySource {
    client: Arc<GatewayClient>,
}

impl GatewaySource {
    pub fn new(client: Arc<GatewayClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SampleSource for GatewaySource {
    async fn fetch_sample(&self) -> Reading {
        // GatewayClient::fetch_current already maps failures to Empty.
        self.client.fetch_current().await
    }

    fn source_name(&self) -> &str {
        "gateway"
    }
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Generates a plausible hysteresis loop without any hardware attached.
///
/// Angle follows a sine sweep; torque follows the same sweep with a
/// direction-dependent backlash offset, which is what produces the open
/// loop in the torque-vs-angle plane. Both channels carry a little noise.
pub struct SyntheticSource {
    started: Instant,
    /// Sweep period in seconds
    period_secs: f64,
    /// Angle sweep amplitude (deg)
    angle_amplitude: f64,
    /// Torque sweep amplitude (N·m)
    torque_amplitude: f64,
    /// Direction-dependent torque offset (N·m)
    backlash_offset: f64,
    /// Time multiplier (>1 compresses the sweep)
    speed: f64,
}

impl SyntheticSource {
    pub fn new(speed: f64) -> Self {
        Self {
            started: Instant::now(),
            period_secs: 10.0,
            angle_amplitude: 5.0,
            torque_amplitude: 8.0,
            backlash_offset: 0.5,
            speed: if speed > 0.0 { speed } else { 1.0 },
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn fetch_sample(&self) -> Reading {
        let t = self.started.elapsed().as_secs_f64() * self.speed;
        let phase = (2.0 * std::f64::consts::PI * t / self.period_secs).sin();

        let mut rng = rand::thread_rng();
        let angle = self.angle_amplitude * phase + 0.1 * rng.gen::<f64>();
        let offset = if phase > 0.0 {
            self.backlash_offset
        } else {
            -self.backlash_offset
        };
        let torque = self.torque_amplitude * phase + offset + 0.1 * rng.gen::<f64>();

        Reading::Complete { angle, torque }
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_source_always_complete_and_finite() {
        let source = SyntheticSource::new(60.0);
        for _ in 0..50 {
            match source.fetch_sample().await {
                Reading::Complete { angle, torque } => {
                    assert!(angle.is_finite());
                    assert!(torque.is_finite());
                    assert!(angle.abs() <= 5.2);
                    assert!(torque.abs() <= 8.7);
                }
                other => panic!("synthetic source returned {other:?}"),
            }
        }
    }
}
