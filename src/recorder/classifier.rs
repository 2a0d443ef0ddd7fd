//! Hysteresis curve decomposition.

use crate::types::{ClassifiedSeries, Sample};

/// Split a sample log into forward, reverse, and full traces.
///
/// The input is sorted by capture timestamp first — callers may hand in logs
/// whose append order was perturbed by overlapping fetches, or logs loaded
/// from external storage. The sort is stable, so samples with equal
/// timestamps keep their append order.
///
/// The first sample joins the forward trace by convention. For every later
/// sample, a strictly increasing angle sends it to the forward trace and a
/// strictly decreasing angle to the reverse trace; a sample whose angle
/// equals its predecessor's joins neither sub-trace but stays in the full
/// trace. Ties and noise are not smoothed.
pub fn classify(samples: &[Sample]) -> ClassifiedSeries {
    if samples.is_empty() {
        return ClassifiedSeries::default();
    }

    let mut sorted: Vec<Sample> = samples.to_vec();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut forward = Vec::with_capacity(sorted.len());
    let mut reverse = Vec::new();

    for (i, sample) in sorted.iter().enumerate() {
        if i == 0 {
            forward.push(*sample);
            continue;
        }
        let prev_angle = sorted[i - 1].angle;
        if sample.angle > prev_angle {
            forward.push(*sample);
        } else if sample.angle < prev_angle {
            reverse.push(*sample);
        }
    }

    ClassifiedSeries {
        forward,
        reverse,
        full: sorted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(angle: f64, torque: f64, timestamp: u64) -> Sample {
        Sample {
            angle,
            torque,
            timestamp,
            relative_time: timestamp,
        }
    }

    #[test]
    fn test_empty_log() {
        let series = classify(&[]);
        assert!(series.forward.is_empty());
        assert!(series.reverse.is_empty());
        assert!(series.full.is_empty());
    }

    #[test]
    fn test_single_sample_joins_forward() {
        let s = sample(1.0, 2.0, 100);
        let series = classify(&[s]);
        assert_eq!(series.forward, vec![s]);
        assert!(series.reverse.is_empty());
        assert_eq!(series.full, vec![s]);
    }

    #[test]
    fn test_forward_tie_reverse_scenario() {
        // s0 -> s1 rising, s1 -> s2 tie, s2 -> s3 falling
        let s0 = sample(0.0, 0.0, 100);
        let s1 = sample(1.0, 1.0, 200);
        let s2 = sample(1.0, 2.0, 300);
        let s3 = sample(0.0, 3.0, 400);

        let series = classify(&[s0, s1, s2, s3]);

        assert_eq!(series.forward, vec![s0, s1]);
        assert_eq!(series.reverse, vec![s3]);
        assert_eq!(series.full, vec![s0, s1, s2, s3]);
    }

    #[test]
    fn test_completeness_invariant() {
        // forward + reverse + ties == full - 1, and forward[0] == full[0]
        let log: Vec<Sample> = [0.0, 0.5, 1.0, 1.0, 0.8, 0.8, 0.2, 0.9]
            .iter()
            .enumerate()
            .map(|(i, &a)| sample(a, i as f64, 100 + i as u64))
            .collect();

        let series = classify(&log);

        let ties = series
            .full
            .windows(2)
            .filter(|w| w[0].angle == w[1].angle)
            .count();

        // Every sample after the first lands in exactly one of forward,
        // reverse, or the tie bucket; the first sample joins forward by
        // convention on top of that.
        assert_eq!(
            (series.forward.len() - 1) + series.reverse.len() + ties,
            series.full.len() - 1
        );
        assert!(series.forward.len() + series.reverse.len() <= series.full.len());
        assert_eq!(series.forward[0], series.full[0]);
    }

    #[test]
    fn test_idempotent_under_unordered_input() {
        let ordered: Vec<Sample> = (0..20)
            .map(|i| sample((i as f64 * 0.7).sin(), i as f64, 1000 + i as u64))
            .collect();
        let mut shuffled = ordered.clone();
        shuffled.swap(2, 17);
        shuffled.swap(5, 11);
        shuffled.reverse();

        let a = classify(&ordered);
        let b = classify(&shuffled);
        let c = classify(&shuffled);

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(b.full, ordered);
    }

    #[test]
    fn test_monotonic_descent_all_reverse() {
        let log: Vec<Sample> = (0..5)
            .map(|i| sample(10.0 - i as f64, 0.0, 100 + i as u64))
            .collect();
        let series = classify(&log);
        assert_eq!(series.forward.len(), 1); // first sample only, by convention
        assert_eq!(series.reverse.len(), 4);
    }

    #[test]
    fn test_equal_timestamps_keep_append_order() {
        // Paused-clock captures can stamp identical times; the stable sort
        // must not reorder them.
        let s0 = sample(0.0, 0.0, 500);
        let s1 = sample(1.0, 1.0, 500);
        let s2 = sample(2.0, 2.0, 500);
        let series = classify(&[s0, s1, s2]);
        assert_eq!(series.full, vec![s0, s1, s2]);
        assert_eq!(series.forward, vec![s0, s1, s2]);
    }
}
