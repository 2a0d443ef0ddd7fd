//! Recording session lifecycle and the sampling timer.
//!
//! Exactly one logical session is active per [`Recorder`]. The session is a
//! two-state machine (Idle, Recording); starting arms a repeating sampling
//! timer, stopping tears it down synchronously and runs the final
//! classification and snapshot.
//!
//! Each timer tick is spawned as its own task, so a slow gateway fetch never
//! blocks the next tick and never deadlocks the timer. The sample log append
//! is the only mutation a tick performs; ordering is re-established by
//! timestamp at classification time, which keeps loosely-ordered appends
//! from overlapping fetches correct.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::classifier::classify;
use super::source::SampleSource;
use crate::snapshot::{RecordingSnapshot, SnapshotStore};
use crate::types::{now_ms, ClassifiedSeries, Sample};

/// Floor for the operator-adjustable sampling period.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 50;

/// A snapshot is written after every this-many appended samples.
const SNAPSHOT_EVERY: usize = 10;

// ============================================================================
// Session State
// ============================================================================

struct SessionState {
    is_recording: bool,
    /// Session start, epoch milliseconds
    start_time: Option<u64>,
    sample_interval_ms: u64,
    /// Most recent good channel values, kept across sessions to smooth
    /// momentary gateway hiccups
    last_known_angle: Option<f64>,
    last_known_torque: Option<f64>,
    /// Append-only while recording; cleared on the next start
    samples: Vec<Sample>,
    series: ClassifiedSeries,
}

impl SessionState {
    fn new(sample_interval_ms: u64) -> Self {
        Self {
            is_recording: false,
            start_time: None,
            sample_interval_ms: sample_interval_ms.max(MIN_SAMPLE_INTERVAL_MS),
            last_known_angle: None,
            last_known_torque: None,
            samples: Vec::new(),
            series: ClassifiedSeries::default(),
        }
    }

    fn snapshot(&self, now: u64) -> RecordingSnapshot {
        RecordingSnapshot {
            data: self.samples.clone(),
            forward_data: self.series.forward.clone(),
            reverse_data: self.series.reverse.clone(),
            hysteresis_data: self.series.full.clone(),
            start_time: self.start_time,
            last_update: now,
        }
    }

    fn duration_secs(&self, now: u64) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let end = self.samples.last().map_or(now, |s| s.timestamp);
        end.saturating_sub(start) as f64 / 1000.0
    }
}

/// Point-in-time view of the recorder for status displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub is_recording: bool,
    pub sample_interval_ms: u64,
    pub point_count: usize,
    pub duration_secs: f64,
    pub started_at: Option<u64>,
}

/// Result of a completed recording, handed to collaborators on stop.
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub points: Vec<Sample>,
    pub series: ClassifiedSeries,
    pub started_at: Option<u64>,
    pub stopped_at: u64,
}

impl FinishedRecording {
    /// Seconds from session start to the last captured sample.
    pub fn duration_secs(&self) -> f64 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        let end = self.points.last().map_or(self.stopped_at, |s| s.timestamp);
        end.saturating_sub(start) as f64 / 1000.0
    }
}

struct SamplerHandle {
    cancel: CancellationToken,
    interval_tx: watch::Sender<u64>,
}

// ============================================================================
// Recorder
// ============================================================================

/// Owner of the recording session, the sample log, and the sampling timer.
///
/// Cheap to clone; all clones share the same session. Construct one per
/// composition root — there is no hidden global instance.
#[derive(Clone)]
pub struct Recorder {
    state: Arc<RwLock<SessionState>>,
    source: Arc<dyn SampleSource>,
    snapshots: Arc<dyn SnapshotStore>,
    sampler: Arc<Mutex<Option<SamplerHandle>>>,
}

impl Recorder {
    pub fn new(
        source: Arc<dyn SampleSource>,
        snapshots: Arc<dyn SnapshotStore>,
        sample_interval_ms: u64,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::new(sample_interval_ms))),
            source,
            snapshots,
            sampler: Arc::new(Mutex::new(None)),
        }
    }

    /// Transition Idle → Recording. A no-op while already recording.
    ///
    /// Resets the sample log and classified series, clears any persisted
    /// snapshot, and arms the sampling timer at the current interval.
    pub async fn start_recording(&self) {
        let mut sampler = self.sampler.lock().await;

        let interval_ms = {
            let mut st = self.state.write().await;
            if st.is_recording {
                return;
            }
            st.is_recording = true;
            st.start_time = Some(now_ms());
            st.samples.clear();
            st.series = ClassifiedSeries::default();
            st.sample_interval_ms
        };

        self.snapshots.clear();

        let cancel = CancellationToken::new();
        let (interval_tx, interval_rx) = watch::channel(interval_ms);
        tokio::spawn(run_sampler(
            Arc::clone(&self.state),
            Arc::clone(&self.source),
            Arc::clone(&self.snapshots),
            interval_rx,
            cancel.clone(),
        ));
        *sampler = Some(SamplerHandle {
            cancel,
            interval_tx,
        });

        info!(
            interval_ms,
            source = self.source.source_name(),
            "hysteresis recording started"
        );
    }

    /// Transition Recording → Idle. A no-op while already idle.
    ///
    /// The sampling timer is cancelled before this returns, so no further
    /// ticks fire afterwards; a tick whose fetch is still in flight will
    /// observe the idle state and drop its sample. The full log is
    /// classified and a final snapshot written; the previous log stays in
    /// memory (and in the snapshot slot) until the next start.
    pub async fn stop_recording(&self) -> Option<FinishedRecording> {
        let mut sampler = self.sampler.lock().await;
        let mut st = self.state.write().await;
        if !st.is_recording {
            return None;
        }
        st.is_recording = false;

        if let Some(handle) = sampler.take() {
            handle.cancel.cancel();
        }

        st.series = classify(&st.samples);
        let stopped_at = now_ms();
        let snapshot = st.snapshot(stopped_at);
        let finished = FinishedRecording {
            points: st.samples.clone(),
            series: st.series.clone(),
            started_at: st.start_time,
            stopped_at,
        };
        drop(st);
        drop(sampler);

        self.snapshots.save(&snapshot);

        info!(
            points = finished.points.len(),
            forward = finished.series.forward.len(),
            reverse = finished.series.reverse.len(),
            "hysteresis recording stopped"
        );

        Some(finished)
    }

    /// Update the sampling period, clamped to [`MIN_SAMPLE_INTERVAL_MS`].
    ///
    /// While recording, the running timer is re-armed at the new period; the
    /// re-arm happens inside the single sampler loop, so exactly one timer
    /// exists afterwards and no tick fires twice at the boundary. Returns
    /// the effective period.
    pub async fn set_sample_interval(&self, interval_ms: u64) -> u64 {
        let effective = interval_ms.max(MIN_SAMPLE_INTERVAL_MS);
        {
            let mut st = self.state.write().await;
            st.sample_interval_ms = effective;
        }

        let sampler = self.sampler.lock().await;
        if let Some(handle) = sampler.as_ref() {
            // Send fails only if the sampler loop already exited.
            let _ = handle.interval_tx.send(effective);
        }
        effective
    }

    pub async fn is_recording(&self) -> bool {
        self.state.read().await.is_recording
    }

    pub async fn sample_interval_ms(&self) -> u64 {
        self.state.read().await.sample_interval_ms
    }

    /// Read-only copy of the sample log.
    pub async fn data(&self) -> Vec<Sample> {
        self.state.read().await.samples.clone()
    }

    /// Re-run classification over the current log and return the result.
    ///
    /// Classification is idempotent and always re-derives from the full
    /// log, so calling this concurrently with appends is safe.
    pub async fn reclassify(&self) -> ClassifiedSeries {
        let mut st = self.state.write().await;
        st.series = classify(&st.samples);
        st.series.clone()
    }

    /// Seconds from session start to the last captured sample (or to now
    /// while none has been captured). Zero if a session never started.
    pub async fn duration_secs(&self) -> f64 {
        self.state.read().await.duration_secs(now_ms())
    }

    pub async fn status(&self) -> RecorderStatus {
        let st = self.state.read().await;
        RecorderStatus {
            is_recording: st.is_recording,
            sample_interval_ms: st.sample_interval_ms,
            point_count: st.samples.len(),
            duration_secs: st.duration_secs(now_ms()),
            started_at: st.start_time,
        }
    }

    /// Seed an idle session from a recovered snapshot (cold start only).
    ///
    /// In-memory state wins while a session exists: this is ignored when a
    /// recording is active or samples are already present.
    pub async fn seed_from_snapshot(&self, snapshot: RecordingSnapshot) {
        let mut st = self.state.write().await;
        if st.is_recording || !st.samples.is_empty() {
            return;
        }
        info!(
            points = snapshot.data.len(),
            "restored in-progress recording from snapshot"
        );
        st.samples = snapshot.data;
        st.series = ClassifiedSeries {
            forward: snapshot.forward_data,
            reverse: snapshot.reverse_data,
            full: snapshot.hysteresis_data,
        };
        st.start_time = snapshot.start_time;
    }
}

// ============================================================================
// Sampling timer
// ============================================================================

/// The single sampling-timer loop for one recording run.
///
/// Holds the only ticker; an interval change re-arms it in place, and the
/// first tick of the new cadence fires one full period later. Each tick is
/// spawned as an independent task so in-flight fetches can overlap without
/// stalling the timer.
async fn run_sampler(
    state: Arc<RwLock<SessionState>>,
    source: Arc<dyn SampleSource>,
    snapshots: Arc<dyn SnapshotStore>,
    mut interval_rx: watch::Receiver<u64>,
    cancel: CancellationToken,
) {
    let mut period = Duration::from_millis(*interval_rx.borrow());
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Biased: cancellation and re-arm take priority over a due tick, so
        // no tick can fire after stop returns and no double tick fires at a
        // rate-change boundary.
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                period = Duration::from_millis(*interval_rx.borrow_and_update());
                ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                debug!(interval_ms = period.as_millis() as u64, "sampling timer re-armed");
            }
            _ = ticker.tick() => {
                let state = Arc::clone(&state);
                let source = Arc::clone(&source);
                let snapshots = Arc::clone(&snapshots);
                tokio::spawn(async move {
                    record_tick(&state, source.as_ref(), snapshots.as_ref()).await;
                });
            }
        }
    }
}

/// One sampling tick: fetch, fall back, append, maybe snapshot.
///
/// A channel the source could not resolve is substituted with the last
/// known good value when one exists; with no fallback available the whole
/// tick is skipped so the log never contains a fabricated reading.
async fn record_tick(
    state: &RwLock<SessionState>,
    source: &dyn SampleSource,
    snapshots: &dyn SnapshotStore,
) {
    // Stamp before the fetch so the sample reflects when the tick fired.
    let now = now_ms();
    let reading = source.fetch_sample().await;

    let mut st = state.write().await;
    if !st.is_recording {
        // Stop landed while the fetch was in flight.
        return;
    }
    let Some(start) = st.start_time else { return };

    let angle = reading.angle().or(st.last_known_angle);
    let torque = reading.torque().or(st.last_known_torque);
    let (Some(angle), Some(torque)) = (angle, torque) else {
        // Expected during startup, before the first good reading.
        debug!("live reading incomplete with no fallback, skipping tick");
        return;
    };

    st.last_known_angle = Some(angle);
    st.last_known_torque = Some(torque);
    st.samples.push(Sample {
        angle,
        torque,
        timestamp: now,
        relative_time: now.saturating_sub(start),
    });

    if st.samples.len() % SNAPSHOT_EVERY == 0 {
        let snapshot = st.snapshot(now);
        drop(st);
        snapshots.save(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Reading;
    use crate::snapshot::InMemorySnapshotStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that replays a scripted sequence of readings, then Empty.
    struct ScriptedSource {
        script: std::sync::Mutex<VecDeque<Reading>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(readings: Vec<Reading>) -> Self {
            Self {
                script: std::sync::Mutex::new(readings.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SampleSource for ScriptedSource {
        async fn fetch_sample(&self) -> Reading {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .ok()
                .and_then(|mut s| s.pop_front())
                .unwrap_or(Reading::Empty)
        }

        fn source_name(&self) -> &str {
            "scripted"
        }
    }

    fn make_recorder(
        readings: Vec<Reading>,
    ) -> (Recorder, Arc<ScriptedSource>, Arc<InMemorySnapshotStore>) {
        let source = Arc::new(ScriptedSource::new(readings));
        let store = Arc::new(InMemorySnapshotStore::new());
        let recorder = Recorder::new(
            Arc::clone(&source) as Arc<dyn SampleSource>,
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            100,
        );
        (recorder, source, store)
    }

    /// Let one pending tick fire and its spawned task complete.
    async fn advance_one_tick(ms: u64) {
        // Newly spawned tasks must register their timers before the clock
        // moves, or the first tick slides a full period late.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let (recorder, _, store) = make_recorder(vec![]);
        assert!(recorder.stop_recording().await.is_none());
        assert!(!store.exists());
        assert_eq!(recorder.status().await.point_count, 0);
    }

    #[tokio::test]
    async fn test_duration_zero_before_first_start() {
        let (recorder, _, _) = make_recorder(vec![]);
        assert_eq!(recorder.duration_secs().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_recording_is_noop() {
        let (recorder, _, _) = make_recorder(vec![]);
        recorder.start_recording().await;
        let started = recorder.status().await.started_at;

        recorder.start_recording().await;
        assert_eq!(recorder.status().await.started_at, started);
        assert!(recorder.is_recording().await);

        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_clears_previous_snapshot() {
        let (recorder, _, store) = make_recorder(vec![]);
        store.save(&RecordingSnapshot {
            last_update: 42,
            ..RecordingSnapshot::default()
        });
        assert!(store.exists());

        recorder.start_recording().await;
        assert!(!store.exists());

        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_forward_tie_reverse() {
        let readings = vec![
            Reading::Complete { angle: 0.0, torque: 0.0 },
            Reading::Complete { angle: 1.0, torque: 1.0 },
            Reading::Complete { angle: 1.0, torque: 2.0 },
            Reading::Complete { angle: 0.0, torque: 3.0 },
        ];
        let (recorder, _, _) = make_recorder(readings);

        recorder.start_recording().await;
        for _ in 0..4 {
            advance_one_tick(100).await;
        }
        let finished = recorder.stop_recording().await.unwrap();

        assert_eq!(finished.points.len(), 4);
        assert_eq!(finished.series.full.len(), 4);
        assert_eq!(finished.series.forward.len(), 2);
        assert_eq!(finished.series.reverse.len(), 1);
        assert_eq!(finished.series.forward[0].torque, 0.0);
        assert_eq!(finished.series.forward[1].torque, 1.0);
        assert_eq!(finished.series.reverse[0].torque, 3.0);
        // The tie sample stays in the full trace only
        assert_eq!(finished.series.full[2].torque, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_tick_without_fallback_is_skipped() {
        let readings = vec![Reading::Partial {
            angle: None,
            torque: Some(5.0),
        }];
        let (recorder, _, _) = make_recorder(readings);

        recorder.start_recording().await;
        advance_one_tick(100).await;

        assert_eq!(recorder.data().await.len(), 0);
        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_known_value_smooths_partial_reading() {
        let readings = vec![
            Reading::Complete { angle: 3.0, torque: 1.0 },
            Reading::Partial {
                angle: None,
                torque: Some(7.0),
            },
        ];
        let (recorder, _, _) = make_recorder(readings);

        recorder.start_recording().await;
        advance_one_tick(100).await;
        advance_one_tick(100).await;

        let data = recorder.data().await;
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].angle, 3.0); // substituted from last known
        assert_eq!(data[1].torque, 7.0);

        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reading_after_good_ones_uses_both_fallbacks() {
        let readings = vec![
            Reading::Complete { angle: 2.0, torque: 4.0 },
            Reading::Empty,
        ];
        let (recorder, _, _) = make_recorder(readings);

        recorder.start_recording().await;
        advance_one_tick(100).await;
        advance_one_tick(100).await;

        let data = recorder.data().await;
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].angle, 2.0);
        assert_eq!(data[1].torque, 4.0);

        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_written_every_tenth_sample() {
        let readings = (0..10)
            .map(|i| Reading::Complete {
                angle: i as f64,
                torque: i as f64,
            })
            .collect();
        let (recorder, _, store) = make_recorder(readings);

        recorder.start_recording().await;
        for _ in 0..9 {
            advance_one_tick(100).await;
        }
        assert!(!store.exists(), "no snapshot before the tenth append");

        advance_one_tick(100).await;
        assert!(store.exists(), "snapshot after the tenth append");
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.data.len(), 10);

        recorder.stop_recording().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_writes_final_snapshot_and_classifies() {
        let readings = vec![
            Reading::Complete { angle: 0.0, torque: 0.0 },
            Reading::Complete { angle: 1.0, torque: 1.0 },
            Reading::Complete { angle: 0.5, torque: 2.0 },
        ];
        let (recorder, _, store) = make_recorder(readings);

        recorder.start_recording().await;
        for _ in 0..3 {
            advance_one_tick(100).await;
        }
        let finished = recorder.stop_recording().await.unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.data.len(), 3);
        assert_eq!(snapshot.hysteresis_data.len(), 3);
        assert_eq!(snapshot.forward_data.len(), 2);
        assert_eq!(snapshot.reverse_data.len(), 1);
        assert_eq!(snapshot.start_time, finished.started_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop_returns() {
        let readings = (0..50)
            .map(|i| Reading::Complete {
                angle: i as f64,
                torque: 0.0,
            })
            .collect();
        let (recorder, source, _) = make_recorder(readings);

        recorder.start_recording().await;
        for _ in 0..3 {
            advance_one_tick(100).await;
        }
        recorder.stop_recording().await;
        let calls_at_stop = source.call_count();

        for _ in 0..5 {
            advance_one_tick(100).await;
        }
        assert_eq!(source.call_count(), calls_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_change_keeps_exactly_one_timer() {
        let readings = (0..100)
            .map(|i| Reading::Complete {
                angle: i as f64,
                torque: 0.0,
            })
            .collect();
        let (recorder, source, _) = make_recorder(readings);

        recorder.start_recording().await;
        for _ in 0..2 {
            advance_one_tick(100).await;
        }
        assert_eq!(source.call_count(), 2);

        let effective = recorder.set_sample_interval(200).await;
        assert_eq!(effective, 200);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        // Over the next second only the 200 ms cadence may fire: five
        // ticks, not five plus the old cadence's ten.
        for _ in 0..5 {
            advance_one_tick(200).await;
        }
        assert_eq!(source.call_count(), 7);

        recorder.stop_recording().await;
    }

    #[tokio::test]
    async fn test_interval_clamped_to_floor() {
        let (recorder, _, _) = make_recorder(vec![]);
        assert_eq!(recorder.set_sample_interval(10).await, MIN_SAMPLE_INTERVAL_MS);
        assert_eq!(recorder.sample_interval_ms().await, MIN_SAMPLE_INTERVAL_MS);
    }

    #[tokio::test]
    async fn test_seed_from_snapshot_only_when_idle_and_empty() {
        let (recorder, _, _) = make_recorder(vec![]);
        let snapshot = RecordingSnapshot {
            data: vec![Sample {
                angle: 1.0,
                torque: 2.0,
                timestamp: 500,
                relative_time: 0,
            }],
            start_time: Some(500),
            ..RecordingSnapshot::default()
        };

        recorder.seed_from_snapshot(snapshot.clone()).await;
        assert_eq!(recorder.data().await.len(), 1);
        assert_eq!(recorder.status().await.started_at, Some(500));

        // Second seed must not clobber the in-memory log
        let other = RecordingSnapshot {
            data: Vec::new(),
            start_time: Some(999),
            ..RecordingSnapshot::default()
        };
        recorder.seed_from_snapshot(other).await;
        assert_eq!(recorder.status().await.started_at, Some(500));
    }
}
