//! Fixed-cadence detection loop.
//!
//! One tokio task per proctoring run pulls a frame from the stream, awaits
//! the detector and applies the result to the session. The detector call is
//! awaited inline, so there is never more than one outstanding call and
//! results land in tick order. Ticks that come due while a call is still
//! running are skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::camera::VideoStream;
use crate::detection::{Detection, Detector, Frame};
use crate::monitor::session::{SessionAggregator, TickOutcome};

/// Latest detection set and activity flag, published for overlay rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFeed {
    pub detections: Vec<Detection>,
    pub active: bool,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TickReport {
    /// Proctoring is not active; the loop should end
    Inactive,
    /// The stream had no frame; nothing changed
    NoFrame,
    Applied(TickOutcome),
    /// The detector failed; an error alert was recorded
    Failed,
    /// Proctoring stopped or the session was reset while the detector ran
    Discarded,
}

#[derive(Debug, thiserror::Error)]
enum DetectFailure<E: std::error::Error + 'static> {
    #[error(transparent)]
    Detector(E),
    #[error("detector did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Everything one detection loop needs. Handles are passed in explicitly;
/// the loop owns clones of them for its lifetime.
pub(crate) struct TickLoop<D> {
    pub(crate) detector: Arc<D>,
    pub(crate) stream: Arc<dyn VideoStream>,
    pub(crate) state: Arc<RwLock<SessionAggregator>>,
    pub(crate) feed: watch::Sender<OverlayFeed>,
    pub(crate) period: Duration,
    pub(crate) timeout: Option<Duration>,
}

impl<D: Detector> TickLoop<D> {
    /// Run one sampling cycle.
    pub async fn tick(&self) -> TickReport {
        let Some(ticket) = self.state.read().await.ticket() else {
            return TickReport::Inactive;
        };

        let Some(frame) = self.stream.frame() else {
            tracing::trace!("No frame available, skipping tick");
            return TickReport::NoFrame;
        };

        let result = self.detect(&frame).await;

        let mut state = self.state.write().await;
        match result {
            Ok(detections) => match state.apply_detections(ticket, detections.clone()) {
                Some(outcome) => {
                    self.publish(detections);
                    TickReport::Applied(outcome)
                }
                None => {
                    tracing::debug!("Discarding detections from a superseded tick");
                    TickReport::Discarded
                }
            },
            Err(error) => {
                if state.record_detection_failure(ticket) {
                    tracing::warn!(%error, "Person detection failed");
                    TickReport::Failed
                } else {
                    tracing::debug!(%error, "Ignoring failure from a superseded tick");
                    TickReport::Discarded
                }
            }
        }
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectFailure<D::Error>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.detector.detect(frame))
                .await
                .map_err(|_| DetectFailure::TimedOut(limit))?
                .map_err(DetectFailure::Detector),
            None => self
                .detector
                .detect(frame)
                .await
                .map_err(DetectFailure::Detector),
        }
    }

    fn publish(&self, detections: Vec<Detection>) {
        self.feed.send_if_modified(|feed| {
            if feed.active && feed.detections == detections {
                return false;
            }
            feed.detections = detections;
            feed.active = true;
            true
        });
    }

    /// Tick every `period`, starting one period from now, until proctoring
    /// ends.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.tick().await {
                TickReport::Inactive => break,
                report => tracing::trace!(?report, "Tick complete"),
            }
        }

        tracing::debug!("Detection loop finished");
    }
}

/// Owns the handle of the running detection loop.
#[derive(Debug, Default)]
pub(crate) struct DetectionScheduler {
    task: Option<JoinHandle<()>>,
}

impl DetectionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the loop, replacing any loop already running.
    pub(crate) fn start<D: Detector + 'static>(&mut self, tick_loop: TickLoop<D>) {
        self.stop();
        tracing::debug!(period = ?tick_loop.period, "Starting detection loop");
        self.task = Some(tokio::spawn(tick_loop.run()));
    }

    /// Cancel the loop. A detector call in flight is dropped with it.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for DetectionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::monitor::alert::AlertKind;
    use crate::monitor::classifier::Transition;

    #[derive(Debug, thiserror::Error)]
    #[error("inference backend crashed")]
    struct Crash;

    struct ScriptedDetector {
        script: Mutex<VecDeque<Result<usize, Crash>>>,
        latency: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<usize, Crash>>, latency: Duration) -> Self {
            Self {
                script: Mutex::new(script.into()),
                latency,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Detector for ScriptedDetector {
        type Error = Crash;

        fn is_ready(&self) -> bool {
            true
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, Crash> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(1));
            next.map(|n| {
                (0..n)
                    .map(|i| Detection::person(i as f32 * 50.0, 40.0, 40.0, 90.0, 0.8))
                    .collect()
            })
        }
    }

    struct StillStream {
        has_frame: bool,
    }

    impl VideoStream for StillStream {
        fn frame(&self) -> Option<Frame> {
            self.has_frame.then(|| Frame::blank(4, 4, 3))
        }

        fn resolution(&self) -> Option<(u32, u32)> {
            Some((4, 4))
        }

        fn stop(&self) {}
    }

    fn make_loop(
        detector: ScriptedDetector,
        has_frame: bool,
        timeout: Option<Duration>,
    ) -> (TickLoop<ScriptedDetector>, watch::Receiver<OverlayFeed>) {
        let mut aggregator = SessionAggregator::new(50, "person");
        aggregator.begin(Utc::now());
        let (feed, rx) = watch::channel(OverlayFeed::default());
        let tick_loop = TickLoop {
            detector: Arc::new(detector),
            stream: Arc::new(StillStream { has_frame }),
            state: Arc::new(RwLock::new(aggregator)),
            feed,
            period: Duration::from_secs(1),
            timeout,
        };
        (tick_loop, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_applies_and_publishes() {
        let detector = ScriptedDetector::new(vec![Ok(2)], Duration::ZERO);
        let (tick_loop, rx) = make_loop(detector, true, None);

        let report = tick_loop.tick().await;

        assert_eq!(
            report,
            TickReport::Applied(TickOutcome {
                person_count: 2,
                transition: Some(Transition::MultiplePersons(2)),
            })
        );
        assert!(rx.borrow().active);
        assert_eq!(rx.borrow().detections.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_frame_is_silent() {
        let detector = ScriptedDetector::new(vec![], Duration::ZERO);
        let (tick_loop, _rx) = make_loop(detector, false, None);

        assert_eq!(tick_loop.tick().await, TickReport::NoFrame);
        assert_eq!(tick_loop.detector.calls.load(Ordering::SeqCst), 0);
        assert!(tick_loop.state.read().await.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_records_error_alert() {
        let detector = ScriptedDetector::new(vec![Ok(1), Err(Crash)], Duration::ZERO);
        let (tick_loop, _rx) = make_loop(detector, true, None);

        tick_loop.tick().await;
        let before = tick_loop.state.read().await.snapshot();
        assert_eq!(tick_loop.tick().await, TickReport::Failed);

        let state = tick_loop.state.read().await;
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.alerts().latest().unwrap().kind, AlertKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let detector = ScriptedDetector::new(vec![Ok(0)], Duration::from_secs(10));
        let (tick_loop, _rx) = make_loop(detector, true, Some(Duration::from_secs(2)));

        assert_eq!(tick_loop.tick().await, TickReport::Failed);
        assert_eq!(tick_loop.state.read().await.snapshot().violations.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_discarded_when_stopped_mid_call() {
        let detector = ScriptedDetector::new(vec![Ok(0)], Duration::from_millis(500));
        let (tick_loop, _rx) = make_loop(detector, true, None);
        let state = tick_loop.state.clone();

        let pending = tokio::spawn(async move { tick_loop.tick().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        state.write().await.end();

        assert_eq!(pending.await.unwrap(), TickReport::Discarded);
        let state = state.read().await;
        assert!(state.alerts().is_empty());
        assert_eq!(state.snapshot().violations.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_detector_is_single_flight() {
        let detector = ScriptedDetector::new(vec![], Duration::from_millis(2500));
        let (tick_loop, _rx) = make_loop(detector, true, None);
        let detector = tick_loop.detector.clone();

        let mut scheduler = DetectionScheduler::new();
        scheduler.start(tick_loop);
        tokio::time::sleep(Duration::from_secs(12)).await;
        scheduler.stop();

        assert_eq!(detector.max_in_flight.load(Ordering::SeqCst), 1);
        let calls = detector.calls.load(Ordering::SeqCst);
        assert!((4..=5).contains(&calls), "unexpected call count {calls}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ends_when_inactive() {
        let detector = ScriptedDetector::new(vec![], Duration::ZERO);
        let (tick_loop, _rx) = make_loop(detector, true, None);
        let state = tick_loop.state.clone();

        let mut scheduler = DetectionScheduler::new();
        scheduler.start(tick_loop);
        state.write().await.end();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!scheduler.is_running());
    }
}
