//! Host-facing proctoring engine.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, watch};

use crate::camera::{CameraSource, VideoStream, acquire_stream};
use crate::config::ProctorConfig;
use crate::detection::Detector;
use crate::error::{CameraError, ProctoringError};
use crate::monitor::alert::{Alert, AlertKind};
use crate::monitor::scheduler::{DetectionScheduler, OverlayFeed, TickLoop};
use crate::monitor::session::{SessionAggregator, StatusSnapshot};
use crate::overlay::{SourceGeometry, Surface, render_overlay};

/// Combines one camera and one detector into a monitored session.
///
/// Commands take `&mut self`; queries take `&self` and may be polled at any
/// rate. Failures are recorded in the alert log as well as returned.
pub struct Proctor<C, D> {
    config: ProctorConfig,
    camera: C,
    detector: Arc<D>,
    stream: Option<Arc<dyn VideoStream>>,
    state: Arc<RwLock<SessionAggregator>>,
    scheduler: DetectionScheduler,
    feed: watch::Sender<OverlayFeed>,
}

impl<C: CameraSource, D: Detector + 'static> Proctor<C, D> {
    /// Idle proctor: no stream open, session inactive.
    pub fn new(camera: C, detector: D, config: ProctorConfig) -> Self {
        let state = SessionAggregator::new(config.alert_capacity, config.tracked_label.clone());
        let (feed, _) = watch::channel(OverlayFeed::default());
        Self {
            config,
            camera,
            detector: Arc::new(detector),
            stream: None,
            state: Arc::new(RwLock::new(state)),
            scheduler: DetectionScheduler::new(),
            feed,
        }
    }

    /// Open the camera stream.
    ///
    /// # Errors
    ///
    /// Returns the [`CameraError`] that stopped the start sequence; its text
    /// is also appended to the alert log. A denied permission fails without
    /// prompting.
    pub async fn start_camera(&mut self) -> Result<(), CameraError> {
        if self.stream.is_some() {
            tracing::debug!("Camera already started");
            return Ok(());
        }

        match acquire_stream(&self.camera, &self.config.camera).await {
            Ok(stream) => {
                tracing::info!(resolution = ?stream.resolution(), "Camera started");
                self.stream = Some(stream);
                self.state
                    .write()
                    .await
                    .push_alert(AlertKind::Success, "Camera started successfully");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = ?error, "Camera access failed");
                self.state
                    .write()
                    .await
                    .push_alert(AlertKind::Error, error.to_string());
                Err(error)
            }
        }
    }

    /// Release the camera. Stops proctoring first if it is running; safe to
    /// call when no stream is open.
    pub async fn stop_camera(&mut self) {
        self.stop_proctoring().await;
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
        tracing::info!("Camera stopped");
        self.state
            .write()
            .await
            .push_alert(AlertKind::Info, "Camera stopped");
    }

    pub fn is_stream_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether the periodic detection loop is running.
    pub fn is_proctoring(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Begin sampling. Restarts the session clock; counters carry over until
    /// [`reset_session`](Self::reset_session).
    ///
    /// # Errors
    ///
    /// Fails without touching session state when no stream is open or the
    /// detector is not ready.
    pub async fn start_proctoring(&mut self) -> Result<(), ProctoringError> {
        let Some(stream) = self.stream.clone() else {
            return Err(ProctoringError::StreamInactive);
        };
        if !self.detector.is_ready() {
            return Err(ProctoringError::DetectorNotReady);
        }

        {
            let mut state = self.state.write().await;
            if state.session().active {
                tracing::debug!("Proctoring already active");
                return Ok(());
            }
            state.begin(Utc::now());
            state.push_alert(AlertKind::Success, "Proctoring session started");
            self.feed.send_replace(OverlayFeed {
                detections: state.detections().to_vec(),
                active: true,
            });
        }

        self.scheduler.start(TickLoop {
            detector: self.detector.clone(),
            stream,
            state: self.state.clone(),
            feed: self.feed.clone(),
            period: self.config.sample_interval(),
            timeout: self.config.detection_timeout(),
        });
        tracing::info!(interval_ms = self.config.sample_interval_ms, "Proctoring started");
        Ok(())
    }

    /// Stop sampling. No session state changes once this returns.
    pub async fn stop_proctoring(&mut self) {
        self.scheduler.stop();

        let mut state = self.state.write().await;
        if state.end() {
            state.push_alert(AlertKind::Warning, "Proctoring session stopped");
            self.feed.send_modify(|feed| feed.active = false);
            tracing::info!("Proctoring stopped");
        }
    }

    /// Clear alerts, counters and detections and restart the session clock.
    /// Whether proctoring is running is unaffected.
    pub async fn reset_session(&mut self) {
        let mut state = self.state.write().await;
        state.reset(Utc::now());
        self.feed.send_modify(|feed| feed.detections.clear());
        tracing::info!(active = state.session().active, "Session reset");
    }

    /// Consistent view of person count, counters and session timing.
    pub async fn status_snapshot(&self) -> StatusSnapshot {
        self.state.read().await.snapshot()
    }

    /// All retained alerts, most recent last.
    pub async fn alerts(&self) -> Vec<Alert> {
        self.state.read().await.alerts().to_vec()
    }

    /// The last `count` alerts, most recent last.
    pub async fn recent_alerts(&self, count: usize) -> Vec<Alert> {
        self.state.read().await.alerts().recent(count)
    }

    /// Receiver that changes whenever the published detection set or the
    /// activity flag changes.
    pub fn subscribe_detections(&self) -> watch::Receiver<OverlayFeed> {
        self.feed.subscribe()
    }

    /// Draw the latest published detections for a display of the given
    /// pixel density.
    pub fn render_overlay<S: Surface + ?Sized>(&self, surface: &mut S, density: f32) {
        let intrinsic = self.stream.as_ref().and_then(|s| s.resolution());
        let feed = self.feed.borrow();
        render_overlay(
            surface,
            &feed.detections,
            feed.active,
            SourceGeometry::new(intrinsic, density),
            &self.config.overlay,
        );
    }

    /// Configuration the proctor was built with.
    pub fn config(&self) -> &ProctorConfig {
        &self.config
    }

    /// The shared detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<C, D> Drop for Proctor<C, D> {
    fn drop(&mut self) {
        self.scheduler.stop();
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
    }
}
