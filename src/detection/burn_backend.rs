//! Burn inference backend for person detection.
//!
//! This module provides a `BurnDetector` that implements `Detector` for
//! running object detection models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use presence_proctor::detection::{BurnDetector, BurnModel};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection model
//! struct MySsdModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MySsdModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         // Run inference
//!     }
//! }
//!
//! let model = MySsdModel::load("model.bin");
//! let detector = BurnDetector::new(model, Default::default());
//! ```

use async_trait::async_trait;
use burn::prelude::*;
use burn::tensor::Tensor;

use crate::detection::builder::DetectionBuilder;
use crate::detection::detector::Detector;
use crate::detection::frame::Frame;
use crate::detection::object::{Detection, PERSON_LABEL};

/// Error type for Burn detection failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BurnDetectorError {
    /// Frame has a different shape than the model input.
    #[error("Invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidInputDimensions {
        expected: (u32, u32, u32),
        got: (u32, u32, u32),
    },
    /// Preprocessing failed.
    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),
}

/// Raw detection output from the model before label mapping.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    /// Confidence score
    pub score: f32,
    /// Class ID into the detector's label table
    pub class_id: Option<usize>,
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [batch, channels, height, width]
    ///
    /// # Returns
    /// Vector of raw detections after the model's own NMS.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 480, 640)
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        false
    }
}

/// Burn-based object detector implementing `Detector`.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    conf_threshold: f32,
    labels: Vec<String>,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    ///
    /// Class 0 maps to `"person"`, as in COCO-trained models.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            conf_threshold: 0.25,
            labels: vec![PERSON_LABEL.to_string()],
        }
    }

    /// Set the confidence threshold for filtering detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Replace the class-id to label table.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Convert a frame to a normalized `[1, C, H, W]` tensor.
    pub fn preprocess(&self, frame: &Frame) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let (channels, target_h, target_w) = self.model.input_size();
        let got = (frame.channels(), frame.height(), frame.width());

        if got != (channels, target_h, target_w) {
            return Err(BurnDetectorError::InvalidInputDimensions {
                expected: (channels, target_h, target_w),
                got,
            });
        }
        if channels == 0 {
            return Err(BurnDetectorError::PreprocessingError(
                "frame has no channels".to_string(),
            ));
        }

        // HWC -> CHW, u8 -> f32 in [0, 1]
        let data: Vec<f32> = frame
            .pixels()
            .permuted_axes([2, 0, 1])
            .iter()
            .map(|&x| x as f32 / 255.0)
            .collect();

        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            channels as usize,
            target_h as usize,
            target_w as usize,
        ]);

        Ok(tensor)
    }

    fn label_for(&self, class_id: Option<usize>) -> String {
        match class_id {
            Some(id) => self
                .labels
                .get(id)
                .cloned()
                .unwrap_or_else(|| format!("class_{id}")),
            None => PERSON_LABEL.to_string(),
        }
    }

    /// Convert raw model outputs to Detection objects.
    fn postprocess(&self, raw_detections: Vec<RawDetection>) -> Vec<Detection> {
        raw_detections
            .into_iter()
            .filter(|d| d.score >= self.conf_threshold)
            .map(|d| {
                let builder = DetectionBuilder::new()
                    .label(self.label_for(d.class_id))
                    .score(d.score);
                if self.model.bbox_is_xywh() {
                    builder
                        .xywh(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                        .build()
                } else {
                    builder
                        .tlbr(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                        .build()
                }
            })
            .collect()
    }
}

#[async_trait]
impl<B: Backend, M: BurnModel<B>> Detector for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn is_ready(&self) -> bool {
        true
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(frame)?;
        let raw_detections = self.model.forward(tensor);
        Ok(self.postprocess(raw_detections))
    }
}
