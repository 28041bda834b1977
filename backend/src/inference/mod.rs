pub mod annotate;
pub mod model;
pub mod postprocess;
pub mod preprocess;

use crate::config::ModelConfig;
use image::DynamicImage;
use shared::Prediction;
use std::sync::{Arc, Mutex};

/// One detection box in model-input coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

/// What one forward pass produced: scored labels best-first, plus the
/// annotated copy of the input for detection models.
pub struct Inference {
    pub predictions: Vec<Prediction>,
    pub annotated: Option<image::RgbImage>,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("the prediction model is not loaded")]
    ModelUnavailable,
    #[error("could not decode the stored scan: {0}")]
    ImageDecode(String),
    #[error("model produced class index {index} outside the {known}-entry label table")]
    InvalidClassIndex { index: i64, known: usize },
    #[error("model execution failed: {0}")]
    Model(String),
}

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::Model(err.to_string())
    }
}

/// Capability shared by the detection and classification variants; the
/// pipeline only ever talks to this.
pub trait ModelAdapter: Send {
    fn predict(&self, image: &DynamicImage) -> Result<Inference, InferenceError>;
}

enum ModelState {
    Ready(Mutex<Box<dyn ModelAdapter>>),
    Unavailable(String),
}

/// Process-wide handle to the loaded model. A load failure leaves the
/// handle in a degraded state where every prediction reports
/// `ModelUnavailable` while the rest of the service keeps serving.
#[derive(Clone)]
pub struct ModelHandle {
    state: Arc<ModelState>,
}

impl ModelHandle {
    pub fn load(config: &ModelConfig) -> Self {
        match model::build_adapter(config) {
            Ok(adapter) => {
                log::info!(
                    "model loaded from {} ({:?}, {} classes)",
                    config.artifact.display(),
                    config.kind,
                    config.class_names.len()
                );
                Self {
                    state: Arc::new(ModelState::Ready(Mutex::new(adapter))),
                }
            }
            Err(e) => {
                log::error!("failed to load model from {}: {}", config.artifact.display(), e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ModelState::Unavailable(reason.into())),
        }
    }

    /// Why the model is degraded, if it is.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &*self.state {
            ModelState::Unavailable(reason) => Some(reason),
            ModelState::Ready(_) => None,
        }
    }

    /// Predictions serialize through a mutex; a loaded TorchScript module
    /// is not assumed safe to run from concurrent callers.
    pub fn predict(&self, image: &DynamicImage) -> Result<Inference, InferenceError> {
        match &*self.state {
            ModelState::Unavailable(_) => Err(InferenceError::ModelUnavailable),
            ModelState::Ready(adapter) => adapter.lock().unwrap().predict(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_handle_reports_model_unavailable() {
        let handle = ModelHandle::unavailable("artifact missing");
        assert_eq!(handle.unavailable_reason(), Some("artifact missing"));
        let image = DynamicImage::new_rgb8(8, 8);
        assert!(matches!(
            handle.predict(&image),
            Err(InferenceError::ModelUnavailable)
        ));
    }
}
