use super::{annotate, postprocess, preprocess, Inference, InferenceError, ModelAdapter};
use crate::config::{ModelConfig, ModelKind};
use image::DynamicImage;
use shared::Prediction;
use tch::{CModule, Device, Kind, Tensor};

pub fn build_adapter(config: &ModelConfig) -> Result<Box<dyn ModelAdapter>, InferenceError> {
    if !config.artifact.exists() {
        return Err(InferenceError::Model(format!(
            "model artifact {} does not exist",
            config.artifact.display()
        )));
    }

    let device = Device::cuda_if_available();
    let module = CModule::load_on_device(&config.artifact, device)?;

    Ok(match config.kind {
        ModelKind::Detection => Box::new(DetectionModel {
            module,
            device,
            class_names: config.class_names.clone(),
            input_size: config.input_size_or_default(),
            confidence_threshold: config.threshold_or_default(),
        }),
        ModelKind::Classification => Box::new(ClassificationModel {
            module,
            device,
            class_names: config.class_names.clone(),
            input_size: config.input_size_or_default(),
        }),
    })
}

/// TorchScript detection model. The artifact contract is post-NMS rows of
/// (x1, y1, x2, y2, confidence, class) in input-resolution coordinates.
pub struct DetectionModel {
    module: CModule,
    device: Device,
    class_names: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
}

impl ModelAdapter for DetectionModel {
    fn predict(&self, image: &DynamicImage) -> Result<Inference, InferenceError> {
        let tensor = preprocess::to_chw_tensor(image, self.input_size, self.device);
        let output = self.module.forward_ts(&[tensor])?;
        let flat = tensor_to_vec(&output);

        let detections =
            postprocess::decode_detections(&flat, self.confidence_threshold, &self.class_names)?;

        let predictions = detections
            .iter()
            .map(|d| Prediction {
                label: d.label.clone(),
                confidence: d.score,
            })
            .collect();

        // The annotated copy is produced even when nothing was detected so
        // the result view always has an image to show.
        let annotated = annotate::draw_boxes(image, &detections, self.input_size);

        Ok(Inference {
            predictions,
            annotated: Some(annotated),
        })
    }
}

/// TorchScript classifier: softmax over the label table, arg-max only.
pub struct ClassificationModel {
    module: CModule,
    device: Device,
    class_names: Vec<String>,
    input_size: u32,
}

impl ModelAdapter for ClassificationModel {
    fn predict(&self, image: &DynamicImage) -> Result<Inference, InferenceError> {
        let tensor = preprocess::to_chw_tensor(image, self.input_size, self.device);
        let output = self.module.forward_ts(&[tensor])?;
        let probabilities = tensor_to_vec(&output.softmax(-1, Kind::Float));

        let (index, confidence) = postprocess::argmax(&probabilities)
            .ok_or_else(|| InferenceError::Model("model produced an empty output".to_string()))?;
        let label = postprocess::label_for(index, &self.class_names)?;

        Ok(Inference {
            predictions: vec![Prediction { label, confidence }],
            annotated: None,
        })
    }
}

fn tensor_to_vec(tensor: &Tensor) -> Vec<f32> {
    let flat = tensor.to_kind(Kind::Float).view([-1]);
    let num_elements = flat.size()[0] as usize;
    let mut output = vec![0.0f32; num_elements];
    flat.copy_data(&mut output, num_elements);
    output
}
