use crate::config::AppConfig;
use crate::explain::Explainer;
use crate::inference::{InferenceError, ModelHandle};
use crate::ingest::{self, IngestError, ScanUpload};
use actix_web::http::StatusCode;
use actix_web::ResponseError;
use chrono::Utc;
use log::debug;
use shared::ScanReport;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no scan image attached to the request")]
    MissingFile,
    #[error("unsupported file type \"{0}\"; allowed: png, jpg, jpeg, gif")]
    UnsupportedType(String),
    #[error("uploaded file is too large")]
    TooLarge,
    #[error("the uploaded file could not be decoded as an image")]
    ImageDecode(String),
    #[error("the prediction model is unavailable; the service is running degraded")]
    ModelUnavailable,
    #[error("model produced class index {index} outside the {known}-entry label table")]
    InvalidClassIndex { index: i64, known: usize },
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IngestError> for PipelineError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MissingFile => PipelineError::MissingFile,
            IngestError::UnsupportedType(ext) => PipelineError::UnsupportedType(ext),
            IngestError::TooLarge => PipelineError::TooLarge,
            IngestError::Io(e) => PipelineError::Internal(e.to_string()),
        }
    }
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable => PipelineError::ModelUnavailable,
            InferenceError::ImageDecode(detail) => PipelineError::ImageDecode(detail),
            InferenceError::InvalidClassIndex { index, known } => {
                PipelineError::InvalidClassIndex { index, known }
            }
            InferenceError::Model(detail) => PipelineError::Internal(detail),
        }
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingFile
            | PipelineError::UnsupportedType(_)
            | PipelineError::ImageDecode(_) => StatusCode::BAD_REQUEST,
            PipelineError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::InvalidClassIndex { .. } | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// One upload, one pass: store, infer, explain, assemble the report.
/// Explanation failures never fail the request; they degrade to a fallback
/// string inside `Explainer::explain`.
pub async fn run(
    config: &AppConfig,
    model: &ModelHandle,
    explainer: &Explainer,
    upload: ScanUpload,
) -> Result<ScanReport, PipelineError> {
    let request_id = Uuid::new_v4();

    let stored = ingest::store(&upload, &config.upload_dir())?;
    debug!("[{}] stored scan as {}", request_id, stored.filename);

    let image = image::ImageReader::open(&stored.path)
        .map_err(|e| PipelineError::Internal(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| PipelineError::Internal(e.to_string()))?
        .decode()
        .map_err(|e| InferenceError::ImageDecode(e.to_string()))?;

    let inference = model.predict(&image)?;
    let top = inference.predictions.first().cloned();
    debug!(
        "[{}] inference produced {} prediction(s)",
        request_id,
        inference.predictions.len()
    );

    // Result artifacts are keyed per request; concurrent requests must not
    // overwrite each other's annotated output.
    let result_url = match inference.annotated {
        Some(annotated) => {
            let name = result_filename(&stored.content_hash, request_id);
            let path = config.upload_dir().join(&name);
            annotated
                .save(&path)
                .map_err(|e| PipelineError::Internal(e.to_string()))?;
            Some(format!("/static/uploads/{}", name))
        }
        None => None,
    };

    let labels: Vec<String> = inference
        .predictions
        .iter()
        .map(|p| p.label.clone())
        .filter(|label| {
            !config
                .model
                .normal_labels
                .iter()
                .any(|normal| normal.eq_ignore_ascii_case(label))
        })
        .collect();
    let explanation = explainer.explain(&labels).await;

    Ok(ScanReport {
        request_id,
        generated_at: Utc::now(),
        prediction: top,
        scan_url: format!("/static/uploads/{}", stored.filename),
        result_url,
        explanation,
    })
}

pub fn result_filename(content_hash: &str, request_id: Uuid) -> String {
    let prefix = &content_hash[..content_hash.len().min(8)];
    format!("{}-{}.jpg", prefix, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use std::path::Path;
    use std::time::Duration;

    fn test_config(static_dir: &Path) -> AppConfig {
        AppConfig {
            bind_address: "0.0.0.0:0".to_string(),
            static_dir: static_dir.to_path_buf(),
            gemini_api_key: None,
            explain_timeout: Duration::from_secs(1),
            upload_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(600),
            model: ModelConfig::default(),
        }
    }

    fn upload(filename: Option<&str>, bytes: Vec<u8>) -> ScanUpload {
        ScanUpload {
            filename: filename.map(|f| f.to_string()),
            bytes,
        }
    }

    #[actix_web::test]
    async fn unsupported_type_short_circuits_before_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        std::fs::create_dir_all(config.upload_dir()).unwrap();
        let model = ModelHandle::unavailable("no model in tests");
        let explainer = Explainer::new(None, Duration::from_secs(1));

        let err = run(&config, &model, &explainer, upload(Some("scan.txt"), vec![1]))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedType(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(config.upload_dir()).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn missing_file_maps_to_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let model = ModelHandle::unavailable("no model in tests");
        let explainer = Explainer::new(None, Duration::from_secs(1));

        let err = run(&config, &model, &explainer, upload(None, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn degraded_model_maps_to_service_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let model = ModelHandle::unavailable("artifact missing");
        let explainer = Explainer::new(None, Duration::from_secs(1));

        let png = encoded_png();
        let err = run(&config, &model, &explainer, upload(Some("scan.png"), png))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn undecodable_upload_maps_to_image_decode() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let model = ModelHandle::unavailable("no model in tests");
        let explainer = Explainer::new(None, Duration::from_secs(1));

        let err = run(
            &config,
            &model,
            &explainer,
            upload(Some("scan.png"), b"definitely not a png".to_vec()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
    }

    #[test]
    fn result_filenames_are_unique_per_request() {
        let hash = ingest::content_hash(b"same-image");
        let a = result_filename(&hash, Uuid::new_v4());
        let b = result_filename(&hash, Uuid::new_v4());
        assert_ne!(a, b);
        assert!(a.starts_with(&hash[..8]));
        assert!(a.ends_with(".jpg"));
    }

    fn encoded_png() -> Vec<u8> {
        let image = image::DynamicImage::new_rgb8(4, 4);
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }
}
