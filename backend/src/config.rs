use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Detection,
    Classification,
}

/// Description of the model artifact, loaded from a YAML file so a
/// deployment can swap detection and classification variants without a
/// rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub artifact: PathBuf,
    pub class_names: Vec<String>,
    #[serde(default)]
    pub input_size: Option<u32>,
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
    /// Labels that mean "nothing abnormal found"; these skip the remote
    /// explanation call.
    #[serde(default)]
    pub normal_labels: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Detection,
            artifact: PathBuf::from("model/best.torchscript"),
            class_names: vec![
                "glioma".to_string(),
                "meningioma".to_string(),
                "notumor".to_string(),
                "pituitary".to_string(),
            ],
            input_size: None,
            confidence_threshold: None,
            normal_labels: vec!["notumor".to_string()],
        }
    }
}

impl ModelConfig {
    pub fn load(config_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = std::fs::read_to_string(config_path)?;
        let config: ModelConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn input_size_or_default(&self) -> u32 {
        self.input_size.unwrap_or(match self.kind {
            ModelKind::Detection => 640,
            ModelKind::Classification => 150,
        })
    }

    pub fn threshold_or_default(&self) -> f32 {
        self.confidence_threshold.unwrap_or(0.5)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub static_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub explain_timeout: Duration,
    pub upload_ttl: Duration,
    pub sweep_interval: Duration,
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let bind_address = format!("0.0.0.0:{}", port);

        let static_dir =
            PathBuf::from(env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()));

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let explain_timeout = Duration::from_secs(parse_var("EXPLAIN_TIMEOUT_SECS", 20));
        let upload_ttl = Duration::from_secs(parse_var("UPLOAD_TTL_MINUTES", 24 * 60) * 60);
        let sweep_interval = Duration::from_secs(parse_var("SWEEP_INTERVAL_MINUTES", 10) * 60);

        let model_config_path =
            env::var("MODEL_CONFIG").unwrap_or_else(|_| "config/model.yaml".to_string());
        let model = match ModelConfig::load(Path::new(&model_config_path)) {
            Ok(model) => model,
            Err(e) => {
                log::warn!(
                    "could not load model config from {}: {}; using built-in defaults",
                    model_config_path,
                    e
                );
                ModelConfig::default()
            }
        };

        Self {
            bind_address,
            static_dir,
            gemini_api_key,
            explain_timeout,
            upload_ttl,
            sweep_interval,
            model,
        }
    }

    /// Uploaded scans and annotated results live under the static root so
    /// they can be served back by the files handler.
    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection_config() {
        let yaml = r#"
kind: detection
artifact: model/best.torchscript
class_names: [glioma, meningioma, notumor, pituitary]
input_size: 640
confidence_threshold: 0.5
normal_labels: [notumor]
"#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind, ModelKind::Detection);
        assert_eq!(config.class_names.len(), 4);
        assert_eq!(config.input_size_or_default(), 640);
        assert_eq!(config.threshold_or_default(), 0.5);
        assert_eq!(config.normal_labels, vec!["notumor"]);
    }

    #[test]
    fn optional_fields_fall_back_per_kind() {
        let yaml = r#"
kind: classification
artifact: model/classifier.torchscript
class_names: [glioma, meningioma, notumor, pituitary]
"#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind, ModelKind::Classification);
        assert_eq!(config.input_size_or_default(), 150);
        assert_eq!(config.threshold_or_default(), 0.5);
        assert!(config.normal_labels.is_empty());
    }

    #[test]
    fn default_config_covers_the_brain_mri_label_table() {
        let config = ModelConfig::default();
        assert_eq!(config.kind, ModelKind::Detection);
        assert!(config.class_names.contains(&"glioma".to_string()));
        assert_eq!(config.input_size_or_default(), 640);
    }
}
