use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub prediction: Option<Prediction>,
    pub scan_url: String,
    pub result_url: Option<String>,
    pub explanation: String,
}
