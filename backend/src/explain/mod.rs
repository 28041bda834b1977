mod gemini;

pub use gemini::{ExplainError, GeminiClient};

use log::warn;
use std::time::Duration;

/// Shown when nothing abnormal was found; the remote service is never
/// called for this case.
pub const NO_FINDING_MESSAGE: &str = "No abnormality was detected in the uploaded scan. \
If symptoms persist, please consult a medical professional for a full evaluation.";

/// Shown when no API key is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "The explanation service is not configured; \
set GEMINI_API_KEY to enable condition summaries. The prediction above is unaffected.";

/// Boundary around the remote text-generation service. `explain` is total:
/// every remote failure degrades to a displayable fallback string.
#[derive(Clone)]
pub struct Explainer {
    client: Option<GeminiClient>,
}

impl Explainer {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: api_key.map(|key| GeminiClient::new(key, timeout)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn explain(&self, labels: &[String]) -> String {
        if labels.is_empty() {
            return NO_FINDING_MESSAGE.to_string();
        }

        let client = match &self.client {
            Some(client) => client,
            None => return NOT_CONFIGURED_MESSAGE.to_string(),
        };

        match client.generate(&build_prompt(labels)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_message("the service returned an empty answer"),
            Err(e) => {
                warn!("explanation request failed: {}", e);
                fallback_message(&e.to_string())
            }
        }
    }
}

fn build_prompt(labels: &[String]) -> String {
    format!(
        "A brain scan analysis flagged the following finding(s): {}. \
Provide general, non-diagnostic information for a patient: a plain-language \
description of the condition, common causes, typical symptoms, the general \
risk level, and a clear recommendation to consult a qualified medical \
professional. Do not present this as a diagnosis.",
        labels.join(", ")
    )
}

fn fallback_message(detail: &str) -> String {
    format!(
        "An explanation could not be generated right now ({}). \
The prediction above is unaffected; please consult a medical professional \
for guidance.",
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_labels_and_consultation_framing() {
        let prompt = build_prompt(&["glioma".to_string(), "pituitary".to_string()]);
        assert!(prompt.contains("glioma, pituitary"));
        assert!(prompt.contains("consult a qualified medical professional"));
        assert!(prompt.contains("non-diagnostic"));
    }

    #[test]
    fn fallback_embeds_the_error_detail() {
        let message = fallback_message("timed out after 20s");
        assert!(message.contains("timed out after 20s"));
        assert!(!message.is_empty());
    }

    #[actix_web::test]
    async fn no_labels_short_circuits_to_the_canned_message() {
        let explainer = Explainer::new(Some("key".to_string()), Duration::from_secs(1));
        assert_eq!(explainer.explain(&[]).await, NO_FINDING_MESSAGE);
    }

    #[actix_web::test]
    async fn missing_key_degrades_without_a_network_call() {
        let explainer = Explainer::new(None, Duration::from_secs(1));
        assert!(!explainer.is_configured());
        assert_eq!(
            explainer.explain(&["glioma".to_string()]).await,
            NOT_CONFIGURED_MESSAGE
        );
    }
}
