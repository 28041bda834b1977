use super::{Detection, InferenceError};
use std::cmp::Ordering;

/// Elements per detection row: x1, y1, x2, y2, confidence, class.
pub const DETECTION_ROW: usize = 6;

/// Index and score of the best class, or `None` for an empty output.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

pub fn label_for(index: usize, class_names: &[String]) -> Result<String, InferenceError> {
    class_names
        .get(index)
        .cloned()
        .ok_or(InferenceError::InvalidClassIndex {
            index: index as i64,
            known: class_names.len(),
        })
}

/// Decodes flat detection output into thresholded, best-first boxes.
/// A class id outside the label table is a model/label-table mismatch and
/// fails the whole prediction.
pub fn decode_detections(
    flat: &[f32],
    confidence_threshold: f32,
    class_names: &[String],
) -> Result<Vec<Detection>, InferenceError> {
    if flat.len() % DETECTION_ROW != 0 {
        return Err(InferenceError::Model(format!(
            "unexpected detection output length {}",
            flat.len()
        )));
    }

    let mut detections = Vec::new();
    for row in flat.chunks_exact(DETECTION_ROW) {
        let score = row[4];
        if score < confidence_threshold {
            continue;
        }

        let raw_class = row[5].round() as i64;
        if raw_class < 0 || raw_class as usize >= class_names.len() {
            return Err(InferenceError::InvalidClassIndex {
                index: raw_class,
                known: class_names.len(),
            });
        }
        let class_id = raw_class as usize;

        detections.push(Detection {
            x1: row[0],
            y1: row[1],
            x2: row[2],
            y2: row[3],
            score,
            class_id,
            label: class_names[class_id].clone(),
        });
    }

    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec![
            "glioma".to_string(),
            "meningioma".to_string(),
            "notumor".to_string(),
            "pituitary".to_string(),
        ]
    }

    #[test]
    fn argmax_picks_the_best_class() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn argmax_of_empty_output_is_none() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn label_lookup_rejects_out_of_range_index() {
        let err = label_for(7, &labels()).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::InvalidClassIndex { index: 7, known: 4 }
        ));
    }

    #[test]
    fn decode_filters_below_threshold_and_sorts_best_first() {
        let flat = [
            10.0, 10.0, 50.0, 50.0, 0.62, 0.0, // glioma
            5.0, 5.0, 20.0, 20.0, 0.30, 1.0, // below threshold
            100.0, 100.0, 200.0, 200.0, 0.83, 3.0, // pituitary
        ];
        let detections = decode_detections(&flat, 0.5, &labels()).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "pituitary");
        assert_eq!(detections[0].score, 0.83);
        assert_eq!(detections[1].label, "glioma");
    }

    #[test]
    fn decode_of_empty_output_yields_no_detections() {
        assert!(decode_detections(&[], 0.5, &labels()).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_misshapen_output() {
        let err = decode_detections(&[1.0, 2.0, 3.0], 0.5, &labels()).unwrap_err();
        assert!(matches!(err, InferenceError::Model(_)));
    }

    #[test]
    fn decode_rejects_unknown_class_id() {
        let flat = [0.0, 0.0, 1.0, 1.0, 0.9, 9.0];
        let err = decode_detections(&flat, 0.5, &labels()).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::InvalidClassIndex { index: 9, known: 4 }
        ));
    }

    #[test]
    fn confidences_survive_decoding_within_unit_range() {
        let flat = [0.0, 0.0, 1.0, 1.0, 0.83, 0.0];
        let detections = decode_detections(&flat, 0.5, &labels()).unwrap();
        assert!(detections[0].score >= 0.0 && detections[0].score <= 1.0);
    }
}
