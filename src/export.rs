// src/export.rs
//
// The two presentations of a finished run: the downloadable JSON document and
// the condensed plain-text rendering for clipboard copy. Both are pure
// functions of the stored result list.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::session::InferenceResult;

/// Cap on raw values shown per output in the text rendering.
pub const COPY_PREVIEW: usize = 100;

#[derive(Debug, Serialize)]
pub struct DocumentMetadata {
    pub description: &'static str,
    pub timestamp: String,
    pub model: String,
    pub run_id: String,
    pub explanation: &'static str,
}

/// Static glossary of the result fields, embedded in every export so the
/// document explains itself.
#[derive(Debug, Serialize)]
pub struct FieldGlossary {
    pub outputs: &'static str,
    pub data: &'static str,
    pub shape: &'static str,
    pub dtype: &'static str,
    pub stats: &'static str,
    #[serde(rename = "totalElements")]
    pub total_elements: &'static str,
}

impl Default for FieldGlossary {
    fn default() -> Self {
        Self {
            outputs: "Array of model outputs - each represents one output tensor from your model",
            data: "The actual numbers/predictions from the model - these are the raw values",
            shape: "Dimensions of the tensor (e.g., [1, 64, 50257] means 1 batch, 64 positions, 50257 possible tokens)",
            dtype: "Data type: 'float32' for decimal numbers, 'int32' for integers",
            stats: "Statistics calculated from the data: min, max, mean, standard deviation, sum",
            total_elements: "Total number of values in this output tensor",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    pub metadata: DocumentMetadata,
    pub outputs: &'a [InferenceResult],
    pub what_is_this: FieldGlossary,
}

impl<'a> ResultsDocument<'a> {
    pub fn new(model_name: &str, outputs: &'a [InferenceResult], now: DateTime<Utc>) -> Self {
        Self {
            metadata: DocumentMetadata {
                description: "LiteRT Model Inference Results",
                timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                model: model_name.to_string(),
                run_id: Uuid::new_v4().to_string(),
                explanation: "This JSON contains the raw output tensors from your model inference. \
                    Each output includes the tensor data (numbers), shape (dimensions), data type, \
                    and statistics.",
            },
            outputs,
            what_is_this: FieldGlossary::default(),
        }
    }
}

/// Download name for an export: the timestamp with characters that are awkward
/// in file names replaced.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("inference_results_{}.json", stamp)
}

/// Condensed per-output text: header, shape, dtype and the first 100 sampled
/// values, with an ellipsis when the sample holds more.
pub fn clipboard_text(results: &[InferenceResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let shape = result
                .shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let preview = result
                .data
                .iter()
                .take(COPY_PREVIEW)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let ellipsis = if result.data.len() > COPY_PREVIEW { "..." } else { "" };
            format!(
                "Output {} ({}):\n  Shape: [{}]\n  Dtype: {}\n  Data: [{}{}]\n",
                i, result.name, shape, result.dtype, preview, ellipsis
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summarize;
    use chrono::TimeZone;

    fn sample_result(name: &str, data: Vec<f64>) -> InferenceResult {
        let floats: Vec<f32> = data.iter().map(|&v| v as f32).collect();
        InferenceResult {
            name: name.to_string(),
            shape: vec![1, data.len()],
            dtype: "float32".to_string(),
            stats: summarize(&floats),
            total_elements: data.len(),
            data,
        }
    }

    #[test]
    fn export_file_name_munges_the_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 13, 45, 9).unwrap();
        let name = export_file_name(now);
        assert_eq!(name, "inference_results_2024-03-07T13-45-09-000Z.json");
        assert!(!name.contains(':'));
    }

    #[test]
    fn document_carries_metadata_outputs_and_glossary() {
        let results = vec![sample_result("logits", vec![1.0, 2.0, 3.0, 4.0])];
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 13, 45, 9).unwrap();
        let doc = ResultsDocument::new("gpt2.tflite", &results, now);
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        assert_eq!(json["metadata"]["model"], "gpt2.tflite");
        assert_eq!(json["metadata"]["timestamp"], "2024-03-07T13:45:09.000Z");
        assert!(json["metadata"]["run_id"].as_str().is_some());
        assert_eq!(json["outputs"][0]["name"], "logits");
        assert_eq!(json["outputs"][0]["totalElements"], 4);
        assert_eq!(json["outputs"][0]["stats"]["mean"], 2.5);
        assert!(json["what_is_this"]["dtype"].as_str().unwrap().contains("float32"));
    }

    #[test]
    fn clipboard_text_renders_headers_and_values() {
        let results = vec![
            sample_result("logits", vec![1.0, 2.0, 3.0]),
            sample_result("hidden", vec![0.5]),
        ];
        let text = clipboard_text(&results);
        assert!(text.contains("Output 0 (logits):"));
        assert!(text.contains("  Shape: [1, 3]"));
        assert!(text.contains("  Dtype: float32"));
        assert!(text.contains("  Data: [1, 2, 3]"));
        assert!(text.contains("Output 1 (hidden):"));
        assert!(text.contains("  Data: [0.5]"));
        assert!(!text.contains("..."));
    }

    #[test]
    fn clipboard_text_truncates_long_samples_with_an_ellipsis() {
        let values: Vec<f64> = (0..150).map(|i| i as f64).collect();
        let results = vec![sample_result("logits", values)];
        let text = clipboard_text(&results);
        assert!(text.contains("98, 99...]"));
        assert!(!text.contains("100"));
    }
}
