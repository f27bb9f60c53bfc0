//! Asking the backend to turn an instruction into code fragments.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::active_slide::SlideSelection;
use crate::publish::TransportResult;

/// Request body for the instruction endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRequest {
    pub instruction: String,
    pub slide_index: Option<usize>,
    pub total_slides: usize,
}

impl InstructionRequest {
    pub fn new(instruction: impl Into<String>, selection: SlideSelection) -> Self {
        Self {
            instruction: instruction.into(),
            slide_index: selection.current_index,
            total_slides: selection.total_slides,
        }
    }
}

/// Outcome category reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionStatus {
    Success,
    PartialSuccess,
    Error,
    #[serde(other)]
    Unknown,
}

/// Response body from the instruction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionResponse {
    pub status: InstructionStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub generated_code: Option<CodeInput>,
    #[serde(default)]
    pub code: Option<CodeInput>,
}

impl InstructionResponse {
    /// Code to dispatch, if the backend produced any.
    ///
    /// `generated_code` wins over `code`. Nothing is returned unless the status
    /// is success or partial success.
    pub fn code_input(&self) -> Option<CodeInput> {
        match self.status {
            InstructionStatus::Success | InstructionStatus::PartialSuccess => self
                .generated_code
                .iter()
                .chain(self.code.iter())
                .find(|code| !code.is_blank())
                .cloned(),
            _ => None,
        }
    }
}

/// Code returned for an instruction: one fragment, or one per unit key.
///
/// A single fragment applies to unit `0`. `null` values in the keyed form
/// become empty fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CodeInput {
    Single(String),
    PerUnit(BTreeMap<u32, Option<String>>),
}

// JSON object keys are strings; parse them as unit keys after buffering.
impl<'de> Deserialize<'de> for CodeInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Single(String),
            PerUnit(BTreeMap<String, Option<String>>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Single(text) => Ok(CodeInput::Single(text)),
            Raw::PerUnit(map) => {
                let mut units = BTreeMap::new();
                for (key, text) in map {
                    let unit_key = key
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| D::Error::custom(format!("invalid unit key: {key:?}")))?;
                    if units.insert(unit_key, text).is_some() {
                        return Err(D::Error::custom(format!(
                            "duplicate unit key {unit_key} (from {key:?})"
                        )));
                    }
                }
                Ok(CodeInput::PerUnit(units))
            }
        }
    }
}

/// One addressable fragment, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    pub unit_key: u32,
    pub raw_text: String,
}

impl CodeInput {
    /// Units in ascending key order.
    pub fn into_units(self) -> Vec<CodeUnit> {
        match self {
            CodeInput::Single(raw_text) => vec![CodeUnit {
                unit_key: 0,
                raw_text,
            }],
            CodeInput::PerUnit(map) => map
                .into_iter()
                .map(|(unit_key, text)| CodeUnit {
                    unit_key,
                    raw_text: text.unwrap_or_default(),
                })
                .collect(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            CodeInput::Single(text) => text.trim().is_empty(),
            CodeInput::PerUnit(map) => map.is_empty(),
        }
    }
}

impl From<String> for CodeInput {
    fn from(text: String) -> Self {
        CodeInput::Single(text)
    }
}

impl From<&str> for CodeInput {
    fn from(text: &str) -> Self {
        CodeInput::Single(text.to_string())
    }
}

/// Turns an instruction into code.
#[async_trait]
pub trait InstructionSource: Send + Sync {
    async fn request_code(&self, request: &InstructionRequest) -> TransportResult<InstructionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_code_sorts_numerically() {
        let input: CodeInput =
            serde_json::from_str(r#"{"10": "c", "2": "b", "0": "a", "3": null}"#).unwrap();
        let keys: Vec<_> = input.into_units().iter().map(|u| u.unit_key).collect();
        assert_eq!(keys, vec![0, 2, 3, 10]);
    }

    #[test]
    fn test_non_numeric_key_rejected() {
        assert!(serde_json::from_str::<CodeInput>(r#"{"title": "x"}"#).is_err());
    }

    #[test]
    fn test_colliding_unit_keys_rejected() {
        for json in [r#"{"0": "a", " 0": "b"}"#, r#"{"00": "a", "0": "b"}"#] {
            let err = serde_json::from_str::<CodeInput>(json).unwrap_err();
            assert!(err.to_string().contains("duplicate unit key 0"), "{err}");
        }
    }

    #[test]
    fn test_null_fragment_becomes_empty() {
        let input: CodeInput = serde_json::from_str(r#"{"1": null}"#).unwrap();
        assert_eq!(input.into_units()[0].raw_text, "");
    }

    #[test]
    fn test_single_string_targets_unit_zero() {
        let input: CodeInput = serde_json::from_str(r#""shape 1 left = 4""#).unwrap();
        let units = input.into_units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_key, 0);
    }

    #[test]
    fn test_generated_code_preferred() {
        let response: InstructionResponse = serde_json::from_str(
            r#"{"status": "success", "generated_code": "shape 1 left = 1", "code": "shape 1 left = 2"}"#,
        )
        .unwrap();
        assert_eq!(
            response.code_input(),
            Some(CodeInput::Single("shape 1 left = 1".into()))
        );
    }

    #[test]
    fn test_fallback_to_code_on_partial_success() {
        let response: InstructionResponse =
            serde_json::from_str(r#"{"status": "partial_success", "code": {"0": "sync;;"}}"#)
                .unwrap();
        assert!(response.code_input().is_some());
    }

    #[test]
    fn test_error_status_yields_no_code() {
        let response: InstructionResponse = serde_json::from_str(
            r#"{"status": "error", "message": "nope", "generated_code": "shape 1 left = 1"}"#,
        )
        .unwrap();
        assert_eq!(response.code_input(), None);

        let unknown: InstructionResponse =
            serde_json::from_str(r#"{"status": "failure"}"#).unwrap();
        assert_eq!(unknown.status, InstructionStatus::Unknown);
        assert_eq!(unknown.code_input(), None);
    }

    #[test]
    fn test_request_from_selection() {
        let request = InstructionRequest::new(
            "make titles bold",
            SlideSelection {
                current_index: Some(1),
                total_slides: 4,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["slide_index"], 1);
        assert_eq!(json["total_slides"], 4);
    }
}
