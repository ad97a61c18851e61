// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Request and response schemas of the `/generate` endpoint for each supported backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::DatasetRecord;

/// Path of the non-streaming generation endpoint
pub const GENERATE_PATH: &str = "/generate";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unknown backend '{0}'. Valid backends: vllm, tgi")]
    UnknownBackend(String),
}

/// Model server implementation being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// vLLM `api_server` (backend A)
    #[default]
    Vllm,
    /// Text Generation Inference (backend B)
    Tgi,
}

impl Backend {
    pub fn supports_beam_search(&self) -> bool {
        matches!(self, Backend::Vllm)
    }

    /// Payload for one record
    pub fn build_request(
        &self,
        record: &DatasetRecord,
        options: &SamplingOptions,
    ) -> GenerateRequest {
        match self {
            Backend::Vllm => GenerateRequest::Vllm(VllmGenerateRequest {
                prompt: record.prompt.clone(),
                n: 1,
                best_of: options.best_of,
                use_beam_search: options.use_beam_search,
                temperature: if options.use_beam_search { 0.0 } else { 1.0 },
                top_p: 1.0,
                max_tokens: record.output_token_count,
                ignore_eos: true,
                stream: false,
            }),
            Backend::Tgi => GenerateRequest::Tgi(TgiGenerateRequest {
                inputs: record.prompt.clone(),
                parameters: TgiParameters {
                    best_of: options.best_of,
                    max_new_tokens: record.output_token_count,
                    do_sample: true,
                },
            }),
        }
    }
}

impl FromStr for Backend {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vllm" | "a" => Ok(Backend::Vllm),
            "tgi" | "b" => Ok(Backend::Tgi),
            other => Err(ProtocolError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Backend::Vllm => "vllm",
            Backend::Tgi => "tgi",
        };
        write!(f, "{s}")
    }
}

/// Sampling knobs shared by every request of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Candidates generated server side; the best one is returned
    pub best_of: u32,
    pub use_beam_search: bool,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            best_of: 1,
            use_beam_search: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VllmGenerateRequest {
    pub prompt: String,
    pub n: u32,
    pub best_of: u32,
    pub use_beam_search: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
    pub ignore_eos: bool,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgiParameters {
    pub best_of: u32,
    pub max_new_tokens: usize,
    pub do_sample: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgiGenerateRequest {
    pub inputs: String,
    pub parameters: TgiParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerateRequest {
    Vllm(VllmGenerateRequest),
    Tgi(TgiGenerateRequest),
}

/// What a decoded response body means for the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Complete,
    /// The server reported an error in the body; the same request should be sent again
    Retry(String),
}

impl GenerateOutcome {
    pub fn classify(body: &Value) -> Self {
        match body.as_object().and_then(|obj| obj.get("error")) {
            None => GenerateOutcome::Complete,
            Some(Value::String(message)) => GenerateOutcome::Retry(message.clone()),
            Some(other) => GenerateOutcome::Retry(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record() -> DatasetRecord {
        DatasetRecord {
            prompt: "Tell me a story".to_string(),
            prompt_token_count: 5,
            output_token_count: 42,
        }
    }

    #[test]
    fn test_vllm_payload() {
        let options = SamplingOptions {
            best_of: 2,
            use_beam_search: false,
        };
        let body = serde_json::to_value(Backend::Vllm.build_request(&record(), &options)).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": "Tell me a story",
                "n": 1,
                "best_of": 2,
                "use_beam_search": false,
                "temperature": 1.0,
                "top_p": 1.0,
                "max_tokens": 42,
                "ignore_eos": true,
                "stream": false
            })
        );
    }

    #[test]
    fn test_vllm_beam_search_is_greedy() {
        let options = SamplingOptions {
            best_of: 4,
            use_beam_search: true,
        };
        let body = serde_json::to_value(Backend::Vllm.build_request(&record(), &options)).unwrap();
        assert_eq!(body["temperature"], json!(0.0));
        assert_eq!(body["use_beam_search"], json!(true));
    }

    #[test]
    fn test_tgi_payload() {
        let body = serde_json::to_value(
            Backend::Tgi.build_request(&record(), &SamplingOptions::default()),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({
                "inputs": "Tell me a story",
                "parameters": {
                    "best_of": 1,
                    "max_new_tokens": 42,
                    "do_sample": true
                }
            })
        );
    }

    #[rstest]
    #[case("vllm", Backend::Vllm)]
    #[case("A", Backend::Vllm)]
    #[case("TGI", Backend::Tgi)]
    #[case("b", Backend::Tgi)]
    fn test_parse_backend(#[case] input: &str, #[case] expected: Backend) {
        assert_eq!(input.parse::<Backend>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_backend() {
        assert!(matches!(
            "triton".parse::<Backend>(),
            Err(ProtocolError::UnknownBackend(_))
        ));
    }

    #[rstest]
    #[case(json!({"text": ["ok"]}), GenerateOutcome::Complete)]
    #[case(json!({"generated_text": "ok"}), GenerateOutcome::Complete)]
    #[case(json!([{"generated_text": "ok"}]), GenerateOutcome::Complete)]
    #[case(json!({"error": "overloaded"}), GenerateOutcome::Retry("overloaded".to_string()))]
    #[case(json!({"error": {"code": 503}}), GenerateOutcome::Retry("{\"code\":503}".to_string()))]
    #[case(json!({"error": null}), GenerateOutcome::Retry("null".to_string()))]
    fn test_classify(#[case] body: Value, #[case] expected: GenerateOutcome) {
        assert_eq!(GenerateOutcome::classify(&body), expected);
    }
}
