// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Dataset sampling
//!
//! Builds the benchmark workload from a conversational dataset: a JSON array of objects, each
//! with a `conversations` list of turns. Conversations with fewer than two turns are skipped;
//! otherwise the first turn's `value` becomes the prompt and the second turn's token length
//! becomes the requested output length. Later turns are never read.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tokenizers::{Encoder, TokenizerError};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset {path}: turn {turn} of conversation {conversation} has no string `value`")]
    MissingTurnValue {
        path: PathBuf,
        conversation: usize,
        turn: usize,
    },

    #[error("Dataset {path} has no conversation with at least two turns")]
    NoUsableConversations { path: PathBuf },

    #[error("Requested {requested} samples but only {available} records pass the length filters")]
    InsufficientRecords { requested: usize, available: usize },

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Turns are kept as raw JSON; only the first two of a usable conversation are read.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub conversations: Vec<serde_json::Value>,
}

impl Conversation {
    fn turn_value(&self, turn: usize) -> Option<&str> {
        self.conversations.get(turn)?.get("value")?.as_str()
    }
}

/// One sampled request: the prompt text and the token counts that drive it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub prompt: String,
    pub prompt_token_count: usize,
    pub output_token_count: usize,
}

/// Token length bounds a record must satisfy to be sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthFilter {
    pub min_prompt_tokens: usize,
    pub min_output_tokens: usize,
    pub max_prompt_tokens: usize,
    pub max_total_tokens: usize,
}

impl Default for LengthFilter {
    fn default() -> Self {
        Self {
            min_prompt_tokens: 4,
            min_output_tokens: 4,
            max_prompt_tokens: 1024,
            max_total_tokens: 2048,
        }
    }
}

impl LengthFilter {
    pub fn accepts(&self, prompt_tokens: usize, output_tokens: usize) -> bool {
        // Very short sequences trip up some backends
        if prompt_tokens < self.min_prompt_tokens || output_tokens < self.min_output_tokens {
            return false;
        }
        prompt_tokens <= self.max_prompt_tokens
            && prompt_tokens + output_tokens <= self.max_total_tokens
    }
}

/// Load `(prompt, reference completion)` pairs, keeping only conversations with two or more turns.
pub fn load_conversations(path: &Path) -> Result<Vec<(String, String)>, DatasetError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let conversations: Vec<Conversation> =
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    let total = conversations.len();

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (index, conversation) in conversations.iter().enumerate() {
        if conversation.conversations.len() < 2 {
            continue;
        }
        let value = |turn| {
            conversation
                .turn_value(turn)
                .ok_or_else(|| DatasetError::MissingTurnValue {
                    path: path.to_path_buf(),
                    conversation: index,
                    turn,
                })
        };
        pairs.push((value(0)?.to_string(), value(1)?.to_string()));
    }

    if pairs.is_empty() {
        return Err(DatasetError::NoUsableConversations {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(
        path = %path.display(),
        total,
        usable = pairs.len(),
        "loaded conversations"
    );
    Ok(pairs)
}

/// Tokenize prompts and completions in two batches and keep the records accepted by `filter`.
pub fn tokenize_and_filter(
    pairs: Vec<(String, String)>,
    tokenizer: &dyn Encoder,
    filter: &LengthFilter,
) -> Result<Vec<DatasetRecord>, DatasetError> {
    let prompts: Vec<&str> = pairs.iter().map(|(p, _)| p.as_str()).collect();
    let completions: Vec<&str> = pairs.iter().map(|(_, c)| c.as_str()).collect();

    let prompt_lens: Vec<usize> = tokenizer
        .encode_batch(&prompts)?
        .iter()
        .map(|e| e.len())
        .collect();
    let output_lens: Vec<usize> = tokenizer
        .encode_batch(&completions)?
        .iter()
        .map(|e| e.len())
        .collect();

    let records = pairs
        .into_iter()
        .zip(prompt_lens.into_iter().zip(output_lens))
        .filter(|(_, (prompt_len, output_len))| filter.accepts(*prompt_len, *output_len))
        .map(|((prompt, _), (prompt_len, output_len))| DatasetRecord {
            prompt,
            prompt_token_count: prompt_len,
            output_token_count: output_len,
        })
        .collect();
    Ok(records)
}

/// Draw `count` records uniformly at random without replacement.
///
/// The result is ordered by the draw, so the same rng state always yields the same workload.
/// Fails rather than truncating when the population is too small.
pub fn sample_records<R: Rng + ?Sized>(
    population: Vec<DatasetRecord>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<DatasetRecord>, DatasetError> {
    if count > population.len() {
        return Err(DatasetError::InsufficientRecords {
            requested: count,
            available: population.len(),
        });
    }

    let mut slots: Vec<Option<DatasetRecord>> = population.into_iter().map(Some).collect();
    let indices = rand::seq::index::sample(rng, slots.len(), count);
    Ok(indices
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}

/// Load, tokenize, filter and sample the benchmark workload.
pub fn sample_requests<R: Rng + ?Sized>(
    path: &Path,
    count: usize,
    tokenizer: &dyn Encoder,
    filter: &LengthFilter,
    rng: &mut R,
) -> Result<Vec<DatasetRecord>, DatasetError> {
    let pairs = load_conversations(path)?;
    let loaded = pairs.len();
    let population = tokenize_and_filter(pairs, tokenizer, filter)?;
    let eligible = population.len();
    let sampled = sample_records(population, count, rng)?;
    tracing::info!(
        dataset = %path.display(),
        loaded,
        eligible,
        sampled = sampled.len(),
        "sampled benchmark workload"
    );
    Ok(sampled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizers::Encoding;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use std::io::Write;

    /// One token per whitespace-separated word
    struct Words;

    impl Encoder for Words {
        fn encode(&self, input: &str) -> crate::tokenizers::Result<Encoding> {
            Ok(Encoding::Ids(
                input.split_whitespace().map(|w| w.len() as u32).collect(),
            ))
        }
    }

    fn words(n: usize) -> String {
        vec!["tok"; n].join(" ")
    }

    fn write_dataset(json: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        file
    }

    fn record(prompt_tokens: usize, output_tokens: usize) -> DatasetRecord {
        DatasetRecord {
            prompt: words(prompt_tokens),
            prompt_token_count: prompt_tokens,
            output_token_count: output_tokens,
        }
    }

    #[rstest]
    #[case(4, 4, true)]
    #[case(3, 10, false)]
    #[case(10, 3, false)]
    #[case(1024, 1024, true)]
    #[case(1025, 4, false)]
    #[case(1000, 1049, false)]
    #[case(1000, 1048, true)]
    fn test_length_filter(#[case] prompt: usize, #[case] output: usize, #[case] expected: bool) {
        assert_eq!(LengthFilter::default().accepts(prompt, output), expected);
    }

    #[test]
    fn test_load_keeps_first_two_turns() {
        let file = write_dataset(&serde_json::json!([
            { "id": "a", "conversations": [
                { "from": "human", "value": "first" },
                { "from": "gpt", "value": "second" },
                { "from": "human", "value": "third" }
            ]},
            { "id": "b", "conversations": [ { "from": "human", "value": "alone" } ] },
            { "id": "c", "conversations": [] }
        ]));
        let pairs = load_conversations(file.path()).unwrap();
        assert_eq!(pairs, vec![("first".to_string(), "second".to_string())]);
    }

    #[test]
    fn test_load_ignores_turns_after_the_second() {
        let file = write_dataset(&serde_json::json!([
            { "conversations": [
                { "from": "human", "value": "prompt" },
                { "from": "gpt", "value": "reply" },
                { "from": "human" },
                "not even an object"
            ]},
            { "conversations": [ { "text": "single turn, never read" } ] }
        ]));
        let pairs = load_conversations(file.path()).unwrap();
        assert_eq!(pairs, vec![("prompt".to_string(), "reply".to_string())]);
    }

    #[rstest]
    #[case(serde_json::json!([{ "conversations": [{ "value": "p" }, { "from": "gpt" }] }]), 1)]
    #[case(serde_json::json!([{ "conversations": [{ "value": 7 }, { "value": "c" }] }]), 0)]
    fn test_load_missing_turn_value(#[case] json: serde_json::Value, #[case] expected_turn: usize) {
        let file = write_dataset(&json);
        match load_conversations(file.path()).unwrap_err() {
            DatasetError::MissingTurnValue {
                conversation, turn, ..
            } => {
                assert_eq!(conversation, 0);
                assert_eq!(turn, expected_turn);
            }
            other => panic!("expected MissingTurnValue, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_conversations(Path::new("/nonexistent/dataset.json")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[rstest]
    #[case(serde_json::json!({ "conversations": [] }))]
    #[case(serde_json::json!([{ "turns": [] }]))]
    #[case(serde_json::json!([{ "conversations": "not a list" }]))]
    fn test_load_malformed(#[case] json: serde_json::Value) {
        let file = write_dataset(&json);
        let err = load_conversations(file.path()).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { .. }));
    }

    #[test]
    fn test_load_without_two_turn_conversations() {
        let file = write_dataset(&serde_json::json!([
            { "conversations": [ { "value": "only one" } ] }
        ]));
        let err = load_conversations(file.path()).unwrap_err();
        assert!(matches!(err, DatasetError::NoUsableConversations { .. }));
    }

    #[test]
    fn test_tokenize_and_filter_counts_tokens() {
        let pairs = vec![
            (words(5), words(7)),
            (words(2), words(7)),
            (words(8), words(3)),
            (words(1024), words(1025)),
        ];
        let records = tokenize_and_filter(pairs, &Words, &LengthFilter::default()).unwrap();
        assert_eq!(records, vec![record(5, 7)]);
    }

    #[test]
    fn test_sample_exact_count_and_invariants() {
        let population: Vec<DatasetRecord> = (4..40).map(|n| record(n, n + 1)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = sample_records(population, 10, &mut rng).unwrap();
        assert_eq!(sampled.len(), 10);

        let mut prompts: Vec<usize> = sampled.iter().map(|r| r.prompt_token_count).collect();
        prompts.sort_unstable();
        prompts.dedup();
        assert_eq!(prompts.len(), 10, "sampling must be without replacement");

        let filter = LengthFilter::default();
        assert!(
            sampled
                .iter()
                .all(|r| filter.accepts(r.prompt_token_count, r.output_token_count))
        );
    }

    #[test]
    fn test_sample_is_deterministic_for_seed() {
        let population: Vec<DatasetRecord> = (4..100).map(|n| record(n, 4)).collect();
        let a = sample_records(population.clone(), 20, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = sample_records(population.clone(), 20, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = sample_records(population, 20, &mut StdRng::seed_from_u64(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sample_whole_population() {
        let population: Vec<DatasetRecord> = (4..9).map(|n| record(n, 4)).collect();
        let sampled =
            sample_records(population.clone(), 5, &mut StdRng::seed_from_u64(1)).unwrap();
        let mut sorted = sampled.clone();
        sorted.sort_by_key(|r| r.prompt_token_count);
        assert_eq!(sorted, population);
    }

    #[test]
    fn test_sample_more_than_available_fails() {
        let population: Vec<DatasetRecord> = (4..7).map(|n| record(n, 4)).collect();
        let err = sample_records(population, 4, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InsufficientRecords {
                requested: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_sample_requests_end_to_end() {
        let file = write_dataset(&serde_json::json!([
            { "conversations": [ { "value": words(6) }, { "value": words(9) } ] },
            { "conversations": [ { "value": words(2) }, { "value": words(9) } ] },
            { "conversations": [ { "value": words(12) }, { "value": words(40) } ] },
            { "conversations": [ { "value": words(30) }, { "value": words(5) } ] }
        ]));
        let mut rng = StdRng::seed_from_u64(0);
        let sampled =
            sample_requests(file.path(), 3, &Words, &LengthFilter::default(), &mut rng).unwrap();
        let mut counts: Vec<(usize, usize)> = sampled
            .iter()
            .map(|r| (r.prompt_token_count, r.output_token_count))
            .collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![(6, 9), (12, 40), (30, 5)]);

        let err = sample_requests(file.path(), 4, &Words, &LengthFilter::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, DatasetError::InsufficientRecords { .. }));
    }
}
