// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use tokenizers::tokenizer::Tokenizer as HfTokenizer;

use super::{Encoding, Result, TokenizerError, traits::Encoder};

pub struct HuggingFaceTokenizer {
    tokenizer: HfTokenizer,
}

impl HuggingFaceTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = HfTokenizer::from_file(path).map_err(|err| TokenizerError::Load {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        Ok(HuggingFaceTokenizer { tokenizer })
    }
}

/// Special tokens from the tokenizer's post-processor (BOS, EOS) are added and counted.
impl Encoder for HuggingFaceTokenizer {
    fn encode(&self, input: &str) -> Result<Encoding> {
        let encoding = self
            .tokenizer
            .encode(input, true)
            .map_err(|err| TokenizerError::Encode(err.to_string()))?;

        Ok(Encoding::Hf(Box::new(encoding)))
    }

    fn encode_batch(&self, inputs: &[&str]) -> Result<Vec<Encoding>> {
        // The library parallelizes batches internally
        let hf_encodings = self
            .tokenizer
            .encode_batch(inputs.to_vec(), true)
            .map_err(|err| TokenizerError::Encode(format!("batch: {err}")))?;

        let encodings = hf_encodings
            .into_iter()
            .map(|enc| Encoding::Hf(Box::new(enc)))
            .collect();

        Ok(encodings)
    }
}

impl From<HfTokenizer> for HuggingFaceTokenizer {
    fn from(tokenizer: HfTokenizer) -> Self {
        HuggingFaceTokenizer { tokenizer }
    }
}
