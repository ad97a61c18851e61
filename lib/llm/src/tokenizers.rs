// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tokenizer seam used to measure prompt and completion lengths.
//!
//! Token counts drive the dataset length filters and the per-token latency figures, so the
//! only capability required here is encoding text into token ids.

pub mod hf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use hf::HuggingFaceTokenizer;

pub type TokenIdType = u32;

pub type Result<T> = std::result::Result<T, TokenizerError>;

/// File name of a serialized Hugging Face tokenizer
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Hub revision used when none is given
pub const DEFAULT_REVISION: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Error loading tokenizer from {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Error tokenizing input: {0}")]
    Encode(String),

    #[error("Error fetching tokenizer '{repo}' from the hub: {source}")]
    Download {
        repo: String,
        #[source]
        source: hf_hub::api::tokio::ApiError,
    },
}

/// Contains the results of tokenizing a string
#[derive(Debug)]
pub enum Encoding {
    /// Hugging Face
    Hf(Box<tokenizers::tokenizer::Encoding>),
    /// Plain token ids
    Ids(Vec<TokenIdType>),
}

impl Encoding {
    pub fn token_ids(&self) -> &[TokenIdType] {
        match self {
            Encoding::Hf(inner) => inner.get_ids(),
            Encoding::Ids(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.token_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids().is_empty()
    }
}

pub mod traits {
    use super::{Encoding, Result};

    pub trait Encoder: Send + Sync {
        fn encode(&self, input: &str) -> Result<Encoding>;

        fn encode_batch(&self, inputs: &[&str]) -> Result<Vec<Encoding>> {
            inputs.iter().map(|input| self.encode(input)).collect()
        }
    }
}

pub use traits::Encoder;

/// Resolve a tokenizer by name.
///
/// `name` may be a `tokenizer.json` file, a directory containing one, or a Hugging Face hub
/// repository id. Hub files are cached by `hf-hub`.
pub async fn resolve_tokenizer(name: &str, revision: &str) -> Result<Arc<dyn Encoder>> {
    let path = Path::new(name);
    let file = if path.is_file() {
        path.to_path_buf()
    } else if path.is_dir() {
        path.join(TOKENIZER_FILE)
    } else {
        fetch_from_hub(name, revision).await?
    };

    tracing::debug!(path = %file.display(), "loading tokenizer");
    let tokenizer = tokio::task::spawn_blocking(move || HuggingFaceTokenizer::from_file(&file))
        .await
        .map_err(|err| TokenizerError::Load {
            path: path.to_path_buf(),
            message: err.to_string(),
        })??;
    Ok(Arc::new(tokenizer))
}

async fn fetch_from_hub(repo: &str, revision: &str) -> Result<PathBuf> {
    use hf_hub::{Repo, RepoType, api::tokio::ApiBuilder};

    let download_err = |source| TokenizerError::Download {
        repo: repo.to_string(),
        source,
    };
    let api = ApiBuilder::new()
        .with_progress(false)
        .build()
        .map_err(download_err)?;
    let repo_handle = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));
    tracing::info!(repo, revision, "fetching tokenizer from the hub");
    repo_handle.get(TOKENIZER_FILE).await.map_err(download_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chars;

    impl Encoder for Chars {
        fn encode(&self, input: &str) -> Result<Encoding> {
            Ok(Encoding::Ids(input.chars().map(|c| c as u32).collect()))
        }
    }

    #[test]
    fn test_default_batch_encodes_each_input() {
        let encodings = Chars.encode_batch(&["ab", "", "xyz"]).unwrap();
        let lens: Vec<usize> = encodings.iter().map(Encoding::len).collect();
        assert_eq!(lens, vec![2, 0, 3]);
        assert!(encodings[1].is_empty());
        assert_eq!(encodings[0].token_ids(), &[97, 98]);
    }

    #[tokio::test]
    async fn test_missing_tokenizer_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().to_str().unwrap().to_string();
        let err = match resolve_tokenizer(&name, DEFAULT_REVISION).await {
            Ok(_) => panic!("directory without tokenizer.json must not load"),
            Err(err) => err,
        };
        assert!(matches!(err, TokenizerError::Load { .. }));
    }
}
