//! Token-budget truncation applied before text is sent to the embedding model.

use super::EmbeddingClientError;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

/// Cuts text down to a fixed number of tokens.
#[derive(Clone)]
pub struct TokenTruncator {
    encoding: Arc<CoreBPE>,
    max_tokens: usize,
}

impl TokenTruncator {
    /// Resolve the encoding for `model`, falling back to `cl100k_base` for models tiktoken does
    /// not know (sentence-transformers checkpoints, for example).
    pub fn for_model(model: &str, max_tokens: usize) -> Result<Self, EmbeddingClientError> {
        let encoding = match get_bpe_from_model(model.trim()) {
            Ok(encoding) => encoding,
            Err(model_err) => {
                tracing::debug!(
                    model,
                    error = %model_err,
                    "Tokenizer model lookup failed; using 'cl100k_base'"
                );
                cl100k_base().map_err(|err| EmbeddingClientError::Tokenizer {
                    model: model.to_string(),
                    reason: err.to_string(),
                })?
            }
        };
        Ok(Self {
            encoding: Arc::new(encoding),
            max_tokens,
        })
    }

    /// Configured token budget.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Return `text` unchanged when it fits the budget, otherwise its longest decodable prefix
    /// of at most `max_tokens` tokens.
    pub fn truncate(&self, text: &str) -> String {
        let tokens = self.encoding.encode_ordinary(text);
        if tokens.len() <= self.max_tokens {
            return text.to_string();
        }

        tracing::debug!(
            tokens = tokens.len(),
            max_tokens = self.max_tokens,
            "Truncating text before embedding"
        );
        // A cut can land inside a multi-byte character; back off until the prefix decodes.
        let mut end = self.max_tokens;
        while end > 0 {
            if let Ok(prefix) = self.encoding.decode(tokens[..end].to_vec()) {
                return prefix;
            }
            end -= 1;
        }
        String::new()
    }
}
