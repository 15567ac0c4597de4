//! Embedding collaborator used by the categorizer

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbedError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding failed: {0}")]
    Failed(String),

    #[error("embedding timed out after {0} ms")]
    Timeout(u64),
}

/// Turns text into a vector. Must be deterministic for identical text.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Default collaborator when no provider is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableEmbedder;

impl Embedder for UnavailableEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unavailable("no embedding provider configured".to_string()))
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < 1e-8 || norm_b < 1e-8 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

#[cfg(feature = "fastembed")]
mod local {
    use super::{EmbedError, Embedder};
    use fastembed::TextEmbedding;
    use std::sync::Mutex;

    /// Local ONNX embedding model; loading downloads weights on first use
    pub struct FastEmbedder {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedder {
        pub fn try_new() -> Result<Self, EmbedError> {
            let model = TextEmbedding::try_new(Default::default())
                .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    impl Embedder for FastEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            let mut model = self
                .model
                .lock()
                .map_err(|_| EmbedError::Unavailable("model lock poisoned".to_string()))?;
            model
                .embed(vec![text.to_string()], None)
                .map_err(|e| EmbedError::Failed(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| EmbedError::Failed("empty embedding batch".to_string()))
        }
    }
}
