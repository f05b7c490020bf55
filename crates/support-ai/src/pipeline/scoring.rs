use async_trait::async_trait;

use super::features::FeatureVector;

/// Boundary to the external eligibility model.
///
/// Implementations must be safe to call from many concurrent evaluation runs;
/// the orchestrator bounds every call with a timeout and retries transient
/// failures once before the decision engine falls back to rules-only mode.
#[async_trait]
pub trait ScoreModel: Send + Sync {
    /// Probability in [0, 1] that the applicant qualifies for support. An
    /// error is distinct from a valid score of 0.0.
    async fn score(&self, features: &FeatureVector) -> Result<f64, ScoreError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("scoring model unavailable: {0}")]
    Unavailable(String),
    #[error("scoring model timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl ScoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ScoreError::Unavailable(_) | ScoreError::Timeout { .. })
    }
}
