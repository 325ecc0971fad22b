use thiserror::Error;

/// Errors from generating a learning path with the remote model.
///
/// Every variant is recoverable: callers switch to the fallback generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured for the generation endpoint")]
    MissingApiKey,

    #[error("failed to reach the generation endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generation endpoint returned HTTP {status}: {payload}")]
    Remote {
        status: u16,
        /// The provider's error body, as JSON when it parses, else a string.
        payload: serde_json::Value,
    },

    #[error("unexpected response from the generation endpoint: {0}")]
    UnexpectedResponse(String),

    #[error("generation endpoint returned no text")]
    EmptyResponse,

    #[error("could not find a JSON object in the model reply")]
    MalformedResponse,

    #[error("model reply contained invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl GenerationError {
    /// Whether the remote endpoint answered with a non-success status.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}
