use thiserror::Error;

/// Failure of a single node execution.
///
/// The engine never propagates these to its caller: they are recorded as the
/// node's `{ error }` output.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid configuration for node {node_id}: {message}")]
    Config { node_id: String, message: String },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no LLM provider configured for {kind} node {node_id}")]
    ProviderUnavailable { node_id: String, kind: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("node {node_id} timed out after {elapsed_ms} ms")]
    Timeout { node_id: String, elapsed_ms: u64 },

    #[error("{0}")]
    Execution(String),
}

impl NodeError {
    pub fn config(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        NodeError::Config {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} API key is not configured")]
    MissingApiKey(String),

    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("request to {provider} failed: {message}")]
    Transport { provider: String, message: String },

    #[error("could not decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("{0} returned an empty response")]
    EmptyResponse(String),
}
