use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmProxyError {
    #[error("no proxy token configured: set AIPIPE_TOKEN")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("proxy returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse completion response: {source}\n  body: {body}")]
    Parse {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}
