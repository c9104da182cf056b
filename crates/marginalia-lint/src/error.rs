use miette::Diagnostic;
use thiserror::Error;

/// Errors from talking to a chunk analyzer.
#[derive(Debug, Error, Diagnostic)]
pub enum LintError {
    #[error("analyzer request failed: {0}")]
    #[diagnostic(code(marginalia::lint::http))]
    Http(#[from] reqwest::Error),

    #[error("analyzer returned status {status}")]
    #[diagnostic(code(marginalia::lint::status), help("response body: {body}"))]
    Status { status: u16, body: String },

    #[error("malformed analyzer response: {0}")]
    #[diagnostic(
        code(marginalia::lint::payload),
        help("the model must return {{\"errors\": [...]}} with lineStart, lineEnd, highlightedText and description")
    )]
    Payload(#[from] serde_json::Error),

    #[error("no analyzer endpoint configured")]
    #[diagnostic(
        code(marginalia::lint::no_endpoint),
        help("set MARGINALIA_LINT_ENDPOINT or pass --endpoint")
    )]
    MissingEndpoint,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] marginalia_core::ConfigError),
}

impl LintError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LintError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            LintError::Status { status, .. } => *status == 429 || *status >= 500,
            // Model output varies between attempts.
            LintError::Payload(_) => true,
            LintError::MissingEndpoint | LintError::Config(_) => false,
        }
    }
}
