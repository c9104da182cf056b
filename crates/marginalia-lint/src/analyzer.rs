//! Chunk analyzers: whatever turns a chunk into reported errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::comment::RawLintError;
use crate::config::LintConfig;
use crate::error::LintError;

#[async_trait]
pub trait ChunkAnalyzer: Send + Sync {
    async fn analyze(&self, chunk: &Chunk) -> Result<Vec<RawLintError>, LintError>;
}

const INSTRUCTIONS: &str = "Find spelling and grammar errors in the numbered lines. \
Report each as {\"lineStart\", \"lineEnd\", \"highlightedText\", \"description\", \"type\"} \
where highlightedText is copied exactly from the text and type is \"spelling\" or \"grammar\". \
Return {\"errors\": [...]}.";

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    model: &'a str,
    instructions: &'static str,
    input: String,
    first_line: usize,
    last_line: usize,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    /// Entries are read one by one so a bad entry cannot sink the rest.
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Parse a model response body into its reported errors.
///
/// Only a body that isn't `{"errors": [...]}` is an error. Malformed entries
/// come back as defaults and are rejected later by the contract check.
pub fn parse_response(body: &str) -> Result<Vec<RawLintError>, LintError> {
    let parsed: AnalyzeResponse = serde_json::from_str(body)?;
    Ok(parsed
        .errors
        .into_iter()
        .map(RawLintError::from_value)
        .collect())
}

/// Posts each chunk as JSON to a model endpoint.
#[derive(Debug, Clone)]
pub struct HttpChunkAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpChunkAnalyzer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn from_config(config: &LintConfig) -> Result<Self, LintError> {
        let endpoint = config.endpoint.clone().ok_or(LintError::MissingEndpoint)?;
        Ok(Self {
            api_key: config.api_key.clone(),
            ..Self::new(endpoint, config.model.clone())
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ChunkAnalyzer for HttpChunkAnalyzer {
    async fn analyze(&self, chunk: &Chunk) -> Result<Vec<RawLintError>, LintError> {
        let request = AnalyzeRequest {
            model: &self.model,
            instructions: INSTRUCTIONS,
            input: chunk.numbered(),
            first_line: chunk.first_line,
            last_line: chunk.last_line(),
        };
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LintError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let errors = parse_response(&body)?;
        tracing::debug!(
            target: "marginalia::lint",
            chunk = chunk.index,
            errors = errors.len(),
            "chunk analyzed"
        );
        Ok(errors)
    }
}
