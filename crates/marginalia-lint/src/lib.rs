//! marginalia-lint: spelling and grammar comments from a line-addressed model.
//!
//! Documents are split into numbered line chunks, each chunk is analyzed
//! (concurrently, with retries), and every reported error is relocated from
//! `(lineStart, lineEnd, text)` to document char offsets before it becomes a
//! comment. Comments convert to `marginalia_core::Highlight`s.

pub mod analyzer;
pub mod chunk;
pub mod comment;
pub mod config;
pub mod error;
pub mod grade;
pub mod locator;
pub mod pipeline;
pub mod retry;

pub use analyzer::{ChunkAnalyzer, HttpChunkAnalyzer, parse_response};
pub use chunk::{Chunk, chunk_document};
pub use comment::{LintComment, LintKind, RawLintError, Rejection};
pub use config::LintConfig;
pub use error::LintError;
pub use grade::{grade, word_count};
pub use locator::{LineQuery, LintDocument, LocateMatch, LocatedSpan, locate, validate_span};
pub use pipeline::{LintReport, TaskRecord, TaskStatus, analyze_document};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, Retryable, with_retry};
