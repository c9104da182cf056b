//! Whole-document lint: chunk, analyze concurrently, relocate, grade.

use std::collections::{HashMap, HashSet};

use futures::StreamExt;
use marginalia_core::Highlight;
use serde::Serialize;

use crate::analyzer::ChunkAnalyzer;
use crate::chunk::{Chunk, chunk_document};
use crate::comment::{LintComment, RawLintError, Rejection};
use crate::config::LintConfig;
use crate::grade::{grade, word_count};
use crate::locator::LintDocument;
use crate::retry::{RetryOutcome, RetryPolicy, with_retry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded { reported: usize },
    Failed { message: String },
}

/// What happened to one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub chunk: usize,
    pub first_line: usize,
    pub last_line: usize,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl TaskRecord {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    /// Valid, deduplicated comments in document order of their chunks.
    pub comments: Vec<LintComment>,
    pub tasks: Vec<TaskRecord>,
    pub grade: u8,
    pub word_count: usize,
    /// Dropped reported errors by reason.
    pub rejected: HashMap<Rejection, usize>,
}

impl LintReport {
    pub fn highlights(&self) -> Vec<Highlight> {
        self.comments.iter().filter_map(LintComment::to_highlight).collect()
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskRecord> + '_ {
        self.tasks.iter().filter(|task| task.is_failed())
    }
}

/// Analyze every chunk of `content` and merge the results.
///
/// Chunk failures never fail the document: the chunk contributes nothing and
/// its task record says why.
pub async fn analyze_document<A>(content: &str, analyzer: &A, config: &LintConfig) -> LintReport
where
    A: ChunkAnalyzer + ?Sized,
{
    let doc = LintDocument::new(content);
    let chunks = chunk_document(doc.lines(), config.chunk_lines);
    let concurrency = config.concurrency.max(1);
    let policy = config.retry_policy();
    tracing::info!(
        target: "marginalia::lint",
        chunks = chunks.len(),
        concurrency,
        "analyzing document"
    );

    let results: Vec<(TaskRecord, Vec<RawLintError>)> = futures::stream::iter(chunks)
        .enumerate()
        .map(|(slot, chunk)| {
            let policy = &policy;
            async move {
                // Spread out the first wave of requests; later ones start as slots free up.
                if slot > 0 && slot < concurrency {
                    tokio::time::sleep(config.stagger.saturating_mul(slot as u32)).await;
                }
                run_chunk(&chunk, analyzer, policy).await
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let mut tasks = Vec::with_capacity(results.len());
    let mut rejected: HashMap<Rejection, usize> = HashMap::new();
    let mut seen = HashSet::new();
    let mut comments = Vec::new();
    let mut next_id = 0usize;
    for (task, raws) in results {
        tasks.push(task);
        for raw in raws {
            let id = format!("lint-{next_id}");
            next_id += 1;
            match accept(&raw, &doc, id, config, &mut seen) {
                Ok(comment) => comments.push(comment),
                Err(reason) => {
                    tracing::debug!(
                        target: "marginalia::lint",
                        ?reason,
                        line_start = raw.line_start,
                        text = %raw.highlighted_text,
                        "dropping reported error"
                    );
                    *rejected.entry(reason).or_default() += 1;
                }
            }
        }
    }

    let words = word_count(content);
    let report = LintReport {
        grade: grade(comments.len(), words),
        comments,
        tasks,
        word_count: words,
        rejected,
    };
    tracing::info!(
        target: "marginalia::lint",
        comments = report.comments.len(),
        failed_tasks = report.failed_tasks().count(),
        grade = report.grade,
        "document analyzed"
    );
    report
}

async fn run_chunk<A>(
    chunk: &Chunk,
    analyzer: &A,
    policy: &RetryPolicy,
) -> (TaskRecord, Vec<RawLintError>)
where
    A: ChunkAnalyzer + ?Sized,
{
    let started = tokio::time::Instant::now();
    let outcome = with_retry(policy, |_| analyzer.analyze(chunk)).await;
    let attempts = outcome.attempts();
    let duration_ms = started.elapsed().as_millis() as u64;
    let (status, raws) = match outcome {
        RetryOutcome::Succeeded { value, .. } => (
            TaskStatus::Succeeded {
                reported: value.len(),
            },
            value,
        ),
        RetryOutcome::Failed { error, .. } => {
            tracing::warn!(
                target: "marginalia::lint",
                chunk = chunk.index,
                first_line = chunk.first_line,
                last_line = chunk.last_line(),
                attempts,
                %error,
                "chunk analysis failed; continuing without it"
            );
            (
                TaskStatus::Failed {
                    message: format!(
                        "lines {}-{}: {} (after {} attempt(s))",
                        chunk.first_line,
                        chunk.last_line(),
                        error,
                        attempts
                    ),
                },
                Vec::new(),
            )
        }
    };
    let task = TaskRecord {
        chunk: chunk.index,
        first_line: chunk.first_line,
        last_line: chunk.last_line(),
        attempts,
        duration_ms,
        status,
    };
    (task, raws)
}

/// Filter, relocate, validate and deduplicate one reported error.
fn accept(
    raw: &RawLintError,
    doc: &LintDocument,
    id: String,
    config: &LintConfig,
    seen: &mut HashSet<(i64, i64)>,
) -> Result<LintComment, Rejection> {
    raw.check_contract(config.min_description_len)?;
    let comment = LintComment::relocate(raw, doc, id);
    if comment.start_offset < 0 {
        return Err(Rejection::NotFound);
    }
    if !comment.is_valid {
        return Err(Rejection::Invalid);
    }
    if !seen.insert(comment.span()) {
        return Err(Rejection::Duplicate);
    }
    Ok(comment)
}
