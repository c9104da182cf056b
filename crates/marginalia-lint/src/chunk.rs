//! Line-bounded document slices sent to the model.

use std::fmt::Write;

use marginalia_core::text::LineIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position among the document's chunks.
    pub index: usize,
    /// 1-based document line number of `lines[0]`.
    pub first_line: usize,
    pub lines: Vec<String>,
}

impl Chunk {
    /// 1-based, inclusive.
    pub fn last_line(&self) -> usize {
        self.first_line + self.lines.len().saturating_sub(1)
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    /// Model input: every line prefixed with its document line number, so
    /// reported line numbers are document-absolute.
    pub fn numbered(&self) -> String {
        let mut out = String::new();
        for (offset, line) in self.lines.iter().enumerate() {
            let _ = writeln!(out, "Line {}: {}", self.first_line + offset, line);
        }
        out
    }
}

/// Split a document into chunks of at most `lines_per_chunk` lines.
/// Chunks with only whitespace are left out.
pub fn chunk_document(lines: &LineIndex, lines_per_chunk: usize) -> Vec<Chunk> {
    let per_chunk = lines_per_chunk.max(1);
    let total = lines.len_lines();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + per_chunk).min(total);
        let chunk = Chunk {
            index: chunks.len(),
            first_line: start + 1,
            lines: (start..end).filter_map(|line| lines.line(line)).collect(),
        };
        if !chunk.is_blank() {
            chunks.push(chunk);
        }
        start = end;
    }
    chunks
}
