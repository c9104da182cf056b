//! marginalia-core: attach source-offset highlights to rendered markdown.
//!
//! This crate provides:
//! - `parse` / `project`: markdown to a node tree and its plain-text projection
//! - `OffsetMap`: alignment between markdown-source and plain-text offsets
//! - `decorate_document`: per-leaf decoration ranges with quote-matching fallbacks
//! - `RenderSurface`: decorated HTML output with hover/click dispatch
//! - `DocumentCache`: caller-owned cache of prepared documents

pub mod cache;
pub mod config;
pub mod decorate;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod projection;
pub mod reconcile;
pub mod selection;
pub mod surface;
pub mod text;
pub mod tree;

pub use cache::{DocumentCache, PreparedDocument, hash_source};
pub use config::EngineConfig;
pub use decorate::{DecorationRange, Highlight, MatchKind, decorate, decorate_document, restyle};
pub use error::{ConfigError, ParseError};
pub use normalize::{first_line_prefix, normalize_quote};
pub use parse::{parse, try_parse};
pub use projection::{PlainTextProjection, PlainTextSpan, Segment, SegmentKind, project};
pub use reconcile::{AlignedRun, OffsetMap};
pub use selection::{AgentHighlights, ReviewSelection};
pub use smol_str::SmolStr;
pub use surface::{
    DecorationStyle, HighlightEvents, PointerEvent, Region, RenderSurface, SurfaceState, style_for,
};
pub use tree::{DocumentNode, NodeKind, NodePath, SourceAnchor, leaf_text, node_at};
