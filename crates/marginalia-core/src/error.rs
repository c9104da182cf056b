use miette::Diagnostic;
use thiserror::Error;

/// The parser event stream could not be assembled into a tree.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ParseError {
    #[error("end tag without a matching start tag")]
    #[diagnostic(code(marginalia::parse::unbalanced_end))]
    UnbalancedEnd,

    #[error("{depth} tag(s) left open at end of input")]
    #[diagnostic(code(marginalia::parse::unclosed))]
    UnclosedTags { depth: usize },
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    #[diagnostic(
        code(marginalia::config::invalid),
        help("expected {expected}")
    )]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
